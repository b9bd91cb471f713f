//! Generate Flow type stubs with `flow gen-flow-files`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::try_join_all;
use startkit_plugin::{Batch, ExecutionContext, FileRecord, Plugin, PluginError, Result};

use crate::command;

/// Flow binary inside a project's dependencies, run through `node`.
const FLOW_BIN: &str = "node_modules/.bin/flow";

/// Runs `gen-flow-files` for every file in the batch and replaces the batch
/// with the generated `.flow` files.
#[derive(Debug, Clone)]
pub struct FlowGenerate {
    out_dir: PathBuf,
    args: Vec<String>,
    program: Option<(String, Vec<String>)>,
}

/// Generate Flow stubs into `out_dir`, passing `args` through to flow.
pub fn flow_generate<I, S>(out_dir: impl Into<PathBuf>, args: I) -> FlowGenerate
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    FlowGenerate {
        out_dir: out_dir.into(),
        args: args.into_iter().map(Into::into).collect(),
        program: None,
    }
}

impl FlowGenerate {
    /// Run flow through a different program, e.g. a global `flow` install.
    /// `leading_args` go before `gen-flow-files`.
    pub fn with_program<I, S>(mut self, program: impl Into<String>, leading_args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.program = Some((
            program.into(),
            leading_args.into_iter().map(Into::into).collect(),
        ));
        self
    }

    fn program(&self, ctx: &ExecutionContext) -> (String, Vec<String>) {
        match &self.program {
            Some(program) => program.clone(),
            None => (
                "node".to_string(),
                vec![ctx.resolve(Path::new(FLOW_BIN)).to_string_lossy().into_owned()],
            ),
        }
    }

    async fn generate(
        &self,
        ctx: &ExecutionContext,
        out_dir: &Path,
        record: FileRecord,
    ) -> Result<FileRecord> {
        let (program, leading) = self.program(ctx);
        let mut cmd = command::command(ctx, &program, &leading);
        cmd.arg("gen-flow-files")
            .arg(&record.path)
            .arg("--out-dir")
            .arg(out_dir)
            .args(&self.args)
            .env("FORCE_COLOR", "1");
        command::run(&mut cmd).await?;

        let name = record.path.file_name().ok_or_else(|| {
            PluginError::failed(
                "flowGenerate",
                format!("{} has no file name", record.path.display()),
            )
        })?;
        let mut flow_name = name.to_os_string();
        flow_name.push(".flow");
        let generated = out_dir.join(flow_name);

        ctx.log_file(&generated);
        Ok(FileRecord::new(generated))
    }
}

#[async_trait]
impl Plugin for FlowGenerate {
    fn name(&self) -> &str {
        "flowGenerate"
    }

    async fn run(&self, ctx: &ExecutionContext, input: Batch) -> Result<Batch> {
        let out_dir = ctx.resolve(&self.out_dir);
        try_join_all(
            input
                .into_iter()
                .map(|record| self.generate(ctx, &out_dir, record)),
        )
        .await
    }
}
