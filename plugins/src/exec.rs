//! Run an external program over a batch.

use async_trait::async_trait;
use startkit_plugin::{Batch, ExecutionContext, Plugin, Result};

use crate::command;

/// Runs a program once per invocation with the batch paths appended to its
/// arguments. The batch passes through unchanged.
#[derive(Debug, Clone)]
pub struct Exec {
    program: String,
    args: Vec<String>,
}

/// Run `program` with `args` followed by every path in the batch.
pub fn exec<I, S>(program: impl Into<String>, args: I) -> Exec
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Exec {
        program: program.into(),
        args: args.into_iter().map(Into::into).collect(),
    }
}

#[async_trait]
impl Plugin for Exec {
    fn name(&self) -> &str {
        "exec"
    }

    async fn run(&self, ctx: &ExecutionContext, input: Batch) -> Result<Batch> {
        let mut cmd = command::command(ctx, &self.program, &self.args);
        cmd.args(input.iter().map(|record| record.path.as_os_str()));

        let output = command::run(&mut cmd).await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            ctx.log_message(stdout.trim_end());
        }

        Ok(input)
    }
}
