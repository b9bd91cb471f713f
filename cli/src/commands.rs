//! Subcommand implementations.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use startkit_plugin::{ExecutionContext, Plugin, Sequence};
use startkit_plugins::{exec, find, flow_generate};
use startkit_watch::{EventKind, WatchConfig, WatchHandle, WatchPipeline, watch};
use tracing::info;

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// TOML file with a `[watch]` section.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Glob pattern to watch. Repeatable.
    #[arg(short = 'g', long = "glob", value_name = "GLOB")]
    pub globs: Vec<String>,

    /// Event kind that re-runs the command (add, addDir, change, unlink,
    /// unlinkDir). Repeatable; defaults to add and change.
    #[arg(short = 'e', long = "event", value_name = "EVENT")]
    pub events: Vec<EventKind>,

    /// Glob pattern to ignore. Repeatable.
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignored: Vec<String>,

    /// Poll the filesystem instead of using native notifications.
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Base directory for relative globs.
    #[arg(long, value_name = "DIR")]
    pub cwd: Option<PathBuf>,

    /// Run once over the matching files and exit.
    #[arg(long)]
    pub once: bool,

    /// Program to run, followed by its arguments. Changed paths are appended.
    #[arg(last = true, required = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl WatchArgs {
    /// Merge flags over the config file, if any.
    pub fn watch_config(&self) -> Result<WatchConfig> {
        let mut config = match &self.config {
            Some(path) => WatchConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => WatchConfig::with_patterns(Vec::<String>::new()),
        };

        config.patterns.extend(self.globs.iter().cloned());
        if !self.events.is_empty() {
            config.events = self.events.clone();
        }
        config.options.ignored.extend(self.ignored.iter().cloned());
        if let Some(ms) = self.poll_interval_ms {
            config.options = config.options.with_poll_interval(Duration::from_millis(ms));
        }
        if let Some(cwd) = &self.cwd {
            config.options = config.options.with_cwd(cwd);
        }
        if self.once {
            config.options.persistent = false;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Args)]
pub struct FlowGenerateArgs {
    /// Glob patterns selecting the sources.
    #[arg(required = true, value_name = "GLOB")]
    pub globs: Vec<String>,

    /// Directory receiving the generated `.flow` files.
    #[arg(long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Flow executable to use instead of `node node_modules/.bin/flow`.
    #[arg(long, value_name = "PROGRAM")]
    pub flow: Option<String>,

    /// Keep regenerating as sources change.
    #[arg(long)]
    pub watch: bool,

    /// Extra arguments passed through to `flow gen-flow-files`.
    #[arg(last = true, value_name = "FLOW_ARGS")]
    pub flow_args: Vec<String>,
}

/// Run the command over every match, then again for each change.
pub async fn run_watch(args: WatchArgs) -> Result<()> {
    let (pipeline, ctx) = watch_exec(&args)?;
    until_ctrl_c(pipeline.spawn(ctx)).await
}

/// Build the watched `exec` pipeline and the context it runs in.
///
/// Reported paths are relative to the watch's base directory, so the command
/// runs there too.
fn watch_exec(args: &WatchArgs) -> Result<(WatchPipeline, ExecutionContext)> {
    let config = args.watch_config()?;
    let Some((program, program_args)) = args.command.split_first() else {
        bail!("a command to run is required");
    };
    let ctx = ExecutionContext::new().with_working_dir(config.options.resolve_cwd()?);

    info!("Watching {}", config.patterns.join(", "));
    let pipeline = watch(config).wrap(exec(program.clone(), program_args.to_vec()));
    Ok((pipeline, ctx))
}

/// Generate Flow stubs once, or on every change with `--watch`.
pub async fn run_flow_generate(args: FlowGenerateArgs) -> Result<()> {
    let mut generate = flow_generate(args.out_dir, args.flow_args);
    if let Some(flow) = args.flow {
        generate = generate.with_program(flow, Vec::<String>::new());
    }

    if args.watch {
        let handle = watch(WatchConfig::with_patterns(args.globs))
            .wrap(generate)
            .spawn(ExecutionContext::new());
        return until_ctrl_c(handle).await;
    }

    let pipeline = Sequence::new().then(find(args.globs)).then(generate);
    let output = pipeline.run(&ExecutionContext::new(), Vec::new()).await?;
    info!("Generated {} flow files", output.len());
    Ok(())
}

async fn until_ctrl_c(handle: WatchHandle) -> Result<()> {
    handle
        .stop_on(async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        })
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cli, Command};
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use startkit_plugin::{MemoryReporter, Report};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn watch_args(argv: &[&str]) -> WatchArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Watch(args) => args,
            other => panic!("expected watch, got {other:?}"),
        }
    }

    #[test]
    fn test_flags_build_config() {
        let args = watch_args(&[
            "startkit", "watch", "-g", "src/**/*.ts", "-e", "unlink", "-e", "add", "--ignore",
            "**/build/**", "--poll-interval-ms", "200", "--once", "--", "make", "test",
        ]);
        let config = args.watch_config().unwrap();

        assert_eq!(config.patterns, vec!["src/**/*.ts".to_string()]);
        assert_eq!(config.events, vec![EventKind::Unlink, EventKind::Add]);
        assert_eq!(config.options.ignored, vec!["**/build/**".to_string()]);
        assert_eq!(config.options.poll_interval_ms, Some(200));
        assert!(!config.options.persistent);
        assert_eq!(args.command, vec!["make".to_string(), "test".to_string()]);
    }

    #[test]
    fn test_flags_extend_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("startkit.toml");
        std::fs::write(
            &path,
            "[watch]\npatterns = [\"lib/*.js\"]\nevents = [\"change\"]\n\n[watch.options]\nignored = [\"**/vendor/**\"]\n",
        )
        .unwrap();

        let args = watch_args(&[
            "startkit",
            "watch",
            "--config",
            path.to_str().unwrap(),
            "-g",
            "test/*.js",
            "--",
            "npm",
            "test",
        ]);
        let config = args.watch_config().unwrap();

        assert_eq!(
            config.patterns,
            vec!["lib/*.js".to_string(), "test/*.js".to_string()]
        );
        assert_eq!(config.events, vec![EventKind::Change]);
        assert_eq!(config.options.ignored, vec!["**/vendor/**".to_string()]);
        assert!(config.options.persistent);
    }

    #[test]
    fn test_missing_globs_is_an_error() {
        let args = watch_args(&["startkit", "watch", "--", "make"]);
        assert!(args.watch_config().is_err());
    }

    #[test]
    fn test_unknown_event_is_rejected_by_parser() {
        let result = Cli::try_parse_from(["startkit", "watch", "-g", "*.ts", "-e", "renamed", "--", "make"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_command_is_required() {
        let result = Cli::try_parse_from(["startkit", "watch", "-g", "*.ts"]);
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_watch_runs_command_in_cwd() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.txt"), "alpha").unwrap();

        let args = watch_args(&[
            "startkit",
            "watch",
            "--cwd",
            temp_dir.path().to_str().unwrap(),
            "-g",
            "*.txt",
            "--once",
            "--",
            "cat",
        ]);
        let (pipeline, ctx) = watch_exec(&args).unwrap();
        let reporter = Arc::new(MemoryReporter::new());
        let ctx = ctx.with_reporter(reporter.clone());

        pipeline.watch(&ctx).await.unwrap();

        let errors: Vec<Report> = reporter
            .entries()
            .into_iter()
            .filter(|entry| matches!(entry, Report::Error { .. }))
            .collect();
        assert_eq!(errors, Vec::<Report>::new());
    }

    #[test]
    fn test_flow_generate_args() {
        let cli = Cli::try_parse_from([
            "startkit",
            "flow-generate",
            "src/**/*.js",
            "--out-dir",
            "build",
            "--",
            "--strip-root",
        ])
        .unwrap();

        match cli.command {
            Command::FlowGenerate(args) => {
                assert_eq!(args.globs, vec!["src/**/*.js".to_string()]);
                assert_eq!(args.out_dir, PathBuf::from("build"));
                assert_eq!(args.flow_args, vec!["--strip-root".to_string()]);
                assert!(!args.watch);
            }
            other => panic!("expected flow-generate, got {other:?}"),
        }
    }
}
