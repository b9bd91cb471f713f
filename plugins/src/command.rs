//! Spawning external commands on behalf of a plugin.

use std::fmt::Write as _;
use std::process::Output;

use startkit_plugin::{ExecutionContext, PluginError, Result};
use tokio::process::Command;
use tracing::debug;

/// Build a command that inherits the context's environment and working
/// directory.
pub(crate) fn command<I, S>(ctx: &ExecutionContext, program: &str, args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<std::ffi::OsStr>,
{
    let mut cmd = Command::new(program);
    cmd.args(args).envs(&ctx.env).kill_on_drop(true);
    if let Some(dir) = &ctx.working_dir {
        cmd.current_dir(dir);
    }
    cmd
}

/// Render a command line for logs and errors.
pub(crate) fn display(cmd: &Command) -> String {
    let std_cmd = cmd.as_std();
    let mut line = std_cmd.get_program().to_string_lossy().into_owned();
    for arg in std_cmd.get_args() {
        let _ = write!(line, " {}", arg.to_string_lossy());
    }
    line
}

/// Run to completion, failing on a non-zero exit.
pub(crate) async fn run(cmd: &mut Command) -> Result<Output> {
    let line = display(cmd);
    debug!("Running {line}");

    let output = cmd.output().await?;
    if !output.status.success() {
        return Err(PluginError::CommandFailed {
            command: line,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim_end().to_string(),
        });
    }
    Ok(output)
}
