//! `startkit`: run pipelines once or keep them running on file changes.

mod commands;
mod logging;

use clap::{Parser, Subcommand};

use crate::commands::{FlowGenerateArgs, WatchArgs};

#[derive(Debug, Parser)]
#[command(name = "startkit")]
#[command(about = "Watch globs and re-run pipelines on every change")]
struct Cli {
    /// Log debug output (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a command over all matching files, then again for each change
    Watch(WatchArgs),

    /// Generate Flow type stubs for matching files
    FlowGenerate(FlowGenerateArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Watch(args) => commands::run_watch(args).await,
        Command::FlowGenerate(args) => commands::run_flow_generate(args).await,
    }
}
