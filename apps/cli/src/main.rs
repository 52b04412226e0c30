//! syncreport CLI: GitOps application versions as a living Markdown report.
//!
//! Fetches the application list from the controller, groups it by
//! environment, application, and cluster, and keeps a marked section of a
//! status document up to date.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
