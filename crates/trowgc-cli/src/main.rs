use clap::Parser;
use tracing::Level;

mod cli;
mod commands;
mod settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
    commands::run_command(cli).await
}
