mod cli;
mod commands;
mod run;
mod wire;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Command};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,callmark=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "callmark starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("callmark-worker")
        .build()
        .context("failed to start async runtime")?;

    match cli.command() {
        Command::Run => run::run(&cli, &runtime),
        command => runtime.block_on(commands::execute(&cli, command)),
    }
}
