//! Process configuration: flags, environment and logging.

use crate::commands::Command;
use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Top-level arguments. Every flag can also come from a `RINGKV_*`
/// environment variable.
#[derive(Debug, Parser)]
#[command(name = "ringkv", version, about = "Peer-to-peer key-value store on a consistent hash ring")]
pub struct CliConfig {
    /// Log filter, e.g. `info` or `replication=debug,info`.
    #[arg(long, env = "RINGKV_LOG", default_value = "info", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    /// Initializes logging, runs the command on a fresh runtime and prints
    /// its result.
    pub fn run(self) -> anyhow::Result<()> {
        init_logging(&self.log)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context("failed to start async runtime")?;
        let result = runtime.block_on(self.command.execute())?;
        println!("{result}");
        Ok(())
    }
}

fn init_logging(filter: &str) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_new(filter).with_context(|| format!("invalid log filter {filter:?}"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err))
}
