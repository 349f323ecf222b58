use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use exporter::config::Settings;
use tracing::Level;

/// Export Slurm queue state per account as Prometheus metrics.
#[derive(Debug, Clone, PartialEq, Parser)]
#[command(version, about)]
pub struct Args {
    /// TOML config file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// overrides `listen_address` from the config
    #[arg(long)]
    pub listen_address: Option<SocketAddr>,
    #[arg(long, default_value_t = Level::INFO)]
    pub log_level: Level,
    /// read the queue listing from this file on every scrape instead of running `squeue`
    #[arg(long)]
    pub from_file: Option<PathBuf>,
}

impl Args {
    /// `--listen-address` wins over the config
    pub fn listen_address(&self, settings: &Settings) -> SocketAddr {
        self.listen_address.unwrap_or(settings.listen_address)
    }
}
