//! Command line interface

use clap::{Args, Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use crate::logging::default_log_dir;

#[derive(Parser, Debug)]
#[command(name = "secure-watch", version, about = "Evaluate camera detections against zone rules and send notifications")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Watch all configured cameras and serve the control API
    Run(RunArgs),

    /// Evaluate one camera's rules against a single JPEG, without notifying
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Address the control API binds to
    #[arg(short = 'b', long)]
    pub bind: IpAddr,

    /// Port of the control API
    #[arg(short = 'p', long)]
    pub port: u16,

    /// Verbose logging
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Directory for rotated log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Log a latency report every N evaluated frames
    #[arg(long, value_name = "N")]
    pub stats_every: Option<usize>,

    /// JSON configuration file
    pub config: PathBuf,
}

impl RunArgs {
    pub fn control_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(default_log_dir)
    }
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Verbose logging
    #[arg(short = 'd', long)]
    pub debug: bool,

    /// Directory for rotated log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// JSON configuration file
    pub config: PathBuf,

    /// Camera whose rules are evaluated
    pub camera: String,

    /// JPEG image to evaluate
    pub image: PathBuf,
}

impl CheckArgs {
    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(default_log_dir)
    }
}
