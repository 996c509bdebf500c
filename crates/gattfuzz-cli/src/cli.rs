//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::Overrides;

#[derive(Parser, Debug)]
#[command(author, version, about = "BLE GATT fuzzer", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for run logs
    #[arg(long, global = true)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List nearby BLE devices
    Scan,
    /// Connect to one device and fuzz every characteristic
    Fuzz(FuzzArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args, Debug, Default, Clone)]
pub struct FuzzArgs {
    /// Target device address; the first scanned device when omitted
    #[arg(short, long)]
    pub address: Option<String>,

    /// Writes per writable characteristic
    #[arg(long)]
    pub write_times: Option<u32>,

    /// Reads per readable characteristic
    #[arg(long)]
    pub read_times: Option<u32>,

    /// Seconds to listen for notifications
    #[arg(long)]
    pub notify_time: Option<u64>,

    /// Connect attempts before giving up
    #[arg(long)]
    pub reconnect_attempts: Option<u32>,

    /// Seconds to pause after each read or write
    #[arg(long)]
    pub write_delay: Option<f64>,

    /// Seed for reproducible payload selection
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Cli {
    /// Flag values that take precedence over every config source
    pub fn overrides(&self) -> Overrides {
        let mut overrides = match &self.command {
            Commands::Fuzz(args) => Overrides {
                write_times: args.write_times,
                read_times: args.read_times,
                notify_time_secs: args.notify_time,
                reconnect_attempts: args.reconnect_attempts,
                write_delay_secs: args.write_delay,
                seed: args.seed,
                ..Overrides::default()
            },
            _ => Overrides::default(),
        };
        overrides.log_dir = self.log_dir.clone();
        overrides
    }
}
