//! Command-line arguments.

use std::net::Ipv4Addr;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "gt7-agent")]
#[command(about = "GT7 Telemetry Lap Saver")]
#[command(version)]
#[command(long_about = "
gt7-agent listens for Gran Turismo 7 telemetry on UDP port 33740, keeps the
console streaming with a periodic keepalive, and saves every completed lap
either as a JSON file or to the GT Telemetry backend.

Missing values (console address, storage choice, token) are asked for
interactively.
")]
pub struct Cli {
    /// PlayStation IPv4 address
    #[arg(long = "ps-ip", visible_alias = "ps_ip", value_name = "IPV4")]
    pub ps_ip: Option<Ipv4Addr>,

    /// Record only positional values to save the track layout
    #[arg(long)]
    pub track: bool,

    /// Store laps locally instead of uploading to GT Telemetry
    #[arg(long)]
    pub local: bool,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// JSON configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory for locally saved laps
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// GT Telemetry backend base URL
    #[arg(long, env = "GT7_BACKEND_URL", value_name = "URL")]
    pub backend_url: Option<String>,

    /// Backend JWT; prompted for when absent
    #[arg(long, env = "GT7_TOKEN", hide = true, hide_env_values = true)]
    pub token: Option<String>,
}
