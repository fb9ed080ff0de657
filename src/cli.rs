/// CLI argument parsing

use clap::{Args, Parser, Subcommand};
use std::str::FromStr;

use crate::core::SettingsOverrides;

// Build timestamp injected at compile time
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

// Get version with timestamp
pub fn get_version() -> &'static str {
    VERSION_WITH_BUILD
}

#[derive(Parser)]
#[command(name = "dockmon")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Prometheus base URL (overrides DOCKMON_API_BASE_URL and the config file)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Poll interval, e.g. 5s or 1500ms
    #[arg(long, global = true)]
    pub interval: Option<String>,

    /// Samples kept per host in each metric window
    #[arg(long, global = true)]
    pub points_per_host: Option<usize>,
}

impl GlobalArgs {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            api_base_url: self.api_url.clone(),
            poll_interval: self.interval.clone(),
            points_per_host: self.points_per_host,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll once and show container counts and per-host usage
    Status {
        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Poll once and list containers
    Containers {
        /// Filter by status (all, running, stopped)
        #[arg(short, long, default_value = "all")]
        status: String,

        /// Only containers reported by this instance
        #[arg(short, long)]
        instance: Option<String>,

        /// Sort column (name, image, status, instance, uptime)
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,

        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Poll once and print the host/container graph
    Graph {
        /// Output format (text, json, yaml)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Stream a summary line per poll tick
    Watch {
        /// Record summaries to a file
        #[arg(short, long)]
        record: Option<String>,

        /// Recording format (text, json, csv)
        #[arg(short, long, default_value = "text")]
        format: String,

        /// Stop after this many snapshots
        #[arg(short = 'n', long)]
        count: Option<u64>,
    },

    /// Run the HTTP API server
    Serve {
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Allow cross-origin requests
        #[arg(long)]
        cors: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate a random API token for DOCKMON_WEB_TOKEN
    Token,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective settings and where they come from
    Show,
    /// Save the Prometheus base URL to the config file
    SetUrl { url: String },
    /// Save the poll interval to the config file
    SetInterval { interval: String },
    /// Remove saved settings
    Reset,
}

/// Output format for one-shot commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "table" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(format!("unknown output format `{}` (text, json, yaml)", other)),
        }
    }
}
