pub mod commands;
pub mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use config::Config;

#[derive(Parser)]
#[command(name = "otlp-pipeline-receiver")]
#[command(about = "Receive OTLP/JSON logs and forward them as flat records to Cloudflare Pipelines")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the OTLP/HTTP logs receiver
    Serve(ServeArgs),
    /// Flatten an OTLP/JSON logs file and print NDJSON records to stdout
    Transform(TransformArgs),
}

#[derive(clap::Args, Debug, Default)]
pub struct ServeArgs {
    /// Path to a TOML config file (defaults to .otlp-pipeline-receiver.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR")]
    pub listen: Option<String>,

    /// Cloudflare Pipelines HTTP ingest URL for logs
    #[arg(long, env = "PIPELINE_LOGS")]
    pub pipeline_url: Option<String>,

    /// Bearer token for the pipeline endpoint
    #[arg(long, env = "PIPELINE_AUTH_TOKEN", hide_env_values = true)]
    pub pipeline_token: Option<String>,

    /// Per-request timeout for pipeline sends, in seconds
    #[arg(long)]
    pub send_timeout_secs: Option<u64>,

    /// Maximum array/kvlist nesting decoded inside a value
    #[arg(long, env = "MAX_VALUE_DEPTH")]
    pub max_value_depth: Option<usize>,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_FORMAT_JSON")]
    pub json_logs: bool,
}

impl ServeArgs {
    /// Layer flags and environment variables over a loaded config.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(listen) = &self.listen {
            config.listen = listen.clone();
        }
        if let Some(url) = &self.pipeline_url {
            config.pipeline_url = Some(url.clone());
        }
        if let Some(token) = &self.pipeline_token {
            config.pipeline_token = Some(token.clone());
        }
        if let Some(secs) = self.send_timeout_secs {
            config.send_timeout_secs = secs;
        }
        if let Some(depth) = self.max_value_depth {
            config.max_value_depth = depth;
        }
        if self.json_logs {
            config.json_logs = true;
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct TransformArgs {
    /// OTLP/JSON logs file, optionally gzipped ('-' reads stdin)
    pub input: PathBuf,

    /// Maximum array/kvlist nesting decoded inside a value
    #[arg(long, env = "MAX_VALUE_DEPTH", default_value_t = crate::convert::DEFAULT_MAX_VALUE_DEPTH)]
    pub max_value_depth: usize,
}
