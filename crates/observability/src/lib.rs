//! Logging setup for keeper.
//!
//! [`LogArgs`] is a clap argument group that doubles as a serde config
//! section. [`init_logging`] turns it into a global tracing subscriber.

#![warn(missing_docs)]

use clap::Args;
use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Logging configuration.
#[derive(Debug, Args, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[command(next_help_heading = "Logging")]
#[serde(default)]
pub struct LogArgs {
    /// Silence all output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Verbose mode (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    #[serde(skip)]
    pub verbosity: u8,

    /// Log filter directive (e.g., "keeper=debug,redb=info").
    #[arg(long = "log.filter", value_name = "DIRECTIVE")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Use JSON format for log output.
    #[arg(long = "log.json")]
    pub json: bool,
}

impl LogArgs {
    /// Level for keeper crates implied by the verbosity count.
    pub fn level(&self) -> Level {
        match self.verbosity {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Filter directive used when `RUST_LOG` is not set.
    pub fn directive(&self) -> String {
        match &self.filter {
            Some(filter) => filter.clone(),
            None => format!("info,keeper={}", self.level().as_str().to_lowercase()),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Does nothing when `quiet` is set. Fails if a global subscriber is
/// already installed.
pub fn init_logging(args: &LogArgs) -> eyre::Result<()> {
    if args.quiet {
        return Ok(());
    }

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(args.directive()))?;

    let stdout_layer = fmt::Layer::new().with_ansi(!args.json).with_target(true);
    let stdout_layer = if args.json {
        stdout_layer.json().boxed()
    } else {
        stdout_layer.boxed()
    };

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(env_filter)
        .try_init()?;

    Ok(())
}
