//! Tracing subscriber installation
//!
//! MCP servers speak their protocol over stdout, so every log line is
//! written to stderr. The filter comes from `RUST_LOG` when set.

use std::io;

use serde::{Deserialize, Serialize};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, EnvFilter};

/// Level used when `RUST_LOG` is absent or unparsable
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber
///
/// Fails if a global subscriber is already set, which callers that may
/// initialise twice (tests, embedding hosts) can ignore.
pub fn init_tracing(format: LogFormat) -> Result<(), TryInitError> {
    let (pretty, json) = match format {
        LogFormat::Pretty => (Some(fmt::layer().with_target(true).with_writer(io::stderr)), None),
        LogFormat::Json => (
            None,
            Some(fmt::layer().json().with_current_span(true).with_writer(io::stderr)),
        ),
    };

    tracing_subscriber::registry().with(env_filter()).with(pretty).with(json).try_init()?;

    tracing::debug!(?format, "tracing initialized");
    Ok(())
}
