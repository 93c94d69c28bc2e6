//! Tracing setup.
//!
//! Thin wrapper over `tracing-subscriber` so embedding applications get a
//! consistent logger. `RUST_LOG` overrides the default level.

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TraceFormat {
    /// Human-readable multi-line format.
    #[default]
    Pretty,
    /// Compact single-line format.
    Compact,
}

/// Configuration for tracing initialization.
#[derive(Debug, Clone)]
pub struct TraceConfig {
    /// Default log level when `RUST_LOG` is not set.
    pub default_level: Level,
    pub format: TraceFormat,
    /// Include the module path in log lines.
    pub include_target: bool,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            format: TraceFormat::Pretty,
            include_target: true,
        }
    }
}

impl TraceConfig {
    /// Builder: set the default level.
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    /// Builder: set the output format.
    pub fn with_format(mut self, format: TraceFormat) -> Self {
        self.format = format;
        self
    }
}

/// Initializes the global subscriber. Call once at startup.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
pub fn init_trace(
    config: TraceConfig,
) -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("synccast={}", config.default_level)));

    match config.format {
        TraceFormat::Pretty => {
            let subscriber = fmt()
                .pretty()
                .with_target(config.include_target)
                .with_env_filter(env_filter)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        TraceFormat::Compact => {
            let subscriber = fmt()
                .compact()
                .with_target(config.include_target)
                .with_env_filter(env_filter)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    }
}
