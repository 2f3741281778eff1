//! Logging for the spool upload server and its parser.
//!
//! Every record carries an `event` field naming what happened; the
//! `log_*` macros fill it in from [`events`].
//!
//! ```ignore
//! use spool_telemetry::{LogFormat, LogWriter, Telemetry, TelemetryConfig};
//!
//! let telemetry = Telemetry::init(
//!     TelemetryConfig::new()
//!         .with_log_format(LogFormat::Pretty)
//!         .with_writer(LogWriter::Stderr),
//! )?;
//! ```

pub mod config;
pub mod logging;

pub use config::{LogFormat, LogWriter, TelemetryConfig};
pub use logging::events;

use std::time::Instant;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),
}

/// Process-wide logging handle, created once at startup.
pub struct Telemetry {
    config: TelemetryConfig,
    started: Instant,
}

impl Telemetry {
    /// Install the global subscriber described by `config`.
    pub fn init(config: TelemetryConfig) -> Result<Self, TelemetryError> {
        logging::init_logging(&config)?;
        Ok(Self::init_without_logging(config))
    }

    /// A handle for a process whose subscriber is already installed.
    pub fn init_without_logging(config: TelemetryConfig) -> Self {
        Self {
            config,
            started: Instant::now(),
        }
    }

    /// Emit the shutdown event with the process uptime.
    pub fn shutdown(&self) {
        crate::log_shutdown!(
            service = %self.config.service_name,
            uptime_secs = self.started.elapsed().as_secs(),
        );
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}
