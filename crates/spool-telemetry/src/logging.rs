//! Subscriber setup, event names and the log macros used across spool.

use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::{LogFormat, LogWriter, TelemetryConfig, TelemetryError};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    // RUST_LOG wins over the configured level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(build_layer(config.log_format, config.writer).with_filter(filter))
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

fn make_writer(writer: LogWriter) -> BoxMakeWriter {
    match writer {
        LogWriter::Stdout => BoxMakeWriter::new(std::io::stdout),
        LogWriter::Stderr => BoxMakeWriter::new(std::io::stderr),
    }
}

fn build_layer(format: LogFormat, writer: LogWriter) -> BoxedLayer {
    let writer = make_writer(writer);
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(writer)
            .with_current_span(true)
            .with_span_list(false)
            .flatten_event(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(writer)
            .with_file(false)
            .boxed(),
    }
}

/// Values of the `event` field.
pub mod events {
    pub const STARTUP: &str = "startup";
    pub const LISTENING: &str = "listening";
    pub const REQUEST_COMPLETED: &str = "request_completed";
    pub const UPLOAD_COMPLETED: &str = "upload_completed";
    pub const UPLOAD_FAILED: &str = "upload_failed";
    /// A part's payload is complete on disk.
    pub const PART_STORED: &str = "part_stored";
    pub const SHUTDOWN: &str = "shutdown";
}

#[macro_export]
macro_rules! log_startup {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::STARTUP, $($field)*)
    };
}

#[macro_export]
macro_rules! log_listening {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::LISTENING, $($field)*)
    };
}

#[macro_export]
macro_rules! log_request_completed {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::REQUEST_COMPLETED, $($field)*)
    };
}

#[macro_export]
macro_rules! log_upload_completed {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::UPLOAD_COMPLETED, $($field)*)
    };
}

/// Logged at warn level.
#[macro_export]
macro_rules! log_upload_failed {
    ($($field:tt)*) => {
        tracing::warn!(event = $crate::logging::events::UPLOAD_FAILED, $($field)*)
    };
}

/// Logged at debug level.
#[macro_export]
macro_rules! log_part_stored {
    ($($field:tt)*) => {
        tracing::debug!(event = $crate::logging::events::PART_STORED, $($field)*)
    };
}

#[macro_export]
macro_rules! log_shutdown {
    ($($field:tt)*) => {
        tracing::info!(event = $crate::logging::events::SHUTDOWN, $($field)*)
    };
}
