//! Logging configuration.

/// Log record layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable records.
    Pretty,
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Stream log records are written to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogWriter {
    /// The server's default.
    #[default]
    Stdout,
    /// Keeps stdout free for command output.
    Stderr,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Reported on the startup and shutdown events.
    pub service_name: String,

    /// Filter directive (default: "info"). `RUST_LOG` takes precedence.
    pub log_level: String,

    pub log_format: LogFormat,

    pub writer: LogWriter,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "spool".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            writer: LogWriter::default(),
        }
    }
}

impl TelemetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn with_log_format(mut self, format: LogFormat) -> Self {
        self.log_format = format;
        self
    }

    pub fn with_writer(mut self, writer: LogWriter) -> Self {
        self.writer = writer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_log_json_to_stdout() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "spool");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.writer, LogWriter::Stdout);
    }

    #[test]
    fn builder_sets_every_field() {
        let config = TelemetryConfig::new()
            .with_service_name("spool-parse")
            .with_log_level("warn")
            .with_log_format(LogFormat::Pretty)
            .with_writer(LogWriter::Stderr);

        assert_eq!(config.service_name, "spool-parse");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.writer, LogWriter::Stderr);
    }

    #[test]
    fn log_format_parse_ignores_case() {
        assert_eq!(LogFormat::parse("JSON"), Some(LogFormat::Json));
        assert_eq!(LogFormat::parse("pretty"), Some(LogFormat::Pretty));
        assert_eq!(LogFormat::parse("compact"), None);
    }
}
