//! Error types for multipart upload sessions.

use thiserror::Error;

/// Errors that can occur while parsing a multipart upload.
#[derive(Debug, Error)]
pub enum UploadError {
    /// The Content-Type header has no usable `boundary` parameter.
    #[error("invalid multipart configuration: {0}")]
    Configuration(String),

    /// Reading the body or writing a temporary file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended while a part was still open.
    #[error("upload truncated: stream ended inside part #{part}{}", describe_filename(.filename))]
    Truncated {
        part: usize,
        filename: Option<String>,
    },

    /// The body contained bytes but never a multipart delimiter.
    #[error("no multipart delimiter found in body")]
    MissingDelimiter,

    /// A part's header block grew beyond the configured cap.
    #[error("header block of part #{part} exceeds limit of {limit} bytes")]
    HeadersTooLarge { part: usize, limit: usize },

    /// An in-memory form field grew beyond the configured cap.
    #[error("field '{name}' exceeds limit of {limit} bytes")]
    FieldTooLarge { name: String, limit: usize },
}

impl UploadError {
    /// Returns true if the error was raised before any body byte was read.
    pub fn is_configuration(&self) -> bool {
        matches!(self, UploadError::Configuration(_))
    }

    /// Returns true if the stream ended before the upload was complete.
    pub fn is_truncated(&self) -> bool {
        matches!(self, UploadError::Truncated { .. })
    }
}

fn describe_filename(filename: &Option<String>) -> String {
    match filename {
        Some(name) => format!(" ('{}')", name),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncated_message_names_the_file() {
        let err = UploadError::Truncated {
            part: 2,
            filename: Some("b.bin".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "upload truncated: stream ended inside part #2 ('b.bin')"
        );
        assert!(err.is_truncated());
        assert!(!err.is_configuration());
    }

    #[test]
    fn truncated_message_without_filename() {
        let err = UploadError::Truncated {
            part: 1,
            filename: None,
        };
        assert_eq!(err.to_string(), "upload truncated: stream ended inside part #1");
    }

    #[test]
    fn io_errors_convert() {
        let err: UploadError = std::io::Error::other("disk full").into();
        assert!(matches!(err, UploadError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: disk full");
    }
}
