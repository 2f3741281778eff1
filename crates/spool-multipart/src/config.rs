//! Upload session configuration.

use std::path::PathBuf;

/// Default read size per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default cap on a single part's header block (8 KB).
pub const DEFAULT_MAX_HEADER_BYTES: usize = 8 * 1024;

/// Default cap on an in-memory form field value (64 KB).
pub const DEFAULT_MAX_FIELD_BYTES: usize = 64 * 1024;

/// What to do with parts that carry no filename.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FieldPolicy {
    /// Capture the value in memory as a form field.
    #[default]
    InMemory,
    /// Spool it to a temporary file like any file part, keyed by field name.
    File,
}

impl FieldPolicy {
    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => Some(Self::InMemory),
            "file" => Some(Self::File),
            _ => None,
        }
    }
}

/// Upload session configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Directory where temporary files are created (default: ".").
    pub base_dir: PathBuf,

    /// Bytes requested per read from the body stream (default: 1024).
    pub chunk_size: usize,

    /// Handling of parts without a filename.
    pub field_policy: FieldPolicy,

    /// Maximum size of one part's header block in bytes.
    pub max_header_bytes: usize,

    /// Maximum size of an in-memory field value in bytes.
    pub max_field_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            chunk_size: DEFAULT_CHUNK_SIZE,
            field_policy: FieldPolicy::default(),
            max_header_bytes: DEFAULT_MAX_HEADER_BYTES,
            max_field_bytes: DEFAULT_MAX_FIELD_BYTES,
        }
    }
}

impl UploadConfig {
    /// Create a new upload config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the temporary file directory.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = dir.into();
        self
    }

    /// Set the read size. Zero is raised to one byte.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Set the field policy.
    pub fn with_field_policy(mut self, policy: FieldPolicy) -> Self {
        self.field_policy = policy;
        self
    }

    /// Set the header block cap.
    pub fn with_max_header_bytes(mut self, bytes: usize) -> Self {
        self.max_header_bytes = bytes;
        self
    }

    /// Set the in-memory field cap.
    pub fn with_max_field_bytes(mut self, bytes: usize) -> Self {
        self.max_field_bytes = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = UploadConfig::default();
        assert_eq!(config.base_dir, PathBuf::from("."));
        assert_eq!(config.chunk_size, 1024);
        assert_eq!(config.field_policy, FieldPolicy::InMemory);
        assert_eq!(config.max_header_bytes, 8 * 1024);
        assert_eq!(config.max_field_bytes, 64 * 1024);
    }

    #[test]
    fn config_builder() {
        let config = UploadConfig::new()
            .with_base_dir("/tmp/uploads")
            .with_chunk_size(7)
            .with_field_policy(FieldPolicy::File)
            .with_max_header_bytes(512)
            .with_max_field_bytes(16);

        assert_eq!(config.base_dir, PathBuf::from("/tmp/uploads"));
        assert_eq!(config.chunk_size, 7);
        assert_eq!(config.field_policy, FieldPolicy::File);
        assert_eq!(config.max_header_bytes, 512);
        assert_eq!(config.max_field_bytes, 16);
    }

    #[test]
    fn chunk_size_never_zero() {
        assert_eq!(UploadConfig::new().with_chunk_size(0).chunk_size, 1);
    }

    #[test]
    fn field_policy_parse() {
        assert_eq!(FieldPolicy::parse("memory"), Some(FieldPolicy::InMemory));
        assert_eq!(FieldPolicy::parse("In-Memory"), Some(FieldPolicy::InMemory));
        assert_eq!(FieldPolicy::parse("FILE"), Some(FieldPolicy::File));
        assert_eq!(FieldPolicy::parse("disk"), None);
    }
}
