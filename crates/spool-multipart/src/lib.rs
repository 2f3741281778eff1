//! Streaming `multipart/form-data` parser for file uploads.
//!
//! This crate provides:
//! - Boundary extraction from the request Content-Type
//! - A one-pass delimiter scanner that tolerates delimiters split across reads
//! - Part header parsing with `name`/`filename` extraction
//! - Payload streaming into uniquely named temporary files
//!
//! Memory use is bounded by the read size plus the header and field caps;
//! payload bytes are written out as soon as they cannot belong to a delimiter.
//!
//! # Usage
//!
//! ```ignore
//! use spool_multipart::{receive_upload, UploadConfig};
//!
//! let config = UploadConfig::new().with_base_dir("/var/spool/uploads");
//! let uploads = receive_upload(content_type, &mut body, config).await?;
//!
//! for (filename, path) in uploads.files() {
//!     println!("{} -> {}", filename, path.display());
//! }
//! ```

pub mod boundary;
pub mod buffer;
pub mod config;
pub mod error;
pub mod part;
pub mod scanner;
pub mod session;
pub mod sink;
pub mod uploads;

pub use boundary::Boundary;
pub use config::{
    FieldPolicy, UploadConfig, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FIELD_BYTES, DEFAULT_MAX_HEADER_BYTES,
};
pub use error::UploadError;
pub use part::Part;
pub use session::{receive_upload, ChunkReader, UploadSession};
pub use sink::StoredFile;
pub use uploads::Uploads;
