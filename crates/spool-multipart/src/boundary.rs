//! Boundary extraction from the request Content-Type.
//!
//! The boundary token is taken verbatim from the `boundary` parameter. The
//! parameter name is matched case-insensitively and a surrounding pair of
//! double quotes is stripped (RFC 2046 allows the token as a quoted-string).

use crate::UploadError;

/// RFC 2046 limits a boundary to 70 characters.
pub const MAX_BOUNDARY_LEN: usize = 70;

/// A multipart boundary token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    token: String,
}

impl Boundary {
    /// Create a boundary from a bare token.
    pub fn new(token: impl Into<String>) -> Result<Self, UploadError> {
        let token = token.into();
        validate_token(&token)?;
        Ok(Self { token })
    }

    /// Extract the boundary from a Content-Type header value.
    pub fn from_content_type(content_type: &str) -> Result<Self, UploadError> {
        let mut params = content_type.split(';');
        // The media type itself never carries the boundary.
        params.next();

        for param in params {
            let Some((name, value)) = param.split_once('=') else {
                continue;
            };
            if !name.trim().eq_ignore_ascii_case("boundary") {
                continue;
            }
            let value = value.trim();
            let token = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            return Self::new(token);
        }

        Err(UploadError::Configuration(format!(
            "missing boundary parameter in content type '{}'",
            content_type
        )))
    }

    /// The bare token.
    pub fn token(&self) -> &str {
        &self.token
    }

    /// `--{boundary}`, the delimiter that opens a part.
    pub fn delimiter(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.token.len() + 2);
        bytes.extend_from_slice(b"--");
        bytes.extend_from_slice(self.token.as_bytes());
        bytes
    }

    /// `\r\n--{boundary}`, the delimiter as it appears after a payload.
    pub fn close_delimiter(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.token.len() + 4);
        bytes.extend_from_slice(b"\r\n--");
        bytes.extend_from_slice(self.token.as_bytes());
        bytes
    }

    /// `--{boundary}--`, the delimiter that ends the body.
    pub fn terminal_delimiter(&self) -> Vec<u8> {
        let mut bytes = self.delimiter();
        bytes.extend_from_slice(b"--");
        bytes
    }
}

fn validate_token(token: &str) -> Result<(), UploadError> {
    if token.is_empty() {
        return Err(UploadError::Configuration(
            "boundary parameter is empty".to_string(),
        ));
    }

    if token.len() > MAX_BOUNDARY_LEN {
        return Err(UploadError::Configuration(format!(
            "boundary is {} characters, limit is {}",
            token.len(),
            MAX_BOUNDARY_LEN
        )));
    }

    if token.bytes().any(|b| b == b'\r' || b == b'\n' || b == b'"') {
        return Err(UploadError::Configuration(
            "boundary contains invalid characters".to_string(),
        ));
    }

    Ok(())
}
