//! `POST /upload`: stream a multipart body into temporary files.

use std::fmt::Write as _;

use bytes::Bytes;
use futures_util::future::BoxFuture;
use http_body_util::Full;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use spool_multipart::{receive_upload, UploadConfig, UploadError, Uploads};
use spool_telemetry::{log_upload_completed, log_upload_failed};

use crate::dispatch::{text_response, Handler, RequestContext};

/// Parses the request body with a fresh upload session per request.
#[derive(Debug, Clone)]
pub struct UploadHandler {
    config: UploadConfig,
    dev_mode: bool,
}

impl UploadHandler {
    pub fn new(config: UploadConfig, dev_mode: bool) -> Self {
        Self { config, dev_mode }
    }

    async fn receive(&self, mut ctx: RequestContext) -> Response<Full<Bytes>> {
        // a missing header fails as a configuration error before any read
        let content_type = ctx.header(CONTENT_TYPE.as_str()).unwrap_or("").to_string();

        match receive_upload(&content_type, &mut ctx.body, self.config.clone()).await {
            Ok(uploads) => {
                log_upload_completed!(
                    path = %ctx.path,
                    files = uploads.len(),
                    fields = uploads.fields().count(),
                );
                text_response(StatusCode::OK, render_uploads(&uploads))
            }
            Err(e) => {
                log_upload_failed!(path = %ctx.path, error = %e);
                self.error_response(&e)
            }
        }
    }

    fn error_response(&self, err: &UploadError) -> Response<Full<Bytes>> {
        let status = status_for(err);
        let body = if status.is_server_error() && !self.dev_mode {
            "internal server error\n".to_string()
        } else {
            format!("{}\n", err)
        };
        text_response(status, body)
    }
}

impl Handler for UploadHandler {
    fn invoke(&self, ctx: RequestContext) -> BoxFuture<'_, Response<Full<Bytes>>> {
        Box::pin(self.receive(ctx))
    }
}

/// HTTP status for a failed upload.
pub fn status_for(err: &UploadError) -> StatusCode {
    match err {
        UploadError::Configuration(_)
        | UploadError::Truncated { .. }
        | UploadError::MissingDelimiter => StatusCode::BAD_REQUEST,
        UploadError::HeadersTooLarge { .. } => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
        UploadError::FieldTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        UploadError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// One `filename<TAB>path` line per file, then one `name=value` line per field.
pub fn render_uploads(uploads: &Uploads) -> String {
    let mut out = String::new();
    for (filename, path) in uploads.files() {
        let _ = writeln!(out, "{}\t{}", filename, path.display());
    }
    for (name, value) in uploads.fields() {
        let _ = writeln!(out, "{}={}", name, value);
    }
    out
}
