//! Upload session: the read → scan → emit loop.
//!
//! One session consumes one request body. Each chunk is appended to the
//! scan buffer, the parse state advances as far as the buffered bytes allow,
//! confirmed payload is written out, and the buffer is trimmed back to the
//! bytes that may still belong to an unfinished delimiter or header line.

use std::future::Future;
use std::io;

use spool_telemetry::log_part_stored;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::Instrument;

use crate::buffer::ScanBuffer;
use crate::part::{HeaderProgress, PartAccumulator};
use crate::scanner::{BoundaryScanner, Delimiter, Scan};
use crate::sink::PartSink;
use crate::{Boundary, FieldPolicy, UploadConfig, UploadError, Uploads};

/// Source of request body chunks.
///
/// A zero-length read means the stream has ended. Every tokio
/// [`AsyncRead`] is a chunk reader.
pub trait ChunkReader {
    fn read_chunk<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<usize>> + Send + 'a;
}

impl<R: AsyncRead + Unpin + Send> ChunkReader for R {
    fn read_chunk<'a>(
        &'a mut self,
        buf: &'a mut [u8],
    ) -> impl Future<Output = io::Result<usize>> + Send + 'a {
        self.read(buf)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// Before the first delimiter.
    Preamble,
    /// Inside a part's header block.
    Headers,
    /// Inside a part's payload.
    Body(Target),
    /// After the terminal delimiter.
    Epilogue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    File,
    Field,
}

#[derive(Debug)]
struct FieldCapture {
    name: String,
    value: Vec<u8>,
}

/// Parses one multipart body into temporary files.
#[derive(Debug)]
pub struct UploadSession {
    config: UploadConfig,
    scanner: BoundaryScanner,
    buffer: ScanBuffer,
    parts: PartAccumulator,
    sink: PartSink,
    phase: Phase,
    field: Option<FieldCapture>,
    uploads: Uploads,
    span: tracing::Span,
}

impl UploadSession {
    /// Prepare a session for a request with the given Content-Type.
    ///
    /// Fails with [`UploadError::Configuration`] when the header carries no
    /// usable boundary; nothing is read from the body in that case.
    pub fn new(content_type: &str, config: UploadConfig) -> Result<Self, UploadError> {
        let boundary = Boundary::from_content_type(content_type)?;
        Ok(Self::with_boundary(boundary, config))
    }

    /// Prepare a session for an already-parsed boundary.
    pub fn with_boundary(boundary: Boundary, config: UploadConfig) -> Self {
        let span = tracing::debug_span!("upload", boundary = %boundary.token());
        Self {
            scanner: BoundaryScanner::new(&boundary),
            buffer: ScanBuffer::new(),
            parts: PartAccumulator::new(config.max_header_bytes),
            sink: PartSink::new(config.base_dir.clone()),
            phase: Phase::Preamble,
            field: None,
            uploads: Uploads::new(),
            config,
            span,
        }
    }

    /// Consume the body stream to its end and return the collected uploads.
    pub async fn run<R>(self, reader: &mut R) -> Result<Uploads, UploadError>
    where
        R: ChunkReader + Send,
    {
        let span = self.span.clone();
        self.drive(reader).instrument(span).await
    }

    async fn drive<R>(mut self, reader: &mut R) -> Result<Uploads, UploadError>
    where
        R: ChunkReader + Send,
    {
        let mut chunk = vec![0u8; self.config.chunk_size];

        loop {
            let read = reader.read_chunk(&mut chunk).await?;
            if read == 0 {
                break;
            }

            self.buffer.extend(&chunk[..read]);
            self.advance().await?;
            self.buffer.compact();
        }

        self.finish().await
    }

    /// Advance the parse state as far as the buffered bytes allow.
    async fn advance(&mut self) -> Result<(), UploadError> {
        loop {
            match self.phase {
                Phase::Preamble => match self.scanner.find_opening(&self.buffer) {
                    Scan::Found { kind, .. } => self.on_delimiter(kind),
                    Scan::Pending { start } => {
                        self.buffer.consume_to(start);
                        self.buffer.set_scan_from(start);
                        return Ok(());
                    }
                    Scan::NotFound { resume_at } => {
                        self.buffer.consume_to(resume_at);
                        return Ok(());
                    }
                },
                Phase::Headers => match self.parts.read_headers(&mut self.buffer)? {
                    HeaderProgress::Complete => self.open_target().await?,
                    HeaderProgress::Incomplete => return Ok(()),
                },
                Phase::Body(target) => match self.scanner.find_close(&self.buffer) {
                    Scan::Found { start, kind } => {
                        self.emit(target, start).await?;
                        self.complete_part(target, start).await?;
                        self.on_delimiter(kind);
                    }
                    Scan::Pending { start } => {
                        self.emit(target, start).await?;
                        self.buffer.set_scan_from(start);
                        return Ok(());
                    }
                    Scan::NotFound { resume_at } => {
                        self.emit(target, resume_at).await?;
                        return Ok(());
                    }
                },
                Phase::Epilogue => {
                    let end = self.buffer.end();
                    self.buffer.consume_to(end);
                    return Ok(());
                }
            }
        }
    }

    fn on_delimiter(&mut self, kind: Delimiter) {
        match kind {
            Delimiter::Part { headers_at } => {
                self.buffer.consume_to(headers_at);
                let part = self.parts.begin();
                tracing::trace!(part = part.index(), "part started");
                self.phase = Phase::Headers;
            }
            Delimiter::Terminal => {
                let end = self.buffer.end();
                self.buffer.consume_to(end);
                self.phase = Phase::Epilogue;
            }
        }
    }

    /// The header block is done: decide where the payload goes.
    async fn open_target(&mut self) -> Result<(), UploadError> {
        let Some(part) = self.parts.active() else {
            return Ok(());
        };

        let key = match (part.filename(), self.config.field_policy) {
            (Some(filename), _) => Some(filename.to_string()),
            (None, FieldPolicy::File) => Some(part.name().unwrap_or_default().to_string()),
            (None, FieldPolicy::InMemory) => None,
        };
        let index = part.index();

        match key {
            Some(key) => {
                let path = self.sink.open().await?;
                tracing::debug!(
                    part = index,
                    filename = %key,
                    path = %path.display(),
                    "opened temporary file"
                );
                if let Some(replaced) = self.uploads.insert_file(key, path) {
                    tracing::warn!(
                        part = index,
                        orphaned = %replaced.display(),
                        "duplicate filename, keeping the later part"
                    );
                }
                self.phase = Phase::Body(Target::File);
            }
            None => {
                self.field = Some(FieldCapture {
                    name: part.name().unwrap_or_default().to_string(),
                    value: Vec::new(),
                });
                self.phase = Phase::Body(Target::Field);
            }
        }

        Ok(())
    }

    /// Hand payload bytes up to `upto` to the active target.
    async fn emit(&mut self, target: Target, upto: u64) -> Result<(), UploadError> {
        let from = self.buffer.consumed_up_to();
        if upto <= from {
            return Ok(());
        }

        let bytes = self.buffer.range(from, upto);
        match target {
            Target::File => self.sink.write(bytes).await?,
            Target::Field => {
                if let Some(field) = self.field.as_mut() {
                    if field.value.len() + bytes.len() > self.config.max_field_bytes {
                        return Err(UploadError::FieldTooLarge {
                            name: field.name.clone(),
                            limit: self.config.max_field_bytes,
                        });
                    }
                    field.value.extend_from_slice(bytes);
                }
            }
        }

        self.buffer.consume_to(upto);
        Ok(())
    }

    async fn complete_part(&mut self, target: Target, data_end: u64) -> Result<(), UploadError> {
        let Some(part) = self.parts.finish(data_end) else {
            return Ok(());
        };

        match target {
            Target::File => {
                if let Some(stored) = self.sink.close().await? {
                    log_part_stored!(
                        part = part.index(),
                        filename = part.filename().unwrap_or_default(),
                        path = %stored.path.display(),
                        size_bytes = stored.size,
                        "part stored"
                    );
                }
            }
            Target::Field => {
                if let Some(field) = self.field.take() {
                    let value = String::from_utf8_lossy(&field.value).into_owned();
                    self.uploads.insert_field(field.name, value);
                }
            }
        }

        Ok(())
    }

    async fn finish(mut self) -> Result<Uploads, UploadError> {
        match self.phase {
            Phase::Epilogue => {
                tracing::debug!(
                    parts = self.parts.started(),
                    files = self.uploads.len(),
                    "upload complete"
                );
                Ok(self.uploads)
            }
            Phase::Preamble if self.buffer.end() == 0 => Ok(self.uploads),
            Phase::Preamble => Err(UploadError::MissingDelimiter),
            Phase::Headers | Phase::Body(_) => {
                // Release the handle; the partial file stays on disk.
                if let Err(e) = self.sink.close().await {
                    tracing::warn!(error = %e, "failed to flush truncated part");
                }
                let (part, filename) = match self.parts.active() {
                    Some(part) => (part.index(), part.filename().map(str::to_string)),
                    None => (self.parts.started(), None),
                };
                Err(UploadError::Truncated { part, filename })
            }
        }
    }
}

/// Parse a multipart body into temporary files.
///
/// Shorthand for [`UploadSession::new`] followed by [`UploadSession::run`].
pub async fn receive_upload<R>(
    content_type: &str,
    reader: &mut R,
    config: UploadConfig,
) -> Result<Uploads, UploadError>
where
    R: ChunkReader + Send,
{
    UploadSession::new(content_type, config)?.run(reader).await
}
