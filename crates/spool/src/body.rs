//! Request body as a byte stream.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::BodyExt;
use hyper::body::Body;
use tokio::io::{AsyncRead, ReadBuf};

/// Boxed error type carried by request bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Adapts an HTTP body into [`AsyncRead`].
///
/// Data frames are handed out in order; trailer frames are skipped. A body
/// error surfaces as an I/O error on the read that hits it.
pub struct BodyReader {
    body: UnsyncBoxBody<Bytes, BoxError>,
    pending: Bytes,
    done: bool,
}

impl BodyReader {
    pub fn new<B>(body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        Self {
            body: body.map_err(Into::into).boxed_unsync(),
            pending: Bytes::new(),
            done: false,
        }
    }
}

impl std::fmt::Debug for BodyReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BodyReader")
            .field("pending", &self.pending.len())
            .field("done", &self.done)
            .finish()
    }
}

impl AsyncRead for BodyReader {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();

        loop {
            if !this.pending.is_empty() {
                let n = this.pending.len().min(buf.remaining());
                buf.put_slice(&this.pending[..n]);
                this.pending.advance(n);
                return Poll::Ready(Ok(()));
            }

            if this.done {
                return Poll::Ready(Ok(()));
            }

            match Pin::new(&mut this.body).poll_frame(cx) {
                Poll::Ready(Some(Ok(frame))) => {
                    // trailers carry nothing for the parser
                    if let Ok(data) = frame.into_data() {
                        this.pending = data;
                    }
                }
                Poll::Ready(Some(Err(e))) => {
                    this.done = true;
                    return Poll::Ready(Err(io::Error::other(e)));
                }
                Poll::Ready(None) => this.done = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;
    use http_body_util::{Full, StreamBody};
    use hyper::body::Frame;
    use hyper::HeaderMap;
    use std::convert::Infallible;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn reads_full_body() {
        let mut reader = BodyReader::new(Full::new(Bytes::from_static(b"hello world")));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"hello world");
    }

    #[tokio::test]
    async fn small_reads_split_frames() {
        let mut reader = BodyReader::new(Full::new(Bytes::from_static(b"abcdef")));
        let mut buf = [0u8; 4];

        assert_eq!(reader.read(&mut buf).await.unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(reader.read(&mut buf).await.unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn skips_trailers_and_joins_frames() {
        let frames = vec![
            Ok::<_, Infallible>(Frame::data(Bytes::from_static(b"one,"))),
            Ok(Frame::data(Bytes::new())),
            Ok(Frame::data(Bytes::from_static(b"two"))),
            Ok(Frame::trailers(HeaderMap::new())),
        ];
        let mut reader = BodyReader::new(StreamBody::new(stream::iter(frames)));
        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();
        assert_eq!(out, b"one,two");
    }

    #[tokio::test]
    async fn body_error_becomes_io_error() {
        let frames: Vec<Result<Frame<Bytes>, BoxError>> = vec![
            Ok(Frame::data(Bytes::from_static(b"partial"))),
            Err("connection reset".into()),
        ];
        let mut reader = BodyReader::new(StreamBody::new(stream::iter(frames)));
        let mut out = Vec::new();
        let err = reader.read_to_end(&mut out).await.unwrap_err();
        assert!(err.to_string().contains("connection reset"));
        assert_eq!(out, b"partial");
    }
}
