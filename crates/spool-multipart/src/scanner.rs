//! Delimiter search over the rolling buffer.
//!
//! A delimiter only counts at a line start: the scanner searches for
//! `\r\n--{boundary}`, except for the very first delimiter, which may also
//! sit at stream offset zero without a preceding CRLF. Once the boundary
//! bytes match, the bytes after them decide what the occurrence is:
//! `--` ends the body, optional whitespace plus CRLF opens another part, and
//! anything else means the match was payload that merely resembles a
//! delimiter.

use memchr::memmem::Finder;

use crate::buffer::ScanBuffer;
use crate::Boundary;

/// Longest run of spaces and tabs accepted between a boundary and its line
/// break. A longer run makes the match payload.
pub const MAX_TRANSPORT_PADDING: usize = 64;

/// What a confirmed delimiter introduces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Another part follows; its header block starts at `headers_at`.
    Part { headers_at: u64 },
    /// The terminal delimiter; the body is over.
    Terminal,
}

/// Outcome of one search pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan {
    /// A full delimiter. `start` is the first byte of the line break that
    /// precedes it (or zero for a delimiter at the very start of the body).
    Found { start: u64, kind: Delimiter },
    /// The boundary matched at `start` but the bytes that classify it have
    /// not arrived yet.
    Pending { start: u64 },
    /// No delimiter. No occurrence can begin before `resume_at`.
    NotFound { resume_at: u64 },
}

/// Byte-level delimiter scanner for one boundary.
#[derive(Debug)]
pub struct BoundaryScanner {
    delimiter: Vec<u8>,
    close: Finder<'static>,
}

impl BoundaryScanner {
    pub fn new(boundary: &Boundary) -> Self {
        Self {
            delimiter: boundary.delimiter(),
            close: Finder::new(&boundary.close_delimiter()).into_owned(),
        }
    }

    /// Length of the line-start delimiter pattern `\r\n--{boundary}`.
    pub fn pattern_len(&self) -> usize {
        self.close.needle().len()
    }

    /// Search for the first delimiter of the body, before any part exists.
    pub fn find_opening(&self, buf: &ScanBuffer) -> Scan {
        if buf.scan_from() == 0 {
            let head = buf.tail(0);
            if head.len() < self.delimiter.len() {
                if self.delimiter.starts_with(head) {
                    return Scan::Pending { start: 0 };
                }
            } else if head.starts_with(&self.delimiter) {
                match classify(buf, self.delimiter.len() as u64) {
                    Tail::Delimiter(kind) => return Scan::Found { start: 0, kind },
                    Tail::Incomplete => return Scan::Pending { start: 0 },
                    Tail::Payload => {}
                }
            }
        }

        self.find_close(buf)
    }

    /// Search for the next line-start delimiter from the buffer's scan cursor.
    pub fn find_close(&self, buf: &ScanBuffer) -> Scan {
        let mut from = buf.scan_from();

        loop {
            let Some(i) = self.close.find(buf.tail(from)) else {
                let resume_at = buf
                    .end()
                    .saturating_sub(self.pattern_len() as u64 - 1)
                    .max(from);
                return Scan::NotFound { resume_at };
            };

            let start = from + i as u64;
            match classify(buf, start + self.pattern_len() as u64) {
                Tail::Delimiter(kind) => return Scan::Found { start, kind },
                Tail::Incomplete => return Scan::Pending { start },
                Tail::Payload => from = start + 1,
            }
        }
    }
}

enum Tail {
    Delimiter(Delimiter),
    Incomplete,
    Payload,
}

/// Inspect the bytes right after a boundary match ending at `after`.
fn classify(buf: &ScanBuffer, after: u64) -> Tail {
    let rest = buf.tail(after);
    if rest.len() < 2 {
        return Tail::Incomplete;
    }
    if rest.starts_with(b"--") {
        return Tail::Delimiter(Delimiter::Terminal);
    }

    // RFC 2046 transport padding before the line break.
    let padding = rest
        .iter()
        .take(MAX_TRANSPORT_PADDING + 1)
        .take_while(|b| **b == b' ' || **b == b'\t')
        .count();
    if padding > MAX_TRANSPORT_PADDING {
        return Tail::Payload;
    }
    match &rest[padding..] {
        [] | [b'\r'] => Tail::Incomplete,
        [b'\r', b'\n', ..] => Tail::Delimiter(Delimiter::Part {
            headers_at: after + padding as u64 + 2,
        }),
        _ => Tail::Payload,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> BoundaryScanner {
        BoundaryScanner::new(&Boundary::new("XYZ").unwrap())
    }

    fn buffer(bytes: &[u8]) -> ScanBuffer {
        let mut buf = ScanBuffer::new();
        buf.extend(bytes);
        buf
    }

    #[test]
    fn opening_delimiter_at_stream_start() {
        let buf = buffer(b"--XYZ\r\nContent-Disposition: form-data\r\n");
        assert_eq!(
            scanner().find_opening(&buf),
            Scan::Found {
                start: 0,
                kind: Delimiter::Part { headers_at: 7 }
            }
        );
    }

    #[test]
    fn opening_delimiter_after_preamble() {
        let buf = buffer(b"preamble text\r\n--XYZ\r\n");
        assert_eq!(
            scanner().find_opening(&buf),
            Scan::Found {
                start: 13,
                kind: Delimiter::Part { headers_at: 22 }
            }
        );
    }

    #[test]
    fn partial_opening_is_pending() {
        assert_eq!(
            scanner().find_opening(&buffer(b"--X")),
            Scan::Pending { start: 0 }
        );
        assert_eq!(
            scanner().find_opening(&buffer(b"--XYZ\r")),
            Scan::Pending { start: 0 }
        );
    }

    #[test]
    fn boundary_not_at_line_start_is_ignored() {
        let buf = buffer(b"payload--XYZ\r\nmore payload");
        assert!(matches!(scanner().find_close(&buf), Scan::NotFound { .. }));
    }

    #[test]
    fn close_delimiter_inside_payload() {
        let buf = buffer(b"hello\r\n--XYZ\r\nnext");
        assert_eq!(
            scanner().find_close(&buf),
            Scan::Found {
                start: 5,
                kind: Delimiter::Part { headers_at: 14 }
            }
        );
    }

    #[test]
    fn terminal_delimiter() {
        let buf = buffer(b"hello\r\n--XYZ--\r\n");
        assert_eq!(
            scanner().find_close(&buf),
            Scan::Found {
                start: 5,
                kind: Delimiter::Terminal
            }
        );
    }

    #[test]
    fn longer_token_is_payload() {
        let buf = buffer(b"a\r\n--XYZW\r\nb\r\n--XYZ--");
        assert_eq!(
            scanner().find_close(&buf),
            Scan::Found {
                start: 12,
                kind: Delimiter::Terminal
            }
        );
    }

    #[test]
    fn transport_padding_before_line_break() {
        let buf = buffer(b"a\r\n--XYZ  \t\r\nnext");
        assert_eq!(
            scanner().find_close(&buf),
            Scan::Found {
                start: 1,
                kind: Delimiter::Part { headers_at: 13 }
            }
        );
    }

    #[test]
    fn overlong_padding_is_payload() {
        let mut bytes = b"a\r\n--XYZ".to_vec();
        bytes.extend(std::iter::repeat(b' ').take(MAX_TRANSPORT_PADDING + 1));
        let buf = buffer(&bytes);
        assert!(matches!(
            scanner().find_close(&buf),
            Scan::NotFound { .. }
        ));

        // At the cap, the match is still waiting for its line break.
        let mut bytes = b"a\r\n--XYZ".to_vec();
        bytes.extend(std::iter::repeat(b'\t').take(MAX_TRANSPORT_PADDING));
        let buf = buffer(&bytes);
        assert_eq!(scanner().find_close(&buf), Scan::Pending { start: 1 });
    }

    #[test]
    fn missing_tail_is_pending() {
        let buf = buffer(b"abc\r\n--XYZ");
        assert_eq!(scanner().find_close(&buf), Scan::Pending { start: 3 });
    }

    #[test]
    fn resume_point_keeps_pattern_overlap() {
        // Pattern is "\r\n--XYZ" (7 bytes); the last 6 bytes may start a match.
        let buf = buffer(b"0123456789\r\n--X");
        assert_eq!(
            scanner().find_close(&buf),
            Scan::NotFound { resume_at: 9 }
        );
    }

    #[test]
    fn resume_point_never_moves_backwards() {
        let mut buf = buffer(b"0123");
        buf.set_scan_from(3);
        assert_eq!(
            scanner().find_close(&buf),
            Scan::NotFound { resume_at: 3 }
        );
    }
}
