//! Part state and header-block parsing.

use memchr::memmem;

use crate::buffer::ScanBuffer;
use crate::UploadError;

/// One section of a multipart body.
///
/// Offsets are absolute positions in the request body. `data_end` is only
/// known once the delimiter that closes the part has been seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Part {
    index: usize,
    headers: Vec<(String, String)>,
    name: Option<String>,
    filename: Option<String>,
    data_start: u64,
    data_end: Option<u64>,
    header_complete: bool,
    complete: bool,
}

impl Part {
    fn new(index: usize) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    /// 1-based position of the part in the body.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Headers in arrival order.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Look up a header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Form field name from Content-Disposition.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Declared filename from Content-Disposition.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    pub fn data_start(&self) -> u64 {
        self.data_start
    }

    /// Payload length, once the part is complete.
    pub fn data_len(&self) -> Option<u64> {
        self.data_end.map(|end| end - self.data_start)
    }

    pub fn is_header_complete(&self) -> bool {
        self.header_complete
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Store a raw header line. Lines without a `name: value` shape are
    /// skipped. A repeated name overwrites the earlier value in place.
    fn push_header_line(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let Some((name, value)) = line.split_once(':') else {
            return;
        };
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let value = value.trim().to_string();

        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(existing) => existing.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    fn close_header(&mut self, data_start: u64) {
        if let Some(disposition) = self.header("content-disposition") {
            let (name, filename) = parse_disposition(disposition);
            self.name = name;
            self.filename = filename;
        }
        self.data_start = data_start;
        self.header_complete = true;
    }
}

/// Progress of the active part's header block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderProgress {
    /// The empty line was seen; payload starts at `data_start`.
    Complete,
    /// More bytes are needed to finish the header block.
    Incomplete,
}

/// Tracks the single active part between delimiters.
#[derive(Debug)]
pub struct PartAccumulator {
    active: Option<Part>,
    started: usize,
    header_bytes: usize,
    max_header_bytes: usize,
}

impl PartAccumulator {
    pub fn new(max_header_bytes: usize) -> Self {
        Self {
            active: None,
            started: 0,
            header_bytes: 0,
            max_header_bytes,
        }
    }

    /// Start a new part after a delimiter.
    pub fn begin(&mut self) -> &Part {
        self.started += 1;
        self.header_bytes = 0;
        self.active.insert(Part::new(self.started))
    }

    pub fn active(&self) -> Option<&Part> {
        self.active.as_ref()
    }

    /// Number of parts started so far.
    pub fn started(&self) -> usize {
        self.started
    }

    /// Consume complete header lines from the buffer's consumed cursor.
    ///
    /// Each line is committed as soon as its CRLF is seen, so a header block
    /// may span any number of reads.
    pub fn read_headers(&mut self, buf: &mut ScanBuffer) -> Result<HeaderProgress, UploadError> {
        let Some(part) = self.active.as_mut() else {
            return Ok(HeaderProgress::Incomplete);
        };

        loop {
            let from = buf.consumed_up_to();
            let rest = buf.tail(from);

            let Some(eol) = memmem::find(rest, b"\r\n") else {
                if self.header_bytes + rest.len() > self.max_header_bytes {
                    return Err(UploadError::HeadersTooLarge {
                        part: part.index,
                        limit: self.max_header_bytes,
                    });
                }
                return Ok(HeaderProgress::Incomplete);
            };

            self.header_bytes += eol + 2;
            if self.header_bytes > self.max_header_bytes {
                return Err(UploadError::HeadersTooLarge {
                    part: part.index,
                    limit: self.max_header_bytes,
                });
            }

            let next = from + eol as u64 + 2;
            if eol == 0 {
                part.close_header(next);
                buf.consume_to(next);
                return Ok(HeaderProgress::Complete);
            }

            part.push_header_line(&rest[..eol]);
            buf.consume_to(next);
        }
    }

    /// Close the active part's data span at `data_end` and hand it back.
    pub fn finish(&mut self, data_end: u64) -> Option<Part> {
        let mut part = self.active.take()?;
        part.data_end = Some(data_end.max(part.data_start));
        part.complete = true;
        Some(part)
    }
}

/// Extract `name` and `filename` from a Content-Disposition value.
pub fn parse_disposition(value: &str) -> (Option<String>, Option<String>) {
    let mut name = None;
    let mut filename = None;

    // The first segment is the disposition type (`form-data`).
    for param in split_params(value).into_iter().skip(1) {
        let Some((key, raw)) = param.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.eq_ignore_ascii_case("name") {
            name = Some(unquote(raw.trim()));
        } else if key.eq_ignore_ascii_case("filename") {
            filename = Some(unquote(raw.trim()));
        }
    }

    (name, filename)
}

/// Split on `;` outside of quoted strings.
fn split_params(value: &str) -> Vec<&str> {
    let mut params = Vec::new();
    let mut in_quotes = false;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                params.push(&value[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    params.push(&value[start..]);
    params
}

fn unquote(value: &str) -> String {
    let Some(inner) = value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
