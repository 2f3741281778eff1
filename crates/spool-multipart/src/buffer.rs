//! Rolling scan buffer addressed by absolute stream offsets.
//!
//! Bytes are appended as chunks arrive and dropped from the front once
//! consumed. All positions handed out by the buffer are absolute offsets
//! into the request body, so they stay valid across compaction.

/// Growable byte window over the body stream.
#[derive(Debug, Default)]
pub struct ScanBuffer {
    bytes: Vec<u8>,
    /// Absolute offset of `bytes[0]`.
    base: u64,
    /// Everything before this offset has been handled.
    consumed_up_to: u64,
    /// Where the next delimiter search starts.
    scan_from: u64,
}

impl ScanBuffer {
    /// Create an empty buffer positioned at stream offset zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk read from the stream.
    pub fn extend(&mut self, chunk: &[u8]) {
        self.bytes.extend_from_slice(chunk);
    }

    /// Absolute offset one past the last buffered byte.
    pub fn end(&self) -> u64 {
        self.base + self.bytes.len() as u64
    }

    /// Absolute offset of the first retained byte.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Number of bytes currently retained.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn consumed_up_to(&self) -> u64 {
        self.consumed_up_to
    }

    pub fn scan_from(&self) -> u64 {
        self.scan_from
    }

    /// Mark everything before `offset` as handled. The scan cursor never
    /// trails the consumed cursor.
    pub fn consume_to(&mut self, offset: u64) {
        debug_assert!(offset <= self.end());
        self.consumed_up_to = self.consumed_up_to.max(offset);
        self.scan_from = self.scan_from.max(self.consumed_up_to);
    }

    /// Move the scan cursor. It is clamped to the consumed cursor.
    pub fn set_scan_from(&mut self, offset: u64) {
        self.scan_from = offset.max(self.consumed_up_to);
    }

    /// Bytes in `[from, to)`.
    pub fn range(&self, from: u64, to: u64) -> &[u8] {
        &self.bytes[self.index(from)..self.index(to)]
    }

    /// Bytes from `from` to the end of the buffer.
    pub fn tail(&self, from: u64) -> &[u8] {
        &self.bytes[self.index(from)..]
    }

    /// Drop every byte before the consumed cursor.
    pub fn compact(&mut self) {
        let drop = self.index(self.consumed_up_to);
        if drop > 0 {
            self.bytes.drain(..drop);
            self.base = self.consumed_up_to;
        }
    }

    fn index(&self, offset: u64) -> usize {
        debug_assert!(offset >= self.base && offset <= self.end());
        (offset - self.base) as usize
    }
}
