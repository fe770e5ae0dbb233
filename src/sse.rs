//! Line-oriented decoder for server-sent-event style bodies.
//!
//! Handles:
//! - Partial lines across TCP chunks
//! - LF, CRLF and bare CR line endings
//! - Optional `data: ` prefixes
//! - Buffer compaction to prevent unbounded growth

use bytes::{Buf, BytesMut};
use memchr::memchr2;
use serde_json::Value;

/// Prefix stripped from event lines before JSON decoding.
pub const DATA_PREFIX: &[u8] = b"data: ";

/// Splits a byte stream into lines without copying them out of the buffer.
pub struct LineDecoder {
    buffer: BytesMut,
    /// Offset of unconsumed data in buffer.
    consumed: usize,
    /// Last line ended in `\r`; a `\n` that follows belongs to it.
    pending_cr: bool,
}

impl LineDecoder {
    /// Create a new decoder with default buffer capacity.
    pub fn new() -> Self {
        Self::with_capacity(8192)
    }

    /// Create a new decoder with specified initial capacity.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(cap),
            consumed: 0,
            pending_cr: false,
        }
    }

    /// Feed bytes into the decoder.
    #[inline]
    pub fn feed(&mut self, data: &[u8]) {
        // Compact buffer if we've consumed more than half
        if self.consumed > self.buffer.len() / 2 && self.consumed > 4096 {
            self.compact();
        }
        self.buffer.extend_from_slice(data);
    }

    fn compact(&mut self) {
        if self.consumed > 0 {
            self.buffer.advance(self.consumed);
            self.consumed = 0;
        }
    }

    /// Drop the `\n` of a CRLF pair whose `\r` ended the previous line.
    fn skip_pending_lf(&mut self) {
        if !self.pending_cr {
            return;
        }
        match self.buffer.get(self.consumed) {
            Some(b'\n') => {
                self.consumed += 1;
                self.pending_cr = false;
            }
            Some(_) => self.pending_cr = false,
            // Pair may be split across chunks
            None => {}
        }
    }

    /// Next complete line, without its terminator.
    /// Returns `None` if more data is needed.
    pub fn next_line(&mut self) -> Option<&[u8]> {
        self.skip_pending_lf();

        let start = self.consumed;
        let end = start + memchr2(b'\n', b'\r', &self.buffer[start..])?;

        if self.buffer[end] == b'\r' {
            match self.buffer.get(end + 1) {
                Some(b'\n') => self.consumed = end + 2,
                Some(_) => self.consumed = end + 1,
                None => {
                    self.consumed = end + 1;
                    self.pending_cr = true;
                }
            }
        } else {
            self.consumed = end + 1;
        }

        Some(&self.buffer[start..end])
    }

    /// Take whatever is left once the body has ended.
    pub fn finish(&mut self) -> Option<&[u8]> {
        self.skip_pending_lf();
        self.pending_cr = false;

        let start = self.consumed;
        if start >= self.buffer.len() {
            return None;
        }
        self.consumed = self.buffer.len();

        Some(&self.buffer[start..])
    }

    /// Bytes buffered but not yet returned as a line.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len() - self.consumed
    }
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one line into a JSON value.
///
/// Blank lines, keep-alives, `[DONE]` and anything else that is not JSON yield `None`.
pub fn decode_line(line: &[u8]) -> Option<Value> {
    if line.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line);
    serde_json::from_slice(payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_simple_line() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"data: hello world\n");

        assert_eq!(decoder.next_line().unwrap(), b"data: hello world");
        assert!(decoder.next_line().is_none());
    }

    #[test]
    fn test_crlf() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"data: hello\r\n\r\n");

        assert_eq!(decoder.next_line().unwrap(), b"data: hello");
        assert_eq!(decoder.next_line().unwrap(), b"");
    }

    #[test]
    fn test_bare_cr() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"data: a\rdata: b\r");

        assert_eq!(decoder.next_line().unwrap(), b"data: a");
        assert_eq!(decoder.next_line().unwrap(), b"data: b");
        assert!(decoder.next_line().is_none());
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_crlf_split_across_chunks() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"first\r");
        assert_eq!(decoder.next_line().unwrap(), b"first");
        assert!(decoder.next_line().is_none());

        // The LF completes the pair instead of producing an empty line
        decoder.feed(b"\nsecond\n");
        assert_eq!(decoder.next_line().unwrap(), b"second");
        assert!(decoder.next_line().is_none());
    }

    #[test]
    fn test_blank_line_after_cr() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"a\r\rb\n");

        assert_eq!(decoder.next_line().unwrap(), b"a");
        assert_eq!(decoder.next_line().unwrap(), b"");
        assert_eq!(decoder.next_line().unwrap(), b"b");
    }

    #[test]
    fn test_partial_line() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"data: {\"a\"");
        assert!(decoder.next_line().is_none());

        decoder.feed(b":1}\n");
        assert_eq!(decoder.next_line().unwrap(), b"data: {\"a\":1}");
    }

    #[test]
    fn test_coalesced_lines() {
        let mut decoder = LineDecoder::new();
        // Multiple lines in one TCP frame
        decoder.feed(b"a\n\nb\nc\n");

        assert_eq!(decoder.next_line().unwrap(), b"a");
        assert_eq!(decoder.next_line().unwrap(), b"");
        assert_eq!(decoder.next_line().unwrap(), b"b");
        assert_eq!(decoder.next_line().unwrap(), b"c");
        assert!(decoder.next_line().is_none());
        assert_eq!(decoder.buffer_len(), 0);
    }

    #[test]
    fn test_finish_returns_tail() {
        let mut decoder = LineDecoder::new();
        decoder.feed(b"first\n{\"tail\":true}");

        assert_eq!(decoder.next_line().unwrap(), b"first");
        assert!(decoder.next_line().is_none());
        assert_eq!(decoder.finish().unwrap(), b"{\"tail\":true}");
        assert!(decoder.finish().is_none());
    }

    #[test]
    fn test_compaction_keeps_pending_bytes() {
        let mut decoder = LineDecoder::with_capacity(16);
        let long = vec![b'x'; 5000];
        decoder.feed(&long);
        decoder.feed(b"\npartial");
        assert_eq!(decoder.next_line().unwrap().len(), 5000);

        decoder.feed(b" line\n");
        assert_eq!(decoder.next_line().unwrap(), b"partial line");
    }

    #[test]
    fn test_decode_data_prefix() {
        assert_eq!(decode_line(b"data: {\"a\":1}"), Some(json!({"a": 1})));
        assert_eq!(decode_line(b"{\"a\":2}"), Some(json!({"a": 2})));
    }

    #[test]
    fn test_decode_skips_noise() {
        assert!(decode_line(b"").is_none());
        assert!(decode_line(b"   \t").is_none());
        assert!(decode_line(b"not json").is_none());
        assert!(decode_line(b"data: [DONE]").is_none());
        assert!(decode_line(b": keep-alive").is_none());
        assert!(decode_line(b"data: {\"truncated\":").is_none());
        assert!(decode_line(&[0xff, 0xfe]).is_none());
    }

    #[test]
    fn test_prefix_without_space_is_not_stripped() {
        assert!(decode_line(b"data:{\"a\":1}").is_none());
    }
}
