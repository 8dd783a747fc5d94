//! Incremental byte-to-line decoding for streamed response bodies.

/// Turns arbitrarily split body chunks into complete text lines.
///
/// Bytes of a multi-byte character split across chunks are held back until
/// the rest arrives. Invalid sequences decode to U+FFFD. The text after the
/// last `\n` is buffered until a later chunk completes it or
/// [`finish`](Self::finish) flushes it.
#[derive(Debug, Default)]
pub struct LineBufferedDecoder {
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
    /// Decoded text not yet terminated by `\n`.
    line: String,
}

impl LineBufferedDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns every line it completed, without the
    /// terminating `\n`.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        self.decode_pending();
        self.take_lines()
    }

    /// Flushes held-back bytes lossily and returns the unterminated
    /// remainder, if any.
    pub fn finish(mut self) -> Option<String> {
        if !self.pending.is_empty() {
            let rest = String::from_utf8_lossy(&self.pending).into_owned();
            self.line.push_str(&rest);
            self.pending.clear();
        }

        (!self.line.is_empty()).then_some(self.line)
    }

    fn decode_pending(&mut self) {
        let mut consumed = 0;

        while consumed < self.pending.len() {
            match std::str::from_utf8(&self.pending[consumed..]) {
                Ok(text) => {
                    self.line.push_str(text);
                    consumed = self.pending.len();
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending[consumed..consumed + valid]) {
                        self.line.push_str(text);
                    }
                    consumed += valid;

                    match e.error_len() {
                        Some(invalid) => {
                            self.line.push(char::REPLACEMENT_CHARACTER);
                            consumed += invalid;
                        }
                        // Incomplete sequence at the end: wait for more bytes.
                        None => break,
                    }
                }
            }
        }

        self.pending.drain(..consumed);
    }

    fn take_lines(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;

        while let Some(offset) = self.line[start..].find('\n') {
            let end = start + offset;
            lines.push(self.line[start..end].to_string());
            start = end + 1;
        }

        self.line.drain(..start);
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_in_chunks(bytes: &[u8], sizes: &[usize]) -> Vec<String> {
        let mut decoder = LineBufferedDecoder::new();
        let mut lines = Vec::new();
        let mut rest = bytes;
        for &size in sizes {
            let size = size.min(rest.len());
            let (head, tail) = rest.split_at(size);
            lines.extend(decoder.push(head));
            rest = tail;
        }
        lines.extend(decoder.push(rest));
        lines.extend(decoder.finish());
        lines
    }

    #[test]
    fn test_splits_lines_and_buffers_remainder() {
        let mut decoder = LineBufferedDecoder::new();
        assert_eq!(decoder.push(b"data:He"), Vec::<String>::new());
        assert_eq!(decoder.push(b"llo\ndata:Wor"), vec!["data:Hello"]);
        assert_eq!(decoder.push(b"ld\n"), vec!["data:World"]);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn test_finish_returns_unterminated_line() {
        let mut decoder = LineBufferedDecoder::new();
        assert!(decoder.push(b"data:tail").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("data:tail"));
    }

    #[test]
    fn test_multibyte_split_is_not_corrupted() {
        let text = "data:你好 wörld\n";
        let bytes = text.as_bytes();
        // "你" occupies bytes 5..8; split inside it.
        let mut decoder = LineBufferedDecoder::new();
        assert!(decoder.push(&bytes[..6]).is_empty());
        assert!(decoder.push(&bytes[6..7]).is_empty());
        assert_eq!(decoder.push(&bytes[7..]), vec!["data:你好 wörld"]);
    }

    #[test]
    fn test_every_split_point_yields_same_lines() {
        let text = "data:Hé\ndata:\n: keepalive\ndata:🦀 crab\ndata:end";
        let bytes = text.as_bytes();
        let expected = decode_in_chunks(bytes, &[]);
        assert_eq!(
            expected,
            vec!["data:Hé", "data:", ": keepalive", "data:🦀 crab", "data:end"]
        );

        for split in 0..=bytes.len() {
            assert_eq!(decode_in_chunks(bytes, &[split]), expected, "split at {split}");
        }
        for a in 0..bytes.len() {
            for b in a..bytes.len() {
                assert_eq!(decode_in_chunks(bytes, &[a, b - a]), expected);
            }
        }
    }

    #[test]
    fn test_invalid_bytes_become_replacement_character() {
        let mut decoder = LineBufferedDecoder::new();
        assert_eq!(decoder.push(b"a\xffb\n"), vec!["a\u{FFFD}b"]);
    }

    #[test]
    fn test_truncated_sequence_flushed_lossily() {
        let mut decoder = LineBufferedDecoder::new();
        assert!(decoder.push(&"x你".as_bytes()[..2]).is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("x\u{FFFD}"));
    }

    #[test]
    fn test_crlf_keeps_carriage_return() {
        let mut decoder = LineBufferedDecoder::new();
        assert_eq!(decoder.push(b"data:a\r\n"), vec!["data:a\r"]);
    }
}
