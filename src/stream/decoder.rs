//! Incremental UTF-8 decoding for chunked response bodies.
//!
//! Transport chunks do not respect character boundaries, so a multi-byte
//! sequence can arrive split across two reads. The decoder holds back the
//! incomplete tail and completes it with the next chunk.

const REPLACEMENT: char = char::REPLACEMENT_CHARACTER;

/// Lossy, incremental UTF-8 decoder.
///
/// Invalid bytes are replaced with U+FFFD, never reported as errors.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes and return all text completed by it.
    ///
    /// A trailing incomplete sequence (at most 3 bytes) is kept until the next
    /// call, so the result may be empty even for a non-empty chunk.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        // Fast path: chunk stands on its own.
        if self.pending.is_empty()
            && let Ok(s) = std::str::from_utf8(chunk)
        {
            return s.to_string();
        }
        self.pending.extend_from_slice(chunk);

        let buf = std::mem::take(&mut self.pending);
        let mut out = String::with_capacity(buf.len());
        let mut rest = buf.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(s) => {
                    out.push_str(s);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    // valid_up_to marks a verified boundary
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending.extend_from_slice(after);
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Flush the decoder at end of stream.
    ///
    /// A sequence that never completed becomes a single U+FFFD.
    pub fn finish(self) -> String {
        if self.pending.is_empty() {
            String::new()
        } else {
            REPLACEMENT.to_string()
        }
    }

    /// Check if there are buffered bytes waiting for completion.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_chunks(chunks: &[&[u8]]) -> (Vec<String>, String) {
        let mut decoder = Utf8Decoder::new();
        let parts: Vec<String> = chunks.iter().map(|c| decoder.decode(c)).collect();
        (parts, decoder.finish())
    }

    #[test]
    fn test_ascii_passthrough() {
        let (parts, tail) = decode_chunks(&[b"He", b"llo wor", b"ld"]);
        assert_eq!(parts, vec!["He", "llo wor", "ld"]);
        assert_eq!(tail, "");
    }

    #[test]
    fn test_split_two_byte_sequence() {
        // "é" = C3 A9
        let (parts, tail) = decode_chunks(&[b"caf\xC3", b"\xA9!"]);
        assert_eq!(parts, vec!["caf", "é!"]);
        assert_eq!(tail, "");
    }

    #[test]
    fn test_split_four_byte_sequence_across_three_chunks() {
        // "🦀" = F0 9F A6 80
        let (parts, tail) = decode_chunks(&[b"\xF0", b"\x9F\xA6", b"\x80 crab"]);
        assert_eq!(parts, vec!["", "", "🦀 crab"]);
        assert_eq!(tail, "");
    }

    #[test]
    fn test_invalid_byte_replaced() {
        let (parts, tail) = decode_chunks(&[b"a\xFFb"]);
        assert_eq!(parts, vec!["a\u{FFFD}b"]);
        assert_eq!(tail, "");
    }

    #[test]
    fn test_invalid_continuation_after_pending() {
        // C3 followed by a non-continuation byte: C3 is replaced, 'x' kept.
        let (parts, tail) = decode_chunks(&[b"\xC3", b"x"]);
        assert_eq!(parts, vec!["", "\u{FFFD}x"]);
        assert_eq!(tail, "");
    }

    #[test]
    fn test_truncated_sequence_at_end() {
        let mut decoder = Utf8Decoder::new();
        assert_eq!(decoder.decode(b"ok\xE2\x82"), "ok");
        assert!(decoder.has_pending());
        assert_eq!(decoder.finish(), "\u{FFFD}");
    }

    #[test]
    fn test_matches_lossy_for_every_split_point() {
        let input = "Привет, 世界 🦀!".as_bytes();
        let expected = String::from_utf8_lossy(input).into_owned();
        for split in 0..=input.len() {
            let (a, b) = input.split_at(split);
            let (parts, tail) = decode_chunks(&[a, b]);
            assert_eq!(parts.concat() + &tail, expected, "split at {split}");
        }
    }

    #[test]
    fn test_matches_lossy_with_invalid_bytes() {
        let input: &[u8] = b"ab\xF0\x9F\xFFcd\xED\xA0\x80e";
        let expected = String::from_utf8_lossy(input).into_owned();
        let chunks: Vec<&[u8]> = input.chunks(1).collect();
        let (parts, tail) = decode_chunks(&chunks);
        assert_eq!(parts.concat() + &tail, expected);
    }
}
