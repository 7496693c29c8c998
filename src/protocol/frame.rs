//! Sentinel-delimited frame decoding.

/// Out-of-band marker separating frames on the wire (U+2403 U+1F51A U+2417).
pub const DELIMITER: &str = "\u{2403}\u{1F51A}\u{2417}";

/// Incremental splitter for the chat response body.
///
/// Chunk boundaries carry no meaning: a delimiter or a multi-byte character
/// may be split across any number of chunks. Bytes are buffered until a
/// full delimiter is seen, so frames are only decoded once complete.
///
/// ```
/// use khoj_chat::protocol::{FrameDecoder, DELIMITER};
///
/// let mut decoder = FrameDecoder::new();
/// let wire = format!("hello{DELIMITER}wor");
/// assert_eq!(decoder.push(wire.as_bytes()), vec!["hello".to_string()]);
/// assert!(decoder.push(b"ld").is_empty());
/// assert_eq!(decoder.finish(), Some("world".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
    // Offset before which the buffer is known not to contain a delimiter start.
    scanned: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every frame it completed, in order.
    /// Empty frames are dropped.
    pub fn push(&mut self, chunk: impl AsRef<[u8]>) -> Vec<String> {
        self.buffer.extend_from_slice(chunk.as_ref());

        let delimiter = DELIMITER.as_bytes();
        let mut frames = Vec::new();

        while let Some(index) = find(&self.buffer[self.scanned..], delimiter) {
            let end = self.scanned + index;
            let frame = decode(&self.buffer[..end]);
            self.buffer.drain(..end + delimiter.len());
            self.scanned = 0;
            if !frame.is_empty() {
                frames.push(frame);
            }
        }

        // A partial delimiter may sit at the tail; rescan only that window.
        self.scanned = self.buffer.len().saturating_sub(delimiter.len() - 1);
        frames
    }

    /// Text-chunk convenience for [`push`](Self::push).
    pub fn push_str(&mut self, chunk: &str) -> Vec<String> {
        self.push(chunk.as_bytes())
    }

    /// Signal end of stream. Returns the trailing frame, if any text
    /// remained without a closing delimiter.
    pub fn finish(&mut self) -> Option<String> {
        self.scanned = 0;
        if self.buffer.is_empty() {
            return None;
        }
        let frame = decode(&self.buffer);
        self.buffer.clear();
        (!frame.is_empty()).then_some(frame)
    }

    /// Bytes currently held waiting for a delimiter.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(err) => {
            tracing::warn!(
                valid_up_to = err.valid_up_to(),
                len = bytes.len(),
                "Frame is not valid UTF-8, decoding lossily"
            );
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(frames: &[&str]) -> String {
        frames.join(DELIMITER)
    }

    fn decode_in_chunks(input: &[u8], size: usize) -> Vec<String> {
        let mut decoder = FrameDecoder::new();
        let mut frames = Vec::new();
        for chunk in input.chunks(size) {
            frames.extend(decoder.push(chunk));
        }
        frames.extend(decoder.finish());
        frames
    }

    #[test]
    fn splits_on_delimiter_for_every_chunk_size() {
        let input = wire(&["frame1", "{\"type\":\"status\",\"data\":\"ok\"}", "frame3"]);
        for size in 1..=input.len() {
            assert_eq!(
                decode_in_chunks(input.as_bytes(), size),
                vec!["frame1", "{\"type\":\"status\",\"data\":\"ok\"}", "frame3"],
                "chunk size {size}"
            );
        }
    }

    #[test]
    fn delimiter_split_across_chunks_is_detected() {
        let delimiter = DELIMITER.as_bytes();
        let mut decoder = FrameDecoder::new();
        let mut first = b"abc".to_vec();
        first.extend_from_slice(&delimiter[..5]);
        assert!(decoder.push(&first).is_empty());
        let mut second = delimiter[5..].to_vec();
        second.extend_from_slice(b"def");
        assert_eq!(decoder.push(&second), vec!["abc"]);
        assert_eq!(decoder.finish().as_deref(), Some("def"));
    }

    #[test]
    fn consecutive_delimiters_yield_nothing() {
        let input = format!("{DELIMITER}{DELIMITER}");
        assert!(decode_in_chunks(input.as_bytes(), 2).is_empty());
    }

    #[test]
    fn multibyte_text_split_mid_character_survives() {
        let input = wire(&["héllo 🌍", "naïve"]);
        assert_eq!(decode_in_chunks(input.as_bytes(), 1), vec!["héllo 🌍", "naïve"]);
    }

    #[test]
    fn finish_on_empty_buffer_is_none() {
        let mut decoder = FrameDecoder::new();
        decoder.push_str(&format!("only{DELIMITER}"));
        assert_eq!(decoder.buffered_len(), 0);
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn partial_delimiter_prefix_at_end_is_emitted_as_text() {
        let delimiter = DELIMITER.as_bytes();
        let mut decoder = FrameDecoder::new();
        decoder.push(b"tail");
        decoder.push(&delimiter[..3]);
        let frame = decoder.finish().unwrap();
        assert!(frame.starts_with("tail"));
    }
}
