//! Server-Sent Events framing.
//!
//! Splits a chunked HTTP body into SSE frames. The `data` of each frame is
//! the raw payload later handed to [`crate::event::decode`].

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
}

/// Incremental SSE decoder; chunk boundaries may fall anywhere.
///
/// An incomplete trailing frame is kept buffered and never emitted if the
/// body ends before its terminating blank line.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
    // Prefix of `pending` already scanned for a blank line.
    searched: usize,
}

/// Longest blank-line delimiter (`\r\n\r\n`) minus one byte.
const DELIMITER_OVERLAP: usize = 3;

impl SseDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.pending.extend_from_slice(chunk);
        let mut frames = Vec::new();
        loop {
            let from = self.searched.saturating_sub(DELIMITER_OVERLAP);
            let Some((end, delimiter_len)) = next_blank_line(&self.pending, from) else {
                self.searched = self.pending.len();
                return frames;
            };
            let block: Vec<u8> = self.pending.drain(..end + delimiter_len).collect();
            self.searched = 0;
            if let Some(frame) = SseFrame::from_block(&block[..end]) {
                frames.push(frame);
            }
        }
    }

    /// Number of bytes waiting for a frame delimiter.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Finds the first `\n\n` or `\r\n\r\n` at or after `from`, returning its
/// start and length.
fn next_blank_line(buf: &[u8], from: usize) -> Option<(usize, usize)> {
    (from..buf.len()).find_map(|at| {
        let rest = &buf[at..];
        if rest.starts_with(b"\n\n") {
            Some((at, 2))
        } else if rest.starts_with(b"\r\n\r\n") {
            Some((at, 4))
        } else {
            None
        }
    })
}

impl SseFrame {
    /// Parses one event block. Blocks without any `data` field (comments,
    /// keep-alives, bare `event:` lines) yield nothing.
    fn from_block(block: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(block);
        let mut event = None;
        let mut data: Option<String> = None;
        for line in text.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);
            if line.is_empty() || line.starts_with(':') {
                continue;
            }
            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            match field {
                "data" => match data.as_mut() {
                    Some(joined) => {
                        joined.push('\n');
                        joined.push_str(value);
                    }
                    None => data = Some(value.to_string()),
                },
                "event" => event = Some(value.to_string()),
                _ => {}
            }
        }
        data.map(|data| Self { event, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_partial_chunk_boundaries() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b"data: {\"type\":\"llm_token\",\"data\":\"Hel");
        assert!(frames.is_empty());
        assert!(decoder.pending_len() > 0);
        let frames = decoder.push_chunk(b"\"}\n\ndata: {\"type\":\"status\",\"data\":1}\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, r#"{"type":"llm_token","data":"Hel"}"#);
        let frames = decoder.push_chunk(b"\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn byte_at_a_time_feed_finds_split_delimiters() {
        let body = b"data: first\r\n\r\n: ping\n\ndata: second\n\ndata: tail";
        let mut decoder = SseDecoder::default();
        let mut data = Vec::new();
        for byte in body {
            data.extend(decoder.push_chunk(&[*byte]).into_iter().map(|f| f.data));
        }
        assert_eq!(data, vec!["first".to_string(), "second".to_string()]);
        assert_eq!(decoder.pending_len(), b"data: tail".len());
    }

    #[test]
    fn large_frame_in_small_chunks_is_emitted_once_complete() {
        let payload = "x".repeat(64 * 1024);
        let body = format!("data: {payload}\n\n");
        let mut decoder = SseDecoder::default();
        let mut frames = Vec::new();
        for chunk in body.as_bytes().chunks(7) {
            frames.extend(decoder.push_chunk(chunk));
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, payload);
        assert_eq!(decoder.pending_len(), 0);
    }

    #[test]
    fn accepts_crlf_delimiters_and_named_events() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b"event: message\r\ndata: {\"a\":1}\r\n\r\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("message".into()),
                data: "{\"a\":1}".into()
            }]
        );
    }

    #[test]
    fn skips_comments_and_keep_alives() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b": ping\n\n\n\nevent: noop\n\ndata: x\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "x");
    }

    #[test]
    fn joins_multiline_data_and_ignores_unknown_fields() {
        let mut decoder = SseDecoder::default();
        let frames = decoder.push_chunk(b"id: 7\ndata: first\ndata\ndata:second\nretry: 10\n\n");
        assert_eq!(frames[0].data, "first\n\nsecond");
    }
}
