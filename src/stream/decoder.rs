use crate::stream::events::StreamEvent;
use bytes::BytesMut;

// ============================================================================
// SSE Frame Decoder
// ============================================================================

const DATA_PREFIX: &str = "data: ";

/// Incremental decoder for the backend's newline-delimited event stream.
///
/// `feed` accepts chunks exactly as they come off the socket; the trailing,
/// possibly-incomplete line is carried over to the next call, so the decoded
/// event sequence is identical no matter where chunk boundaries fall. The
/// carry-over is kept as raw bytes, which keeps the invariance intact even
/// when a chunk boundary splits a multi-byte UTF-8 sequence.
///
/// A corrupt frame never aborts the stream: the offending line is dropped
/// with a log entry and decoding continues with the next line.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    carry: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode every complete line in `chunk` (plus any carried-over bytes),
    /// in stream order. The final unterminated line is re-buffered.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.carry.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.carry.iter().position(|&b| b == b'\n') {
            let line = self.carry.split_to(pos + 1);
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush the carry buffer at end of stream. Streams that end without a
    /// trailing newline still get their last frame decoded.
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        if self.carry.is_empty() {
            return Vec::new();
        }
        let line = self.carry.split();
        parse_line(&line).into_iter().collect()
    }
}

fn parse_line(raw: &[u8]) -> Option<StreamEvent> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\n', '\r']);

    // Comments and keep-alives don't carry the data prefix.
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() {
        return None;
    }

    // Cheap malformed-frame filter before handing anything to the JSON parser.
    if !(payload.starts_with('{') && payload.ends_with('}')) {
        log::warn!("dropping malformed frame (not a JSON object): {:?}", payload);
        return None;
    }

    match serde_json::from_str::<StreamEvent>(payload) {
        Ok(event) => Some(event),
        Err(e) => {
            log::warn!("dropping undecodable frame: {} ({:?})", e, payload);
            None
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
