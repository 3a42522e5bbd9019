// Server-sent event encoding/decoding for the /api/chat stream.
//
// The stream carries `data: {"token":...}` records, a final `data: [DONE]`
// marker, and `event: error` records when the provider fails mid-stream.

use serde_json::json;

use super::models::{TokenData, GENERIC_ERROR_MESSAGE};

pub const DONE_MARKER: &str = "[DONE]";

/// Encode one token chunk.
pub fn token_event(data: &TokenData) -> String {
    let payload = serde_json::to_string(data).unwrap_or_else(|_| r#"{"token":""}"#.to_string());
    format!("data: {payload}\n\n")
}

/// Encode a mid-stream failure.
pub fn error_event(message: &str) -> String {
    format!("event: error\ndata: {}\n\n", json!({ "error": message }))
}

/// Encode end of stream.
pub fn done_event() -> String {
    format!("data: {DONE_MARKER}\n\n")
}

/// Extract the payload of a `data:` line, if it is one.
pub fn data_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// One decoded record from the chat stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseRecord {
    Token(String),
    Error(String),
    Done,
}

/// Line-by-line decoder for the chat stream.
///
/// An `event: error` line flags the next `data:` line as an error payload;
/// a blank line closes the current record.
#[derive(Debug, Default)]
pub struct SseParser {
    pending_error: bool,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed_line(&mut self, line: &str) -> Option<SseRecord> {
        let line = line.trim_end_matches('\r');

        if line.is_empty() {
            self.pending_error = false;
            return None;
        }

        if line == "event: error" {
            self.pending_error = true;
            return None;
        }

        let payload = data_payload(line)?;

        if self.pending_error {
            self.pending_error = false;
            let message = serde_json::from_str::<serde_json::Value>(payload)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or_else(|| GENERIC_ERROR_MESSAGE.to_string());
            return Some(SseRecord::Error(message));
        }

        if payload == DONE_MARKER {
            return Some(SseRecord::Done);
        }

        match serde_json::from_str::<TokenData>(payload) {
            Ok(data) => Some(SseRecord::Token(data.token)),
            // A chunk we cannot decode ends the exchange as a failure.
            Err(_) => Some(SseRecord::Error(GENERIC_ERROR_MESSAGE.to_string())),
        }
    }
}
