//! Incremental text/event-stream parsing
//!
//! Feeds raw transport chunks in, yields complete SSE messages out. Only
//! the fields the import stream uses are kept: `event:`, `data:` (multiple
//! data lines joined with newlines) and comment lines (heartbeats), which
//! are dropped.

/// One dispatched SSE message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseMessage {
    /// `event:` field, if the server set one
    pub event: Option<String>,
    /// Joined `data:` payload
    pub data: String,
}

/// Stateful parser fed by transport chunks
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: String,
    event: Option<String>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one chunk, returning every message completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseMessage> {
        self.buffer.push_str(&String::from_utf8_lossy(chunk));

        let mut messages = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                // Blank line dispatches the accumulated message
                if !self.data.is_empty() {
                    messages.push(SseMessage {
                        event: self.event.take(),
                        data: self.data.join("\n"),
                    });
                } else {
                    self.event = None;
                }
                self.data.clear();
            } else if let Some(rest) = line.strip_prefix(':') {
                // Comment (heartbeat); ignored
                let _ = rest;
            } else if let Some(value) = field_value(line, "event") {
                self.event = Some(value.to_string());
            } else if let Some(value) = field_value(line, "data") {
                self.data.push(value.to_string());
            }
            // Other fields (id, retry) are not used by this stream
        }
        messages
    }
}

/// `field: value` with the optional single leading space stripped
fn field_value<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(field)?;
    let rest = rest.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}
