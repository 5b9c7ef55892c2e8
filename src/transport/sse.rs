//! Incremental Server-Sent Events decoder
//!
//! Bytes arrive in arbitrary chunks. Complete lines are split out of the
//! buffer, `data:` fields are collected, and a blank line dispatches the
//! collected data as one event. Other fields (`event`, `id`, `retry`) and
//! comments are ignored.

use tracing::warn;

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every event it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=newline).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            match String::from_utf8(line) {
                Ok(line) => events.extend(self.feed_line(&line)),
                Err(e) => warn!(error = %e, "Skipping SSE line with invalid UTF-8"),
            }
        }
        events
    }

    /// Flush whatever is left once the byte stream has ended
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            match String::from_utf8(rest) {
                Ok(line) => {
                    let line = line.trim_end_matches('\r');
                    if let Some(event) = self.feed_line(line) {
                        return Some(event);
                    }
                }
                Err(e) => warn!(error = %e, "Dropping trailing SSE bytes with invalid UTF-8"),
            }
        }
        self.dispatch()
    }

    fn feed_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let event = self.data.join("\n");
        self.data.clear();
        Some(event)
    }
}
