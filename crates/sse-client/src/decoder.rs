//! Incremental `text/event-stream` body decoder.
//!
//! Bytes arrive in arbitrary chunks.  The decoder keeps the trailing partial
//! line between calls, collects `data:` lines into the current event, and
//! emits the joined payload when a blank line ends the event.  `event:`,
//! `id:`, `retry:` and comment lines are skipped.

use crate::error::{StreamError, TransportKind};

/// Field marker for payload lines.
const DATA_FIELD: &[u8] = b"data:";

/// Longest line accepted before the connection is failed.
pub(crate) const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug)]
pub(crate) struct FrameDecoder {
    /// Bytes of the line being read (no terminator yet).
    line: Vec<u8>,
    max_line: usize,
    /// Payload of the event being assembled.
    data: Vec<u8>,
    /// Whether the current event has seen at least one `data:` line.
    has_data: bool,
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl FrameDecoder {
    pub(crate) fn with_max_line(max_line: usize) -> Self {
        Self {
            line: Vec::new(),
            max_line,
            data: Vec::new(),
            has_data: false,
        }
    }

    /// Feed one chunk and return every payload completed by it.
    ///
    /// Fails once a single line exceeds the configured maximum.
    pub(crate) fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Vec<u8>>, StreamError> {
        let mut payloads = Vec::new();
        let mut rest = chunk;

        while let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            self.check_line(pos)?;
            self.line.extend_from_slice(&rest[..pos]);
            rest = &rest[pos + 1..];

            let mut line = std::mem::take(&mut self.line);
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(payload) = self.process_line(&line) {
                payloads.push(payload);
            }
        }
        self.check_line(rest.len())?;
        self.line.extend_from_slice(rest);

        Ok(payloads)
    }

    fn check_line(&self, adding: usize) -> Result<(), StreamError> {
        // A trailing CR is stripped later, so allow one extra byte.
        if self.line.len() + adding > self.max_line + 1 {
            return Err(StreamError::Read {
                kind: TransportKind::Other,
                message: format!("event stream line exceeds {} bytes", self.max_line),
            });
        }
        Ok(())
    }

    /// True if an event was started but not terminated by a blank line.
    pub(crate) fn has_pending(&self) -> bool {
        self.has_data || !self.line.is_empty()
    }

    fn process_line(&mut self, line: &[u8]) -> Option<Vec<u8>> {
        if line.is_empty() {
            if !self.has_data {
                return None;
            }
            self.has_data = false;
            let payload = std::mem::take(&mut self.data);
            // Blocks whose data lines were all empty carry nothing.
            return (!payload.is_empty()).then_some(payload);
        }

        let value = line.strip_prefix(DATA_FIELD)?;
        let value = value.strip_prefix(b" ").unwrap_or(value);
        if self.has_data {
            self.data.push(b'\n');
        }
        self.data.extend_from_slice(value);
        self.has_data = true;
        None
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
