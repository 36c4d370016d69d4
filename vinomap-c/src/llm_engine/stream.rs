use common::GenerateChunk;
use tracing::{debug, warn};

use super::{InferenceError, InferenceResult};

/// Folds a newline-delimited JSON body into one answer.
///
/// Bytes may arrive split at any point, so an incomplete trailing line is
/// held back until the next `push` or until `finish`. Each complete line is
/// decoded on its own; a line that does not decode is logged and skipped.
#[derive(Debug, Default)]
pub struct StreamAggregator {
    pending: Vec<u8>,
    text: String,
    lines: usize,
    skipped: usize,
}

impl StreamAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        // `pending` never holds a newline between calls, so only the new bytes are scanned.
        let mut pending = std::mem::take(&mut self.pending);
        let mut scan_from = pending.len();
        pending.extend_from_slice(bytes);

        let mut line_start = 0;
        while let Some(offset) = pending[scan_from..].iter().position(|b| *b == b'\n') {
            let end = scan_from + offset;
            self.consume_line(&pending[line_start..end]);
            line_start = end + 1;
            scan_from = line_start;
        }
        pending.drain(..line_start);
        self.pending = pending;
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Number of lines dropped because they were not valid JSON.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn finish(mut self) -> InferenceResult<String> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.consume_line(&rest);
        }
        debug!(
            "Stream finished: {} lines, {} skipped, {} chars",
            self.lines,
            self.skipped,
            self.text.len()
        );
        if self.text.is_empty() {
            return Err(InferenceError::EmptyResponse);
        }
        Ok(self.text)
    }

    fn consume_line(&mut self, raw: &[u8]) {
        let line = match std::str::from_utf8(raw) {
            Ok(s) => s.trim(),
            Err(e) => {
                self.skipped += 1;
                warn!("Skipping stream line with invalid UTF-8: {}", e);
                return;
            }
        };
        if line.is_empty() {
            return;
        }
        self.lines += 1;

        match serde_json::from_str::<GenerateChunk>(line) {
            Ok(chunk) => {
                if let Some(err) = &chunk.error {
                    warn!("Inference endpoint reported an error mid-stream: {}", err);
                }
                if let Some(fragment) = chunk.fragment() {
                    self.text.push_str(fragment);
                }
            }
            Err(e) => {
                self.skipped += 1;
                warn!("Failed to decode stream line: {} (line: {})", e, line);
            }
        }
    }
}
