//! Scanner for the code generation event stream.
//!
//! The generation endpoint streams server-sent events. Each `data:` line
//! carries `{"q": "<text>"}`; the text holds in-band markers such as
//! `[FILE_WRITE_SUCCESS:App.vue]`, and the stream closes with `event:done`.
//! Bytes arrive in arbitrary pieces, so lines are reassembled before they are
//! inspected.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

static TOOL_EXECUTED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[TOOL_EXECUTED:([^:\]]+):([^\]]*)\]").expect("valid regex"));
static FILE_WRITE_SUCCESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[FILE_WRITE_SUCCESS:([^\]]+)\]").expect("valid regex"));
static FILE_WRITE_FAILED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[FILE_WRITE_FAILED:([^\]]+)\]").expect("valid regex"));

const GENERATION_COMPLETE: &str = "[GENERATION_COMPLETE]";

/// Everything recognised in the part of the stream that was read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamSummary {
    /// Number of `data:` lines.
    pub data_events: usize,
    /// Characters of generated text carried by those events.
    pub text_chars: usize,
    /// Tools reported as executed, by name.
    pub tools_executed: Vec<String>,
    /// Files reported as written.
    pub files_written: Vec<String>,
    /// Files whose write failed.
    pub files_failed: Vec<String>,
    /// `[GENERATION_COMPLETE]` was seen.
    pub generation_complete: bool,
    /// The `done` event was seen.
    pub done: bool,
}

impl StreamSummary {
    /// Whether anything at all was recognised.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.data_events == 0 && !self.done
    }
}

#[derive(Deserialize)]
struct Payload {
    q: String,
}

/// Incremental line scanner over raw stream bytes.
#[derive(Debug, Default)]
pub struct SseScanner {
    pending: Vec<u8>,
    summary: StreamSummary,
}

impl SseScanner {
    /// Create an empty scanner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next piece of the stream.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            self.scan_line(&String::from_utf8_lossy(&line));
        }
    }

    /// Flush a trailing unterminated line and return the summary.
    #[must_use]
    pub fn finish(mut self) -> StreamSummary {
        if !self.pending.is_empty() {
            let line = std::mem::take(&mut self.pending);
            self.scan_line(&String::from_utf8_lossy(&line));
        }
        self.summary
    }

    fn scan_line(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);

        if let Some(event) = line.strip_prefix("event:") {
            if event.trim() == "done" {
                self.summary.done = true;
            }
            return;
        }

        let Some(data) = line.strip_prefix("data:") else {
            return;
        };
        let data = data.strip_prefix(' ').unwrap_or(data);
        self.summary.data_events += 1;

        let text = serde_json::from_str::<Payload>(data).map_or_else(|_| data.to_string(), |p| p.q);
        self.summary.text_chars += text.chars().count();
        self.scan_markers(&text);
    }

    fn scan_markers(&mut self, text: &str) {
        for caps in TOOL_EXECUTED.captures_iter(text) {
            self.summary.tools_executed.push(caps[1].to_string());
        }
        for caps in FILE_WRITE_SUCCESS.captures_iter(text) {
            self.summary.files_written.push(caps[1].to_string());
        }
        for caps in FILE_WRITE_FAILED.captures_iter(text) {
            self.summary.files_failed.push(caps[1].to_string());
        }
        if text.contains(GENERATION_COMPLETE) {
            self.summary.generation_complete = true;
        }
    }
}
