//! Diagnostics sink handed to the SQL engine on every call.
//!
//! Engines push human-readable diagnostic lines while they run; the shard
//! handler drains the sink after the call and folds the lines into the error
//! message it reports. The sink is owned by the caller of a single engine
//! call, so no state leaks between requests or shards.

use std::fmt;

/// Diagnostic lines collected during one engine call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Diagnostics {
    lines: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one diagnostic line. Lines are concatenated verbatim, so
    /// callers include their own trailing newline.
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    pub fn extend(&mut self, lines: impl IntoIterator<Item = String>) {
        self.lines.extend(lines);
    }

    /// Take every collected line, leaving the sink empty.
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    /// Discard every collected line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }
}

/// Build the reported message for a failed engine call: the error text, a
/// newline, then every diagnostic line in the order it was emitted.
pub fn compose_error_message(error: &dyn fmt::Display, diagnostics: &mut Diagnostics) -> String {
    let mut message = format!("{error}\n");
    for line in diagnostics.drain() {
        message.push_str(&line);
    }
    message
}
