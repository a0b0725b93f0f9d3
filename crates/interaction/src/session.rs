//! Recorded map sessions: one JSON raw event per line.
//!
//! Blank lines and lines starting with `#` are ignored.

use crate::router::RawEvent;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionError {
    /// 1-based line number.
    pub line: usize,
    pub message: String,
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for SessionError {}

pub fn parse_session(text: &str) -> Result<Vec<RawEvent>, SessionError> {
    let mut events = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str(trimmed).map_err(|e| SessionError {
            line: line_no,
            message: e.to_string(),
        })?;
        events.push(event);
    }
    Ok(events)
}
