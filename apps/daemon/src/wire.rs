//! JSON lines accepted by `callmark run`.

use callmark_monitor::CallEvent;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum WireMessage {
    /// `{"type":"callState","state":"RINGING","number":"..."}`
    CallState(CallEvent),
    /// Number reported by the call screening hook.
    Screening { number: String },
    Permission { granted: bool },
    /// User dismissed the overlay.
    Dismiss,
}

/// Parse one input line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> serde_json::Result<Option<WireMessage>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}
