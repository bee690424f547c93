//! Frame payload decoding for terminal output.
//!
//! Agent servers send JSON events tagged with a `type` field.  Text deltas
//! are printed inline so a streamed reply reads naturally; other events get
//! a one-line `[TYPE] {...}` summary.  Non-JSON payloads are printed as-is.

use ags_sse::Frame;
use serde_json::{json, Value};

/// Fields that carry streamed text, in lookup order.
const TEXT_FIELDS: &[&str] = &["delta", "content", "text"];

/// How one frame should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Streamed text, written without a trailing newline.
    Inline(String),
    /// A complete line.
    Line(String),
}

/// Parse the payload as JSON, if it is JSON.
pub fn decode(frame: &Frame) -> Option<Value> {
    serde_json::from_slice(&frame.data).ok()
}

/// The event's `type` tag, if any.
pub fn event_type(value: &Value) -> Option<&str> {
    value.get("type").and_then(Value::as_str)
}

pub fn render(frame: &Frame) -> Rendered {
    let Some(value) = decode(frame) else {
        return Rendered::Line(frame.text().into_owned());
    };
    let Some(kind) = event_type(&value) else {
        return Rendered::Line(value.to_string());
    };

    if is_text_event(kind) {
        if let Some(text) = TEXT_FIELDS
            .iter()
            .find_map(|f| value.get(*f).and_then(Value::as_str))
        {
            return Rendered::Inline(text.to_owned());
        }
    }
    Rendered::Line(format!("[{kind}] {value}"))
}

/// One JSON line per frame for `--json`.
pub fn render_json(frame: &Frame) -> String {
    let data = decode(frame).unwrap_or_else(|| Value::String(frame.text().into_owned()));
    let kind = event_type(&data).map(str::to_owned);
    json!({
        "received_at": frame.received_at.to_rfc3339(),
        "type": kind,
        "data": data,
    })
    .to_string()
}

fn is_text_event(kind: &str) -> bool {
    let k = kind.to_ascii_uppercase();
    k.contains("CONTENT") || k.contains("DELTA") || k.contains("CHUNK") || k == "TOKEN"
}
