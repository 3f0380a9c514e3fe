//! Server-sent-events parsing.
//!
//! Pure parsing over a fully collected stream body; the transport above
//! supplies the bytes. Suitable for endpoints that answer a single request
//! with a finite event stream.

use serde::{Deserialize, Serialize};

/// One parsed SSE event: the optional `event:` name and the `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SseEvent {
    /// Event type from the `event:` line, if any.
    pub event: Option<String>,
    /// Payload: `data:` lines joined with `\n`.
    pub data: String,
}

/// Parse a complete SSE stream into discrete events.
///
/// Events are separated by blank lines. Multiple `data:` lines within one
/// event are concatenated with `\n`. Comment lines (leading `:`) and fields
/// other than `event:` / `data:` are ignored. A trailing event without a
/// terminating blank line is still emitted.
pub fn parse_sse_stream(stream: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();
    let mut event_name: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    let mut flush = |event_name: &mut Option<String>, data_lines: &mut Vec<&str>| {
        if event_name.is_some() || !data_lines.is_empty() {
            events.push(SseEvent {
                event: event_name.take(),
                data: data_lines.join("\n"),
            });
            data_lines.clear();
        }
    };

    for raw_line in stream.split('\n') {
        let line = raw_line.strip_suffix('\r').unwrap_or(raw_line);
        if line.is_empty() {
            flush(&mut event_name, &mut data_lines);
        } else if line.starts_with(':') {
            // comment
        } else if let Some(value) = field_value(line, "event") {
            event_name = Some(value.to_string());
        } else if let Some(value) = field_value(line, "data") {
            data_lines.push(value);
        }
        // Other fields (id:, retry:) are not part of the surface.
    }
    flush(&mut event_name, &mut data_lines);

    events
}

/// Extract the value of `field:` from a line, trimming the single optional
/// leading space the SSE format allows.
fn field_value<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(field)?;
    let rest = rest.strip_prefix(':')?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
