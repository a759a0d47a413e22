// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Minimal `text/event-stream` frame reader.
//!
//! Only what a buffered MCP response needs: `event:` and `data:` fields,
//! multi-line data joined with `\n`, comments and unknown fields ignored.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

pub fn parse_events(body: &str) -> Vec<SseEvent> {
    let mut events = Vec::new();
    let mut event: Option<String> = None;
    let mut data: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.is_empty() {
            if !data.is_empty() {
                events.push(SseEvent {
                    event: event.take(),
                    data: data.join("\n"),
                });
                data.clear();
            }
            event = None;
            continue;
        }
        if line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => data.push(value),
            "event" => event = Some(value.to_string()),
            _ => {}
        }
    }

    // A stream may end without the final blank line.
    if !data.is_empty() {
        events.push(SseEvent {
            event,
            data: data.join("\n"),
        });
    }
    events
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_event() {
        let events = parse_events("event: message\ndata: {\"id\":1}\n\n");
        assert_eq!(
            events,
            vec![SseEvent {
                event: Some("message".to_string()),
                data: "{\"id\":1}".to_string()
            }]
        );
    }

    #[test]
    fn test_multiline_data_comments_and_crlf() {
        let body = ": keep-alive\r\ndata: {\"a\":\r\ndata: 1}\r\n\r\ndata:{\"b\":2}";
        let events = parse_events(body);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].data, "{\"a\":\n1}");
        assert_eq!(events[0].event, None);
        assert_eq!(events[1].data, "{\"b\":2}");
    }

    #[test]
    fn test_events_without_data_are_skipped() {
        assert!(parse_events("event: ping\n\n").is_empty());
    }
}
