/// A single parsed SSE line: either an `event:` name or a `data:` payload.
#[derive(Debug)]
pub enum SseParsed {
    Event(String),
    Data(String),
}

/// Parse one SSE line. Anthropic's Messages API streams `event: <type>`
/// followed by `data: <json>` pairs separated by blank lines.
pub fn parse_sse_line(line: &str) -> Option<SseParsed> {
    if let Some(event_type) = line.strip_prefix("event: ") {
        Some(SseParsed::Event(event_type.to_string()))
    } else {
        line.strip_prefix("data: ")
            .map(|data| SseParsed::Data(data.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_event_line() {
        match parse_sse_line("event: message_start") {
            Some(SseParsed::Event(e)) => assert_eq!(e, "message_start"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn parses_data_line() {
        match parse_sse_line("data: {\"type\":\"ping\"}") {
            Some(SseParsed::Data(d)) => assert_eq!(d, "{\"type\":\"ping\"}"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn ignores_unrelated_line() {
        assert!(parse_sse_line("").is_none());
    }
}
