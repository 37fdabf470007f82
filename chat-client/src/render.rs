//! Plain-text rendering of the conversation for the terminal.

use crate::ledger::UsageRecord;
use crate::segmenter::CodeSegment;
use crate::session::{ConversationMessage, Role};
use std::fmt::Write;

const RULE: &str = "────────────────────────────────────────";

pub fn render_usage(usage: &UsageRecord) -> String {
    format!(
        "requests {}/{} per minute | tokens {}/{} per day",
        usage.requests_used, usage.requests_limit, usage.tokens_used, usage.tokens_limit
    )
}

pub fn render_transcript(messages: &[ConversationMessage]) -> String {
    let mut out = String::new();
    for message in messages {
        let who = match message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        let _ = writeln!(out, "[{}]\n{}\n", who, message.content);
    }
    out
}

/// Explanation pane followed by the numbered code pane.
pub fn render_split_view(segments: &[CodeSegment]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}\nExplanation\n{}", RULE, RULE);
    for explanation in segments.iter().filter_map(|s| s.explanation.as_deref()) {
        let _ = writeln!(out, "{}\n", explanation);
    }

    let _ = writeln!(out, "{}\nCode\n{}", RULE, RULE);
    for (i, segment) in segments.iter().enumerate() {
        let _ = writeln!(
            out,
            "[{}] {}  (/copy {})\n{}\n",
            i + 1,
            segment.language,
            i + 1,
            segment.code
        );
    }
    out
}

pub fn render_conversation(messages: &[ConversationMessage], segments: &[CodeSegment]) -> String {
    if segments.is_empty() {
        render_transcript(messages)
    } else {
        render_split_view(segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(language: &str, code: &str, explanation: Option<&str>) -> CodeSegment {
        CodeSegment {
            language: language.into(),
            code: code.into(),
            explanation: explanation.map(Into::into),
        }
    }

    #[test]
    fn usage_line_shows_both_gauges() {
        let usage = UsageRecord {
            requests_used: 3,
            requests_limit: 30,
            tokens_used: 1200,
            tokens_limit: 14_400,
            last_reset_date: String::new(),
        };
        assert_eq!(
            render_usage(&usage),
            "requests 3/30 per minute | tokens 1200/14400 per day"
        );
    }

    #[test]
    fn split_view_numbers_code_blocks() {
        let out = render_split_view(&[
            segment("vba", "Sub A()\nEnd Sub", Some("First")),
            segment("sql", "SELECT 1", None),
        ]);

        let explanation = out.find("Explanation").unwrap();
        let code = out.find("Code\n").unwrap();
        assert!(explanation < code);
        assert!(out.contains("First"));
        assert!(out.contains("[1] vba  (/copy 1)\nSub A()\nEnd Sub"));
        assert!(out.contains("[2] sql  (/copy 2)\nSELECT 1"));
    }

    #[test]
    fn conversation_without_segments_is_a_transcript() {
        let messages = vec![
            ConversationMessage {
                role: Role::User,
                content: "hi".into(),
            },
            ConversationMessage {
                role: Role::Assistant,
                content: "hello".into(),
            },
        ];
        assert_eq!(
            render_conversation(&messages, &[]),
            "[you]\nhi\n\n[assistant]\nhello\n\n"
        );
    }
}
