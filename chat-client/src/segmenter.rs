//! Splits an assistant reply into (explanation, code, language) segments.
//!
//! A fenced region opens with three backticks, optionally followed directly
//! by a language tag, and closes at the next three backticks. An opening
//! fence with no closing fence is ordinary prose. The prose before each
//! fence becomes that segment's explanation; prose after the last fence is
//! attached to the last segment only when it has no explanation of its own.

const FENCE: &str = "```";

/// Language assumed for fences without a tag.
pub const FALLBACK_LANGUAGE: &str = "vba";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeSegment {
    pub language: String,
    pub code: String,
    pub explanation: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Run<'a> {
    Prose(&'a str),
    Fenced { tag: &'a str, body: &'a str },
}

fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn scan(text: &str) -> Vec<Run<'_>> {
    let mut runs = Vec::new();
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find(FENCE) {
        let open = cursor + offset;
        let tag_start = open + FENCE.len();
        let tag_len = text[tag_start..]
            .find(|c: char| !is_tag_char(c))
            .unwrap_or(text.len() - tag_start);
        let body_start = tag_start + tag_len;

        let Some(close_offset) = text[body_start..].find(FENCE) else {
            break;
        };
        let close = body_start + close_offset;

        if open > cursor {
            runs.push(Run::Prose(&text[cursor..open]));
        }
        runs.push(Run::Fenced {
            tag: &text[tag_start..body_start],
            body: &text[body_start..close],
        });
        cursor = close + FENCE.len();
    }

    if cursor < text.len() {
        runs.push(Run::Prose(&text[cursor..]));
    }
    runs
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Segment a message. Returns an empty list when it holds no fenced region.
pub fn segment(text: &str) -> Vec<CodeSegment> {
    let mut segments: Vec<CodeSegment> = Vec::new();
    let mut pending: Option<&str> = None;

    for run in scan(text) {
        match run {
            Run::Prose(prose) => pending = Some(prose),
            Run::Fenced { tag, body } => {
                let tag = tag.trim();
                segments.push(CodeSegment {
                    language: if tag.is_empty() {
                        FALLBACK_LANGUAGE.to_string()
                    } else {
                        tag.to_string()
                    },
                    code: body.trim().to_string(),
                    explanation: pending.take().and_then(non_empty),
                });
            }
        }
    }

    if let (Some(trailing), Some(last)) = (pending.and_then(non_empty), segments.last_mut()) {
        if last.explanation.is_none() {
            last.explanation = Some(trailing);
        }
    }

    segments
}
