//! Wire types for the chat proxy, shared by the proxy service and its clients.
//!
//! The completion payload follows the OpenAI-compatible shape the proxy relays
//! back verbatim: a list of `choices`, each with a `message.content`, and an
//! optional `usage` block.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChatRequest {
    #[validate(length(min = 1, message = "at least one message is required"))]
    pub messages: Vec<ChatMessage>,
    /// Free-form task label; matched against the known labels by substring.
    #[serde(default)]
    pub task: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub object: String,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl ChatCompletion {
    /// Content of the first choice, if present and non-empty.
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|content| !content.is_empty())
    }

    pub fn total_tokens(&self) -> Option<u64> {
        self.usage.as_ref().and_then(|u| u.total_tokens)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Choice {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub message: CompletionMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

/// The specialised assistant personas a request can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatTask {
    GenerateCode,
    Maintenance,
    SapExcel,
}

impl ChatTask {
    /// Match order matters: the first label found in the task string wins.
    pub const ALL: [ChatTask; 3] = [
        ChatTask::GenerateCode,
        ChatTask::Maintenance,
        ChatTask::SapExcel,
    ];

    /// Label shown to the user and sent as the `task` field.
    pub fn label(self) -> &'static str {
        match self {
            ChatTask::GenerateCode => "Gerar Código VBA",
            ChatTask::Maintenance => "Manutenção de Macro",
            ChatTask::SapExcel => "SAP ↔ Excel",
        }
    }

    /// Short identifier used on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            ChatTask::GenerateCode => "vba",
            ChatTask::Maintenance => "maintenance",
            ChatTask::SapExcel => "sap",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|task| task.slug().eq_ignore_ascii_case(slug.trim()))
    }

    /// Resolve a free-form task string by looking for a known label inside it.
    pub fn match_label(task: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| task.contains(t.label()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_label_finds_substring() {
        assert_eq!(
            ChatTask::match_label("[Task: Manutenção de Macro] fix this"),
            Some(ChatTask::Maintenance)
        );
        assert_eq!(ChatTask::match_label("SAP ↔ Excel"), Some(ChatTask::SapExcel));
        assert_eq!(ChatTask::match_label("something else"), None);
    }

    #[test]
    fn match_label_prefers_code_generation() {
        let both = format!("{} / {}", ChatTask::SapExcel.label(), ChatTask::GenerateCode.label());
        assert_eq!(ChatTask::match_label(&both), Some(ChatTask::GenerateCode));
    }

    #[test]
    fn slugs_round_trip() {
        for task in ChatTask::ALL {
            assert_eq!(ChatTask::from_slug(task.slug()), Some(task));
        }
        assert_eq!(ChatTask::from_slug(" SAP "), Some(ChatTask::SapExcel));
        assert_eq!(ChatTask::from_slug("excel"), None);
    }

    #[test]
    fn completion_parses_minimal_payload() {
        let completion: ChatCompletion = serde_json::from_str(
            r#"{"choices":[{"message":{"content":"hello"}}],"usage":{"total_tokens":42}}"#,
        )
        .unwrap();

        assert_eq!(completion.first_content(), Some("hello"));
        assert_eq!(completion.total_tokens(), Some(42));
    }

    #[test]
    fn empty_content_counts_as_missing() {
        let completion: ChatCompletion =
            serde_json::from_str(r#"{"choices":[{"message":{"content":""}}]}"#).unwrap();

        assert_eq!(completion.first_content(), None);
        assert_eq!(completion.total_tokens(), None);
    }

    #[test]
    fn request_requires_messages() {
        let request = ChatRequest {
            messages: vec![],
            task: None,
        };
        assert!(request.validate().is_err());

        let request = ChatRequest {
            messages: vec![ChatMessage::user("hi")],
            task: None,
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_value(ChatMessage::assistant("ok")).unwrap();
        assert_eq!(json["role"], "assistant");
    }
}
