//! Conversation state and the send path.
//!
//! A send is gated by the usage ledger, goes out to the proxy as one
//! completion request and always leaves exactly one assistant message behind:
//! the reply on success or a fixed apology on failure.

use crate::attachments::{compose_with_attachments, read_attachments};
use crate::ledger::SharedLedger;
use crate::segmenter::{segment, CodeSegment};
use crate::services::CompletionClient;
use service_core::chat::{ChatMessage, ChatRequest, ChatTask};
use std::path::PathBuf;
use std::sync::Arc;

pub const APOLOGY_MESSAGE: &str =
    "Sorry, something went wrong while processing your request. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationMessage {
    pub role: Role,
    pub content: String,
}

impl ConversationMessage {
    fn to_wire(&self) -> ChatMessage {
        match self.role {
            Role::User => ChatMessage::user(self.content.clone()),
            Role::Assistant => ChatMessage::assistant(self.content.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Requests,
    Tokens,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank input; nothing happened.
    Ignored,
    /// A usage limit is reached; nothing was sent or recorded.
    LimitReached(LimitKind),
    Completed { tokens: u64 },
    /// The request failed and the apology message was shown instead.
    Failed(String),
}

pub struct ChatSession {
    client: Arc<dyn CompletionClient>,
    ledger: SharedLedger,
    messages: Vec<ConversationMessage>,
    task: Option<ChatTask>,
    keep_history: bool,
}

impl ChatSession {
    pub fn new(client: Arc<dyn CompletionClient>, ledger: SharedLedger) -> Self {
        Self {
            client,
            ledger,
            messages: Vec::new(),
            task: None,
            keep_history: false,
        }
    }

    /// Send earlier turns along with each new message instead of starting over.
    pub fn keep_history(mut self, keep: bool) -> Self {
        self.keep_history = keep;
        self
    }

    pub fn set_task(&mut self, task: Option<ChatTask>) {
        self.task = task;
    }

    pub fn task(&self) -> Option<ChatTask> {
        self.task
    }

    pub fn messages(&self) -> &[ConversationMessage] {
        &self.messages
    }

    pub fn ledger(&self) -> &SharedLedger {
        &self.ledger
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Segments of the last message, when it came from the assistant.
    pub fn segments(&self) -> Vec<CodeSegment> {
        match self.messages.last() {
            Some(last) if last.role == Role::Assistant => segment(&last.content),
            _ => Vec::new(),
        }
    }

    fn limit_reached(&self) -> Option<LimitKind> {
        self.ledger.with(|ledger| {
            if ledger.is_request_limit_reached() {
                Some(LimitKind::Requests)
            } else if ledger.is_token_limit_reached() {
                Some(LimitKind::Tokens)
            } else {
                None
            }
        })
    }

    #[tracing::instrument(skip_all, fields(task = ?self.task, chars = content.len()))]
    pub async fn send_message(&mut self, content: &str) -> SendOutcome {
        if content.trim().is_empty() {
            return SendOutcome::Ignored;
        }

        if let Some(kind) = self.limit_reached() {
            tracing::info!(?kind, "Usage limit reached, not sending");
            return SendOutcome::LimitReached(kind);
        }

        let outbound = match self.task {
            Some(task) => format!("[Task: {}] {}", task.label(), content),
            None => content.to_string(),
        };

        if !self.keep_history {
            self.messages.clear();
        }

        let mut history: Vec<ChatMessage> = self.messages.iter().map(|m| m.to_wire()).collect();
        history.push(ChatMessage::user(outbound.clone()));

        self.messages.push(ConversationMessage {
            role: Role::User,
            content: outbound.clone(),
        });
        self.messages.push(ConversationMessage {
            role: Role::Assistant,
            content: String::new(),
        });

        let request = ChatRequest {
            messages: history,
            task: self.task.map(|task| task.label().to_string()),
        };

        let result = self.client.complete(&request).await;

        let (reply, tokens, outcome) = match result {
            Ok(completion) => match completion.first_content() {
                Some(reply) => {
                    let tokens = completion
                        .total_tokens()
                        .unwrap_or_else(|| estimate_tokens(&outbound, reply));
                    (reply.to_string(), tokens, SendOutcome::Completed { tokens })
                }
                None => {
                    // The placeholder stays empty and no apology is shown.
                    tracing::warn!("Completion contained no message content");
                    let tokens = completion.total_tokens().unwrap_or(0);
                    (String::new(), tokens, SendOutcome::Completed { tokens })
                }
            },
            Err(e) => {
                tracing::error!(error = %e, "Chat request failed");
                failure(e.to_string())
            }
        };

        if let Some(placeholder) = self.messages.last_mut() {
            placeholder.content = reply;
        }
        self.ledger.with(|ledger| ledger.record_call(tokens));

        outcome
    }

    /// Send `content` with the given files attached. Files that cannot be
    /// read are skipped; if none survive the text is sent on its own.
    pub async fn send_message_with_files(
        &mut self,
        content: &str,
        paths: &[PathBuf],
    ) -> SendOutcome {
        let files = read_attachments(paths).await;
        if files.is_empty() {
            return self.send_message(content).await;
        }

        let composed = compose_with_attachments(content, &files);
        self.send_message(&composed).await
    }
}

fn failure(reason: String) -> (String, u64, SendOutcome) {
    (APOLOGY_MESSAGE.to_string(), 0, SendOutcome::Failed(reason))
}

/// Rough count used when the proxy reports no usage: one token per four chars.
fn estimate_tokens(prompt: &str, reply: &str) -> u64 {
    ((prompt.chars().count() + reply.chars().count()) / 4) as u64
}
