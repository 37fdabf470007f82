//! Interactive line-based front-end.

use crate::flow::{FlowProgress, GuidedFlow, StepKind};
use crate::render::{render_conversation, render_usage};
use crate::session::{ChatSession, LimitKind, SendOutcome};
use service_core::chat::ChatTask;
use std::path::PathBuf;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};

const HELP: &str = "\
Commands:
  /task <vba|maintenance|sap|none>  select the assistant task
  /attach <path>...                 attach files to the next message
  /flow <maintenance|sap>           start a guided prompt
  /copy <n>                         print code block n without decoration
  /usage                            show request and token usage
  /clear                            clear the conversation
  /help                             show this help
  /quit                             exit
Anything else is sent as a message.";

/// Ends a multi-line code answer inside a guided flow.
const CODE_TERMINATOR: &str = ".";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Task(Option<ChatTask>),
    Attach(Vec<PathBuf>),
    Flow(ChatTask),
    Copy(usize),
    Usage,
    Clear,
    Help,
    Quit,
    Message(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}', try /help")]
    Unknown(String),

    #[error("usage: {0}")]
    Usage(&'static str),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let trimmed = line.trim();
        let Some(rest) = trimmed.strip_prefix('/') else {
            return Ok(Command::Message(line.to_string()));
        };

        let mut parts = rest.split_whitespace();
        let name = parts.next().unwrap_or("");
        let args: Vec<&str> = parts.collect();

        match name {
            "task" => match args.as_slice() {
                ["none"] => Ok(Command::Task(None)),
                [slug] => ChatTask::from_slug(slug)
                    .map(|task| Command::Task(Some(task)))
                    .ok_or(CommandError::Usage("/task <vba|maintenance|sap|none>")),
                _ => Err(CommandError::Usage("/task <vba|maintenance|sap|none>")),
            },
            "attach" if !args.is_empty() => {
                Ok(Command::Attach(args.iter().map(PathBuf::from).collect()))
            }
            "attach" => Err(CommandError::Usage("/attach <path>...")),
            "flow" => match args.as_slice() {
                [slug] => ChatTask::from_slug(slug)
                    .filter(|task| GuidedFlow::for_task(*task).is_some())
                    .map(Command::Flow)
                    .ok_or(CommandError::Usage("/flow <maintenance|sap>")),
                _ => Err(CommandError::Usage("/flow <maintenance|sap>")),
            },
            "copy" => match args.as_slice() {
                [n] => n
                    .parse::<usize>()
                    .ok()
                    .filter(|n| *n > 0)
                    .map(Command::Copy)
                    .ok_or(CommandError::Usage("/copy <n>")),
                _ => Err(CommandError::Usage("/copy <n>")),
            },
            "usage" => Ok(Command::Usage),
            "clear" => Ok(Command::Clear),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => Err(CommandError::Unknown(other.to_string())),
        }
    }
}

pub struct Terminal<R, W> {
    session: ChatSession,
    input: Lines<R>,
    out: W,
    pending_files: Vec<PathBuf>,
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(session: ChatSession, input: R, out: W) -> Self {
        Self {
            session,
            input: input.lines(),
            out,
            pending_files: Vec::new(),
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn into_output(self) -> W {
        self.out
    }

    async fn say(&mut self, text: &str) -> std::io::Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await
    }

    async fn read_line(&mut self) -> std::io::Result<Option<String>> {
        self.out.write_all(b"> ").await?;
        self.out.flush().await?;
        self.input.next_line().await
    }

    /// Read lines until end of input or `/quit`.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        self.say("VBA assistant. Type /help for commands.").await?;

        while let Some(line) = self.read_line().await? {
            if line.trim().is_empty() {
                // Staged files can be sent on their own.
                if !self.pending_files.is_empty() {
                    self.send(String::new()).await?;
                }
                continue;
            }

            let command = match Command::parse(&line) {
                Ok(command) => command,
                Err(e) => {
                    self.say(&e.to_string()).await?;
                    continue;
                }
            };

            match command {
                Command::Quit => break,
                Command::Help => self.say(HELP).await?,
                Command::Task(task) => {
                    self.session.set_task(task);
                    let label = task.map(|t| t.label()).unwrap_or("none");
                    self.say(&format!("Task: {}", label)).await?;
                }
                Command::Attach(paths) => {
                    let count = paths.len();
                    self.pending_files.extend(paths);
                    self.say(&format!(
                        "{} file(s) will be attached to the next message ({} pending)",
                        count,
                        self.pending_files.len()
                    ))
                    .await?;
                }
                Command::Flow(task) => self.run_flow(task).await?,
                Command::Copy(n) => {
                    let segments = self.session.segments();
                    match segments.get(n - 1) {
                        Some(segment) => {
                            let code = segment.code.clone();
                            self.say(&code).await?;
                        }
                        None => {
                            self.say(&format!("No code block {}", n)).await?;
                        }
                    }
                }
                Command::Usage => self.show_usage().await?,
                Command::Clear => {
                    self.session.clear();
                    self.pending_files.clear();
                    self.say("Conversation cleared.").await?;
                }
                Command::Message(text) => self.send(text).await?,
            }
        }

        Ok(())
    }

    /// Send `text` with any staged files. The files stay staged unless the
    /// send completed or failed.
    async fn send(&mut self, text: String) -> std::io::Result<()> {
        let outcome = if self.pending_files.is_empty() {
            self.session.send_message(&text).await
        } else {
            let files = self.pending_files.clone();
            self.session.send_message_with_files(&text, &files).await
        };

        if matches!(
            outcome,
            SendOutcome::Completed { .. } | SendOutcome::Failed(_)
        ) {
            self.pending_files.clear();
        }
        self.show_outcome(outcome).await
    }

    async fn show_usage(&mut self) -> std::io::Result<()> {
        let usage = render_usage(&self.session.ledger().snapshot());
        self.say(&usage).await
    }

    async fn show_outcome(&mut self, outcome: SendOutcome) -> std::io::Result<()> {
        match outcome {
            SendOutcome::Ignored => Ok(()),
            SendOutcome::LimitReached(LimitKind::Requests) => {
                self.say("Request limit reached. Wait a minute and try again.")
                    .await
            }
            SendOutcome::LimitReached(LimitKind::Tokens) => {
                self.say("Daily token limit reached. Try again tomorrow.")
                    .await
            }
            SendOutcome::Completed { .. } | SendOutcome::Failed(_) => {
                let view = render_conversation(self.session.messages(), &self.session.segments());
                self.say(&view).await?;
                self.show_usage().await
            }
        }
    }

    async fn run_flow(&mut self, task: ChatTask) -> anyhow::Result<()> {
        let Some(mut flow) = GuidedFlow::for_task(task) else {
            self.say("No guided flow for that task.").await?;
            return Ok(());
        };

        self.say(&format!("== {} ==", flow.title())).await?;
        if let Some(description) = flow.description() {
            let description = description.to_string();
            self.say(&description).await?;
        }
        self.say("Type /back to go back, /cancel to leave the flow.")
            .await?;

        loop {
            let Some(step) = flow.current_step().cloned() else {
                return Ok(());
            };
            self.say(&format!(
                "\nStep {} of {}: {}",
                flow.current_index() + 1,
                flow.steps().len(),
                step.title
            ))
            .await?;
            if let Some(description) = &step.description {
                self.say(description).await?;
            }
            if let Some(placeholder) = &step.placeholder {
                self.say(&format!("e.g. {}", placeholder)).await?;
            }

            let answer = match &step.kind {
                StepKind::Info { level, content } => {
                    self.say(&format!("[{}] {}", level.label(), content)).await?;
                    self.say("Press Enter to continue.").await?;
                    self.read_line().await?
                }
                StepKind::Text => self.read_line().await?,
                StepKind::Code => {
                    self.say("Paste the code, then a line with a single '.'.")
                        .await?;
                    self.read_code_block().await?
                }
            };

            let Some(answer) = answer else {
                return Ok(());
            };
            match answer.trim() {
                "/cancel" => {
                    self.say("Flow cancelled.").await?;
                    return Ok(());
                }
                "/back" => {
                    flow.previous();
                    continue;
                }
                _ => {}
            }

            if step.takes_input() {
                flow.set_input(answer);
            }

            match flow.next() {
                FlowProgress::Advanced(_) => {}
                FlowProgress::Invalid(error) => self.say(&error).await?,
                FlowProgress::Complete(message) => {
                    self.session.set_task(Some(flow.task()));
                    let outcome = self.session.send_message(&message).await;
                    self.show_outcome(outcome).await?;
                    return Ok(());
                }
            }
        }
    }

    async fn read_code_block(&mut self) -> std::io::Result<Option<String>> {
        let mut lines = Vec::new();
        loop {
            match self.input.next_line().await? {
                None if lines.is_empty() => return Ok(None),
                None => break,
                Some(line) if line.trim() == CODE_TERMINATOR => break,
                Some(line) if lines.is_empty() && matches!(line.trim(), "/back" | "/cancel") => {
                    return Ok(Some(line));
                }
                Some(line) => lines.push(line),
            }
        }
        Ok(Some(lines.join("\n")))
    }
}
