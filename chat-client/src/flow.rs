//! Multi-step guided prompts.
//!
//! A flow walks the user through a fixed list of steps, validates required
//! answers and finally composes them into one markdown message.

use service_core::chat::ChatTask;

pub const REQUIRED_FIELD_ERROR: &str = "This field is required";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoLevel {
    Info,
    Warning,
    Success,
    Error,
}

impl InfoLevel {
    pub fn label(self) -> &'static str {
        match self {
            InfoLevel::Info => "info",
            InfoLevel::Warning => "warning",
            InfoLevel::Success => "success",
            InfoLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepKind {
    Text,
    Code,
    /// Read-only notice; takes no input.
    Info { level: InfoLevel, content: String },
}

#[derive(Debug, Clone)]
pub struct FlowStep {
    pub title: String,
    pub description: Option<String>,
    pub placeholder: Option<String>,
    pub kind: StepKind,
    pub required: bool,
}

impl FlowStep {
    pub fn text(title: &str) -> Self {
        Self {
            title: title.to_string(),
            description: None,
            placeholder: None,
            kind: StepKind::Text,
            required: false,
        }
    }

    pub fn code(title: &str) -> Self {
        Self {
            kind: StepKind::Code,
            ..Self::text(title)
        }
    }

    pub fn info(title: &str, level: InfoLevel, content: &str) -> Self {
        Self {
            kind: StepKind::Info {
                level,
                content: content.to_string(),
            },
            ..Self::text(title)
        }
    }

    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn takes_input(&self) -> bool {
        !matches!(self.kind, StepKind::Info { .. })
    }
}

/// Result of trying to advance a flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowProgress {
    /// Moved to the step at this index.
    Advanced(usize),
    /// The current step failed validation; the message is also stored on the step.
    Invalid(String),
    /// The last step passed; here is the composed message.
    Complete(String),
}

#[derive(Debug, Clone)]
pub struct GuidedFlow {
    title: String,
    description: Option<String>,
    task: ChatTask,
    steps: Vec<FlowStep>,
    inputs: Vec<String>,
    errors: Vec<Option<String>>,
    current: usize,
}

impl GuidedFlow {
    pub fn new(
        title: &str,
        description: Option<&str>,
        task: ChatTask,
        steps: Vec<FlowStep>,
    ) -> Self {
        let len = steps.len();
        Self {
            title: title.to_string(),
            description: description.map(str::to_string),
            task,
            steps,
            inputs: vec![String::new(); len],
            errors: vec![None; len],
            current: 0,
        }
    }

    pub fn maintenance() -> Self {
        Self::new(
            "Macro maintenance",
            Some("Describe the macro and the problem so the assistant can fix it."),
            ChatTask::Maintenance,
            vec![
                FlowStep::info(
                    "Before you start",
                    InfoLevel::Warning,
                    "Save a copy of the workbook before replacing any code.",
                ),
                FlowStep::code("Current code")
                    .describe("Paste the complete procedure that needs attention.")
                    .placeholder("Sub MyMacro()\n    ...\nEnd Sub")
                    .required(),
                FlowStep::text("Problem")
                    .describe("What goes wrong? Include any error message and line.")
                    .placeholder("Run-time error '1004' when the sheet is empty")
                    .required(),
                FlowStep::text("Expected behaviour")
                    .describe("What should the macro do instead?"),
            ],
        )
    }

    pub fn sap_excel() -> Self {
        Self::new(
            "SAP ↔ Excel integration",
            Some("Automate a SAP GUI transaction from an Excel workbook."),
            ChatTask::SapExcel,
            vec![
                FlowStep::info(
                    "Requirements",
                    InfoLevel::Info,
                    "SAP GUI scripting must be enabled on both the client and the server.",
                ),
                FlowStep::text("Transaction")
                    .describe("Which SAP transaction code should be automated?")
                    .placeholder("VA03")
                    .required(),
                FlowStep::text("Data mapping")
                    .describe("Which worksheet cells map to which SAP fields?")
                    .placeholder("Column A: order number, column B: status")
                    .required(),
                FlowStep::code("Recorded script")
                    .describe("Paste a script from the SAP script recorder, if you have one."),
            ],
        )
    }

    /// The built-in flow for a task, if it has one.
    pub fn for_task(task: ChatTask) -> Option<Self> {
        match task {
            ChatTask::Maintenance => Some(Self::maintenance()),
            ChatTask::SapExcel => Some(Self::sap_excel()),
            ChatTask::GenerateCode => None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn task(&self) -> ChatTask {
        self.task
    }

    pub fn steps(&self) -> &[FlowStep] {
        &self.steps
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_step(&self) -> Option<&FlowStep> {
        self.steps.get(self.current)
    }

    pub fn current_input(&self) -> &str {
        self.inputs.get(self.current).map(String::as_str).unwrap_or("")
    }

    pub fn current_error(&self) -> Option<&str> {
        self.errors.get(self.current).and_then(|e| e.as_deref())
    }

    pub fn is_last_step(&self) -> bool {
        self.current + 1 >= self.steps.len()
    }

    /// Store the answer for the current step and clear its error.
    pub fn set_input(&mut self, value: impl Into<String>) {
        if let Some(slot) = self.inputs.get_mut(self.current) {
            *slot = value.into();
        }
        if let Some(error) = self.errors.get_mut(self.current) {
            *error = None;
        }
    }

    pub fn next(&mut self) -> FlowProgress {
        let Some(step) = self.steps.get(self.current) else {
            return FlowProgress::Complete(self.compose());
        };

        if step.required && step.takes_input() && self.inputs[self.current].trim().is_empty() {
            self.errors[self.current] = Some(REQUIRED_FIELD_ERROR.to_string());
            return FlowProgress::Invalid(REQUIRED_FIELD_ERROR.to_string());
        }

        if self.is_last_step() {
            return FlowProgress::Complete(self.compose());
        }

        self.current += 1;
        FlowProgress::Advanced(self.current)
    }

    pub fn previous(&mut self) -> usize {
        self.current = self.current.saturating_sub(1);
        self.current
    }

    /// Render every answered input step as a markdown section.
    pub fn compose(&self) -> String {
        self.steps
            .iter()
            .zip(&self.inputs)
            .filter_map(|(step, input)| {
                let input = input.trim();
                if input.is_empty() {
                    return None;
                }
                match step.kind {
                    StepKind::Text => Some(format!("## {}\n{}", step.title, input)),
                    StepKind::Code => Some(format!("## {}\n```vba\n{}\n```", step.title, input)),
                    StepKind::Info { .. } => None,
                }
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
