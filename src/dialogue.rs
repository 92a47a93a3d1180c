//! Form dialogue module: the per-chat state machine that walks a user through
//! a schema, one answer per message.
//!
//! Transitions here are pure. Appending the finished row is left to the
//! caller, which receives [`Step::Complete`] exactly once per filled form.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::schema::{FieldKey, Mode, SchemaKind, SubMode};

/// Conversation state of one chat
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum FormState {
    /// No form in progress
    #[default]
    Idle,
    AwaitingMode,
    AwaitingSubMode,
    Filling(FormSession),
}

/// Answers collected so far for the selected schema
///
/// `answers[i]` is the answer to the schema's i-th field; the cursor is the
/// number of answers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FormSession {
    pub schema: SchemaKind,
    pub answers: Vec<String>,
}

/// What the user is being asked
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Prompt {
    Mode,
    SubMode,
    Field {
        key: FieldKey,
        /// 1-based position of the question
        position: usize,
        total: usize,
    },
}

/// A fully answered form, ready to be appended
#[derive(Clone, Debug, PartialEq)]
pub struct CompletedForm {
    pub schema: SchemaKind,
    pub sheet: &'static str,
    pub row: Vec<String>,
}

/// Result of feeding one message to the state machine
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    /// Move to `state` and ask `prompt`
    Ask { state: FormState, prompt: Prompt },
    /// Input rejected; the state is unchanged and `prompt` is asked again.
    /// `reason` is a localization key.
    Retry { prompt: Prompt, reason: &'static str },
    /// The last field was answered
    Complete(CompletedForm),
}

/// Type alias for the form dialogue
pub type FormDialogue = Dialogue<FormState, InMemStorage<FormState>>;

impl FormState {
    /// Start a new form: the first question is always the mode
    pub fn begin() -> (FormState, Prompt) {
        (FormState::AwaitingMode, Prompt::Mode)
    }

    /// Feed one text message to the current state
    ///
    /// An idle chat starts a new form regardless of what was sent.
    pub fn handle(self, input: &str) -> Step {
        match self {
            FormState::Idle => {
                let (state, prompt) = FormState::begin();
                Step::Ask { state, prompt }
            }
            FormState::AwaitingMode => select_mode(input),
            FormState::AwaitingSubMode => select_sub_mode(input),
            FormState::Filling(session) => session.advance(input),
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, FormState::Idle)
    }

    /// Abandon the form from any state without writing anything
    ///
    /// Returns the idle state and whether a form was actually dropped.
    pub fn cancel(self) -> (FormState, bool) {
        let dropped = self.is_active();
        (FormState::Idle, dropped)
    }
}

/// Choose the top-level category; unknown input re-asks without moving on
pub fn select_mode(input: &str) -> Step {
    match Mode::parse(input) {
        Some(mode) => match SchemaKind::select(mode, None) {
            Some(kind) => FormSession::new(kind).start(),
            None => Step::Ask {
                state: FormState::AwaitingSubMode,
                prompt: Prompt::SubMode,
            },
        },
        None => Step::Retry {
            prompt: Prompt::Mode,
            reason: "choose-mode-invalid",
        },
    }
}

/// Choose the TR record kind; unknown input re-asks without moving on
pub fn select_sub_mode(input: &str) -> Step {
    match SubMode::parse(input).and_then(|sub| SchemaKind::select(Mode::Tr, Some(sub))) {
        Some(kind) => FormSession::new(kind).start(),
        None => Step::Retry {
            prompt: Prompt::SubMode,
            reason: "choose-submode-invalid",
        },
    }
}

impl FormSession {
    pub fn new(schema: SchemaKind) -> Self {
        Self {
            schema,
            answers: Vec::new(),
        }
    }

    /// Index of the next field to ask
    pub fn cursor(&self) -> usize {
        self.answers.len()
    }

    fn prompt_at(&self, index: usize) -> Option<Prompt> {
        let fields = self.schema.schema().fields;
        fields.get(index).map(|spec| Prompt::Field {
            key: spec.key,
            position: index + 1,
            total: fields.len(),
        })
    }

    /// Prompt for the field at the cursor, if any remain
    pub fn current_prompt(&self) -> Option<Prompt> {
        self.prompt_at(self.cursor())
    }

    fn start(self) -> Step {
        match self.current_prompt() {
            Some(prompt) => Step::Ask {
                state: FormState::Filling(self),
                prompt,
            },
            None => Step::Complete(self.complete()),
        }
    }

    fn complete(self) -> CompletedForm {
        let schema = self.schema.schema();
        CompletedForm {
            schema: self.schema,
            sheet: schema.sheet_name(),
            row: schema.build_row(&self.answers),
        }
    }

    /// Store `answer` for the current field and move the cursor forward
    pub fn advance(mut self, answer: &str) -> Step {
        let Some(spec) = self.schema.schema().fields.get(self.cursor()).copied() else {
            return Step::Complete(self.complete());
        };

        match (spec.validator)(answer) {
            Ok(value) => {
                self.answers.push(value);
                self.start()
            }
            Err(reason) => Step::Retry {
                prompt: self.current_prompt().unwrap_or(Prompt::Mode),
                reason,
            },
        }
    }
}
