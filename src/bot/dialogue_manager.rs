//! Dialogue Manager module for handling dialogue state transitions
//!
//! Everything here is independent of the Telegram client: callers get an
//! [`Outcome`] describing the new session state and the messages to send.

use teloxide::types::ChatId;
use tracing::{error, info, warn};

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import dialogue types
use crate::dialogue::{CompletedForm, FormState, Step};

// Import the row sink
use crate::sheets::RowSink;

// Import UI builder functions
use super::ui_builder::{prompt_reply, retry_reply, Keyboard, Reply};

/// What to do with the stored session after handling a message
#[derive(Clone, Debug, PartialEq)]
pub enum NextState {
    /// Leave the stored state as it was
    Keep,
    Update(FormState),
    /// Clear the session
    Exit,
}

/// Session change plus messages to send, in order
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub next: NextState,
    pub replies: Vec<Reply>,
}

/// Handle a free-text message for a chat in `state`
///
/// A chat without a form in progress starts one. When the last field is
/// answered the row is appended to `sink` before returning.
pub async fn process_input(
    chat_id: ChatId,
    state: FormState,
    text: &str,
    sink: &dyn RowSink,
    language_code: Option<&str>,
) -> Outcome {
    if !state.is_active() {
        return start_form(chat_id, language_code);
    }

    match state.handle(text) {
        Step::Ask { state, prompt } => Outcome {
            next: NextState::Update(state),
            replies: vec![prompt_reply(prompt, language_code)],
        },
        Step::Retry { prompt, reason } => {
            info!(chat_id = %chat_id, reason, "Answer rejected, asking again");
            Outcome {
                next: NextState::Keep,
                replies: vec![retry_reply(prompt, reason, language_code)],
            }
        }
        Step::Complete(form) => submit_form(chat_id, form, sink, language_code).await,
    }
}

/// Begin a new form, discarding any form in progress
pub fn start_form(chat_id: ChatId, language_code: Option<&str>) -> Outcome {
    info!(chat_id = %chat_id, "Starting new form");
    let (state, prompt) = FormState::begin();
    Outcome {
        next: NextState::Update(state),
        replies: vec![
            Reply::text(t_lang("welcome", language_code)),
            prompt_reply(prompt, language_code),
        ],
    }
}

/// Drop the form in progress without writing anything
pub fn cancel_form(chat_id: ChatId, state: &FormState, language_code: Option<&str>) -> Outcome {
    let (_, dropped) = state.clone().cancel();
    let key = if dropped {
        info!(chat_id = %chat_id, "Form cancelled by user");
        "cancelled"
    } else {
        "nothing-to-cancel"
    };

    Outcome {
        next: NextState::Exit,
        replies: vec![Reply::text(t_lang(key, language_code)).with_keyboard(Keyboard::Remove)],
    }
}

/// Append a completed form and decide what happens to the session
///
/// Transient failures keep the session on its last field so the user can
/// resend the last answer; terminal failures drop it.
pub async fn submit_form(
    chat_id: ChatId,
    form: CompletedForm,
    sink: &dyn RowSink,
    language_code: Option<&str>,
) -> Outcome {
    match sink.append_row(form.sheet, &form.row).await {
        Ok(()) => {
            info!(chat_id = %chat_id, sheet = form.sheet, schema = ?form.schema, "Form saved");
            Outcome {
                next: NextState::Exit,
                replies: vec![Reply::text(t_args_lang(
                    "row-saved",
                    &[("sheet", form.sheet)],
                    language_code,
                ))
                .with_keyboard(Keyboard::Remove)],
            }
        }
        Err(e) if e.is_transient() => {
            warn!(chat_id = %chat_id, sheet = form.sheet, error = %e, "Append failed, session kept for retry");
            Outcome {
                next: NextState::Keep,
                replies: vec![Reply::text(t_lang("save-failed-retry", language_code))],
            }
        }
        Err(e) => {
            error!(chat_id = %chat_id, sheet = form.sheet, error = %e, "Append failed, session dropped");
            Outcome {
                next: NextState::Exit,
                replies: vec![Reply::text(t_lang("save-failed", language_code))
                    .with_keyboard(Keyboard::Remove)],
            }
        }
    }
}
