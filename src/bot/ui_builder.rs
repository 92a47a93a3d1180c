//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{KeyboardButton, KeyboardMarkup, KeyboardRemove, ReplyMarkup};

// Import localization
use crate::localization::{t_args_lang, t_lang};

// Import form types
use crate::dialogue::Prompt;
use crate::schema::{Mode, SubMode};

/// Keyboard to attach to an outgoing message
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyboard {
    /// Leave whatever keyboard the client shows
    Unchanged,
    Modes,
    SubModes,
    Remove,
}

/// One outgoing text message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Keyboard,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: Keyboard::Unchanged,
        }
    }

    pub fn with_keyboard(mut self, keyboard: Keyboard) -> Self {
        self.keyboard = keyboard;
        self
    }

    /// Telegram markup for the keyboard, if any
    pub fn markup(&self) -> Option<ReplyMarkup> {
        match self.keyboard {
            Keyboard::Unchanged => None,
            Keyboard::Modes => Some(ReplyMarkup::Keyboard(create_mode_keyboard())),
            Keyboard::SubModes => Some(ReplyMarkup::Keyboard(create_sub_mode_keyboard())),
            Keyboard::Remove => Some(ReplyMarkup::KeyboardRemove(KeyboardRemove::new())),
        }
    }
}

/// One-row keyboard with a button per sheet
pub fn create_mode_keyboard() -> KeyboardMarkup {
    let row = Mode::ALL
        .iter()
        .map(|mode| KeyboardButton::new(mode.sheet_name()))
        .collect::<Vec<_>>();
    KeyboardMarkup::new(vec![row]).resize_keyboard().one_time_keyboard()
}

/// One-row keyboard with a button per TR record type
pub fn create_sub_mode_keyboard() -> KeyboardMarkup {
    let row = SubMode::ALL
        .iter()
        .map(|sub| KeyboardButton::new(sub.label()))
        .collect::<Vec<_>>();
    KeyboardMarkup::new(vec![row]).resize_keyboard().one_time_keyboard()
}

/// Question text, with progress for field prompts
pub fn format_prompt(prompt: Prompt, language_code: Option<&str>) -> String {
    match prompt {
        Prompt::Mode => t_lang("choose-mode", language_code),
        Prompt::SubMode => t_lang("choose-submode", language_code),
        Prompt::Field { key, position, total } => t_args_lang(
            "prompt-progress",
            &[
                ("current", &position.to_string()),
                ("total", &total.to_string()),
                ("prompt", &t_lang(key.prompt_key(), language_code)),
            ],
            language_code,
        ),
    }
}

fn keyboard_for(prompt: Prompt) -> Keyboard {
    match prompt {
        Prompt::Mode => Keyboard::Modes,
        Prompt::SubMode => Keyboard::SubModes,
        Prompt::Field { position: 1, .. } => Keyboard::Remove,
        Prompt::Field { .. } => Keyboard::Unchanged,
    }
}

/// Message asking a question
pub fn prompt_reply(prompt: Prompt, language_code: Option<&str>) -> Reply {
    Reply::text(format_prompt(prompt, language_code)).with_keyboard(keyboard_for(prompt))
}

/// Message rejecting an answer and asking the same question again
///
/// Selection prompts already name the valid choices in their rejection text,
/// so only field prompts are repeated after the reason.
pub fn retry_reply(prompt: Prompt, reason: &str, language_code: Option<&str>) -> Reply {
    let reason = t_lang(reason, language_code);
    let text = match prompt {
        Prompt::Mode | Prompt::SubMode => reason,
        Prompt::Field { .. } => format!("{}\n{}", reason, format_prompt(prompt, language_code)),
    };
    let keyboard = match prompt {
        Prompt::Mode => Keyboard::Modes,
        Prompt::SubMode => Keyboard::SubModes,
        Prompt::Field { .. } => Keyboard::Unchanged,
    };
    Reply::text(text).with_keyboard(keyboard)
}
