//! Bot module for handling Telegram interactions
//!
//! - `message_handler`: command, text and fallback endpoints
//! - `dialogue_manager`: turns one message into a session change and replies
//! - `ui_builder`: keyboards and prompt formatting

pub mod dialogue_manager;
pub mod message_handler;
pub mod ui_builder;

use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::dialogue::FormState;

pub use message_handler::{command_handler, text_handler, unsupported_handler, Command};

/// Handler tree: commands first, then form answers, then everything else
pub fn schema() -> UpdateHandler<anyhow::Error> {
    Update::filter_message()
        .enter_dialogue::<Message, InMemStorage<FormState>, FormState>()
        .branch(dptree::entry().filter_command::<Command>().endpoint(command_handler))
        .branch(Message::filter_text().endpoint(text_handler))
        .branch(dptree::endpoint(unsupported_handler))
}
