//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use teloxide::RequestError;
use tracing::debug;

// Import configuration
use crate::config::RecoveryConfig;

// Import localization
use crate::localization::t_lang;

// Import dialogue types
use crate::dialogue::FormDialogue;

// Import flood control
use crate::retry::with_flood_retry;

// Import the row sink
use crate::sheets::RowSink;

// Import dialogue manager functions
use super::dialogue_manager::{cancel_form, process_input, start_form, NextState, Outcome};

// Import UI builder types
use super::ui_builder::Reply;

/// Commands understood in any state
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    #[command(description = "start a new entry")]
    Start,
    #[command(description = "discard the current entry")]
    Cancel,
    #[command(description = "show help")]
    Help,
}

/// Telegram language code of the sender, if known
fn language_code(msg: &Message) -> Option<&str> {
    msg.from
        .as_ref()
        .and_then(|user| user.language_code.as_deref())
}

/// Send one reply, retrying on flood control
pub async fn send_reply(
    bot: &Bot,
    chat_id: ChatId,
    reply: &Reply,
    recovery: &RecoveryConfig,
) -> Result<(), RequestError> {
    with_flood_retry(recovery, "send_message", || {
        let request = bot.send_message(chat_id, reply.text.clone());
        match reply.markup() {
            Some(markup) => request.reply_markup(markup).send(),
            None => request.send(),
        }
    })
    .await?;
    Ok(())
}

/// Persist the session change, then deliver the replies in order
async fn apply_outcome(
    bot: &Bot,
    chat_id: ChatId,
    dialogue: &FormDialogue,
    outcome: Outcome,
    recovery: &RecoveryConfig,
) -> Result<()> {
    match outcome.next {
        NextState::Keep => {}
        NextState::Update(state) => dialogue.update(state).await?,
        NextState::Exit => dialogue.exit().await?,
    }

    for reply in &outcome.replies {
        send_reply(bot, chat_id, reply, recovery).await?;
    }
    Ok(())
}

pub async fn command_handler(
    bot: Bot,
    msg: Message,
    cmd: Command,
    dialogue: FormDialogue,
    recovery: Arc<RecoveryConfig>,
) -> Result<()> {
    let language_code = language_code(&msg);
    debug!(chat_id = %msg.chat.id, command = ?cmd, "Received command");

    let outcome = match cmd {
        Command::Start => start_form(msg.chat.id, language_code),
        Command::Cancel => {
            let state = dialogue.get().await?.unwrap_or_default();
            cancel_form(msg.chat.id, &state, language_code)
        }
        Command::Help => Outcome {
            next: NextState::Keep,
            replies: vec![Reply::text(t_lang("help", language_code))],
        },
    };

    apply_outcome(&bot, msg.chat.id, &dialogue, outcome, &recovery).await
}

pub async fn text_handler(
    bot: Bot,
    msg: Message,
    text: String,
    dialogue: FormDialogue,
    sink: Arc<dyn RowSink>,
    recovery: Arc<RecoveryConfig>,
) -> Result<()> {
    debug!(chat_id = %msg.chat.id, message_length = text.len(), "Received text message");

    let state = dialogue.get().await?.unwrap_or_default();
    let outcome = process_input(msg.chat.id, state, &text, sink.as_ref(), language_code(&msg)).await;

    apply_outcome(&bot, msg.chat.id, &dialogue, outcome, &recovery).await
}

pub async fn unsupported_handler(bot: Bot, msg: Message, recovery: Arc<RecoveryConfig>) -> Result<()> {
    debug!(chat_id = %msg.chat.id, "Received non-text message");
    let reply = Reply::text(t_lang("text-only", language_code(&msg)));
    send_reply(&bot, msg.chat.id, &reply, &recovery).await?;
    Ok(())
}
