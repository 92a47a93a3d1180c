//! # Shift Ledger Telegram Bot
//!
//! A Telegram bot that collects work and payment entries through a short
//! scripted dialogue and appends each finished entry as a row of a Google
//! spreadsheet.

pub mod bot;
pub mod config;
pub mod dialogue;
pub mod errors;
pub mod localization;
pub mod retry;
pub mod schema;
pub mod sheets;
pub mod transport;
