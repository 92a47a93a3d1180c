use anyhow::Result;
use secrecy::ExposeSecret;
use std::sync::Arc;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use shift_ledger::bot::{self, Command};
use shift_ledger::config::{self, Config};
use shift_ledger::dialogue::FormState;
use shift_ledger::retry::with_flood_retry;
use shift_ledger::sheets::{self, RowSink};
use shift_ledger::transport;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if std::env::var(config::LOG_FORMAT_VAR).is_ok_and(|format| format.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Shift Ledger Telegram Bot");
    config::log_environment_summary();

    // Configuration errors end the process before any network call
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };

    let spreadsheet = match sheets::open_spreadsheet(&config.creds_file, &config.sheet_id).await {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Failed to initialize Google Sheets");
            std::process::exit(1);
        }
    };
    let sink: Arc<dyn RowSink> = Arc::new(spreadsheet);
    let recovery = Arc::new(config.recovery.clone());

    let bot = Bot::new(config.bot_token.expose_secret());

    if let Err(e) = with_flood_retry(&recovery, "set_my_commands", || {
        bot.set_my_commands(Command::bot_commands()).send()
    })
    .await
    {
        warn!(error = %e, "Failed to register command list");
    }

    info!("Bot initialized, starting dispatcher");

    let dispatcher = Dispatcher::builder(bot.clone(), bot::schema())
        .dependencies(dptree::deps![
            InMemStorage::<FormState>::new(),
            sink,
            Arc::clone(&recovery)
        ])
        .enable_ctrlc_handler()
        .build();

    transport::run(dispatcher, bot, config.transport, &recovery).await
}
