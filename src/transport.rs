//! # Transport Module
//!
//! Delivers updates to the dispatcher either by long polling or through a
//! webhook, and serves the liveness endpoint some hosting platforms probe.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::routing::get;
use axum::Router;
use reqwest::Url;
use rand::distributions::Alphanumeric;
use rand::Rng;
use secrecy::ExposeSecret;
use teloxide::dispatching::DefaultKey;
use teloxide::prelude::*;
use teloxide::update_listeners::webhooks;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::{RecoveryConfig, Transport};
use crate::retry::with_flood_retry;

pub const HEALTH_BODY: &str = "OK";
const SECRET_TOKEN_LEN: usize = 32;

async fn health() -> &'static str {
    HEALTH_BODY
}

/// Router answering `GET /` with a fixed body
pub fn health_router() -> Router {
    Router::new().route("/", get(health))
}

/// Serve only the health endpoint until the process ends
pub async fn serve_health(port: u16) -> Result<()> {
    let address = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind health endpoint on {address}"))?;
    info!(%address, "Health endpoint listening");
    axum::serve(listener, health_router()).await?;
    Ok(())
}

/// Random secret Telegram echoes back in every webhook request
pub fn generate_secret_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_TOKEN_LEN)
        .map(char::from)
        .collect()
}

/// Webhook router with the health route added beside it
///
/// A webhook mounted at `/` owns that path, so no health route is added.
pub fn webhook_app(webhook_router: Router, url: &Url) -> Router {
    if url.path() == "/" {
        warn!("Webhook path is '/', health endpoint disabled");
        webhook_router
    } else {
        webhook_router.merge(health_router())
    }
}

/// Run the dispatcher with the configured transport until shutdown
pub async fn run(
    mut dispatcher: Dispatcher<Bot, anyhow::Error, DefaultKey>,
    bot: Bot,
    transport: Transport,
    recovery: &RecoveryConfig,
) -> Result<()> {
    match transport {
        Transport::Polling { health_port } => {
            if let Some(port) = health_port {
                tokio::spawn(async move {
                    if let Err(e) = serve_health(port).await {
                        error!(error = %e, "Health endpoint stopped");
                    }
                });
            }

            info!("Starting long polling");
            dispatcher.dispatch().await;
        }
        Transport::Webhook { url, port, secret } => {
            let address = SocketAddr::from(([0, 0, 0, 0], port));
            let secret = secret
                .map(|s| s.expose_secret().to_string())
                .unwrap_or_else(generate_secret_token);

            let options = webhooks::Options::new(address, url.clone()).secret_token(secret.clone());
            let (listener, stop_flag, router) = webhooks::axum_no_setup(options);

            let app = webhook_app(router, &url);

            let tcp = TcpListener::bind(address)
                .await
                .with_context(|| format!("Failed to bind webhook listener on {address}"))?;
            info!(%address, path = url.path(), "Webhook listener bound");

            tokio::spawn(async move {
                if let Err(e) = axum::serve(tcp, app).with_graceful_shutdown(stop_flag).await {
                    error!(error = %e, "Webhook server stopped");
                }
            });

            with_flood_retry(recovery, "set_webhook", || {
                bot.set_webhook(url.clone())
                    .secret_token(secret.clone())
                    .drop_pending_updates(true)
                    .send()
            })
            .await
            .context("Failed to register webhook")?;
            info!("Webhook registered");

            dispatcher
                .dispatch_with_listener(
                    listener,
                    LoggingErrorHandler::with_custom_text("An error from the webhook listener"),
                )
                .await;
        }
    }

    Ok(())
}
