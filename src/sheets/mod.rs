//! Spreadsheet module: the append-only sink completed forms are written to.
//!
//! - `auth`: service-account token minting
//! - `client`: Sheets REST calls

pub mod auth;
pub mod client;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, info};

use crate::errors::SheetsError;
use crate::schema::Mode;

pub use auth::{Authenticator, ServiceAccountKey};
pub use client::SheetsClient;

/// Upper bound for any single Sheets or token request
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for Google APIs; a request that outlives `timeout` fails
/// with a transient `Http` error
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, SheetsError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Destination for completed rows
#[async_trait]
pub trait RowSink: Send + Sync {
    async fn append_row(&self, sheet: &str, row: &[String]) -> Result<(), SheetsError>;
}

#[async_trait]
impl RowSink for SheetsClient {
    async fn append_row(&self, sheet: &str, row: &[String]) -> Result<(), SheetsError> {
        self.append(sheet, row).await
    }
}

/// Open the spreadsheet and make sure every mode has its worksheet
///
/// Meant to run once at startup; any error here should stop the process.
pub async fn open_spreadsheet(creds_file: &Path, spreadsheet_id: &str) -> Result<SheetsClient, SheetsError> {
    info!(path = %creds_file.display(), "Loading service account credentials");
    let key = ServiceAccountKey::from_file(creds_file)?;
    info!(client_email = %key.client_email, "Using service account");

    let auth = Authenticator::service_account(key, http_client(HTTP_TIMEOUT)?);
    connect_and_prepare(auth, spreadsheet_id, None).await
}

/// Connect with a ready authenticator and create missing worksheets
pub async fn connect_and_prepare(
    auth: Authenticator,
    spreadsheet_id: &str,
    base_url: Option<reqwest::Url>,
) -> Result<SheetsClient, SheetsError> {
    let client_email = auth.client_email().map(str::to_string);

    info!(spreadsheet_id, "Opening spreadsheet");
    let connected = match base_url {
        Some(url) => SheetsClient::connect_with_base_url(auth, spreadsheet_id, url).await,
        None => SheetsClient::connect(auth, spreadsheet_id).await,
    };

    let client = match connected {
        Ok(client) => client,
        Err(SheetsError::SpreadsheetNotFound(id)) => {
            error!(
                spreadsheet_id = %id,
                service_account = client_email.as_deref().unwrap_or("unknown"),
                "Spreadsheet not found: check the ID and that it is shared with the service account"
            );
            return Err(SheetsError::SpreadsheetNotFound(id));
        }
        Err(e) => return Err(e),
    };

    for mode in Mode::ALL {
        client.ensure_sheet(mode.sheet_name()).await?;
    }

    Ok(client)
}
