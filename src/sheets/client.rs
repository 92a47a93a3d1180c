//! Minimal Sheets v4 REST client: metadata lookup, worksheet creation and
//! row append.

use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::auth::Authenticator;
use crate::errors::SheetsError;

pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

/// Size of worksheets created by `ensure_sheet`
pub const DEFAULT_SHEET_ROWS: u32 = 100;
pub const DEFAULT_SHEET_COLUMNS: u32 = 20;

#[derive(Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Deserialize)]
struct SheetProperties {
    title: String,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Authenticated handle to one spreadsheet
pub struct SheetsClient {
    http: reqwest::Client,
    auth: Authenticator,
    base_url: Url,
    spreadsheet_id: String,
    sheet_titles: RwLock<Vec<String>>,
}

impl SheetsClient {
    /// Authenticate and open a spreadsheet by key
    pub async fn connect(auth: Authenticator, spreadsheet_id: &str) -> Result<Self, SheetsError> {
        let base_url = Url::parse(SHEETS_API_BASE)
            .map_err(|e| SheetsError::InvalidResponse(format!("API base URL: {e}")))?;
        Self::connect_with_base_url(auth, spreadsheet_id, base_url).await
    }

    /// Same as `connect`, against a different API root
    pub async fn connect_with_base_url(
        auth: Authenticator,
        spreadsheet_id: &str,
        base_url: Url,
    ) -> Result<Self, SheetsError> {
        let client = Self {
            http: super::http_client(super::HTTP_TIMEOUT)?,
            auth,
            base_url,
            spreadsheet_id: spreadsheet_id.to_string(),
            sheet_titles: RwLock::new(Vec::new()),
        };

        let titles = client.fetch_sheet_titles().await?;
        info!(spreadsheet_id, sheets = ?titles, "Spreadsheet opened");
        *client.sheet_titles.write().await = titles;

        Ok(client)
    }

    /// Worksheet titles as last seen
    pub async fn sheet_titles(&self) -> Vec<String> {
        self.sheet_titles.read().await.clone()
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SheetsError::InvalidResponse(format!("unusable API base URL: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn fetch_sheet_titles(&self) -> Result<Vec<String>, SheetsError> {
        let url = self.endpoint(&[&self.spreadsheet_id])?;
        let token = self.auth.access_token().await?;

        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .query(&[("fields", "sheets.properties.title")])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SheetsError::SpreadsheetNotFound(self.spreadsheet_id.clone()));
        }

        let metadata: SpreadsheetMetadata = check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| SheetsError::InvalidResponse(format!("spreadsheet metadata: {e}")))?;

        Ok(metadata.sheets.into_iter().map(|s| s.properties.title).collect())
    }

    /// Make sure a worksheet exists, creating it if missing
    ///
    /// Returns `true` when the worksheet had to be created.
    pub async fn ensure_sheet(&self, name: &str) -> Result<bool, SheetsError> {
        if self.sheet_titles.read().await.iter().any(|title| title == name) {
            info!(sheet = name, "Worksheet exists");
            return Ok(false);
        }

        info!(sheet = name, "Creating worksheet");
        let url = self.endpoint(&[&format!("{}:batchUpdate", self.spreadsheet_id)])?;
        let token = self.auth.access_token().await?;
        let body = json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": name,
                        "gridProperties": {
                            "rowCount": DEFAULT_SHEET_ROWS,
                            "columnCount": DEFAULT_SHEET_COLUMNS,
                        }
                    }
                }
            }]
        });

        let response = self.http.post(url).bearer_auth(token).json(&body).send().await?;
        check_status(response).await?;

        self.sheet_titles.write().await.push(name.to_string());
        Ok(true)
    }

    /// Append one row after the last row of a worksheet
    pub async fn append(&self, sheet: &str, row: &[String]) -> Result<(), SheetsError> {
        let range = format!("{}:append", a1_range(sheet));
        let url = self.endpoint(&[&self.spreadsheet_id, "values", &range])?;
        let token = self.auth.access_token().await?;

        debug!(sheet, cells = row.len(), "Appending row");
        let response = self
            .http
            .post(url)
            .bearer_auth(token)
            .query(&[
                ("valueInputOption", "USER_ENTERED"),
                ("insertDataOption", "INSERT_ROWS"),
            ])
            .json(&json!({ "values": [row] }))
            .send()
            .await?;

        check_status(response).await?;
        info!(sheet, "Row appended");
        Ok(())
    }
}

/// A1 reference to the first cell of a worksheet, quoting the title
pub fn a1_range(sheet: &str) -> String {
    format!("'{}'!A1", sheet.replace('\'', "''"))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(SheetsError::RateLimited);
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|parsed| parsed.error.message)
        .unwrap_or(body);

    Err(SheetsError::Api {
        status: status.as_u16(),
        message,
    })
}
