//! Service-account authentication for the Sheets API.
//!
//! Access tokens are minted with the OAuth2 JWT-bearer grant and cached
//! until shortly before they expire.

use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use reqwest::StatusCode;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::errors::SheetsError;

/// Scopes requested for every token
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive.file",
];

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Deserialize)]
struct RawServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

/// The parts of a service-account JSON file needed to mint tokens
#[derive(Debug)]
pub struct ServiceAccountKey {
    pub client_email: String,
    private_key: SecretString,
    pub token_uri: String,
}

impl ServiceAccountKey {
    /// Read and parse a service-account JSON file
    pub fn from_file(path: &Path) -> Result<Self, SheetsError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SheetsError::Credentials(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, SheetsError> {
        let raw: RawServiceAccountKey = serde_json::from_str(content)
            .map_err(|e| SheetsError::Credentials(format!("malformed service account JSON: {e}")))?;

        Ok(Self {
            client_email: raw.client_email,
            private_key: SecretString::from(raw.private_key),
            token_uri: raw.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }

    /// Override the token endpoint
    pub fn with_token_uri(mut self, token_uri: impl Into<String>) -> Self {
        self.token_uri = token_uri.into();
        self
    }

    /// Build a signed RS256 assertion for the token endpoint
    pub fn sign_assertion(&self, now: DateTime<Utc>) -> Result<String, SheetsError> {
        let claims = Claims {
            iss: &self.client_email,
            scope: SCOPES.join(" "),
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let key = EncodingKey::from_rsa_pem(self.private_key.expose_secret().as_bytes())
            .map_err(|e| SheetsError::Credentials(format!("invalid private key: {e}")))?;

        encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SheetsError::Credentials(format!("cannot sign assertion: {e}")))
    }
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

struct CachedToken {
    value: SecretString,
    expires_at: DateTime<Utc>,
}

enum TokenSource {
    ServiceAccount {
        key: ServiceAccountKey,
        http: reqwest::Client,
    },
    /// Pre-issued bearer token, used as is
    Static(SecretString),
}

/// Supplies bearer tokens for Sheets API calls
pub struct Authenticator {
    source: TokenSource,
    cached: Mutex<Option<CachedToken>>,
}

impl Authenticator {
    pub fn service_account(key: ServiceAccountKey, http: reqwest::Client) -> Self {
        Self {
            source: TokenSource::ServiceAccount { key, http },
            cached: Mutex::new(None),
        }
    }

    pub fn static_token(token: impl Into<String>) -> Self {
        Self {
            source: TokenSource::Static(SecretString::from(token.into())),
            cached: Mutex::new(None),
        }
    }

    /// Service-account identity, for operator-facing log lines
    pub fn client_email(&self) -> Option<&str> {
        match &self.source {
            TokenSource::ServiceAccount { key, .. } => Some(&key.client_email),
            TokenSource::Static(_) => None,
        }
    }

    /// Return a valid access token, refreshing it when close to expiry
    pub async fn access_token(&self) -> Result<String, SheetsError> {
        let (key, http) = match &self.source {
            TokenSource::Static(token) => return Ok(token.expose_secret().to_string()),
            TokenSource::ServiceAccount { key, http } => (key, http),
        };

        let mut cached = self.cached.lock().await;
        let now = Utc::now();
        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(REFRESH_MARGIN_SECS) > now {
                return Ok(token.value.expose_secret().to_string());
            }
        }

        let token = fetch_token(http, key, now).await?;
        let value = token.value.expose_secret().to_string();
        *cached = Some(token);
        Ok(value)
    }
}

/// Exchange a signed assertion for an access token
///
/// Rate limits and server errors from the token endpoint are reported as
/// retryable; any other rejection of the grant is an `Auth` error.
async fn fetch_token(
    http: &reqwest::Client,
    key: &ServiceAccountKey,
    now: DateTime<Utc>,
) -> Result<CachedToken, SheetsError> {
    debug!(token_uri = %key.token_uri, "Requesting access token");
    let assertion = key.sign_assertion(now)?;

    let response = http
        .post(&key.token_uri)
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        let reason = serde_json::from_str::<TokenErrorResponse>(&body)
            .map(|e| match e.error_description {
                Some(description) => format!("{}: {description}", e.error),
                None => e.error,
            })
            .unwrap_or(body);
        let message = format!("token endpoint returned {status}: {reason}");
        return Err(match status {
            StatusCode::TOO_MANY_REQUESTS => SheetsError::RateLimited,
            s if s.is_server_error() => SheetsError::Api {
                status: s.as_u16(),
                message,
            },
            _ => SheetsError::Auth(message),
        });
    }

    let parsed: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| SheetsError::InvalidResponse(format!("token response: {e}")))?;

    info!(expires_in = parsed.expires_in, "Access token issued");
    Ok(CachedToken {
        value: SecretString::from(parsed.access_token),
        expires_at: now + Duration::seconds(parsed.expires_in),
    })
}
