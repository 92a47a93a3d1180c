use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::Json;
use axum::Router;
use reqwest::Url;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use shift_ledger::errors::SheetsError;
use shift_ledger::sheets::{
    connect_and_prepare, http_client, Authenticator, RowSink, ServiceAccountKey, HTTP_TIMEOUT,
};

const SPREADSHEET_ID: &str = "sheet-123";

#[derive(Clone, Debug)]
struct Recorded {
    method: Method,
    path: String,
    query: String,
    authorization: Option<String>,
    body: String,
}

/// Stand-in for the Sheets and OAuth endpoints
#[derive(Default)]
struct MockGoogle {
    existing_sheets: Vec<&'static str>,
    rate_limit_appends: bool,
    /// Status the token endpoint answers with instead of issuing a token
    token_failure: Option<(StatusCode, &'static str)>,
    requests: Mutex<Vec<Recorded>>,
}

impl MockGoogle {
    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&Recorded) -> bool) -> usize {
        self.requests().iter().filter(|r| pred(r)).count()
    }
}

async fn handle(
    State(mock): State<Arc<MockGoogle>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    let path = uri.path().to_string();
    mock.requests.lock().unwrap().push(Recorded {
        method: method.clone(),
        path: path.clone(),
        query: uri.query().unwrap_or_default().to_string(),
        authorization: headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body,
    });

    if path == "/token" {
        if let Some((status, error)) = mock.token_failure {
            return (
                status,
                Json(json!({ "error": error, "error_description": "token request rejected" })),
            );
        }
        return (
            StatusCode::OK,
            Json(json!({ "access_token": "ya29.minted", "expires_in": 3600, "token_type": "Bearer" })),
        );
    }

    if method == Method::GET {
        if path.ends_with(&format!("/{SPREADSHEET_ID}")) {
            let sheets: Vec<Value> = mock
                .existing_sheets
                .iter()
                .map(|title| json!({ "properties": { "title": title } }))
                .collect();
            return (StatusCode::OK, Json(json!({ "sheets": sheets })));
        }
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": { "code": 404, "message": "Requested entity was not found." } })),
        );
    }

    if path.ends_with(":append") && mock.rate_limit_appends {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": { "code": 429, "message": "Quota exceeded" } })),
        );
    }

    (StatusCode::OK, Json(json!({})))
}

/// Serve `mock` on a random local port, returning its root URL
async fn spawn_mock(mock: Arc<MockGoogle>) -> Result<Url> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    let app = Router::new().fallback(handle).with_state(mock);
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    Ok(Url::parse(&format!("http://{address}/"))?)
}

fn api_base(root: &Url) -> Result<Url> {
    Ok(root.join("v4/spreadsheets")?)
}

#[tokio::test]
async fn test_prepare_creates_only_missing_sheets() -> Result<()> {
    let mock = Arc::new(MockGoogle {
        existing_sheets: vec!["GIM", "Archive"],
        ..Default::default()
    });
    let root = spawn_mock(Arc::clone(&mock)).await?;

    let client = connect_and_prepare(
        Authenticator::static_token("ya29.static"),
        SPREADSHEET_ID,
        Some(api_base(&root)?),
    )
    .await?;

    let creates: Vec<Recorded> = mock
        .requests()
        .into_iter()
        .filter(|r| r.path.ends_with(":batchUpdate"))
        .collect();
    assert_eq!(creates.len(), 1);
    assert_eq!(creates[0].path, format!("/v4/spreadsheets/{SPREADSHEET_ID}:batchUpdate"));

    let body: Value = serde_json::from_str(&creates[0].body)?;
    let properties = &body["requests"][0]["addSheet"]["properties"];
    assert_eq!(properties["title"], "TR");
    assert_eq!(properties["gridProperties"]["rowCount"], 100);
    assert_eq!(properties["gridProperties"]["columnCount"], 20);

    let titles = client.sheet_titles().await;
    assert!(titles.iter().any(|t| t == "TR"));
    assert!(mock
        .requests()
        .iter()
        .all(|r| r.authorization.as_deref() == Some("Bearer ya29.static")));
    Ok(())
}

#[tokio::test]
async fn test_append_posts_row_to_sheet() -> Result<()> {
    let mock = Arc::new(MockGoogle {
        existing_sheets: vec!["GIM", "TR"],
        ..Default::default()
    });
    let root = spawn_mock(Arc::clone(&mock)).await?;
    let client = connect_and_prepare(
        Authenticator::static_token("ya29.static"),
        SPREADSHEET_ID,
        Some(api_base(&root)?),
    )
    .await?;

    let row: Vec<String> = ["12.06", "Ali", "", "500"].map(String::from).to_vec();
    client.append_row("TR", &row).await?;

    let appends: Vec<Recorded> = mock
        .requests()
        .into_iter()
        .filter(|r| r.path.ends_with(":append"))
        .collect();
    assert_eq!(appends.len(), 1);
    assert_eq!(appends[0].method, Method::POST);
    assert_eq!(
        appends[0].path,
        format!("/v4/spreadsheets/{SPREADSHEET_ID}/values/'TR'!A1:append")
    );
    assert!(appends[0].query.contains("valueInputOption=USER_ENTERED"));
    assert!(appends[0].query.contains("insertDataOption=INSERT_ROWS"));

    let body: Value = serde_json::from_str(&appends[0].body)?;
    assert_eq!(body, json!({ "values": [["12.06", "Ali", "", "500"]] }));
    Ok(())
}

#[tokio::test]
async fn test_unknown_spreadsheet_is_reported() -> Result<()> {
    let mock = Arc::new(MockGoogle::default());
    let root = spawn_mock(Arc::clone(&mock)).await?;

    let result = connect_and_prepare(
        Authenticator::static_token("ya29.static"),
        "does-not-exist",
        Some(api_base(&root)?),
    )
    .await;

    match result {
        Err(SheetsError::SpreadsheetNotFound(id)) => assert_eq!(id, "does-not-exist"),
        Err(other) => panic!("expected SpreadsheetNotFound, got {other}"),
        Ok(_) => panic!("expected SpreadsheetNotFound, got a client"),
    }
    assert_eq!(mock.count(|r| r.method == Method::POST), 0);
    Ok(())
}

#[tokio::test]
async fn test_rate_limited_append_is_transient() -> Result<()> {
    let mock = Arc::new(MockGoogle {
        existing_sheets: vec!["GIM", "TR"],
        rate_limit_appends: true,
        ..Default::default()
    });
    let root = spawn_mock(Arc::clone(&mock)).await?;
    let client = connect_and_prepare(
        Authenticator::static_token("ya29.static"),
        SPREADSHEET_ID,
        Some(api_base(&root)?),
    )
    .await?;

    let err = client
        .append_row("GIM", &["12.06".to_string()])
        .await
        .expect_err("append should be rate limited");
    assert!(matches!(err, SheetsError::RateLimited));
    assert!(err.is_transient());
    Ok(())
}

#[tokio::test]
async fn test_service_account_token_is_cached() -> Result<()> {
    let mock = Arc::new(MockGoogle {
        existing_sheets: vec!["GIM", "TR"],
        ..Default::default()
    });
    let root = spawn_mock(Arc::clone(&mock)).await?;

    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/service_account.json");
    let key = ServiceAccountKey::from_file(&fixture)?.with_token_uri(root.join("token")?.to_string());
    assert_eq!(key.client_email, "ledger-bot@shift-ledger-test.iam.gserviceaccount.com");

    let auth = Authenticator::service_account(key, http_client(HTTP_TIMEOUT)?);
    let client = connect_and_prepare(auth, SPREADSHEET_ID, Some(api_base(&root)?)).await?;
    client.append_row("GIM", &["12.06".to_string()]).await?;
    client.append_row("TR", &["13.06".to_string()]).await?;

    let token_requests: Vec<Recorded> = mock
        .requests()
        .into_iter()
        .filter(|r| r.path == "/token")
        .collect();
    assert_eq!(token_requests.len(), 1);
    assert!(token_requests[0]
        .body
        .contains("grant_type=urn%3Aietf%3Aparams%3Aoauth%3Agrant-type%3Ajwt-bearer"));
    assert!(token_requests[0].body.contains("assertion="));

    let api_calls = mock.count(|r| r.path.starts_with("/v4/"));
    assert_eq!(api_calls, 3);
    assert_eq!(
        mock.count(|r| r.authorization.as_deref() == Some("Bearer ya29.minted")),
        api_calls
    );
    Ok(())
}

/// Service-account authenticator whose token endpoint is the mock
fn fixture_authenticator(root: &Url) -> Result<Authenticator> {
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/service_account.json");
    let key = ServiceAccountKey::from_file(&fixture)?.with_token_uri(root.join("token")?.to_string());
    Ok(Authenticator::service_account(key, http_client(HTTP_TIMEOUT)?))
}

#[tokio::test]
async fn test_token_endpoint_outage_is_transient() -> Result<()> {
    let mock = Arc::new(MockGoogle {
        token_failure: Some((StatusCode::SERVICE_UNAVAILABLE, "backend_unavailable")),
        ..Default::default()
    });
    let root = spawn_mock(Arc::clone(&mock)).await?;
    let auth = fixture_authenticator(&root)?;

    let err = auth.access_token().await.expect_err("token endpoint is down");
    assert!(matches!(err, SheetsError::Api { status: 503, .. }), "got {err}");
    assert!(err.is_transient());
    Ok(())
}

#[tokio::test]
async fn test_token_endpoint_rate_limit_is_transient() -> Result<()> {
    let mock = Arc::new(MockGoogle {
        token_failure: Some((StatusCode::TOO_MANY_REQUESTS, "rate_limit_exceeded")),
        ..Default::default()
    });
    let root = spawn_mock(Arc::clone(&mock)).await?;
    let auth = fixture_authenticator(&root)?;

    let err = auth.access_token().await.expect_err("token endpoint is throttling");
    assert!(matches!(err, SheetsError::RateLimited), "got {err}");
    assert!(err.is_transient());
    Ok(())
}

#[tokio::test]
async fn test_rejected_grant_is_terminal() -> Result<()> {
    let mock = Arc::new(MockGoogle {
        token_failure: Some((StatusCode::BAD_REQUEST, "invalid_grant")),
        ..Default::default()
    });
    let root = spawn_mock(Arc::clone(&mock)).await?;
    let auth = fixture_authenticator(&root)?;

    let err = auth.access_token().await.expect_err("grant is rejected");
    match &err {
        SheetsError::Auth(message) => assert!(message.contains("invalid_grant"), "{message}"),
        other => panic!("expected Auth error, got {other}"),
    }
    assert!(!err.is_transient());
    Ok(())
}

#[tokio::test]
async fn test_token_outage_during_connect_is_transient() -> Result<()> {
    let mock = Arc::new(MockGoogle {
        existing_sheets: vec!["GIM", "TR"],
        token_failure: Some((StatusCode::BAD_GATEWAY, "bad_gateway")),
        ..Default::default()
    });
    let root = spawn_mock(Arc::clone(&mock)).await?;

    let result = connect_and_prepare(
        fixture_authenticator(&root)?,
        SPREADSHEET_ID,
        Some(api_base(&root)?),
    )
    .await;
    match result {
        Err(err) => assert!(err.is_transient(), "got {err}"),
        Ok(_) => panic!("expected the token failure to surface"),
    }
    assert_eq!(mock.count(|r| r.path.starts_with("/v4/")), 0);
    Ok(())
}
