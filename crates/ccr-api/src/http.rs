use ccr_schemas::ReferenceDirectory;
use chrono::NaiveDate;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{ApiError, BackOfficeApi, ReconciliationSubmission, ReportKind, SubmissionReceipt};

/// Longest slice of an error body carried into [`ApiError::Status`].
const MAX_ERROR_BODY: usize = 512;

/// HTTP/JSON back-office client.
///
/// The bearer token is set by the caller (from the environment or from
/// [`BackOfficeApi::login`]); it is never logged.
#[derive(Clone)]
pub struct HttpBackOfficeApi {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl std::fmt::Debug for HttpBackOfficeApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackOfficeApi")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: String,
}

impl HttpBackOfficeApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authed(&self, req: RequestBuilder) -> Result<RequestBuilder, ApiError> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| ApiError::Auth("no bearer token; log in first".to_string()))?;
        Ok(req.bearer_auth(token))
    }

    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response, ApiError> {
        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::Transport(format!("{what} request failed: {e}")))?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(ApiError::Status {
            code: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T, ApiError> {
        resp.json()
            .await
            .map_err(|e| ApiError::Decode(format!("{what} response json decode failed: {e}")))
    }
}

/// `message` or `error` from a JSON error body, else the (truncated) raw text.
fn error_message(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error"]
                .iter()
                .find_map(|k| v.get(k).and_then(|m| m.as_str()).map(str::to_string))
        });
    let msg = from_json.unwrap_or_else(|| body.trim().to_string());
    if msg.is_empty() {
        return "empty response body".to_string();
    }
    match msg.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &msg[..cut]),
        None => msg,
    }
}

#[async_trait::async_trait]
impl BackOfficeApi for HttpBackOfficeApi {
    async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let req = self
            .http
            .post(self.url("auth/login"))
            .json(&LoginRequest { username, password });
        let resp = self.send(req, "login").await?;
        let body: LoginResponse = Self::decode(resp, "login").await?;
        if body.token.trim().is_empty() {
            return Err(ApiError::Auth("login returned an empty token".to_string()));
        }
        info!(username, "back office login ok");
        Ok(body.token)
    }

    async fn fetch_reference_directory(&self) -> Result<ReferenceDirectory, ApiError> {
        let req = self.authed(self.http.get(self.url("machines")))?;
        let resp = self.send(req, "machines").await?;
        let dir: ReferenceDirectory = Self::decode(resp, "machines").await?;
        debug!(machines = dir.len(), "reference directory fetched");
        Ok(dir)
    }

    async fn submit_reconciliation(
        &self,
        submission: &ReconciliationSubmission,
    ) -> Result<SubmissionReceipt, ApiError> {
        let req = self.authed(self.http.post(self.url("reconciliations")).json(submission))?;
        let resp = self.send(req, "submission").await?;
        let receipt: SubmissionReceipt = Self::decode(resp, "submission").await?;
        info!(
            id = %receipt.id,
            submission_id = %receipt.submission_id,
            "reconciliation submitted"
        );
        Ok(receipt)
    }

    async fn fetch_report(&self, kind: ReportKind, date: NaiveDate) -> Result<Vec<u8>, ApiError> {
        let date_s = date.format("%Y-%m-%d").to_string();
        let req = self.authed(
            self.http
                .get(self.url(&format!("reports/{}", kind.as_str())))
                .query(&[("date", date_s.as_str())]),
        )?;
        let resp = self.send(req, "report").await?;
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| ApiError::Transport(format!("report body read failed: {e}")))?;
        debug!(kind = kind.as_str(), date = %date_s, bytes = bytes.len(), "report fetched");
        Ok(bytes.to_vec())
    }
}
