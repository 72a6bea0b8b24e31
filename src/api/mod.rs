//! Backend API surface.
//!
//! `CampaignApi` is the seam between dashboard logic and the transport: the
//! reqwest-backed [`HttpApi`] talks to the real backend, tests use a recording
//! mock. Every method maps to exactly one REST endpoint.

mod http;
#[cfg(test)]
pub(crate) mod mock;

pub(crate) use http::HttpApi;

use crate::model::{AckReply, CampaignStatus, ModeInfo, StartReply, StartRequest, TemplateSet};
use async_trait::async_trait;
use bytes::Bytes;

pub(crate) const MODE_PATH: &str = "/api/mode";
pub(crate) const STATUS_PATH: &str = "/api/status";
pub(crate) const TEMPLATES_PATH: &str = "/api/templates";
pub(crate) const SEND_EMAILS_PATH: &str = "/api/send-emails";
pub(crate) const SEND_TEST_PATH: &str = "/api/send-test";
pub(crate) const UPDATE_CONTENT_PATH: &str = "/api/update-content";
pub(crate) const DOWNLOAD_TEMPLATE_PATH: &str = "/api/download-template";

/// Failure of a single API call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("{0}")]
    Transport(String),
    /// Non-2xx response. `message` is the body's `error` field, if any.
    #[error("HTTP {status}: {}", message.as_deref().unwrap_or("no error message"))]
    Http { status: u16, message: Option<String> },
    /// 2xx response whose body did not match the expected shape.
    #[error("invalid response body: {0}")]
    Decode(String),
    /// Local file could not be read or written.
    #[error("{0}")]
    Io(String),
}

impl ApiError {
    /// User-facing text: the server's own message for HTTP failures,
    /// `fallback` when it sent none, and "Error: ..." for everything else.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Http {
                message: Some(m), ..
            } => m.clone(),
            ApiError::Http { message: None, .. } => fallback.to_string(),
            other => format!("Error: {other}"),
        }
    }

    /// Pull `error` out of a JSON error body. Non-JSON bodies yield `None`.
    pub fn from_error_body(status: u16, body: &[u8]) -> Self {
        let message = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string));
        ApiError::Http { status, message }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(e: std::io::Error) -> Self {
        ApiError::Io(e.to_string())
    }
}

/// A single file packaged for a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Bytes,
}

#[async_trait]
pub trait CampaignApi: Send + Sync {
    async fn fetch_mode(&self) -> Result<ModeInfo, ApiError>;

    async fn fetch_status(&self) -> Result<CampaignStatus, ApiError>;

    async fn fetch_templates(&self) -> Result<TemplateSet, ApiError>;

    /// POST one file as multipart field `file` to `endpoint`.
    async fn upload(&self, endpoint: &str, file: UploadFile) -> Result<AckReply, ApiError>;

    async fn start_campaign(&self, req: StartRequest) -> Result<StartReply, ApiError>;

    async fn send_test(&self, email: &str) -> Result<AckReply, ApiError>;

    async fn update_content(&self, subject: &str, body: &str) -> Result<AckReply, ApiError>;

    /// Raw template bytes; never decoded as text.
    async fn download_template(&self) -> Result<Bytes, ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_field_is_used_verbatim() {
        let e = ApiError::from_error_body(400, br#"{"error":"X"}"#);
        assert_eq!(e.user_message("Failed to start campaign"), "X");
    }

    #[test]
    fn missing_error_field_uses_fallback() {
        let e = ApiError::from_error_body(500, br#"{"detail":"boom"}"#);
        assert_eq!(e.user_message("Failed to send test"), "Failed to send test");
        let e = ApiError::from_error_body(502, b"<html>bad gateway</html>");
        assert_eq!(e.user_message("Failed to send test"), "Failed to send test");
    }

    #[test]
    fn transport_errors_are_prefixed() {
        let e = ApiError::Transport("connection refused".into());
        assert_eq!(e.user_message("unused"), "Error: connection refused");
    }
}
