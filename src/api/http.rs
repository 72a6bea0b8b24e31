use super::{
    ApiError, CampaignApi, UploadFile, DOWNLOAD_TEMPLATE_PATH, MODE_PATH, SEND_EMAILS_PATH,
    SEND_TEST_PATH, STATUS_PATH, TEMPLATES_PATH, UPDATE_CONTENT_PATH,
};
use crate::model::{
    AckReply, CampaignStatus, ClientConfig, ModeInfo, StartReply, StartRequest, TemplateSet,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{multipart, Response, Url};
use serde::de::DeserializeOwned;

/// reqwest-backed client for the campaign backend.
#[derive(Clone)]
pub(crate) struct HttpApi {
    http: reqwest::Client,
    base: Url,
}

impl HttpApi {
    /// A path in `base_url` is kept as a prefix: `http://host/dash` serves
    /// status from `http://host/dash/api/status`.
    pub fn new(cfg: &ClientConfig) -> Result<Self> {
        let mut base = Url::parse(&cfg.base_url)
            .with_context(|| format!("invalid base URL {:?}", cfg.base_url))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("base URL {:?} cannot carry paths", cfg.base_url);
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let mut builder = reqwest::Client::builder().user_agent(cfg.user_agent.clone());
        if let Some(timeout) = cfg.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("build HTTP client")?;

        Ok(Self { http, base })
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| ApiError::Transport(format!("bad URL for {path}: {e}")))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self
            .http
            .get(self.url(path)?)
            .send()
            .await
            .map_err(transport)?;
        read_json(resp).await
    }

    async fn post<B>(&self, path: &str, body: &B) -> Result<Response, ApiError>
    where
        B: serde::Serialize + ?Sized,
    {
        self.http
            .post(self.url(path)?)
            .json(body)
            .send()
            .await
            .map_err(transport)
    }
}

fn transport(e: reqwest::Error) -> ApiError {
    ApiError::Transport(e.to_string())
}

/// Read the whole body; non-2xx becomes `ApiError::Http` carrying the
/// body's `error` field when it has one.
async fn read_success_body(resp: Response) -> Result<Bytes, ApiError> {
    let status = resp.status();
    let body = resp.bytes().await.map_err(transport)?;
    if !status.is_success() {
        return Err(ApiError::from_error_body(status.as_u16(), &body));
    }
    Ok(body)
}

/// Strict decode for the read endpoints the dashboard renders from.
async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let body = read_success_body(resp).await?;
    if body.is_empty() {
        return serde_json::from_slice(b"{}").map_err(|e| ApiError::Decode(e.to_string()));
    }
    serde_json::from_slice(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// Action endpoints: any 2xx is success whatever the body looks like. Fields
/// are picked out only when present with the expected type.
fn lenient_fields(body: &[u8]) -> serde_json::Map<String, serde_json::Value> {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}

fn message_field(fields: &serde_json::Map<String, serde_json::Value>) -> Option<String> {
    fields
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

fn ack_from_body(body: &[u8]) -> AckReply {
    let fields = lenient_fields(body);
    AckReply {
        success: fields
            .get("success")
            .and_then(|v| v.as_bool())
            .unwrap_or(true),
        message: message_field(&fields),
    }
}

fn start_reply_from_body(body: &[u8]) -> StartReply {
    let fields = lenient_fields(body);
    StartReply {
        sent: fields.get("sent").and_then(|v| v.as_u64()),
        message: message_field(&fields),
    }
}

async fn read_ack(resp: Response) -> Result<AckReply, ApiError> {
    read_success_body(resp).await.map(|b| ack_from_body(&b))
}

#[async_trait]
impl CampaignApi for HttpApi {
    async fn fetch_mode(&self) -> Result<ModeInfo, ApiError> {
        self.get_json(MODE_PATH).await
    }

    async fn fetch_status(&self) -> Result<CampaignStatus, ApiError> {
        self.get_json(STATUS_PATH).await
    }

    async fn fetch_templates(&self) -> Result<TemplateSet, ApiError> {
        self.get_json(TEMPLATES_PATH).await
    }

    async fn upload(&self, endpoint: &str, file: UploadFile) -> Result<AckReply, ApiError> {
        let part = multipart::Part::bytes(file.bytes.to_vec()).file_name(file.file_name);
        let form = multipart::Form::new().part("file", part);
        let resp = self
            .http
            .post(self.url(endpoint)?)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        read_ack(resp).await
    }

    async fn start_campaign(&self, req: StartRequest) -> Result<StartReply, ApiError> {
        let resp = self.post(SEND_EMAILS_PATH, &req).await?;
        let body = read_success_body(resp).await?;
        Ok(start_reply_from_body(&body))
    }

    async fn send_test(&self, email: &str) -> Result<AckReply, ApiError> {
        let resp = self
            .post(SEND_TEST_PATH, &serde_json::json!({ "email": email }))
            .await?;
        read_ack(resp).await
    }

    async fn update_content(&self, subject: &str, body: &str) -> Result<AckReply, ApiError> {
        let resp = self
            .post(
                UPDATE_CONTENT_PATH,
                &serde_json::json!({ "subject": subject, "body": body }),
            )
            .await?;
        read_ack(resp).await
    }

    async fn download_template(&self) -> Result<Bytes, ApiError> {
        let resp = self
            .http
            .get(self.url(DOWNLOAD_TEMPLATE_PATH)?)
            .send()
            .await
            .map_err(transport)?;
        read_success_body(resp).await
    }
}
