//! Recording mock of [`CampaignApi`] for unit tests.
//!
//! Every call is recorded; replies come from per-endpoint slots that default
//! to a plain success.

use super::{ApiError, CampaignApi, UploadFile};
use crate::model::{AckReply, CampaignStatus, ModeInfo, StartReply, StartRequest, TemplateSet};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum MockCall {
    FetchMode,
    FetchStatus,
    FetchTemplates,
    Upload { endpoint: String, file_name: String },
    StartCampaign(Option<u32>),
    SendTest(String),
    UpdateContent { subject: String, body: String },
    DownloadTemplate,
}

pub(crate) struct MockApi {
    calls: Mutex<Vec<MockCall>>,
    mode: Mutex<Result<ModeInfo, ApiError>>,
    status: Mutex<Result<CampaignStatus, ApiError>>,
    templates: Mutex<Result<TemplateSet, ApiError>>,
    ack: Mutex<Result<AckReply, ApiError>>,
    start: Mutex<Result<StartReply, ApiError>>,
    download: Mutex<Result<Bytes, ApiError>>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    match m.lock() {
        Ok(g) => g,
        Err(poisoned) => poisoned.into_inner(),
    }
}

impl MockApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            mode: Mutex::new(Ok(ModeInfo::default())),
            status: Mutex::new(Ok(CampaignStatus::default())),
            templates: Mutex::new(Ok(TemplateSet::default())),
            ack: Mutex::new(Ok(AckReply {
                success: true,
                message: None,
            })),
            start: Mutex::new(Ok(StartReply::default())),
            download: Mutex::new(Ok(Bytes::new())),
        }
    }

    pub fn with_mode(self, r: Result<ModeInfo, ApiError>) -> Self {
        *lock(&self.mode) = r;
        self
    }

    pub fn with_status(self, r: Result<CampaignStatus, ApiError>) -> Self {
        *lock(&self.status) = r;
        self
    }

    pub fn with_templates(self, r: Result<TemplateSet, ApiError>) -> Self {
        *lock(&self.templates) = r;
        self
    }

    /// Reply for uploads, send-test and update-content.
    pub fn with_ack(self, r: Result<AckReply, ApiError>) -> Self {
        *lock(&self.ack) = r;
        self
    }

    pub fn with_start(self, r: Result<StartReply, ApiError>) -> Self {
        *lock(&self.start) = r;
        self
    }

    pub fn with_download(self, r: Result<Bytes, ApiError>) -> Self {
        *lock(&self.download) = r;
        self
    }

    pub fn set_status(&self, r: Result<CampaignStatus, ApiError>) {
        *lock(&self.status) = r;
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn count(&self, pred: impl Fn(&MockCall) -> bool) -> usize {
        lock(&self.calls).iter().filter(|c| pred(c)).count()
    }

    fn record(&self, call: MockCall) {
        lock(&self.calls).push(call);
    }
}

#[async_trait]
impl CampaignApi for MockApi {
    async fn fetch_mode(&self) -> Result<ModeInfo, ApiError> {
        self.record(MockCall::FetchMode);
        lock(&self.mode).clone()
    }

    async fn fetch_status(&self) -> Result<CampaignStatus, ApiError> {
        self.record(MockCall::FetchStatus);
        lock(&self.status).clone()
    }

    async fn fetch_templates(&self) -> Result<TemplateSet, ApiError> {
        self.record(MockCall::FetchTemplates);
        lock(&self.templates).clone()
    }

    async fn upload(&self, endpoint: &str, file: UploadFile) -> Result<AckReply, ApiError> {
        self.record(MockCall::Upload {
            endpoint: endpoint.to_string(),
            file_name: file.file_name,
        });
        lock(&self.ack).clone()
    }

    async fn start_campaign(&self, req: StartRequest) -> Result<StartReply, ApiError> {
        self.record(MockCall::StartCampaign(req.max_emails));
        lock(&self.start).clone()
    }

    async fn send_test(&self, email: &str) -> Result<AckReply, ApiError> {
        self.record(MockCall::SendTest(email.to_string()));
        lock(&self.ack).clone()
    }

    async fn update_content(&self, subject: &str, body: &str) -> Result<AckReply, ApiError> {
        self.record(MockCall::UpdateContent {
            subject: subject.to_string(),
            body: body.to_string(),
        });
        lock(&self.ack).clone()
    }

    async fn download_template(&self) -> Result<Bytes, ApiError> {
        self.record(MockCall::DownloadTemplate);
        lock(&self.download).clone()
    }
}
