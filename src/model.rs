use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,
    #[serde(default, with = "humantime_serde")]
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

/// Day-based sending behavior reported by `/api/mode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    New,
    Followup,
    #[default]
    Rest,
}

impl Mode {
    /// Anything other than `new` or `followup` is a rest day.
    pub fn parse(s: &str) -> Self {
        match s {
            "new" => Mode::New,
            "followup" => Mode::Followup,
            _ => Mode::Rest,
        }
    }
}

impl<'de> Deserialize<'de> for Mode {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Mode::parse(&raw))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModeInfo {
    pub mode: Mode,
    #[serde(default)]
    pub day: String,
}

/// Campaign counters and file-presence flags from `/api/status`.
///
/// Fields absent from the payload decode as zero/false. Counts are unsigned,
/// so a negative value from the server is a decode error rather than a
/// displayed number.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CampaignStatus {
    #[serde(default)]
    pub sent: u64,
    #[serde(default)]
    pub sent_followups: u64,
    #[serde(default)]
    pub pending: u64,
    #[serde(default)]
    pub failed: u64,
    #[serde(default)]
    pub has_pdf: bool,
    #[serde(default)]
    pub has_credentials: bool,
    #[serde(default)]
    pub has_token: bool,
    #[serde(default)]
    pub is_running: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemplateSet {
    #[serde(default)]
    pub new_email_templates: Vec<Template>,
    #[serde(default)]
    pub followup_templates: Vec<Template>,
}

/// Body of `POST /api/send-emails`. An absent limit serializes as `{}`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct StartRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_emails: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartReply {
    #[serde(default)]
    pub sent: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Generic `{success, message}` reply used by uploads and content updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AckReply {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

/// Resources fetched by the poller; used to label fetch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resource {
    Mode,
    Status,
    Templates,
}

impl Resource {
    pub fn as_str(self) -> &'static str {
        match self {
            Resource::Mode => "mode",
            Resource::Status => "status",
            Resource::Templates => "templates",
        }
    }
}

/// Everything that can change dashboard state. Poll results and action
/// outcomes arrive in any order over the same channel.
#[derive(Debug, Clone)]
pub enum DashEvent {
    ModeLoaded(ModeInfo),
    StatusLoaded(CampaignStatus),
    TemplatesLoaded(TemplateSet),
    FetchFailed { resource: Resource, message: String },
    StartRequested,
    StartFailed,
    TestSendStarted,
    TestSendFinished { ok: bool },
    FileSaved(std::path::PathBuf),
    Notify(Notification),
}

/// Point-in-time copy of everything fetched, for `status --json` and exports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub fetched_at_utc: String,
    pub base_url: String,
    pub mode: Option<ModeInfo>,
    pub status: Option<CampaignStatus>,
    pub templates: Option<TemplateSet>,
}
