use crate::actions::DEFAULT_TEMPLATE_FILE;
use crate::model::DashEvent;
use crate::orchestrator::UiCommand;
use crate::state::{reduce, DashboardState};
use crate::uploads::UploadSlot;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// How long a notification stays on screen.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(4);

pub const TAB_DASHBOARD: usize = 0;
pub const TAB_TEMPLATES: usize = 1;
pub const TAB_HELP: usize = 2;
pub const TAB_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptKind {
    TestEmail,
    Upload(UploadSlot),
    Subject,
    Body { subject: String },
    Download,
}

impl PromptKind {
    pub fn title(&self) -> String {
        match self {
            PromptKind::TestEmail => "Test email address".into(),
            PromptKind::Upload(slot) => format!("{} file path", slot.label()),
            PromptKind::Subject => "Subject".into(),
            PromptKind::Body { .. } => "Body (use \\n for line breaks)".into(),
            PromptKind::Download => format!("Save template as (default {DEFAULT_TEMPLATE_FILE})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub buffer: String,
}

/// Everything the UI thread owns. Campaign data lives in `dash` and only
/// changes through [`reduce`].
#[derive(Debug)]
pub struct UiState {
    pub dash: DashboardState,
    pub tab: usize,
    pub prompt: Option<Prompt>,
    pub notification_since: Option<Instant>,
    pub max_emails: Option<u32>,
    pub base_url: String,
    pub info: String,
}

impl UiState {
    pub fn new(base_url: impl Into<String>, max_emails: Option<u32>) -> Self {
        Self {
            dash: DashboardState::default(),
            tab: TAB_DASHBOARD,
            prompt: None,
            notification_since: None,
            max_emails,
            base_url: base_url.into(),
            info: String::new(),
        }
    }

    pub fn apply(&mut self, ev: DashEvent, now: Instant) {
        if matches!(ev, DashEvent::Notify(_)) {
            self.notification_since = Some(now);
        }
        let dash = std::mem::take(&mut self.dash);
        self.dash = reduce(dash, ev);
    }

    /// The current notification, if it has not expired yet. A newer one
    /// resets the clock.
    pub fn visible_notification(&self, now: Instant) -> Option<&crate::model::Notification> {
        let since = self.notification_since?;
        if now.saturating_duration_since(since) >= NOTIFICATION_TTL {
            return None;
        }
        self.dash.notification.as_ref()
    }

    pub fn next_tab(&mut self) {
        self.tab = (self.tab + 1) % TAB_COUNT;
    }

    pub fn open_prompt(&mut self, kind: PromptKind) {
        let buffer = match kind {
            PromptKind::TestEmail => self.dash.test_email.clone(),
            _ => String::new(),
        };
        self.prompt = Some(Prompt { kind, buffer });
    }

    /// Start a campaign if the control allows it. The control is locked here
    /// as well so a second key press cannot race the action's own event.
    pub(crate) fn start(&mut self) -> Option<UiCommand> {
        if !self.dash.can_start() {
            return None;
        }
        let dash = std::mem::take(&mut self.dash);
        self.dash = reduce(dash, DashEvent::StartRequested);
        Some(UiCommand::Start {
            max_emails: self.max_emails,
        })
    }

    /// Finish the open prompt. Returns the command to dispatch, if any; the
    /// content editor chains subject into body and only then yields one.
    pub(crate) fn submit_prompt(&mut self) -> Option<UiCommand> {
        let Prompt { kind, buffer } = self.prompt.take()?;
        match kind {
            PromptKind::TestEmail => {
                self.dash.test_email = buffer.clone();
                if !self.dash.can_send_test() {
                    return None;
                }
                Some(UiCommand::SendTest(buffer))
            }
            PromptKind::Upload(slot) => {
                let path = buffer.trim();
                Some(UiCommand::Upload {
                    slot,
                    path: (!path.is_empty()).then(|| PathBuf::from(path)),
                })
            }
            PromptKind::Subject => {
                self.prompt = Some(Prompt {
                    kind: PromptKind::Body { subject: buffer },
                    buffer: String::new(),
                });
                None
            }
            PromptKind::Body { subject } => Some(UiCommand::UpdateContent {
                subject,
                body: buffer.replace("\\n", "\n"),
            }),
            PromptKind::Download => {
                let path = buffer.trim();
                let path = if path.is_empty() {
                    DEFAULT_TEMPLATE_FILE
                } else {
                    path
                };
                Some(UiCommand::DownloadTemplate(PathBuf::from(path)))
            }
        }
    }

    pub fn cancel_prompt(&mut self) {
        self.prompt = None;
    }

    pub fn prompt_push(&mut self, c: char) {
        if let Some(p) = self.prompt.as_mut() {
            p.buffer.push(c);
        }
    }

    pub fn prompt_backspace(&mut self) {
        if let Some(p) = self.prompt.as_mut() {
            p.buffer.pop();
        }
    }
}
