//! Dashboard state and its reducer.
//!
//! State only changes through [`reduce`]. Rendering is a separate projection
//! (see `view`), so everything here is testable without a terminal.

use crate::model::{CampaignStatus, DashEvent, ModeInfo, Notification, TemplateSet};
use std::path::PathBuf;

/// Primary action control. `Running -> Idle` only happens when a poll
/// observes `is_running = false`; the start action never sets it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartControl {
    #[default]
    Idle,
    Starting,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CampaignText {
    #[default]
    Ready,
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateTab {
    #[default]
    New,
    Followup,
}

impl TemplateTab {
    pub fn toggled(self) -> Self {
        match self {
            TemplateTab::New => TemplateTab::Followup,
            TemplateTab::Followup => TemplateTab::New,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardState {
    pub mode: Option<ModeInfo>,
    pub status: Option<CampaignStatus>,
    pub templates: Option<TemplateSet>,
    pub start: StartControl,
    pub campaign_text: CampaignText,
    pub test_email: String,
    pub test_sending: bool,
    pub template_tab: TemplateTab,
    pub notification: Option<Notification>,
    pub last_fetch_error: Option<String>,
    pub last_saved_path: Option<PathBuf>,
}

impl DashboardState {
    pub fn can_start(&self) -> bool {
        self.start == StartControl::Idle
    }

    pub fn can_send_test(&self) -> bool {
        !self.test_sending
    }
}

/// Reconcile a freshly fetched status into the state.
pub fn apply_status(state: &DashboardState, status: &CampaignStatus) -> DashboardState {
    let mut next = state.clone();
    if status.is_running {
        next.start = StartControl::Running;
        next.campaign_text = CampaignText::Active;
    } else {
        if state.start == StartControl::Running {
            next.campaign_text = CampaignText::Completed;
        }
        next.start = StartControl::Idle;
    }
    next.status = Some(status.clone());
    next.last_fetch_error = None;
    next
}

pub fn apply_mode(state: &DashboardState, mode: &ModeInfo) -> DashboardState {
    DashboardState {
        mode: Some(mode.clone()),
        last_fetch_error: None,
        ..state.clone()
    }
}

pub fn reduce(state: DashboardState, ev: DashEvent) -> DashboardState {
    match ev {
        DashEvent::StatusLoaded(status) => apply_status(&state, &status),
        DashEvent::ModeLoaded(mode) => apply_mode(&state, &mode),
        DashEvent::TemplatesLoaded(templates) => DashboardState {
            templates: Some(templates),
            ..state
        },
        DashEvent::FetchFailed { resource, message } => DashboardState {
            last_fetch_error: Some(format!("{}: {message}", resource.as_str())),
            ..state
        },
        DashEvent::StartRequested => {
            if state.start == StartControl::Idle {
                DashboardState {
                    start: StartControl::Starting,
                    ..state
                }
            } else {
                state
            }
        }
        // A poll may already have seen a run started elsewhere; keep that lock.
        DashEvent::StartFailed if state.start == StartControl::Starting => DashboardState {
            start: StartControl::Idle,
            ..state
        },
        DashEvent::StartFailed => state,
        DashEvent::TestSendStarted => DashboardState {
            test_sending: true,
            ..state
        },
        DashEvent::TestSendFinished { ok } => {
            let mut next = state;
            next.test_sending = false;
            if ok {
                next.test_email.clear();
            }
            next
        }
        DashEvent::FileSaved(path) => DashboardState {
            last_saved_path: Some(path),
            ..state
        },
        DashEvent::Notify(n) => DashboardState {
            notification: Some(n),
            ..state
        },
    }
}
