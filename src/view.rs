//! Pure projection from [`DashboardState`] to what a presentation layer shows.
//!
//! The TUI, the text summary and the HTML export all draw from
//! [`DashboardView`]; none of them look at raw state.

use crate::model::{CampaignStatus, Mode, ModeInfo, Template};
use crate::state::{CampaignText, DashboardState, StartControl, TemplateTab};

/// Color semantics shared by every presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Present,
    Missing,
    Active,
    Muted,
    Neutral,
}

impl Tone {
    pub fn hex(self) -> &'static str {
        match self {
            Tone::Present => "#10b981",
            Tone::Missing => "#ef4444",
            Tone::Active => "#059669",
            Tone::Muted => "#64748b",
            Tone::Neutral => "#1e293b",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Indicator {
    pub label: &'static str,
    pub text: &'static str,
    pub tone: Tone,
}

/// Text and color of a file-presence indicator depend on `present` alone.
pub fn indicator(
    label: &'static str,
    present: bool,
    present_text: &'static str,
    missing_text: &'static str,
) -> Indicator {
    if present {
        Indicator {
            label,
            text: present_text,
            tone: Tone::Present,
        }
    } else {
        Indicator {
            label,
            text: missing_text,
            tone: Tone::Missing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeBadge {
    pub icon: &'static str,
    pub text: String,
    pub class: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonView {
    pub label: &'static str,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateCard {
    pub title: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardView {
    pub mode: Option<ModeBadge>,
    pub counters: Vec<(&'static str, u64)>,
    pub indicators: Vec<Indicator>,
    pub start_button: ButtonView,
    pub test_button: ButtonView,
    pub progress_visible: bool,
    pub campaign_text: &'static str,
    pub campaign_tone: Tone,
    pub template_tab: TemplateTab,
    pub templates: Vec<TemplateCard>,
}

pub const NO_TEMPLATES: &str = "No templates found.";

pub fn mode_badge(info: &ModeInfo) -> ModeBadge {
    match info.mode {
        Mode::New => ModeBadge {
            icon: "📧",
            text: format!("New Emails Mode ({})", info.day),
            class: "mode-new",
        },
        Mode::Followup => ModeBadge {
            icon: "🔄",
            text: format!("Follow-up Mode ({})", info.day),
            class: "mode-followup",
        },
        Mode::Rest => ModeBadge {
            icon: "⏸",
            text: format!("Weekly Rest ({})", info.day),
            class: "mode-weekend",
        },
    }
}

pub fn counters(status: &CampaignStatus) -> Vec<(&'static str, u64)> {
    vec![
        ("Sent", status.sent),
        ("Follow-ups", status.sent_followups),
        ("Pending", status.pending),
        ("Failed", status.failed),
    ]
}

pub fn indicators(status: &CampaignStatus) -> Vec<Indicator> {
    vec![
        indicator("PDF", status.has_pdf, "✓ Attached", "Missing"),
        indicator("Credentials", status.has_credentials, "✓ Ready", "Missing"),
        indicator(
            "Token",
            status.has_token,
            "✓ Uploaded",
            "Missing (Local Auth Required)",
        ),
    ]
}

/// Cards numbered from 1 in server order; an empty list yields one
/// placeholder card.
pub fn template_cards(templates: &[Template]) -> Vec<TemplateCard> {
    if templates.is_empty() {
        return vec![TemplateCard {
            title: NO_TEMPLATES.to_string(),
            body: String::new(),
        }];
    }
    templates
        .iter()
        .enumerate()
        .map(|(i, t)| TemplateCard {
            title: format!("#{}: {}", i + 1, t.subject),
            body: t.body.clone(),
        })
        .collect()
}

pub fn render(state: &DashboardState) -> DashboardView {
    let status = state.status.clone().unwrap_or_default();

    let start_button = match state.start {
        StartControl::Idle => ButtonView {
            label: "Start Campaign",
            enabled: true,
        },
        StartControl::Starting => ButtonView {
            label: "Starting...",
            enabled: false,
        },
        StartControl::Running => ButtonView {
            label: "Running...",
            enabled: false,
        },
    };

    let test_button = if state.test_sending {
        ButtonView {
            label: "Sending...",
            enabled: false,
        }
    } else {
        ButtonView {
            label: "Send",
            enabled: true,
        }
    };

    let (campaign_text, campaign_tone) = match state.campaign_text {
        CampaignText::Ready => ("Ready to start a campaign.", Tone::Neutral),
        CampaignText::Active => ("Campaign is actively sending emails...", Tone::Active),
        CampaignText::Completed => ("Last Run Complete. Ready for next batch.", Tone::Muted),
    };

    let templates = match (&state.templates, state.template_tab) {
        (Some(set), TemplateTab::New) => template_cards(&set.new_email_templates),
        (Some(set), TemplateTab::Followup) => template_cards(&set.followup_templates),
        (None, _) => Vec::new(),
    };

    DashboardView {
        mode: state.mode.as_ref().map(mode_badge),
        counters: counters(&status),
        indicators: indicators(&status),
        start_button,
        test_button,
        progress_visible: state.start == StartControl::Running,
        campaign_text,
        campaign_tone,
        template_tab: state.template_tab,
        templates,
    }
}

/// Escape text for inclusion in HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            other => out.push(other),
        }
    }
    out
}
