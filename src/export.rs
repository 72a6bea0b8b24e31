//! Snapshot exports: pretty JSON and a standalone HTML report.

use crate::model::{DashEvent, Snapshot};
use crate::state::{reduce, DashboardState, TemplateTab};
use crate::view::{escape_html, render, template_cards, DashboardView};
use anyhow::{Context, Result};
use std::fmt::Write as _;
use std::path::Path;

/// Rebuild dashboard state from a snapshot as if each resource had just
/// been polled.
pub fn state_from_snapshot(snap: &Snapshot) -> DashboardState {
    let mut events = Vec::new();
    if let Some(m) = snap.mode.clone() {
        events.push(DashEvent::ModeLoaded(m));
    }
    if let Some(s) = snap.status.clone() {
        events.push(DashEvent::StatusLoaded(s));
    }
    if let Some(t) = snap.templates.clone() {
        events.push(DashEvent::TemplatesLoaded(t));
    }
    events.into_iter().fold(DashboardState::default(), reduce)
}

/// Inverse of [`state_from_snapshot`] for whatever the session has seen so far.
pub fn snapshot_from_state(state: &DashboardState, base_url: &str) -> Snapshot {
    Snapshot {
        fetched_at_utc: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "now".into()),
        base_url: base_url.to_string(),
        mode: state.mode.clone(),
        status: state.status.clone(),
        templates: state.templates.clone(),
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    Ok(())
}

pub fn export_json(path: &Path, snap: &Snapshot) -> Result<()> {
    ensure_parent(path)?;
    let data = serde_json::to_vec_pretty(snap).context("serialize snapshot")?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

pub fn export_html(path: &Path, snap: &Snapshot) -> Result<()> {
    ensure_parent(path)?;
    let html = build_html(snap);
    std::fs::write(path, html).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn push_cards(out: &mut String, heading: &str, view_cards: &[crate::view::TemplateCard]) {
    let _ = writeln!(out, "<h2>{}</h2>", escape_html(heading));
    for card in view_cards {
        let _ = writeln!(
            out,
            "<div class=\"template-card\"><div class=\"template-subject\">{}</div><div class=\"template-body\">{}</div></div>",
            escape_html(&card.title),
            escape_html(&card.body)
        );
    }
}

/// Every server-supplied string goes through `escape_html`.
pub fn build_html(snap: &Snapshot) -> String {
    let state = state_from_snapshot(snap);
    let view: DashboardView = render(&state);
    let mut out = String::new();

    out.push_str("<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>Campaign snapshot</title></head><body>\n");
    let _ = writeln!(
        out,
        "<p class=\"meta\">{} &middot; {}</p>",
        escape_html(&snap.base_url),
        escape_html(&snap.fetched_at_utc)
    );

    if let Some(badge) = &view.mode {
        let _ = writeln!(
            out,
            "<div class=\"mode-badge {}\">{} {}</div>",
            badge.class,
            badge.icon,
            escape_html(&badge.text)
        );
    }

    out.push_str("<table class=\"counters\">\n");
    for (label, value) in &view.counters {
        let _ = writeln!(out, "<tr><th>{}</th><td>{value}</td></tr>", escape_html(label));
    }
    out.push_str("</table>\n<ul class=\"indicators\">\n");
    for ind in &view.indicators {
        let _ = writeln!(
            out,
            "<li>{}: <span style=\"color: {}\">{}</span></li>",
            escape_html(ind.label),
            ind.tone.hex(),
            escape_html(ind.text)
        );
    }
    out.push_str("</ul>\n");
    let _ = writeln!(
        out,
        "<p class=\"campaign-status\" style=\"color: {}\">{}</p>",
        view.campaign_tone.hex(),
        escape_html(view.campaign_text)
    );

    if let Some(set) = &snap.templates {
        push_cards(&mut out, "New email templates", &template_cards(&set.new_email_templates));
        push_cards(&mut out, "Follow-up templates", &template_cards(&set.followup_templates));
    }

    out.push_str("</body></html>\n");
    out
}

/// Render the selected template tab's cards as plain text.
pub fn template_lines(state: &DashboardState) -> Vec<String> {
    let view = render(state);
    let heading = match view.template_tab {
        TemplateTab::New => "New email templates",
        TemplateTab::Followup => "Follow-up templates",
    };
    let mut lines = vec![heading.to_string()];
    for card in view.templates {
        lines.push(format!("  {}", card.title));
        for body_line in card.body.lines() {
            lines.push(format!("    {body_line}"));
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CampaignStatus, Mode, ModeInfo, Template, TemplateSet};

    fn snapshot() -> Snapshot {
        Snapshot {
            fetched_at_utc: "2026-01-05T10:00:00Z".into(),
            base_url: "http://127.0.0.1:5000".into(),
            mode: Some(ModeInfo {
                mode: Mode::New,
                day: "Monday".into(),
            }),
            status: Some(CampaignStatus {
                sent: 2,
                has_pdf: true,
                ..Default::default()
            }),
            templates: Some(TemplateSet {
                new_email_templates: vec![Template {
                    subject: "<script>alert('x')</script>".into(),
                    body: "Hi {name} & co".into(),
                }],
                followup_templates: vec![],
            }),
        }
    }

    #[test]
    fn html_escapes_server_strings() {
        let html = build_html(&snapshot());
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#039;x&#039;)&lt;/script&gt;"));
        assert!(html.contains("Hi {name} &amp; co"));
        assert!(html.contains("New Emails Mode (Monday)"));
        assert!(html.contains("No templates found."));
        assert!(html.contains("#10b981"));
    }

    #[test]
    fn json_export_round_trips_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("snap.json");
        export_json(&path, &snapshot()).unwrap();
        let back: Snapshot = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back.status.unwrap().sent, 2);
    }

    #[test]
    fn state_snapshot_round_trip_keeps_resources() {
        let snap = snapshot();
        let back = snapshot_from_state(&state_from_snapshot(&snap), &snap.base_url);
        assert_eq!(back.mode, snap.mode);
        assert_eq!(back.status, snap.status);
        assert_eq!(back.templates, snap.templates);
    }

    #[test]
    fn template_lines_indent_bodies() {
        let state = state_from_snapshot(&snapshot());
        let lines = template_lines(&state);
        assert_eq!(lines[0], "New email templates");
        assert_eq!(lines[1], "  #1: <script>alert('x')</script>");
        assert_eq!(lines[2], "    Hi {name} & co");
    }
}
