//! Text summary builder for line-oriented output.
//!
//! Formats the same `DashboardView` the TUI draws, one fact per line.

use crate::state::DashboardState;
use crate::view::render;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

pub(crate) fn build_text_summary(state: &DashboardState) -> TextSummary {
    let view = render(state);
    let mut lines = Vec::new();

    if let Some(badge) = &view.mode {
        lines.push(format!("Mode: {} {}", badge.icon, badge.text));
    }

    let counters = view
        .counters
        .iter()
        .map(|(label, value)| format!("{label} {value}"))
        .collect::<Vec<_>>()
        .join(" | ");
    lines.push(counters);

    for ind in &view.indicators {
        lines.push(format!("{}: {}", ind.label, ind.text));
    }

    let progress = if view.progress_visible { " [in progress]" } else { "" };
    lines.push(format!("Campaign: {}{progress}", view.campaign_text));

    if let Some(err) = state.last_fetch_error.as_deref() {
        lines.push(format!("Last fetch error: {err}"));
    }

    TextSummary { lines }
}
