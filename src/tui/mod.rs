mod clipboard;
mod help;
mod state;

use crate::api::CampaignApi;
use crate::cli::Cli;
use crate::model::{ClientConfig, DashEvent, Notification, NotificationKind};
use crate::orchestrator::{self, UiCommand};
use crate::state::TemplateTab;
use crate::uploads::UploadSlot;
use crate::view::{self, DashboardView, Tone};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{PromptKind, UiState, TAB_DASHBOARD, TAB_HELP, TAB_TEMPLATES};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli, cfg: ClientConfig, api: Arc<dyn CampaignApi>) -> Result<()> {
    let (event_tx, event_rx) = mpsc::unbounded_channel::<DashEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // Terminal I/O is blocking, so the UI gets its own thread and talks to
    // the runtime only through the two channels.
    let ui_state = UiState::new(cfg.base_url.clone(), args.max_emails);
    let ui_handle = std::thread::spawn(move || run_threaded(ui_state, event_rx, cmd_tx));

    let res = orchestrator::run_controller(api, &cfg, event_tx, cmd_rx).await;

    let join_res = tokio::task::spawn_blocking(move || ui_handle.join()).await;
    if let Ok(joined) = join_res {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(e),
            Err(_) => return Err(anyhow::anyhow!("TUI thread panicked")),
        }
    }

    res
}

fn run_threaded(
    mut state: UiState,
    mut event_rx: UnboundedReceiver<DashEvent>,
    cmd_tx: UnboundedSender<UiCommand>,
) -> Result<()> {
    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).ok();

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;
    terminal.clear().ok();

    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();

    let res = loop {
        while let Ok(ev) = event_rx.try_recv() {
            state.apply(ev, Instant::now());
        }

        if last_tick.elapsed() >= tick_rate {
            let now = Instant::now();
            terminal.draw(|f| draw(f.area(), f, &state, now)).ok();
            last_tick = now;
        }

        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            let Ok(Event::Key(k)) = event::read() else {
                continue;
            };
            if k.kind != KeyEventKind::Press {
                continue;
            }
            match handle_key(&mut state, k) {
                KeyOutcome::Quit => {
                    let _ = cmd_tx.send(UiCommand::Quit);
                    break Ok(());
                }
                KeyOutcome::Send(cmd) => {
                    tracing::debug!(?cmd, "dispatching");
                    if cmd_tx.send(cmd).is_err() {
                        break Err(anyhow::anyhow!("controller stopped"));
                    }
                }
                KeyOutcome::Export => export_snapshot(&mut state),
                KeyOutcome::CopyPath => copy_saved_path(&mut state),
                KeyOutcome::Continue => {}
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

#[derive(Debug, PartialEq, Eq)]
enum KeyOutcome {
    Continue,
    Quit,
    Send(UiCommand),
    Export,
    CopyPath,
}

fn handle_key(state: &mut UiState, k: KeyEvent) -> KeyOutcome {
    if k.modifiers == KeyModifiers::CONTROL && k.code == KeyCode::Char('c') {
        return KeyOutcome::Quit;
    }

    if state.prompt.is_some() {
        match k.code {
            KeyCode::Esc => state.cancel_prompt(),
            KeyCode::Enter => {
                if let Some(cmd) = state.submit_prompt() {
                    return KeyOutcome::Send(cmd);
                }
            }
            KeyCode::Backspace => state.prompt_backspace(),
            KeyCode::Char(c) => state.prompt_push(c),
            _ => {}
        }
        return KeyOutcome::Continue;
    }

    match k.code {
        KeyCode::Char('q') => return KeyOutcome::Quit,
        KeyCode::Char('s') => {
            if let Some(cmd) = state.start() {
                return KeyOutcome::Send(cmd);
            }
        }
        KeyCode::Char('t') => {
            if state.dash.can_send_test() {
                state.open_prompt(PromptKind::TestEmail);
            }
        }
        KeyCode::Char(c @ '1'..='4') => {
            let slot = match c {
                '1' => UploadSlot::Csv,
                '2' => UploadSlot::Pdf,
                '3' => UploadSlot::Credentials,
                _ => UploadSlot::Token,
            };
            state.open_prompt(PromptKind::Upload(slot));
        }
        KeyCode::Char('c') => state.open_prompt(PromptKind::Subject),
        KeyCode::Char('d') => state.open_prompt(PromptKind::Download),
        KeyCode::Char('r') => return KeyOutcome::Send(UiCommand::Refresh),
        KeyCode::Char('e') => return KeyOutcome::Export,
        KeyCode::Char('y') => return KeyOutcome::CopyPath,
        KeyCode::Char('f') if state.tab == TAB_TEMPLATES => {
            state.dash.template_tab = state.dash.template_tab.toggled();
        }
        KeyCode::Tab => state.next_tab(),
        KeyCode::Char('?') => state.tab = TAB_HELP,
        _ => {}
    }
    KeyOutcome::Continue
}

fn export_snapshot(state: &mut UiState) {
    let snap = crate::export::snapshot_from_state(&state.dash, &state.base_url);
    let name = format!(
        "campaign-dash-{}.json",
        snap.fetched_at_utc.replace(':', "-").replace('T', "_")
    );
    let res = std::env::current_dir()
        .context("get current directory")
        .map(|dir| dir.join(name))
        .and_then(|path| crate::export::export_json(&path, &snap).map(|_| path));
    let now = Instant::now();
    match res {
        Ok(path) => {
            let msg = format!("Exported: {}", path.display());
            state.apply(DashEvent::FileSaved(path), now);
            state.apply(DashEvent::Notify(Notification::success(msg)), now);
        }
        Err(e) => {
            tracing::warn!(error = %e, "export failed");
            state.apply(
                DashEvent::Notify(Notification::error(format!("Export failed: {e:#}"))),
                now,
            );
        }
    }
}

fn copy_saved_path(state: &mut UiState) {
    let Some(path) = state.dash.last_saved_path.clone() else {
        state.info = "Nothing saved yet".into();
        return;
    };
    state.info = match clipboard::copy_to_clipboard(&path.display().to_string()) {
        Ok(()) => format!("Copied: {}", path.display()),
        Err(e) => format!("Copy failed: {e:#}"),
    };
}

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Present => Color::Rgb(0x10, 0xb9, 0x81),
        Tone::Missing => Color::Rgb(0xef, 0x44, 0x44),
        Tone::Active => Color::Rgb(0x05, 0x96, 0x69),
        Tone::Muted => Color::Rgb(0x64, 0x74, 0x8b),
        Tone::Neutral => Color::Reset,
    }
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState, now: Instant) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(3),
            ]
            .as_ref(),
        )
        .split(area);

    let tabs = Tabs::new(vec![
        Line::from("Dashboard"),
        Line::from("Templates"),
        Line::from("Help"),
    ])
    .select(state.tab)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("campaign-dash  {}", state.base_url)),
    )
    .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    let view = view::render(&state.dash);
    match state.tab {
        TAB_DASHBOARD => draw_dashboard(chunks[1], f, &view),
        TAB_TEMPLATES => draw_templates(chunks[1], f, &view),
        _ => help::draw_help(chunks[1], f),
    }

    draw_footer(chunks[2], f, state, now);
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, view: &DashboardView) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3), // mode badge
                Constraint::Length(4), // counters
                Constraint::Length(6), // files + campaign control
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(area);

    let mode_line = match &view.mode {
        Some(badge) => Line::from(vec![
            Span::raw(format!("{} ", badge.icon)),
            Span::styled(
                badge.text.clone(),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]),
        None => Line::from(Span::styled(
            "Loading mode...",
            Style::default().fg(tone_color(Tone::Muted)),
        )),
    };
    f.render_widget(
        Paragraph::new(mode_line).block(Block::default().borders(Borders::ALL).title("Mode")),
        rows[0],
    );

    let counter_cells = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 4); 4].as_ref())
        .split(rows[1]);
    for (cell, (label, value)) in counter_cells.iter().zip(view.counters.iter()) {
        let p = Paragraph::new(Line::from(Span::styled(
            value.to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        )))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL).title(*label));
        f.render_widget(p, *cell);
    }

    let mid = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(rows[2]);

    let indicator_lines: Vec<Line> = view
        .indicators
        .iter()
        .map(|ind| {
            Line::from(vec![
                Span::styled(format!("{:<13}", ind.label), Style::default().fg(Color::Gray)),
                Span::styled(ind.text, Style::default().fg(tone_color(ind.tone))),
            ])
        })
        .collect();
    f.render_widget(
        Paragraph::new(indicator_lines).block(Block::default().borders(Borders::ALL).title("Files")),
        mid[0],
    );

    draw_campaign(mid[1], f, view);

    let hints = Paragraph::new(vec![
        Line::from(vec![
            Span::styled("s", Style::default().fg(Color::Magenta)),
            Span::raw(" start  "),
            Span::styled("t", Style::default().fg(Color::Magenta)),
            Span::raw(" test  "),
            Span::styled("1-4", Style::default().fg(Color::Magenta)),
            Span::raw(" upload  "),
            Span::styled("c", Style::default().fg(Color::Magenta)),
            Span::raw(" content  "),
            Span::styled("d", Style::default().fg(Color::Magenta)),
            Span::raw(" template  "),
            Span::styled("?", Style::default().fg(Color::Magenta)),
            Span::raw(" help"),
        ]),
        Line::from(format!(
            "Test email: {}",
            if view.test_button.enabled {
                "ready"
            } else {
                view.test_button.label
            }
        )),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .title("Keyboard Shortcuts"),
    );
    f.render_widget(hints, rows[3]);
}

fn draw_campaign(area: Rect, f: &mut ratatui::Frame, view: &DashboardView) {
    let block = Block::default().borders(Borders::ALL).title("Campaign");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(1), Constraint::Min(0)].as_ref())
        .split(inner);

    let button_style = if view.start_button.enabled {
        Style::default().fg(Color::Black).bg(tone_color(Tone::Present))
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let text = Paragraph::new(vec![
        Line::from(vec![
            Span::styled(format!(" {} ", view.start_button.label), button_style),
        ]),
        Line::from(Span::styled(
            view.campaign_text,
            Style::default().fg(tone_color(view.campaign_tone)),
        )),
    ])
    .wrap(Wrap { trim: true });
    f.render_widget(text, parts[0]);

    if view.progress_visible {
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(tone_color(Tone::Active)))
            .ratio(progress_ratio(&view.counters))
            .label("sending");
        f.render_widget(gauge, parts[1]);
    }
}

/// Share of this batch already sent; pending includes what is still queued.
fn progress_ratio(counters: &[(&'static str, u64)]) -> f64 {
    let get = |name: &str| {
        counters
            .iter()
            .find(|(label, _)| *label == name)
            .map(|(_, v)| *v)
            .unwrap_or(0)
    };
    let done = get("Sent") + get("Follow-ups");
    let total = done + get("Pending");
    if total == 0 {
        return 0.0;
    }
    (done as f64 / total as f64).clamp(0.0, 1.0)
}

fn draw_templates(area: Rect, f: &mut ratatui::Frame, view: &DashboardView) {
    let title = match view.template_tab {
        TemplateTab::New => "New email templates  (f: show follow-up)",
        TemplateTab::Followup => "Follow-up templates  (f: show new)",
    };
    let mut lines = Vec::new();
    for card in &view.templates {
        lines.push(Line::from(Span::styled(
            card.title.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        for body_line in card.body.lines() {
            lines.push(Line::from(format!("  {body_line}")));
        }
        lines.push(Line::from(""));
    }
    let p = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

fn draw_footer(area: Rect, f: &mut ratatui::Frame, state: &UiState, now: Instant) {
    let (title, line) = if let Some(prompt) = &state.prompt {
        (
            prompt.kind.title(),
            Line::from(vec![
                Span::raw(prompt.buffer.clone()),
                Span::styled("█", Style::default().fg(Color::Gray)),
            ]),
        )
    } else if let Some(n) = state.visible_notification(now) {
        let color = match n.kind {
            NotificationKind::Success => tone_color(Tone::Present),
            NotificationKind::Error => tone_color(Tone::Missing),
        };
        (
            "Status".to_string(),
            Line::from(Span::styled(n.message.clone(), Style::default().fg(color))),
        )
    } else {
        let text = state
            .dash
            .last_fetch_error
            .as_ref()
            .map(|e| format!("Last fetch failed: {e}"))
            .unwrap_or_else(|| state.info.clone());
        (
            "Status".to_string(),
            Line::from(Span::styled(text, Style::default().fg(Color::Gray))),
        )
    };
    f.render_widget(
        Paragraph::new(line).block(Block::default().borders(Borders::ALL).title(title)),
        area,
    );
}
