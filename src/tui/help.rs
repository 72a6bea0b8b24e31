use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

const KEYBINDS: &[(&str, &str)] = &[
    ("q / Ctrl-C", "Quit"),
    ("s", "Start campaign"),
    ("t", "Send test email"),
    ("1-4", "Upload CSV / PDF / credentials / token"),
    ("c", "Edit email content"),
    ("d", "Download recipient template"),
    ("r", "Refresh status now"),
    ("e", "Export snapshot as JSON"),
    ("y", "Copy last saved path to clipboard"),
    ("tab", "Switch tabs"),
    ("?", "Show this help"),
];

const TEMPLATE_KEYBINDS: &[(&str, &str)] = &[("f", "Toggle new / follow-up templates")];

const PROMPT_KEYBINDS: &[(&str, &str)] = &[("enter", "Submit"), ("esc", "Cancel")];

fn keybind_line(key: &'static str, action: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(format!("{key:<12}"), Style::default().fg(Color::Magenta)),
        Span::raw(action),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let mut lines = vec![Line::from("Keybinds:")];
    lines.extend(KEYBINDS.iter().map(|(k, a)| keybind_line(k, a)));
    lines.push(Line::from(""));
    lines.push(Line::from("Templates tab:"));
    lines.extend(TEMPLATE_KEYBINDS.iter().map(|(k, a)| keybind_line(k, a)));
    lines.push(Line::from(""));
    lines.push(Line::from("While a prompt is open:"));
    lines.extend(PROMPT_KEYBINDS.iter().map(|(k, a)| keybind_line(k, a)));

    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
