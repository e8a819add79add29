use crate::model::Action;
use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn key_line(key: &str, pad: usize, what: &str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key.to_string(), Style::default().fg(Color::Magenta)),
        Span::raw(format!("{:pad$}{what}", "")),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame) {
    let mut lines = vec![Line::from("Actions:")];
    for action in Action::ALL {
        lines.push(key_line(&action.key().to_string(), 12, action.label()));
    }
    lines.extend([
        Line::from(""),
        Line::from("Keybinds:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("q", Style::default().fg(Color::Magenta)),
            Span::raw(" / "),
            Span::styled("Ctrl-C", Style::default().fg(Color::Magenta)),
            Span::raw("  Quit"),
        ]),
        key_line("s", 12, "Save latest response as JSON"),
        key_line("y", 12, "Copy latest payload to clipboard"),
        key_line("↑/↓", 10, "Scroll response"),
        key_line("tab", 10, "Switch tabs"),
        key_line("?", 12, "Show this help"),
        Line::from(""),
        Line::from("Overlapping actions all run; the last one to finish is shown."),
    ]);
    let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
