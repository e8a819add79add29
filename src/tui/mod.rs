mod export;
mod help;
mod state;

use crate::backend::Backend;
use crate::cli::{build_config, Cli};
use crate::model::{Action, HarnessEvent};
use crate::orchestrator::{self, UiCommand};
use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Tabs, Wrap},
    Terminal,
};
use state::{push_wrapped_status_kv, UiState};
use std::sync::Arc;
use std::{io, time::Duration, time::Instant};
use tokio::sync::mpsc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

pub async fn run(args: Cli) -> Result<()> {
    let cfg = build_config(&args);
    let backend = Arc::new(Backend::new(&cfg)?);

    let (event_tx, event_rx) = mpsc::unbounded_channel::<HarnessEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    // TUI runs in a dedicated thread to keep all blocking I/O out of the Tokio runtime.
    let state = UiState::from_config(&cfg);
    let ui_handle = std::thread::spawn(move || run_threaded(state, event_rx, cmd_tx));

    let res = orchestrator::run_controller(backend, event_tx, cmd_rx).await;

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

/// Run the TUI loop on a dedicated thread.
fn run_threaded(
    mut state: UiState,
    mut event_rx: UnboundedReceiver<HarnessEvent>,
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
        // Drain events without blocking; UiState is owned by this thread only.
        while let Ok(ev) = event_rx.try_recv() {
            state.handle_event(ev);
        }

        if last_tick.elapsed() >= tick_rate {
            terminal.draw(|f| draw(f.area(), f, &state)).ok();
            last_tick = Instant::now();
        }

        // Poll input with a short timeout to avoid blocking the render loop.
        if event::poll(Duration::from_millis(10)).unwrap_or(false) {
            if let Ok(Event::Key(k)) = event::read() {
                if k.kind != KeyEventKind::Press {
                    continue;
                }
                match (k.modifiers, k.code) {
                    (_, KeyCode::Char('q')) | (KeyModifiers::CONTROL, KeyCode::Char('c')) => {
                        let _ = cmd_tx.send(UiCommand::Quit);
                        break Ok(());
                    }
                    (_, KeyCode::Char('s')) => export::save_and_show_path(&mut state),
                    (_, KeyCode::Char('y')) => export::copy_payload(&mut state),
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => state.scroll_payload(-1),
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => state.scroll_payload(1),
                    (_, KeyCode::PageUp) => state.scroll_payload(-10),
                    (_, KeyCode::PageDown) => state.scroll_payload(10),
                    (_, KeyCode::Tab) => state.tab = (state.tab + 1) % 2,
                    (_, KeyCode::Char('?')) => state.tab = 1,
                    (_, KeyCode::Char(c)) => {
                        if let Some(action) = Action::from_key(c) {
                            state.tab = 0;
                            if cmd_tx.send(UiCommand::Invoke(action)).is_err() {
                                state.info = "Controller stopped; restart the harness.".into();
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    };

    disable_raw_mode().ok();
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen).ok();
    res
}

fn draw(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)].as_ref())
        .split(area);

    let tabs = Tabs::new(vec![Line::from("Dashboard"), Line::from("Help")])
        .select(state.tab)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("JSON Field Type Tests"),
        )
        .highlight_style(Style::default().fg(Color::Yellow));
    f.render_widget(tabs, chunks[0]);

    match state.tab {
        0 => draw_dashboard(chunks[1], f, state),
        _ => help::draw_help(chunks[1], f),
    }
}

fn button_row(actions: &[Action], state: &UiState) -> Line<'static> {
    let mut spans = Vec::new();
    for action in actions {
        let style = if state.is_running(*action) {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(Color::Cyan)
        };
        spans.push(Span::styled(format!("[{}]", action.key()), Style::default().fg(Color::Magenta)));
        spans.push(Span::raw(" "));
        spans.push(Span::styled(action.label().to_string(), style));
        spans.push(Span::raw("    "));
    }
    Line::from(spans)
}

fn draw_dashboard(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let mut status_lines = Vec::new();
    push_wrapped_status_kv(
        &mut status_lines,
        "API",
        state.api_url.as_deref().unwrap_or("(not configured)"),
        area.width,
    );
    push_wrapped_status_kv(&mut status_lines, "Store", &state.store_dir, area.width);
    push_wrapped_status_kv(
        &mut status_lines,
        "Encoding",
        &format!("{:?}", state.blob_encoding),
        area.width,
    );
    if let Some(path) = state.last_exported_path.as_deref() {
        push_wrapped_status_kv(&mut status_lines, "Last saved", path, area.width);
    }
    push_wrapped_status_kv(&mut status_lines, "Status", &state.info, area.width);
    let status_height = status_lines.len() as u16 + 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(status_height),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(area);

    let rows: [(&str, &[Action]); 3] = [
        ("Create Invocations", &[Action::CreateViaApi, Action::CreateViaStore]),
        ("List Invocations", &[Action::ListViaApi, Action::ListViaStore]),
        ("Clean Up", &[Action::DeleteAll]),
    ];
    for (i, (title, actions)) in rows.iter().enumerate() {
        let p = Paragraph::new(button_row(actions, state))
            .block(Block::default().borders(Borders::ALL).title(*title));
        f.render_widget(p, chunks[i]);
    }

    let status = Paragraph::new(status_lines)
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[3]);

    draw_latest_response(chunks[4], f, state);
}

fn draw_latest_response(area: Rect, f: &mut ratatui::Frame, state: &UiState) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("Latest Response");

    let Some(payload) = state.display.latest_response() else {
        let hint = if state.in_flight.is_empty() {
            "No response yet"
        } else {
            "Waiting for response…"
        };
        let p = Paragraph::new(Line::from(Span::styled(
            hint,
            Style::default().fg(Color::DarkGray),
        )))
        .block(block);
        f.render_widget(p, area);
        return;
    };

    let mut lines = Vec::new();
    if let Some(count) = state.display.response_count() {
        lines.push(Line::from(vec![
            Span::styled("Response Count: ", Style::default().fg(Color::Gray)),
            Span::styled(count.to_string(), Style::default().fg(Color::Green)),
        ]));
    }
    lines.push(Line::from(Span::styled(
        "Deserialized Response",
        Style::default().fg(Color::Gray),
    )));
    lines.push(Line::from(payload.to_string()));

    let p = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((state.payload_scroll, 0));
    f.render_widget(p, area);
}
