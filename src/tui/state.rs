use crate::model::{Action, BlobEncoding, HarnessEvent, InvocationReport, RunConfig};
use crate::orchestrator::{apply_event, Applied};
use crate::runner::DisplayState;
use ratatui::{
    style::Color,
    style::Style,
    text::{Line, Span},
};
use std::collections::BTreeMap;
use std::time::Duration;

pub struct UiState {
    pub tab: usize,
    pub info: String,

    // Single writer: only `handle_event` touches the display slots.
    pub display: DisplayState,
    pub in_flight: BTreeMap<u64, Action>,
    pub last_settled: Option<(Action, Duration)>,
    pub payload_scroll: u16,

    pub api_url: Option<String>,
    pub store_dir: String,
    pub blob_encoding: BlobEncoding,
    pub last_exported_path: Option<String>,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            tab: 0,
            info: String::new(),
            display: DisplayState::default(),
            in_flight: BTreeMap::new(),
            last_settled: None,
            payload_scroll: 0,
            api_url: None,
            store_dir: String::new(),
            blob_encoding: BlobEncoding::default(),
            last_exported_path: None,
        }
    }
}

impl UiState {
    pub fn from_config(cfg: &RunConfig) -> Self {
        Self {
            api_url: cfg.api_url.clone(),
            store_dir: cfg.store_dir.display().to_string(),
            blob_encoding: cfg.blob_encoding,
            info: "Press 1-5 to run an action, ? for help".into(),
            ..Default::default()
        }
    }

    pub fn handle_event(&mut self, ev: HarnessEvent) {
        match apply_event(&mut self.display, &ev) {
            Applied::Reset | Applied::Settled => self.payload_scroll = 0,
            Applied::Unchanged => {}
        }
        match ev {
            HarnessEvent::Started { id, action } => {
                self.in_flight.insert(id, action);
                self.last_settled = None;
                self.info = format!("{}…", action.label());
            }
            HarnessEvent::Settled {
                id,
                action,
                result,
                elapsed,
            } => {
                self.in_flight.remove(&id);
                self.last_settled = Some((action, elapsed));
                let outcome = if result.is_failure() { "failed" } else { "done" };
                self.info = format!(
                    "{}: {outcome} in {}",
                    action.label(),
                    humantime::format_duration(Duration::from_millis(elapsed.as_millis() as u64))
                );
            }
            HarnessEvent::Info(msg) => self.info = msg,
        }
    }

    pub fn is_running(&self, action: Action) -> bool {
        self.in_flight.values().any(|a| *a == action)
    }

    /// Report for what is on screen, if anything has settled since the last start.
    pub fn current_report(&self) -> Option<InvocationReport> {
        let (action, elapsed) = self.last_settled?;
        self.display.latest_response()?;
        Some(InvocationReport::new(
            action,
            elapsed,
            self.display.result().clone(),
        ))
    }

    pub fn scroll_payload(&mut self, delta: i32) {
        let next = i32::from(self.payload_scroll) + delta;
        self.payload_scroll = next.clamp(0, i32::from(u16::MAX)) as u16;
    }
}

/// Append `label: value` to `out`, breaking the value over as many lines as the
/// panel width needs. Continuation lines are indented by two spaces.
pub fn push_wrapped_status_kv(
    out: &mut Vec<Line<'static>>,
    label: &str,
    value: &str,
    status_area_width: u16,
) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }

    // Borders take two columns on each side.
    let usable = usize::from(status_area_width.saturating_sub(4).max(1));
    let label_text = format!("{label}:");
    let first_width = usable.saturating_sub(label_text.chars().count() + 1).max(1);
    let rest_width = usable.saturating_sub(2).max(1);

    let chars: Vec<char> = value.chars().collect();
    let (head, mut tail) = chars.split_at(first_width.min(chars.len()));
    out.push(Line::from(vec![
        Span::styled(label_text, Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::raw(head.iter().collect::<String>()),
    ]));
    while !tail.is_empty() {
        let (chunk, next) = tail.split_at(rest_width.min(tail.len()));
        out.push(Line::from(vec![
            Span::raw("  "),
            Span::raw(chunk.iter().collect::<String>()),
        ]));
        tail = next;
    }
}
