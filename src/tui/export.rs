use anyhow::{Context, Result};
use std::sync::mpsc as std_mpsc;
use std::sync::OnceLock;
use std::time::Duration;

use super::state::UiState;

// Clipboard worker channel, started on first copy.
static CLIPBOARD_SENDER: OnceLock<std_mpsc::Sender<String>> = OnceLock::new();

/// Write the report for the on-screen response into the working directory.
/// Returns the absolute path of the written file.
pub fn save_current_report(state: &UiState) -> Result<std::path::PathBuf> {
    let report = state
        .current_report()
        .context("no settled response to save yet")?;
    let current_dir = std::env::current_dir().context("get current directory")?;
    let path = current_dir.join(crate::storage::report_file_name(&report));
    crate::storage::export_json(&path, &report)?;
    Ok(path)
}

/// Save and put the outcome in the status line.
pub fn save_and_show_path(state: &mut UiState) {
    match save_current_report(state) {
        Ok(path) => {
            state.info = format!("Saved: {}", path.display());
            state.last_exported_path = Some(path.to_string_lossy().to_string());
        }
        Err(e) => state.info = format!("Save failed: {e:#}"),
    }
}

/// Start the clipboard thread once. Each copy keeps its clipboard handle alive for a
/// while so clipboard managers on Linux can read the contents.
fn init_clipboard_manager() -> Result<&'static std_mpsc::Sender<String>> {
    CLIPBOARD_SENDER.get_or_init(|| {
        let (tx, rx) = std_mpsc::channel::<String>();
        std::thread::spawn(move || {
            use arboard::Clipboard;

            for text in rx {
                if let Ok(mut clipboard) = Clipboard::new() {
                    if clipboard.set_text(&text).is_ok() {
                        std::thread::sleep(Duration::from_secs(2));
                    }
                }
            }
        });
        tx
    });

    CLIPBOARD_SENDER
        .get()
        .ok_or_else(|| anyhow::anyhow!("Failed to initialize clipboard manager"))
}

/// Queue `text` for the clipboard without blocking the UI thread.
pub fn copy_to_clipboard(text: &str) -> Result<()> {
    let sender = init_clipboard_manager()?;
    sender
        .send(text.to_string())
        .map_err(|_| anyhow::anyhow!("Clipboard manager channel closed"))?;
    Ok(())
}

/// Copy the on-screen payload and report in the status line.
pub fn copy_payload(state: &mut UiState) {
    let Some(payload) = state.display.latest_response().map(str::to_string) else {
        state.info = "Nothing to copy yet.".into();
        return;
    };
    state.info = match copy_to_clipboard(&payload) {
        Ok(()) => format!("✓ Copied {} chars to clipboard", payload.chars().count()),
        Err(e) => format!("Clipboard copy failed: {e:#}"),
    };
}
