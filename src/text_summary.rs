//! Text summary builder for CLI output.
//!
//! Formats the display slots as human-readable lines for text mode.

use crate::runner::InvocationResult;

/// Pre-formatted lines for text output.
pub(crate) struct TextSummary {
    pub lines: Vec<String>,
}

/// Build a text summary of the latest response.
pub(crate) fn build_text_summary(result: &InvocationResult) -> TextSummary {
    let mut lines = Vec::new();

    let Some(payload) = result.payload() else {
        lines.push("No response yet".to_string());
        return TextSummary { lines };
    };

    lines.push("Latest Response".to_string());
    if let Some(count) = result.count() {
        lines.push(format!("Response Count: {count}"));
    }
    lines.push("Deserialized Response:".to_string());
    lines.push(payload.to_string());

    TextSummary { lines }
}
