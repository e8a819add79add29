//! Filesystem locations and report files.

use crate::model::InvocationReport;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "json-field-harness";

/// Default root of the local record store.
pub fn default_store_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(format!(".{APP_DIR}")))
}

/// Default file name for a saved report, derived from its timestamp and action.
pub fn report_file_name(report: &InvocationReport) -> String {
    let action = serde_json::to_value(report.action)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_else(|| "invocation".to_string());
    format!(
        "{APP_DIR}-{}-{}.json",
        report.timestamp_utc.replace(':', "-").replace('T', "_"),
        action
    )
}

pub fn export_json(path: &Path, report: &InvocationReport) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let data = serde_json::to_vec_pretty(report).context("serialize report")?;
    std::fs::write(path, data).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Action;
    use crate::runner::InvocationResult;
    use std::time::Duration;

    fn report() -> InvocationReport {
        InvocationReport {
            action: Action::ListViaApi,
            timestamp_utc: "2024-05-01T10:20:30Z".into(),
            elapsed: Duration::from_millis(12),
            result: InvocationResult::Success {
                payload: "[1]".into(),
                count: Some(1),
            },
        }
    }

    #[test]
    fn file_name_is_filesystem_safe() {
        assert_eq!(
            report_file_name(&report()),
            "json-field-harness-2024-05-01_10-20-30Z-list-api.json"
        );
    }

    #[test]
    fn export_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.json");
        export_json(&path, &report()).unwrap();

        let back: InvocationReport =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(back.result, report().result);
        assert_eq!(back.elapsed, Duration::from_millis(12));
    }
}
