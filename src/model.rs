use crate::runner::InvocationResult;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub api_url: Option<String>,
    pub api_key: Option<String>,
    pub store_dir: PathBuf,
    pub blob_encoding: BlobEncoding,
    pub timeout: Duration,
    pub user_agent: String,
}

/// How the sample object is written into the JSON-typed fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BlobEncoding {
    /// A JSON string holding the serialized object.
    #[default]
    Stringified,
    /// The object itself.
    Object,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
pub enum Action {
    #[serde(rename = "create-api")]
    #[value(name = "create-api")]
    CreateViaApi,
    #[serde(rename = "create-store")]
    #[value(name = "create-store")]
    CreateViaStore,
    #[serde(rename = "list-api")]
    #[value(name = "list-api")]
    ListViaApi,
    #[serde(rename = "list-store")]
    #[value(name = "list-store")]
    ListViaStore,
    #[serde(rename = "delete-all")]
    DeleteAll,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::CreateViaApi,
        Action::CreateViaStore,
        Action::ListViaApi,
        Action::ListViaStore,
        Action::DeleteAll,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Action::CreateViaApi => "Create Via API",
            Action::CreateViaStore => "Create Via DataStore",
            Action::ListViaApi => "List Via API",
            Action::ListViaStore => "List Via DataStore",
            Action::DeleteAll => "Delete All",
        }
    }

    /// Key that triggers the action in the TUI.
    pub fn key(self) -> char {
        match self {
            Action::CreateViaApi => '1',
            Action::CreateViaStore => '2',
            Action::ListViaApi => '3',
            Action::ListViaStore => '4',
            Action::DeleteAll => '5',
        }
    }

    pub fn from_key(c: char) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.key() == c)
    }
}

/// A `Todo` record as both the hosted API and the local store represent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub required_json_blog: serde_json::Value,
    #[serde(default)]
    pub optional_json_blog: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    // Sync metadata, only present on records that came from the hosted API.
    #[serde(rename = "_version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
    #[serde(rename = "_deleted", default, skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
    #[serde(
        rename = "_lastChangedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub last_changed_at: Option<i64>,
}

impl Todo {
    pub fn is_deleted(&self) -> bool {
        self.deleted.unwrap_or(false)
    }
}

/// Events emitted by the controller and consumed by presentation layers.
#[derive(Debug, Clone)]
pub enum HarnessEvent {
    Started {
        id: u64,
        action: Action,
    },
    Settled {
        id: u64,
        action: Action,
        result: InvocationResult,
        elapsed: Duration,
    },
    Info(String),
}

/// A settled invocation as written by `--json` and the TUI export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationReport {
    pub action: Action,
    pub timestamp_utc: String,
    #[serde(with = "humantime_serde")]
    pub elapsed: Duration,
    pub result: InvocationResult,
}

impl InvocationReport {
    pub fn new(action: Action, elapsed: Duration, result: InvocationResult) -> Self {
        Self {
            action,
            timestamp_utc: now_rfc3339(),
            elapsed,
            result,
        }
    }
}

pub fn now_rfc3339() -> String {
    time::OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn todo_uses_wire_field_names() {
        let todo = Todo {
            id: "abc".into(),
            required_json_blog: json!("{\"a\":1}"),
            optional_json_blog: None,
            created_at: None,
            updated_at: None,
            version: Some(1),
            deleted: None,
            last_changed_at: None,
        };
        let v = serde_json::to_value(&todo).unwrap();
        assert_eq!(
            v,
            json!({
                "id": "abc",
                "requiredJsonBlog": "{\"a\":1}",
                "optionalJsonBlog": null,
                "_version": 1
            })
        );
    }

    #[test]
    fn todo_accepts_api_items() {
        let item = json!({
            "id": "1",
            "requiredJsonBlog": {"k": true},
            "createdAt": "2024-01-01T00:00:00.000Z",
            "updatedAt": "2024-01-01T00:00:00.000Z",
            "_version": 2,
            "_deleted": true,
            "_lastChangedAt": 1704067200000i64
        });
        let todo: Todo = serde_json::from_value(item).unwrap();
        assert!(todo.is_deleted());
        assert_eq!(todo.optional_json_blog, None);
        assert_eq!(todo.required_json_blog, json!({"k": true}));
    }

    #[test]
    fn action_keys_round_trip() {
        for action in Action::ALL {
            assert_eq!(Action::from_key(action.key()), Some(action));
        }
        assert_eq!(Action::from_key('9'), None);
    }

    #[test]
    fn action_keys_leave_fixed_bindings_alone() {
        for c in ['q', 's', 'y', 'k', 'j', '?'] {
            assert_eq!(Action::from_key(c), None, "{c} is bound to an action");
        }
    }

    #[test]
    fn report_serializes_elapsed_as_humantime() {
        let report = InvocationReport::new(
            Action::ListViaStore,
            Duration::from_millis(1500),
            InvocationResult::Empty,
        );
        let v = serde_json::to_value(&report).unwrap();
        assert_eq!(v["action"], json!("list-store"));
        assert_eq!(v["elapsed"], json!("1s 500ms"));
        assert_eq!(v["result"], json!({"state": "empty"}));
    }
}
