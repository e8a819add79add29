//! The actions the harness can trigger, over the hosted API and the local store.
//!
//! Every action resolves to an already-serialized JSON string; the runner never
//! looks at the records themselves.

mod api;
mod store;

use api::ApiClient;
use store::LocalStore;

use crate::model::{Action, BlobEncoding, RunConfig};
use crate::runner::{self, DisplayState, InvocationResult};
use serde::Serialize;
use serde_json::{json, Value};

/// Failures raised by actions. The serialized form is what ends up on screen.
#[derive(Debug, thiserror::Error, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionError {
    #[error("no API endpoint configured (set --api-url or HARNESS_API_URL)")]
    NotConfigured,
    #[error("request failed: {message}")]
    Transport { message: String },
    #[error("API returned HTTP {status}")]
    Status { status: u16, body: Value },
    #[error("API returned GraphQL errors")]
    #[serde(rename = "graphql")]
    GraphQl { response: Value },
    #[error("unexpected response: {message}")]
    Decode { message: String },
    #[error("store failed: {message}")]
    Store { message: String },
    #[error("record {id} not found")]
    NotFound { id: String },
}

impl From<reqwest::Error> for ActionError {
    fn from(e: reqwest::Error) -> Self {
        ActionError::Transport {
            message: e.to_string(),
        }
    }
}

impl From<std::io::Error> for ActionError {
    fn from(e: std::io::Error) -> Self {
        ActionError::Store {
            message: e.to_string(),
        }
    }
}

impl From<serde_json::Error> for ActionError {
    fn from(e: serde_json::Error) -> Self {
        ActionError::Decode {
            message: e.to_string(),
        }
    }
}

/// Sample value written into both JSON-typed fields on create.
pub fn test_input_object() -> Value {
    json!({
        "key1": "hi",
        "key2": 3,
        "weirdKey:hello": { "nested": true }
    })
}

/// The sample value as the given encoding puts it on the wire.
pub fn encoded_blob(encoding: BlobEncoding) -> Value {
    let object = test_input_object();
    match encoding {
        BlobEncoding::Stringified => Value::String(object.to_string()),
        BlobEncoding::Object => object,
    }
}

/// Both access paths plus the settings that shape the create payload.
pub struct Backend {
    api: Option<ApiClient>,
    store: LocalStore,
    blob_encoding: BlobEncoding,
}

impl Backend {
    pub fn new(cfg: &RunConfig) -> anyhow::Result<Self> {
        let api = match cfg.api_url.as_deref() {
            Some(url) => Some(ApiClient::new(url, cfg)?),
            None => None,
        };
        Ok(Self {
            api,
            store: LocalStore::new(cfg.store_dir.clone()),
            blob_encoding: cfg.blob_encoding,
        })
    }

    fn api(&self) -> Result<&ApiClient, ActionError> {
        self.api.as_ref().ok_or(ActionError::NotConfigured)
    }

    pub async fn create_via_api(&self) -> Result<String, ActionError> {
        let blob = encoded_blob(self.blob_encoding);
        let response = self.api()?.create_todo(blob.clone(), Some(blob)).await?;
        Ok(serde_json::to_string(&response)?)
    }

    pub async fn create_via_store(&self) -> Result<String, ActionError> {
        let blob = encoded_blob(self.blob_encoding);
        let saved = self.store.save_new(blob.clone(), Some(blob)).await?;
        Ok(serde_json::to_string(&saved)?)
    }

    pub async fn list_via_api(&self) -> Result<String, ActionError> {
        let todos = self.api()?.list_todos().await?;
        let live: Vec<_> = todos.into_iter().filter(|t| !t.is_deleted()).collect();
        Ok(serde_json::to_string(&live)?)
    }

    pub async fn list_via_store(&self) -> Result<String, ActionError> {
        let todos = self.store.query().await?;
        Ok(serde_json::to_string(&todos)?)
    }

    /// Delete every stored record, all deletions in flight at once.
    pub async fn delete_all(&self) -> Result<(), ActionError> {
        let todos = self.store.query().await?;
        let n = todos.len();
        futures::future::try_join_all(todos.iter().map(|t| async move {
            match self.store.delete(&t.id).await {
                // Removed by an overlapping invocation since the query.
                Err(ActionError::NotFound { .. }) => Ok(()),
                other => other,
            }
        }))
        .await?;
        tracing::debug!(deleted = n, "deleted all store records");
        Ok(())
    }

    /// Run `action` through the operation runner into `display`. Bulk deletion takes the
    /// clear path; everything else the run path.
    pub async fn invoke_into(&self, action: Action, display: &mut DisplayState) {
        tracing::debug!(?action, "invoking");
        match action {
            Action::CreateViaApi => runner::run(display, || self.create_via_api()).await,
            Action::CreateViaStore => runner::run(display, || self.create_via_store()).await,
            Action::ListViaApi => runner::run(display, || self.list_via_api()).await,
            Action::ListViaStore => runner::run(display, || self.list_via_store()).await,
            Action::DeleteAll => runner::clear(display, || self.delete_all()).await,
        }
        if let InvocationResult::Failure { payload } = display.result() {
            tracing::warn!(?action, %payload, "action failed");
        }
    }

    /// Run `action` to settlement on a display slot of its own.
    pub async fn invoke(&self, action: Action) -> InvocationResult {
        let mut display = DisplayState::default();
        self.invoke_into(action, &mut display).await;
        display.into_result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::DELETE_ALL_CONFIRMATION;
    use std::time::Duration;

    fn config(dir: &std::path::Path, encoding: BlobEncoding) -> RunConfig {
        RunConfig {
            api_url: None,
            api_key: None,
            store_dir: dir.to_path_buf(),
            blob_encoding: encoding,
            timeout: Duration::from_secs(1),
            user_agent: "test".into(),
        }
    }

    #[test]
    fn stringified_blob_is_a_json_string() {
        let blob = encoded_blob(BlobEncoding::Stringified);
        let inner = blob.as_str().unwrap();
        let parsed: Value = serde_json::from_str(inner).unwrap();
        assert_eq!(parsed, test_input_object());
        assert_eq!(encoded_blob(BlobEncoding::Object), test_input_object());
    }

    #[test]
    fn errors_serialize_with_kind_tag() {
        let payload = runner::serialize_failure(&ActionError::NotFound { id: "x".into() });
        assert_eq!(payload, r#"{"kind":"not_found","id":"x"}"#);
        let payload = runner::serialize_failure(&ActionError::NotConfigured);
        assert_eq!(payload, r#"{"kind":"not_configured"}"#);
    }

    #[tokio::test]
    async fn api_actions_fail_without_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::new(&config(dir.path(), BlobEncoding::Stringified)).unwrap();
        let result = backend.invoke(Action::ListViaApi).await;
        assert_eq!(
            result,
            InvocationResult::Failure {
                payload: r#"{"kind":"not_configured"}"#.into()
            }
        );
    }

    #[tokio::test]
    async fn create_list_delete_through_store() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::new(&config(dir.path(), BlobEncoding::Object)).unwrap();

        let empty = backend.invoke(Action::ListViaStore).await;
        assert_eq!(empty.count(), Some(0));

        let created = backend.invoke(Action::CreateViaStore).await;
        assert_eq!(created.count(), None);
        let record: Value = serde_json::from_str(created.payload().unwrap()).unwrap();
        assert_eq!(record["requiredJsonBlog"], test_input_object());
        backend.invoke(Action::CreateViaStore).await;

        let listed = backend.invoke(Action::ListViaStore).await;
        assert_eq!(listed.count(), Some(2));

        let cleared = backend.invoke(Action::DeleteAll).await;
        assert_eq!(
            cleared,
            InvocationResult::Success {
                payload: DELETE_ALL_CONFIRMATION.into(),
                count: None
            }
        );
        assert_eq!(backend.invoke(Action::ListViaStore).await.count(), Some(0));
    }

    #[tokio::test]
    async fn overlapping_delete_alls_both_confirm() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::new(&config(dir.path(), BlobEncoding::Stringified)).unwrap();
        for _ in 0..20 {
            backend.invoke(Action::CreateViaStore).await;
        }

        let (a, b) = tokio::join!(
            backend.invoke(Action::DeleteAll),
            backend.invoke(Action::DeleteAll)
        );
        let confirmed = InvocationResult::Success {
            payload: DELETE_ALL_CONFIRMATION.into(),
            count: None,
        };
        assert_eq!(a, confirmed);
        assert_eq!(b, confirmed);
        assert_eq!(backend.invoke(Action::ListViaStore).await.count(), Some(0));
    }

    #[tokio::test]
    async fn list_during_delete_all_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::new(&config(dir.path(), BlobEncoding::Stringified)).unwrap();
        for _ in 0..20 {
            backend.invoke(Action::CreateViaStore).await;
        }

        let (listed, cleared) = tokio::join!(
            backend.invoke(Action::ListViaStore),
            backend.invoke(Action::DeleteAll)
        );
        assert!(!listed.is_failure(), "list failed: {listed:?}");
        assert!(listed.count().is_some_and(|n| n <= 20));
        assert_eq!(cleared.payload(), Some(DELETE_ALL_CONFIRMATION));
    }

    #[tokio::test]
    async fn invoke_into_resets_before_settling() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::new(&config(dir.path(), BlobEncoding::Stringified)).unwrap();
        let mut display = DisplayState::default();
        display.apply(InvocationResult::Failure {
            payload: "{}".into(),
        });
        backend.invoke_into(Action::ListViaStore, &mut display).await;
        assert_eq!(display.latest_response(), Some("[]"));
        assert_eq!(display.response_count(), Some(0));
    }

    #[tokio::test]
    async fn delete_all_on_empty_store_still_confirms() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Backend::new(&config(dir.path(), BlobEncoding::Stringified)).unwrap();
        let cleared = backend.invoke(Action::DeleteAll).await;
        assert_eq!(cleared.payload(), Some(DELETE_ALL_CONFIRMATION));
    }
}
