//! Local record store: one JSON file per `Todo` under `<root>/todos/`.

use super::ActionError;
use crate::model::{now_rfc3339, Todo};
use rand::RngCore;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub struct LocalStore {
    root: PathBuf,
}

/// Generate a random record id (128 bits, lowercase hex).
fn gen_id() -> String {
    let mut b = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut b);
    b.iter().map(|x| format!("{x:02x}")).collect()
}

impl LocalStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    fn todos_dir(&self) -> PathBuf {
        self.root.join("todos")
    }

    fn record_path(&self, id: &str) -> PathBuf {
        self.todos_dir().join(format!("{id}.json"))
    }

    /// Create and persist a new record, returning it as stored.
    pub async fn save_new(
        &self,
        required_json_blog: Value,
        optional_json_blog: Option<Value>,
    ) -> Result<Todo, ActionError> {
        let now = now_rfc3339();
        let todo = Todo {
            id: gen_id(),
            required_json_blog,
            optional_json_blog,
            created_at: Some(now.clone()),
            updated_at: Some(now),
            version: None,
            deleted: None,
            last_changed_at: None,
        };
        self.save(&todo).await?;
        Ok(todo)
    }

    pub async fn save(&self, todo: &Todo) -> Result<(), ActionError> {
        let dir = self.todos_dir();
        tokio::fs::create_dir_all(&dir).await?;
        let data = serde_json::to_vec_pretty(todo)?;
        let path = self.record_path(&todo.id);
        let tmp = dir.join(format!(".{}.tmp", todo.id));
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(id = %todo.id, path = %path.display(), "saved record");
        Ok(())
    }

    /// All stored records, oldest first.
    pub async fn query(&self) -> Result<Vec<Todo>, ActionError> {
        let dir = self.todos_dir();
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(rd) => rd,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut todos = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if !is_record_file(&path) {
                continue;
            }
            // Another invocation may have deleted it since the listing.
            let data = match tokio::fs::read(&path).await {
                Ok(data) => data,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            let todo: Todo = serde_json::from_slice(&data).map_err(|e| ActionError::Decode {
                message: format!("{}: {e}", path.display()),
            })?;
            todos.push(todo);
        }
        todos.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(todos)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ActionError> {
        match tokio::fs::remove_file(self.record_path(id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ActionError::NotFound { id: id.into() }),
            Err(e) => Err(e.into()),
        }
    }
}

fn is_record_file(path: &Path) -> bool {
    let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
    let hidden = path
        .file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(true);
    is_json && !hidden
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn query_on_missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().join("nope"));
        assert!(store.query().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn saved_records_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().to_path_buf());
        let saved = store
            .save_new(json!("{\"key1\":\"hi\"}"), None)
            .await
            .unwrap();
        assert_eq!(saved.id.len(), 32);
        assert!(saved.created_at.is_some());

        let all = store.query().await.unwrap();
        assert_eq!(all, vec![saved]);
    }

    #[tokio::test]
    async fn query_orders_by_creation_time() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().to_path_buf());
        for (id, ts) in [("b", "2024-01-02T00:00:00Z"), ("a", "2024-01-03T00:00:00Z"), ("c", "2024-01-01T00:00:00Z")] {
            let todo = Todo {
                id: id.into(),
                required_json_blog: json!({}),
                optional_json_blog: None,
                created_at: Some(ts.into()),
                updated_at: Some(ts.into()),
                version: None,
                deleted: None,
                last_changed_at: None,
            };
            store.save(&todo).await.unwrap();
        }
        let ids: Vec<_> = store.query().await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[tokio::test]
    async fn stray_files_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().to_path_buf());
        store.save_new(json!({}), None).await.unwrap();
        std::fs::write(dir.path().join("todos").join(".partial.tmp"), b"{").unwrap();
        std::fs::write(dir.path().join("todos").join("notes.txt"), b"x").unwrap();
        assert_eq!(store.query().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn corrupt_record_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().to_path_buf());
        std::fs::create_dir_all(dir.path().join("todos")).unwrap();
        std::fs::write(dir.path().join("todos").join("bad.json"), b"{not json").unwrap();
        assert!(matches!(
            store.query().await,
            Err(ActionError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn query_skips_records_removed_after_listing() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().to_path_buf());
        for _ in 0..30 {
            store.save_new(json!({}), None).await.unwrap();
        }
        let ids: Vec<_> = store.query().await.unwrap().into_iter().map(|t| t.id).collect();

        let remove_all = async {
            for id in &ids {
                store.delete(id).await.unwrap();
            }
        };
        let (listed, ()) = tokio::join!(store.query(), remove_all);
        assert!(listed.unwrap().len() <= 30);
        assert!(store.query().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_missing_record_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path().to_path_buf());
        let err = store.delete("ghost").await.unwrap_err();
        assert!(matches!(err, ActionError::NotFound { ref id } if id == "ghost"));
    }
}
