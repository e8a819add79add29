//! Hosted GraphQL API access.

use super::ActionError;
use crate::model::{RunConfig, Todo};
use anyhow::Context;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

const TODO_FIELDS: &str = "id requiredJsonBlog optionalJsonBlog createdAt updatedAt _version _deleted _lastChangedAt";

fn create_todo_document() -> String {
    format!(
        "mutation CreateTodo($input: CreateTodoInput!) {{ createTodo(input: $input) {{ {TODO_FIELDS} }} }}"
    )
}

fn list_todos_document() -> String {
    format!("query ListTodos {{ listTodos {{ items {{ {TODO_FIELDS} }} nextToken startedAt }} }}")
}

pub struct ApiClient {
    http: reqwest::Client,
    endpoint: String,
}

impl ApiClient {
    pub fn new(endpoint: &str, cfg: &RunConfig) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(key) = cfg.api_key.as_deref() {
            let mut value = HeaderValue::from_str(key).context("API key is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert("x-api-key", value);
        }
        let http = reqwest::Client::builder()
            .user_agent(cfg.user_agent.clone())
            .timeout(cfg.timeout)
            .default_headers(headers)
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
        })
    }

    /// POST a GraphQL document and return the response document when it carries no errors.
    async fn execute(&self, query: String, variables: Value) -> Result<Value, ActionError> {
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let status = resp.status().as_u16();
        let bytes = resp.bytes().await?;
        tracing::debug!(status, len = bytes.len(), "graphql response");
        check_response(status, &bytes)
    }

    /// Run `createTodo` and return the full response document.
    pub async fn create_todo(
        &self,
        required_json_blog: Value,
        optional_json_blog: Option<Value>,
    ) -> Result<Value, ActionError> {
        let variables = json!({
            "input": {
                "requiredJsonBlog": required_json_blog,
                "optionalJsonBlog": optional_json_blog,
            }
        });
        self.execute(create_todo_document(), variables).await
    }

    /// Run `listTodos` and return its items, deleted ones included.
    pub async fn list_todos(&self) -> Result<Vec<Todo>, ActionError> {
        let doc = self.execute(list_todos_document(), json!({})).await?;
        extract_list_items(doc)
    }
}

/// Classify a raw HTTP response from the GraphQL endpoint.
fn check_response(status: u16, body: &[u8]) -> Result<Value, ActionError> {
    let parsed: Option<Value> = serde_json::from_slice(body).ok();
    if !(200..300).contains(&status) {
        let body = parsed.unwrap_or_else(|| Value::String(String::from_utf8_lossy(body).into_owned()));
        return Err(ActionError::Status { status, body });
    }
    let doc = parsed.ok_or_else(|| ActionError::Decode {
        message: "response body is not JSON".into(),
    })?;
    let has_errors = doc
        .get("errors")
        .and_then(Value::as_array)
        .map(|errs| !errs.is_empty())
        .unwrap_or(false);
    if has_errors {
        return Err(ActionError::GraphQl { response: doc });
    }
    Ok(doc)
}

fn extract_list_items(mut doc: Value) -> Result<Vec<Todo>, ActionError> {
    let items = doc
        .pointer_mut("/data/listTodos/items")
        .map(Value::take)
        .ok_or_else(|| ActionError::Decode {
            message: "missing data.listTodos.items".into(),
        })?;
    Ok(serde_json::from_value(items)?)
}
