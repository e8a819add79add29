//! Operation runner.
//!
//! Executes one asynchronous action, captures its payload or failure, and derives the
//! display summary (payload string plus an optional element count). The display state
//! has a single writer; overlapping invocations are last-write-wins on settle order.

use serde::de::{self, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::future::Future;

/// Payload stored when the bulk-delete path succeeds.
pub const DELETE_ALL_CONFIRMATION: &str = "Deleted all Todos";

/// Payload used when an error value cannot itself be encoded.
const UNENCODABLE_FAILURE: &str = "{}";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InvocationResult {
    /// No invocation has settled since the last reset.
    #[default]
    Empty,
    Success {
        payload: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        count: Option<usize>,
    },
    Failure {
        payload: String,
    },
}

impl InvocationResult {
    pub fn payload(&self) -> Option<&str> {
        match self {
            InvocationResult::Empty => None,
            InvocationResult::Success { payload, .. } | InvocationResult::Failure { payload } => {
                Some(payload)
            }
        }
    }

    pub fn count(&self) -> Option<usize> {
        match self {
            InvocationResult::Success { count, .. } => *count,
            _ => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, InvocationResult::Failure { .. })
    }
}

/// Display slots read by presentation layers.
#[derive(Debug, Clone, Default)]
pub struct DisplayState {
    result: InvocationResult,
}

impl DisplayState {
    /// Start of an invocation: the previous payload and count are discarded.
    pub fn begin(&mut self) {
        self.result = InvocationResult::Empty;
    }

    /// Store a settlement, replacing whatever is there.
    pub fn apply(&mut self, result: InvocationResult) {
        self.result = result;
    }

    pub fn result(&self) -> &InvocationResult {
        &self.result
    }

    /// Payload or serialized error; `None` while empty.
    pub fn latest_response(&self) -> Option<&str> {
        self.result.payload()
    }

    pub fn response_count(&self) -> Option<usize> {
        self.result.count()
    }

    pub fn into_result(self) -> InvocationResult {
        self.result
    }
}

/// Element count of `payload` when it parses as a JSON array.
///
/// Parse failures are not errors here; they only mean there is no count to show.
/// Only the top level is inspected; nested values are skipped without being built, and
/// nesting depth is unbounded.
pub fn sequence_count(payload: &str) -> Option<usize> {
    let mut de = serde_json::Deserializer::from_str(payload);
    de.disable_recursion_limit();
    let count = serde_stacker::Deserializer::new(&mut de)
        .deserialize_any(TopLevelLen)
        .ok()?;
    de.end().ok()?;
    count
}

/// Length of a top-level JSON array; `None` for any other value.
struct TopLevelLen;

impl<'de> Visitor<'de> for TopLevelLen {
    type Value = Option<usize>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut n = 0;
        while seq.next_element::<IgnoredAny>()?.is_some() {
            n += 1;
        }
        Ok(Some(n))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        while map.next_entry::<IgnoredAny, IgnoredAny>()?.is_some() {}
        Ok(None)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
        Ok(None)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(None)
    }
}

/// Serialized form of an action failure.
pub fn serialize_failure<E: Serialize + ?Sized>(err: &E) -> String {
    serde_json::to_string(err).unwrap_or_else(|_| UNENCODABLE_FAILURE.to_string())
}

/// Settlement for an action on the `run` path.
pub fn resolve<E: Serialize>(outcome: Result<String, E>) -> InvocationResult {
    match outcome {
        Ok(payload) => {
            let count = sequence_count(&payload);
            InvocationResult::Success { payload, count }
        }
        Err(e) => InvocationResult::Failure {
            payload: serialize_failure(&e),
        },
    }
}

/// Settlement for an action on the `clear` path. Never carries a count.
pub fn resolve_clear<E: Serialize>(outcome: Result<(), E>) -> InvocationResult {
    match outcome {
        Ok(()) => InvocationResult::Success {
            payload: DELETE_ALL_CONFIRMATION.to_string(),
            count: None,
        },
        Err(e) => InvocationResult::Failure {
            payload: serialize_failure(&e),
        },
    }
}

/// Reset `state`, await `action`, and store its settlement.
pub async fn run<F, Fut, E>(state: &mut DisplayState, action: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String, E>>,
    E: Serialize,
{
    state.begin();
    let outcome = action().await;
    state.apply(resolve(outcome));
}

/// Reset `state`, await the bulk-delete `action`, and store the fixed confirmation or failure.
pub async fn clear<F, Fut, E>(state: &mut DisplayState, action: F)
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Serialize,
{
    state.begin();
    let outcome = action().await;
    state.apply(resolve_clear(outcome));
}
