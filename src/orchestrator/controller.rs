//! Invocation controller.
//!
//! Starts one task per triggered action and emits events for presentation layers.

use crate::backend::Backend;
use crate::model::{Action, HarnessEvent};
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::task::JoinSet;

/// Commands emitted by UI layers.
#[derive(Debug, Clone)]
pub(crate) enum UiCommand {
    Invoke(Action),
    Quit,
}

type Settlement = (u64, Action, crate::runner::InvocationResult, Duration);

/// Start `action` on its own task. Nothing waits for earlier invocations.
fn start_invocation(
    tasks: &mut JoinSet<Settlement>,
    backend: &Arc<Backend>,
    id: u64,
    action: Action,
) {
    let backend = Arc::clone(backend);
    tasks.spawn(async move {
        let started = Instant::now();
        let result = backend.invoke(action).await;
        (id, action, result, started.elapsed())
    });
}

/// Run invocations as UI commands arrive and report each start and settlement.
pub(crate) async fn run_controller(
    backend: Arc<Backend>,
    event_tx: UnboundedSender<HarnessEvent>,
    mut cmd_rx: UnboundedReceiver<UiCommand>,
) -> Result<()> {
    let mut tasks: JoinSet<Settlement> = JoinSet::new();
    let mut next_id: u64 = 0;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UiCommand::Invoke(action)) => {
                        next_id += 1;
                        let _ = event_tx.send(HarnessEvent::Started { id: next_id, action });
                        start_invocation(&mut tasks, &backend, next_id, action);
                        tracing::debug!(id = next_id, ?action, in_flight = tasks.len(), "invocation started");
                    }
                    Some(UiCommand::Quit) | None => break,
                }
            }
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                match joined {
                    Ok((id, action, result, elapsed)) => {
                        let _ = event_tx.send(HarnessEvent::Settled { id, action, result, elapsed });
                    }
                    Err(e) => {
                        let _ = event_tx.send(HarnessEvent::Info(format!(
                            "Invocation task failed: {e}"
                        )));
                    }
                }
            }
        }
    }

    // In-flight actions run to completion on their own; their results are no longer observed.
    tasks.detach_all();
    Ok(())
}
