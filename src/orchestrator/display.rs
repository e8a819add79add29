//! Folding invocation events into the display slots.

use crate::model::HarnessEvent;
use crate::runner::DisplayState;

/// What an event did to the display state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Applied {
    Reset,
    Settled,
    Unchanged,
}

/// Apply `ev` to `display`. A start clears the slot; a settlement overwrites it, so
/// with overlapping invocations whichever settles last is what stays on screen.
pub(crate) fn apply_event(display: &mut DisplayState, ev: &HarnessEvent) -> Applied {
    match ev {
        HarnessEvent::Started { .. } => {
            display.begin();
            Applied::Reset
        }
        HarnessEvent::Settled { result, .. } => {
            display.apply(result.clone());
            Applied::Settled
        }
        HarnessEvent::Info(_) => Applied::Unchanged,
    }
}
