//! Application-level orchestration utilities.
//!
//! This module owns the invocation lifecycle (start, settle) and the rule for folding
//! invocation events into display state. UI/CLI layers call into this module to keep
//! responsibilities separated.

mod controller;
mod display;

pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use display::{apply_event, Applied};
