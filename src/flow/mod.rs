//! Flow controller: history of visited steps and the transitions between them

mod controller;
mod handle;
mod recording;


pub use controller::FlowController;
pub use handle::{FlowHandle, WeakFlowHandle};
pub use recording::{PresenterCall, PresenterLog, RecordingPresenter};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

static NEXT_FLOW_ID: AtomicU64 = AtomicU64::new(1);

/// Identifier of one flow controller instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct FlowId(u64);

impl FlowId {
    pub(crate) fn allocate() -> Self {
        Self(NEXT_FLOW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "flow-{}", self.0)
    }
}

/// Lifecycle of a flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    NotStarted,
    Active,
    Dismissed,
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlowState::NotStarted => "not started",
            FlowState::Active => "active",
            FlowState::Dismissed => "dismissed",
        };
        f.write_str(name)
    }
}
