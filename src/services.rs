//! Collaborators the flow talks to but never implements itself

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::step::StepContent;

/// Which way a transition moves through the flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

/// Renders step content and busy state
pub trait Presenter {
    fn render(&mut self, content: &StepContent);
    fn show_activity_indicator(&mut self);
    fn hide_activity_indicator(&mut self);
    fn animate_transition(&mut self, direction: Direction);
}

/// Kind of haptic / audible cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    Selection,
    Success,
    Error,
}

/// Fire-and-forget feedback (haptics on devices, a bell or a log line here)
pub trait Feedback: Send + Sync {
    fn signal(&self, kind: FeedbackKind);
}

/// Notified whenever a choice is finalized
pub trait SelectionObserver: Send + Sync {
    fn selection_changed(&self, index: usize);
}

/// Feedback that only records a debug event
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingFeedback;

impl Feedback for TracingFeedback {
    fn signal(&self, kind: FeedbackKind) {
        tracing::debug!(?kind, "feedback");
    }
}

/// Feedback that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFeedback;

impl Feedback for NoFeedback {
    fn signal(&self, _kind: FeedbackKind) {}
}

/// Remembers the most recent selection and how many were reported
#[derive(Debug, Default)]
pub struct LatestSelection {
    latest: Mutex<Option<usize>>,
    changes: AtomicUsize,
}

impl LatestSelection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn latest(&self) -> Option<usize> {
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of notifications received so far
    pub fn changes(&self) -> usize {
        self.changes.load(Ordering::SeqCst)
    }
}

impl SelectionObserver for LatestSelection {
    fn selection_changed(&self, index: usize) {
        tracing::info!(index, "favorite selection changed");
        *self.latest.lock().unwrap_or_else(PoisonError::into_inner) = Some(index);
        self.changes.fetch_add(1, Ordering::SeqCst);
    }
}
