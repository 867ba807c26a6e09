//! Presenter that records every call, for tests and headless runs

use std::cell::RefCell;
use std::rc::Rc;

use serde::Serialize;

use crate::services::{Direction, Presenter};
use crate::step::StepContent;

/// One call the flow made on its presenter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
pub enum PresenterCall {
    Render { content: StepContent },
    ShowActivity,
    HideActivity,
    Transition { direction: Direction },
}

/// Shared list of presenter calls
#[derive(Debug, Clone, Default)]
pub struct PresenterLog {
    calls: Rc<RefCell<Vec<PresenterCall>>>,
}

impl PresenterLog {
    pub fn calls(&self) -> Vec<PresenterCall> {
        self.calls.borrow().clone()
    }

    pub fn clear(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.calls.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.borrow().is_empty()
    }

    /// Content of the most recent render
    pub fn last_render(&self) -> Option<StepContent> {
        self.calls.borrow().iter().rev().find_map(|call| match call {
            PresenterCall::Render { content } => Some(content.clone()),
            _ => None,
        })
    }

    /// Whether the indicator is currently shown, going by show/hide calls
    pub fn activity_visible(&self) -> bool {
        self.calls
            .borrow()
            .iter()
            .rev()
            .find_map(|call| match call {
                PresenterCall::ShowActivity => Some(true),
                PresenterCall::HideActivity => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    fn push(&self, call: PresenterCall) {
        self.calls.borrow_mut().push(call);
    }
}

/// Presenter that appends to a [`PresenterLog`]
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    log: PresenterLog,
}

impl RecordingPresenter {
    pub fn new() -> (Self, PresenterLog) {
        let log = PresenterLog::default();
        (Self { log: log.clone() }, log)
    }
}

impl Presenter for RecordingPresenter {
    fn render(&mut self, content: &StepContent) {
        self.log.push(PresenterCall::Render {
            content: content.clone(),
        });
    }

    fn show_activity_indicator(&mut self) {
        self.log.push(PresenterCall::ShowActivity);
    }

    fn hide_activity_indicator(&mut self) {
        self.log.push(PresenterCall::HideActivity);
    }

    fn animate_transition(&mut self, direction: Direction) {
        self.log.push(PresenterCall::Transition { direction });
    }
}
