//! Owns the history stack and applies navigation

use std::sync::Arc;

use super::{FlowId, FlowState};
use crate::error::{FlowError, Result};
use crate::services::{Direction, Presenter};
use crate::step::{FlowRequest, ManagerHandle, Step, StepContext, StepEvent, StepId, TeardownReason};
use crate::task::{TaskExecutor, TaskScheduler};

/// Drives a flow of steps.
///
/// The last entry of `history` is the current step. Steps below it stay in
/// history (suspended) so `back` can return to them with their state intact.
/// A step popped by `back` is parked in its predecessor's `next` slot, so
/// advancing again without a new selection brings back the same instance.
pub struct FlowController {
    id: FlowId,
    state: FlowState,
    history: Vec<Step>,
    presenter: Box<dyn Presenter>,
    tasks: TaskScheduler<StepId>,
}

impl FlowController {
    pub fn new(presenter: Box<dyn Presenter>, executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            id: FlowId::allocate(),
            state: FlowState::NotStarted,
            history: Vec::new(),
            presenter,
            tasks: TaskScheduler::new(executor),
        }
    }

    pub fn id(&self) -> FlowId {
        self.id
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    /// Number of steps in history
    pub fn depth(&self) -> usize {
        self.history.len()
    }

    pub fn current(&self) -> Option<&Step> {
        self.history.last()
    }

    pub fn history(&self) -> impl Iterator<Item = &Step> {
        self.history.iter()
    }

    /// Tasks started by steps that have not reported back yet
    pub fn pending_tasks(&self) -> usize {
        self.tasks.pending_count()
    }

    pub fn start(&mut self, initial: Step) -> Result<()> {
        if self.state != FlowState::NotStarted {
            return Err(FlowError::AlreadyStarted);
        }
        if initial.is_torn_down() {
            return Err(FlowError::torn_down(initial.id(), "start"));
        }

        tracing::info!(flow = %self.id, step = %initial.id(), "flow started");
        self.push(initial);
        self.state = FlowState::Active;
        self.render_current()
    }

    /// Move to the current step's `next`
    pub fn advance(&mut self) -> Result<()> {
        self.ensure_active()?;
        let current = self.current_mut()?;
        let Some(next) = current.take_next() else {
            return Err(FlowError::NoNextStep(current.id()));
        };

        let from = current.id();
        let canceled = current.suspend();
        if canceled {
            self.presenter.hide_activity_indicator();
        }

        tracing::debug!(flow = %self.id, %from, to = %next.id(), "advance");
        self.push(*next);
        self.presenter.animate_transition(Direction::Forward);
        self.render_current()
    }

    /// Return to the previous step
    pub fn back(&mut self) -> Result<()> {
        self.ensure_active()?;
        if self.history.len() <= 1 {
            return Err(FlowError::NoHistory);
        }

        let Some(mut popped) = self.history.pop() else {
            return Err(FlowError::NoHistory);
        };
        if popped.detach() {
            self.presenter.hide_activity_indicator();
        }

        let previous = self.current_mut()?;
        tracing::debug!(from = %popped.id(), to = %previous.id(), "back");
        previous.resume();
        previous.park_next(Box::new(popped));

        self.presenter.animate_transition(Direction::Backward);
        self.render_current()
    }

    /// End the flow from a dismissable step, tearing down every step
    pub fn dismiss(&mut self) -> Result<()> {
        self.dismiss_for(None)
    }

    /// `requested_by` is the step whose own action ended the flow, if any.
    /// It is torn down as [`TeardownReason::Completed`].
    fn dismiss_for(&mut self, requested_by: Option<StepId>) -> Result<()> {
        match self.state {
            FlowState::Dismissed => return Ok(()),
            FlowState::NotStarted => return Err(FlowError::NotActive(self.state)),
            FlowState::Active => {}
        }

        let current = self.current_mut()?;
        if !current.is_dismissable() {
            return Err(FlowError::DismissalNotAllowed(current.id()));
        }

        tracing::info!(flow = %self.id, depth = self.history.len(), "flow dismissed");
        self.teardown_all(TeardownReason::Dismissed, requested_by);
        self.state = FlowState::Dismissed;
        Ok(())
    }

    /// Route a user interaction to the current step
    pub fn dispatch(&mut self, event: StepEvent) -> Result<()> {
        self.ensure_active()?;
        let Some(current) = self.history.last_mut() else {
            return Err(FlowError::NotActive(self.state));
        };

        let mut ctx = StepContext::new(current.id(), &mut self.tasks);
        current.handle_event(event, &mut ctx)?;
        let requests = ctx.into_requests();
        self.apply(requests)
    }

    /// Hand finished task outcomes to their steps. Returns how many were delivered.
    ///
    /// Outcomes are taken one at a time; if delivering one fails, the rest
    /// stay queued for the next call.
    pub fn pump(&mut self) -> Result<usize> {
        let mut delivered = 0;

        while let Some((target, outcome)) = self.tasks.next_outcome() {
            if self.state != FlowState::Active {
                tracing::debug!(step = %target, "dropping task outcome, flow not active");
                continue;
            }
            let Some(current) = self.history.last_mut() else {
                continue;
            };
            if current.id() != target {
                tracing::warn!(step = %target, current = %current.id(), "task outcome for a step that is not current");
                continue;
            }

            let mut ctx = StepContext::new(target, &mut self.tasks);
            current.on_task_complete(outcome, &mut ctx)?;
            let requests = ctx.into_requests();
            delivered += 1;
            self.apply(requests)?;
        }

        Ok(delivered)
    }

    pub fn display_activity_indicator(&mut self) {
        self.presenter.show_activity_indicator();
    }

    pub fn hide_activity_indicator(&mut self) {
        self.presenter.hide_activity_indicator();
    }

    /// Ask the presenter to draw the current step again
    pub fn render_current(&mut self) -> Result<()> {
        let Some(current) = self.history.last() else {
            return Err(FlowError::NotActive(self.state));
        };
        let content = current.render()?;
        self.presenter.render(&content);
        Ok(())
    }

    fn apply(&mut self, requests: Vec<FlowRequest>) -> Result<()> {
        let mut requests = requests.into_iter();

        while let Some(request) = requests.next() {
            let navigated = match request {
                FlowRequest::ShowActivity => {
                    self.presenter.show_activity_indicator();
                    false
                }
                FlowRequest::HideActivity => {
                    self.presenter.hide_activity_indicator();
                    false
                }
                FlowRequest::Advance => {
                    self.advance()?;
                    true
                }
                FlowRequest::Back => {
                    self.back()?;
                    true
                }
                FlowRequest::Dismiss(step) => {
                    self.dismiss_for(Some(step))?;
                    true
                }
            };

            if navigated {
                // The requesting step is no longer current; the rest was meant for it.
                let dropped = requests.count();
                if dropped > 0 {
                    tracing::debug!(dropped, "ignoring requests after navigation");
                }
                return Ok(());
            }
        }

        self.render_current()
    }

    fn push(&mut self, mut step: Step) {
        step.attach(ManagerHandle {
            flow: self.id,
            depth: self.history.len(),
        });
        self.history.push(step);
    }

    fn teardown_all(&mut self, reason: TeardownReason, requested_by: Option<StepId>) {
        while let Some(mut step) = self.history.pop() {
            let reason = if requested_by == Some(step.id()) {
                TeardownReason::Completed
            } else {
                reason
            };
            if let Err(err) = step.teardown(reason) {
                tracing::warn!(step = %step.id(), error = %err, "teardown failed");
            }
        }
    }

    fn current_mut(&mut self) -> Result<&mut Step> {
        let state = self.state;
        self.history
            .last_mut()
            .ok_or(FlowError::NotActive(state))
    }

    fn ensure_active(&self) -> Result<()> {
        if self.state != FlowState::Active {
            return Err(FlowError::NotActive(self.state));
        }
        Ok(())
    }
}

impl Drop for FlowController {
    fn drop(&mut self) {
        if self.state == FlowState::Active {
            tracing::debug!(flow = %self.id, "flow dropped while active");
            self.teardown_all(TeardownReason::Discarded, None);
        }
    }
}
