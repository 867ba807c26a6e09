//! Steps of a flow.
//!
//! A [`Step`] is one screen. It owns its selection state and the successor
//! it computed (`next`), and it only talks to the flow through the
//! [`StepContext`] it is handed while handling an event. The step kinds are a
//! closed set, see [`StepKind`].

mod choice;
mod confirmation;
mod content;
mod factory;
mod terminal;

pub use choice::ChoiceStep;
pub use confirmation::ConfirmationStep;
pub use content::{ButtonRole, Element, StepContent};
pub use factory::{SaveSettings, StepFactory};
pub use terminal::TerminalStep;

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};
use crate::flow::FlowId;
use crate::task::{TaskHandle, TaskOutcome, TaskScheduler, TaskWork};

/// Identifier of one step instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct StepId(u64);

impl StepId {
    pub(crate) fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// User interaction delivered to the current step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepEvent {
    /// Pick the option at this index
    Select(usize),
    /// Primary action ("Select", "Get started")
    Continue,
    /// Commit a pending decision; the confirmation step's primary action
    Confirm,
    /// Alternative action leading back to the previous step
    Back,
}

impl FromStr for StepEvent {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(index) = s.strip_prefix("select:") {
            return index
                .trim()
                .parse()
                .map(StepEvent::Select)
                .map_err(|_| format!("invalid choice index '{}'", index));
        }
        match s {
            "continue" => Ok(StepEvent::Continue),
            "confirm" => Ok(StepEvent::Confirm),
            "back" => Ok(StepEvent::Back),
            other => Err(format!("unknown step event '{}'", other)),
        }
    }
}

/// Why a step was finally torn down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownReason {
    /// The flow was dismissed
    Dismissed,
    /// The owner computed a different successor
    Replaced,
    /// The flow controller was dropped while the step was alive
    Discarded,
    /// The step ended the flow through its own action; its dismissal
    /// handler is not called
    Completed,
}

/// Called once when a step is torn down
pub type DismissalHandler = Box<dyn FnOnce(StepId, TeardownReason)>;

/// Non-owning link from a step to the flow holding it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ManagerHandle {
    pub flow: FlowId,
    /// Position in the flow's history, 0 for the first step
    pub depth: usize,
}

/// Navigation requested by a step, applied once its handler returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlowRequest {
    Advance,
    Back,
    /// Dismiss the flow on behalf of the named step
    Dismiss(StepId),
    ShowActivity,
    HideActivity,
}

/// What a step may do to its flow while handling an event
pub struct StepContext<'a> {
    step: StepId,
    tasks: &'a mut TaskScheduler<StepId>,
    requests: Vec<FlowRequest>,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(step: StepId, tasks: &'a mut TaskScheduler<StepId>) -> Self {
        Self {
            step,
            tasks,
            requests: Vec::new(),
        }
    }

    /// The step this context was handed to
    pub fn step(&self) -> StepId {
        self.step
    }

    pub fn advance(&mut self) {
        self.requests.push(FlowRequest::Advance);
    }

    pub fn back(&mut self) {
        self.requests.push(FlowRequest::Back);
    }

    pub fn dismiss(&mut self) {
        self.requests.push(FlowRequest::Dismiss(self.step));
    }

    pub fn show_activity_indicator(&mut self) {
        self.requests.push(FlowRequest::ShowActivity);
    }

    pub fn hide_activity_indicator(&mut self) {
        self.requests.push(FlowRequest::HideActivity);
    }

    /// Start background work whose outcome comes back to this step.
    ///
    /// A step has at most one task outstanding; starting another while one
    /// is pending fails with [`FlowError::TaskAlreadyPending`].
    pub fn start_task(&mut self, delay: Duration, work: TaskWork) -> Result<TaskHandle> {
        if self.tasks.has_pending(&self.step) {
            return Err(FlowError::TaskAlreadyPending(self.step));
        }
        Ok(self.tasks.start(delay, work, self.step))
    }

    pub(crate) fn into_requests(self) -> Vec<FlowRequest> {
        self.requests
    }
}

/// The closed set of step behaviors
pub enum StepKind {
    Choice(ChoiceStep),
    Confirmation(ConfirmationStep),
    Terminal(TerminalStep),
}

impl StepKind {
    fn name(&self) -> &'static str {
        match self {
            StepKind::Choice(_) => "choice",
            StepKind::Confirmation(_) => "confirmation",
            StepKind::Terminal(_) => "terminal",
        }
    }
}

/// One screen of a flow
pub struct Step {
    id: StepId,
    dismissable: bool,
    next: Option<Box<Step>>,
    manager: Option<ManagerHandle>,
    interactive: bool,
    torn_down: bool,
    dismissal_handler: Option<DismissalHandler>,
    kind: StepKind,
}

impl Step {
    pub(crate) fn new(id: StepId, kind: StepKind) -> Self {
        let dismissable = matches!(kind, StepKind::Terminal(_));
        Self {
            id,
            dismissable,
            next: None,
            manager: None,
            interactive: true,
            torn_down: false,
            dismissal_handler: None,
            kind,
        }
    }

    pub fn with_dismissable(mut self, dismissable: bool) -> Self {
        self.dismissable = dismissable;
        self
    }

    /// Register a callback for when this step is torn down
    pub fn on_dismissal(mut self, handler: impl FnOnce(StepId, TeardownReason) + 'static) -> Self {
        self.dismissal_handler = Some(Box::new(handler));
        self
    }

    pub fn id(&self) -> StepId {
        self.id
    }

    pub fn is_dismissable(&self) -> bool {
        self.dismissable
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// False while the step sits below the current one in history
    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn manager(&self) -> Option<ManagerHandle> {
        self.manager
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    pub fn next(&self) -> Option<&Step> {
        self.next.as_deref()
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Describe what to display for the current selection state
    pub fn render(&self) -> Result<StepContent> {
        self.ensure_alive("render")?;
        let content = match &self.kind {
            StepKind::Choice(choice) => choice.render(self.id, self.dismissable),
            StepKind::Confirmation(confirmation) => {
                confirmation.render(self.id, self.dismissable)
            }
            StepKind::Terminal(terminal) => terminal.render(self.id, self.dismissable),
        };
        Ok(content)
    }

    /// Process a user interaction
    pub fn handle_event(&mut self, event: StepEvent, ctx: &mut StepContext<'_>) -> Result<()> {
        self.ensure_alive("handle_event")?;
        if !self.interactive {
            tracing::debug!(step = %self.id, ?event, "ignoring event for suspended step");
            return Ok(());
        }

        tracing::debug!(step = %self.id, kind = self.kind.name(), ?event, "step event");
        match &mut self.kind {
            StepKind::Choice(choice) => choice.handle_event(event, &mut self.next, ctx),
            StepKind::Confirmation(confirmation) => {
                confirmation.handle_event(event, ctx)
            }
            StepKind::Terminal(terminal) => {
                terminal.handle_event(event, ctx);
                Ok(())
            }
        }
    }

    pub(crate) fn on_task_complete(
        &mut self,
        outcome: TaskOutcome,
        ctx: &mut StepContext<'_>,
    ) -> Result<()> {
        self.ensure_alive("on_task_complete")?;
        match &mut self.kind {
            StepKind::Confirmation(confirmation) => {
                confirmation.on_task_complete(outcome, &mut self.next, ctx);
            }
            other => {
                tracing::warn!(step = %self.id, kind = other.name(), "unexpected task outcome");
            }
        }
        Ok(())
    }

    pub(crate) fn take_next(&mut self) -> Option<Box<Step>> {
        self.next.take()
    }

    /// Put a previously visited successor back so a later advance reuses it
    pub(crate) fn park_next(&mut self, step: Box<Step>) {
        replace_next(&mut self.next, step);
    }

    pub(crate) fn attach(&mut self, manager: ManagerHandle) {
        self.manager = Some(manager);
        self.interactive = true;
    }

    /// Stop taking events while a later step is current. Returns true if a
    /// pending task had to be canceled.
    pub(crate) fn suspend(&mut self) -> bool {
        self.interactive = false;
        self.cancel_task()
    }

    pub(crate) fn resume(&mut self) {
        self.interactive = true;
    }

    /// Leave the flow without being destroyed. Returns true if a pending
    /// task had to be canceled.
    pub(crate) fn detach(&mut self) -> bool {
        self.manager = None;
        self.interactive = false;
        self.cancel_task()
    }

    fn cancel_task(&mut self) -> bool {
        match &mut self.kind {
            StepKind::Confirmation(confirmation) => confirmation.cancel_task(),
            StepKind::Choice(_) | StepKind::Terminal(_) => false,
        }
    }

    /// Discard the step for good.
    ///
    /// A parked successor is torn down first. Afterwards every other
    /// operation fails with [`FlowError::State`]. With
    /// [`TeardownReason::Completed`] the dismissal handler is dropped
    /// without being called.
    pub fn teardown(&mut self, reason: TeardownReason) -> Result<()> {
        self.ensure_alive("teardown")?;

        if let Some(mut next) = self.next.take() {
            let cascaded = match reason {
                TeardownReason::Completed => TeardownReason::Dismissed,
                other => other,
            };
            next.teardown(cascaded)?;
        }

        if self.detach() {
            tracing::debug!(step = %self.id, "canceled pending task during teardown");
        }
        self.torn_down = true;
        tracing::debug!(step = %self.id, kind = self.kind.name(), ?reason, "step torn down");

        match self.dismissal_handler.take() {
            Some(_) if reason == TeardownReason::Completed => {
                tracing::debug!(step = %self.id, "dismissed by its own action, handler skipped");
            }
            Some(handler) => handler(self.id, reason),
            None => {}
        }
        Ok(())
    }

    fn ensure_alive(&self, operation: &'static str) -> Result<()> {
        if self.torn_down {
            return Err(FlowError::torn_down(self.id, operation));
        }
        Ok(())
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("kind", &self.kind.name())
            .field("dismissable", &self.dismissable)
            .field("next", &self.next.as_ref().map(|next| next.id))
            .field("torn_down", &self.torn_down)
            .finish_non_exhaustive()
    }
}

/// Swap in a new successor, tearing down the one it replaces
pub(crate) fn replace_next(slot: &mut Option<Box<Step>>, step: Box<Step>) {
    if let Some(mut old) = slot.replace(step) {
        if let Err(err) = old.teardown(TeardownReason::Replaced) {
            tracing::warn!(step = %old.id, error = %err, "replaced step was already torn down");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{LatestSelection, NoFeedback};
    use crate::task::ManualExecutor;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    fn factory() -> Arc<StepFactory> {
        Arc::new(StepFactory::new(
            Arc::new(NoFeedback),
            LatestSelection::new(),
        ))
    }

    #[test]
    fn test_parse_step_events() {
        assert_eq!("select:1".parse::<StepEvent>(), Ok(StepEvent::Select(1)));
        assert_eq!(" continue ".parse::<StepEvent>(), Ok(StepEvent::Continue));
        assert_eq!("confirm".parse::<StepEvent>(), Ok(StepEvent::Confirm));
        assert_eq!("back".parse::<StepEvent>(), Ok(StepEvent::Back));
        assert!("select:x".parse::<StepEvent>().is_err());
        assert!("jump".parse::<StepEvent>().is_err());
    }

    #[test]
    fn test_teardown_runs_handler_once_and_blocks_further_use() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let seen = calls.clone();
        let mut step = factory()
            .completion("Cats")
            .on_dismissal(move |id, reason| seen.borrow_mut().push((id, reason)));
        let id = step.id();

        step.teardown(TeardownReason::Dismissed).unwrap();
        assert!(step.is_torn_down());
        assert_eq!(*calls.borrow(), vec![(id, TeardownReason::Dismissed)]);

        assert_eq!(
            step.teardown(TeardownReason::Dismissed),
            Err(FlowError::torn_down(id, "teardown"))
        );
        assert!(matches!(step.render(), Err(FlowError::State { .. })));
        assert_eq!(calls.borrow().len(), 1);
    }

    #[test]
    fn test_teardown_cascades_to_parked_successor() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let factory = factory();
        let seen = calls.clone();
        let mut first = factory
            .choice("Pick", "Which one?", vec!["Cats".into(), "Dogs".into()])
            .unwrap()
            .on_dismissal(move |id, _| seen.borrow_mut().push(id));
        let seen = calls.clone();
        let second = factory
            .completion("Cats")
            .on_dismissal(move |id, _| seen.borrow_mut().push(id));
        let (first_id, second_id) = (first.id(), second.id());
        first.park_next(Box::new(second));

        first.teardown(TeardownReason::Discarded).unwrap();
        assert_eq!(*calls.borrow(), vec![second_id, first_id]);
    }

    #[test]
    fn test_completed_teardown_skips_own_handler_but_not_successor() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let factory = factory();
        let seen = calls.clone();
        let mut step = factory
            .completion("Cats")
            .on_dismissal(move |id, reason| seen.borrow_mut().push((id, reason)));
        let seen = calls.clone();
        let parked = factory
            .completion("Dogs")
            .on_dismissal(move |id, reason| seen.borrow_mut().push((id, reason)));
        let parked_id = parked.id();
        step.park_next(Box::new(parked));

        step.teardown(TeardownReason::Completed).unwrap();
        assert!(step.is_torn_down());
        assert_eq!(*calls.borrow(), vec![(parked_id, TeardownReason::Dismissed)]);
    }

    #[test]
    fn test_one_pending_task_per_step() {
        let factory = factory();
        let step = factory.confirmation("Cats", 0);
        let other = factory.confirmation("Dogs", 1);
        let mut tasks = TaskScheduler::new(Arc::new(ManualExecutor::new()));
        let delay = Duration::from_millis(10);

        let mut ctx = StepContext::new(step.id(), &mut tasks);
        let first = ctx
            .start_task(delay, Box::new(|| TaskOutcome::Success))
            .unwrap();
        assert_eq!(
            ctx.start_task(delay, Box::new(|| TaskOutcome::Success))
                .map(|handle| handle.id()),
            Err(FlowError::TaskAlreadyPending(step.id()))
        );

        // Another step is not affected
        let mut other_ctx = StepContext::new(other.id(), &mut tasks);
        assert!(other_ctx
            .start_task(delay, Box::new(|| TaskOutcome::Success))
            .is_ok());

        // Once canceled, the step may start again
        assert!(first.cancel());
        let mut ctx = StepContext::new(step.id(), &mut tasks);
        assert!(ctx
            .start_task(delay, Box::new(|| TaskOutcome::Success))
            .is_ok());
        assert_eq!(tasks.pending_count(), 2);
    }

    #[test]
    fn test_teardown_cancels_pending_save() {
        let factory = factory();
        let mut step = factory.confirmation("Cats", 0);
        let executor = Arc::new(ManualExecutor::new());
        let mut tasks = TaskScheduler::new(executor.clone());

        let mut ctx = StepContext::new(step.id(), &mut tasks);
        step.handle_event(StepEvent::Confirm, &mut ctx).unwrap();
        assert_eq!(tasks.pending_count(), 1);

        step.teardown(TeardownReason::Discarded).unwrap();
        assert_eq!(tasks.pending_count(), 0);

        executor.advance(Duration::from_secs(60));
        assert!(tasks.drain().is_empty());
    }

    #[test]
    fn test_suspended_step_ignores_events() {
        let factory = factory();
        let mut step = factory
            .choice("Pick", "Which one?", vec!["Cats".into(), "Dogs".into()])
            .unwrap();
        let mut tasks = TaskScheduler::new(Arc::new(ManualExecutor::new()));

        step.suspend();
        let mut ctx = StepContext::new(step.id(), &mut tasks);
        step.handle_event(StepEvent::Select(0), &mut ctx).unwrap();
        assert!(!step.has_next());

        step.resume();
        step.handle_event(StepEvent::Select(0), &mut ctx).unwrap();
        assert!(step.has_next());
    }
}
