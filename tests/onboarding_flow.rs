//! End-to-end tests of the pet onboarding flow through the public API
//!
//! ```bash
//! cargo test --test onboarding_flow
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use pageflow::flow::{PresenterCall, PresenterLog, RecordingPresenter};
use pageflow::services::{LatestSelection, NoFeedback};
use pageflow::step::{ButtonRole, SaveSettings};
use pageflow::{
    Direction, FlowController, FlowError, FlowState, ManualExecutor, Step, StepEvent,
    StepFactory, StepKind, TeardownReason, TokioExecutor,
};

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn factory(delay: Duration) -> (Arc<StepFactory>, Arc<LatestSelection>) {
    let observer = LatestSelection::new();
    let factory = StepFactory::new(Arc::new(NoFeedback), observer.clone())
        .with_save_settings(SaveSettings {
            delay,
            failure: None,
        });
    (Arc::new(factory), observer)
}

fn pets(factory: &Arc<StepFactory>) -> Step {
    factory
        .pet_choice("Favorite pet", vec!["Cats".to_string(), "Dogs".to_string()])
        .unwrap()
}

fn titles(log: &PresenterLog) -> Vec<String> {
    log.calls()
        .into_iter()
        .filter_map(|call| match call {
            PresenterCall::Render { content } => Some(content.title),
            _ => None,
        })
        .collect()
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn cats_onboarding_from_first_page_to_dismissal() {
    let (factory, observer) = factory(Duration::from_millis(1000));
    let executor = Arc::new(ManualExecutor::new());
    let (presenter, log) = RecordingPresenter::new();
    let mut flow = FlowController::new(Box::new(presenter), executor.clone());

    let dismissed = Rc::new(RefCell::new(None));
    let seen = dismissed.clone();
    let first = pets(&factory).on_dismissal(move |_, reason| *seen.borrow_mut() = Some(reason));

    flow.start(first).unwrap();
    let content = log.last_render().unwrap();
    assert_eq!(content.choice_count(), 2);
    assert_eq!(content.action(ButtonRole::Primary), None);

    flow.dispatch(StepEvent::Select(0)).unwrap();
    assert_eq!(observer.latest(), Some(0));
    assert_eq!(
        log.last_render().unwrap().action(ButtonRole::Primary),
        Some(StepEvent::Continue)
    );

    flow.dispatch(StepEvent::Continue).unwrap();
    assert_eq!(flow.depth(), 2);

    flow.dispatch(StepEvent::Confirm).unwrap();
    assert!(log.activity_visible());
    assert_eq!(log.last_render().unwrap().action(ButtonRole::Primary), None);

    // Nothing arrives before the save delay has passed
    executor.advance(Duration::from_millis(999));
    assert_eq!(flow.pump().unwrap(), 0);
    executor.advance(Duration::from_millis(1));
    assert_eq!(flow.pump().unwrap(), 1);

    assert!(!log.activity_visible());
    assert_eq!(flow.depth(), 3);
    assert!(flow.current().unwrap().is_dismissable());

    flow.dispatch(StepEvent::Continue).unwrap();
    assert_eq!(flow.state(), FlowState::Dismissed);
    assert_eq!(*dismissed.borrow(), Some(TeardownReason::Dismissed));

    assert_eq!(
        titles(&log),
        vec![
            "Favorite pet",
            "Favorite pet",
            "Confirm your favorite",
            "Confirm your favorite",
            "Setup completed",
        ]
    );
    let transitions: Vec<_> = log
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            PresenterCall::Transition { direction } => Some(direction),
            _ => None,
        })
        .collect();
    assert_eq!(transitions, vec![Direction::Forward, Direction::Forward]);
}

#[test]
fn changing_the_answer_goes_back_and_picks_again() {
    let (factory, observer) = factory(Duration::from_millis(10));
    let executor = Arc::new(ManualExecutor::new());
    let (presenter, log) = RecordingPresenter::new();
    let mut flow = FlowController::new(Box::new(presenter), executor.clone());

    flow.start(pets(&factory)).unwrap();
    flow.dispatch(StepEvent::Select(0)).unwrap();
    flow.dispatch(StepEvent::Continue).unwrap();
    let first_confirmation = flow.current().map(Step::id);

    // "Change" is the confirmation's alternative action
    let change = log.last_render().unwrap().action(ButtonRole::Alternative);
    assert_eq!(change, Some(StepEvent::Back));
    flow.dispatch(StepEvent::Back).unwrap();
    assert_eq!(
        log.last_render().unwrap().selected_choice(),
        Some(0),
        "selection survives going back"
    );

    flow.dispatch(StepEvent::Select(1)).unwrap();
    flow.dispatch(StepEvent::Continue).unwrap();
    assert_ne!(flow.current().map(Step::id), first_confirmation);
    assert_eq!(observer.changes(), 2);

    match flow.current().map(Step::kind) {
        Some(StepKind::Confirmation(confirmation)) => {
            assert_eq!(confirmation.choice(), "Dogs");
            assert_eq!(confirmation.index(), 1);
        }
        _ => panic!("expected the confirmation page"),
    }
}

#[test]
fn rejected_operations_leave_history_untouched() {
    let (factory, _) = factory(Duration::from_millis(10));
    let (presenter, _log) = RecordingPresenter::new();
    let mut flow = FlowController::new(Box::new(presenter), Arc::new(ManualExecutor::new()));

    flow.start(pets(&factory)).unwrap();
    let first = flow.current().map(Step::id).unwrap();

    assert_eq!(flow.advance(), Err(FlowError::NoNextStep(first)));
    assert_eq!(flow.back(), Err(FlowError::NoHistory));
    assert_eq!(flow.dismiss(), Err(FlowError::DismissalNotAllowed(first)));
    assert!(matches!(
        flow.dispatch(StepEvent::Select(7)),
        Err(FlowError::InvalidStep(_))
    ));

    assert_eq!(flow.depth(), 1);
    assert_eq!(flow.current().map(Step::id), Some(first));
    assert_eq!(flow.state(), FlowState::Active);
}

#[test]
fn dropping_an_active_flow_discards_its_steps() {
    let (factory, _) = factory(Duration::from_millis(10));
    let (presenter, _log) = RecordingPresenter::new();
    let mut flow = FlowController::new(Box::new(presenter), Arc::new(ManualExecutor::new()));

    let reasons = Rc::new(RefCell::new(Vec::new()));
    let seen = reasons.clone();
    flow.start(pets(&factory).on_dismissal(move |_, reason| seen.borrow_mut().push(reason)))
        .unwrap();
    flow.dispatch(StepEvent::Select(1)).unwrap();
    flow.dispatch(StepEvent::Continue).unwrap();

    drop(flow);
    assert_eq!(*reasons.borrow(), vec![TeardownReason::Discarded]);
}

#[tokio::test]
async fn save_runs_on_the_tokio_runtime() {
    let (factory, _) = factory(Duration::from_millis(20));
    let (presenter, log) = RecordingPresenter::new();
    let mut flow = FlowController::new(Box::new(presenter), Arc::new(TokioExecutor::current()));

    flow.start(pets(&factory)).unwrap();
    flow.dispatch(StepEvent::Select(0)).unwrap();
    flow.dispatch(StepEvent::Continue).unwrap();
    flow.dispatch(StepEvent::Confirm).unwrap();

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    let mut delivered = 0;
    while delivered == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(5)).await;
        delivered = flow.pump().unwrap();
    }

    assert_eq!(delivered, 1);
    assert_eq!(log.last_render().unwrap().title, "Setup completed");
}

#[tokio::test]
async fn going_back_cancels_the_save_on_the_tokio_runtime() {
    let (factory, _) = factory(Duration::from_millis(20));
    let (presenter, log) = RecordingPresenter::new();
    let mut flow = FlowController::new(Box::new(presenter), Arc::new(TokioExecutor::current()));

    flow.start(pets(&factory)).unwrap();
    flow.dispatch(StepEvent::Select(0)).unwrap();
    flow.dispatch(StepEvent::Continue).unwrap();
    flow.dispatch(StepEvent::Confirm).unwrap();
    flow.back().unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(flow.pump().unwrap(), 0);
    assert_eq!(flow.depth(), 1);
    assert!(!log.activity_visible());
}
