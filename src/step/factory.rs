//! Builds the steps of the pet onboarding flow

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::{ChoiceStep, ConfirmationStep, Step, StepId, StepKind, TerminalStep};
use crate::error::{FlowError, Result};
use crate::services::{Feedback, SelectionObserver};
use crate::task::{TaskOutcome, TaskWork};

/// How the confirmation step's save behaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveSettings {
    /// Simulated latency of the save
    pub delay: Duration,
    /// When set, every save fails with this reason
    pub failure: Option<String>,
}

impl Default for SaveSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(1000),
            failure: None,
        }
    }
}

/// Creates steps on demand and hands them the services they need.
///
/// Steps keep an `Arc` to the factory so a choice can build its successor
/// lazily, at the moment the user makes it.
pub struct StepFactory {
    next_id: AtomicU64,
    feedback: Arc<dyn Feedback>,
    observer: Arc<dyn SelectionObserver>,
    save: SaveSettings,
}

impl StepFactory {
    pub fn new(feedback: Arc<dyn Feedback>, observer: Arc<dyn SelectionObserver>) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            feedback,
            observer,
            save: SaveSettings::default(),
        }
    }

    pub fn with_save_settings(mut self, save: SaveSettings) -> Self {
        self.save = save;
        self
    }

    fn allocate_id(&self) -> StepId {
        StepId::from_raw(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// A step offering mutually exclusive options
    pub fn choice(
        self: &Arc<Self>,
        title: impl Into<String>,
        description: impl Into<String>,
        options: Vec<String>,
    ) -> Result<Step> {
        if options.len() < 2 {
            return Err(FlowError::InvalidStep(format!(
                "a choice needs at least two options, got {}",
                options.len()
            )));
        }
        let choice = ChoiceStep::new(self.clone(), title.into(), description.into(), options);
        Ok(Step::new(self.allocate_id(), StepKind::Choice(choice)))
    }

    /// First page of the onboarding: which kind of pet is the favorite
    pub fn pet_choice(self: &Arc<Self>, title: impl Into<String>, options: Vec<String>) -> Result<Step> {
        self.choice(
            title,
            "Which pets do you prefer? We will highlight them for you.",
            options,
        )
    }

    pub fn confirmation(self: &Arc<Self>, choice: &str, index: usize) -> Step {
        let confirmation = ConfirmationStep::new(self.clone(), choice.to_string(), index);
        Step::new(self.allocate_id(), StepKind::Confirmation(confirmation))
    }

    pub fn completion(self: &Arc<Self>, choice: &str) -> Step {
        let terminal = TerminalStep::new(
            "Setup completed".to_string(),
            format!("{} are now your favorite. You are all set!", choice),
            "Get started".to_string(),
        );
        Step::new(self.allocate_id(), StepKind::Terminal(terminal))
    }

    pub(crate) fn feedback(&self) -> &dyn Feedback {
        self.feedback.as_ref()
    }

    pub(crate) fn selection_observer(&self) -> &dyn SelectionObserver {
        self.observer.as_ref()
    }

    pub(crate) fn save_delay(&self) -> Duration {
        self.save.delay
    }

    pub(crate) fn save_work(&self, choice: &str, index: usize) -> TaskWork {
        let failure = self.save.failure.clone();
        let choice = choice.to_string();
        Box::new(move || match failure {
            Some(reason) => TaskOutcome::Failure(reason),
            None => {
                tracing::debug!(%choice, index, "favorite stored");
                TaskOutcome::Success
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::{LatestSelection, NoFeedback};

    fn factory() -> Arc<StepFactory> {
        Arc::new(StepFactory::new(Arc::new(NoFeedback), LatestSelection::new()))
    }

    #[test]
    fn test_choice_needs_two_options() {
        let result = factory().choice("Pick", "Only one", vec!["Cats".into()]);
        assert!(matches!(result, Err(FlowError::InvalidStep(_))));
    }

    #[test]
    fn test_step_ids_are_unique() {
        let factory = factory();
        let a = factory.completion("Cats");
        let b = factory.completion("Cats");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_only_completion_is_dismissable() {
        let factory = factory();
        let choice = factory
            .pet_choice("Favorite", vec!["Cats".into(), "Dogs".into()])
            .unwrap();
        assert!(!choice.is_dismissable());
        assert!(!factory.confirmation("Cats", 0).is_dismissable());
        assert!(factory.completion("Cats").is_dismissable());
        assert!(!factory.completion("Cats").has_next());
    }

    #[test]
    fn test_save_work_reports_configured_failure() {
        let factory = StepFactory::new(Arc::new(NoFeedback), LatestSelection::new())
            .with_save_settings(SaveSettings {
                delay: Duration::ZERO,
                failure: Some("offline".to_string()),
            });
        let work = factory.save_work("Dogs", 1);
        assert_eq!(work(), TaskOutcome::Failure("offline".to_string()));
        assert_eq!(factory.save_delay(), Duration::ZERO);
    }
}
