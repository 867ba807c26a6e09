//! Confirmation of a choice, saved in the background before moving on

use std::sync::Arc;

use super::{replace_next, ButtonRole, Step, StepContent, StepContext, StepEvent, StepFactory, StepId};
use crate::error::{FlowError, Result};
use crate::services::FeedbackKind;
use crate::task::{TaskHandle, TaskOutcome};

/// Asks the user to confirm a choice made on the previous step.
///
/// Confirming runs the factory's save task with the activity indicator
/// shown. A successful save leads to the completion step; a failed one keeps
/// the user here with the reason displayed so they can retry or go back.
pub struct ConfirmationStep {
    choice: String,
    index: usize,
    task: Option<TaskHandle>,
    last_error: Option<String>,
    factory: Arc<StepFactory>,
}

impl ConfirmationStep {
    pub(crate) fn new(factory: Arc<StepFactory>, choice: String, index: usize) -> Self {
        Self {
            choice,
            index,
            task: None,
            last_error: None,
            factory,
        }
    }

    pub fn choice(&self) -> &str {
        &self.choice
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Whether a save is in flight
    pub fn is_saving(&self) -> bool {
        self.task.as_ref().is_some_and(TaskHandle::is_pending)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub(super) fn render(&self, id: StepId, dismissable: bool) -> StepContent {
        let saving = self.is_saving();
        let mut content = StepContent::new(id, "Confirm your favorite", dismissable).text(format!(
            "You chose {} as your favorite. Do you want to keep it?",
            self.choice
        ));
        if let Some(message) = &self.last_error {
            content = content.error(format!("Saving failed: {}", message));
        }
        content
            .button("Confirm", StepEvent::Confirm, ButtonRole::Primary, !saving)
            .button("Change", StepEvent::Back, ButtonRole::Alternative, !saving)
    }

    pub(super) fn handle_event(&mut self, event: StepEvent, ctx: &mut StepContext<'_>) -> Result<()> {
        match event {
            StepEvent::Confirm | StepEvent::Continue => self.confirm(ctx),
            StepEvent::Back => {
                ctx.back();
                Ok(())
            }
            StepEvent::Select(_) => Ok(()),
        }
    }

    fn confirm(&mut self, ctx: &mut StepContext<'_>) -> Result<()> {
        if self.is_saving() {
            return Err(FlowError::TaskAlreadyPending(ctx.step()));
        }

        let work = self.factory.save_work(&self.choice, self.index);
        let handle = ctx.start_task(self.factory.save_delay(), work)?;

        self.last_error = None;
        self.factory.feedback().signal(FeedbackKind::Selection);
        ctx.show_activity_indicator();
        tracing::info!(step = %ctx.step(), task = %handle.id(), choice = %self.choice, "saving favorite");
        self.task = Some(handle);
        Ok(())
    }

    pub(super) fn on_task_complete(
        &mut self,
        outcome: TaskOutcome,
        next: &mut Option<Box<Step>>,
        ctx: &mut StepContext<'_>,
    ) {
        self.task = None;
        ctx.hide_activity_indicator();

        match outcome {
            TaskOutcome::Success => {
                self.factory.feedback().signal(FeedbackKind::Success);
                replace_next(next, Box::new(self.factory.completion(&self.choice)));
                ctx.advance();
            }
            TaskOutcome::Failure(reason) => {
                tracing::warn!(step = %ctx.step(), %reason, "saving favorite failed");
                self.factory.feedback().signal(FeedbackKind::Error);
                self.last_error = Some(reason);
            }
        }
    }

    /// Cancel an in-flight save. Returns true if there was one.
    pub(super) fn cancel_task(&mut self) -> bool {
        self.task.take().is_some_and(|handle| handle.cancel())
    }
}
