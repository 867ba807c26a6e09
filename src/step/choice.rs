//! Mutually exclusive choice between a handful of options

use std::sync::Arc;

use super::{replace_next, ButtonRole, Step, StepContent, StepContext, StepEvent, StepFactory, StepId};
use crate::error::{FlowError, Result};
use crate::services::FeedbackKind;

/// Options shown as toggle buttons; picking one computes the next step
pub struct ChoiceStep {
    title: String,
    description: String,
    options: Vec<String>,
    selected: Option<usize>,
    factory: Arc<StepFactory>,
}

impl ChoiceStep {
    pub(crate) fn new(
        factory: Arc<StepFactory>,
        title: String,
        description: String,
        options: Vec<String>,
    ) -> Self {
        Self {
            title,
            description,
            options,
            selected: None,
            factory,
        }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected_label(&self) -> Option<&str> {
        self.selected
            .and_then(|i| self.options.get(i))
            .map(String::as_str)
    }

    pub(super) fn render(&self, id: StepId, dismissable: bool) -> StepContent {
        let mut content = StepContent::new(id, &self.title, dismissable).text(&self.description);
        for (index, label) in self.options.iter().enumerate() {
            content = content.choice(index, label, self.selected == Some(index));
        }
        content.button(
            "Select",
            StepEvent::Continue,
            ButtonRole::Primary,
            self.selected.is_some(),
        )
    }

    pub(super) fn handle_event(
        &mut self,
        event: StepEvent,
        next: &mut Option<Box<Step>>,
        ctx: &mut StepContext<'_>,
    ) -> Result<()> {
        match event {
            StepEvent::Select(index) => self.select(index, next),
            StepEvent::Continue => {
                if next.is_some() {
                    ctx.advance();
                } else {
                    tracing::debug!(step = %ctx.step(), "continue ignored, nothing selected yet");
                }
                Ok(())
            }
            StepEvent::Confirm | StepEvent::Back => Ok(()),
        }
    }

    fn select(&mut self, index: usize, next: &mut Option<Box<Step>>) -> Result<()> {
        let Some(label) = self.options.get(index) else {
            return Err(FlowError::InvalidStep(format!(
                "choice {} out of range, step has {} options",
                index,
                self.options.len()
            )));
        };

        // Re-selecting keeps the successor that was already built.
        if self.selected == Some(index) && next.is_some() {
            return Ok(());
        }

        self.selected = Some(index);
        self.factory.feedback().signal(FeedbackKind::Selection);
        self.factory.selection_observer().selection_changed(index);

        let successor = self.factory.confirmation(label, index);
        tracing::debug!(choice = %label, next = %successor.id(), "computed next step");
        replace_next(next, Box::new(successor));
        Ok(())
    }
}
