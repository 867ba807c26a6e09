//! Last step of a flow

use super::{ButtonRole, StepContent, StepContext, StepEvent, StepId};

/// Final step: nothing comes after it, and its action dismisses the flow
pub struct TerminalStep {
    title: String,
    message: String,
    action: String,
}

impl TerminalStep {
    pub(crate) fn new(title: String, message: String, action: String) -> Self {
        Self {
            title,
            message,
            action,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub(super) fn render(&self, id: StepId, dismissable: bool) -> StepContent {
        StepContent::new(id, &self.title, dismissable)
            .text(&self.message)
            .button(&self.action, StepEvent::Continue, ButtonRole::Primary, true)
    }

    pub(super) fn handle_event(&mut self, event: StepEvent, ctx: &mut StepContext<'_>) {
        match event {
            StepEvent::Continue | StepEvent::Confirm => ctx.dismiss(),
            StepEvent::Select(_) | StepEvent::Back => {}
        }
    }
}
