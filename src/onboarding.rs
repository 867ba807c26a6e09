//! Wiring of the pet onboarding flow from configuration

use std::sync::Arc;

use crate::config::FlowConfig;
use crate::error::Result;
use crate::flow::FlowController;
use crate::services::{Feedback, LatestSelection};
use crate::step::{Step, StepFactory, StepKind};

/// Builds the onboarding's first step and remembers what the user picked
pub struct Onboarding {
    title: String,
    options: Vec<String>,
    factory: Arc<StepFactory>,
    selection: Arc<LatestSelection>,
}

impl Onboarding {
    pub fn new(config: &FlowConfig, feedback: Arc<dyn Feedback>) -> Self {
        let selection = LatestSelection::new();
        let factory = Arc::new(
            StepFactory::new(feedback, selection.clone()).with_save_settings(config.save_settings()),
        );
        Self {
            title: config.title.clone(),
            options: config.options.clone(),
            factory,
            selection,
        }
    }

    /// A fresh first page, failing when the configured options are unusable
    pub fn first_step(&self) -> Result<Step> {
        self.factory.pet_choice(self.title.clone(), self.options.clone())
    }

    /// Label of the most recently selected option
    pub fn selection(&self) -> Option<&str> {
        self.selection
            .latest()
            .and_then(|index| self.options.get(index))
            .map(String::as_str)
    }

    /// The favorite once the flow has reached its completion page, read from
    /// the choice page in its history
    pub fn completed_favorite<'a>(&self, flow: &'a FlowController) -> Option<&'a str> {
        match flow.current().map(Step::kind) {
            Some(StepKind::Terminal(_)) => flow.history().find_map(|step| match step.kind() {
                StepKind::Choice(choice) => choice.selected_label(),
                _ => None,
            }),
            _ => None,
        }
    }
}
