//! Content descriptors produced by `Step::render`

use serde::Serialize;

use super::{StepEvent, StepId};

/// How prominent a button is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonRole {
    Primary,
    Alternative,
}

/// One thing to show on a step's card
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Element {
    Text {
        text: String,
    },
    Choice {
        index: usize,
        label: String,
        selected: bool,
    },
    Button {
        label: String,
        event: StepEvent,
        role: ButtonRole,
        enabled: bool,
    },
    Error {
        message: String,
    },
}

/// Everything a presenter needs to draw a step, and nothing it has to invent
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepContent {
    pub step: StepId,
    pub title: String,
    pub dismissable: bool,
    pub elements: Vec<Element>,
}

impl StepContent {
    pub(crate) fn new(step: StepId, title: impl Into<String>, dismissable: bool) -> Self {
        Self {
            step,
            title: title.into(),
            dismissable,
            elements: Vec::new(),
        }
    }

    pub(crate) fn text(mut self, text: impl Into<String>) -> Self {
        self.elements.push(Element::Text { text: text.into() });
        self
    }

    pub(crate) fn choice(mut self, index: usize, label: impl Into<String>, selected: bool) -> Self {
        self.elements.push(Element::Choice {
            index,
            label: label.into(),
            selected,
        });
        self
    }

    pub(crate) fn button(
        mut self,
        label: impl Into<String>,
        event: StepEvent,
        role: ButtonRole,
        enabled: bool,
    ) -> Self {
        self.elements.push(Element::Button {
            label: label.into(),
            event,
            role,
            enabled,
        });
        self
    }

    pub(crate) fn error(mut self, message: impl Into<String>) -> Self {
        self.elements.push(Element::Error {
            message: message.into(),
        });
        self
    }

    /// Event of the enabled button with the given role, if any
    pub fn action(&self, wanted: ButtonRole) -> Option<StepEvent> {
        self.elements.iter().find_map(|element| match element {
            Element::Button {
                event,
                role,
                enabled: true,
                ..
            } if *role == wanted => Some(*event),
            _ => None,
        })
    }

    /// Index of the selected choice, if this step shows choices
    pub fn selected_choice(&self) -> Option<usize> {
        self.elements.iter().find_map(|element| match element {
            Element::Choice {
                index,
                selected: true,
                ..
            } => Some(*index),
            _ => None,
        })
    }

    pub fn choice_count(&self) -> usize {
        self.elements
            .iter()
            .filter(|element| matches!(element, Element::Choice { .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StepContent {
        StepContent::new(StepId::from_raw(1), "Pick one", false)
            .choice(0, "Cats", false)
            .choice(1, "Dogs", true)
            .button("Select", StepEvent::Continue, ButtonRole::Primary, true)
            .button("Back", StepEvent::Back, ButtonRole::Alternative, false)
    }

    #[test]
    fn test_action_skips_disabled_buttons() {
        let content = sample();
        assert_eq!(content.action(ButtonRole::Primary), Some(StepEvent::Continue));
        assert_eq!(content.action(ButtonRole::Alternative), None);
    }

    #[test]
    fn test_selected_choice() {
        let content = sample();
        assert_eq!(content.selected_choice(), Some(1));
        assert_eq!(content.choice_count(), 2);
    }

    #[test]
    fn test_content_serializes_tagged_elements() {
        let content = StepContent::new(StepId::from_raw(2), "Done", true).text("All set");
        let json = serde_json::to_value(&content).unwrap();
        assert_eq!(json["step"], 2);
        assert_eq!(json["elements"][0]["type"], "text");
        assert_eq!(json["elements"][0]["text"], "All set");
    }
}
