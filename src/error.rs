//! Error types for flow and step operations

use thiserror::Error;

use crate::flow::FlowState;
use crate::step::StepId;

/// Contract violations reported by the flow controller and its steps.
///
/// None of these come from user input. They mean a flow definition or a
/// caller used the controller out of order, so callers should surface them
/// rather than retry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("flow has already been started")]
    AlreadyStarted,

    #[error("step {0} has no next step to advance to")]
    NoNextStep(StepId),

    #[error("cannot go back from the first step")]
    NoHistory,

    #[error("flow is already handling an operation")]
    Reentrancy,

    #[error("step {step} is torn down: {operation} is not allowed")]
    State {
        step: StepId,
        operation: &'static str,
    },

    #[error("step {0} already has a pending task")]
    TaskAlreadyPending(StepId),

    #[error("step {0} cannot be dismissed")]
    DismissalNotAllowed(StepId),

    #[error("flow is {0}, expected active")]
    NotActive(FlowState),

    #[error("invalid step definition: {0}")]
    InvalidStep(String),
}

impl FlowError {
    pub(crate) fn torn_down(step: StepId, operation: &'static str) -> Self {
        FlowError::State { step, operation }
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_step() {
        let err = FlowError::NoNextStep(StepId::from_raw(7));
        assert_eq!(err.to_string(), "step #7 has no next step to advance to");

        let err = FlowError::torn_down(StepId::from_raw(3), "render");
        assert_eq!(
            err.to_string(),
            "step #3 is torn down: render is not allowed"
        );
    }

    #[test]
    fn test_not_active_displays_state() {
        let err = FlowError::NotActive(FlowState::Dismissed);
        assert_eq!(err.to_string(), "flow is dismissed, expected active");
    }
}
