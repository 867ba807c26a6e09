//! Pageflow - linear wizard flows with history, async steps and teardown
//!
//! A [`FlowController`] owns the stack of visited [`Step`]s. Steps compute
//! their successor as the user makes choices; the controller pushes it on
//! advance, pops on back, and tears everything down on dismissal. Rendering
//! is left to a [`Presenter`].

pub mod config;
pub mod error;
pub mod flow;
pub mod logging;
pub mod onboarding;
pub mod services;
pub mod step;
pub mod task;
pub mod ui;
pub mod walk;

pub use error::{FlowError, Result};
pub use flow::{FlowController, FlowHandle, FlowId, FlowState, WeakFlowHandle};
pub use services::{Direction, Feedback, FeedbackKind, Presenter, SelectionObserver};
pub use step::{Step, StepContent, StepEvent, StepFactory, StepId, StepKind, TeardownReason};
pub use task::{ManualExecutor, TaskExecutor, TaskHandle, TaskOutcome, TokioExecutor};
