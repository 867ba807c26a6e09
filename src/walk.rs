//! Headless walk through the onboarding flow.
//!
//! A script such as `select:0,continue,confirm,wait:1000,continue` is applied
//! one action at a time on a [`ManualExecutor`], so background saves only
//! finish when the script waits for them. Every action and every presenter
//! call is written out as one JSON line.

use std::fmt;
use std::io::Write;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::config::FlowConfig;
use crate::error::FlowError;
use crate::flow::{FlowController, FlowState, PresenterLog, RecordingPresenter};
use crate::onboarding::Onboarding;
use crate::services::TracingFeedback;
use crate::step::StepEvent;
use crate::task::ManualExecutor;

/// One scripted user action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    Event(StepEvent),
    Dismiss,
    /// Let simulated time pass, then deliver finished tasks
    Wait(Duration),
}

impl FromStr for WalkAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == "dismiss" {
            return Ok(WalkAction::Dismiss);
        }
        if let Some(ms) = s.strip_prefix("wait:") {
            return ms
                .trim()
                .parse()
                .map(|ms| WalkAction::Wait(Duration::from_millis(ms)))
                .map_err(|_| format!("invalid wait '{}', expected milliseconds", ms));
        }
        s.parse().map(WalkAction::Event)
    }
}

impl fmt::Display for WalkAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalkAction::Event(StepEvent::Select(index)) => write!(f, "select:{}", index),
            WalkAction::Event(StepEvent::Continue) => f.write_str("continue"),
            WalkAction::Event(StepEvent::Confirm) => f.write_str("confirm"),
            WalkAction::Event(StepEvent::Back) => f.write_str("back"),
            WalkAction::Dismiss => f.write_str("dismiss"),
            WalkAction::Wait(delay) => write!(f, "wait:{}", delay.as_millis()),
        }
    }
}

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("action {position} ('{token}'): {reason}")]
    Script {
        position: usize,
        token: String,
        reason: String,
    },

    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("failed to write walk output: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode walk output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Split a script on commas or whitespace and parse each action
pub fn parse_script(script: &str) -> Result<Vec<WalkAction>, WalkError> {
    script
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .enumerate()
        .map(|(position, token)| {
            token.parse().map_err(|reason| WalkError::Script {
                position: position + 1,
                token: token.to_string(),
                reason,
            })
        })
        .collect()
}

#[derive(Serialize)]
struct ActionLine<'a> {
    action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a str>,
}

/// How a walk ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkSummary {
    pub state: FlowState,
    pub depth: usize,
    /// Actions the flow refused
    pub rejected: usize,
    /// Set once the completion page was reached
    pub favorite: Option<String>,
}

/// A flow on a simulated clock, driven one action at a time
pub struct Walk {
    flow: FlowController,
    log: PresenterLog,
    executor: Arc<ManualExecutor>,
    onboarding: Onboarding,
    rejected: usize,
    favorite: Option<String>,
}

impl Walk {
    pub fn start(config: &FlowConfig) -> Result<Self, WalkError> {
        let onboarding = Onboarding::new(config, Arc::new(TracingFeedback));
        let executor = Arc::new(ManualExecutor::new());
        let (presenter, log) = RecordingPresenter::new();
        let mut flow = FlowController::new(Box::new(presenter), executor.clone());
        flow.start(onboarding.first_step()?)?;

        Ok(Self {
            flow,
            log,
            executor,
            onboarding,
            rejected: 0,
            favorite: None,
        })
    }

    /// Apply one action. A refused action is counted and returned, not fatal.
    pub fn apply(&mut self, action: WalkAction) -> Result<(), FlowError> {
        let result = match action {
            WalkAction::Event(event) => self.flow.dispatch(event),
            WalkAction::Dismiss => self.flow.dismiss(),
            WalkAction::Wait(delay) => {
                self.executor.advance(delay);
                self.flow.pump().map(|delivered| {
                    tracing::debug!(delivered, "waited {}ms", delay.as_millis());
                })
            }
        };

        if let Some(favorite) = self.onboarding.completed_favorite(&self.flow) {
            self.favorite = Some(favorite.to_string());
        }
        if let Err(err) = &result {
            self.rejected += 1;
            tracing::warn!(%action, error = %err, "action rejected");
        }
        result
    }

    /// Apply every action, writing JSON lines to `out`
    pub fn run<W: Write>(
        &mut self,
        actions: &[WalkAction],
        out: &mut W,
    ) -> Result<WalkSummary, WalkError> {
        self.flush_calls(out)?;
        for action in actions {
            let result = self.apply(*action);
            let error = result.as_ref().err().map(ToString::to_string);
            let line = ActionLine {
                action: action.to_string(),
                error: error.as_deref(),
            };
            writeln!(out, "{}", serde_json::to_string(&line)?)?;
            self.flush_calls(out)?;
        }
        Ok(self.summary())
    }

    pub fn summary(&self) -> WalkSummary {
        WalkSummary {
            state: self.flow.state(),
            depth: self.flow.depth(),
            rejected: self.rejected,
            favorite: self.favorite.clone(),
        }
    }

    pub fn flow(&self) -> &FlowController {
        &self.flow
    }

    fn flush_calls<W: Write>(&self, out: &mut W) -> Result<(), WalkError> {
        for call in self.log.calls() {
            writeln!(out, "{}", serde_json::to_string(&call)?)?;
        }
        self.log.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn flow_config() -> FlowConfig {
        Config::default().flow
    }

    #[test]
    fn test_parse_script_accepts_commas_and_spaces() {
        let actions = parse_script("select:1, continue confirm,wait:1000 dismiss").unwrap();
        assert_eq!(
            actions,
            vec![
                WalkAction::Event(StepEvent::Select(1)),
                WalkAction::Event(StepEvent::Continue),
                WalkAction::Event(StepEvent::Confirm),
                WalkAction::Wait(Duration::from_millis(1000)),
                WalkAction::Dismiss,
            ]
        );
        assert!(parse_script("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_script_reports_bad_token() {
        let err = parse_script("select:0,jump").unwrap_err();
        match err {
            WalkError::Script {
                position, token, ..
            } => {
                assert_eq!(position, 2);
                assert_eq!(token, "jump");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(parse_script("wait:soon").is_err());
    }

    #[test]
    fn test_action_display_matches_script_syntax() {
        for token in ["select:3", "continue", "confirm", "back", "dismiss", "wait:250"] {
            assert_eq!(token.parse::<WalkAction>().unwrap().to_string(), token);
        }
    }

    #[test]
    fn test_full_walk_reaches_completion() {
        let mut walk = Walk::start(&flow_config()).unwrap();
        let actions = parse_script("select:0,continue,confirm,wait:1000,continue").unwrap();
        let mut out = Vec::new();

        let summary = walk.run(&actions, &mut out).unwrap();
        assert_eq!(
            summary,
            WalkSummary {
                state: FlowState::Dismissed,
                depth: 0,
                rejected: 0,
                favorite: Some("Cats".to_string()),
            }
        );

        let output = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines[0]["call"], "render");
        assert_eq!(lines[0]["content"]["title"], "Favorite pet");
        assert!(lines.iter().any(|line| line["call"] == "show_activity"));
        assert!(lines
            .iter()
            .any(|line| line["content"]["title"] == "Setup completed"));
        assert!(lines.iter().all(|line| line.get("error").is_none()));
    }

    #[test]
    fn test_rejected_actions_are_reported_and_walk_continues() {
        let mut walk = Walk::start(&flow_config()).unwrap();
        let actions = parse_script("select:5,back,dismiss,select:1,continue").unwrap();
        let mut out = Vec::new();

        let summary = walk.run(&actions, &mut out).unwrap();
        assert_eq!(summary.rejected, 3);
        assert_eq!(summary.state, FlowState::Active);
        assert_eq!(summary.depth, 2);
        assert_eq!(summary.favorite, None);

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains(r#""action":"back","error":"#));
    }

    #[test]
    fn test_back_during_save_cancels_it() {
        let mut walk = Walk::start(&flow_config()).unwrap();
        for action in parse_script("select:1,continue,confirm,back,wait:5000").unwrap() {
            walk.apply(action).unwrap();
        }
        assert_eq!(walk.flow().depth(), 1);
        assert_eq!(walk.flow().pending_tasks(), 0);
        assert_eq!(walk.summary().favorite, None);
    }
}
