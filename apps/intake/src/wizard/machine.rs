//! Step state machine for the intake wizard.
//!
//! [`transition`] is a pure function over [`ControllerState`]; the
//! [`Wizard`](super::Wizard) owns the state and applies side effects
//! (persistence, network calls) around it.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::cv::CvDocument;
use crate::wizard::validation::{validate_step, StepError};

pub const STEP_TITLES: [&str; 10] = [
    "Personal",
    "O/L",
    "A/L",
    "Work",
    "Skills",
    "Qualifications",
    "Extra",
    "Profile",
    "References",
    "Submit",
];

/// One of the ten wizard steps, numbered from 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Step(u8);

impl Step {
    pub const FIRST: Step = Step(1);
    pub const LAST: Step = Step(STEP_TITLES.len() as u8);

    pub fn new(number: u8) -> Option<Step> {
        (Self::FIRST.0..=Self::LAST.0)
            .contains(&number)
            .then_some(Step(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn title(self) -> &'static str {
        STEP_TITLES[usize::from(self.0 - 1)]
    }

    pub fn is_first(self) -> bool {
        self == Self::FIRST
    }

    pub fn is_last(self) -> bool {
        self == Self::LAST
    }

    pub fn all() -> impl Iterator<Item = Step> {
        (Self::FIRST.0..=Self::LAST.0).map(Step)
    }
}

impl TryFrom<u8> for Step {
    type Error = String;

    fn try_from(number: u8) -> Result<Self, Self::Error> {
        Step::new(number).ok_or_else(|| format!("step {number} out of range"))
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> u8 {
        step.0
    }
}

/// Result of the backend health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Connectivity {
    #[default]
    Checking,
    Connected,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ControllerState {
    pub step: Step,
    pub submitting: bool,
    pub connectivity: Connectivity,
    pub completed: bool,
}

impl Default for ControllerState {
    fn default() -> Self {
        Self {
            step: Step::FIRST,
            submitting: false,
            connectivity: Connectivity::Checking,
            completed: false,
        }
    }
}

impl ControllerState {
    /// Whether the submit control should be enabled.
    pub fn can_submit(&self) -> bool {
        self.step.is_last()
            && !self.submitting
            && !self.completed
            && self.connectivity != Connectivity::Error
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Next,
    Previous,
    HealthChecked { success: bool },
    SubmitStarted,
    SubmitSucceeded,
    SubmitFailed,
}

/// Why an event was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Blocked {
    #[error("{0}")]
    Invalid(#[from] StepError),

    #[error("Already at the first step")]
    AtFirstStep,

    #[error("Already at the final step")]
    AtLastStep,

    #[error("Submission is only available on the final step")]
    NotAtFinalStep,

    #[error("Backend connection failed. Please make sure the backend is running.")]
    BackendOffline,

    #[error("A submission is already in progress")]
    SubmitInProgress,

    #[error("No submission is in progress")]
    NotSubmitting,

    #[error("This CV has already been submitted")]
    Completed,
}

pub fn transition(
    state: &ControllerState,
    event: Event,
    document: &CvDocument,
) -> Result<ControllerState, Blocked> {
    let mut next = *state;
    match event {
        Event::Next => {
            if state.completed {
                return Err(Blocked::Completed);
            }
            if state.step.is_last() {
                return Err(Blocked::AtLastStep);
            }
            validate_step(state.step, document)?;
            next.step = Step(state.step.0 + 1);
        }
        Event::Previous => {
            if state.completed {
                return Err(Blocked::Completed);
            }
            if state.step.is_first() {
                return Err(Blocked::AtFirstStep);
            }
            next.step = Step(state.step.0 - 1);
        }
        Event::HealthChecked { success } => {
            next.connectivity = if success {
                Connectivity::Connected
            } else {
                Connectivity::Error
            };
        }
        Event::SubmitStarted => {
            if state.completed {
                return Err(Blocked::Completed);
            }
            if !state.step.is_last() {
                return Err(Blocked::NotAtFinalStep);
            }
            if state.submitting {
                return Err(Blocked::SubmitInProgress);
            }
            if state.connectivity == Connectivity::Error {
                return Err(Blocked::BackendOffline);
            }
            validate_step(state.step, document)?;
            next.submitting = true;
        }
        Event::SubmitSucceeded | Event::SubmitFailed => {
            if !state.submitting {
                return Err(Blocked::NotSubmitting);
            }
            next.submitting = false;
            next.completed = event == Event::SubmitSucceeded;
        }
    }
    Ok(next)
}
