//! Runtime state of one answer session: which pane is shown, whether the
//! answer is submitted, and the text last handed to the host.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::persisted::{self, PersistedState};

/// Handle of a scheduled debounce timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerId(pub u64);

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer-{}", self.0)
    }
}

/// Which pane is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    Viewing,
    Answering,
}

/// Submission lifecycle. Only a draft can own a pending timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    Draft { pending_timer: Option<TimerId> },
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Draft,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTransition {
    Submitted { cancelled_timer: Option<TimerId> },
    AlreadySubmitted,
}

/// Runtime state of one answer session.
#[derive(Debug, Clone)]
pub struct SessionState {
    view_mode: ViewMode,
    submission: Submission,
    current_text: String,
    last_saved_baseline: String,
}

impl SessionState {
    pub fn fresh() -> Self {
        Self {
            view_mode: ViewMode::Answering,
            submission: Submission::Draft {
                pending_timer: None,
            },
            current_text: String::new(),
            last_saved_baseline: String::new(),
        }
    }

    /// Resuming shows the question first, with the answer collapsed.
    pub fn from_previous(previous: Option<PersistedState>) -> Self {
        let Some(previous) = previous else {
            return Self::fresh();
        };

        let submission = if previous.was_submitted {
            Submission::Submitted
        } else {
            Submission::Draft {
                pending_timer: None,
            }
        };

        Self {
            view_mode: ViewMode::Viewing,
            submission,
            last_saved_baseline: previous.answer_text.clone(),
            current_text: previous.answer_text,
        }
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn submission(&self) -> Submission {
        self.submission
    }

    pub fn submission_status(&self) -> SubmissionStatus {
        match self.submission {
            Submission::Draft { .. } => SubmissionStatus::Draft,
            Submission::Submitted => SubmissionStatus::Submitted,
        }
    }

    pub fn is_submitted(&self) -> bool {
        matches!(self.submission, Submission::Submitted)
    }

    pub fn current_text(&self) -> &str {
        &self.current_text
    }

    pub fn last_saved_baseline(&self) -> &str {
        &self.last_saved_baseline
    }

    pub fn pending_timer(&self) -> Option<TimerId> {
        match self.submission {
            Submission::Draft { pending_timer } => pending_timer,
            Submission::Submitted => None,
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.current_text != self.last_saved_baseline
    }

    pub fn show_question(&mut self) {
        self.view_mode = ViewMode::Viewing;
    }

    pub fn show_answer(&mut self) {
        self.view_mode = ViewMode::Answering;
    }

    /// Replace the editor contents. Returns false once submitted.
    ///
    /// The submitted marker is reserved and is dropped from typed text.
    pub fn set_text(&mut self, text: impl Into<String>) -> bool {
        if self.is_submitted() {
            return false;
        }
        let text = text.into();
        self.current_text = if text.contains(persisted::SUBMITTED_MARKER) {
            persisted::strip_marker(&text)
        } else {
            text
        };
        true
    }

    /// Record a newly armed timer, handing back the one it replaces.
    pub fn arm_timer(&mut self, id: TimerId) -> Option<TimerId> {
        match &mut self.submission {
            Submission::Draft { pending_timer } => pending_timer.replace(id),
            Submission::Submitted => None,
        }
    }

    pub fn take_pending_timer(&mut self) -> Option<TimerId> {
        match &mut self.submission {
            Submission::Draft { pending_timer } => pending_timer.take(),
            Submission::Submitted => None,
        }
    }

    pub fn mark_saved(&mut self) {
        self.last_saved_baseline.clone_from(&self.current_text);
    }

    pub fn mark_submitted(&mut self) -> SubmitTransition {
        match self.submission {
            Submission::Draft { pending_timer } => {
                self.submission = Submission::Submitted;
                self.last_saved_baseline.clone_from(&self.current_text);
                SubmitTransition::Submitted {
                    cancelled_timer: pending_timer,
                }
            }
            Submission::Submitted => SubmitTransition::AlreadySubmitted,
        }
    }

    /// Text plus marker, the form used for storage and tracked responses.
    pub fn encoded_response(&self) -> String {
        persisted::encode(&self.current_text, self.is_submitted())
    }
}
