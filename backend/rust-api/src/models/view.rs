use serde::Serialize;

use super::session::{SubmissionStatus, ViewMode};

/// Everything a renderer needs to draw the widget in its current state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub title: String,
    pub prompt_text: String,
    pub view_mode: ViewMode,
    pub submission: SubmissionStatus,
    pub current_text: String,
    pub editor_enabled: bool,
    pub placeholder: String,
    pub visible_lines: u32,
    pub buttons: ButtonVisibility,
    pub autosave_status: Option<String>,
    pub submit_message: Option<String>,
    pub rubric: Option<RubricView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ButtonVisibility {
    pub show_question: bool,
    pub show_input: bool,
    pub submit_answer: bool,
}

impl ButtonVisibility {
    pub fn for_state(view_mode: ViewMode, submit_available: bool) -> Self {
        match view_mode {
            ViewMode::Viewing => Self {
                show_question: false,
                show_input: true,
                submit_answer: false,
            },
            ViewMode::Answering => Self {
                show_question: true,
                show_input: false,
                submit_answer: submit_available,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RubricView {
    pub label: String,
    pub criteria: Vec<CriterionView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriterionView {
    /// Weight as displayed, e.g. `(40%)`
    pub weight: String,
    pub text: String,
}
