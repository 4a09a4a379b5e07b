use serde::{Deserialize, Serialize};

use self::persisted::PreviousState;
use self::session::SubmissionStatus;
use self::view::QuestionView;

pub mod params;
pub mod persisted;
pub mod session;
pub mod statement;
pub mod view;

pub use self::statement::{Statement, Verb, XapiData};

/// Storage key of one learner's answer to one content item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub user_id: String,
    pub content_id: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenQuestionRequest {
    pub user_id: String,
    pub content_id: String,
    #[serde(default)]
    pub params: Option<serde_json::Value>,
    /// Overrides whatever the state store holds for this learner.
    #[serde(default)]
    pub previous_state: Option<PreviousState>,
}

#[derive(Debug, Serialize)]
pub struct OpenQuestionResponse {
    pub session_id: String,
    pub view: QuestionView,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub outcome: SubmitOutcome,
    pub view: QuestionView,
}

#[derive(Debug, Serialize)]
pub struct PersistedStateResponse {
    pub state: String,
    pub submission: SubmissionStatus,
    pub answer_given: bool,
}

/// Result of a submit click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    Submitted,
    AlreadySubmitted,
    SubmitDisabled,
}
