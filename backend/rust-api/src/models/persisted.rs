//! Persisted answer state.
//!
//! The host stores a single opaque string per learner and content item. Two
//! logical fields travel in it: the answer text and whether it was submitted.
//! Submission is encoded by appending [`SUBMITTED_MARKER`] to the text; the
//! same encoding is used for the `response` of tracked statements.

use serde::{Deserialize, Serialize};

/// Reserved control sequence marking a submitted answer.
pub const SUBMITTED_MARKER: &str = "{submitted}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedState {
    pub answer_text: String,
    pub was_submitted: bool,
}

impl PersistedState {
    pub fn new(answer_text: impl Into<String>, was_submitted: bool) -> Self {
        Self {
            answer_text: answer_text.into(),
            was_submitted,
        }
    }

    pub fn encode(&self) -> String {
        encode(&self.answer_text, self.was_submitted)
    }

    /// Every marker occurrence is stripped; any occurrence means submitted.
    pub fn decode(raw: &str) -> Self {
        let answer_text = raw.replace(SUBMITTED_MARKER, "");
        let was_submitted = answer_text.len() != raw.len();
        Self {
            answer_text,
            was_submitted,
        }
    }
}

/// Remove the reserved marker from learner input so a draft can never
/// encode as submitted.
pub fn strip_marker(answer_text: &str) -> String {
    let mut text = answer_text.replace(SUBMITTED_MARKER, "");
    // Removing one occurrence can splice a new one together
    while text.contains(SUBMITTED_MARKER) {
        text = text.replace(SUBMITTED_MARKER, "");
    }
    text
}

pub fn encode(answer_text: &str, submitted: bool) -> String {
    if submitted {
        format!("{}{}", answer_text, SUBMITTED_MARKER)
    } else {
        answer_text.to_string()
    }
}

/// Previous state exactly as the host hands it over.
///
/// Older hosts stored the answer wrapped in a one-element array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreviousState {
    Plain(String),
    Wrapped(Vec<String>),
}

impl PreviousState {
    /// Unwrap the legacy shape. Empty values count as no previous state.
    pub fn normalize(self) -> Option<String> {
        let raw = match self {
            PreviousState::Plain(raw) => raw,
            PreviousState::Wrapped(items) => items.into_iter().next()?,
        };
        (!raw.is_empty()).then_some(raw)
    }
}

impl From<String> for PreviousState {
    fn from(raw: String) -> Self {
        PreviousState::Plain(raw)
    }
}

impl From<&str> for PreviousState {
    fn from(raw: &str) -> Self {
        PreviousState::Plain(raw.to_string())
    }
}

/// Normalize and decode whatever the host delivered.
pub fn load_previous_state(raw: Option<PreviousState>) -> Option<PersistedState> {
    raw.and_then(PreviousState::normalize)
        .map(|raw| PersistedState::decode(&raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_both_flags() {
        for text in ["", "Hello", "multi\nline {braces}", "submitted"] {
            for submitted in [true, false] {
                let encoded = encode(text, submitted);
                assert_eq!(
                    PersistedState::decode(&encoded),
                    PersistedState::new(text, submitted)
                );
            }
        }
    }

    #[test]
    fn marker_is_appended_only_when_submitted() {
        assert_eq!(encode("Hello world", true), "Hello world{submitted}");
        assert_eq!(encode("Hello world", false), "Hello world");
    }

    #[test]
    fn stray_markers_are_stripped() {
        let state = PersistedState::decode("a{submitted}b{submitted}");
        assert_eq!(state, PersistedState::new("ab", true));
    }

    #[test]
    fn marker_alone_is_an_empty_submitted_answer() {
        let state = load_previous_state(Some("{submitted}".into())).unwrap();
        assert_eq!(state, PersistedState::new("", true));
    }

    #[test]
    fn learner_text_cannot_carry_the_marker() {
        let typed = strip_marker("my notes {submitted} draft");
        assert_eq!(typed, "my notes  draft");
        assert_eq!(
            PersistedState::decode(&encode(&typed, false)),
            PersistedState::new("my notes  draft", false)
        );
        assert_eq!(strip_marker("{submi{submitted}tted}"), "");
        assert_eq!(strip_marker("plain {braces}"), "plain {braces}");
    }

    #[test]
    fn legacy_wrapped_state_is_unwrapped() {
        let raw: PreviousState = serde_json::from_str(r#"["Hello{submitted}"]"#).unwrap();
        assert_eq!(
            load_previous_state(Some(raw)),
            Some(PersistedState::new("Hello", true))
        );

        let plain: PreviousState = serde_json::from_str(r#""Hello""#).unwrap();
        assert_eq!(
            load_previous_state(Some(plain)),
            Some(PersistedState::new("Hello", false))
        );
    }

    #[test]
    fn empty_shapes_mean_no_previous_state() {
        assert_eq!(load_previous_state(None), None);
        assert_eq!(load_previous_state(Some("".into())), None);
        assert_eq!(
            load_previous_state(Some(PreviousState::Wrapped(vec![]))),
            None
        );
        assert_eq!(
            load_previous_state(Some(PreviousState::Wrapped(vec![String::new()]))),
            None
        );
    }
}
