use chrono::Local;

use crate::metrics::STATEMENTS_DISPATCHED_TOTAL;
use crate::models::session::SessionState;
use crate::models::statement::{InteractionDefinition, Statement, Verb};
use crate::utils::time::{last_saved_status, submitted_status};

/// Host tracking dispatcher.
pub trait StatementDispatcher {
    fn dispatch(&mut self, statement: Statement);
}

impl StatementDispatcher for Vec<Statement> {
    fn dispatch(&mut self, statement: Statement) {
        self.push(statement);
    }
}

/// Turns session state into activity statements and keeps the status lines
/// shown under the editor.
#[derive(Debug, Clone)]
pub struct EventGenerator {
    activity_id: Option<String>,
    definition: InteractionDefinition,
    submit_confirmation_text: String,
    autosave_status: Option<String>,
    submit_message: Option<String>,
}

impl EventGenerator {
    pub fn new(
        activity_id: Option<String>,
        prompt_text: &str,
        submit_confirmation_text: impl Into<String>,
    ) -> Self {
        Self {
            activity_id,
            definition: InteractionDefinition::long_fill_in(prompt_text),
            submit_confirmation_text: submit_confirmation_text.into(),
            autosave_status: None,
            submit_message: None,
        }
    }

    pub fn build_statement(&self, state: &SessionState, is_submit: bool) -> Statement {
        let verb = if is_submit {
            Verb::Answered
        } else if answer_given(state) {
            Verb::Responded
        } else {
            Verb::Initialized
        };

        Statement::new(
            verb,
            self.activity_id.clone(),
            self.definition.clone(),
            state.encoded_response(),
        )
    }

    /// Dispatch a save statement and stamp "last saved".
    pub fn respond<D>(&mut self, state: &SessionState, dispatcher: &mut D)
    where
        D: StatementDispatcher + ?Sized,
    {
        self.dispatch(state, false, dispatcher);
        self.autosave_status = Some(last_saved_status(&Local::now()));
    }

    /// Dispatch the submission statement and show the confirmation.
    pub fn answer<D>(&mut self, state: &SessionState, dispatcher: &mut D)
    where
        D: StatementDispatcher + ?Sized,
    {
        self.dispatch(state, true, dispatcher);
        self.autosave_status = Some(submitted_status(&Local::now()));
        self.submit_message = Some(self.submit_confirmation_text.clone());
    }

    fn dispatch<D>(&self, state: &SessionState, is_submit: bool, dispatcher: &mut D)
    where
        D: StatementDispatcher + ?Sized,
    {
        let statement = self.build_statement(state, is_submit);
        STATEMENTS_DISPATCHED_TOTAL
            .with_label_values(&[statement.verb.as_str()])
            .inc();
        dispatcher.dispatch(statement);
    }

    /// Side-effect free statement for reporting.
    pub fn snapshot(&self, state: &SessionState) -> Statement {
        self.build_statement(state, false)
    }

    pub fn autosave_status(&self) -> Option<&str> {
        self.autosave_status.as_deref()
    }

    pub fn submit_message(&self) -> Option<&str> {
        self.submit_message.as_deref()
    }
}

pub fn answer_given(state: &SessionState) -> bool {
    !state.current_text().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::persisted::PersistedState;

    fn generator() -> EventGenerator {
        EventGenerator::new(Some("content-1".into()), "Explain.", "Thanks!")
    }

    #[test]
    fn verb_follows_text_and_submission() {
        let events = generator();
        let mut state = SessionState::fresh();
        assert_eq!(events.build_statement(&state, false).verb, Verb::Initialized);

        state.set_text("Some text");
        assert_eq!(events.build_statement(&state, false).verb, Verb::Responded);
        assert_eq!(events.build_statement(&state, true).verb, Verb::Answered);
    }

    #[test]
    fn response_carries_marker_once_submitted() {
        let events = generator();
        let mut state = SessionState::fresh();
        state.set_text("Hello");
        assert_eq!(events.build_statement(&state, false).response(), "Hello");

        state.mark_submitted();
        assert_eq!(
            events.build_statement(&state, true).response(),
            "Hello{submitted}"
        );
    }

    #[test]
    fn definition_is_unscored_long_fill_in() {
        let statement = generator().snapshot(&SessionState::fresh());
        let definition = statement.definition();
        assert_eq!(definition.interaction_type, "long-fill-in");
        assert!(definition.correct_responses_pattern.is_empty());
        assert_eq!(definition.description["en-US"], "Explain.");
        assert_eq!(statement.object.id.as_deref(), Some("content-1"));
    }

    #[test]
    fn respond_dispatches_and_stamps_status() {
        let mut events = generator();
        let mut sent: Vec<Statement> = Vec::new();
        let state = SessionState::from_previous(Some(PersistedState::new("Draft", false)));

        events.respond(&state, &mut sent);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].verb, Verb::Responded);
        let status = events.autosave_status().unwrap();
        assert!(status.starts_with("Last saved at "));
        assert_eq!(status.len(), "Last saved at 00:00:00.".len());
        assert_eq!(events.submit_message(), None);
    }

    #[test]
    fn answer_sets_confirmation() {
        let mut events = generator();
        let mut sent: Vec<Statement> = Vec::new();
        let mut state = SessionState::fresh();
        state.set_text("Final");
        state.mark_submitted();

        events.answer(&state, &mut sent);
        assert_eq!(sent[0].verb, Verb::Answered);
        assert!(events.autosave_status().unwrap().starts_with("Submitted at "));
        assert_eq!(events.submit_message(), Some("Thanks!"));
    }

    #[test]
    fn snapshot_has_no_side_effects() {
        let events = generator();
        let mut state = SessionState::fresh();
        state.set_text("Hi");
        let first = events.snapshot(&state);
        let second = events.snapshot(&state);
        assert_eq!(first, second);
        assert_eq!(events.autosave_status(), None);
    }
}
