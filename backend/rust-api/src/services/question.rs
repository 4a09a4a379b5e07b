use tracing::{debug, info, warn};

use super::autosave::{AutoSaveScheduler, SaveTrigger, TimerQueue};
use super::event_generator::{self, EventGenerator, StatementDispatcher};
use crate::models::params::WidgetParams;
use crate::models::persisted::{load_previous_state, PreviousState};
use crate::models::session::{SessionState, SubmitTransition, TimerId};
use crate::models::statement::XapiData;
use crate::models::view::{ButtonVisibility, CriterionView, QuestionView, RubricView};
use crate::models::SubmitOutcome;
use crate::utils::title::{create_title, MAX_TITLE_LENGTH};

/// One long-text question: session state, autosave and statement generation
/// wired to the host's dispatcher and timers.
///
/// Every method is a plain synchronous call; out-of-order calls are absorbed
/// as no-ops so the host never has to handle an error.
pub struct LongTextQuestion<D, T> {
    params: WidgetParams,
    state: SessionState,
    autosave: AutoSaveScheduler,
    events: EventGenerator,
    dispatcher: D,
    timers: T,
}

impl<D, T> LongTextQuestion<D, T>
where
    D: StatementDispatcher,
    T: TimerQueue,
{
    pub fn new(
        params: WidgetParams,
        activity_id: Option<String>,
        previous: Option<PreviousState>,
        dispatcher: D,
        timers: T,
    ) -> Self {
        let previous = load_previous_state(previous);
        if let Some(previous) = &previous {
            debug!(
                submitted = previous.was_submitted,
                chars = previous.answer_text.chars().count(),
                "Restoring previous answer"
            );
        }

        let events = EventGenerator::new(
            activity_id,
            &params.prompt_text,
            params.submit_save.submit_confirmation_text.clone(),
        );

        Self {
            autosave: AutoSaveScheduler::new(params.auto_save_mode()),
            state: SessionState::from_previous(previous),
            events,
            params,
            dispatcher,
            timers,
        }
    }

    pub fn show_question(&mut self) {
        self.state.show_question();
    }

    pub fn show_answer(&mut self) {
        self.state.show_answer();
    }

    /// The learner changed the editor contents.
    pub fn edit(&mut self, text: impl Into<String>) {
        if !self.state.set_text(text) {
            debug!("Ignoring edit of a submitted answer");
            return;
        }
        self.autosave.on_edit(&mut self.state, &mut self.timers);
    }

    /// The editor lost focus.
    pub fn blur(&mut self) {
        if let Some(trigger) = self.autosave.on_blur(&mut self.state, &mut self.timers) {
            self.save(trigger);
        }
    }

    pub fn timer_fired(&mut self, id: TimerId) {
        if let Some(trigger) = self.autosave.on_timer_fired(&mut self.state, id) {
            self.save(trigger);
        }
    }

    pub fn submit(&mut self) -> SubmitOutcome {
        if !self.params.submit_save.show_submit {
            warn!("Submit requested but submitting is disabled for this question");
            return SubmitOutcome::SubmitDisabled;
        }

        match self.state.mark_submitted() {
            SubmitTransition::Submitted { cancelled_timer } => {
                if let Some(id) = cancelled_timer {
                    self.timers.cancel(id);
                    debug!(timer = %id, "Autosave timer cancelled by submission");
                }
                self.events.answer(&self.state, &mut self.dispatcher);
                info!(
                    chars = self.state.current_text().chars().count(),
                    "Answer submitted"
                );
                SubmitOutcome::Submitted
            }
            SubmitTransition::AlreadySubmitted => {
                warn!("Submit requested for an answer that is already submitted");
                SubmitOutcome::AlreadySubmitted
            }
        }
    }

    fn save(&mut self, trigger: SaveTrigger) {
        if self.state.is_submitted() {
            return;
        }
        self.events.respond(&self.state, &mut self.dispatcher);
        self.state.mark_saved();
        info!(
            trigger = trigger.as_str(),
            chars = self.state.current_text().chars().count(),
            "Draft saved"
        );
    }
}

impl<D, T> LongTextQuestion<D, T> {
    /// Snapshot for report renderers; never dispatches.
    pub fn get_xapi_data(&self) -> XapiData {
        XapiData {
            statement: self.events.snapshot(&self.state),
        }
    }

    pub fn answer_given(&self) -> bool {
        event_generator::answer_given(&self.state)
    }

    pub fn title(&self) -> String {
        create_title(&self.params.prompt_text, MAX_TITLE_LENGTH)
    }

    /// Value for the host's storage channel.
    pub fn persisted_state(&self) -> String {
        self.state.encoded_response()
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn params(&self) -> &WidgetParams {
        &self.params
    }

    pub fn autosave_status(&self) -> Option<&str> {
        self.events.autosave_status()
    }

    pub fn submit_message(&self) -> Option<&str> {
        self.events.submit_message()
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn timers(&self) -> &T {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut T {
        &mut self.timers
    }

    pub fn view(&self) -> QuestionView {
        let submit_available = self.params.submit_save.show_submit && !self.state.is_submitted();
        let rubric = self.params.visible_rubric().map(|rubric| RubricView {
            label: rubric.label.clone(),
            criteria: rubric
                .criteria
                .iter()
                .map(|criterion| CriterionView {
                    weight: format!("({})", criterion.weight_label),
                    text: criterion.text.clone(),
                })
                .collect(),
        });

        QuestionView {
            title: self.title(),
            prompt_text: self.params.prompt_text.clone(),
            view_mode: self.state.view_mode(),
            submission: self.state.submission_status(),
            current_text: self.state.current_text().to_string(),
            editor_enabled: !self.state.is_submitted(),
            placeholder: self.params.input.placeholder.clone(),
            visible_lines: self.params.input.visible_lines,
            buttons: ButtonVisibility::for_state(self.state.view_mode(), submit_available),
            autosave_status: self.events.autosave_status().map(str::to_string),
            submit_message: self.events.submit_message().map(str::to_string),
            rubric,
        }
    }
}
