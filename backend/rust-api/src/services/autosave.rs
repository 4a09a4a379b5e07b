use std::time::Duration;
use tracing::debug;

use crate::metrics::AUTOSAVE_TIMERS_TOTAL;
use crate::models::params::AutoSaveMode;
use crate::models::session::{SessionState, TimerId};

/// Host-provided fire-once timers.
///
/// A fired timer is reported back through
/// [`AutoSaveScheduler::on_timer_fired`]; cancelling an already fired or
/// unknown id must be harmless.
pub trait TimerQueue {
    fn schedule(&mut self, delay: Duration) -> TimerId;
    fn cancel(&mut self, id: TimerId);
}

/// Why a save is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    Debounce,
    Blur,
}

impl SaveTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveTrigger::Debounce => "debounce",
            SaveTrigger::Blur => "blur",
        }
    }
}

/// Decides when edits turn into saves.
///
/// The scheduler owns no state of its own: the single pending timer lives in
/// [`SessionState`], so a submitted session can never hold one.
#[derive(Debug, Clone, Copy)]
pub struct AutoSaveScheduler {
    mode: AutoSaveMode,
}

impl AutoSaveScheduler {
    pub fn new(mode: AutoSaveMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> AutoSaveMode {
        self.mode
    }

    /// Restart the debounce window after an edit.
    pub fn on_edit<T>(&self, state: &mut SessionState, timers: &mut T)
    where
        T: TimerQueue + ?Sized,
    {
        let AutoSaveMode::Debounced(delay) = self.mode else {
            return;
        };
        if state.is_submitted() {
            return;
        }

        self.cancel_pending(state, timers);
        let id = timers.schedule(delay);
        state.arm_timer(id);
        AUTOSAVE_TIMERS_TOTAL.with_label_values(&["armed"]).inc();
        debug!(timer = %id, delay_secs = delay.as_secs(), "Autosave timer armed");
    }

    /// Flush on focus loss. Returns the trigger when a save is due now.
    pub fn on_blur<T>(&self, state: &mut SessionState, timers: &mut T) -> Option<SaveTrigger>
    where
        T: TimerQueue + ?Sized,
    {
        if self.mode == AutoSaveMode::Disabled || state.is_submitted() {
            return None;
        }

        self.cancel_pending(state, timers);
        state.has_unsaved_changes().then_some(SaveTrigger::Blur)
    }

    /// A timer fired. Stale ids (cancelled or replaced) are ignored.
    pub fn on_timer_fired(&self, state: &mut SessionState, id: TimerId) -> Option<SaveTrigger> {
        if state.pending_timer() != Some(id) {
            debug!(timer = %id, "Ignoring stale autosave timer");
            return None;
        }

        state.take_pending_timer();
        AUTOSAVE_TIMERS_TOTAL.with_label_values(&["fired"]).inc();

        if state.has_unsaved_changes() {
            Some(SaveTrigger::Debounce)
        } else {
            debug!(timer = %id, "Autosave timer expired without changes");
            None
        }
    }

    pub fn cancel_pending<T>(&self, state: &mut SessionState, timers: &mut T)
    where
        T: TimerQueue + ?Sized,
    {
        if let Some(previous) = state.take_pending_timer() {
            timers.cancel(previous);
            AUTOSAVE_TIMERS_TOTAL.with_label_values(&["cancelled"]).inc();
            debug!(timer = %previous, "Autosave timer cancelled");
        }
    }
}
