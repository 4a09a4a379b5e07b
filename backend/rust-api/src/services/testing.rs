//! Deterministic collaborators for unit tests.

use std::collections::BTreeMap;
use std::time::Duration;

use super::autosave::TimerQueue;
use crate::models::session::TimerId;

/// Virtual-clock timer queue; time only moves through [`ManualTimers::advance`].
#[derive(Debug, Default)]
pub(crate) struct ManualTimers {
    now: Duration,
    next_id: u64,
    due: BTreeMap<TimerId, Duration>,
    cancelled: Vec<TimerId>,
}

impl ManualTimers {
    pub(crate) fn now(&self) -> Duration {
        self.now
    }

    pub(crate) fn live(&self) -> usize {
        self.due.len()
    }

    pub(crate) fn live_ids(&self) -> Vec<TimerId> {
        self.due.keys().copied().collect()
    }

    pub(crate) fn cancelled(&self) -> &[TimerId] {
        &self.cancelled
    }

    /// Move the clock forward and return the timers that came due, in order.
    pub(crate) fn advance(&mut self, by: Duration) -> Vec<TimerId> {
        self.now += by;
        let mut fired: Vec<(Duration, TimerId)> = self
            .due
            .iter()
            .filter(|(_, at)| **at <= self.now)
            .map(|(id, at)| (*at, *id))
            .collect();
        fired.sort();
        for (_, id) in &fired {
            self.due.remove(id);
        }
        fired.into_iter().map(|(_, id)| id).collect()
    }
}

impl TimerQueue for ManualTimers {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.due.insert(id, self.now.saturating_add(delay));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        if self.due.remove(&id).is_some() {
            self.cancelled.push(id);
        }
    }
}
