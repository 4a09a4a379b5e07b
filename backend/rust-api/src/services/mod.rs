use crate::config::Config;
use crate::metrics::{track_store_operation, SESSIONS_ACTIVE, SESSIONS_TOTAL};
use crate::models::params::WidgetParams;
use crate::models::persisted::PreviousState;
use crate::models::StateKey;
use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use uuid::Uuid;

use self::driver::{DeadlineTimer, SessionDriver, SessionHandle};
use self::question::LongTextQuestion;
use self::state_store::{InMemoryStateStore, StateStore};

/// Idle sessions are looked for at this cadence, or more often for short
/// idle limits.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct SessionEntry {
    handle: SessionHandle,
    last_seen: Instant,
}

pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn StateStore>,
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_store(config, Arc::new(InMemoryStateStore::new()))
    }

    pub fn with_store(config: Config, store: Arc<dyn StateStore>) -> Self {
        Self {
            config,
            store,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Start a session, resuming from the store unless the caller supplied a
    /// previous state explicitly.
    pub async fn open_session(
        &self,
        key: StateKey,
        params: WidgetParams,
        previous: Option<PreviousState>,
    ) -> Result<(Uuid, SessionHandle)> {
        let previous = match previous {
            Some(previous) => Some(previous),
            None => track_store_operation("load", self.store.load(&key))
                .await?
                .map(PreviousState::from),
        };

        let question = LongTextQuestion::new(
            params,
            Some(key.content_id.clone()),
            previous,
            Vec::new(),
            DeadlineTimer::default(),
        );
        let (handle, _task) = SessionDriver::spawn(question, self.store.clone(), key.clone());

        let session_id = Uuid::new_v4();
        self.sessions.write().await.insert(
            session_id,
            SessionEntry {
                handle: handle.clone(),
                last_seen: Instant::now(),
            },
        );

        SESSIONS_TOTAL.with_label_values(&["opened"]).inc();
        SESSIONS_ACTIVE.inc();
        tracing::info!(
            "Answer session opened: {} for user: {}, content: {}",
            session_id,
            key.user_id,
            key.content_id
        );

        Ok((session_id, handle))
    }

    /// Look up a session and mark it as in use.
    pub async fn session(&self, session_id: &Uuid) -> Option<SessionHandle> {
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(session_id)?;
        entry.last_seen = Instant::now();
        Some(entry.handle.clone())
    }

    /// Detach a session from the registry. The caller closes it.
    pub async fn remove_session(&self, session_id: &Uuid) -> Option<SessionHandle> {
        let entry = self.sessions.write().await.remove(session_id)?;
        SESSIONS_TOTAL.with_label_values(&["closed"]).inc();
        SESSIONS_ACTIVE.dec();
        Some(entry.handle)
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.config.session_idle_secs)
    }

    /// Persist and close every session idle for longer than the configured
    /// limit. Returns how many were closed.
    pub async fn evict_idle(&self) -> usize {
        let idle_timeout = self.idle_timeout();
        let now = Instant::now();

        let expired: Vec<(Uuid, SessionHandle)> = {
            let mut sessions = self.sessions.write().await;
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, entry)| now.duration_since(entry.last_seen) >= idle_timeout)
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| sessions.remove(&id).map(|entry| (id, entry.handle)))
                .collect()
        };

        for (session_id, handle) in &expired {
            SESSIONS_TOTAL.with_label_values(&["evicted"]).inc();
            SESSIONS_ACTIVE.dec();
            if handle.close().await.is_err() {
                tracing::warn!("Idle session already stopped: {}", session_id);
            } else {
                tracing::info!("Idle session closed: {}", session_id);
            }
        }
        expired.len()
    }

    /// Persist and close every open session, e.g. on shutdown.
    pub async fn close_all(&self) -> usize {
        let drained: Vec<(Uuid, SessionEntry)> = self.sessions.write().await.drain().collect();

        for (session_id, entry) in &drained {
            SESSIONS_TOTAL.with_label_values(&["closed"]).inc();
            SESSIONS_ACTIVE.dec();
            if let Err(err) = entry.handle.close().await {
                tracing::warn!("Failed to close session {}: {}", session_id, err);
            }
        }
        drained.len()
    }
}

/// Background loop closing sessions whose clients went away without
/// closing them.
pub fn spawn_idle_sweeper(state: Arc<AppState>) -> JoinHandle<()> {
    let interval = state
        .idle_timeout()
        .clamp(Duration::from_secs(1), MAX_SWEEP_INTERVAL);
    tracing::info!(
        "Starting idle session sweeper (interval {}s, idle limit {}s)",
        interval.as_secs(),
        state.config.session_idle_secs
    );

    tokio::spawn(async move {
        loop {
            sleep(interval).await;
            let evicted = state.evict_idle().await;
            if evicted > 0 {
                tracing::info!("Evicted {} idle sessions", evicted);
            }
        }
    })
}

pub mod autosave;
pub mod driver;
pub mod event_generator;
pub mod question;
pub mod state_store;

#[cfg(test)]
pub(crate) mod testing;
