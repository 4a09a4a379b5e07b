//! Event loop for one answer session.
//!
//! A single task owns the [`LongTextQuestion`]; edits, blurs, clicks and the
//! debounce deadline are all handled on that task, one at a time.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use super::autosave::TimerQueue;
use super::question::LongTextQuestion;
use super::state_store::StateStore;
use crate::metrics::track_store_operation;
use crate::models::session::TimerId;
use crate::models::statement::{Statement, XapiData};
use crate::models::view::QuestionView;
use crate::models::{PersistedStateResponse, StateKey, SubmitOutcome};

const COMMAND_BUFFER: usize = 64;
const STATEMENT_BUFFER: usize = 64;
/// Deadline used when the configured delay does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

pub type DrivenQuestion = LongTextQuestion<Vec<Statement>, DeadlineTimer>;

/// Timer queue backed by a single tokio deadline.
#[derive(Debug, Default)]
pub struct DeadlineTimer {
    next_id: u64,
    armed: Option<(TimerId, Instant)>,
}

impl DeadlineTimer {
    pub fn deadline(&self) -> Option<(TimerId, Instant)> {
        self.armed
    }

    fn expire(&mut self, id: TimerId) {
        if matches!(self.armed, Some((armed, _)) if armed == id) {
            self.armed = None;
        }
    }
}

impl TimerQueue for DeadlineTimer {
    fn schedule(&mut self, delay: Duration) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let now = Instant::now();
        let at = now
            .checked_add(delay)
            .unwrap_or_else(|| now + FAR_FUTURE);
        self.armed = Some((id, at));
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.expire(id);
    }
}

/// A statement the session dispatched and persisted.
#[derive(Debug, Clone)]
pub struct DispatchedStatement {
    pub statement: Statement,
    pub dispatched_at: Instant,
}

#[derive(Debug, Error)]
#[error("answer session is closed")]
pub struct SessionClosed;

enum Command {
    Edit(String, oneshot::Sender<QuestionView>),
    Blur(oneshot::Sender<QuestionView>),
    ShowQuestion(oneshot::Sender<QuestionView>),
    ShowAnswer(oneshot::Sender<QuestionView>),
    Submit(oneshot::Sender<(SubmitOutcome, QuestionView)>),
    View(oneshot::Sender<QuestionView>),
    XapiData(oneshot::Sender<XapiData>),
    PersistedState(oneshot::Sender<PersistedStateResponse>),
    Close(oneshot::Sender<String>),
}

/// Cloneable handle used by the host to talk to a running session.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    statements: broadcast::Sender<DispatchedStatement>,
}

impl SessionHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchedStatement> {
        self.statements.subscribe()
    }

    pub async fn edit(&self, text: impl Into<String>) -> Result<QuestionView, SessionClosed> {
        let text = text.into();
        self.request(|reply| Command::Edit(text, reply)).await
    }

    pub async fn blur(&self) -> Result<QuestionView, SessionClosed> {
        self.request(Command::Blur).await
    }

    pub async fn show_question(&self) -> Result<QuestionView, SessionClosed> {
        self.request(Command::ShowQuestion).await
    }

    pub async fn show_answer(&self) -> Result<QuestionView, SessionClosed> {
        self.request(Command::ShowAnswer).await
    }

    pub async fn submit(&self) -> Result<(SubmitOutcome, QuestionView), SessionClosed> {
        self.request(Command::Submit).await
    }

    pub async fn view(&self) -> Result<QuestionView, SessionClosed> {
        self.request(Command::View).await
    }

    pub async fn xapi_data(&self) -> Result<XapiData, SessionClosed> {
        self.request(Command::XapiData).await
    }

    pub async fn persisted_state(&self) -> Result<PersistedStateResponse, SessionClosed> {
        self.request(Command::PersistedState).await
    }

    /// Persist the current state and stop the session task.
    pub async fn close(&self) -> Result<String, SessionClosed> {
        self.request(Command::Close).await
    }

    async fn request<R>(
        &self,
        command: impl FnOnce(oneshot::Sender<R>) -> Command,
    ) -> Result<R, SessionClosed> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| SessionClosed)?;
        response.await.map_err(|_| SessionClosed)
    }
}

pub struct SessionDriver {
    question: DrivenQuestion,
    commands: mpsc::Receiver<Command>,
    statements: broadcast::Sender<DispatchedStatement>,
    store: Arc<dyn StateStore>,
    key: StateKey,
}

impl SessionDriver {
    pub fn spawn(
        question: DrivenQuestion,
        store: Arc<dyn StateStore>,
        key: StateKey,
    ) -> (SessionHandle, JoinHandle<()>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (statement_tx, _) = broadcast::channel(STATEMENT_BUFFER);

        let driver = SessionDriver {
            question,
            commands: command_rx,
            statements: statement_tx.clone(),
            store,
            key,
        };
        let task = tokio::spawn(driver.run());

        let handle = SessionHandle {
            commands: command_tx,
            statements: statement_tx,
        };
        (handle, task)
    }

    pub async fn run(mut self) {
        debug!(
            user_id = %self.key.user_id,
            content_id = %self.key.content_id,
            "Answer session started"
        );

        loop {
            let deadline = self.question.timers().deadline();
            let wake_at = deadline.map(|(_, at)| at).unwrap_or_else(Instant::now);

            let flow = tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command).await,
                    None => {
                        self.persist_current().await;
                        ControlFlow::Break(())
                    }
                },
                _ = sleep_until(wake_at), if deadline.is_some() => {
                    if let Some((id, _)) = deadline {
                        self.question.timers_mut().expire(id);
                        self.question.timer_fired(id);
                    }
                    ControlFlow::Continue(())
                }
            };

            self.flush().await;
            if flow.is_break() {
                break;
            }
        }

        info!(
            user_id = %self.key.user_id,
            content_id = %self.key.content_id,
            "Answer session closed"
        );
    }

    async fn handle(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Edit(text, reply) => {
                self.question.edit(text);
                let _ = reply.send(self.question.view());
            }
            Command::Blur(reply) => {
                self.question.blur();
                self.flush().await;
                let _ = reply.send(self.question.view());
            }
            Command::ShowQuestion(reply) => {
                self.question.show_question();
                let _ = reply.send(self.question.view());
            }
            Command::ShowAnswer(reply) => {
                self.question.show_answer();
                let _ = reply.send(self.question.view());
            }
            Command::Submit(reply) => {
                let outcome = self.question.submit();
                self.flush().await;
                let _ = reply.send((outcome, self.question.view()));
            }
            Command::View(reply) => {
                let _ = reply.send(self.question.view());
            }
            Command::XapiData(reply) => {
                let _ = reply.send(self.question.get_xapi_data());
            }
            Command::PersistedState(reply) => {
                let _ = reply.send(PersistedStateResponse {
                    state: self.question.persisted_state(),
                    submission: self.question.state().submission_status(),
                    answer_given: self.question.answer_given(),
                });
            }
            Command::Close(reply) => {
                self.flush().await;
                let state = self.persist_current().await;
                let _ = reply.send(state);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Persist and broadcast everything dispatched since the last flush.
    async fn flush(&mut self) {
        let pending: Vec<Statement> = self.question.dispatcher_mut().drain(..).collect();
        for statement in pending {
            self.save(statement.response()).await;
            let _ = self.statements.send(DispatchedStatement {
                statement,
                dispatched_at: Instant::now(),
            });
        }
    }

    async fn persist_current(&self) -> String {
        let state = self.question.persisted_state();
        self.save(&state).await;
        state
    }

    async fn save(&self, state: &str) {
        let result = track_store_operation("save", self.store.save(&self.key, state)).await;
        if let Err(err) = result {
            warn!(
                error = %err,
                user_id = %self.key.user_id,
                content_id = %self.key.content_id,
                "Failed to persist answer state"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::params::WidgetParams;
    use crate::models::statement::Verb;
    use crate::services::state_store::InMemoryStateStore;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::time::{advance, sleep};

    fn spawn_question(auto_save: i64) -> (SessionHandle, Arc<InMemoryStateStore>, StateKey) {
        let mut params = WidgetParams::default();
        params.submit_save.auto_save_delay_seconds = auto_save;
        params.submit_save.show_submit = true;
        let question =
            LongTextQuestion::new(params, None, None, Vec::new(), DeadlineTimer::default());
        let store = Arc::new(InMemoryStateStore::new());
        let key = StateKey {
            user_id: "learner".into(),
            content_id: "q1".into(),
        };
        let (handle, _task) = SessionDriver::spawn(question, store.clone(), key.clone());
        (handle, store, key)
    }

    #[test]
    fn deadline_timer_holds_one_deadline() {
        tokio_test::block_on(async {
            let mut timers = DeadlineTimer::default();
            let first = timers.schedule(Duration::from_secs(1));
            let second = timers.schedule(Duration::from_secs(2));
            assert_eq!(timers.deadline().map(|(id, _)| id), Some(second));

            timers.cancel(first);
            assert!(timers.deadline().is_some());
            timers.cancel(second);
            assert!(timers.deadline().is_none());
        });
    }

    #[test]
    fn oversized_delay_is_capped() {
        tokio_test::block_on(async {
            let mut timers = DeadlineTimer::default();
            let id = timers.schedule(Duration::from_secs(i64::MAX as u64));
            let (armed, at) = timers.deadline().unwrap();
            assert_eq!(armed, id);
            assert!(at > Instant::now() + Duration::from_secs(86_400));
        });
    }

    #[tokio::test(start_paused = true)]
    async fn huge_autosave_delay_keeps_session_alive() {
        let (handle, store, key) = spawn_question(i64::MAX);

        let view = handle.edit("hello").await.unwrap();
        assert_eq!(view.current_text, "hello");
        sleep(Duration::from_secs(3600)).await;

        let view = handle.blur().await.unwrap();
        assert!(view.autosave_status.is_some());
        assert_eq!(store.load(&key).await.unwrap().as_deref(), Some("hello"));
    }

    #[tokio::test(start_paused = true)]
    async fn debounced_save_fires_once_after_quiet_period() {
        let (handle, store, key) = spawn_question(2);
        let mut statements = handle.subscribe();
        let start = Instant::now();

        handle.edit("a").await.unwrap();
        advance(Duration::from_millis(500)).await;
        handle.edit("ab").await.unwrap();
        advance(Duration::from_millis(500)).await;
        handle.edit("abc").await.unwrap();

        sleep(Duration::from_millis(1900)).await;
        assert!(matches!(statements.try_recv(), Err(TryRecvError::Empty)));

        sleep(Duration::from_millis(200)).await;
        let saved = statements.try_recv().unwrap();
        assert_eq!(saved.statement.verb, Verb::Responded);
        assert_eq!(saved.statement.response(), "abc");
        let elapsed = saved.dispatched_at - start;
        assert!(elapsed >= Duration::from_secs(3));
        assert!(elapsed < Duration::from_millis(3050));

        sleep(Duration::from_secs(10)).await;
        assert!(matches!(statements.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(store.load(&key).await.unwrap().as_deref(), Some("abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn submit_cancels_pending_save() {
        let (handle, store, key) = spawn_question(2);
        let mut statements = handle.subscribe();

        handle.edit("done").await.unwrap();
        let (outcome, view) = handle.submit().await.unwrap();
        assert_eq!(outcome, SubmitOutcome::Submitted);
        assert!(!view.editor_enabled);

        let answered = statements.recv().await.unwrap();
        assert_eq!(answered.statement.verb, Verb::Answered);

        sleep(Duration::from_secs(5)).await;
        assert!(matches!(statements.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(
            store.load(&key).await.unwrap().as_deref(),
            Some("done{submitted}")
        );
    }

    #[tokio::test]
    async fn close_persists_and_stops() {
        let (handle, store, key) = spawn_question(-1);
        handle.edit("unsaved draft").await.unwrap();

        assert_eq!(handle.close().await.unwrap(), "unsaved draft");
        assert_eq!(
            store.load(&key).await.unwrap().as_deref(),
            Some("unsaved draft")
        );
        assert!(handle.view().await.is_err());
    }
}
