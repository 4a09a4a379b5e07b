use axum::{
    extract::{Path, State},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse,
    },
};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};

use super::{questions::find_session, ApiError};
use crate::services::{driver::DispatchedStatement, AppState};

/// SSE feed of the statements a session dispatches
/// GET /api/v1/questions/{id}/statements
pub async fn statement_stream(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let handle = find_session(&state, &session_id).await?;
    tracing::info!("Client subscribed to statements: session={}", session_id);

    let stream = create_statement_stream(session_id, handle.subscribe());
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// Ends when the session task stops.
fn create_statement_stream(
    session_id: String,
    receiver: broadcast::Receiver<DispatchedStatement>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(
        (session_id, receiver),
        |(sid, mut receiver)| async move {
            loop {
                match receiver.recv().await {
                    Ok(dispatched) => {
                        let event = to_event(&dispatched);
                        return Some((Ok(event), (sid, receiver)));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(
                            "Statement subscriber lagged: session={}, skipped={}",
                            sid,
                            skipped
                        );
                    }
                    Err(RecvError::Closed) => {
                        tracing::info!("Statement stream ended: session={}", sid);
                        return None;
                    }
                }
            }
        },
    )
}

fn to_event(dispatched: &DispatchedStatement) -> Event {
    let data = serde_json::to_string(&dispatched.statement).unwrap_or_else(|_| "{}".to_string());
    Event::default()
        .event(dispatched.statement.verb.as_str())
        .data(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::statement::{InteractionDefinition, Statement, Verb};
    use futures::StreamExt;
    use tokio::time::Instant;

    fn dispatched(response: &str) -> DispatchedStatement {
        DispatchedStatement {
            statement: Statement::new(
                Verb::Responded,
                None,
                InteractionDefinition::long_fill_in("Prompt"),
                response.to_string(),
            ),
            dispatched_at: Instant::now(),
        }
    }

    #[tokio::test]
    async fn stream_yields_until_sender_dropped() {
        let (tx, rx) = broadcast::channel(4);
        let stream = create_statement_stream("s1".to_string(), rx);

        tx.send(dispatched("first")).unwrap();
        tx.send(dispatched("second")).unwrap();
        drop(tx);

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn lagged_subscriber_keeps_receiving() {
        let (tx, rx) = broadcast::channel(1);
        let stream = create_statement_stream("s1".to_string(), rx);

        tx.send(dispatched("dropped")).unwrap();
        tx.send(dispatched("kept")).unwrap();
        drop(tx);

        let events: Vec<_> = stream.collect().await;
        assert_eq!(events.len(), 1);
    }
}
