use crate::config::SearchConfig;
use crate::error::{log_error, AppError, Result};
use crate::models::{SearchSession, SessionStatus};
use crate::stream::decoder::FrameDecoder;
use crate::stream::events::StreamEvent;
use crate::stream::reducer::{apply, AggregateState};
use bytes::Bytes;
use futures::stream::{Stream, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::ReceiverStream;

// ============================================================================
// Cancellation Token
// ============================================================================

#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    cancelled: Arc<RwLock<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Safe to call any number of times.
    pub async fn cancel(&self) {
        let mut cancelled = self.cancelled.write().await;
        *cancelled = true;
    }

    pub async fn is_cancelled(&self) -> bool {
        *self.cancelled.read().await
    }

    pub async fn check(&self) -> Result<()> {
        if self.is_cancelled().await {
            Err(AppError::cancelled())
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// Session Updates
// ============================================================================

/// What the controller pushes to its consumer as the stream folds in.
#[derive(Debug, Clone)]
pub enum SessionUpdate {
    /// State after applying the latest chunk's events.
    Snapshot(AggregateState),
    /// Terminal: the stream ended and the state is frozen.
    Completed(AggregateState),
    /// Terminal: transport or backend failure.
    Failed(AppError),
    /// Terminal: cancelled locally or superseded by a newer search.
    Cancelled,
}

impl SessionUpdate {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionUpdate::Snapshot(_))
    }
}

#[derive(Debug, Serialize)]
struct StreamRequest<'a> {
    query: &'a str,
    states: &'a [String],
}

// ============================================================================
// Search Controller
// ============================================================================

/// Owns the one active search session.
///
/// Submitting a new search bumps the generation counter and cancels the
/// previous session's read loop; a superseded loop stops publishing as soon
/// as it observes that its generation is no longer current, so late chunks
/// from an old fetch can never reach a newer session's consumer. The reducer
/// state lives inside the read task and is mutated nowhere else.
pub struct SearchController {
    client: reqwest::Client,
    config: SearchConfig,
    generation: AtomicU64,
    active: RwLock<Option<ActiveSession>>,
}

struct ActiveSession {
    session: SearchSession,
    token: CancellationToken,
}

impl SearchController {
    pub fn new(config: SearchConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            client,
            config,
            generation: AtomicU64::new(0),
            active: RwLock::new(None),
        }
    }

    pub fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Snapshot of the active session record, if any.
    pub async fn current_session(&self) -> Option<SearchSession> {
        self.active.read().await.as_ref().map(|a| a.session.clone())
    }

    fn is_current(&self, generation: u64) -> bool {
        self.current_generation() == generation
    }

    /// Start a new session, superseding any in-flight one, and return the
    /// update channel for it.
    pub async fn search(
        self: &Arc<Self>,
        query: impl Into<String>,
        jurisdictions: &[String],
    ) -> Result<(SearchSession, mpsc::Receiver<SessionUpdate>)> {
        let query = query.into();
        if query.trim().is_empty() {
            return Err(AppError::invalid_query("query must not be empty"));
        }

        let codes = if jurisdictions.is_empty() {
            self.config.default_jurisdictions.clone()
        } else {
            jurisdictions.to_vec()
        };

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let session = SearchSession::new(generation, query.clone(), codes.clone());
        let token = CancellationToken::new();

        // Supersede the previous session before its loop can publish again.
        {
            let mut active = self.active.write().await;
            if let Some(previous) = active.take() {
                log::info!(
                    "superseding session {} (generation {})",
                    previous.session.id,
                    previous.session.generation
                );
                previous.token.cancel().await;
            }
            *active = Some(ActiveSession {
                session: session.clone(),
                token: token.clone(),
            });
        }

        log::info!(
            "session {} started (generation {}, {} jurisdictions)",
            session.id,
            generation,
            codes.len()
        );

        let (tx, rx) = mpsc::channel(64);
        let controller = Arc::clone(self);
        let loop_query = query;
        tokio::spawn(async move {
            let outcome = controller
                .run_read_loop(generation, &loop_query, &codes, &token, &tx)
                .await;
            match outcome {
                Ok(()) => {
                    controller
                        .mark_session(generation, SessionStatus::Done, None)
                        .await;
                }
                Err(err) => {
                    log_error(&err);
                    controller
                        .mark_session(
                            generation,
                            SessionStatus::Error,
                            Some(err.message.clone()),
                        )
                        .await;
                    let update = if err.is_cancelled() {
                        SessionUpdate::Cancelled
                    } else {
                        SessionUpdate::Failed(err)
                    };
                    if controller.is_current(generation) {
                        let _ = tx.send(update).await;
                    }
                }
            }
        });

        Ok((session, rx))
    }

    /// Update the active session record, but only if it still belongs to the
    /// given generation.
    async fn mark_session(&self, generation: u64, status: SessionStatus, message: Option<String>) {
        let mut active = self.active.write().await;
        if let Some(entry) = active.as_mut() {
            if entry.session.generation == generation {
                entry.session.status = status;
                entry.session.error_message = message;
            }
        }
    }

    /// Cancel the active session. Idempotent; a second call (or a call with
    /// no active session) is a no-op.
    pub async fn cancel(&self) {
        let mut active = self.active.write().await;
        if let Some(entry) = active.as_mut() {
            entry.token.cancel().await;
            entry.session.status = SessionStatus::Error;
            entry.session.error_message = Some("cancelled".to_string());
            log::info!("session {} cancelled", entry.session.id);
        }
    }

    async fn run_read_loop(
        &self,
        generation: u64,
        query: &str,
        codes: &[String],
        token: &CancellationToken,
        tx: &mpsc::Sender<SessionUpdate>,
    ) -> Result<()> {
        let response = self
            .client
            .post(self.config.stream_endpoint())
            .json(&StreamRequest { query, states: codes })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::backend(status.as_u16(), body));
        }
        self.mark_session(generation, SessionStatus::Streaming, None)
            .await;

        let mut decoder = FrameDecoder::new();
        let mut state = AggregateState::new(query);
        let mut stream = response.bytes_stream();

        // Awaiting the next chunk is the only suspension point; every event
        // decoded from a chunk is applied before the state is published.
        while let Some(chunk) = stream.next().await {
            token.check().await?;
            if !self.is_current(generation) {
                log::debug!("generation {} superseded, dropping chunk", generation);
                return Err(AppError::cancelled());
            }

            let chunk = chunk?;
            let events = decoder.feed(&chunk);
            let terminal = events.iter().any(StreamEvent::is_terminal);
            if !events.is_empty() {
                for event in events {
                    state = apply(state, event);
                }
                if self.is_current(generation) {
                    let _ = tx.send(SessionUpdate::Snapshot(state.clone())).await;
                }
            }
            if terminal {
                break;
            }
        }

        for event in decoder.finish() {
            state = apply(state, event);
        }

        token.check().await?;
        if self.is_current(generation) {
            log::info!("session generation {} completed ({})", generation, state.status);
            let _ = tx.send(SessionUpdate::Completed(state)).await;
            Ok(())
        } else {
            Err(AppError::cancelled())
        }
    }
}

// ============================================================================
// Stream Adapters
// ============================================================================

/// Decode a raw byte stream into events, dropping malformed frames and
/// surfacing transport errors. Generic over the chunk error so tests can
/// drive it without a live socket.
pub fn event_stream<S, E>(bytes: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<Bytes, E>>,
    AppError: From<E>,
{
    async_stream::stream! {
        let mut decoder = FrameDecoder::new();
        futures::pin_mut!(bytes);
        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(chunk) => {
                    for event in decoder.feed(&chunk) {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(AppError::from(e));
                    return;
                }
            }
        }
        for event in decoder.finish() {
            yield Ok(event);
        }
    }
}

/// Consume session updates as a `futures::Stream` instead of a channel.
pub fn update_stream(rx: mpsc::Receiver<SessionUpdate>) -> impl Stream<Item = SessionUpdate> {
    ReceiverStream::new(rx)
}

// ============================================================================
// Tests
// ============================================================================
