//! Client-side conversation state
//!
//! A [`ConversationManager`] owns one ordered list of turns and runs at most
//! one submit cycle at a time. Every user and assistant turn is handed to a
//! background worker that persists turns one by one in append order. A cycle
//! waits only until the save of its user turn has been issued, never for it
//! to finish.

use crate::orchestrator::{ChatOrchestrator, ChatReply, ChatRequest};
use crate::persistence::{MessagePersistenceService, SaveRequest, SavedMessage};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use praytell_core::{ContextRecord, Error, Result, Turn};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::future::{Future, poll_fn};
use std::sync::{Arc, Mutex, RwLock};
use std::task::Poll;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Notice shown when a cycle fails
pub const ERROR_NOTICE: &str = "Sorry, there was an error processing your message. Please try again.";

/// Produces the reply for one user message
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn dispatch(&self, request: ChatRequest) -> Result<ChatReply>;
}

/// Durably records one conversation turn
#[async_trait]
pub trait TurnPersister: Send + Sync {
    async fn persist(&self, request: SaveRequest) -> Result<SavedMessage>;
}

#[async_trait]
impl ChatBackend for ChatOrchestrator {
    async fn dispatch(&self, request: ChatRequest) -> Result<ChatReply> {
        self.respond(&request).await
    }
}

#[async_trait]
impl TurnPersister for MessagePersistenceService {
    async fn persist(&self, request: SaveRequest) -> Result<SavedMessage> {
        self.save(request).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Pending,
}

/// How a submit cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The assistant turn (and any context summary) was appended
    Replied(ChatReply),
    /// The backend failed and the error notice was appended
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistenceStats {
    pub persisted: u64,
    pub failed: u64,
}

enum PersistJob {
    Turn {
        index: usize,
        request: SaveRequest,
        issued: oneshot::Sender<()>,
    },
    Flush(oneshot::Sender<()>),
}

#[derive(Default)]
struct Shared {
    turns: RwLock<Vec<Turn>>,
    persisted: AtomicU64,
    failed: AtomicU64,
}

impl Shared {
    fn assign_id(&self, index: usize, id: String) {
        let mut turns = match self.turns.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(turn) = turns.get_mut(index) {
            turn.id = Some(id);
        }
    }
}

/// Resets the phase to `Idle` however the cycle ends
struct PendingGuard<'a>(&'a AtomicBool);

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct ConversationManager {
    backend: Arc<dyn ChatBackend>,
    location: String,
    dispatch_delay: Duration,
    pending: AtomicBool,
    last_timestamp: Mutex<Option<DateTime<Utc>>>,
    shared: Arc<Shared>,
    jobs: mpsc::UnboundedSender<PersistJob>,
    worker: JoinHandle<()>,
}

impl ConversationManager {
    /// Create a manager for one conversation at `location`.
    ///
    /// Spawns the persistence worker, so this must run inside a Tokio runtime.
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        persister: Arc<dyn TurnPersister>,
        location: impl Into<String>,
    ) -> Self {
        let shared = Arc::new(Shared::default());
        let (jobs, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_persistence(persister, shared.clone(), rx));

        Self {
            backend,
            location: location.into(),
            dispatch_delay: Duration::ZERO,
            pending: AtomicBool::new(false),
            last_timestamp: Mutex::new(None),
            shared,
            jobs,
            worker,
        }
    }

    /// Wait this long after a submit before dispatching it
    pub fn with_dispatch_delay(mut self, delay: Duration) -> Self {
        self.dispatch_delay = delay;
        self
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn phase(&self) -> Phase {
        if self.pending.load(Ordering::Acquire) {
            Phase::Pending
        } else {
            Phase::Idle
        }
    }

    /// Snapshot of the conversation, oldest turn first
    pub fn state(&self) -> Vec<Turn> {
        match self.shared.turns.read() {
            Ok(turns) => turns.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn persistence_stats(&self) -> PersistenceStats {
        PersistenceStats {
            persisted: self.shared.persisted.load(Ordering::Acquire),
            failed: self.shared.failed.load(Ordering::Acquire),
        }
    }

    /// Run one cycle for `text`.
    ///
    /// Blank text is a validation error and a submit while another cycle is
    /// in flight is [`Error::ConversationBusy`]; neither touches the state.
    /// A backend failure is not an error here: it ends the cycle with the
    /// error notice appended and is reported as [`CycleOutcome::Failed`].
    pub async fn submit(&self, text: &str) -> Result<CycleOutcome> {
        if text.trim().is_empty() {
            return Err(Error::validation("Message is empty"));
        }

        let _guard = self.begin()?;

        if !self.dispatch_delay.is_zero() {
            tokio::time::sleep(self.dispatch_delay).await;
        }

        let sent_at = self.next_timestamp();
        if let Some(issued) = self.append(Turn::user(text, &self.location, sent_at)) {
            // The user turn's save must be under way before the reply can land
            let _ = issued.await;
        }

        let request = ChatRequest::new(text, &self.location, sent_at);
        match self.backend.dispatch(request).await {
            Ok(reply) => {
                self.append(Turn::assistant(
                    &reply.reply,
                    &self.location,
                    self.next_timestamp(),
                ));
                if !reply.context.is_empty() {
                    self.append(Turn::system(
                        summarize_context(&reply.context),
                        &self.location,
                        self.next_timestamp(),
                    ));
                }
                Ok(CycleOutcome::Replied(reply))
            }
            Err(e) => {
                tracing::error!(error = %e, "Chat cycle failed");
                self.append(Turn::system(ERROR_NOTICE, &self.location, self.next_timestamp()));
                Ok(CycleOutcome::Failed(e.to_string()))
            }
        }
    }

    /// Wait until every persistence job queued so far has finished
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.jobs.send(PersistJob::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    /// Drain outstanding persistence and stop the worker
    pub async fn close(self) -> Result<()> {
        let Self { jobs, worker, .. } = self;
        drop(jobs);
        worker
            .await
            .map_err(|e| Error::Persistence(format!("Persistence worker failed: {e}")))
    }

    fn begin(&self) -> Result<PendingGuard<'_>> {
        self.pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| Error::ConversationBusy)?;
        Ok(PendingGuard(&self.pending))
    }

    /// Wall-clock time, never earlier than the previous turn's
    fn next_timestamp(&self) -> DateTime<Utc> {
        let mut last = match self.last_timestamp.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Utc::now();
        let at = match *last {
            Some(prev) if prev > now => prev,
            _ => now,
        };
        *last = Some(at);
        at
    }

    /// Push `turn` and queue it for persistence when its role is persisted.
    ///
    /// The returned receiver fires once the persister has been called.
    fn append(&self, turn: Turn) -> Option<oneshot::Receiver<()>> {
        let request = turn.role.is_persisted().then(|| SaveRequest::from_turn(&turn));

        let index = {
            let mut turns = match self.shared.turns.write() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            turns.push(turn);
            turns.len() - 1
        };

        let request = request?;
        let (issued, rx) = oneshot::channel();
        let job = PersistJob::Turn {
            index,
            request,
            issued,
        };
        if self.jobs.send(job).is_err() {
            self.shared.failed.fetch_add(1, Ordering::AcqRel);
            tracing::warn!("Persistence worker stopped, turn not saved");
            return None;
        }
        Some(rx)
    }
}

/// Transient system turn listing the records a reply was grounded on
pub fn summarize_context(records: &[ContextRecord]) -> String {
    let mut summary = String::from("Context used:");
    for record in records {
        let meta: Vec<&str> = [record.location.as_str(), record.timestamp.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect();
        if meta.is_empty() {
            summary.push_str(&format!("\n- {}", record.body));
        } else {
            summary.push_str(&format!("\n- {} ({})", record.body, meta.join(", ")));
        }
    }
    summary
}

async fn run_persistence(
    persister: Arc<dyn TurnPersister>,
    shared: Arc<Shared>,
    mut jobs: mpsc::UnboundedReceiver<PersistJob>,
) {
    while let Some(job) = jobs.recv().await {
        match job {
            PersistJob::Turn {
                index,
                request,
                issued,
            } => {
                let role = request.role.clone();
                let mut call = persister.persist(request);
                // Poll once so the call has started before the cycle resumes
                let first = poll_fn(|cx| Poll::Ready(call.as_mut().poll(cx))).await;
                let _ = issued.send(());
                let result = match first {
                    Poll::Ready(result) => result,
                    Poll::Pending => call.await,
                };
                match result {
                    Ok(saved) => {
                        tracing::debug!(role = %role, id = %saved.id, "Turn persisted");
                        shared.assign_id(index, saved.id);
                        shared.persisted.fetch_add(1, Ordering::AcqRel);
                    }
                    Err(e) => {
                        tracing::warn!(role = %role, error = %e, "Failed to persist turn");
                        shared.failed.fetch_add(1, Ordering::AcqRel);
                    }
                }
            }
            PersistJob::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}
