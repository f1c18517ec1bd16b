//! Shared test doubles for the chat services
//!
//! Used by the unit tests in this crate and by the workspace integration
//! tests, so every layer is exercised against the same fakes.

use async_trait::async_trait;
use praytell_core::{
    Completion, CompletionRequest, ContextStore, Error, NearTextQuery, NewRecord, RecordFields,
    Result,
};
use serde_json::json;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A search hit in the chat-turn category's field shape
pub fn chat_hit(body: &str, location: &str, datetime: &str) -> RecordFields {
    let mut fields = RecordFields::new();
    fields.insert("body".to_string(), json!(body));
    fields.insert("location".to_string(), json!(location));
    fields.insert("datetime".to_string(), json!(datetime));
    fields
}

/// Context store returning canned hits and recording every call
#[derive(Default)]
pub struct StubStore {
    hits: Vec<RecordFields>,
    honour_limit: bool,
    fail: bool,
    next_id: AtomicUsize,
    inserts: Mutex<Vec<NewRecord>>,
    queries: Mutex<Vec<NearTextQuery>>,
}

impl StubStore {
    pub fn new() -> Self {
        Self::with_hits(Vec::new())
    }

    /// Every search returns these hits, cut to the requested limit
    pub fn with_hits(hits: Vec<RecordFields>) -> Self {
        Self {
            hits,
            honour_limit: true,
            ..Self::default()
        }
    }

    /// Every call fails with a store error
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    /// Return every canned hit regardless of the requested limit
    pub fn ignoring_limit(mut self) -> Self {
        self.honour_limit = false;
        self
    }

    pub fn inserts(&self) -> Vec<NewRecord> {
        self.inserts.lock().unwrap().clone()
    }

    pub fn queries(&self) -> Vec<NearTextQuery> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ContextStore for StubStore {
    fn name(&self) -> &str {
        "stub"
    }

    async fn insert(&self, record: NewRecord) -> Result<String> {
        if self.fail {
            return Err(Error::store("connection refused"));
        }
        self.inserts.lock().unwrap().push(record);
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(format!("00000000-0000-0000-0000-{n:012}"))
    }

    async fn nearest_text(&self, query: NearTextQuery) -> Result<Vec<RecordFields>> {
        let limit = query.limit;
        self.queries.lock().unwrap().push(query);
        if self.fail {
            return Err(Error::store("connection refused"));
        }
        let take = if self.honour_limit { limit } else { usize::MAX };
        Ok(self.hits.iter().take(take).cloned().collect())
    }
}

/// Completion engine answering every request with the same text
pub struct StaticCompletion {
    reply: String,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl StaticCompletion {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Completion for StaticCompletion {
    fn name(&self) -> &str {
        "static"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.requests.lock().unwrap().push(request);
        Ok(self.reply.clone())
    }
}

/// Completion engine that always answers with a non-success status
pub struct FailingCompletion {
    status: u16,
}

impl FailingCompletion {
    pub fn new(status: u16) -> Self {
        Self { status }
    }
}

impl Default for FailingCompletion {
    fn default() -> Self {
        Self::new(503)
    }
}

#[async_trait]
impl Completion for FailingCompletion {
    fn name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: CompletionRequest) -> Result<String> {
        Err(Error::completion_status(self.status, "service unavailable"))
    }
}
