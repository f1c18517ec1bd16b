use crate::types::*;
use axum::{
    Router,
    extract::{Json, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use praytell_chat::{
    ChatOrchestrator, ChatReply, ChatRequest, ContextRetrievalService, MessagePersistenceService,
};
use praytell_core::{AppConfig, Completion, ContextStore, Error, format_instant};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub persistence: Arc<MessagePersistenceService>,
    pub similar: Arc<ContextRetrievalService>,
    pub similar_limit: usize,
    pub request_timeout: Duration,
}

impl AppState {
    /// Wire the services onto one store and one completion engine
    pub fn from_config(
        config: &AppConfig,
        store: Arc<dyn ContextStore>,
        completion: Arc<dyn Completion>,
    ) -> praytell_core::Result<Self> {
        let chat_category = config.store.chat_category.clone();
        chat_category.require_turn_fields()?;

        let orchestrator = ChatOrchestrator::builder()
            .retrieval(ContextRetrievalService::new(store.clone(), chat_category.clone()))
            .completion(completion)
            .context_limit(config.chat.context_limit)
            .max_tokens(config.model.max_tokens)
            .build()?;

        if config.chat.similar_limit == 0 {
            return Err(Error::config_error("Similar-messages limit must be at least 1"));
        }

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            persistence: Arc::new(MessagePersistenceService::new(store.clone(), chat_category)),
            similar: Arc::new(ContextRetrievalService::new(
                store,
                config.store.similar_category.clone(),
            )),
            similar_limit: config.chat.similar_limit,
            request_timeout: config.server.request_timeout(),
        })
    }
}

pub fn create_router(state: AppState) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .layer(TimeoutLayer::new(state.request_timeout));

    Router::new()
        // Health check endpoints
        .route("/health", get(health_check))
        .route("/readiness", get(readiness_check))
        // Chat endpoints
        .route("/chat", post(chat))
        .route("/save-message", post(save_message))
        .route("/similar-messages", post(similar_messages))
        .layer(middleware)
        .with_state(state)
}

/// Health check endpoint - returns OK if the service is running
async fn health_check() -> impl IntoResponse {
    tracing::debug!("Health check requested");
    (StatusCode::OK, "OK")
}

/// Readiness check endpoint. The store and completion clients are built at
/// startup, so a running router is ready.
async fn readiness_check(State(_state): State<AppState>) -> impl IntoResponse {
    tracing::debug!("Readiness check requested");
    (StatusCode::OK, "READY")
}

async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatBody>, JsonRejection>,
) -> Result<Json<ChatReply>, AppError> {
    let Json(body) = payload?;
    let datetime = normalize_datetime(&body.datetime);

    let request = ChatRequest::with_datetime(body.message, body.location, datetime);
    let reply = state
        .orchestrator
        .respond(&request)
        .await
        .map_err(|e| AppError::internal(e, "Failed to get AI response"))?;

    Ok(Json(reply))
}

async fn save_message(
    State(state): State<AppState>,
    payload: Result<Json<SaveMessageBody>, JsonRejection>,
) -> Result<Json<SaveMessageResponse>, AppError> {
    let Json(body) = payload?;

    match state.persistence.save(body.into()).await {
        Ok(saved) => Ok(Json(SaveMessageResponse {
            success: true,
            id: saved.id,
        })),
        Err(Error::Validation(message)) => Err(AppError::bad_request(message)),
        Err(e) => Err(AppError::internal(e, "Failed to save message")),
    }
}

async fn similar_messages(
    State(state): State<AppState>,
    payload: Result<Json<SimilarBody>, JsonRejection>,
) -> Result<Json<SimilarResponse>, AppError> {
    let Json(body) = payload?;

    let similar = state
        .similar
        .similar(&body.message, state.similar_limit)
        .await
        .map_err(|e| AppError::internal(e, "Failed to find similar messages"))?;

    Ok(Json(SimilarResponse { similar }))
}

/// RFC 3339 input is rewritten as a UTC instant; anything else is kept as
/// the client sent it
fn normalize_datetime(value: &str) -> String {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => format_instant(&dt.with_timezone(&Utc)),
        Err(_) => {
            tracing::debug!(datetime = %value, "Datetime is not RFC 3339, passing it through");
            value.to_string()
        }
    }
}

// Error handling
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    /// Log the cause and answer with a generic message
    pub fn internal(cause: Error, message: &str) -> Self {
        tracing::error!(error = %cause, "{}", message);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: message.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::bad_request(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            error: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
