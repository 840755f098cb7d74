//! HTTP routes

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use shared_protocol::{
    DocumentResponse, DocumentSubmission, HandshakeRequest, HandshakeResponse, Identity,
    MessageResponse, MessageSubmission, PROTOCOL_VERSION, PublicKeyResponse,
    SessionStatusResponse,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::auth::AuthenticatedUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_CONVERSATION_LIMIT: usize = 50;
const MAX_CONVERSATION_LIMIT: usize = 100;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/pq/kem-public-key", get(public_key_handler))
        .route("/pq/handshake", post(handshake_handler))
        .route("/pq/session", get(session_handler))
        .route("/pq/logout", post(logout_handler))
        .route("/messages", post(send_message_handler).get(conversation_handler))
        .route("/documents", post(create_document_handler).get(list_documents_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint
async fn health_handler() -> &'static str {
    "OK"
}

/// Stats endpoint
async fn stats_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "protocol_version": PROTOCOL_VERSION,
        "algorithm": state.handshake.public_key_response().algorithm,
        "plaintext_policy": state.adapter.policy().as_str(),
        "sessions": state.store.len(),
        "messages": state.records.message_count(),
        "documents": state.records.document_count(),
    }))
}

/// Server KEM public key; the key is not secret, so no authentication
async fn public_key_handler(State(state): State<AppState>) -> Json<PublicKeyResponse> {
    Json(state.handshake.public_key_response())
}

async fn handshake_handler(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Json(request): Json<HandshakeRequest>,
) -> ApiResult<Json<HandshakeResponse>> {
    let response = state.handshake.handshake(&identity, &request)?;
    Ok(Json(response))
}

async fn session_handler(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
) -> Json<SessionStatusResponse> {
    Json(state.handshake.session_status(&identity))
}

async fn logout_handler(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
) -> StatusCode {
    state.handshake.logout(&identity);
    StatusCode::NO_CONTENT
}

async fn send_message_handler(
    State(state): State<AppState>,
    AuthenticatedUser(sender): AuthenticatedUser,
    Json(submission): Json<MessageSubmission>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    if submission.recipient_id == sender {
        return Err(ApiError::BadRequest(
            "Cannot send message to yourself".to_string(),
        ));
    }

    let ingested = state.adapter.ingest(&sender, &submission.payload)?;
    let mut record =
        state
            .records
            .insert_message(sender.clone(), submission.recipient_id, ingested.plaintext);
    info!(
        "Stored message {} from {} ({:?})",
        record.id, sender, ingested.mode
    );

    record.content = state.adapter.egress(&sender, record.content);
    Ok((StatusCode::CREATED, Json(record)))
}

#[derive(Debug, Deserialize)]
struct ConversationQuery {
    with: String,
    limit: Option<usize>,
}

async fn conversation_handler(
    State(state): State<AppState>,
    AuthenticatedUser(identity): AuthenticatedUser,
    Query(query): Query<ConversationQuery>,
) -> ApiResult<Json<Vec<MessageResponse>>> {
    let other = Identity::new(query.with)?;
    let limit = query
        .limit
        .unwrap_or(DEFAULT_CONVERSATION_LIMIT)
        .clamp(1, MAX_CONVERSATION_LIMIT);

    let messages = state
        .records
        .conversation(&identity, &other, limit)
        .into_iter()
        .map(|mut m| {
            m.content = state.adapter.egress(&identity, m.content);
            m
        })
        .collect();
    Ok(Json(messages))
}

async fn create_document_handler(
    State(state): State<AppState>,
    AuthenticatedUser(owner): AuthenticatedUser,
    Json(submission): Json<DocumentSubmission>,
) -> ApiResult<(StatusCode, Json<DocumentResponse>)> {
    let title = submission.title.trim();
    if title.is_empty() {
        return Err(ApiError::BadRequest("Document title cannot be empty".to_string()));
    }

    let ingested = state.adapter.ingest(&owner, &submission.payload)?;
    let mut record = state
        .records
        .insert_document(owner.clone(), title.to_string(), ingested.plaintext);
    info!(
        "Stored document {} for {} ({:?})",
        record.id, owner, ingested.mode
    );

    record.content = state.adapter.egress(&owner, record.content);
    Ok((StatusCode::CREATED, Json(record)))
}

async fn list_documents_handler(
    State(state): State<AppState>,
    AuthenticatedUser(owner): AuthenticatedUser,
) -> Json<Vec<DocumentResponse>> {
    let documents = state
        .records
        .documents_for(&owner)
        .into_iter()
        .map(|mut d| {
            d.content = state.adapter.egress(&owner, d.content);
            d
        })
        .collect();
    Json(documents)
}
