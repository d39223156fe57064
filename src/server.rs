use std::{convert::Infallible, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Json, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post, put},
    Router,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::chat::{
    Chat, Message, MessageCursor, MessageQuery, Order, ReactionKind, Theme,
};
use crate::entity::Member;
use crate::error::{ChatError, Result};
use crate::reactions::ReactionChange;
use crate::service::ChatService;
use crate::upload::UploadFile;

// -----------------------------------------------------------------------------
// Errors
// -----------------------------------------------------------------------------

fn status_of(err: &ChatError) -> (StatusCode, &'static str) {
    match err {
        ChatError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
        ChatError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "invalid_argument"),
        ChatError::Unauthorized(_) => (StatusCode::FORBIDDEN, "unauthorized"),
        ChatError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        ChatError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
    }
}

impl IntoResponse for ChatError {
    fn into_response(self) -> Response {
        let (status, code) = status_of(&self);
        if status == StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %self, "Request failed");
        }
        (status, Json(json!({ "error": code, "message": self.to_string() }))).into_response()
    }
}

// -----------------------------------------------------------------------------
// Request bodies
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct DirectChatRequest {
    pub user_id: String,
    pub other_user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GroupChatRequest {
    pub creator_id: String,
    pub member_ids: Vec<String>,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct Viewer {
    pub viewer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct Actor {
    pub acting_user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct AddMembersRequest {
    pub member_ids: Vec<String>,
    pub acting_user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
    pub acting_user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ThemeRequest {
    pub theme: Theme,
    pub acting_user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct EmojiRequest {
    pub emoji: String,
    pub acting_user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct PhotoParams {
    pub acting_user_id: String,
    pub file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MessagesParams {
    pub viewer_id: String,
    pub limit: Option<u32>,
    pub order: Option<Order>,
    pub before: Option<i64>,
    pub include_system: Option<bool>,
}

impl MessagesParams {
    fn query(&self, default_limit: u32) -> MessageQuery {
        MessageQuery {
            limit: self.limit.unwrap_or(default_limit),
            order: self.order.unwrap_or(Order::Asc),
            before: self.before.map(MessageCursor),
            include_system: self.include_system.unwrap_or(true),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub sender_id: String,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct EditRequest {
    pub text: String,
    pub acting_user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReactionRequest {
    pub user_id: String,
    pub kind: ReactionKind,
}

#[derive(Debug, Serialize)]
pub struct Toggled {
    pub value: bool,
}

#[derive(Debug, Serialize)]
pub struct Added {
    pub added: Vec<String>,
}

// -----------------------------------------------------------------------------
// Router
// -----------------------------------------------------------------------------

type AppState = Arc<ChatService>;

pub fn router(service: Arc<ChatService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users/:user_id/chats", get(list_chats))
        .route("/users/:user_id/chats/stream", get(chat_stream))
        .route("/chats/direct", post(direct_chat))
        .route("/chats/group", post(group_chat))
        .route("/chats/:chat_id", get(get_chat).delete(delete_chat))
        .route("/chats/:chat_id/members", get(members).post(add_members))
        .route("/chats/:chat_id/leave", post(leave_group))
        .route("/chats/:chat_id/name", put(rename_group))
        .route("/chats/:chat_id/theme", put(set_theme))
        .route("/chats/:chat_id/emoji", put(set_emoji))
        .route("/chats/:chat_id/photo", put(set_photo))
        .route(
            "/chats/:chat_id/messages",
            get(list_messages).post(send_message),
        )
        .route("/chats/:chat_id/messages/stream", get(message_stream))
        .route(
            "/messages/:message_id",
            axum::routing::patch(edit_message).delete(delete_message),
        )
        .route("/messages/:message_id/reactions", post(set_reaction))
        .route("/messages/:message_id/pin", post(toggle_pin))
        .route("/messages/:message_id/unread", post(toggle_unread))
        .with_state(service)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

// --- Chats ---

async fn list_chats(
    State(service): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<Chat>>> {
    Ok(Json(service.list_chats(&user_id).await?))
}

async fn direct_chat(
    State(service): State<AppState>,
    Json(request): Json<DirectChatRequest>,
) -> Result<Json<Chat>> {
    let chat = service
        .get_or_create_direct_chat(&request.user_id, &request.other_user_id)
        .await?;
    Ok(Json(chat))
}

async fn group_chat(
    State(service): State<AppState>,
    Json(request): Json<GroupChatRequest>,
) -> Result<(StatusCode, Json<Chat>)> {
    let chat = service
        .create_group_chat(&request.creator_id, &request.member_ids, &request.name)
        .await?;
    Ok((StatusCode::CREATED, Json(chat)))
}

async fn get_chat(
    State(service): State<AppState>,
    Path(chat_id): Path<String>,
    Query(viewer): Query<Viewer>,
) -> Result<Json<Chat>> {
    Ok(Json(service.get_chat(&chat_id, &viewer.viewer_id).await?))
}

async fn delete_chat(
    State(service): State<AppState>,
    Path(chat_id): Path<String>,
    Query(actor): Query<Actor>,
) -> Result<StatusCode> {
    service.delete_chat(&chat_id, &actor.acting_user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn members(
    State(service): State<AppState>,
    Path(chat_id): Path<String>,
) -> Result<Json<Vec<Member>>> {
    Ok(Json(service.members(&chat_id).await?))
}

async fn add_members(
    State(service): State<AppState>,
    Path(chat_id): Path<String>,
    Json(request): Json<AddMembersRequest>,
) -> Result<Json<Added>> {
    let added = service
        .add_members(&chat_id, &request.member_ids, &request.acting_user_id)
        .await?;
    Ok(Json(Added { added }))
}

async fn leave_group(
    State(service): State<AppState>,
    Path(chat_id): Path<String>,
    Json(actor): Json<Actor>,
) -> Result<StatusCode> {
    service.leave_group(&chat_id, &actor.acting_user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn rename_group(
    State(service): State<AppState>,
    Path(chat_id): Path<String>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<Chat>> {
    let chat = service
        .rename_group(&chat_id, &request.name, &request.acting_user_id)
        .await?;
    Ok(Json(chat))
}

async fn set_theme(
    State(service): State<AppState>,
    Path(chat_id): Path<String>,
    Json(request): Json<ThemeRequest>,
) -> Result<Json<Chat>> {
    let chat = service
        .set_theme(&chat_id, request.theme, &request.acting_user_id)
        .await?;
    Ok(Json(chat))
}

async fn set_emoji(
    State(service): State<AppState>,
    Path(chat_id): Path<String>,
    Json(request): Json<EmojiRequest>,
) -> Result<Json<Chat>> {
    let chat = service
        .set_emoji(&chat_id, &request.emoji, &request.acting_user_id)
        .await?;
    Ok(Json(chat))
}

/// The photo is the raw request body; its type comes from `Content-Type`.
async fn set_photo(
    State(service): State<AppState>,
    Path(chat_id): Path<String>,
    Query(params): Query<PhotoParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Chat>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let file = UploadFile {
        bytes: body.to_vec(),
        content_type,
        file_name: params
            .file_name
            .unwrap_or_else(|| format!("{}-{}", chat_id, uuid::Uuid::new_v4())),
    };
    let chat = service
        .set_photo(&chat_id, file, &params.acting_user_id)
        .await?;
    Ok(Json(chat))
}

// --- Messages ---

async fn list_messages(
    State(service): State<AppState>,
    Path(chat_id): Path<String>,
    Query(params): Query<MessagesParams>,
) -> Result<Json<Vec<Message>>> {
    let query = params.query(service.message_limit());
    let messages = service
        .list_messages(&chat_id, &params.viewer_id, query)
        .await?;
    Ok(Json(messages))
}

async fn send_message(
    State(service): State<AppState>,
    Path(chat_id): Path<String>,
    Json(request): Json<SendRequest>,
) -> Result<(StatusCode, Json<Message>)> {
    let message = service
        .send_message(&chat_id, &request.sender_id, &request.text)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn edit_message(
    State(service): State<AppState>,
    Path(message_id): Path<String>,
    Json(request): Json<EditRequest>,
) -> Result<Json<Message>> {
    let message = service
        .edit_message(&message_id, &request.text, &request.acting_user_id)
        .await?;
    Ok(Json(message))
}

async fn delete_message(
    State(service): State<AppState>,
    Path(message_id): Path<String>,
    Query(actor): Query<Actor>,
) -> Result<StatusCode> {
    service
        .delete_message(&message_id, &actor.acting_user_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_reaction(
    State(service): State<AppState>,
    Path(message_id): Path<String>,
    Json(request): Json<ReactionRequest>,
) -> Result<Json<ReactionChange>> {
    let change = service
        .set_reaction(&message_id, &request.user_id, request.kind)
        .await?;
    Ok(Json(change))
}

async fn toggle_pin(
    State(service): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<Json<Toggled>> {
    let value = service.toggle_pin(&message_id).await?;
    Ok(Json(Toggled { value }))
}

async fn toggle_unread(
    State(service): State<AppState>,
    Path(message_id): Path<String>,
) -> Result<Json<Toggled>> {
    let value = service.toggle_unread(&message_id).await?;
    Ok(Json(Toggled { value }))
}

// --- Streams ---

fn snapshot_event<T: Serialize>(name: &'static str, snapshot: Result<T>) -> Event {
    let event = snapshot
        .map_err(|err| err.to_string())
        .and_then(|value| {
            Event::default()
                .event(name)
                .json_data(&value)
                .map_err(|err| err.to_string())
        });
    match event {
        Ok(event) => event,
        Err(message) => Event::default().event("error").data(message),
    }
}

async fn chat_stream(
    State(service): State<AppState>,
    Path(user_id): Path<String>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    info!(user_id = %user_id, "Chat list stream opened");

    let stream = service
        .subscriptions()
        .chat_stream(&user_id)
        .map(|snapshot| Ok(snapshot_event("chats", snapshot)));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn message_stream(
    State(service): State<AppState>,
    Path(chat_id): Path<String>,
    Query(viewer): Query<Viewer>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    service.get_chat(&chat_id, &viewer.viewer_id).await?;
    info!(chat_id = %chat_id, viewer_id = %viewer.viewer_id, "Message stream opened");

    let stream = service
        .subscriptions()
        .message_stream(&chat_id)
        .map(|snapshot| Ok(snapshot_event("messages", snapshot)));

    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
