use crate::error::{AppError, AppResult};
use crate::models::MessageType;
use crate::routes::ApiResponse;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SendTextRequest {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message_type: Option<String>,
    #[serde(default)]
    pub media_url: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecallRequest {
    pub sender_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ForwardRequest {
    pub sender_id: Uuid,
    pub receiver_ids: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CopyRequest {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub keyword: String,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub size: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MediaQuery {
    pub media_type: String,
}

fn parse_message_type(code: &str) -> AppResult<MessageType> {
    MessageType::from_code(code)
        .ok_or_else(|| AppError::InvalidOperation(format!("unknown message type: {}", code)))
}

/// POST /api/v1/messages/send/text
pub async fn send_text(
    state: web::Data<AppState>,
    body: web::Json<SendTextRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let message = state
        .messages
        .send_text(req.sender_id, req.receiver_id, req.content)
        .await?;
    let response = state.messages.to_response(&message).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(response)))
}

/// POST /api/v1/messages/send
pub async fn send_message(
    state: web::Data<AppState>,
    body: web::Json<SendMessageRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    let message_type = match req.message_type.as_deref() {
        Some(code) => parse_message_type(code)?,
        None => MessageType::Text,
    };
    let message = state
        .messages
        .send_message(
            req.sender_id,
            req.receiver_id,
            req.content.unwrap_or_default(),
            message_type,
            req.media_url,
        )
        .await?;
    let response = state.messages.to_response(&message).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(response)))
}

/// GET /api/v1/messages/history/{user_id}/{other_user_id}
pub async fn get_history(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (user_id, other_user_id) = path.into_inner();
    let messages = state.conversations.history(user_id, other_user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(messages)))
}

/// GET /api/v1/messages/history/{user_id}/{other_user_id}/page
pub async fn get_history_page(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let (user_id, other_user_id) = path.into_inner();
    let messages = state
        .conversations
        .history_page(
            user_id,
            other_user_id,
            query.page.unwrap_or(0),
            query.size.unwrap_or(0),
        )
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(messages)))
}

/// GET /api/v1/messages/last/{user_id}/{other_user_id}
pub async fn get_last_message(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (user_id, other_user_id) = path.into_inner();
    match state
        .conversations
        .last_message(user_id, other_user_id)
        .await?
    {
        Some(message) => Ok(HttpResponse::Ok().json(ApiResponse::ok(message))),
        None => Ok(HttpResponse::NoContent().finish()),
    }
}

/// PUT /api/v1/messages/mark-read/{receiver_id}/{sender_id}
pub async fn mark_all_read(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (receiver_id, sender_id) = path.into_inner();
    let updated = state.messages.mark_all_read(receiver_id, sender_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(updated)))
}

/// PUT /api/v1/messages/{message_id}/read/{user_id}
pub async fn mark_read(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (message_id, user_id) = path.into_inner();
    state.messages.mark_read(message_id, user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::ok(())))
}

/// DELETE /api/v1/messages/{message_id}/for/{user_id}
pub async fn delete_message(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (message_id, user_id) = path.into_inner();
    state.messages.delete_for_user(message_id, user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::ok(())))
}

/// POST /api/v1/messages/{message_id}/recall
pub async fn recall_message(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<RecallRequest>,
) -> AppResult<HttpResponse> {
    let message_id = path.into_inner();
    state.messages.recall(message_id, body.sender_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::<()>::ok(())))
}

/// POST /api/v1/messages/{message_id}/forward
pub async fn forward_message(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<ForwardRequest>,
) -> AppResult<HttpResponse> {
    let message_id = path.into_inner();
    let req = body.into_inner();
    let first = state
        .messages
        .forward(message_id, req.sender_id, &req.receiver_ids)
        .await?;
    let response = state.messages.to_response(&first).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(response)))
}

/// POST /api/v1/messages/{message_id}/copy
pub async fn copy_message(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    body: web::Json<CopyRequest>,
) -> AppResult<HttpResponse> {
    let message_id = path.into_inner();
    let req = body.into_inner();
    let message = state
        .messages
        .copy(message_id, req.sender_id, req.receiver_id)
        .await?;
    let response = state.messages.to_response(&message).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(response)))
}

/// GET /api/v1/messages/search/{user_id}
pub async fn search_messages(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    query: web::Query<SearchQuery>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    let messages = state
        .conversations
        .search(
            user_id,
            &query.keyword,
            query.page.unwrap_or(0),
            query.size.unwrap_or(0),
        )
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(messages)))
}

/// GET /api/v1/messages/media/{user_id}/{other_user_id}
pub async fn get_media_messages(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
    query: web::Query<MediaQuery>,
) -> AppResult<HttpResponse> {
    let (user_id, other_user_id) = path.into_inner();
    let media_type = parse_message_type(&query.media_type)?;
    let messages = state
        .conversations
        .media_messages(user_id, other_user_id, media_type)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(messages)))
}

/// GET /api/v1/messages/files/{user_id}/{other_user_id}
pub async fn get_file_messages(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (user_id, other_user_id) = path.into_inner();
    let messages = state
        .conversations
        .file_messages(user_id, other_user_id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(messages)))
}

/// GET /api/v1/messages/unread/{user_id}
pub async fn get_unread_messages(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    let messages = state.conversations.unread_messages(user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(messages)))
}

/// GET /api/v1/messages/unread/{user_id}/count
pub async fn get_unread_total(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let user_id = path.into_inner();
    let count = state.conversations.unread_total(user_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(count)))
}

/// GET /api/v1/messages/unread/{user_id}/count/{sender_id}
pub async fn get_unread_count(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (user_id, sender_id) = path.into_inner();
    let count = state.conversations.unread_count(user_id, sender_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(count)))
}
