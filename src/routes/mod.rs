use actix_web::{web, HttpResponse};
use serde::Serialize;

pub mod messages;

use crate::websocket::session::ws_handler;
use messages::{
    copy_message, delete_message, forward_message, get_file_messages, get_history,
    get_history_page, get_last_message, get_media_messages, get_unread_count,
    get_unread_messages, get_unread_total, mark_all_read, mark_read, recall_message,
    search_messages, send_message, send_text,
};

/// Response envelope shared by every REST endpoint.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "service": "messaging-service",
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    // Service introspection endpoints, registered as bare routes. An empty
    // scope here would prefix-match every path and swallow /api/v1.
    cfg.route("/health", web::get().to(health_check))
        .route("/metrics", web::get().to(crate::metrics::serve_metrics));

    cfg.service(
        web::scope("/api/v1")
            .service(
                web::scope("/messages")
                    // Sending
                    .route("/send/text", web::post().to(send_text))
                    .route("/send", web::post().to(send_message))
                    // Conversation views
                    .route("/history/{user_id}/{other_user_id}", web::get().to(get_history))
                    .route(
                        "/history/{user_id}/{other_user_id}/page",
                        web::get().to(get_history_page),
                    )
                    .route("/last/{user_id}/{other_user_id}", web::get().to(get_last_message))
                    // Read state
                    .route(
                        "/mark-read/{receiver_id}/{sender_id}",
                        web::put().to(mark_all_read),
                    )
                    .route("/unread/{user_id}", web::get().to(get_unread_messages))
                    .route("/unread/{user_id}/count", web::get().to(get_unread_total))
                    .route(
                        "/unread/{user_id}/count/{sender_id}",
                        web::get().to(get_unread_count),
                    )
                    // Filtered queries
                    .route("/search/{user_id}", web::get().to(search_messages))
                    .route(
                        "/media/{user_id}/{other_user_id}",
                        web::get().to(get_media_messages),
                    )
                    .route(
                        "/files/{user_id}/{other_user_id}",
                        web::get().to(get_file_messages),
                    )
                    // Per-message operations
                    .route("/{message_id}/read/{user_id}", web::put().to(mark_read))
                    .route("/{message_id}/for/{user_id}", web::delete().to(delete_message))
                    .route("/{message_id}/recall", web::post().to(recall_message))
                    .route("/{message_id}/forward", web::post().to(forward_message))
                    .route("/{message_id}/copy", web::post().to(copy_message)),
            )
            // WebSocket endpoint (with API version prefix for consistency)
            .service(ws_handler),
    );
}
