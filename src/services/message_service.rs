use crate::error::{AppError, AppResult};
use crate::metrics;
use crate::models::{Message, MessageResponse, MessageType, NewMessage, UserProfile};
use crate::repository::{MessageRepository, UserRepository};
use crate::services::notifier::Notifier;
use chrono::{Duration, Utc};
use uuid::Uuid;

/// How long after sending a message the sender may still recall it.
pub const RECALL_WINDOW_MINUTES: i64 = 5;

/// Marker prefixed to forwarded message content.
pub const FORWARD_PREFIX: &str = "[Forwarded] ";

/// Message lifecycle: send, read-marking, per-party deletion, recall,
/// forward, copy.
///
/// Validation happens here, persistence in the repository, and realtime
/// fan-out in the notifier. Persistence commits before any notify call;
/// notification failure never rolls anything back.
#[derive(Clone)]
pub struct MessageService {
    messages: MessageRepository,
    users: UserRepository,
    notifier: Notifier,
}

impl MessageService {
    pub fn new(messages: MessageRepository, users: UserRepository, notifier: Notifier) -> Self {
        Self {
            messages,
            users,
            notifier,
        }
    }

    /// Generic send. Validates both parties, persists, then pushes the
    /// new-message event unless the message is a system one.
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
        message_type: MessageType,
        media_url: Option<String>,
    ) -> AppResult<Message> {
        if sender_id == receiver_id {
            return Err(AppError::InvalidOperation(
                "cannot send a message to yourself".to_string(),
            ));
        }

        let sender = self.resolve_user(sender_id).await?;
        self.resolve_user(receiver_id).await?;

        if message_type == MessageType::Text && content.trim().is_empty() {
            return Err(AppError::InvalidOperation(
                "message content cannot be empty".to_string(),
            ));
        }

        let message = self
            .messages
            .insert(&NewMessage {
                sender_id,
                receiver_id,
                content,
                media_url,
                message_type,
            })
            .await?;

        metrics::record_message_sent(message_type.as_code());
        tracing::info!(
            message_id = %message.id,
            sender = %sender_id,
            receiver = %receiver_id,
            kind = %message_type,
            "Message sent"
        );

        if !message_type.is_system() {
            self.notifier.notify_new_message(&message, &sender).await;
        }

        Ok(message)
    }

    pub async fn send_text(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    ) -> AppResult<Message> {
        self.send_message(sender_id, receiver_id, content, MessageType::Text, None)
            .await
    }

    pub async fn send_image(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        image_url: String,
        caption: Option<String>,
    ) -> AppResult<Message> {
        let content = default_caption(caption, "🖼️ Sent a photo");
        self.send_message(
            sender_id,
            receiver_id,
            content,
            MessageType::Image,
            Some(image_url),
        )
        .await
    }

    pub async fn send_video(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        video_url: String,
        caption: Option<String>,
    ) -> AppResult<Message> {
        let content = default_caption(caption, "🎥 Sent a video");
        self.send_message(
            sender_id,
            receiver_id,
            content,
            MessageType::Video,
            Some(video_url),
        )
        .await
    }

    pub async fn send_voice(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        audio_url: String,
        duration_secs: Option<u32>,
    ) -> AppResult<Message> {
        let content = match duration_secs {
            Some(secs) => format!("🎤 Voice message ({}s)", secs),
            None => "🎤 Voice message".to_string(),
        };
        self.send_message(
            sender_id,
            receiver_id,
            content,
            MessageType::Voice,
            Some(audio_url),
        )
        .await
    }

    pub async fn send_file(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        file_url: String,
        file_name: String,
        size_bytes: Option<u64>,
    ) -> AppResult<Message> {
        let size_mb = size_bytes.unwrap_or(0) as f64 / 1024.0 / 1024.0;
        let content = format!("📎 {} ({:.2} MB)", file_name, size_mb);
        self.send_message(
            sender_id,
            receiver_id,
            content,
            MessageType::File,
            Some(file_url),
        )
        .await
    }

    /// Coordinates travel packed into content as `lat,lon,address`.
    pub async fn send_location(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        latitude: f64,
        longitude: f64,
        address: Option<String>,
    ) -> AppResult<Message> {
        let content = format!(
            "{:.6},{:.6},{}",
            latitude,
            longitude,
            address.unwrap_or_default()
        );
        self.send_message(sender_id, receiver_id, content, MessageType::Location, None)
            .await
    }

    pub async fn send_sticker(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        sticker_id: String,
    ) -> AppResult<Message> {
        self.send_message(sender_id, receiver_id, sticker_id, MessageType::Sticker, None)
            .await
    }

    /// System messages are persisted for the record but never pushed.
    pub async fn send_system(
        &self,
        sender_id: Uuid,
        receiver_id: Uuid,
        content: String,
    ) -> AppResult<Message> {
        self.send_message(sender_id, receiver_id, content, MessageType::System, None)
            .await
    }

    /// Marks one message read. Only the receiver may do this; repeating it is
    /// a no-op, not an error. No read receipt is sent for a single mark.
    pub async fn mark_read(&self, message_id: Uuid, acting_user: Uuid) -> AppResult<()> {
        let message = self.get_message(message_id).await?;

        if message.receiver_id != acting_user {
            return Err(AppError::Forbidden(
                "only the receiver can mark a message as read".to_string(),
            ));
        }

        self.messages.mark_read(message_id).await?;
        Ok(())
    }

    /// Marks everything from `sender_id` read in one statement, then tells
    /// the sender their messages were read.
    pub async fn mark_all_read(&self, receiver_id: Uuid, sender_id: Uuid) -> AppResult<u64> {
        self.resolve_user(receiver_id).await?;
        self.resolve_user(sender_id).await?;

        let updated = self.messages.mark_all_read_from(receiver_id, sender_id).await?;

        self.notifier.notify_read_receipt(sender_id, receiver_id).await;

        Ok(updated)
    }

    /// Soft-deletes the message for whichever side `acting_user` is on.
    pub async fn delete_for_user(&self, message_id: Uuid, acting_user: Uuid) -> AppResult<()> {
        let message = self.get_message(message_id).await?;

        let deleted = if message.sender_id == acting_user {
            self.messages.soft_delete_for_sender(message_id, acting_user).await?
        } else if message.receiver_id == acting_user {
            self.messages
                .soft_delete_for_receiver(message_id, acting_user)
                .await?
        } else {
            return Err(AppError::Forbidden(
                "only the sender or receiver can delete a message".to_string(),
            ));
        };

        if !deleted {
            return Err(AppError::NotFound(format!(
                "message {} not found",
                message_id
            )));
        }

        tracing::info!(message_id = %message_id, user = %acting_user, "Message deleted for user");
        Ok(())
    }

    /// Sender-only retraction within the recall window. Hides the message
    /// from both sides in one statement and instructs the receiver's clients
    /// to drop it. The row itself stays in the store.
    pub async fn recall(&self, message_id: Uuid, sender_id: Uuid) -> AppResult<()> {
        let message = self.get_message(message_id).await?;

        if message.sender_id != sender_id {
            return Err(AppError::Forbidden(
                "only the sender can recall a message".to_string(),
            ));
        }

        let recalled_at = Utc::now();
        if recalled_at - message.created_at > Duration::minutes(RECALL_WINDOW_MINUTES) {
            return Err(AppError::InvalidOperation(
                "recall window expired".to_string(),
            ));
        }

        self.messages.soft_delete_for_both(message_id, sender_id).await?;

        tracing::info!(message_id = %message_id, sender = %sender_id, "Message recalled");

        self.notifier
            .notify_recall(message.receiver_id, message_id, recalled_at)
            .await;

        Ok(())
    }

    /// Fans a message out to several receivers, each copy prefixed with the
    /// forwarding marker. The loop is deliberately not transactional: a
    /// failure mid-batch leaves the copies already created. Returns the first
    /// copy.
    pub async fn forward(
        &self,
        message_id: Uuid,
        sender_id: Uuid,
        receiver_ids: &[Uuid],
    ) -> AppResult<Message> {
        if receiver_ids.is_empty() {
            return Err(AppError::InvalidOperation(
                "forward requires at least one receiver".to_string(),
            ));
        }

        let original = self.get_message(message_id).await?;
        self.resolve_user(sender_id).await?;

        let content = format!("{}{}", FORWARD_PREFIX, original.content);

        let mut first = None;
        for &receiver_id in receiver_ids {
            let copy = self
                .send_message(
                    sender_id,
                    receiver_id,
                    content.clone(),
                    original.message_type,
                    original.media_url.clone(),
                )
                .await?;
            if first.is_none() {
                first = Some(copy);
            }
        }

        // Non-empty list checked above, so first is always set
        first.ok_or_else(|| AppError::InvalidOperation("forward produced no copies".to_string()))
    }

    /// Duplicates a message verbatim to one receiver under a new id.
    pub async fn copy(
        &self,
        message_id: Uuid,
        sender_id: Uuid,
        receiver_id: Uuid,
    ) -> AppResult<Message> {
        let original = self.get_message(message_id).await?;

        self.send_message(
            sender_id,
            receiver_id,
            original.content.clone(),
            original.message_type,
            original.media_url.clone(),
        )
        .await
    }

    /// Relays a typing indicator between two users. Nothing is stored.
    pub async fn relay_typing(&self, sender_id: Uuid, receiver_id: Uuid, is_typing: bool) {
        self.notifier
            .notify_typing(receiver_id, sender_id, is_typing)
            .await;
    }

    /// Maps a persisted message to its wire shape, resolving the sender
    /// snapshot.
    pub async fn to_response(&self, message: &Message) -> AppResult<MessageResponse> {
        let sender = self.resolve_user(message.sender_id).await?;
        Ok(MessageResponse::from_message(message, &sender))
    }

    async fn get_message(&self, message_id: Uuid) -> AppResult<Message> {
        self.messages
            .find_by_id(message_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("message {} not found", message_id)))
    }

    async fn resolve_user(&self, user_id: Uuid) -> AppResult<UserProfile> {
        self.users
            .find_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))
    }
}

fn default_caption(caption: Option<String>, fallback: &str) -> String {
    match caption {
        Some(c) if !c.trim().is_empty() => c,
        _ => fallback.to_string(),
    }
}
