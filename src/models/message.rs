use crate::models::user::UserProfile;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of characters of a text message shown in previews.
pub const PREVIEW_MAX_CHARS: usize = 50;

/// Closed set of message kinds. Every per-type behavior (icon, preview label,
/// upload limits, MIME whitelist) lives here so no call site needs its own
/// per-type conditionals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    Video,
    Voice,
    File,
    Location,
    Sticker,
    System,
}

impl MessageType {
    pub fn as_code(&self) -> &'static str {
        match self {
            MessageType::Text => "text",
            MessageType::Image => "image",
            MessageType::Video => "video",
            MessageType::Voice => "voice",
            MessageType::File => "file",
            MessageType::Location => "location",
            MessageType::Sticker => "sticker",
            MessageType::System => "system",
        }
    }

    /// Case-insensitive parse of the wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_ascii_lowercase().as_str() {
            "text" => Some(MessageType::Text),
            "image" => Some(MessageType::Image),
            "video" => Some(MessageType::Video),
            "voice" => Some(MessageType::Voice),
            "file" => Some(MessageType::File),
            "location" => Some(MessageType::Location),
            "sticker" => Some(MessageType::Sticker),
            "system" => Some(MessageType::System),
            _ => None,
        }
    }

    pub fn is_media(&self) -> bool {
        matches!(
            self,
            MessageType::Image | MessageType::Video | MessageType::Voice
        )
    }

    pub fn is_file(&self) -> bool {
        matches!(self, MessageType::File)
    }

    pub fn is_system(&self) -> bool {
        matches!(self, MessageType::System)
    }

    pub fn icon(&self) -> &'static str {
        match self {
            MessageType::Text => "📝",
            MessageType::Image => "🖼️",
            MessageType::Video => "🎥",
            MessageType::Voice => "🎤",
            MessageType::File => "📎",
            MessageType::Location => "📍",
            MessageType::Sticker => "😊",
            MessageType::System => "⚙️",
        }
    }

    /// Upload size cap in bytes for attachment-bearing types; 0 for types
    /// that carry no upload.
    pub fn max_upload_bytes(&self) -> u64 {
        match self {
            MessageType::Image => 10 * 1024 * 1024,
            MessageType::Video => 50 * 1024 * 1024,
            MessageType::Voice => 5 * 1024 * 1024,
            MessageType::File => 25 * 1024 * 1024,
            _ => 0,
        }
    }

    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            MessageType::Image => &["image/jpeg", "image/png", "image/gif", "image/webp"],
            MessageType::Video => &["video/mp4", "video/avi", "video/mov", "video/webm"],
            MessageType::Voice => &["audio/mpeg", "audio/wav", "audio/ogg", "audio/aac"],
            MessageType::File => &[
                "application/pdf",
                "application/msword",
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
                "text/plain",
                "application/zip",
                "application/x-rar-compressed",
            ],
            _ => &[],
        }
    }

    /// Human-readable one-line preview for conversation lists and push
    /// payloads. Text is truncated at 50 characters (Unicode scalars, not
    /// bytes) with a `...` suffix; every other type maps to a fixed
    /// icon+label, except system messages which show their raw content.
    pub fn preview(&self, content: &str) -> String {
        match self {
            MessageType::Text => {
                if content.chars().count() > PREVIEW_MAX_CHARS {
                    let truncated: String = content.chars().take(PREVIEW_MAX_CHARS).collect();
                    format!("{}...", truncated)
                } else {
                    content.to_string()
                }
            }
            MessageType::Image => "🖼️ Photo".to_string(),
            MessageType::Video => "🎥 Video".to_string(),
            MessageType::Voice => "🎤 Voice message".to_string(),
            MessageType::File => "📎 File attachment".to_string(),
            MessageType::Location => "📍 Location".to_string(),
            MessageType::Sticker => "😊 Sticker".to_string(),
            MessageType::System => format!("⚙️ {}", content),
        }
    }
}

impl Default for MessageType {
    fn default() -> Self {
        MessageType::Text
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_code())
    }
}

/// A persisted direct message. `content`, `sender_id`, `receiver_id`,
/// `message_type`, and `created_at` are immutable after insert; only the
/// read flag and the two per-party deletion flags ever change.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub media_url: Option<String>,
    pub message_type: MessageType,
    pub is_read: bool,
    pub is_deleted_for_sender: bool,
    pub is_deleted_for_receiver: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Visibility rule: a party sees the message unless their own deletion
    /// flag is set. Non-participants never see it.
    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        (self.sender_id == user_id && !self.is_deleted_for_sender)
            || (self.receiver_id == user_id && !self.is_deleted_for_receiver)
    }

    /// System messages cannot be deleted from conversation views.
    pub fn is_deletable(&self) -> bool {
        !self.message_type.is_system()
    }
}

/// Insert payload for the message repository. Ids and timestamps are
/// assigned at insert.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub content: String,
    pub media_url: Option<String>,
    pub message_type: MessageType,
}

/// Wire representation of a message, shared by REST responses and the
/// realtime `message.new` event. Carries a sender identity snapshot plus the
/// derived preview/icon/deletability so clients render without extra lookups.
/// Keys are camelCase with the kind under `type`; existing clients parse this
/// shape, so the field set is frozen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: Uuid,
    pub content: String,
    pub media_url: Option<String>,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub sender_avatar: Option<String>,
    pub receiver_id: Uuid,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub icon: String,
    pub preview: String,
    pub is_deletable: bool,
}

impl MessageResponse {
    pub fn from_message(message: &Message, sender: &UserProfile) -> Self {
        Self {
            id: message.id,
            content: message.content.clone(),
            media_url: message.media_url.clone(),
            message_type: message.message_type,
            sender_id: message.sender_id,
            sender_name: sender.username.clone(),
            sender_avatar: sender.avatar_url.clone(),
            receiver_id: message.receiver_id,
            is_read: message.is_read,
            created_at: message.created_at,
            icon: message.message_type.icon().to_string(),
            preview: message.message_type.preview(&message.content),
            is_deletable: message.is_deletable(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_of(message_type: MessageType, content: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            receiver_id: Uuid::new_v4(),
            content: content.to_string(),
            media_url: None,
            message_type,
            is_read: false,
            is_deleted_for_sender: false,
            is_deleted_for_receiver: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn text_preview_truncates_at_fifty_chars() {
        let content = "a".repeat(60);
        let preview = MessageType::Text.preview(&content);
        assert_eq!(preview.chars().count(), 53);
        assert!(preview.ends_with("..."));
        assert!(preview.starts_with(&"a".repeat(50)));
    }

    #[test]
    fn short_text_preview_is_verbatim() {
        let preview = MessageType::Text.preview("hello");
        assert_eq!(preview, "hello");
    }

    #[test]
    fn exactly_fifty_chars_is_not_truncated() {
        let content = "b".repeat(50);
        assert_eq!(MessageType::Text.preview(&content), content);
    }

    #[test]
    fn preview_counts_chars_not_bytes() {
        // 60 multibyte chars must still truncate to 50 + ellipsis.
        let content = "é".repeat(60);
        let preview = MessageType::Text.preview(&content);
        assert_eq!(preview.chars().count(), 53);
    }

    #[test]
    fn media_previews_ignore_content() {
        assert_eq!(MessageType::Image.preview("whatever"), "🖼️ Photo");
        assert_eq!(MessageType::Video.preview(""), "🎥 Video");
        assert_eq!(MessageType::Sticker.preview("sticker_42"), "😊 Sticker");
    }

    #[test]
    fn system_preview_includes_raw_content() {
        assert_eq!(
            MessageType::System.preview("maintenance at noon"),
            "⚙️ maintenance at noon"
        );
    }

    #[test]
    fn type_codes_round_trip() {
        for t in [
            MessageType::Text,
            MessageType::Image,
            MessageType::Video,
            MessageType::Voice,
            MessageType::File,
            MessageType::Location,
            MessageType::Sticker,
            MessageType::System,
        ] {
            assert_eq!(MessageType::from_code(t.as_code()), Some(t));
        }
        assert_eq!(MessageType::from_code("IMAGE"), Some(MessageType::Image));
        assert_eq!(MessageType::from_code("bogus"), None);
    }

    #[test]
    fn media_and_file_predicates() {
        assert!(MessageType::Image.is_media());
        assert!(MessageType::Video.is_media());
        assert!(MessageType::Voice.is_media());
        assert!(!MessageType::File.is_media());
        assert!(MessageType::File.is_file());
        assert!(MessageType::System.is_system());
        assert!(!MessageType::Text.is_media());
    }

    #[test]
    fn upload_limits_per_type() {
        assert_eq!(MessageType::Image.max_upload_bytes(), 10 * 1024 * 1024);
        assert_eq!(MessageType::Video.max_upload_bytes(), 50 * 1024 * 1024);
        assert_eq!(MessageType::Voice.max_upload_bytes(), 5 * 1024 * 1024);
        assert_eq!(MessageType::File.max_upload_bytes(), 25 * 1024 * 1024);
        assert_eq!(MessageType::Text.max_upload_bytes(), 0);
    }

    #[test]
    fn mime_whitelists_cover_upload_types() {
        assert!(MessageType::Image
            .allowed_mime_types()
            .contains(&"image/png"));
        assert!(MessageType::Voice
            .allowed_mime_types()
            .contains(&"audio/ogg"));
        assert!(MessageType::File
            .allowed_mime_types()
            .contains(&"application/pdf"));
        assert!(MessageType::Location.allowed_mime_types().is_empty());
    }

    #[test]
    fn visibility_follows_per_party_flags() {
        let mut msg = message_of(MessageType::Text, "hi");
        let sender = msg.sender_id;
        let receiver = msg.receiver_id;
        assert!(msg.is_visible_to(sender));
        assert!(msg.is_visible_to(receiver));
        assert!(!msg.is_visible_to(Uuid::new_v4()));

        msg.is_deleted_for_sender = true;
        assert!(!msg.is_visible_to(sender));
        assert!(msg.is_visible_to(receiver));

        msg.is_deleted_for_sender = false;
        msg.is_deleted_for_receiver = true;
        assert!(msg.is_visible_to(sender));
        assert!(!msg.is_visible_to(receiver));
    }

    #[test]
    fn system_messages_are_not_deletable() {
        let system = message_of(MessageType::System, "joined");
        assert!(!system.is_deletable());
        let text = message_of(MessageType::Text, "hi");
        assert!(text.is_deletable());
    }

    #[test]
    fn response_snapshot_carries_sender_identity() {
        let msg = message_of(MessageType::Text, "hello there");
        let sender = UserProfile {
            id: msg.sender_id,
            username: "alice".to_string(),
            avatar_url: Some("https://cdn.example/a.png".to_string()),
        };
        let dto = MessageResponse::from_message(&msg, &sender);
        assert_eq!(dto.sender_name, "alice");
        assert_eq!(dto.sender_avatar.as_deref(), Some("https://cdn.example/a.png"));
        assert_eq!(dto.preview, "hello there");
        assert_eq!(dto.icon, "📝");
        assert!(dto.is_deletable);
    }

    #[test]
    fn response_serializes_with_client_facing_keys() {
        let msg = message_of(MessageType::Image, "look at this");
        let sender = UserProfile {
            id: msg.sender_id,
            username: "alice".to_string(),
            avatar_url: None,
        };
        let dto = MessageResponse::from_message(&msg, &sender);
        let value = serde_json::to_value(&dto).unwrap();

        for key in [
            "id",
            "content",
            "mediaUrl",
            "type",
            "senderId",
            "senderName",
            "senderAvatar",
            "receiverId",
            "isRead",
            "createdAt",
            "icon",
            "preview",
            "isDeletable",
        ] {
            assert!(value.get(key).is_some(), "missing key {key}");
        }
        assert_eq!(value["type"], "image");
    }
}
