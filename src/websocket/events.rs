//! Realtime event vocabulary.
//!
//! Server events follow the `object.action` naming convention. Payload keys
//! are camelCase because the clients already parse that shape. A new-message
//! event serializes as the bare message payload, whose `type` key carries the
//! message kind; every other event carries a `type` key naming the event.
//! Clients disambiguate on that key.

use crate::models::MessageResponse;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-to-client events pushed over a user's private channels.
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    /// Full payload of a newly delivered message.
    MessageNew(MessageResponse),

    /// Instruction to drop a recalled message client-side. Carries no message
    /// content.
    MessageRecalled {
        message_id: Uuid,
        recalled_at: DateTime<Utc>,
    },

    /// The reader has caught up on everything the recipient sent them.
    MessageRead { reader_id: Uuid },

    /// Ephemeral typing indicator, relayed without touching the store.
    Typing { sender_id: Uuid, is_typing: bool },
}

impl WsEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            WsEvent::MessageNew(_) => "message.new",
            WsEvent::MessageRecalled { .. } => "message.recalled",
            WsEvent::MessageRead { .. } => "message.read",
            WsEvent::Typing { .. } => "typing.update",
        }
    }

    /// Serializes the event to its wire payload. This is the only place
    /// outbound event JSON is built.
    pub fn to_payload(&self) -> Result<String, serde_json::Error> {
        let value = match self {
            WsEvent::MessageNew(message) => serde_json::to_value(message)?,
            WsEvent::MessageRecalled {
                message_id,
                recalled_at,
            } => serde_json::json!({
                "type": self.event_type(),
                "messageId": message_id,
                "recalledAt": recalled_at,
            }),
            WsEvent::MessageRead { reader_id } => serde_json::json!({
                "type": self.event_type(),
                "readerId": reader_id,
            }),
            WsEvent::Typing {
                sender_id,
                is_typing,
            } => serde_json::json!({
                "type": self.event_type(),
                "senderId": sender_id,
                "isTyping": is_typing,
            }),
        };
        serde_json::to_string(&value)
    }
}

/// Client-to-server events received over the WebSocket.
///
/// These mirror the REST operations; results come back through the user's
/// private channels rather than a request/response pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Send a message to another user.
    #[serde(rename = "chat.send", rename_all = "camelCase")]
    Send {
        receiver_id: Uuid,
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        message_type: Option<crate::models::MessageType>,
        #[serde(default)]
        media_url: Option<String>,
    },

    /// Relay a typing indicator to another user.
    #[serde(rename = "chat.typing", rename_all = "camelCase")]
    Typing { receiver_id: Uuid, is_typing: bool },

    /// Mark everything received from `sender_id` as read.
    #[serde(rename = "chat.read_receipt", rename_all = "camelCase")]
    MarkAllRead { sender_id: Uuid },
}

impl ClientEvent {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
