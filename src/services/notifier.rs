use crate::metrics;
use crate::models::{Message, MessageResponse, UserProfile};
use crate::redis_client::RedisClient;
use crate::websocket::events::WsEvent;
use crate::websocket::pubsub;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Best-effort fan-out of realtime events to per-user channels.
///
/// The durable write is the correctness boundary. Publish failures are logged
/// and swallowed; a client that missed an event reconciles through the
/// history and unread-count read paths on reconnect. Nothing here retries.
#[derive(Clone)]
pub struct Notifier {
    redis: RedisClient,
}

impl Notifier {
    pub fn new(redis: RedisClient) -> Self {
        Self { redis }
    }

    /// Pushes the full message payload to the recipient's message channel.
    /// Callers skip this for system messages.
    pub async fn notify_new_message(&self, message: &Message, sender: &UserProfile) {
        let response = MessageResponse::from_message(message, sender);
        let channel = pubsub::message_channel(message.receiver_id);
        self.publish_event(message.receiver_id, &channel, WsEvent::MessageNew(response))
            .await;
    }

    /// Tells the recipient to drop a recalled message from their view.
    pub async fn notify_recall(
        &self,
        recipient_id: Uuid,
        message_id: Uuid,
        recalled_at: DateTime<Utc>,
    ) {
        let channel = pubsub::message_channel(recipient_id);
        self.publish_event(
            recipient_id,
            &channel,
            WsEvent::MessageRecalled {
                message_id,
                recalled_at,
            },
        )
        .await;
    }

    /// Tells the original sender that `reader_id` has read their messages.
    pub async fn notify_read_receipt(&self, sender_id: Uuid, reader_id: Uuid) {
        let channel = pubsub::read_receipt_channel(sender_id);
        self.publish_event(sender_id, &channel, WsEvent::MessageRead { reader_id })
            .await;
    }

    /// Relays a typing indicator. Never persisted.
    pub async fn notify_typing(&self, recipient_id: Uuid, sender_id: Uuid, is_typing: bool) {
        let channel = pubsub::typing_channel(recipient_id);
        self.publish_event(
            recipient_id,
            &channel,
            WsEvent::Typing {
                sender_id,
                is_typing,
            },
        )
        .await;
    }

    async fn publish_event(&self, recipient_id: Uuid, channel: &str, event: WsEvent) {
        let event_type = event.event_type();

        let payload = match event.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    event = event_type,
                    "Failed to serialize realtime event"
                );
                metrics::record_event_dropped(event_type);
                return;
            }
        };

        match pubsub::publish(&self.redis, channel, &payload).await {
            Ok(()) => {
                metrics::record_event_published(event_type);
                tracing::debug!(
                    recipient = %recipient_id,
                    event = event_type,
                    "Published realtime event"
                );
            }
            Err(e) => {
                // Best effort only: the durable write already committed
                tracing::warn!(
                    error = %e,
                    recipient = %recipient_id,
                    event = event_type,
                    "Realtime publish failed, event dropped"
                );
                metrics::record_event_dropped(event_type);
            }
        }
    }
}
