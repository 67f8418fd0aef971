use crate::redis_client::RedisClient;
use crate::websocket::ConnectionRegistry;
use futures_util::StreamExt;
use redis::AsyncCommands;
use uuid::Uuid;

/// Channel carrying new-message and recall events for one user.
pub fn message_channel(user_id: Uuid) -> String {
    format!("user:{}:messages", user_id)
}

/// Channel carrying read receipts addressed to one user.
pub fn read_receipt_channel(user_id: Uuid) -> String {
    format!("user:{}:read-receipt", user_id)
}

/// Channel carrying ephemeral typing indicators for one user.
pub fn typing_channel(user_id: Uuid) -> String {
    format!("user:{}:typing", user_id)
}

/// Publishes one payload on one channel over the multiplexed connection.
pub async fn publish(redis: &RedisClient, channel: &str, payload: &str) -> redis::RedisResult<()> {
    let mut conn = redis.get_multiplexed_async_connection().await?;
    conn.publish::<_, _, ()>(channel, payload).await
}

/// Fans pub/sub traffic out to this instance's live sockets.
///
/// Channels are named `user:<uuid>:<stream>`; the owner is parsed from the
/// channel name and the payload goes to all of their local connections.
/// Users connected to another instance are served by that instance's
/// listener.
pub async fn start_psub_listener(
    redis: RedisClient,
    registry: ConnectionRegistry,
) -> redis::RedisResult<()> {
    // PubSub requires a dedicated connection, not the multiplexed one
    let conn = redis.client().get_async_connection().await?;
    let mut pubsub = conn.into_pubsub();
    pubsub.psubscribe("user:*").await?;
    let mut stream = pubsub.on_message();
    while let Some(msg) = stream.next().await {
        let channel: String = msg.get_channel_name().into();
        let payload: String = msg.get_payload()?;
        if let Some(rest) = channel.strip_prefix("user:") {
            let id_part = rest.split(':').next().unwrap_or(rest);
            if let Ok(user_id) = Uuid::parse_str(id_part) {
                registry.send_to_user(user_id, payload).await;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_names_embed_the_user() {
        let user_id = Uuid::new_v4();
        assert_eq!(
            message_channel(user_id),
            format!("user:{}:messages", user_id)
        );
        assert_eq!(
            read_receipt_channel(user_id),
            format!("user:{}:read-receipt", user_id)
        );
        assert_eq!(typing_channel(user_id), format!("user:{}:typing", user_id));
    }

    #[test]
    fn channel_owner_parses_back_out() {
        let user_id = Uuid::new_v4();
        let channel = message_channel(user_id);
        let rest = channel.strip_prefix("user:").unwrap();
        let id_part = rest.split(':').next().unwrap();
        assert_eq!(Uuid::parse_str(id_part).unwrap(), user_id);
    }
}
