use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{
    mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
    RwLock,
};
use uuid::Uuid;

pub mod events;
pub mod pubsub;
pub mod session;

pub use events::{ClientEvent, WsEvent};

/// Unique identifier for a WebSocket subscriber.
///
/// Each connection gets its own ID when it registers, so cleanup can target
/// exactly one connection even when a user is connected from several devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

struct Subscriber {
    id: SubscriberId,
    sender: UnboundedSender<String>,
}

/// Registry of live WebSocket connections, keyed by user.
///
/// A user may hold multiple concurrent connections (one per device); events
/// addressed to the user fan out to all of them. Delivery is best effort:
/// senders whose receiving session has gone away are dropped silently.
#[derive(Default, Clone)]
pub struct ConnectionRegistry {
    // user_id -> list of subscribers
    inner: Arc<RwLock<HashMap<Uuid, Vec<Subscriber>>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new connection for `user_id`.
    ///
    /// Returns the subscriber ID (needed for cleanup) and the receiving half
    /// of the connection's channel.
    pub async fn add_subscriber(
        &self,
        user_id: Uuid,
    ) -> (SubscriberId, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        let subscriber_id = SubscriberId::new();

        let subscriber = Subscriber {
            id: subscriber_id,
            sender: tx,
        };

        let mut guard = self.inner.write().await;
        guard.entry(user_id).or_default().push(subscriber);

        tracing::debug!(
            "Added subscriber {:?} for user {}, connections: {}",
            subscriber_id,
            user_id,
            guard.get(&user_id).map(|v| v.len()).unwrap_or(0)
        );

        (subscriber_id, rx)
    }

    /// Removes one connection. Must be called when the session closes.
    pub async fn remove_subscriber(&self, user_id: Uuid, subscriber_id: SubscriberId) {
        let mut guard = self.inner.write().await;

        if let Some(subscribers) = guard.get_mut(&user_id) {
            subscribers.retain(|s| s.id != subscriber_id);

            if subscribers.is_empty() {
                guard.remove(&user_id);
            }
        }

        tracing::debug!("Removed subscriber {:?} for user {}", subscriber_id, user_id);
    }

    /// Delivers a payload to every live connection of `user_id`.
    ///
    /// Dead senders are pruned as a side effect. A user with no connections
    /// is not an error.
    pub async fn send_to_user(&self, user_id: Uuid, payload: String) {
        let mut guard = self.inner.write().await;
        if let Some(subscribers) = guard.get_mut(&user_id) {
            subscribers.retain(|subscriber| subscriber.sender.send(payload.clone()).is_ok());

            if subscribers.is_empty() {
                guard.remove(&user_id);
            }
        }
    }

    pub async fn connection_count(&self, user_id: Uuid) -> usize {
        let guard = self.inner.read().await;
        guard.get(&user_id).map(|v| v.len()).unwrap_or(0)
    }

    pub async fn connected_users_count(&self) -> usize {
        let guard = self.inner.read().await;
        guard.len()
    }

    pub async fn total_connections(&self) -> usize {
        let guard = self.inner.read().await;
        guard.values().map(|v| v.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_registry_starts_empty() {
        let registry = ConnectionRegistry::new();
        assert_eq!(registry.total_connections().await, 0);
        assert_eq!(registry.connected_users_count().await, 0);
    }

    #[tokio::test]
    async fn test_add_subscriber() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();

        let (_id, _rx) = registry.add_subscriber(user_id).await;

        assert_eq!(registry.connection_count(user_id).await, 1);
        assert_eq!(registry.connected_users_count().await, 1);
    }

    #[tokio::test]
    async fn test_multiple_connections_same_user() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();

        let _receivers: Vec<_> = {
            let mut rxs = Vec::new();
            for _ in 0..3 {
                let (_id, rx) = registry.add_subscriber(user_id).await;
                rxs.push(rx);
            }
            rxs
        };

        assert_eq!(registry.connection_count(user_id).await, 3);
        assert_eq!(registry.total_connections().await, 3);
        assert_eq!(registry.connected_users_count().await, 1);
    }

    #[tokio::test]
    async fn test_send_to_user_fans_out() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();

        let (_id_a, mut rx_a) = registry.add_subscriber(user_id).await;
        let (_id_b, mut rx_b) = registry.add_subscriber(user_id).await;

        registry.send_to_user(user_id, "hello".to_string()).await;

        assert_eq!(rx_a.recv().await.unwrap(), "hello");
        assert_eq!(rx_b.recv().await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn test_send_to_user_without_connections_is_noop() {
        let registry = ConnectionRegistry::new();
        registry
            .send_to_user(Uuid::new_v4(), "nobody home".to_string())
            .await;
        assert_eq!(registry.total_connections().await, 0);
    }

    #[tokio::test]
    async fn test_send_does_not_cross_users() {
        let registry = ConnectionRegistry::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        let (_id_a, mut rx_alice) = registry.add_subscriber(alice).await;
        let (_id_b, mut rx_bob) = registry.add_subscriber(bob).await;

        registry.send_to_user(alice, "for alice".to_string()).await;

        assert_eq!(rx_alice.recv().await.unwrap(), "for alice");
        assert!(rx_bob.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_remove_subscriber() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();

        let (id, _rx) = registry.add_subscriber(user_id).await;
        assert_eq!(registry.connection_count(user_id).await, 1);

        registry.remove_subscriber(user_id, id).await;
        assert_eq!(registry.connection_count(user_id).await, 0);
        assert_eq!(registry.connected_users_count().await, 0);
    }

    #[tokio::test]
    async fn test_remove_keeps_other_connections() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();

        let (id_a, _rx_a) = registry.add_subscriber(user_id).await;
        let (_id_b, _rx_b) = registry.add_subscriber(user_id).await;

        registry.remove_subscriber(user_id, id_a).await;
        assert_eq!(registry.connection_count(user_id).await, 1);
    }

    #[tokio::test]
    async fn test_dead_senders_are_pruned_on_send() {
        let registry = ConnectionRegistry::new();
        let user_id = Uuid::new_v4();

        let (_id, rx) = registry.add_subscriber(user_id).await;
        drop(rx);

        registry.send_to_user(user_id, "gone".to_string()).await;
        assert_eq!(registry.connection_count(user_id).await, 0);
    }
}
