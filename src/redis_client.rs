use redis::aio::ConnectionManager;
use redis::{Client, RedisResult};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type SharedConnectionManager = Arc<Mutex<ConnectionManager>>;

/// Clonable handle over one Redis client: a multiplexed connection manager
/// for publishing, plus access to the raw client for the dedicated pub/sub
/// connection (PubSub cannot run over the multiplexed connection).
#[derive(Clone)]
pub struct RedisClient {
    client: Client,
    manager: SharedConnectionManager,
}

impl RedisClient {
    pub async fn from_url(url: &str) -> RedisResult<Self> {
        let client = Client::open(url)?;
        let manager = ConnectionManager::new(client.clone()).await?;
        Ok(Self {
            client,
            manager: Arc::new(Mutex::new(manager)),
        })
    }

    pub async fn get_multiplexed_async_connection(&self) -> RedisResult<ConnectionManager> {
        let guard = self.manager.lock().await;
        Ok(guard.clone())
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}
