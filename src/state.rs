use crate::{
    config::Config,
    redis_client::RedisClient,
    repository::{MessageRepository, UserRepository},
    services::{ConversationService, MessageService, Notifier},
    websocket::ConnectionRegistry,
};
use sqlx::{Pool, Postgres};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Postgres>,
    pub registry: ConnectionRegistry,
    pub redis: RedisClient,
    pub config: Arc<Config>,
    pub messages: MessageService,
    pub conversations: ConversationService,
}

impl AppState {
    pub fn new(
        db: Pool<Postgres>,
        redis: RedisClient,
        registry: ConnectionRegistry,
        config: Config,
    ) -> Self {
        let message_repo = MessageRepository::new(db.clone());
        let user_repo = UserRepository::new(db.clone());
        let notifier = Notifier::new(redis.clone());

        Self {
            messages: MessageService::new(
                message_repo.clone(),
                user_repo.clone(),
                notifier,
            ),
            conversations: ConversationService::new(message_repo, user_repo),
            db,
            registry,
            redis,
            config: Arc::new(config),
        }
    }
}
