pub mod config;
pub mod db;
pub mod error;
pub mod metrics;
pub mod models;
pub mod redis_client;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;
pub mod websocket;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use redis_client::RedisClient;
pub use state::AppState;
pub use websocket::ConnectionRegistry;
