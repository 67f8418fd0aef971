use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity snapshot from the user directory, used to validate actors and to
/// stamp sender details into realtime payloads.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserProfile {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
}
