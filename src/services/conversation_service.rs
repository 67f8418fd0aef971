use crate::error::{AppError, AppResult};
use crate::models::{Message, MessageResponse, MessageType, UserProfile};
use crate::repository::{MessageRepository, UserRepository};
use std::collections::HashMap;
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Read-only composition over the message store for UI consumption.
///
/// Every operation resolves the referenced users first and never mutates,
/// so it is safe to call concurrently with any lifecycle operation. Unread
/// counts are aggregated at query time; there is no maintained counter to
/// drift out of sync.
#[derive(Clone)]
pub struct ConversationService {
    messages: MessageRepository,
    users: UserRepository,
}

impl ConversationService {
    pub fn new(messages: MessageRepository, users: UserRepository) -> Self {
        Self { messages, users }
    }

    /// Full visible history with `other`, oldest first.
    pub async fn history(&self, current: Uuid, other: Uuid) -> AppResult<Vec<MessageResponse>> {
        let profiles = self.resolve_pair(current, other).await?;
        let messages = self.messages.find_visible_between(current, other, current).await?;
        Ok(map_with_profiles(&messages, &profiles))
    }

    /// One page of the history with `other`, newest first.
    pub async fn history_page(
        &self,
        current: Uuid,
        other: Uuid,
        page: i64,
        size: i64,
    ) -> AppResult<Vec<MessageResponse>> {
        let profiles = self.resolve_pair(current, other).await?;
        let (limit, offset) = page_window(page, size);
        let messages = self
            .messages
            .find_visible_between_page(current, other, current, limit, offset)
            .await?;
        Ok(map_with_profiles(&messages, &profiles))
    }

    /// Most recent message visible to `current` in the pair, if any.
    pub async fn last_message(
        &self,
        current: Uuid,
        other: Uuid,
    ) -> AppResult<Option<MessageResponse>> {
        let profiles = self.resolve_pair(current, other).await?;
        let message = self
            .messages
            .find_last_visible_between(current, other, current)
            .await?;
        Ok(message
            .as_ref()
            .and_then(|m| profiles.get(&m.sender_id).map(|p| MessageResponse::from_message(m, p))))
    }

    pub async fn unread_count(&self, receiver: Uuid, sender: Uuid) -> AppResult<i64> {
        self.resolve_user(receiver).await?;
        self.resolve_user(sender).await?;
        self.messages.count_unread_from(receiver, sender).await
    }

    pub async fn unread_total(&self, receiver: Uuid) -> AppResult<i64> {
        self.resolve_user(receiver).await?;
        self.messages.count_unread_total(receiver).await
    }

    /// All unread messages addressed to `receiver`, oldest first, across all
    /// senders.
    pub async fn unread_messages(&self, receiver: Uuid) -> AppResult<Vec<MessageResponse>> {
        self.resolve_user(receiver).await?;
        let messages = self.messages.find_unread(receiver).await?;
        let profiles = self.sender_profiles(&messages).await?;
        Ok(map_with_profiles(&messages, &profiles))
    }

    /// Case-insensitive substring search over everything `user` may see,
    /// newest first.
    pub async fn search(
        &self,
        user: Uuid,
        keyword: &str,
        page: i64,
        size: i64,
    ) -> AppResult<Vec<MessageResponse>> {
        self.resolve_user(user).await?;
        let (limit, offset) = page_window(page, size);
        let messages = self.messages.search_visible(user, keyword, limit, offset).await?;
        let profiles = self.sender_profiles(&messages).await?;
        Ok(map_with_profiles(&messages, &profiles))
    }

    /// Media attachments of one kind exchanged with `other`.
    pub async fn media_messages(
        &self,
        current: Uuid,
        other: Uuid,
        media_type: MessageType,
    ) -> AppResult<Vec<MessageResponse>> {
        if !media_type.is_media() {
            return Err(AppError::InvalidOperation(format!(
                "{} is not a media type",
                media_type
            )));
        }
        let profiles = self.resolve_pair(current, other).await?;
        let messages = self
            .messages
            .find_media_between(current, other, current, media_type)
            .await?;
        Ok(map_with_profiles(&messages, &profiles))
    }

    /// File attachments exchanged with `other`.
    pub async fn file_messages(
        &self,
        current: Uuid,
        other: Uuid,
    ) -> AppResult<Vec<MessageResponse>> {
        let profiles = self.resolve_pair(current, other).await?;
        let messages = self.messages.find_file_between(current, other, current).await?;
        Ok(map_with_profiles(&messages, &profiles))
    }

    async fn resolve_user(&self, user_id: Uuid) -> AppResult<UserProfile> {
        self.users
            .find_profile(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {} not found", user_id)))
    }

    async fn resolve_pair(
        &self,
        current: Uuid,
        other: Uuid,
    ) -> AppResult<HashMap<Uuid, UserProfile>> {
        let current_profile = self.resolve_user(current).await?;
        let other_profile = self.resolve_user(other).await?;
        Ok(HashMap::from([
            (current, current_profile),
            (other, other_profile),
        ]))
    }

    /// Profiles for every distinct sender in `messages`. Senders are
    /// guaranteed present by the foreign key, so a miss just drops that
    /// message from the mapped output.
    async fn sender_profiles(
        &self,
        messages: &[Message],
    ) -> AppResult<HashMap<Uuid, UserProfile>> {
        let mut profiles = HashMap::new();
        for message in messages {
            if profiles.contains_key(&message.sender_id) {
                continue;
            }
            if let Some(profile) = self.users.find_profile(message.sender_id).await? {
                profiles.insert(message.sender_id, profile);
            }
        }
        Ok(profiles)
    }
}

fn map_with_profiles(
    messages: &[Message],
    profiles: &HashMap<Uuid, UserProfile>,
) -> Vec<MessageResponse> {
    messages
        .iter()
        .filter_map(|m| {
            profiles
                .get(&m.sender_id)
                .map(|p| MessageResponse::from_message(m, p))
        })
        .collect()
}

/// Normalizes paging input: non-positive sizes fall back to the default,
/// oversized requests clamp to the cap, negative pages read as the first.
fn page_window(page: i64, size: i64) -> (i64, i64) {
    let limit = if size <= 0 {
        DEFAULT_PAGE_SIZE
    } else {
        size.min(MAX_PAGE_SIZE)
    };
    let page = page.max(0);
    (limit, page.saturating_mul(limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn page_window_defaults_and_clamps() {
        assert_eq!(page_window(0, 0), (DEFAULT_PAGE_SIZE, 0));
        assert_eq!(page_window(0, -5), (DEFAULT_PAGE_SIZE, 0));
        assert_eq!(page_window(2, 10), (10, 20));
        assert_eq!(page_window(1, 500), (MAX_PAGE_SIZE, MAX_PAGE_SIZE));
        assert_eq!(page_window(-3, 10), (10, 0));
    }

    #[test]
    fn page_window_saturates_instead_of_overflowing() {
        let (limit, offset) = page_window(i64::MAX, 10);
        assert_eq!(limit, 10);
        assert_eq!(offset, i64::MAX);
    }

    #[test]
    fn mapping_skips_messages_without_a_resolved_sender() {
        let known_sender = Uuid::new_v4();
        let unknown_sender = Uuid::new_v4();
        let receiver = Uuid::new_v4();

        let base = Message {
            id: Uuid::new_v4(),
            sender_id: known_sender,
            receiver_id: receiver,
            content: "hi".to_string(),
            media_url: None,
            message_type: MessageType::Text,
            is_read: false,
            is_deleted_for_sender: false,
            is_deleted_for_receiver: false,
            created_at: Utc::now(),
        };
        let mut orphan = base.clone();
        orphan.id = Uuid::new_v4();
        orphan.sender_id = unknown_sender;

        let profiles = HashMap::from([(
            known_sender,
            UserProfile {
                id: known_sender,
                username: "alice".to_string(),
                avatar_url: None,
            },
        )]);

        let mapped = map_with_profiles(&[base, orphan], &profiles);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].sender_name, "alice");
    }
}
