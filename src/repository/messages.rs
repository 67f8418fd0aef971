use crate::error::AppResult;
use crate::models::{Message, MessageType, NewMessage};
use sqlx::PgPool;
use uuid::Uuid;

/// Durable store for direct messages. Pure persistence: predicate queries and
/// single-statement mutations, no validation and no notifications. Role and
/// policy checks belong to the service layer; the soft-delete statements
/// still carry the role match in their WHERE clause so a mismatched actor
/// updates zero rows instead of racing a read-check.
#[derive(Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new message, assigning id and created_at.
    pub async fn insert(&self, new: &NewMessage) -> AppResult<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            INSERT INTO messages (id, sender_id, receiver_id, content, media_url, message_type)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, sender_id, receiver_id, content, media_url, message_type,
                      is_read, is_deleted_for_sender, is_deleted_for_receiver, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(new.sender_id)
        .bind(new.receiver_id)
        .bind(&new.content)
        .bind(&new.media_url)
        .bind(new.message_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(message)
    }

    pub async fn find_by_id(&self, id: Uuid) -> AppResult<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, content, media_url, message_type,
                   is_read, is_deleted_for_sender, is_deleted_for_receiver, created_at
            FROM messages
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    /// All messages between the pair that `viewer` may see, oldest first.
    pub async fn find_visible_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
        viewer: Uuid,
    ) -> AppResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, content, media_url, message_type,
                   is_read, is_deleted_for_sender, is_deleted_for_receiver, created_at
            FROM messages
            WHERE ((sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1))
              AND ((sender_id = $3 AND is_deleted_for_sender = FALSE)
                OR (receiver_id = $3 AND is_deleted_for_receiver = FALSE))
            ORDER BY created_at ASC
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(viewer)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// One page of the pair's visible history, newest first.
    pub async fn find_visible_between_page(
        &self,
        user_a: Uuid,
        user_b: Uuid,
        viewer: Uuid,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, content, media_url, message_type,
                   is_read, is_deleted_for_sender, is_deleted_for_receiver, created_at
            FROM messages
            WHERE ((sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1))
              AND ((sender_id = $3 AND is_deleted_for_sender = FALSE)
                OR (receiver_id = $3 AND is_deleted_for_receiver = FALSE))
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(viewer)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    pub async fn find_last_visible_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
        viewer: Uuid,
    ) -> AppResult<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, content, media_url, message_type,
                   is_read, is_deleted_for_sender, is_deleted_for_receiver, created_at
            FROM messages
            WHERE ((sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1))
              AND ((sender_id = $3 AND is_deleted_for_sender = FALSE)
                OR (receiver_id = $3 AND is_deleted_for_receiver = FALSE))
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(viewer)
        .fetch_optional(&self.pool)
        .await?;

        Ok(message)
    }

    /// Unread from one sender. Messages the receiver soft-deleted no longer
    /// count against them.
    pub async fn count_unread_from(&self, receiver: Uuid, sender: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE receiver_id = $1 AND sender_id = $2
              AND is_read = FALSE
              AND is_deleted_for_receiver = FALSE
            "#,
        )
        .bind(receiver)
        .bind(sender)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn count_unread_total(&self, receiver: Uuid) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM messages
            WHERE receiver_id = $1
              AND is_read = FALSE
              AND is_deleted_for_receiver = FALSE
            "#,
        )
        .bind(receiver)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn find_unread(&self, receiver: Uuid) -> AppResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, content, media_url, message_type,
                   is_read, is_deleted_for_sender, is_deleted_for_receiver, created_at
            FROM messages
            WHERE receiver_id = $1
              AND is_read = FALSE
              AND is_deleted_for_receiver = FALSE
            ORDER BY created_at ASC
            "#,
        )
        .bind(receiver)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    /// Flips one message to read. Idempotent by construction.
    pub async fn mark_read(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("UPDATE messages SET is_read = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Bulk read transition for one direction, in a single statement so
    /// concurrent calls cannot lose updates. Returns the number of rows that
    /// actually transitioned.
    pub async fn mark_all_read_from(&self, receiver: Uuid, sender: Uuid) -> AppResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET is_read = TRUE
            WHERE receiver_id = $1 AND sender_id = $2 AND is_read = FALSE
            "#,
        )
        .bind(receiver)
        .bind(sender)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    /// Hides the message from the sender's view. The WHERE clause verifies
    /// the actor actually is the sender; zero rows affected means they were
    /// not.
    pub async fn soft_delete_for_sender(&self, id: Uuid, acting_user: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET is_deleted_for_sender = TRUE
            WHERE id = $1 AND sender_id = $2
            "#,
        )
        .bind(id)
        .bind(acting_user)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn soft_delete_for_receiver(&self, id: Uuid, acting_user: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE messages SET is_deleted_for_receiver = TRUE
            WHERE id = $1 AND receiver_id = $2
            "#,
        )
        .bind(id)
        .bind(acting_user)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Recall path: both deletion flags in one statement, guarded by the
    /// sender role.
    pub async fn soft_delete_for_both(&self, id: Uuid, sender: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE messages
            SET is_deleted_for_sender = TRUE, is_deleted_for_receiver = TRUE
            WHERE id = $1 AND sender_id = $2
            "#,
        )
        .bind(id)
        .bind(sender)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Case-insensitive substring search over everything `viewer` may see,
    /// newest first.
    pub async fn search_visible(
        &self,
        viewer: Uuid,
        keyword: &str,
        limit: i64,
        offset: i64,
    ) -> AppResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, content, media_url, message_type,
                   is_read, is_deleted_for_sender, is_deleted_for_receiver, created_at
            FROM messages
            WHERE ((sender_id = $1 AND is_deleted_for_sender = FALSE)
                OR (receiver_id = $1 AND is_deleted_for_receiver = FALSE))
              AND LOWER(content) LIKE '%' || LOWER($2) || '%'
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(viewer)
        .bind(keyword)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    pub async fn find_media_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
        viewer: Uuid,
        media_type: MessageType,
    ) -> AppResult<Vec<Message>> {
        let messages = sqlx::query_as::<_, Message>(
            r#"
            SELECT id, sender_id, receiver_id, content, media_url, message_type,
                   is_read, is_deleted_for_sender, is_deleted_for_receiver, created_at
            FROM messages
            WHERE ((sender_id = $1 AND receiver_id = $2) OR (sender_id = $2 AND receiver_id = $1))
              AND ((sender_id = $3 AND is_deleted_for_sender = FALSE)
                OR (receiver_id = $3 AND is_deleted_for_receiver = FALSE))
              AND message_type = $4
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_a)
        .bind(user_b)
        .bind(viewer)
        .bind(media_type)
        .fetch_all(&self.pool)
        .await?;

        Ok(messages)
    }

    pub async fn find_file_between(
        &self,
        user_a: Uuid,
        user_b: Uuid,
        viewer: Uuid,
    ) -> AppResult<Vec<Message>> {
        self.find_media_between(user_a, user_b, viewer, MessageType::File)
            .await
    }
}
