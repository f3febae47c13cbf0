// src/db/notification_repo.rs

use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    common::{error::AppError, pagination::PageRequest},
    models::notification::{Notification, NotificationDraft},
};

#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, user_id: Uuid, draft: &NotificationDraft) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, title, body, kind, link)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user_id)
        .bind(&draft.title)
        .bind(&draft.body)
        .bind(draft.kind)
        .bind(draft.link.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // Só as notificações do próprio usuário, mais novas primeiro
    pub async fn list_for(&self, user_id: Uuid, page: PageRequest) -> Result<Vec<Notification>, AppError> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn count_for(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM notifications WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<Option<Notification>, AppError> {
        let row = sqlx::query_as::<_, Notification>(
            "UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2 RETURNING *",
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // Tokens de push dos destinatários que têm um registrado
    pub async fn device_tokens(&self, user_ids: &[Uuid]) -> Result<Vec<String>, AppError> {
        let tokens = sqlx::query_scalar::<_, String>(
            r#"
            SELECT device_token FROM users
            WHERE id = ANY($1) AND device_token IS NOT NULL AND device_token <> ''
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(tokens)
    }
}
