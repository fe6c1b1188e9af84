use chrono::{DateTime, Utc};
use sqlx::Row;

use reqflow_core::domain::user::UserId;
use reqflow_core::notify::NotificationDraft;

use super::{parse_datetime, NotificationRepository, RepositoryError};
use crate::DbPool;

/// A delivered notification row; lifecycle is independent of the request
/// that produced it.
#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub id: i64,
    pub user_id: UserId,
    pub message: String,
    pub link: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

pub struct SqlNotificationRepository {
    pool: DbPool,
}

impl SqlNotificationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_notification(row: &sqlx::sqlite::SqliteRow) -> Result<Notification, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let user_id: i64 =
        row.try_get("user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let message: String =
        row.try_get("message").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let link: String = row.try_get("link").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let is_read: i64 =
        row.try_get("is_read").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Notification {
        id,
        user_id: UserId(user_id),
        message,
        link,
        is_read: is_read != 0,
        created_at: parse_datetime(&created_at_str),
    })
}

#[async_trait::async_trait]
impl NotificationRepository for SqlNotificationRepository {
    async fn insert(&self, draft: &NotificationDraft) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO notifications (user_id, message, link, is_read, created_at)
             VALUES (?1, ?2, ?3, 0, ?4)",
        )
        .bind(draft.target.0)
        .bind(&draft.message)
        .bind(&draft.link)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_for_user(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, user_id, message, link, is_read, created_at
             FROM notifications WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )
        .bind(user.0)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_notification).collect()
    }

    async fn mark_read(&self, id: i64) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use reqflow_core::domain::user::UserId;
    use reqflow_core::notify::NotificationDraft;

    use super::SqlNotificationRepository;
    use crate::repositories::{NotificationRepository, SqlUserRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    fn draft(target: UserId, message: &str) -> NotificationDraft {
        NotificationDraft {
            target,
            message: message.to_string(),
            link: "/dashboard/requests/1".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_list_and_mark_read() {
        let pool = setup().await;
        let users = SqlUserRepository::new(pool.clone());
        let user = users
            .create("Dana Flores", reqflow_core::domain::user::Role::DirectManager, None)
            .await
            .expect("create user");

        let repo = SqlNotificationRepository::new(pool);
        repo.insert(&draft(user.id, "first")).await.expect("insert");
        repo.insert(&draft(user.id, "second")).await.expect("insert");

        let listed = repo.list_for_user(user.id, 10).await.expect("list");
        assert_eq!(listed.len(), 2);
        assert!(listed.iter().all(|n| !n.is_read));

        repo.mark_read(listed[0].id).await.expect("mark read");
        let relisted = repo.list_for_user(user.id, 10).await.expect("list");
        assert!(relisted.iter().any(|n| n.id == listed[0].id && n.is_read));
    }

    #[tokio::test]
    async fn list_respects_limit() {
        let pool = setup().await;
        let users = SqlUserRepository::new(pool.clone());
        let user = users
            .create("Dana Flores", reqflow_core::domain::user::Role::DirectManager, None)
            .await
            .expect("create user");

        let repo = SqlNotificationRepository::new(pool);
        for n in 0..5 {
            repo.insert(&draft(user.id, &format!("message {n}"))).await.expect("insert");
        }

        let listed = repo.list_for_user(user.id, 3).await.expect("list");
        assert_eq!(listed.len(), 3);
    }
}
