use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use reqflow_core::audit::AuditLogEntry;
use reqflow_core::domain::request::{PurchaseRequest, RequestId};
use reqflow_core::domain::user::{Role, User, UserId};
use reqflow_core::notify::NotificationDraft;
use reqflow_core::routing::DirectorySnapshot;

pub mod audit_log;
pub mod notification;
pub mod request;
pub mod user;

pub use audit_log::SqlAuditLogRepository;
pub use notification::{Notification, SqlNotificationRepository};
pub use request::SqlRequestRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    async fn find_by_role(&self, role: Role) -> Result<Option<User>, RepositoryError>;
    /// One pass over the user table, first holder per role.
    async fn load_directory(&self) -> Result<DirectorySnapshot, RepositoryError>;
}

#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn find_by_id(&self, id: RequestId) -> Result<Option<PurchaseRequest>, RepositoryError>;
    async fn list_inbox(&self, user: UserId) -> Result<Vec<PurchaseRequest>, RepositoryError>;
    async fn list_archive(&self, user: UserId) -> Result<Vec<PurchaseRequest>, RepositoryError>;
}

#[async_trait]
pub trait AuditLogRepository: Send + Sync {
    async fn list_for_request(
        &self,
        request: RequestId,
    ) -> Result<Vec<AuditLogEntry>, RepositoryError>;
    async fn actor_ids(&self, request: RequestId) -> Result<HashSet<UserId>, RepositoryError>;
    async fn count_for_request(&self, request: RequestId) -> Result<i64, RepositoryError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, draft: &NotificationDraft) -> Result<(), RepositoryError>;
    async fn list_for_user(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, RepositoryError>;
    async fn mark_read(&self, id: i64) -> Result<(), RepositoryError>;
}

/// RFC 3339 column decode. A malformed timestamp falls back to now instead
/// of failing the row.
pub(crate) fn parse_datetime(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw).map(|dt| dt.with_timezone(&Utc)).unwrap_or_else(|_| Utc::now())
}
