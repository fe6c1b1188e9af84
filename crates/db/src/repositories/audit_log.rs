use std::collections::HashSet;

use sqlx::Row;

use reqflow_core::audit::{AuditLogEntry, WorkflowAction};
use reqflow_core::domain::request::RequestId;
use reqflow_core::domain::user::UserId;

use super::{parse_datetime, AuditLogRepository, RepositoryError};
use crate::DbPool;

pub struct SqlAuditLogRepository {
    pool: DbPool,
}

impl SqlAuditLogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub fn action_as_str(action: WorkflowAction) -> &'static str {
    match action {
        WorkflowAction::Submit => "SUBMIT",
        WorkflowAction::Approve => "APPROVE",
        WorkflowAction::Reject => "REJECT",
        WorkflowAction::RequestQuotes => "REQUEST_QUOTES",
        WorkflowAction::SubmitQuotes => "SUBMIT_QUOTES",
    }
}

pub fn parse_action(raw: &str) -> Result<WorkflowAction, RepositoryError> {
    match raw {
        "SUBMIT" => Ok(WorkflowAction::Submit),
        "APPROVE" => Ok(WorkflowAction::Approve),
        "REJECT" => Ok(WorkflowAction::Reject),
        "REQUEST_QUOTES" => Ok(WorkflowAction::RequestQuotes),
        "SUBMIT_QUOTES" => Ok(WorkflowAction::SubmitQuotes),
        other => Err(RepositoryError::Decode(format!("unknown audit action `{other}`"))),
    }
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Result<AuditLogEntry, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let request_id: i64 =
        row.try_get("request_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let actor_id: i64 =
        row.try_get("actor_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let action_str: String =
        row.try_get("action").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comment: String =
        row.try_get("comment").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(AuditLogEntry {
        id,
        request_id: RequestId(request_id),
        actor_id: UserId(actor_id),
        action: parse_action(&action_str)?,
        comment,
        created_at: parse_datetime(&created_at_str),
    })
}

#[async_trait::async_trait]
impl AuditLogRepository for SqlAuditLogRepository {
    async fn list_for_request(
        &self,
        request: RequestId,
    ) -> Result<Vec<AuditLogEntry>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, request_id, actor_id, action, comment, created_at
             FROM request_logs WHERE request_id = ?1 ORDER BY id",
        )
        .bind(request.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_entry).collect()
    }

    async fn actor_ids(&self, request: RequestId) -> Result<HashSet<UserId>, RepositoryError> {
        let rows =
            sqlx::query("SELECT DISTINCT actor_id FROM request_logs WHERE request_id = ?1")
                .bind(request.0)
                .fetch_all(&self.pool)
                .await?;

        rows.iter()
            .map(|row| {
                row.try_get::<i64, _>("actor_id")
                    .map(UserId)
                    .map_err(|e| RepositoryError::Decode(e.to_string()))
            })
            .collect()
    }

    async fn count_for_request(&self, request: RequestId) -> Result<i64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(1) FROM request_logs WHERE request_id = ?1")
                .bind(request.0)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
