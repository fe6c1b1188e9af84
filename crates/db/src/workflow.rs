//! Transactional request state machine.
//!
//! Each accepted action is one all-or-nothing transaction: the conditional
//! status/approver update and the audit-log append either both land or
//! neither does. The update is a compare-and-swap on the status and approver
//! the planner observed, so two racing calls cannot both advance the same
//! request; the loser gets [`WorkflowError::Conflict`]. Notifications are
//! dispatched after commit and never affect the outcome.

use std::collections::HashSet;

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use reqflow_core::access;
use reqflow_core::audit::AuditLogEntry;
use reqflow_core::domain::quote_slate::QuoteSlate;
use reqflow_core::domain::request::{PurchaseRequest, RequestId, RequestItem};
use reqflow_core::domain::user::UserId;
use reqflow_core::errors::WorkflowError;
use reqflow_core::notify::{self, NotificationDraft};
use reqflow_core::workflow::{self, ReviewAction, TransitionPlan};

use crate::repositories::audit_log::action_as_str;
use crate::repositories::request::status_as_str;
use crate::repositories::{
    AuditLogRepository, Notification, NotificationRepository, RepositoryError, RequestRepository,
    SqlAuditLogRepository, SqlNotificationRepository, SqlRequestRepository, SqlUserRepository,
    UserRepository,
};
use crate::DbPool;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(error: sqlx::Error) -> Self {
        ServiceError::Repository(RepositoryError::Database(error))
    }
}

/// Validated creation payload. Field-level form validation lives in the
/// calling layer; these are the checks the engine will not proceed without.
#[derive(Clone, Debug)]
pub struct NewRequestInput {
    pub title: String,
    pub description: Option<String>,
    pub items: Vec<RequestItem>,
}

impl NewRequestInput {
    fn validate(&self) -> Result<(), WorkflowError> {
        if self.title.trim().is_empty() {
            return Err(WorkflowError::Validation("title must not be empty".to_string()));
        }
        if self.items.is_empty() {
            return Err(WorkflowError::Validation("at least one item is required".to_string()));
        }
        for (index, item) in self.items.iter().enumerate() {
            if item.name.trim().is_empty() {
                return Err(WorkflowError::Validation(format!(
                    "item #{} is missing a name",
                    index + 1
                )));
            }
            if item.quantity == 0 {
                return Err(WorkflowError::Validation(format!(
                    "item #{} must have a quantity of at least 1",
                    index + 1
                )));
            }
            if let Some(price) = item.price {
                if price.is_sign_negative() {
                    return Err(WorkflowError::Validation(format!(
                        "item #{} must not have a negative price",
                        index + 1
                    )));
                }
            }
        }
        Ok(())
    }
}

/// A request plus its audit trail, as shown on the detail view.
#[derive(Clone, Debug)]
pub struct RequestDetail {
    pub request: PurchaseRequest,
    pub log: Vec<AuditLogEntry>,
}

pub struct WorkflowService {
    pool: DbPool,
    users: SqlUserRepository,
    requests: SqlRequestRepository,
    audit: SqlAuditLogRepository,
    notifications: SqlNotificationRepository,
}

impl WorkflowService {
    pub fn new(pool: DbPool) -> Self {
        Self {
            users: SqlUserRepository::new(pool.clone()),
            requests: SqlRequestRepository::new(pool.clone()),
            audit: SqlAuditLogRepository::new(pool.clone()),
            notifications: SqlNotificationRepository::new(pool.clone()),
            pool,
        }
    }

    /// Create a request, route it to its first approver, and write the
    /// SUBMIT audit entry, all in one transaction.
    pub async fn submit_request(
        &self,
        actor_id: UserId,
        input: NewRequestInput,
    ) -> Result<RequestId, ServiceError> {
        input.validate()?;
        let correlation_id = Uuid::new_v4().to_string();

        let actor =
            self.users.find_by_id(actor_id).await?.ok_or(WorkflowError::Unauthorized)?;
        let plan = workflow::plan_submission(&actor, &input.items);
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO requests (requester_id, title, description, total_amount, status,
                                   current_approver_id, quote_data, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, '[]', ?7, ?7)
             RETURNING id",
        )
        .bind(actor.id.0)
        .bind(&input.title)
        .bind(&input.description)
        .bind(plan.total_amount.to_string())
        .bind(status_as_str(plan.resolution.next_status))
        .bind(plan.resolution.next_approver.map(|id| id.0))
        .bind(&now)
        .fetch_one(&mut *tx)
        .await?;

        for item in &input.items {
            sqlx::query(
                "INSERT INTO request_items (request_id, name, quantity, price)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .bind(id)
            .bind(&item.name)
            .bind(i64::from(item.quantity))
            .bind(item.price.map(|p| p.to_string()))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "INSERT INTO request_logs (request_id, actor_id, action, comment, created_at)
             VALUES (?1, ?2, 'SUBMIT', ?3, ?4)",
        )
        .bind(id)
        .bind(actor.id.0)
        .bind(&plan.comment)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let request_id = RequestId(id);
        tracing::info!(
            event_name = "workflow.request_submitted",
            correlation_id = %correlation_id,
            request_id = request_id.0,
            actor_id = actor.id.0,
            status = ?plan.resolution.next_status,
            "purchase request submitted"
        );

        let drafts = notify::drafts_for_submission(request_id, &input.title, &plan.resolution);
        self.dispatch(&correlation_id, &drafts).await;

        Ok(request_id)
    }

    /// Apply an approve / reject / quote-request action by the current
    /// approver.
    pub async fn transition(
        &self,
        request_id: RequestId,
        actor_id: UserId,
        action: ReviewAction,
        comment: Option<String>,
    ) -> Result<(), ServiceError> {
        let correlation_id = Uuid::new_v4().to_string();

        let actor =
            self.users.find_by_id(actor_id).await?.ok_or(WorkflowError::Unauthorized)?;
        let request =
            self.requests.find_by_id(request_id).await?.ok_or(WorkflowError::NotFound)?;
        let directory = self.users.load_directory().await?;

        let plan = workflow::plan_review(&request, &actor, action, comment, &directory)?;
        self.execute_transition(request_id, actor.id, &plan).await?;

        tracing::info!(
            event_name = "workflow.transition_applied",
            correlation_id = %correlation_id,
            request_id = request_id.0,
            actor_id = actor.id.0,
            action = ?plan.action,
            next_status = ?plan.next_status,
            "request transition applied"
        );

        self.dispatch(&correlation_id, &plan.notifications).await;
        Ok(())
    }

    /// Procurement uploads the competing quote slate, returning the request
    /// to the finance manager with the derived total.
    pub async fn submit_quotes(
        &self,
        request_id: RequestId,
        actor_id: UserId,
        slate: QuoteSlate,
    ) -> Result<(), ServiceError> {
        let correlation_id = Uuid::new_v4().to_string();

        let actor =
            self.users.find_by_id(actor_id).await?.ok_or(WorkflowError::Unauthorized)?;
        let request =
            self.requests.find_by_id(request_id).await?.ok_or(WorkflowError::NotFound)?;
        let directory = self.users.load_directory().await?;

        let plan = workflow::plan_quote_submission(&request, &actor, slate, &directory)?;
        self.execute_transition(request_id, actor.id, &plan).await?;

        tracing::info!(
            event_name = "workflow.quotes_submitted",
            correlation_id = %correlation_id,
            request_id = request_id.0,
            actor_id = actor.id.0,
            "price quotes recorded"
        );

        self.dispatch(&correlation_id, &plan.notifications).await;
        Ok(())
    }

    /// Requests currently waiting on the given user.
    pub async fn list_inbox(&self, user: UserId) -> Result<Vec<PurchaseRequest>, ServiceError> {
        Ok(self.requests.list_inbox(user).await?)
    }

    /// Requests the user has acted on but does not own.
    pub async fn list_archive(&self, user: UserId) -> Result<Vec<PurchaseRequest>, ServiceError> {
        Ok(self.requests.list_archive(user).await?)
    }

    /// Detail view with access control: forbidden is distinguishable from
    /// not-found.
    pub async fn get_detail(
        &self,
        request_id: RequestId,
        user_id: UserId,
    ) -> Result<RequestDetail, ServiceError> {
        let user = self.users.find_by_id(user_id).await?.ok_or(WorkflowError::Unauthorized)?;
        let request =
            self.requests.find_by_id(request_id).await?.ok_or(WorkflowError::NotFound)?;

        let log = self.audit.list_for_request(request_id).await?;
        let actors: HashSet<UserId> = log.iter().map(|entry| entry.actor_id).collect();

        if !access::can_view(&user, &request, &actors) {
            return Err(WorkflowError::PermissionDenied { actor: user.id }.into());
        }

        Ok(RequestDetail { request, log })
    }

    pub async fn list_notifications(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<Notification>, ServiceError> {
        Ok(self.notifications.list_for_user(user, limit).await?)
    }

    pub async fn mark_notification_read(&self, id: i64) -> Result<(), ServiceError> {
        Ok(self.notifications.mark_read(id).await?)
    }

    /// One transaction: compare-and-swap the request row against the state
    /// the plan was computed from, then append the audit entry. Zero
    /// affected rows means another actor got there first.
    async fn execute_transition(
        &self,
        request_id: RequestId,
        actor_id: UserId,
        plan: &TransitionPlan,
    ) -> Result<(), ServiceError> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;

        let affected = match &plan.quote_update {
            Some(update) => {
                let quote_json = serde_json::to_string(&update.slate)
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                sqlx::query(
                    "UPDATE requests
                     SET status = ?1, current_approver_id = ?2, updated_at = ?3,
                         quote_data = ?4, total_amount = ?5
                     WHERE id = ?6 AND status = ?7 AND current_approver_id = ?8",
                )
                .bind(status_as_str(plan.next_status))
                .bind(plan.next_approver.map(|id| id.0))
                .bind(&now)
                .bind(quote_json)
                .bind(update.total_amount.to_string())
                .bind(request_id.0)
                .bind(status_as_str(plan.expected_status))
                .bind(plan.expected_approver.0)
                .execute(&mut *tx)
                .await?
                .rows_affected()
            }
            None => {
                sqlx::query(
                    "UPDATE requests
                     SET status = ?1, current_approver_id = ?2, updated_at = ?3
                     WHERE id = ?4 AND status = ?5 AND current_approver_id = ?6",
                )
                .bind(status_as_str(plan.next_status))
                .bind(plan.next_approver.map(|id| id.0))
                .bind(&now)
                .bind(request_id.0)
                .bind(status_as_str(plan.expected_status))
                .bind(plan.expected_approver.0)
                .execute(&mut *tx)
                .await?
                .rows_affected()
            }
        };

        if affected == 0 {
            // Stale snapshot; dropping the transaction rolls it back.
            return Err(WorkflowError::Conflict.into());
        }

        sqlx::query(
            "INSERT INTO request_logs (request_id, actor_id, action, comment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(request_id.0)
        .bind(actor_id.0)
        .bind(action_as_str(plan.action))
        .bind(&plan.comment)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Best-effort, post-commit. A failed insert is logged and skipped; it
    /// never rolls back or fails the transition.
    async fn dispatch(&self, correlation_id: &str, drafts: &[NotificationDraft]) {
        for draft in drafts {
            if let Err(error) = self.notifications.insert(draft).await {
                tracing::warn!(
                    event_name = "workflow.notification_failed",
                    correlation_id,
                    target = draft.target.0,
                    error = %error,
                    "notification dispatch failed"
                );
            }
        }
    }
}
