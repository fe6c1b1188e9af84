use thiserror::Error;

use crate::audit::WorkflowAction;
use crate::domain::request::RequestStatus;
use crate::domain::user::{Role, UserId};

/// Failure taxonomy of the workflow engine. Every precondition violation is
/// a distinct variant so callers can render an appropriate message; in
/// particular a forbidden read (`PermissionDenied`) is distinguishable from
/// a missing request (`NotFound`).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("no authenticated actor")]
    Unauthorized,
    #[error("request not found")]
    NotFound,
    #[error("user {actor} is not authorized to act on this request")]
    PermissionDenied { actor: UserId },
    #[error("action {action:?} is not legal while the request is {status:?}")]
    InvalidState { action: WorkflowAction, status: RequestStatus },
    #[error("no user holds role {0:?}")]
    NoSuchRoleHolder(Role),
    #[error("request was modified concurrently, reload and retry")]
    Conflict,
    #[error("invalid payload: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use crate::audit::WorkflowAction;
    use crate::domain::request::RequestStatus;
    use crate::domain::user::{Role, UserId};

    use super::WorkflowError;

    #[test]
    fn messages_name_the_offending_detail() {
        let denied = WorkflowError::PermissionDenied { actor: UserId(7) };
        assert!(denied.to_string().contains('7'));

        let invalid = WorkflowError::InvalidState {
            action: WorkflowAction::RequestQuotes,
            status: RequestStatus::WaitingForQuotes,
        };
        assert!(invalid.to_string().contains("RequestQuotes"));

        let missing = WorkflowError::NoSuchRoleHolder(Role::Procurement);
        assert!(missing.to_string().contains("Procurement"));
    }

    #[test]
    fn forbidden_and_not_found_are_distinct() {
        assert_ne!(
            WorkflowError::PermissionDenied { actor: UserId(1) },
            WorkflowError::NotFound
        );
    }
}
