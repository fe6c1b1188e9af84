//! Next-approver resolution.
//!
//! Routing is role-identity-based only: there is no branching on request
//! content such as amount thresholds. Role holders are looked up through an
//! injected [`RoleDirectory`] so the resolver stays pure and testable.

use std::collections::HashMap;

use crate::audit::WorkflowAction;
use crate::domain::request::RequestStatus;
use crate::domain::user::{Role, User, UserId};
use crate::errors::WorkflowError;

/// Lookup capability for the single active holder of a role.
///
/// Uniqueness of elevated-role holders is a data invariant enforced at the
/// seed boundary; with duplicate holders the pick is unspecified.
pub trait RoleDirectory {
    fn lookup_by_role(&self, role: Role) -> Option<&User>;
}

/// Immutable role-to-holder map, loaded once per operation. The first holder
/// offered for a role wins, so callers feeding ordered rows get
/// deterministic behavior even on corrupt data.
#[derive(Clone, Debug, Default)]
pub struct DirectorySnapshot {
    holders: HashMap<Role, User>,
}

impl DirectorySnapshot {
    pub fn new(users: impl IntoIterator<Item = User>) -> Self {
        let mut holders = HashMap::new();
        for user in users {
            holders.entry(user.role).or_insert(user);
        }
        Self { holders }
    }
}

impl RoleDirectory for DirectorySnapshot {
    fn lookup_by_role(&self, role: Role) -> Option<&User> {
        self.holders.get(&role)
    }
}

/// Where a transition lands: the new status and the single user responsible
/// next, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resolution {
    pub next_status: RequestStatus,
    pub next_approver: Option<UserId>,
}

/// Initial routing at submission time: to the requester's direct manager if
/// one exists, otherwise auto-approved.
pub fn resolve_submission(manager_id: Option<UserId>) -> Resolution {
    match manager_id {
        Some(approver) => {
            Resolution { next_status: RequestStatus::Pending, next_approver: Some(approver) }
        }
        None => Resolution { next_status: RequestStatus::Approved, next_approver: None },
    }
}

/// Terminal rejection; legal for the current approver in any status.
pub fn resolve_rejection() -> Resolution {
    Resolution { next_status: RequestStatus::Rejected, next_approver: None }
}

/// Price-quote detour: only the finance manager may send a request back to
/// procurement, and only when it is not already waiting for quotes.
pub fn resolve_quote_request(
    actor: &User,
    status: RequestStatus,
    directory: &dyn RoleDirectory,
) -> Result<Resolution, WorkflowError> {
    if actor.role != Role::FinanceManager {
        return Err(WorkflowError::PermissionDenied { actor: actor.id });
    }
    if status == RequestStatus::WaitingForQuotes {
        return Err(WorkflowError::InvalidState { action: WorkflowAction::RequestQuotes, status });
    }

    let procurement = directory
        .lookup_by_role(Role::Procurement)
        .ok_or(WorkflowError::NoSuchRoleHolder(Role::Procurement))?;

    Ok(Resolution {
        next_status: RequestStatus::WaitingForQuotes,
        next_approver: Some(procurement.id),
    })
}

/// Return from the detour: procurement hands the priced request straight to
/// the finance manager.
pub fn resolve_quote_submission(
    actor: &User,
    status: RequestStatus,
    directory: &dyn RoleDirectory,
) -> Result<Resolution, WorkflowError> {
    if actor.role != Role::Procurement {
        return Err(WorkflowError::PermissionDenied { actor: actor.id });
    }
    if status != RequestStatus::WaitingForQuotes {
        return Err(WorkflowError::InvalidState { action: WorkflowAction::SubmitQuotes, status });
    }

    let finance = directory
        .lookup_by_role(Role::FinanceManager)
        .ok_or(WorkflowError::NoSuchRoleHolder(Role::FinanceManager))?;

    Ok(Resolution { next_status: RequestStatus::Pending, next_approver: Some(finance.id) })
}

/// Normal chain advance: the approver's role determines the next role in the
/// fixed sequence. End of chain, or a next role with no holder, finishes the
/// request as approved.
pub fn resolve_approval(actor: &User, directory: &dyn RoleDirectory) -> Resolution {
    let Some(next_role) = actor.role.next_in_chain() else {
        return Resolution { next_status: RequestStatus::Approved, next_approver: None };
    };

    match directory.lookup_by_role(next_role) {
        Some(holder) => {
            Resolution { next_status: RequestStatus::Pending, next_approver: Some(holder.id) }
        }
        None => Resolution { next_status: RequestStatus::Approved, next_approver: None },
    }
}

#[cfg(test)]
mod tests {
    use crate::domain::request::RequestStatus;
    use crate::domain::user::{Role, User, UserId};
    use crate::errors::WorkflowError;

    use super::{
        resolve_approval, resolve_quote_request, resolve_quote_submission, resolve_rejection,
        resolve_submission, DirectorySnapshot, RoleDirectory,
    };

    fn user(id: i64, role: Role) -> User {
        User { id: UserId(id), name: format!("user-{id}"), role, manager_id: None }
    }

    fn full_directory() -> DirectorySnapshot {
        DirectorySnapshot::new(vec![
            user(2, Role::DirectManager),
            user(3, Role::Procurement),
            user(4, Role::AdminManager),
            user(5, Role::FinanceManager),
            user(6, Role::Executive),
        ])
    }

    #[test]
    fn submission_routes_to_manager_when_present() {
        let routed = resolve_submission(Some(UserId(2)));
        assert_eq!(routed.next_status, RequestStatus::Pending);
        assert_eq!(routed.next_approver, Some(UserId(2)));
    }

    #[test]
    fn submission_without_manager_auto_approves() {
        let routed = resolve_submission(None);
        assert_eq!(routed.next_status, RequestStatus::Approved);
        assert_eq!(routed.next_approver, None);
    }

    #[test]
    fn rejection_is_terminal_with_no_approver() {
        let routed = resolve_rejection();
        assert_eq!(routed.next_status, RequestStatus::Rejected);
        assert_eq!(routed.next_approver, None);
    }

    #[test]
    fn approvals_visit_roles_in_chain_order() {
        let directory = full_directory();
        let mut approver = user(2, Role::DirectManager);
        let mut visited = Vec::new();

        loop {
            let routed = resolve_approval(&approver, &directory);
            match routed.next_approver {
                Some(next) => {
                    visited.push(next);
                    let holder = directory
                        .lookup_by_role(approver.role.next_in_chain().expect("next role"))
                        .expect("holder");
                    approver = holder.clone();
                }
                None => {
                    assert_eq!(routed.next_status, RequestStatus::Approved);
                    break;
                }
            }
        }

        assert_eq!(visited, vec![UserId(3), UserId(4), UserId(5), UserId(6)]);
    }

    #[test]
    fn missing_next_role_holder_finishes_as_approved() {
        let directory = DirectorySnapshot::new(vec![user(3, Role::Procurement)]);
        let routed = resolve_approval(&user(3, Role::Procurement), &directory);
        assert_eq!(routed.next_status, RequestStatus::Approved);
        assert_eq!(routed.next_approver, None);
    }

    #[test]
    fn quote_request_requires_finance_manager() {
        let directory = full_directory();
        let error =
            resolve_quote_request(&user(4, Role::AdminManager), RequestStatus::Pending, &directory)
                .expect_err("non-finance actor");
        assert!(matches!(error, WorkflowError::PermissionDenied { actor: UserId(4) }));
    }

    #[test]
    fn quote_request_rejected_while_already_waiting() {
        let directory = full_directory();
        let error = resolve_quote_request(
            &user(5, Role::FinanceManager),
            RequestStatus::WaitingForQuotes,
            &directory,
        )
        .expect_err("already waiting");
        assert!(matches!(error, WorkflowError::InvalidState { .. }));
    }

    #[test]
    fn quote_request_routes_to_procurement_holder() {
        let directory = full_directory();
        let routed =
            resolve_quote_request(&user(5, Role::FinanceManager), RequestStatus::Pending, &directory)
                .expect("resolve");
        assert_eq!(routed.next_status, RequestStatus::WaitingForQuotes);
        assert_eq!(routed.next_approver, Some(UserId(3)));
    }

    #[test]
    fn quote_request_fails_without_procurement_holder() {
        let directory = DirectorySnapshot::new(vec![user(5, Role::FinanceManager)]);
        let error =
            resolve_quote_request(&user(5, Role::FinanceManager), RequestStatus::Pending, &directory)
                .expect_err("no procurement user");
        assert_eq!(error, WorkflowError::NoSuchRoleHolder(Role::Procurement));
    }

    #[test]
    fn quote_submission_returns_to_finance_manager() {
        let directory = full_directory();
        let routed = resolve_quote_submission(
            &user(3, Role::Procurement),
            RequestStatus::WaitingForQuotes,
            &directory,
        )
        .expect("resolve");
        assert_eq!(routed.next_status, RequestStatus::Pending);
        assert_eq!(routed.next_approver, Some(UserId(5)));
    }

    #[test]
    fn quote_submission_needs_procurement_role_and_waiting_status() {
        let directory = full_directory();

        let wrong_role = resolve_quote_submission(
            &user(2, Role::DirectManager),
            RequestStatus::WaitingForQuotes,
            &directory,
        )
        .expect_err("wrong role");
        assert!(matches!(wrong_role, WorkflowError::PermissionDenied { .. }));

        let wrong_status = resolve_quote_submission(
            &user(3, Role::Procurement),
            RequestStatus::Pending,
            &directory,
        )
        .expect_err("wrong status");
        assert!(matches!(wrong_status, WorkflowError::InvalidState { .. }));
    }

    #[test]
    fn snapshot_keeps_first_holder_per_role() {
        let directory = DirectorySnapshot::new(vec![
            user(10, Role::Procurement),
            user(11, Role::Procurement),
        ]);
        assert_eq!(
            directory.lookup_by_role(Role::Procurement).map(|u| u.id),
            Some(UserId(10))
        );
    }
}
