//! Read-side access predicate for request detail views.

use std::collections::HashSet;

use crate::domain::request::PurchaseRequest;
use crate::domain::user::{User, UserId};

/// A user may read a request if they are the pending approver, the original
/// requester, a past actor in its audit log, or hold an oversight role. Pure
/// predicate; callers map a `false` result to a forbidden outcome, never to
/// not-found.
pub fn can_view(user: &User, request: &PurchaseRequest, audit_actors: &HashSet<UserId>) -> bool {
    request.current_approver_id == Some(user.id)
        || request.requester_id == user.id
        || audit_actors.contains(&user.id)
        || user.role.is_oversight()
}
