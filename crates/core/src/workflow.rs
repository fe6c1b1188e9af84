//! Pure transition planning.
//!
//! The planner checks every actor-side precondition, resolves routing, and
//! produces a [`TransitionPlan`] describing the one atomic write the
//! persistence layer must perform plus the notification drafts to dispatch
//! after commit. The plan carries the expected status and approver so the
//! write can be a conditional compare-and-swap; a stale snapshot then
//! surfaces as a conflict instead of a lost update.

use rust_decimal::Decimal;

use crate::audit::{comment_or_default, WorkflowAction};
use crate::domain::quote_slate::QuoteSlate;
use crate::domain::request::{items_total, PurchaseRequest, RequestItem, RequestStatus};
use crate::domain::user::{User, UserId};
use crate::errors::WorkflowError;
use crate::notify::{self, NotificationDraft};
use crate::routing::{self, Resolution, RoleDirectory};

/// Actions the current approver may take on a pending request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
    RequestQuotes,
}

impl From<ReviewAction> for WorkflowAction {
    fn from(action: ReviewAction) -> Self {
        match action {
            ReviewAction::Approve => WorkflowAction::Approve,
            ReviewAction::Reject => WorkflowAction::Reject,
            ReviewAction::RequestQuotes => WorkflowAction::RequestQuotes,
        }
    }
}

/// Quote slate and derived total to persist alongside a quote submission.
#[derive(Clone, Debug, PartialEq)]
pub struct QuoteUpdate {
    pub slate: QuoteSlate,
    pub total_amount: Decimal,
}

/// One planned state transition. `expected_status`/`expected_approver` guard
/// the conditional update; everything else is the new state to write and the
/// side effects to fire after commit.
#[derive(Clone, Debug, PartialEq)]
pub struct TransitionPlan {
    pub action: WorkflowAction,
    pub expected_status: RequestStatus,
    pub expected_approver: UserId,
    pub next_status: RequestStatus,
    pub next_approver: Option<UserId>,
    pub comment: String,
    pub quote_update: Option<QuoteUpdate>,
    pub notifications: Vec<NotificationDraft>,
}

/// Initial state of a freshly submitted request.
#[derive(Clone, Debug, PartialEq)]
pub struct SubmissionPlan {
    pub resolution: Resolution,
    pub total_amount: Decimal,
    pub comment: String,
}

pub fn plan_submission(actor: &User, items: &[RequestItem]) -> SubmissionPlan {
    SubmissionPlan {
        resolution: routing::resolve_submission(actor.manager_id),
        total_amount: items_total(items),
        comment: WorkflowAction::Submit.default_comment().to_string(),
    }
}

/// Plan an approve / reject / quote-request action by the current approver.
pub fn plan_review(
    request: &PurchaseRequest,
    actor: &User,
    action: ReviewAction,
    comment: Option<String>,
    directory: &dyn RoleDirectory,
) -> Result<TransitionPlan, WorkflowError> {
    let workflow_action = WorkflowAction::from(action);

    // Terminal requests have no pending actor, so nothing is actionable.
    let Some(expected_approver) = request.current_approver_id else {
        return Err(WorkflowError::InvalidState {
            action: workflow_action,
            status: request.status,
        });
    };
    if expected_approver != actor.id {
        return Err(WorkflowError::PermissionDenied { actor: actor.id });
    }

    let resolution = match action {
        ReviewAction::Reject => routing::resolve_rejection(),
        ReviewAction::RequestQuotes => {
            routing::resolve_quote_request(actor, request.status, directory)?
        }
        ReviewAction::Approve => routing::resolve_approval(actor, directory),
    };

    let notifications = notify::drafts_for_transition(request, &resolution);

    Ok(TransitionPlan {
        action: workflow_action,
        expected_status: request.status,
        expected_approver,
        next_status: resolution.next_status,
        next_approver: resolution.next_approver,
        comment: comment_or_default(workflow_action, comment),
        quote_update: None,
        notifications,
    })
}

/// Plan procurement's quote submission, returning the request to the finance
/// manager with the slate and derived total.
pub fn plan_quote_submission(
    request: &PurchaseRequest,
    actor: &User,
    slate: QuoteSlate,
    directory: &dyn RoleDirectory,
) -> Result<TransitionPlan, WorkflowError> {
    slate.validate()?;

    let resolution = routing::resolve_quote_submission(actor, request.status, directory)?;

    let Some(expected_approver) = request.current_approver_id else {
        return Err(WorkflowError::InvalidState {
            action: WorkflowAction::SubmitQuotes,
            status: request.status,
        });
    };
    if expected_approver != actor.id {
        return Err(WorkflowError::PermissionDenied { actor: actor.id });
    }

    let comment = match slate.selected() {
        Some(offer) => format!("price quotes uploaded (selected: {})", offer.supplier),
        None => WorkflowAction::SubmitQuotes.default_comment().to_string(),
    };

    let notifications = notify::drafts_for_transition(request, &resolution);
    let total_amount = slate.selected_total();

    Ok(TransitionPlan {
        action: WorkflowAction::SubmitQuotes,
        expected_status: request.status,
        expected_approver,
        next_status: resolution.next_status,
        next_approver: resolution.next_approver,
        comment,
        quote_update: Some(QuoteUpdate { slate, total_amount }),
        notifications,
    })
}
