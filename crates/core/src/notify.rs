//! Post-commit notification drafts.
//!
//! Transitions return an explicit list of drafts instead of dispatching
//! inline; the persistence layer delivers them after its transaction commits
//! and swallows delivery failures.

use serde::{Deserialize, Serialize};

use crate::domain::request::{PurchaseRequest, RequestId, RequestStatus};
use crate::domain::user::UserId;
use crate::routing::Resolution;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationDraft {
    pub target: UserId,
    pub message: String,
    pub link: String,
}

pub fn request_link(id: RequestId) -> String {
    format!("/dashboard/requests/{id}")
}

/// Drafts for a freshly submitted request: the assigned approver, if any,
/// gets a heads-up.
pub fn drafts_for_submission(id: RequestId, title: &str, resolution: &Resolution) -> Vec<NotificationDraft> {
    match resolution.next_approver {
        Some(approver) => vec![NotificationDraft {
            target: approver,
            message: format!("Purchase request \"{title}\" is awaiting your approval"),
            link: request_link(id),
        }],
        None => Vec::new(),
    }
}

/// Drafts for an accepted transition, in issuance order: the requester on a
/// terminal outcome, the newly assigned approver otherwise.
pub fn drafts_for_transition(
    request: &PurchaseRequest,
    resolution: &Resolution,
) -> Vec<NotificationDraft> {
    let link = request_link(request.id);
    let mut drafts = Vec::new();

    match resolution.next_status {
        RequestStatus::Rejected => drafts.push(NotificationDraft {
            target: request.requester_id,
            message: format!("Your purchase request \"{}\" was rejected", request.title),
            link: link.clone(),
        }),
        RequestStatus::Approved => drafts.push(NotificationDraft {
            target: request.requester_id,
            message: format!("Your purchase request \"{}\" received final approval", request.title),
            link: link.clone(),
        }),
        _ => {}
    }

    if let Some(approver) = resolution.next_approver {
        let message = match resolution.next_status {
            RequestStatus::WaitingForQuotes => {
                format!("Purchase request \"{}\" needs price quotes", request.title)
            }
            _ => format!("Purchase request \"{}\" is awaiting your approval", request.title),
        };
        drafts.push(NotificationDraft { target: approver, message, link });
    }

    drafts
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use crate::domain::quote_slate::QuoteSlate;
    use crate::domain::request::{PurchaseRequest, RequestId, RequestStatus};
    use crate::domain::user::UserId;
    use crate::routing::Resolution;

    use super::{drafts_for_submission, drafts_for_transition, request_link};

    fn request() -> PurchaseRequest {
        let now = Utc::now();
        PurchaseRequest {
            id: RequestId(9),
            requester_id: UserId(1),
            title: "three laptops".to_string(),
            description: None,
            items: Vec::new(),
            status: RequestStatus::Pending,
            current_approver_id: Some(UserId(2)),
            total_amount: Decimal::ZERO,
            quotes: QuoteSlate::default(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn rejection_notifies_the_requester() {
        let drafts = drafts_for_transition(
            &request(),
            &Resolution { next_status: RequestStatus::Rejected, next_approver: None },
        );
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].target, UserId(1));
        assert!(drafts[0].message.contains("rejected"));
        assert_eq!(drafts[0].link, request_link(RequestId(9)));
    }

    #[test]
    fn final_approval_notifies_the_requester() {
        let drafts = drafts_for_transition(
            &request(),
            &Resolution { next_status: RequestStatus::Approved, next_approver: None },
        );
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].target, UserId(1));
        assert!(drafts[0].message.contains("final approval"));
    }

    #[test]
    fn chain_advance_notifies_the_new_approver() {
        let drafts = drafts_for_transition(
            &request(),
            &Resolution { next_status: RequestStatus::Pending, next_approver: Some(UserId(3)) },
        );
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].target, UserId(3));
        assert!(drafts[0].message.contains("awaiting your approval"));
    }

    #[test]
    fn quote_detour_message_mentions_quotes() {
        let drafts = drafts_for_transition(
            &request(),
            &Resolution {
                next_status: RequestStatus::WaitingForQuotes,
                next_approver: Some(UserId(3)),
            },
        );
        assert_eq!(drafts.len(), 1);
        assert!(drafts[0].message.contains("price quotes"));
    }

    #[test]
    fn auto_approved_submission_produces_no_drafts() {
        let drafts = drafts_for_submission(
            RequestId(9),
            "three laptops",
            &Resolution { next_status: RequestStatus::Approved, next_approver: None },
        );
        assert!(drafts.is_empty());
    }
}
