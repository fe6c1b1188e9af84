use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::request::RequestId;
use crate::domain::user::UserId;

/// Actions recorded in a request's audit log. One entry is appended per
/// accepted transition; entries are never mutated or deleted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowAction {
    Submit,
    Approve,
    Reject,
    RequestQuotes,
    SubmitQuotes,
}

impl WorkflowAction {
    /// Fixed comment used when the caller supplies none.
    pub fn default_comment(self) -> &'static str {
        match self {
            WorkflowAction::Submit => "request submitted",
            WorkflowAction::Approve => "approved",
            WorkflowAction::Reject => "no comment",
            WorkflowAction::RequestQuotes => "returned to procurement for price quotes",
            WorkflowAction::SubmitQuotes => "price quotes uploaded",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: i64,
    pub request_id: RequestId,
    pub actor_id: UserId,
    pub action: WorkflowAction,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

/// Resolve the comment to record: a non-blank caller comment wins, otherwise
/// the action's fixed default.
pub fn comment_or_default(action: WorkflowAction, comment: Option<String>) -> String {
    match comment {
        Some(text) if !text.trim().is_empty() => text,
        _ => action.default_comment().to_string(),
    }
}
