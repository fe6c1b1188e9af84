use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote_slate::QuoteSlate;
use crate::domain::user::UserId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub i64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    WaitingForQuotes,
}

impl RequestStatus {
    /// Terminal statuses carry no pending actor.
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Approved | RequestStatus::Rejected)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestItem {
    pub name: String,
    pub quantity: u32,
    /// Unit price; absent in the no-pricing submission variant.
    pub price: Option<Decimal>,
}

impl RequestItem {
    pub fn line_total(&self) -> Decimal {
        match self.price {
            Some(price) => price * Decimal::from(self.quantity),
            None => Decimal::ZERO,
        }
    }
}

/// Sum of line totals; 0 when no item carries a price.
pub fn items_total(items: &[RequestItem]) -> Decimal {
    items.iter().map(RequestItem::line_total).sum()
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub id: RequestId,
    pub requester_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub items: Vec<RequestItem>,
    pub status: RequestStatus,
    /// The single user authorized to act next; `None` iff terminal.
    pub current_approver_id: Option<UserId>,
    pub total_amount: Decimal,
    pub quotes: QuoteSlate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PurchaseRequest {
    /// Invariant: `current_approver_id` is `None` exactly when the request
    /// is terminal.
    pub fn is_consistent(&self) -> bool {
        self.status.is_terminal() == self.current_approver_id.is_none()
    }
}
