pub mod access;
pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod notify;
pub mod routing;
pub mod workflow;

pub use audit::{AuditLogEntry, WorkflowAction};
pub use domain::quote_slate::{QuoteOffer, QuoteSlate};
pub use domain::request::{PurchaseRequest, RequestId, RequestItem, RequestStatus};
pub use domain::user::{Role, User, UserId};
pub use errors::WorkflowError;
pub use notify::NotificationDraft;
pub use routing::{DirectorySnapshot, Resolution, RoleDirectory};
pub use workflow::{ReviewAction, SubmissionPlan, TransitionPlan};
