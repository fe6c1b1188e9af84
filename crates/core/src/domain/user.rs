use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Organizational roles in chain order. Elevated roles (`Procurement` and
/// above) are assumed to have at most one active holder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Requester,
    DirectManager,
    Procurement,
    AdminManager,
    FinanceManager,
    Executive,
}

impl Role {
    /// The fixed approval chain. Returns `None` past the executive.
    pub fn next_in_chain(self) -> Option<Role> {
        match self {
            Role::Requester => Some(Role::DirectManager),
            Role::DirectManager => Some(Role::Procurement),
            Role::Procurement => Some(Role::AdminManager),
            Role::AdminManager => Some(Role::FinanceManager),
            Role::FinanceManager => Some(Role::Executive),
            Role::Executive => None,
        }
    }

    /// Oversight roles may read any request regardless of involvement.
    pub fn is_oversight(self) -> bool {
        matches!(self, Role::AdminManager | Role::FinanceManager | Role::Executive)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
    /// Self-referencing; used only for the initial routing decision at
    /// submission time.
    pub manager_id: Option<UserId>,
}
