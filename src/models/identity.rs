use serde::{Deserialize, Serialize};

/// The active visitor identity. At most one is active at a time; the two are
/// disjoint persistence scopes, so switching to `Authenticated` never merges
/// anonymous history into the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Identity {
    Anonymous { token: String },
    Authenticated { account_id: String },
}

impl Identity {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Identity::Authenticated { .. })
    }

    /// The id messages and feedback are scoped by: the account id when signed
    /// in, the session token otherwise.
    pub fn scope_id(&self) -> &str {
        match self {
            Identity::Anonymous { token } => token,
            Identity::Authenticated { account_id } => account_id,
        }
    }
}
