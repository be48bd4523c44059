//! Caller identity — who is driving this logical call.
//!
//! Threaded read-only into the policy gate and tool execution context so
//! authorization decisions and audit records can name the actor.

use serde::{Deserialize, Serialize};

/// The authenticated identity on whose behalf a call runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthIdentity {
    /// Stable identifier (user id, API key id, service account)
    pub id: String,

    /// Human-readable name, if known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Granted scopes consulted by policy gates
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scopes: Vec<String>,
}

impl AuthIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            scopes: Vec::new(),
        }
    }

    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Whether this identity holds the given scope.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}
