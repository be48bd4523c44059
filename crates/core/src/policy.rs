//! Policy gate trait — authorization, rate limiting and argument
//! sanitization consulted before every tool invocation.
//!
//! The engine always talks to a gate through this one interface; callers who
//! configure none get [`NoopGate`], so nothing downstream ever checks
//! "is a gate present".

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::PolicyError;
use crate::identity::AuthIdentity;

/// The audit event emitted once per tool invocation, success or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolAuditRecord {
    pub tool_name: String,
    pub call_id: String,
    /// Id of the authenticated caller, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// The parsed arguments the tool ran with (or would have run with).
    pub arguments: Value,
    pub success: bool,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// The core PolicyGate trait.
///
/// `authorize` runs before a tool executes; any denial degrades into a
/// tool-result error message, never a failed call. `record` is the logging
/// hook that receives the audit record afterwards, independent of outcome.
#[async_trait]
pub trait PolicyGate: Send + Sync {
    async fn authorize(
        &self,
        tool_name: &str,
        identity: Option<&AuthIdentity>,
        arguments: &Value,
    ) -> std::result::Result<(), PolicyError>;

    /// Audit-logging hook. Must not fail; implementations swallow their own
    /// errors.
    fn record(&self, record: &ToolAuditRecord);
}

/// A gate that allows everything and records nothing.
pub struct NoopGate;

#[async_trait]
impl PolicyGate for NoopGate {
    async fn authorize(
        &self,
        _tool_name: &str,
        _identity: Option<&AuthIdentity>,
        _arguments: &Value,
    ) -> std::result::Result<(), PolicyError> {
        Ok(())
    }

    fn record(&self, _record: &ToolAuditRecord) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn noop_gate_allows_everything() {
        let gate = NoopGate;
        let result = gate.authorize("anything", None, &json!({})).await;
        assert!(result.is_ok());
    }

    #[test]
    fn audit_record_serialization() {
        let record = ToolAuditRecord {
            tool_name: "add".into(),
            call_id: "call_1".into(),
            identity: Some("user-1".into()),
            arguments: json!({"a": 2, "b": 2}),
            success: true,
            duration_ms: 3,
            error: None,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&record).unwrap();
        let back: ToolAuditRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back.tool_name, "add");
        assert!(back.success);
        assert!(!json.contains("\"error\""));
    }
}
