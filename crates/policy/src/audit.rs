//! Audit logging — structured records of every tool invocation.
//!
//! Records are kept for monitoring and billing collaborators, independent
//! of whether the invocation succeeded.

use std::sync::Mutex;

use openrelay_core::policy::ToolAuditRecord;

/// Trait for audit log sinks (where records are forwarded).
pub trait AuditSink: Send + Sync {
    fn record(&self, record: &ToolAuditRecord);
}

/// In-memory audit log that stores records in a vector and fans them out
/// to configured sinks. Useful for testing and small deployments.
pub struct AuditLog {
    records: Mutex<Vec<ToolAuditRecord>>,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.records.lock().unwrap().len();
        f.debug_struct("AuditLog")
            .field("record_count", &count)
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLog {
    /// Create a new audit log with no sinks.
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            sinks: Vec::new(),
        }
    }

    /// Create a new audit log with the given sinks.
    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            sinks,
        }
    }

    /// Store a record and forward it to every sink.
    pub fn log(&self, record: &ToolAuditRecord) {
        self.records.lock().unwrap().push(record.clone());
        for sink in &self.sinks {
            sink.record(record);
        }
    }

    /// Get all recorded entries.
    pub fn records(&self) -> Vec<ToolAuditRecord> {
        self.records.lock().unwrap().clone()
    }

    /// Get only the failed invocations.
    pub fn failures(&self) -> Vec<ToolAuditRecord> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.success)
            .cloned()
            .collect()
    }

    /// Clear all stored records.
    pub fn clear(&self) {
        self.records.lock().unwrap().clear();
    }

    /// Count of stored records.
    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

/// A tracing-based audit sink that logs records via `tracing::info!`.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, record: &ToolAuditRecord) {
        tracing::info!(
            tool = %record.tool_name,
            call_id = %record.call_id,
            identity = record.identity.as_deref().unwrap_or("anonymous"),
            success = record.success,
            duration_ms = record.duration_ms,
            error = record.error.as_deref().unwrap_or(""),
            "AUDIT"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn record(tool: &str, success: bool) -> ToolAuditRecord {
        ToolAuditRecord {
            tool_name: tool.into(),
            call_id: "call_1".into(),
            identity: None,
            arguments: json!({}),
            success,
            duration_ms: 1,
            error: if success { None } else { Some("boom".into()) },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn log_and_retrieve_records() {
        let log = AuditLog::new();
        log.log(&record("add", true));
        log.log(&record("search", false));

        assert_eq!(log.count(), 2);
        let records = log.records();
        assert_eq!(records[0].tool_name, "add");
        assert_eq!(records[1].tool_name, "search");
    }

    #[test]
    fn filter_failures() {
        let log = AuditLog::new();
        log.log(&record("add", true));
        log.log(&record("search", false));
        log.log(&record("add", false));

        let failures = log.failures();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|r| !r.success));
    }

    #[test]
    fn clear_records() {
        let log = AuditLog::new();
        log.log(&record("add", true));
        assert_eq!(log.count(), 1);
        log.clear();
        assert_eq!(log.count(), 0);
    }

    #[test]
    fn custom_sink_receives_records() {
        use std::sync::{Arc, Mutex};

        struct TestSink {
            received: Arc<Mutex<Vec<String>>>,
        }

        impl AuditSink for TestSink {
            fn record(&self, record: &ToolAuditRecord) {
                self.received.lock().unwrap().push(record.tool_name.clone());
            }
        }

        let received = Arc::new(Mutex::new(Vec::new()));
        let sink = TestSink {
            received: received.clone(),
        };
        let log = AuditLog::with_sinks(vec![Box::new(sink)]);

        log.log(&record("add", true));

        let names = received.lock().unwrap();
        assert_eq!(names.as_slice(), ["add"]);
    }

    #[test]
    fn debug_format() {
        let log = AuditLog::new();
        let debug_str = format!("{log:?}");
        assert!(debug_str.contains("AuditLog"));
        assert!(debug_str.contains("record_count"));
    }
}
