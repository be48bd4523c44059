//! The reference policy gate — allowlist, rate limiting and argument
//! sanitization enforced before every tool invocation.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use openrelay_core::error::PolicyError;
use openrelay_core::identity::AuthIdentity;
use openrelay_core::policy::{PolicyGate, ToolAuditRecord};
use serde_json::Value;

use crate::audit::AuditLog;

/// A sliding-window rate limit.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// Maximum invocations per window.
    pub max_calls: u32,
    /// Window length.
    pub window: Duration,
}

/// Static policy rules evaluated per invocation.
#[derive(Debug, Clone, Default)]
pub struct PolicyRules {
    /// Allowlist of tool names. Empty = deny all (secure by default).
    /// `"*"` = allow all.
    pub allowed_tools: Vec<String>,

    /// Scope the caller identity must hold, if any.
    pub required_scope: Option<String>,

    /// Rate limit applied per (identity, tool) pair.
    pub rate_limit: Option<RateLimit>,

    /// Maximum length of any string argument. 0 = unlimited.
    pub max_string_len: usize,

    /// Substrings that must not appear in string arguments.
    pub forbidden_patterns: Vec<String>,
}

/// Policy gate driven by [`PolicyRules`], with audit fan-out.
///
/// Checks run in order: allowlist → scope → rate limit → sanitization.
/// The first failing check wins; rate-limit denials carry the seconds
/// until the window frees up.
pub struct StaticPolicyGate {
    rules: PolicyRules,
    audit: AuditLog,
    windows: Mutex<HashMap<String, VecDeque<Instant>>>,
}

impl StaticPolicyGate {
    pub fn new(rules: PolicyRules) -> Self {
        Self {
            rules,
            audit: AuditLog::new(),
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_audit(rules: PolicyRules, audit: AuditLog) -> Self {
        Self {
            rules,
            audit,
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// The audit log this gate records into.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    fn check_allowlist(&self, tool_name: &str) -> Result<(), PolicyError> {
        if self.rules.allowed_tools.is_empty() {
            return Err(PolicyError::Denied {
                tool_name: tool_name.into(),
                reason: "no tools allowed (deny by default)".into(),
            });
        }
        if self.rules.allowed_tools.iter().any(|t| t == "*" || t == tool_name) {
            Ok(())
        } else {
            Err(PolicyError::Denied {
                tool_name: tool_name.into(),
                reason: format!(
                    "tool not in allowlist ({} tools configured)",
                    self.rules.allowed_tools.len()
                ),
            })
        }
    }

    fn check_scope(
        &self,
        tool_name: &str,
        identity: Option<&AuthIdentity>,
    ) -> Result<(), PolicyError> {
        let Some(scope) = &self.rules.required_scope else {
            return Ok(());
        };
        let held = identity.map(|i| i.has_scope(scope)).unwrap_or(false);
        if held {
            Ok(())
        } else {
            Err(PolicyError::Denied {
                tool_name: tool_name.into(),
                reason: format!("caller lacks required scope '{scope}'"),
            })
        }
    }

    fn check_rate_limit(
        &self,
        tool_name: &str,
        identity: Option<&AuthIdentity>,
    ) -> Result<(), PolicyError> {
        let Some(limit) = self.rules.rate_limit else {
            return Ok(());
        };

        let key = format!(
            "{}:{}",
            identity.map(|i| i.id.as_str()).unwrap_or("anonymous"),
            tool_name
        );
        let now = Instant::now();

        let mut windows = self.windows.lock().unwrap();
        let window = windows.entry(key).or_default();

        while let Some(front) = window.front() {
            if now.duration_since(*front) >= limit.window {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() as u32 >= limit.max_calls {
            let oldest = *window.front().expect("window is non-empty at the limit");
            let retry_after = limit.window.saturating_sub(now.duration_since(oldest));
            return Err(PolicyError::RateLimited {
                tool_name: tool_name.into(),
                retry_after_secs: retry_after.as_secs().max(1),
            });
        }

        window.push_back(now);
        Ok(())
    }

    fn check_arguments(&self, tool_name: &str, arguments: &Value) -> Result<(), PolicyError> {
        let mut stack = vec![arguments];
        while let Some(value) = stack.pop() {
            match value {
                Value::String(s) => {
                    if self.rules.max_string_len > 0 && s.len() > self.rules.max_string_len {
                        return Err(PolicyError::InvalidArguments {
                            tool_name: tool_name.into(),
                            reason: format!(
                                "string argument exceeds {} bytes",
                                self.rules.max_string_len
                            ),
                        });
                    }
                    if let Some(pattern) =
                        self.rules.forbidden_patterns.iter().find(|p| s.contains(p.as_str()))
                    {
                        return Err(PolicyError::InvalidArguments {
                            tool_name: tool_name.into(),
                            reason: format!("argument contains forbidden pattern '{pattern}'"),
                        });
                    }
                }
                Value::Array(items) => stack.extend(items),
                Value::Object(map) => stack.extend(map.values()),
                _ => {}
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PolicyGate for StaticPolicyGate {
    async fn authorize(
        &self,
        tool_name: &str,
        identity: Option<&AuthIdentity>,
        arguments: &Value,
    ) -> Result<(), PolicyError> {
        self.check_allowlist(tool_name)?;
        self.check_scope(tool_name, identity)?;
        self.check_rate_limit(tool_name, identity)?;
        self.check_arguments(tool_name, arguments)?;
        Ok(())
    }

    fn record(&self, record: &ToolAuditRecord) {
        self.audit.log(record);
    }
}
