//! Token usage accounting.
//!
//! Per-turn usage values returned by the remote API are accumulated
//! additively across every round trip of one logical call.

use serde::{Deserialize, Serialize};

/// Token usage statistics for one turn or one whole logical call.
///
/// Missing fields on the wire default to zero; counts are never negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

impl Usage {
    /// Field-wise sum of two optional usage values.
    ///
    /// `None` is the identity: when either side is entirely absent the other
    /// is returned unchanged, so "no usage reported" stays distinguishable
    /// from an actual zero count.
    pub fn sum(a: Option<Usage>, b: Option<Usage>) -> Option<Usage> {
        match (a, b) {
            (None, b) => b,
            (a, None) => a,
            (Some(a), Some(b)) => Some(Usage {
                prompt_tokens: a.prompt_tokens + b.prompt_tokens,
                completion_tokens: a.completion_tokens + b.completion_tokens,
                total_tokens: a.total_tokens + b.total_tokens,
            }),
        }
    }
}
