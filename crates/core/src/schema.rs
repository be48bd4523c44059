//! JSON Schema wrapper used for tool parameters and structured output.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Error;

/// A JSON Schema document.
///
/// Wraps a [`serde_json::Value`] and provides validation via the
/// [`jsonschema`] crate. The inner value is private — use
/// [`as_value`](Self::as_value) for read access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonSchema(Value);

impl JsonSchema {
    /// Creates a schema from a raw JSON value.
    pub fn new(schema: Value) -> Self {
        Self(schema)
    }

    /// Returns a reference to the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Validates `value` against this schema.
    ///
    /// Returns `Ok(())` if validation passes, or [`Error::Validation`] with
    /// every violation joined into one message. A malformed schema itself is
    /// reported as a configuration error.
    pub fn validate(&self, value: &Value) -> Result<(), Error> {
        let validator = jsonschema::validator_for(&self.0).map_err(|e| Error::Config {
            message: format!("invalid JSON schema: {e}"),
        })?;
        let errors: Vec<String> = validator.iter_errors(value).map(|e| e.to_string()).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::Validation {
                message: errors.join("; "),
            })
        }
    }
}
