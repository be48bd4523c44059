//! Structured-output handling for the final turn's content.
//!
//! Strict mode raises a validation error when the content does not satisfy
//! the requested contract; lenient mode degrades to `Value::Null` so the
//! caller still receives usage, cost and tool-call accounting.

use openrelay_core::error::Error;
use openrelay_core::schema::JsonSchema;
use serde_json::Value;

use crate::options::OutputFormat;

/// Parse and validate final content against the requested format.
///
/// Returns the parsed value on success. In lenient mode every failure
/// collapses to `Ok(Value::Null)`; in strict mode it surfaces as
/// [`Error::Validation`].
pub fn parse_structured(
    content: Option<&str>,
    format: &OutputFormat,
    strict: bool,
) -> Result<Value, Error> {
    match try_parse(content, format) {
        Ok(value) => Ok(value),
        Err(e) if strict => Err(e),
        Err(_) => Ok(Value::Null),
    }
}

fn try_parse(content: Option<&str>, format: &OutputFormat) -> Result<Value, Error> {
    let text = content.ok_or_else(|| Error::Validation {
        message: "model returned no text content for structured output".into(),
    })?;

    let value: Value = serde_json::from_str(text).map_err(|e| Error::Validation {
        message: format!("invalid JSON in structured output: {e}"),
    })?;

    match format {
        OutputFormat::JsonObject => {
            if !value.is_object() {
                return Err(Error::Validation {
                    message: "structured output is valid JSON but not an object".into(),
                });
            }
        }
        OutputFormat::JsonSchema { schema, .. } => {
            JsonSchema::new(schema.clone()).validate(&value)?;
        }
    }

    Ok(value)
}
