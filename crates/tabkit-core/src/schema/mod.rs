//! Settings validation.
//!
//! Features declare a schema for their tab settings; raw settings are parsed through it
//! before anything is loaded or rendered. The engine is pluggable through the
//! [`SettingsSchema`] trait; [`ObjectSchema`] is the bundled strict implementation.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tabkit_core::schema::{FieldSchema, ObjectSchema, validate};
//!
//! let schema = ObjectSchema::new().field(FieldSchema::string("userId"));
//! let settings = validate(&schema, &serde_json::json!({ "userId": "123" }))?;
//! ```

mod field_type;
mod object;
mod validation;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ValidationError;

pub use field_type::{json_type_name, FieldKind, FieldSchema};
pub use object::ObjectSchema;
pub use validation::ValidationRules;

/// A schema engine: parses raw settings into their validated (normalized) form.
pub trait SettingsSchema: Send + Sync {
    fn parse(&self, raw: &Value) -> Result<Value, ValidationError>;

    /// The literal the `key` field is pinned to, for discriminated dispatch.
    fn key_literal(&self) -> Option<&Value> {
        None
    }
}

/// Shared handle to a schema engine.
pub type SchemaRef = Arc<dyn SettingsSchema>;

/// Accepts any settings unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnySchema;

impl SettingsSchema for AnySchema {
    fn parse(&self, raw: &Value) -> Result<Value, ValidationError> {
        Ok(raw.clone())
    }
}

pub fn validate(schema: &dyn SettingsSchema, raw: &Value) -> Result<Value, ValidationError> {
    schema.parse(raw)
}

/// Validate, then deserialize into the feature's settings type.
pub fn validate_into<T: DeserializeOwned>(
    schema: &dyn SettingsSchema,
    raw: &Value,
) -> Result<T, ValidationError> {
    let parsed = schema.parse(raw)?;
    serde_json::from_value(parsed)
        .map_err(|err| ValidationError::single(Vec::new(), format!("cannot decode settings: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "camelCase")]
    struct ProfileSettings {
        user_id: String,
        page: u32,
    }

    #[test]
    fn test_validate_into_typed() {
        let schema = ObjectSchema::new()
            .field(FieldSchema::string("userId"))
            .field(FieldSchema::integer("page").default_value(1));
        let settings: ProfileSettings = validate_into(&schema, &json!({ "userId": "123" })).unwrap();
        assert_eq!(
            settings,
            ProfileSettings {
                user_id: "123".into(),
                page: 1
            }
        );
    }

    #[test]
    fn test_decode_failure_is_validation_error() {
        let result: Result<ProfileSettings, _> = validate_into(&AnySchema, &json!({ "userId": 1 }));
        let err = result.unwrap_err();
        assert!(err.issues[0].message.starts_with("cannot decode settings"));
    }
}
