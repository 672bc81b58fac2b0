use serde_json::{Map, Value};

use super::field_type::{json_type_name, FieldKind, FieldSchema};
use super::validation::ValidationRules;
use super::SettingsSchema;
use crate::error::{PathSegment, ValidationError, ValidationIssue};

/// Strict object schema: declared fields only, unless `passthrough` is set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    fields: Vec<FieldSchema>,
    passthrough: bool,
}

impl ObjectSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field; a later declaration with the same name replaces the earlier one.
    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.retain(|existing| existing.name != field.name);
        self.fields.push(field);
        self
    }

    /// Keep undeclared keys instead of rejecting them.
    pub fn passthrough(mut self) -> Self {
        self.passthrough = true;
        self
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// The literal a field is pinned to, if it is declared as one.
    pub fn literal_of(&self, name: &str) -> Option<&Value> {
        match self.get(name).map(|field| &field.kind) {
            Some(FieldKind::Literal(value)) => Some(value),
            _ => None,
        }
    }

    fn check_object(
        &self,
        value: &Value,
        path: &mut Vec<PathSegment>,
        issues: &mut Vec<ValidationIssue>,
    ) -> Value {
        let Some(object) = value.as_object() else {
            issues.push(ValidationIssue::new(
                path.clone(),
                format!("expected object, found {}", json_type_name(value)),
            ));
            return Value::Null;
        };

        let mut out = Map::new();
        for field in &self.fields {
            path.push(PathSegment::Key(field.name.clone()));
            match object.get(&field.name) {
                None => {
                    if let Some(default) = &field.default {
                        out.insert(field.name.clone(), default.clone());
                    } else if field.required {
                        issues.push(ValidationIssue::new(path.clone(), "required field is missing"));
                    }
                }
                Some(Value::Null) if field.nullable => {
                    out.insert(field.name.clone(), Value::Null);
                }
                Some(raw) => {
                    let parsed = check_value(&field.kind, &field.rules, raw, path, issues);
                    out.insert(field.name.clone(), parsed);
                }
            }
            path.pop();
        }

        for (key, raw) in object {
            if self.get(key).is_some() {
                continue;
            }
            if self.passthrough {
                out.insert(key.clone(), raw.clone());
            } else {
                path.push(PathSegment::Key(key.clone()));
                issues.push(ValidationIssue::new(path.clone(), "unrecognized field"));
                path.pop();
            }
        }

        Value::Object(out)
    }
}

fn mismatch(kind: &FieldKind, value: &Value, path: &[PathSegment], issues: &mut Vec<ValidationIssue>) {
    issues.push(ValidationIssue::new(
        path.to_vec(),
        format!("expected {}, found {}", kind.as_str(), json_type_name(value)),
    ));
}

fn check_rule(result: Result<(), String>, path: &[PathSegment], issues: &mut Vec<ValidationIssue>) {
    if let Err(message) = result {
        issues.push(ValidationIssue::new(path.to_vec(), message));
    }
}

fn check_value(
    kind: &FieldKind,
    rules: &ValidationRules,
    value: &Value,
    path: &mut Vec<PathSegment>,
    issues: &mut Vec<ValidationIssue>,
) -> Value {
    match kind {
        FieldKind::Any => value.clone(),
        FieldKind::String => match value.as_str() {
            Some(text) => {
                check_rule(rules.validate_string(text), path, issues);
                value.clone()
            }
            None => {
                mismatch(kind, value, path, issues);
                Value::Null
            }
        },
        FieldKind::Number => match value.as_f64() {
            Some(number) => {
                check_rule(rules.validate_number(number), path, issues);
                value.clone()
            }
            None => {
                mismatch(kind, value, path, issues);
                Value::Null
            }
        },
        FieldKind::Integer => {
            if value.is_i64() || value.is_u64() {
                if let Some(number) = value.as_f64() {
                    check_rule(rules.validate_number(number), path, issues);
                }
                value.clone()
            } else {
                mismatch(kind, value, path, issues);
                Value::Null
            }
        }
        FieldKind::Bool => {
            if !value.is_boolean() {
                mismatch(kind, value, path, issues);
            }
            value.clone()
        }
        FieldKind::Literal(expected) => {
            if value != expected {
                issues.push(ValidationIssue::new(
                    path.clone(),
                    format!("expected literal {}, found {}", expected, value),
                ));
            }
            value.clone()
        }
        FieldKind::OneOf(options) => match value.as_str() {
            Some(text) if options.iter().any(|option| option == text) => value.clone(),
            Some(text) => {
                issues.push(ValidationIssue::new(
                    path.clone(),
                    format!("expected one of [{}], found \"{}\"", options.join(", "), text),
                ));
                value.clone()
            }
            None => {
                mismatch(kind, value, path, issues);
                Value::Null
            }
        },
        FieldKind::Array(item) => match value.as_array() {
            Some(items) => {
                check_rule(rules.validate_items(items.len()), path, issues);
                let parsed = items
                    .iter()
                    .enumerate()
                    .map(|(index, raw)| {
                        path.push(PathSegment::Index(index));
                        let parsed = check_value(item, &ValidationRules::none(), raw, path, issues);
                        path.pop();
                        parsed
                    })
                    .collect();
                Value::Array(parsed)
            }
            None => {
                mismatch(kind, value, path, issues);
                Value::Null
            }
        },
        FieldKind::Object(schema) => schema.check_object(value, path, issues),
    }
}

impl SettingsSchema for ObjectSchema {
    fn parse(&self, raw: &Value) -> Result<Value, ValidationError> {
        let mut issues = Vec::new();
        let parsed = self.check_object(raw, &mut Vec::new(), &mut issues);
        if issues.is_empty() {
            Ok(parsed)
        } else {
            Err(ValidationError::new(issues))
        }
    }

    fn key_literal(&self) -> Option<&Value> {
        self.literal_of("key")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile_schema() -> ObjectSchema {
        ObjectSchema::new()
            .field(FieldSchema::string("userId").non_empty())
            .field(FieldSchema::one_of("view", ["summary", "full"]).default_value("summary"))
            .field(FieldSchema::integer("page").optional().min(1.0))
            .field(FieldSchema::string("note").optional().nullable())
    }

    #[test]
    fn test_valid_settings_fill_defaults() {
        let parsed = profile_schema().parse(&json!({ "userId": "123" })).unwrap();
        assert_eq!(parsed, json!({ "userId": "123", "view": "summary" }));
    }

    #[test]
    fn test_unknown_field_fails() {
        let err = profile_schema()
            .parse(&json!({ "userId": "123", "extra": true }))
            .unwrap_err();
        assert_eq!(err.messages(), vec![("extra".to_string(), "unrecognized field".to_string())]);
    }

    #[test]
    fn test_type_mismatch_and_missing_collected() {
        let err = ObjectSchema::new()
            .field(FieldSchema::string("userId"))
            .field(FieldSchema::boolean("pinned"))
            .parse(&json!({ "userId": 123 }))
            .unwrap_err();
        assert_eq!(
            err.messages(),
            vec![
                ("userId".to_string(), "expected string, found number".to_string()),
                ("pinned".to_string(), "required field is missing".to_string()),
            ]
        );
    }

    #[test]
    fn test_nested_paths() {
        let schema = ObjectSchema::new().field(FieldSchema::array(
            "filters",
            FieldKind::Object(ObjectSchema::new().field(FieldSchema::string("field"))),
        ));
        let err = schema
            .parse(&json!({ "filters": [{ "field": "a" }, { "field": 7 }] }))
            .unwrap_err();
        assert_eq!(err.issues[0].path_string(), "filters[1].field");
    }

    #[test]
    fn test_null_only_when_nullable() {
        assert!(profile_schema().parse(&json!({ "userId": "1", "note": null })).is_ok());
        assert!(profile_schema().parse(&json!({ "userId": null })).is_err());
    }

    #[test]
    fn test_rules_and_integers() {
        let err = profile_schema()
            .parse(&json!({ "userId": " ", "page": 0 }))
            .unwrap_err();
        assert_eq!(err.issues.len(), 2);
        assert!(profile_schema().parse(&json!({ "userId": "1", "page": 1.5 })).is_err());
    }

    #[test]
    fn test_passthrough_keeps_unknown() {
        let schema = ObjectSchema::new().field(FieldSchema::string("a")).passthrough();
        let parsed = schema.parse(&json!({ "a": "x", "b": 1 })).unwrap();
        assert_eq!(parsed, json!({ "a": "x", "b": 1 }));
    }

    #[test]
    fn test_root_must_be_object() {
        let err = profile_schema().parse(&json!([1])).unwrap_err();
        assert_eq!(err.issues[0].path_string(), "(root)");
    }

    #[test]
    fn test_key_literal() {
        let schema = ObjectSchema::new().field(FieldSchema::literal("key", "profile"));
        assert_eq!(schema.key_literal(), Some(&json!("profile")));
        assert_eq!(profile_schema().key_literal(), None);
    }
}
