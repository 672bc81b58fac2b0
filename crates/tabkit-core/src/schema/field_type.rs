//! Field kinds and field declarations for settings schemas

use serde_json::Value;

use super::object::ObjectSchema;
use super::validation::ValidationRules;

/// Shape a field's value must have.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Number,
    Integer,
    Bool,
    /// Exactly this JSON value (discriminants such as `key: "profile"`).
    Literal(Value),
    /// One of a fixed set of strings.
    OneOf(Vec<String>),
    Array(Box<FieldKind>),
    Object(ObjectSchema),
    Any,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Bool => "boolean",
            Self::Literal(_) => "literal",
            Self::OneOf(_) => "enum",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Any => "any",
        }
    }
}

/// Name of the JSON type of `value`, for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One named field of an object schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
    pub default: Option<Value>,
    pub rules: ValidationRules,
}

impl FieldSchema {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            nullable: false,
            default: None,
            rules: ValidationRules::none(),
        }
    }

    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Number)
    }

    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Integer)
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Bool)
    }

    pub fn literal(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(name, FieldKind::Literal(value.into()))
    }

    pub fn one_of<S: Into<String>>(name: impl Into<String>, options: impl IntoIterator<Item = S>) -> Self {
        Self::new(name, FieldKind::OneOf(options.into_iter().map(Into::into).collect()))
    }

    pub fn array(name: impl Into<String>, item: FieldKind) -> Self {
        Self::new(name, FieldKind::Array(Box::new(item)))
    }

    pub fn object(name: impl Into<String>, schema: ObjectSchema) -> Self {
        Self::new(name, FieldKind::Object(schema))
    }

    pub fn any(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Any)
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Optional field filled with `value` when absent.
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.required = false;
        self.default = Some(value.into());
        self
    }

    pub fn non_empty(mut self) -> Self {
        self.rules.non_empty = true;
        self
    }

    pub fn min(mut self, min: f64) -> Self {
        self.rules.min = Some(min);
        self
    }

    pub fn max(mut self, max: f64) -> Self {
        self.rules.max = Some(max);
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.rules.min_length = Some(len);
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.rules.max_length = Some(len);
        self
    }
}
