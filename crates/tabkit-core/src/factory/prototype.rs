use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::FactoryError;
use crate::schema::{SchemaRef, SettingsSchema};

type PrototypeRenderFn<V> = Arc<dyn Fn(&Value) -> V + Send + Sync>;

/// One variant of a factory: a key, a schema pinning `key` to that literal, and a
/// renderer for payloads that pass the schema.
pub struct TabPrototype<V> {
    key: String,
    schema: SchemaRef,
    render: PrototypeRenderFn<V>,
}

impl<V> Clone for TabPrototype<V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            schema: self.schema.clone(),
            render: self.render.clone(),
        }
    }
}

impl<V> fmt::Debug for TabPrototype<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabPrototype").field("key", &self.key).finish()
    }
}

impl<V> TabPrototype<V> {
    pub fn new(
        key: impl Into<String>,
        schema: impl SettingsSchema + 'static,
        render: impl Fn(&Value) -> V + Send + Sync + 'static,
    ) -> Self {
        Self {
            key: key.into(),
            schema: Arc::new(schema),
            render: Arc::new(render),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn parse(&self, data: &Value) -> Result<Value, FactoryError> {
        Ok(self.schema.parse(data)?)
    }

    pub(crate) fn render(&self, parsed: &Value) -> V {
        (self.render)(parsed)
    }

    /// The schema must declare `key` as a literal equal to the prototype key.
    pub(crate) fn check_key_literal(&self) -> Result<(), FactoryError> {
        match self.schema.key_literal() {
            None => Err(FactoryError::MissingKeyLiteral(self.key.clone())),
            Some(Value::String(literal)) if *literal == self.key => Ok(()),
            Some(Value::String(literal)) => Err(FactoryError::KeyMismatch {
                key: self.key.clone(),
                literal: literal.clone(),
            }),
            Some(other) => Err(FactoryError::KeyMismatch {
                key: self.key.clone(),
                literal: other.to_string(),
            }),
        }
    }
}
