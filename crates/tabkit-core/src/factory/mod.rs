//! Settings-driven rendering from a closed set of prototypes.
//!
//! A payload carries a `key` naming its prototype. The factory dispatches on it,
//! validates the payload against that prototype's schema and renders it. Failures go
//! to the optional error view as a serialized [`ErrorReport`], or are returned.
//!
//! ```rust,ignore
//! let factory = TabFactoryBuilder::new()
//!     .add(TabPrototype::new("chart", chart_schema, render_chart))?
//!     .add(TabPrototype::new("table", table_schema, render_table))?
//!     .build(TabFactoryOptions::default())?;
//! let view = factory.render(&payload)?;
//! ```

mod builder;
mod prototype;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ErrorReport, FactoryError, PathSegment, ValidationError};

pub use builder::{TabFactoryBuilder, TabFactoryOptions};
pub use prototype::TabPrototype;

pub struct TabFactory<V> {
    prototypes: HashMap<String, TabPrototype<V>>,
    keys: Vec<String>,
    error_component: Option<Arc<dyn Fn(&str) -> V + Send + Sync>>,
}

impl<V> TabFactory<V> {
    fn new(
        prototypes: Vec<TabPrototype<V>>,
        error_component: Option<Arc<dyn Fn(&str) -> V + Send + Sync>>,
    ) -> Self {
        let keys = prototypes.iter().map(|p| p.key().to_string()).collect();
        let prototypes = prototypes
            .into_iter()
            .map(|p| (p.key().to_string(), p))
            .collect();
        Self {
            prototypes,
            keys,
            error_component,
        }
    }

    /// Prototype keys in the order they were added.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn render(&self, data: &Value) -> Result<V, FactoryError> {
        match self.dispatch(data) {
            Ok(view) => Ok(view),
            Err(err) => match &self.error_component {
                Some(view) => {
                    log::warn!("tab factory: {}", err);
                    Ok(view(&ErrorReport::from(&err).to_display_string()))
                }
                None => Err(err),
            },
        }
    }

    fn dispatch(&self, data: &Value) -> Result<V, FactoryError> {
        let key = match data.get("key") {
            Some(Value::String(key)) => key,
            Some(_) | None => {
                let message = format!("expected one of [{}]", self.keys.join(", "));
                return Err(ValidationError::single(vec![PathSegment::from("key")], message).into());
            }
        };

        let Some(prototype) = self.prototypes.get(key) else {
            return Err(FactoryError::NoMatchingPrototype(key.clone()));
        };

        let parsed = prototype.parse(data)?;
        Ok(prototype.render(&parsed))
    }
}
