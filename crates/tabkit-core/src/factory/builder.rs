use std::sync::Arc;

use super::prototype::TabPrototype;
use super::TabFactory;
use crate::error::FactoryError;

type ErrorViewFn<V> = Arc<dyn Fn(&str) -> V + Send + Sync>;

/// Options for [`TabFactoryBuilder::build`].
pub struct TabFactoryOptions<V> {
    pub(crate) error_component: Option<ErrorViewFn<V>>,
}

impl<V> Default for TabFactoryOptions<V> {
    fn default() -> Self {
        Self { error_component: None }
    }
}

impl<V> TabFactoryOptions<V> {
    /// Render failures through `view`, which receives the serialized error.
    pub fn error_component(mut self, view: impl Fn(&str) -> V + Send + Sync + 'static) -> Self {
        self.error_component = Some(Arc::new(view));
        self
    }
}

/// Collects prototypes, checking each as it is added.
pub struct TabFactoryBuilder<V> {
    prototypes: Vec<TabPrototype<V>>,
}

impl<V> Default for TabFactoryBuilder<V> {
    fn default() -> Self {
        Self { prototypes: Vec::new() }
    }
}

impl<V> TabFactoryBuilder<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(mut self, prototype: TabPrototype<V>) -> Result<Self, FactoryError> {
        if self.prototypes.iter().any(|existing| existing.key() == prototype.key()) {
            return Err(FactoryError::DuplicateKey(prototype.key().to_string()));
        }
        prototype.check_key_literal()?;
        self.prototypes.push(prototype);
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.prototypes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prototypes.is_empty()
    }

    pub fn build(self, options: TabFactoryOptions<V>) -> Result<TabFactory<V>, FactoryError> {
        if self.prototypes.is_empty() {
            return Err(FactoryError::Empty);
        }
        log::debug!("tab factory built with {} prototype(s)", self.prototypes.len());
        Ok(TabFactory::new(self.prototypes, options.error_component))
    }
}
