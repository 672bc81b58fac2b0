//! Per-render environment handed explicitly to features.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::StoreError;
use crate::store::TabStore;
use crate::tab::Tab;

/// Navigation callback supplied by the host router. `None` navigates away from any tab.
#[derive(Clone)]
pub struct Navigate(Arc<dyn Fn(Option<String>) + Send + Sync>);

impl Navigate {
    pub fn new(f: impl Fn(Option<String>) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// A navigate callback that does nothing.
    pub fn noop() -> Self {
        Self::new(|_| {})
    }

    pub fn to(&self, target: Option<&str>) {
        (self.0)(target.map(str::to_string))
    }
}

impl fmt::Debug for Navigate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Navigate(..)")
    }
}

/// Current tab id, host context and navigate callback; rebuilt whenever the active
/// tab or the context changes.
#[derive(Clone, Debug)]
pub struct TabEnv<C> {
    pub current_tab_id: Option<String>,
    pub global_context: C,
    pub navigate: Navigate,
}

impl<C> TabEnv<C> {
    pub fn new(current_tab_id: Option<String>, global_context: C, navigate: Navigate) -> Self {
        Self {
            current_tab_id,
            global_context,
            navigate,
        }
    }

    pub fn context(&self) -> &C {
        &self.global_context
    }
}

/// Everything a feature component sees once its data has loaded.
#[derive(Clone, Debug)]
pub struct FeatureScope<C> {
    pub env: TabEnv<C>,
    pub tab: Tab,
    /// Settings after schema validation (defaults filled in).
    pub settings: Value,
    pub data: Value,
    store: TabStore,
}

impl<C> FeatureScope<C> {
    pub(crate) fn new(env: TabEnv<C>, tab: Tab, settings: Value, data: Value, store: TabStore) -> Self {
        Self {
            env,
            tab,
            settings,
            data,
            store,
        }
    }

    pub fn context(&self) -> &C {
        &self.env.global_context
    }

    pub fn settings_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.settings.clone())
    }

    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }

    pub fn navigate(&self, target: Option<&str>) {
        self.env.navigate.to(target)
    }

    pub fn add_tab(&self, tab: Tab) -> Result<(), StoreError> {
        self.store.add_tab(tab)
    }

    pub fn update_tab(&self, id: &str, updater: impl FnOnce(Tab) -> Tab) -> Result<(), StoreError> {
        self.store.update_tab(id, updater)
    }

    /// Update the tab this scope renders.
    pub fn update_self(&self, updater: impl FnOnce(Tab) -> Tab) -> Result<(), StoreError> {
        self.store.update_tab(&self.tab.id, updater)
    }

    pub fn delete_tab(&self, id: &str) -> Result<Tab, StoreError> {
        self.store.delete_tab(id)
    }
}
