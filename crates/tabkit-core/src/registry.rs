//! Feature definitions and the key -> feature registry.
//!
//! A [`TabFeature`] bundles a settings schema, the async loader with its dependency
//! function, the views for each lifecycle state and optional close/persist hooks.
//! Features are built once at setup and registered together; the registry is immutable
//! afterwards and shared behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::env::FeatureScope;
use crate::error::{DuplicateKeyError, LoaderFailure, StoreError, ValidationError};
use crate::schema::{AnySchema, SchemaRef, SettingsSchema};
use crate::store::TabStore;
use crate::tab::{FeatureKey, Tab};

/// Erased loader result. Loaders run on a single-threaded executor, so no `Send`.
pub type LoaderFuture = Pin<Box<dyn Future<Output = Result<Value, LoaderFailure>>>>;

type ComponentFn<C, V> = Arc<dyn Fn(&FeatureScope<C>) -> V + Send + Sync>;
type LoadingFn<V> = Arc<dyn Fn() -> V + Send + Sync>;
type ErrorFn<V> = Arc<dyn Fn(&str) -> V + Send + Sync>;
type DepsFn<C> = Arc<dyn Fn(&C, &Tab) -> Value + Send + Sync>;
type LoaderFn = Arc<dyn Fn(Value) -> LoaderFuture + Send + Sync>;
type HookFn<C> = Arc<dyn Fn(&Tab, &C) + Send + Sync>;

pub struct TabFeature<C, V> {
    key: FeatureKey,
    schema: SchemaRef,
    meta_schema: Option<SchemaRef>,
    component: ComponentFn<C, V>,
    loading_component: Option<LoadingFn<V>>,
    error_component: Option<ErrorFn<V>>,
    loader_dependencies: DepsFn<C>,
    loader: LoaderFn,
    on_close: Option<HookFn<C>>,
    on_persist: Option<HookFn<C>>,
}

impl<C, V> Clone for TabFeature<C, V> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            schema: self.schema.clone(),
            meta_schema: self.meta_schema.clone(),
            component: self.component.clone(),
            loading_component: self.loading_component.clone(),
            error_component: self.error_component.clone(),
            loader_dependencies: self.loader_dependencies.clone(),
            loader: self.loader.clone(),
            on_close: self.on_close.clone(),
            on_persist: self.on_persist.clone(),
        }
    }
}

impl<C, V> fmt::Debug for TabFeature<C, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabFeature")
            .field("key", &self.key)
            .field("loading_component", &self.loading_component.is_some())
            .field("error_component", &self.error_component.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_persist", &self.on_persist.is_some())
            .finish()
    }
}

impl<C: 'static, V: 'static> TabFeature<C, V> {
    /// Start a feature definition; `component` renders the loaded state.
    pub fn builder(
        key: impl Into<FeatureKey>,
        component: impl Fn(&FeatureScope<C>) -> V + Send + Sync + 'static,
    ) -> TabFeatureBuilder<C, V> {
        TabFeatureBuilder {
            feature: TabFeature {
                key: key.into(),
                schema: Arc::new(AnySchema),
                meta_schema: None,
                component: Arc::new(component),
                loading_component: None,
                error_component: None,
                loader_dependencies: Arc::new(|_: &C, _: &Tab| Value::Null),
                loader: Arc::new(|_: Value| -> LoaderFuture { Box::pin(std::future::ready(Ok(Value::Null))) }),
                on_close: None,
                on_persist: None,
            },
        }
    }
}

impl<C, V> TabFeature<C, V> {
    pub fn key(&self) -> &FeatureKey {
        &self.key
    }

    pub fn parse_settings(&self, raw: &Value) -> Result<Value, ValidationError> {
        self.schema.parse(raw)
    }

    /// Validate feature metadata against the metadata schema, if one is declared.
    pub fn validate_meta(&self, meta: &Value) -> Result<Value, ValidationError> {
        match &self.meta_schema {
            Some(schema) => schema.parse(meta),
            None => Ok(meta.clone()),
        }
    }

    pub fn dependencies(&self, context: &C, tab: &Tab) -> Value {
        (self.loader_dependencies)(context, tab)
    }

    pub fn load(&self, deps: Value) -> LoaderFuture {
        (self.loader)(deps)
    }

    pub fn render(&self, scope: &FeatureScope<C>) -> V {
        (self.component)(scope)
    }

    pub fn render_loading(&self) -> Option<V> {
        self.loading_component.as_ref().map(|view| view())
    }

    pub fn render_error(&self, error: &str) -> Option<V> {
        self.error_component.as_ref().map(|view| view(error))
    }

    pub fn on_close(&self, tab: &Tab, context: &C) {
        if let Some(hook) = &self.on_close {
            hook(tab, context);
        }
    }

    pub fn on_persist(&self, tab: &Tab, context: &C) {
        if let Some(hook) = &self.on_persist {
            hook(tab, context);
        }
    }
}

pub struct TabFeatureBuilder<C, V> {
    feature: TabFeature<C, V>,
}

impl<C: 'static, V: 'static> TabFeatureBuilder<C, V> {
    pub fn schema(mut self, schema: impl SettingsSchema + 'static) -> Self {
        self.feature.schema = Arc::new(schema);
        self
    }

    pub fn meta_schema(mut self, schema: impl SettingsSchema + 'static) -> Self {
        self.feature.meta_schema = Some(Arc::new(schema));
        self
    }

    pub fn loading_component(mut self, view: impl Fn() -> V + Send + Sync + 'static) -> Self {
        self.feature.loading_component = Some(Arc::new(view));
        self
    }

    /// Error view; receives the failure serialized to a display-safe string.
    pub fn error_component(mut self, view: impl Fn(&str) -> V + Send + Sync + 'static) -> Self {
        self.feature.error_component = Some(Arc::new(view));
        self
    }

    /// Dependencies of the loader. The loader re-runs whenever they change.
    pub fn loader_dependencies<D, F>(mut self, deps: F) -> Self
    where
        D: Serialize + 'static,
        F: Fn(&C, &Tab) -> D + Send + Sync + 'static,
    {
        self.feature.loader_dependencies = Arc::new(move |context: &C, tab: &Tab| {
            serde_json::to_value(deps(context, tab)).unwrap_or_else(|err| {
                log::warn!("loader dependencies for tab '{}' are not serializable: {}", tab.id, err);
                Value::Null
            })
        });
        self
    }

    /// The async loader, called with the deserialized dependencies.
    pub fn loader<D, T, E, Fut, F>(mut self, loader: F) -> Self
    where
        D: DeserializeOwned + 'static,
        T: Serialize + 'static,
        E: Into<LoaderFailure> + 'static,
        Fut: Future<Output = Result<T, E>> + 'static,
        F: Fn(D) -> Fut + Send + Sync + 'static,
    {
        self.feature.loader = Arc::new(move |deps: Value| -> LoaderFuture {
            let pending = match serde_json::from_value::<D>(deps) {
                Ok(deps) => loader(deps),
                Err(err) => {
                    let failed: LoaderFuture = Box::pin(std::future::ready(Err(LoaderFailure::from(err))));
                    return failed;
                }
            };
            Box::pin(async move {
                let data = pending.await.map_err(Into::<LoaderFailure>::into)?;
                let value: Result<Value, LoaderFailure> =
                    serde_json::to_value(data).map_err(LoaderFailure::from);
                value
            })
        });
        self
    }

    pub fn on_close(mut self, hook: impl Fn(&Tab, &C) + Send + Sync + 'static) -> Self {
        self.feature.on_close = Some(Arc::new(hook));
        self
    }

    pub fn on_persist(mut self, hook: impl Fn(&Tab, &C) + Send + Sync + 'static) -> Self {
        self.feature.on_persist = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> TabFeature<C, V> {
        self.feature
    }
}

/// Immutable key -> feature lookup table.
pub struct FeatureRegistry<C, V> {
    features: HashMap<String, TabFeature<C, V>>,
    order: Vec<FeatureKey>,
}

impl<C, V> fmt::Debug for FeatureRegistry<C, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeatureRegistry").field("keys", &self.order).finish()
    }
}

impl<C, V> FeatureRegistry<C, V> {
    /// Build the registry; two features with the same key abort construction.
    pub fn register(
        features: impl IntoIterator<Item = TabFeature<C, V>>,
    ) -> Result<Self, DuplicateKeyError> {
        let mut map = HashMap::new();
        let mut order = Vec::new();
        for feature in features {
            let key = feature.key().clone();
            if map.contains_key(key.as_str()) {
                return Err(DuplicateKeyError(key.as_str().to_string()));
            }
            map.insert(key.as_str().to_string(), feature);
            order.push(key);
        }
        log::debug!("feature registry built with {} feature(s)", order.len());
        Ok(Self { features: map, order })
    }

    pub fn lookup(&self, key: &str) -> Option<&TabFeature<C, V>> {
        self.features.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.features.contains_key(key)
    }

    /// Keys in registration order.
    pub fn keys(&self) -> &[FeatureKey] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Run the feature's `on_close` hook, then remove the tab from the store.
    ///
    /// Tabs whose feature is not registered are removed without a hook.
    pub fn close_tab(&self, store: &TabStore, id: &str, context: &C) -> Result<Tab, StoreError> {
        let tab = store.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        match self.lookup(tab.feature_key.as_str()) {
            Some(feature) => feature.on_close(&tab, context),
            None => log::warn!("close_tab: no feature '{}' for tab '{}'", tab.feature_key, id),
        }
        store.delete_tab(id)
    }

    /// Run the feature's `on_persist` hook for a tab.
    pub fn persist_tab(&self, store: &TabStore, id: &str, context: &C) -> Result<(), StoreError> {
        let tab = store.get(id).ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if let Some(feature) = self.lookup(tab.feature_key.as_str()) {
            feature.on_persist(&tab, context);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSchema, ObjectSchema};
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn feature(key: &str) -> TabFeature<(), String> {
        let label = key.to_string();
        TabFeature::builder(key, move |_scope: &FeatureScope<()>| label.clone()).build()
    }

    #[test]
    fn test_distinct_keys_register() {
        let registry = FeatureRegistry::register(vec![feature("profile"), feature("settings")]).unwrap();
        assert_eq!(registry.len(), 2);
        assert!(registry.lookup("profile").is_some());
        assert!(registry.lookup("missing").is_none());
        assert_eq!(
            registry.keys(),
            &[FeatureKey::new("profile"), FeatureKey::new("settings")]
        );
    }

    #[test]
    fn test_duplicate_key_fails() {
        let err = FeatureRegistry::register(vec![feature("profile"), feature("profile")]).unwrap_err();
        assert_eq!(err, DuplicateKeyError("profile".into()));
    }

    #[test]
    fn test_schema_and_meta_validation() {
        let feature: TabFeature<(), String> =
            TabFeature::builder("profile", |_: &FeatureScope<()>| String::new())
                .schema(ObjectSchema::new().field(FieldSchema::string("userId")))
                .meta_schema(ObjectSchema::new().field(FieldSchema::string("icon")))
                .build();
        assert!(feature.parse_settings(&json!({ "userId": "1" })).is_ok());
        assert!(feature.parse_settings(&json!({ "userId": 1 })).is_err());
        assert!(feature.validate_meta(&json!({ "icon": "user" })).is_ok());
        assert!(feature.validate_meta(&json!({})).is_err());
    }

    #[derive(Serialize, Deserialize)]
    struct Deps {
        user_id: String,
    }

    #[tokio::test]
    async fn test_typed_loader_round_trips_through_value() {
        let feature: TabFeature<(), String> =
            TabFeature::builder("profile", |_: &FeatureScope<()>| String::new())
                .loader_dependencies(|_: &(), tab: &Tab| Deps {
                    user_id: tab.settings["userId"].as_str().unwrap_or_default().to_string(),
                })
                .loader(|deps: Deps| async move {
                    Ok::<_, LoaderFailure>(json!({ "name": format!("user {}", deps.user_id) }))
                })
                .build();

        let tab = Tab::with_id("p1", "profile", "P", json!({ "userId": "123" }));
        let deps = feature.dependencies(&(), &tab);
        assert_eq!(deps, json!({ "user_id": "123" }));
        let data = feature.load(deps).await.unwrap();
        assert_eq!(data, json!({ "name": "user 123" }));

        let bad = feature.load(json!(42)).await.unwrap_err();
        assert!(bad.message.contains("(de)serialized"));
    }

    #[test]
    fn test_close_runs_hook_then_deletes() {
        let closed = Arc::new(AtomicUsize::new(0));
        let hook_count = closed.clone();
        let feature: TabFeature<(), String> =
            TabFeature::builder("profile", |_: &FeatureScope<()>| String::new())
                .on_close(move |_tab, _ctx| {
                    hook_count.fetch_add(1, Ordering::SeqCst);
                })
                .build();
        let registry = FeatureRegistry::register(vec![feature]).unwrap();
        let store = TabStore::new();
        store
            .add_tab(Tab::with_id("p1", "profile", "P", json!({})))
            .unwrap();

        registry.persist_tab(&store, "p1", &()).unwrap();
        let removed = registry.close_tab(&store, "p1", &()).unwrap();
        assert_eq!(removed.id, "p1");
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(store.is_empty());
        assert!(registry.close_tab(&store, "p1", &()).is_err());
    }
}
