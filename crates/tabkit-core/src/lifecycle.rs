//! Load lifecycle per tab: `idle -> loading -> {success, error}`.
//!
//! Every load is identified by its [`DependencyKey`] `(feature_key, tab_id, deps)`.
//! The controller keeps one logical request per key: a key that is pending or already
//! resolved is never fetched again, and a resolution that arrives after the tab moved on
//! to another key only fills the cache; it never touches the tab's current state.
//! Cached results are kept per tab and dropped with it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use serde_json::Value;

use crate::error::{ErrorReport, LoaderFailure, ValidationError};
use crate::registry::{LoaderFuture, TabFeature};
use crate::store::TabStore;
use crate::tab::{FeatureKey, LoaderStatus, Tab};

/// Identity of one logical load.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyKey {
    pub feature_key: FeatureKey,
    pub tab_id: String,
    pub deps: Value,
}

impl DependencyKey {
    pub fn new(feature_key: FeatureKey, tab_id: impl Into<String>, deps: Value) -> Self {
        Self {
            feature_key,
            tab_id: tab_id.into(),
            deps,
        }
    }

    /// Canonical string form used as the cache key (object keys are sorted).
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{}/{}", self.feature_key, self.tab_id))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadError {
    Validation(ValidationError),
    Loader(LoaderFailure),
}

impl LoadError {
    pub fn report(&self) -> ErrorReport {
        match self {
            Self::Validation(err) => err.into(),
            Self::Loader(err) => err.into(),
        }
    }
}

/// What a tab currently shows.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Success(Value),
    Error(LoadError),
}

impl LoadState {
    pub fn status(&self) -> LoaderStatus {
        match self {
            Self::Idle => LoaderStatus::Idle,
            Self::Loading => LoaderStatus::Loading,
            Self::Success(_) => LoaderStatus::Success,
            Self::Error(_) => LoaderStatus::Error,
        }
    }

    fn settled(result: &Result<Value, LoaderFailure>) -> Self {
        match result {
            Ok(data) => Self::Success(data.clone()),
            Err(failure) => Self::Error(LoadError::Loader(failure.clone())),
        }
    }
}

/// A load the caller must drive: await [`LoadTicket::resolve`], then hand the result
/// to [`LifecycleController::complete`].
pub struct LoadTicket {
    key: DependencyKey,
    future: LoaderFuture,
}

impl LoadTicket {
    pub fn key(&self) -> &DependencyKey {
        &self.key
    }

    pub async fn resolve(self) -> Resolved {
        let result = self.future.await;
        Resolved { key: self.key, result }
    }
}

/// Outcome of a ticket, not yet applied.
#[derive(Debug)]
pub struct Resolved {
    pub key: DependencyKey,
    pub result: Result<Value, LoaderFailure>,
}

enum CacheEntry {
    Pending,
    Ready(Value),
}

struct TabSlot {
    /// `None` when the settings failed validation and no load was attempted.
    key: Option<DependencyKey>,
    state: LoadState,
}

/// Results by tab id, then by key fingerprint.
type TabCache = HashMap<String, HashMap<String, CacheEntry>>;

#[derive(Default)]
struct ControllerInner {
    cache: TabCache,
    slots: HashMap<String, TabSlot>,
}

impl ControllerInner {
    fn cached(&self, key: &DependencyKey, fingerprint: &str) -> Option<&CacheEntry> {
        self.cache.get(&key.tab_id).and_then(|entries| entries.get(fingerprint))
    }

    fn remove_cached(&mut self, key: &DependencyKey, fingerprint: &str) {
        if let Some(entries) = self.cache.get_mut(&key.tab_id) {
            entries.remove(fingerprint);
            if entries.is_empty() {
                self.cache.remove(&key.tab_id);
            }
        }
    }
}

/// Drives per-tab loads and mirrors their status into the `TabStore`.
#[derive(Clone)]
pub struct LifecycleController {
    store: TabStore,
    inner: Arc<Mutex<ControllerInner>>,
}

impl LifecycleController {
    pub fn new(store: TabStore) -> Self {
        Self {
            store,
            inner: Arc::new(Mutex::new(ControllerInner::default())),
        }
    }

    pub fn store(&self) -> &TabStore {
        &self.store
    }

    pub fn state(&self, tab_id: &str) -> LoadState {
        self.with_inner(|inner| {
            inner
                .slots
                .get(tab_id)
                .map(|slot| slot.state.clone())
                .unwrap_or_default()
        })
    }

    pub fn current_key(&self, tab_id: &str) -> Option<DependencyKey> {
        self.with_inner(|inner| inner.slots.get(tab_id).and_then(|slot| slot.key.clone()))
    }

    /// Make `tab` track the load for `deps`.
    ///
    /// Returns a ticket only when a new request has to be issued. An unchanged key, a
    /// pending key, or a cached key returns `None`; the state is then read via `state`.
    pub fn request<C, V>(&self, feature: &TabFeature<C, V>, tab: &Tab, deps: Value) -> Option<LoadTicket> {
        let key = DependencyKey::new(feature.key().clone(), tab.id.clone(), deps);
        let fingerprint = key.fingerprint();

        let (ticket, status) = {
            let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let inner = &mut *guard;
            if let Some(slot) = inner.slots.get(&tab.id) {
                if slot.key.as_ref() == Some(&key) {
                    return None;
                }
            }

            let (state, ticket) = match inner.cached(&key, &fingerprint) {
                Some(CacheEntry::Ready(data)) => {
                    log::debug!("lifecycle: '{}' reuses cached {}", tab.id, fingerprint);
                    (LoadState::Success(data.clone()), None)
                }
                Some(CacheEntry::Pending) => {
                    log::debug!("lifecycle: '{}' waits on in-flight {}", tab.id, fingerprint);
                    (LoadState::Loading, None)
                }
                None => {
                    log::debug!("lifecycle: '{}' loading {}", tab.id, fingerprint);
                    inner
                        .cache
                        .entry(tab.id.clone())
                        .or_default()
                        .insert(fingerprint, CacheEntry::Pending);
                    let future = feature.load(key.deps.clone());
                    (
                        LoadState::Loading,
                        Some(LoadTicket {
                            key: key.clone(),
                            future,
                        }),
                    )
                }
            };

            let status = state.status();
            inner.slots.insert(
                tab.id.clone(),
                TabSlot {
                    key: Some(key),
                    state,
                },
            );
            (ticket, status)
        };

        self.store.set_loader_status(&tab.id, status);
        ticket
    }

    /// Apply a resolved load. Returns `false` when the result is stale (the tab has
    /// moved on to another key, or is gone). A stale success is still cached while
    /// the tab is tracked; results for forgotten tabs are discarded.
    pub fn complete(&self, resolved: Resolved) -> bool {
        let Resolved { key, result } = resolved;
        let fingerprint = key.fingerprint();

        let applied = {
            let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let inner = &mut *guard;
            let tracked = inner.slots.contains_key(&key.tab_id);
            match &result {
                Ok(data) if tracked => {
                    inner
                        .cache
                        .entry(key.tab_id.clone())
                        .or_default()
                        .insert(fingerprint.clone(), CacheEntry::Ready(data.clone()));
                }
                // failures are not cached, a retry fetches again
                _ => inner.remove_cached(&key, &fingerprint),
            }

            match inner.slots.get_mut(&key.tab_id) {
                Some(slot) if slot.key.as_ref() == Some(&key) => {
                    slot.state = LoadState::settled(&result);
                    Some(slot.state.status())
                }
                _ => None,
            }
        };

        match applied {
            Some(status) => {
                log::debug!("lifecycle: '{}' -> {}", key.tab_id, status.as_str());
                self.store.set_loader_status(&key.tab_id, status);
                true
            }
            None => {
                log::warn!("lifecycle: dropping stale result for {}", fingerprint);
                false
            }
        }
    }

    /// Resolve a ticket and apply it.
    pub async fn drive(&self, ticket: LoadTicket) -> bool {
        let resolved = ticket.resolve().await;
        self.complete(resolved)
    }

    /// Settings failed validation: the tab shows the error and nothing is loaded.
    pub fn fail_validation(&self, tab_id: &str, error: ValidationError) {
        let changed = self.with_inner(|inner| {
            let state = LoadState::Error(LoadError::Validation(error));
            match inner.slots.get(tab_id) {
                Some(slot) if slot.key.is_none() && slot.state == state => false,
                _ => {
                    inner.slots.insert(tab_id.to_string(), TabSlot { key: None, state });
                    true
                }
            }
        });
        if changed {
            log::debug!("lifecycle: '{}' has invalid settings", tab_id);
            self.store.set_loader_status(tab_id, LoaderStatus::Error);
        }
    }

    /// Forget the tab's current key so the next `request` fetches again.
    pub fn retry(&self, tab_id: &str) {
        self.with_inner(|inner| {
            if let Some(slot) = inner.slots.remove(tab_id) {
                if let Some(key) = slot.key {
                    let fingerprint = key.fingerprint();
                    if matches!(inner.cached(&key, &fingerprint), Some(CacheEntry::Ready(_))) {
                        inner.remove_cached(&key, &fingerprint);
                    }
                }
            }
        });
        self.store.set_loader_status(tab_id, LoaderStatus::Idle);
    }

    /// Drop everything known about a tab (after it is closed).
    pub fn forget(&self, tab_id: &str) {
        self.with_inner(|inner| {
            inner.slots.remove(tab_id);
            inner.cache.remove(tab_id);
        });
    }

    /// Forget every tracked tab `keep` rejects.
    pub fn retain_tabs(&self, keep: impl Fn(&str) -> bool) {
        let gone: Vec<String> = self.with_inner(|inner| {
            let mut gone: Vec<String> = inner
                .slots
                .keys()
                .chain(inner.cache.keys())
                .filter(|id| !keep(id))
                .cloned()
                .collect();
            gone.sort();
            gone.dedup();
            gone
        });
        for id in gone {
            log::debug!("lifecycle: forgetting closed tab '{}'", id);
            self.forget(&id);
        }
    }

    /// Number of cached or pending results across all tabs.
    pub fn cached_len(&self) -> usize {
        self.with_inner(|inner| inner.cache.values().map(HashMap::len).sum())
    }

    pub fn clear(&self) {
        self.with_inner(|inner| {
            inner.slots.clear();
            inner.cache.clear();
        });
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut ControllerInner) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::FeatureScope;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::oneshot;

    #[derive(Serialize, Deserialize)]
    struct Query {
        q: String,
    }

    fn counting_feature(calls: Arc<AtomicUsize>) -> TabFeature<(), String> {
        TabFeature::builder("search", |_: &FeatureScope<()>| String::new())
            .loader_dependencies(|_: &(), tab: &Tab| Query {
                q: tab.settings["q"].as_str().unwrap_or_default().to_string(),
            })
            .loader(move |query: Query| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if query.q == "boom" {
                        Err(LoaderFailure::new("search failed"))
                    } else {
                        Ok(json!({ "results": [query.q] }))
                    }
                }
            })
            .build()
    }

    fn setup(q: &str) -> (TabStore, LifecycleController, Tab) {
        let store = TabStore::new();
        let tab = Tab::with_id("t1", "search", "Search", json!({ "q": q }));
        store.add_tab(tab.clone()).unwrap();
        let controller = LifecycleController::new(store.clone());
        (store, controller, tab)
    }

    fn request(controller: &LifecycleController, feature: &TabFeature<(), String>, tab: &Tab) -> Option<LoadTicket> {
        let deps = feature.dependencies(&(), tab);
        controller.request(feature, tab, deps)
    }

    #[tokio::test]
    async fn test_loading_then_success() {
        let calls = Arc::new(AtomicUsize::new(0));
        let feature = counting_feature(calls.clone());
        let (store, controller, tab) = setup("rust");

        assert_eq!(controller.state("t1"), LoadState::Idle);
        let ticket = request(&controller, &feature, &tab).expect("first mount loads");
        assert_eq!(controller.state("t1"), LoadState::Loading);
        assert_eq!(store.status("t1"), Some(LoaderStatus::Loading));

        assert!(controller.drive(ticket).await);
        assert_eq!(controller.state("t1"), LoadState::Success(json!({ "results": ["rust"] })));
        assert_eq!(store.status("t1"), Some(LoaderStatus::Success));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_same_key_is_requested_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let feature = counting_feature(calls.clone());
        let (_store, controller, tab) = setup("rust");

        let ticket = request(&controller, &feature, &tab).unwrap();
        assert!(request(&controller, &feature, &tab).is_none());
        controller.drive(ticket).await;
        assert!(request(&controller, &feature, &tab).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_resolution_does_not_overwrite_newer_key() {
        let calls = Arc::new(AtomicUsize::new(0));
        let feature = counting_feature(calls);
        let (store, controller, tab_x) = setup("x");

        let ticket_x = request(&controller, &feature, &tab_x).unwrap();

        store
            .update_tab("t1", |mut t| {
                t.settings = json!({ "q": "y" });
                t
            })
            .unwrap();
        let tab_y = store.get("t1").unwrap();
        let ticket_y = request(&controller, &feature, &tab_y).unwrap();

        assert!(controller.drive(ticket_y).await);
        assert!(!controller.drive(ticket_x).await);

        assert_eq!(controller.state("t1"), LoadState::Success(json!({ "results": ["y"] })));
        assert_eq!(store.status("t1"), Some(LoaderStatus::Success));
        assert_eq!(controller.current_key("t1").unwrap().deps, json!({ "q": "y" }));
    }

    #[tokio::test]
    async fn test_switching_back_reuses_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let feature = counting_feature(calls.clone());
        let (_store, controller, tab_x) = setup("x");
        let mut tab_y = tab_x.clone();
        tab_y.settings = json!({ "q": "y" });

        let ticket = request(&controller, &feature, &tab_x).unwrap();
        controller.drive(ticket).await;
        let ticket = request(&controller, &feature, &tab_y).unwrap();
        controller.drive(ticket).await;

        assert!(request(&controller, &feature, &tab_x).is_none());
        assert_eq!(controller.state("t1"), LoadState::Success(json!({ "results": ["x"] })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pending_key_is_not_requested_twice() {
        let calls = Arc::new(AtomicUsize::new(0));
        let feature = counting_feature(calls.clone());
        let (_store, controller, tab_x) = setup("x");
        let mut tab_y = tab_x.clone();
        tab_y.settings = json!({ "q": "y" });

        let ticket_x = request(&controller, &feature, &tab_x).unwrap();
        let _ticket_y = request(&controller, &feature, &tab_y).unwrap();
        assert!(request(&controller, &feature, &tab_x).is_none());
        assert_eq!(controller.state("t1"), LoadState::Loading);

        assert!(controller.drive(ticket_x).await);
        assert_eq!(controller.state("t1"), LoadState::Success(json!({ "results": ["x"] })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failure_then_retry() {
        let calls = Arc::new(AtomicUsize::new(0));
        let feature = counting_feature(calls.clone());
        let (store, controller, tab) = setup("boom");

        let ticket = request(&controller, &feature, &tab).unwrap();
        assert!(controller.drive(ticket).await);
        match controller.state("t1") {
            LoadState::Error(LoadError::Loader(failure)) => assert_eq!(failure.message, "search failed"),
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(store.status("t1"), Some(LoaderStatus::Error));

        assert!(request(&controller, &feature, &tab).is_none());
        controller.retry("t1");
        assert_eq!(store.status("t1"), Some(LoaderStatus::Idle));
        assert!(request(&controller, &feature, &tab).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_outstanding_load_stays_loading() {
        let (sender, receiver) = oneshot::channel::<Value>();
        let receiver = Arc::new(Mutex::new(Some(receiver)));
        let feature: TabFeature<(), String> = TabFeature::builder("slow", |_: &FeatureScope<()>| String::new())
            .loader(move |_: Value| {
                let receiver = receiver.lock().unwrap().take();
                async move {
                    match receiver {
                        Some(receiver) => receiver.await.map_err(|_| LoaderFailure::new("cancelled")),
                        None => Err(LoaderFailure::new("loaded twice")),
                    }
                }
            })
            .build();
        let store = TabStore::new();
        let tab = Tab::with_id("s1", "slow", "Slow", json!({}));
        store.add_tab(tab.clone()).unwrap();
        let controller = LifecycleController::new(store.clone());

        let ticket = controller.request(&feature, &tab, Value::Null).unwrap();
        assert_eq!(store.status("s1"), Some(LoaderStatus::Loading));

        sender.send(json!("done")).unwrap();
        controller.drive(ticket).await;
        assert_eq!(controller.state("s1"), LoadState::Success(json!("done")));
    }

    #[tokio::test]
    async fn test_result_for_closed_tab_is_dropped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let feature = counting_feature(calls);
        let (store, controller, tab) = setup("x");

        let ticket = request(&controller, &feature, &tab).unwrap();
        store.delete_tab("t1").unwrap();
        controller.forget("t1");

        assert!(!controller.drive(ticket).await);
        assert_eq!(controller.state("t1"), LoadState::Idle);
        assert_eq!(store.status("t1"), None);
        assert_eq!(controller.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_late_results_for_closed_tabs_are_not_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let feature = counting_feature(calls);
        let store = TabStore::new();
        let controller = LifecycleController::new(store.clone());

        let mut tickets = Vec::new();
        for i in 0..100 {
            let tab = Tab::with_id(format!("t{}", i), "search", "Search", json!({ "q": i.to_string() }));
            store.add_tab(tab.clone()).unwrap();
            tickets.push(request(&controller, &feature, &tab).unwrap());
            store.delete_tab(&tab.id).unwrap();
            controller.forget(&tab.id);
        }
        for ticket in tickets {
            assert!(!controller.drive(ticket).await);
        }

        assert_eq!(controller.cached_len(), 0);
    }

    #[tokio::test]
    async fn test_forget_drops_every_key_of_the_tab() {
        let calls = Arc::new(AtomicUsize::new(0));
        let feature = counting_feature(calls);
        let (_store, controller, tab_x) = setup("x");
        let mut tab_y = tab_x.clone();
        tab_y.settings = json!({ "q": "y" });
        let other = Tab::with_id("t2", "search", "Other", json!({ "q": "x" }));

        controller.drive(request(&controller, &feature, &tab_x).unwrap()).await;
        controller.drive(request(&controller, &feature, &tab_y).unwrap()).await;
        controller.drive(request(&controller, &feature, &other).unwrap()).await;
        assert_eq!(controller.cached_len(), 3);

        controller.forget("t1");
        assert_eq!(controller.cached_len(), 1);
        assert_eq!(controller.state("t2"), LoadState::Success(json!({ "results": ["x"] })));
    }

    #[tokio::test]
    async fn test_retain_tabs_forgets_closed_ones() {
        let calls = Arc::new(AtomicUsize::new(0));
        let feature = counting_feature(calls.clone());
        let (store, controller, tab) = setup("x");
        let other = Tab::with_id("t2", "search", "Other", json!({ "q": "y" }));
        store.add_tab(other.clone()).unwrap();

        controller.drive(request(&controller, &feature, &tab).unwrap()).await;
        controller.drive(request(&controller, &feature, &other).unwrap()).await;

        store.delete_tab("t1").unwrap();
        controller.retain_tabs(|id| store.get(id).is_some());

        assert_eq!(controller.state("t1"), LoadState::Idle);
        assert_eq!(controller.current_key("t2").map(|key| key.tab_id), Some("t2".to_string()));

        // t1's cached result went with it
        store.add_tab(tab.clone()).unwrap();
        assert!(request(&controller, &feature, &tab).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_validation_failure_is_error_state() {
        let store = TabStore::new();
        store.add_tab(Tab::with_id("t1", "search", "S", json!({}))).unwrap();
        let controller = LifecycleController::new(store.clone());
        let err = ValidationError::single(vec!["q".into()], "required field is missing");

        controller.fail_validation("t1", err.clone());
        assert_eq!(controller.state("t1"), LoadState::Error(LoadError::Validation(err)));
        assert_eq!(store.status("t1"), Some(LoaderStatus::Error));
        assert_eq!(controller.current_key("t1"), None);
    }

    #[test]
    fn test_fingerprint_is_order_independent() {
        let a = DependencyKey::new("f".into(), "t", json!({ "a": 1, "b": 2 }));
        let b = DependencyKey::new("f".into(), "t", json!({ "b": 2, "a": 1 }));
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
}
