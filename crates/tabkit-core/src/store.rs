//! Tab store: ordered tab records, the active-tab pointer and per-tab loader status.
//!
//! `TabStore` is a cheap cloneable handle. Every mutation goes through one of its
//! operations; observers register with `subscribe(selector, callback)` and are only
//! called back when their selected slice changes.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};

use crate::config::DuplicateTabPolicy;
use crate::error::StoreError;
use crate::tab::{LoaderStatus, Tab};

/// Snapshot of everything the store owns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TabsState {
    pub tabs: HashMap<String, Tab>,
    pub order: Vec<String>,
    pub active_id: Option<String>,
    pub loader_status: HashMap<String, LoaderStatus>,
}

impl TabsState {
    pub fn get(&self, id: &str) -> Option<&Tab> {
        self.tabs.get(id)
    }

    /// Tabs in insertion order.
    pub fn ordered(&self) -> Vec<&Tab> {
        self.order.iter().filter_map(|id| self.tabs.get(id)).collect()
    }

    pub fn active(&self) -> Option<&Tab> {
        self.active_id.as_deref().and_then(|id| self.tabs.get(id))
    }

    pub fn status(&self, id: &str) -> Option<LoaderStatus> {
        self.loader_status.get(id).copied()
    }
}

type Listener = Arc<dyn Fn(&TabsState) + Send + Sync>;

struct Inner {
    state: TabsState,
    listeners: Vec<(u64, Listener)>,
    next_listener: u64,
    on_duplicate: DuplicateTabPolicy,
}

#[derive(Clone)]
pub struct TabStore {
    inner: Arc<RwLock<Inner>>,
}

impl fmt::Debug for TabStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TabStore").field("len", &self.len()).finish()
    }
}

impl Default for TabStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TabStore {
    pub fn new() -> Self {
        Self::with_policy(DuplicateTabPolicy::default())
    }

    pub fn with_policy(on_duplicate: DuplicateTabPolicy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                state: TabsState::default(),
                listeners: Vec::new(),
                next_listener: 1,
                on_duplicate,
            })),
        }
    }

    pub fn policy(&self) -> DuplicateTabPolicy {
        self.read(|inner| inner.on_duplicate)
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Read-only projection over the current state.
    pub fn select<T>(&self, selector: impl FnOnce(&TabsState) -> T) -> T {
        self.read(|inner| selector(&inner.state))
    }

    pub fn snapshot(&self) -> TabsState {
        self.select(TabsState::clone)
    }

    pub fn get(&self, id: &str) -> Option<Tab> {
        self.select(|s| s.tabs.get(id).cloned())
    }

    pub fn tabs(&self) -> Vec<Tab> {
        self.select(|s| s.ordered().into_iter().cloned().collect())
    }

    pub fn active_id(&self) -> Option<String> {
        self.select(|s| s.active_id.clone())
    }

    pub fn status(&self, id: &str) -> Option<LoaderStatus> {
        self.select(|s| s.status(id))
    }

    pub fn len(&self) -> usize {
        self.select(|s| s.order.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    pub fn add_tab(&self, tab: Tab) -> Result<(), StoreError> {
        self.try_mutate(|inner| {
            let id = tab.id.clone();
            if inner.state.tabs.contains_key(&id) {
                match inner.on_duplicate {
                    DuplicateTabPolicy::Reject => return Err(StoreError::DuplicateId(id)),
                    DuplicateTabPolicy::Replace => {
                        log::debug!("add_tab: replacing existing tab '{}'", id);
                        inner.state.tabs.insert(id.clone(), tab);
                        inner.state.loader_status.insert(id, LoaderStatus::Idle);
                        return Ok(());
                    }
                }
            }
            log::debug!("add_tab: '{}' ({})", id, tab.feature_key);
            inner.state.tabs.insert(id.clone(), tab);
            inner.state.order.push(id.clone());
            inner.state.loader_status.insert(id, LoaderStatus::Idle);
            Ok(())
        })
    }

    /// Replace the tab at `id` with `updater(current)`.
    ///
    /// An updater that changes the id is rejected and leaves the store untouched.
    pub fn update_tab(&self, id: &str, updater: impl FnOnce(Tab) -> Tab) -> Result<(), StoreError> {
        self.try_mutate(|inner| {
            let current = inner
                .state
                .tabs
                .get(id)
                .cloned()
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            let next = updater(current);
            if next.id != id {
                return Err(StoreError::IdMismatch {
                    expected: id.to_string(),
                    actual: next.id,
                });
            }
            inner.state.tabs.insert(id.to_string(), next);
            Ok(())
        })
    }

    /// Remove a tab; if it was active, the next tab in order (else the previous one,
    /// else none) becomes active.
    pub fn delete_tab(&self, id: &str) -> Result<Tab, StoreError> {
        self.try_mutate(|inner| {
            let state = &mut inner.state;
            let removed = state
                .tabs
                .remove(id)
                .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
            state.loader_status.remove(id);
            let position = state.order.iter().position(|candidate| candidate == id);
            if let Some(position) = position {
                state.order.remove(position);
            }

            if state.active_id.as_deref() == Some(id) {
                let next_active = position.and_then(|position| {
                    state
                        .order
                        .get(position)
                        .or_else(|| position.checked_sub(1).and_then(|prev| state.order.get(prev)))
                        .cloned()
                });
                log::debug!("delete_tab: '{}' was active, next active {:?}", id, next_active);
                state.active_id = next_active;
            }
            Ok(removed)
        })
    }

    /// Set the active id. The id is not checked against the store, so a host may
    /// activate a tab it is about to add.
    pub fn set_active(&self, id: Option<&str>) {
        self.mutate(|inner| inner.state.active_id = id.map(str::to_string));
    }

    /// Record the load status of a tab. Statuses for ids the store does not hold
    /// (for example a tab deleted while loading) are dropped.
    pub fn set_loader_status(&self, id: &str, status: LoaderStatus) {
        self.mutate(|inner| {
            if !inner.state.tabs.contains_key(id) {
                log::debug!("set_loader_status: ignoring '{}' for unknown tab '{}'", status.as_str(), id);
                return;
            }
            inner.state.loader_status.insert(id.to_string(), status);
        });
    }

    pub fn clear_all(&self) {
        self.mutate(|inner| inner.state = TabsState::default());
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Call `callback` with the new slice whenever `selector`'s result changes.
    ///
    /// The selector is evaluated once on subscribe to seed the comparison; the callback
    /// is not called for that initial value.
    pub fn subscribe<T, S, F>(&self, selector: S, callback: F) -> Subscription
    where
        T: PartialEq + Send + 'static,
        S: Fn(&TabsState) -> T + Send + Sync + 'static,
        F: Fn(&T) + Send + Sync + 'static,
    {
        let last = Mutex::new(self.select(&selector));
        let listener: Listener = Arc::new(move |state: &TabsState| {
            let next = selector(state);
            let mut last = last.lock().unwrap_or_else(PoisonError::into_inner);
            if *last != next {
                callback(&next);
                *last = next;
            }
        });

        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let id = guard.next_listener;
        guard.next_listener += 1;
        guard.listeners.push((id, listener));

        Subscription {
            store: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.read(|inner| inner.listeners.len())
    }

    fn read<T>(&self, f: impl FnOnce(&Inner) -> T) -> T {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    /// `mutate` for operations that can be rejected.
    fn try_mutate<T, E>(&self, f: impl FnOnce(&mut Inner) -> Result<T, E>) -> Result<T, E> {
        self.mutate(f)
    }

    /// Apply a mutation and notify listeners after the lock is released, unless the
    /// state is unchanged. Fallible operations check before they write, so an `Err`
    /// leaves the state untouched and notifies nobody.
    fn mutate<T>(&self, f: impl FnOnce(&mut Inner) -> T) -> T {
        let (result, state, listeners) = {
            let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
            let before = guard.state.clone();
            let result = f(&mut guard);
            if guard.state == before {
                return result;
            }
            let listeners: Vec<Listener> = guard.listeners.iter().map(|(_, l)| l.clone()).collect();
            (result, guard.state.clone(), listeners)
        };
        for listener in listeners {
            listener(&state);
        }
        result
    }
}

/// Keeps a `TabStore::subscribe` registration alive; dropping it unsubscribes.
pub struct Subscription {
    store: Weak<RwLock<Inner>>,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(store) = self.store.upgrade() {
            let mut guard = store.write().unwrap_or_else(PoisonError::into_inner);
            guard.listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn tab(id: &str) -> Tab {
        Tab::with_id(id, "profile", id.to_uppercase(), json!({ "userId": id }))
    }

    fn store_with(ids: &[&str], active: &str) -> TabStore {
        let store = TabStore::new();
        for id in ids {
            store.add_tab(tab(id)).unwrap();
        }
        store.set_active(Some(active));
        store
    }

    #[test]
    fn test_add_then_select_round_trip() {
        let store = TabStore::new();
        let t = tab("p1");
        store.add_tab(t.clone()).unwrap();
        assert_eq!(store.select(|s| s.tabs.get(&t.id).cloned()), Some(t));
        assert_eq!(store.status("p1"), Some(LoaderStatus::Idle));
        assert_eq!(store.select(|s| s.order.clone()), vec!["p1".to_string()]);
    }

    #[test]
    fn test_duplicate_id_rejected_by_default() {
        let store = TabStore::new();
        store.add_tab(tab("a")).unwrap();
        let err = store.add_tab(tab("a")).unwrap_err();
        assert_eq!(err, StoreError::DuplicateId("a".into()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_duplicate_id_replaced_in_place() {
        let store = TabStore::with_policy(DuplicateTabPolicy::Replace);
        store.add_tab(tab("a")).unwrap();
        store.add_tab(tab("b")).unwrap();
        store.set_loader_status("a", LoaderStatus::Success);

        let mut replacement = tab("a");
        replacement.title = "Renamed".into();
        store.add_tab(replacement).unwrap();

        assert_eq!(store.select(|s| s.order.clone()), vec!["a".to_string(), "b".to_string()]);
        assert_eq!(store.get("a").unwrap().title, "Renamed");
        assert_eq!(store.status("a"), Some(LoaderStatus::Idle));
    }

    #[test]
    fn test_delete_active_elects_next() {
        let store = store_with(&["a", "b", "c"], "b");
        store.delete_tab("b").unwrap();
        assert_eq!(store.active_id().as_deref(), Some("c"));
    }

    #[test]
    fn test_delete_last_active_elects_previous() {
        let store = store_with(&["a", "b"], "b");
        store.delete_tab("b").unwrap();
        assert_eq!(store.active_id().as_deref(), Some("a"));
    }

    #[test]
    fn test_delete_only_tab_clears_active() {
        let store = store_with(&["a"], "a");
        store.delete_tab("a").unwrap();
        assert_eq!(store.active_id(), None);
        assert!(store.is_empty());
        assert_eq!(store.status("a"), None);
    }

    #[test]
    fn test_delete_inactive_keeps_active() {
        let store = store_with(&["a", "b", "c"], "a");
        store.delete_tab("c").unwrap();
        assert_eq!(store.active_id().as_deref(), Some("a"));
        assert!(matches!(store.delete_tab("c"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_update_rejects_id_change() {
        let store = store_with(&["a"], "a");
        let err = store
            .update_tab("a", |mut t| {
                t.id = "z".into();
                t
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::IdMismatch { .. }));
        assert!(store.get("a").is_some());
        assert!(store.get("z").is_none());
    }

    #[test]
    fn test_update_replaces_record() {
        let store = store_with(&["a"], "a");
        store.update_tab("a", |t| t.mark_dirty(true)).unwrap();
        assert!(store.get("a").unwrap().is_dirty());
        assert_eq!(
            store.update_tab("missing", |t| t),
            Err(StoreError::NotFound("missing".into()))
        );
    }

    #[test]
    fn test_set_active_allows_unknown_id() {
        let store = TabStore::new();
        store.set_active(Some("pending"));
        assert_eq!(store.active_id().as_deref(), Some("pending"));
        store.set_active(None);
        assert_eq!(store.active_id(), None);
    }

    #[test]
    fn test_status_for_unknown_tab_is_dropped() {
        let store = TabStore::new();
        store.set_loader_status("ghost", LoaderStatus::Loading);
        assert_eq!(store.status("ghost"), None);
    }

    #[test]
    fn test_ignored_status_and_failed_ops_notify_nobody() {
        let store = store_with(&["a"], "a");
        let calls = Arc::new(AtomicUsize::new(0));
        let _sub = {
            let calls = calls.clone();
            store.subscribe(TabsState::clone, move |_: &TabsState| {
                calls.fetch_add(1, Ordering::SeqCst);
            })
        };

        store.set_loader_status("ghost", LoaderStatus::Loading);
        assert!(store.add_tab(tab("a")).is_err());
        assert!(store.update_tab("ghost", |t| t).is_err());
        assert!(store.delete_tab("ghost").is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.set_loader_status("a", LoaderStatus::Loading);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_all() {
        let store = store_with(&["a", "b"], "a");
        store.clear_all();
        assert_eq!(store.snapshot(), TabsState::default());
    }

    #[test]
    fn test_subscriber_fires_only_on_slice_change() {
        let store = store_with(&["a", "b"], "a");
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sub = {
            let calls = calls.clone();
            let seen = seen.clone();
            store.subscribe(
                |s| s.active_id.clone(),
                move |active: &Option<String>| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    seen.lock().unwrap().push(active.clone());
                },
            )
        };

        store.set_loader_status("a", LoaderStatus::Loading);
        store.update_tab("b", |t| t.mark_dirty(true)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        store.set_active(Some("b"));
        store.set_active(Some("b"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*seen.lock().unwrap(), vec![Some("b".to_string())]);

        drop(sub);
        assert_eq!(store.subscriber_count(), 0);
        store.set_active(Some("a"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_callback_may_read_store() {
        let store = store_with(&["a"], "a");
        let observed = Arc::new(Mutex::new(None));
        let _sub = {
            let reader = store.clone();
            let observed = observed.clone();
            store.subscribe(
                |s| s.order.len(),
                move |_len: &usize| {
                    *observed.lock().unwrap() = Some(reader.tabs().len());
                },
            )
        };
        store.add_tab(tab("b")).unwrap();
        assert_eq!(*observed.lock().unwrap(), Some(2));
    }
}
