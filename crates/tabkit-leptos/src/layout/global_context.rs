use std::collections::HashMap;

use leptos::logging::log;
use leptos::prelude::*;
use tabkit_core::{StoreError, Subscription, Tab, TabStore, TabsState};
use web_sys::window;

/// Reactive bridge over a `TabStore`.
///
/// `state` mirrors the store through a subscription, so views re-render on every store
/// mutation, whether it comes from a component, a feature scope or the lifecycle.
#[derive(Clone, Copy)]
pub struct TabsContext {
    store: StoredValue<TabStore>,
    pub state: RwSignal<TabsState>,
    _subscription: StoredValue<Subscription>,
}

impl TabsContext {
    pub fn new(store: TabStore) -> Self {
        let state = RwSignal::new(store.snapshot());
        let subscription = store.subscribe(
            |snapshot: &TabsState| snapshot.clone(),
            move |next: &TabsState| {
                // the owner may already be gone while the store lives on
                let _ = state.try_set(next.clone());
            },
        );
        Self {
            store: StoredValue::new(store),
            state,
            _subscription: StoredValue::new(subscription),
        }
    }

    pub fn store(&self) -> TabStore {
        self.store.get_value()
    }

    pub fn active_id(&self) -> Option<String> {
        self.state.with(|state| state.active_id.clone())
    }

    /// Add the tab (or keep the existing one with the same id) and activate it.
    pub fn open_tab(&self, tab: Tab) {
        log!("🔷 open_tab: id='{}', feature='{}'", tab.id, tab.feature_key);
        let id = tab.id.clone();
        let store = self.store();
        match store.add_tab(tab) {
            Ok(()) => log!("✅ Tab added. Total tabs: {}", store.len()),
            Err(StoreError::DuplicateId(_)) => log!("ℹ️ Tab already exists, just activating"),
            Err(err) => log!("❌ open_tab failed: {}", err),
        }
        self.activate_tab(&id);
    }

    pub fn activate_tab(&self, id: &str) {
        log!("🔶 activate_tab: id='{}'", id);
        self.store().set_active(Some(id));
    }

    pub fn update_tab(&self, id: &str, updater: impl FnOnce(Tab) -> Tab) -> Result<(), StoreError> {
        self.store().update_tab(id, updater)
    }

    pub fn update_tab_title(&self, id: &str, title: &str) {
        let title = title.to_string();
        if let Err(err) = self.update_tab(id, |mut tab| {
            tab.title = title;
            tab
        }) {
            log!("⚠️ update_tab_title: {}", err);
        }
    }

    /// Remove a tab without running feature hooks; the store elects the next active tab.
    pub fn close_tab(&self, id: &str) {
        log!("🔴 close_tab: id='{}'", id);
        let store = self.store();
        let before = store.len();
        match store.delete_tab(id) {
            Ok(_) => {
                log!("📊 Tabs before: {}, after: {}", before, store.len());
                log!("➡️ Next active tab: {:?}", store.active_id());
            }
            Err(err) => log!("⚠️ close_tab: {}", err),
        }
    }

    /// Sync the active tab id with `?active=` in the URL.
    ///
    /// An id from the URL is only activated when the tab is already open.
    pub fn init_router_integration(&self) {
        let search = window()
            .and_then(|w| w.location().search().ok())
            .unwrap_or_default();
        let params: HashMap<String, String> =
            serde_qs::from_str(search.trim_start_matches('?')).unwrap_or_default();
        if let Some(active_id) = params.get("active") {
            if self.store().get(active_id).is_some() {
                self.activate_tab(active_id);
            } else {
                log!("ℹ️ URL points at unknown tab '{}', ignored", active_id);
            }
        }

        let this = *self;
        Effect::new(move |_| {
            if let Some(active_id) = this.state.with(|state| state.active_id.clone()) {
                let query_string =
                    serde_qs::to_string(&HashMap::from([("active".to_string(), active_id)]))
                        .unwrap_or_default();
                let new_url = format!("?{}", query_string);

                let current_search = window()
                    .and_then(|w| w.location().search().ok())
                    .unwrap_or_default();

                if current_search != new_url {
                    if let Some(w) = window() {
                        if let Ok(history) = w.history() {
                            let _ = history.replace_state_with_url(
                                &wasm_bindgen::JsValue::NULL,
                                "",
                                Some(&new_url),
                            );
                        }
                    }
                }
            }
        });
    }
}

pub fn use_tabs_context() -> TabsContext {
    leptos::context::use_context::<TabsContext>().expect("TabsContext context not found")
}

/// Subscribe a component to one slice of the tab state.
pub fn use_tab_selector<T>(selector: impl Fn(&TabsState) -> T + Send + Sync + 'static) -> Memo<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    let ctx = use_tabs_context();
    Memo::new(move |_| ctx.state.with(|state| selector(state)))
}
