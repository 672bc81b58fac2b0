//! Declarative tab collection.
//!
//! The host owns the list of `TabEntry` records. Declarations map an entry's `type` to a
//! render function. The active tab is either controlled (`active_tab_id`) or tracked
//! here, starting at `default_active_tab_id` or the first entry.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::tab::TabEntry;

type RenderFn<V> = Arc<dyn Fn(&TabRenderContext) -> V + Send + Sync>;
type EmptyFn<V> = Arc<dyn Fn() -> V + Send + Sync>;
type EntryHandler = Arc<dyn Fn(&TabEntry) + Send + Sync>;

/// Renders every entry whose `type` equals `kind`.
pub struct TabDeclaration<V> {
    kind: String,
    render: RenderFn<V>,
}

impl<V> TabDeclaration<V> {
    pub fn new(
        kind: impl Into<String>,
        render: impl Fn(&TabRenderContext) -> V + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: kind.into(),
            render: Arc::new(render),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }
}

impl<V> Clone for TabDeclaration<V> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            render: self.render.clone(),
        }
    }
}

/// A bound callback handed to render functions.
#[derive(Clone)]
pub struct TabAction(Arc<dyn Fn() + Send + Sync>);

impl TabAction {
    fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn call(&self) {
        (self.0)()
    }
}

impl fmt::Debug for TabAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TabAction(..)")
    }
}

#[derive(Clone, Debug)]
pub struct TabRenderContext {
    pub tab: TabEntry,
    pub is_active: bool,
    pub activate: TabAction,
    /// Present only when the collection has an `on_tab_close` handler.
    pub close: Option<TabAction>,
}

#[derive(Default)]
struct CollectionState {
    entries: Vec<TabEntry>,
    controlled: Option<String>,
    uncontrolled: Option<String>,
}

impl CollectionState {
    fn active(&self) -> Option<String> {
        self.controlled.clone().or_else(|| self.uncontrolled.clone())
    }

    /// Keep the tracked id if it still names an entry, otherwise fall back to the first.
    fn reconcile(&mut self) {
        if self.controlled.is_some() {
            return;
        }
        let current_exists = self
            .uncontrolled
            .as_deref()
            .is_some_and(|id| self.entries.iter().any(|entry| entry.id == id));
        if !current_exists {
            if let Some(first) = self.entries.first() {
                self.uncontrolled = Some(first.id.clone());
            }
        }
    }
}

/// Cheap to clone; clones share the active-tab state.
pub struct TabCollection<V> {
    declarations: Arc<HashMap<String, TabDeclaration<V>>>,
    state: Arc<Mutex<CollectionState>>,
    on_tab_change: Option<EntryHandler>,
    on_tab_close: Option<EntryHandler>,
    render_empty: Option<EmptyFn<V>>,
}

impl<V> Clone for TabCollection<V> {
    fn clone(&self) -> Self {
        Self {
            declarations: self.declarations.clone(),
            state: self.state.clone(),
            on_tab_change: self.on_tab_change.clone(),
            on_tab_close: self.on_tab_close.clone(),
            render_empty: self.render_empty.clone(),
        }
    }
}

impl<V> TabCollection<V> {
    /// A declaration repeating an earlier `kind` is ignored with a warning.
    pub fn new(entries: Vec<TabEntry>, declarations: impl IntoIterator<Item = TabDeclaration<V>>) -> Self {
        let mut map = HashMap::new();
        for declaration in declarations {
            if map.contains_key(&declaration.kind) {
                log::warn!("duplicate tab declaration for type \"{}\" was ignored", declaration.kind);
                continue;
            }
            map.insert(declaration.kind.clone(), declaration);
        }

        let mut state = CollectionState {
            entries,
            ..CollectionState::default()
        };
        state.reconcile();

        Self {
            declarations: Arc::new(map),
            state: Arc::new(Mutex::new(state)),
            on_tab_change: None,
            on_tab_close: None,
            render_empty: None,
        }
    }

    /// Initial active tab when uncontrolled.
    pub fn default_active_tab_id(self, id: impl Into<String>) -> Self {
        self.with_state(|state| {
            state.uncontrolled = Some(id.into());
            state.reconcile();
        });
        self
    }

    /// Make the active tab controlled by the host.
    pub fn active_tab_id(self, id: Option<String>) -> Self {
        self.set_active_tab_id(id);
        self
    }

    pub fn on_tab_change(mut self, handler: impl Fn(&TabEntry) + Send + Sync + 'static) -> Self {
        self.on_tab_change = Some(Arc::new(handler));
        self
    }

    pub fn on_tab_close(mut self, handler: impl Fn(&TabEntry) + Send + Sync + 'static) -> Self {
        self.on_tab_close = Some(Arc::new(handler));
        self
    }

    pub fn render_empty(mut self, view: impl Fn() -> V + Send + Sync + 'static) -> Self {
        self.render_empty = Some(Arc::new(view));
        self
    }

    /// Replace the host's entries.
    pub fn set_entries(&self, entries: Vec<TabEntry>) {
        self.with_state(|state| {
            state.entries = entries;
            state.reconcile();
        });
    }

    /// Update the controlled id; `None` hands control back to the collection, which
    /// continues from the last controlled value.
    pub fn set_active_tab_id(&self, id: Option<String>) {
        self.with_state(|state| {
            if let Some(id) = &id {
                state.uncontrolled = Some(id.clone());
            }
            state.controlled = id;
            state.reconcile();
        });
    }

    pub fn current_active_id(&self) -> Option<String> {
        self.with_state(|state| state.active())
    }

    pub fn entries(&self) -> Vec<TabEntry> {
        self.with_state(|state| state.entries.clone())
    }

    pub fn is_controlled(&self) -> bool {
        self.with_state(|state| state.controlled.is_some())
    }

    /// Activate a tab: track it when uncontrolled, then notify `on_tab_change`.
    pub fn activate(&self, id: &str) {
        let Some(entry) = self.with_state(|state| {
            let entry = state.entries.iter().find(|entry| entry.id == id).cloned();
            if entry.is_some() && state.controlled.is_none() {
                state.uncontrolled = Some(id.to_string());
            }
            entry
        }) else {
            log::warn!("activate: no tab \"{}\" in collection", id);
            return;
        };
        if let Some(handler) = &self.on_tab_change {
            handler(&entry);
        }
    }

    /// Notify `on_tab_close`; when the closed tab was the tracked active tab, the first
    /// other entry becomes active. Removing the entry is up to the host.
    pub fn close(&self, id: &str) {
        let Some(entry) = self.with_state(|state| state.entries.iter().find(|entry| entry.id == id).cloned())
        else {
            log::warn!("close: no tab \"{}\" in collection", id);
            return;
        };
        if let Some(handler) = &self.on_tab_close {
            handler(&entry);
        }
        self.with_state(|state| {
            if state.controlled.is_none() && state.uncontrolled.as_deref() == Some(id) {
                state.uncontrolled = state
                    .entries
                    .iter()
                    .find(|candidate| candidate.id != id)
                    .map(|candidate| candidate.id.clone());
            }
        });
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut CollectionState) -> T) -> T {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

impl<V: 'static> TabCollection<V> {
    /// One view per entry with a matching declaration, in entry order. No entries
    /// renders `render_empty` if set.
    pub fn render(&self) -> Vec<V> {
        let (entries, active) = self.with_state(|state| (state.entries.clone(), state.active()));
        if entries.is_empty() {
            return self.render_empty.as_ref().map(|view| view()).into_iter().collect();
        }

        entries
            .into_iter()
            .filter_map(|entry| {
                let Some(declaration) = self.declarations.get(&entry.kind) else {
                    log::warn!("no tab declaration found for tab type \"{}\"", entry.kind);
                    return None;
                };
                let context = self.render_context(entry, active.as_deref());
                Some((declaration.render)(&context))
            })
            .collect()
    }

    fn render_context(&self, entry: TabEntry, active: Option<&str>) -> TabRenderContext {
        let is_active = active == Some(entry.id.as_str());

        let collection = self.clone();
        let id = entry.id.clone();
        let activate = TabAction::new(move || collection.activate(&id));

        let close = self.on_tab_close.as_ref().map(|_| {
            let collection = self.clone();
            let id = entry.id.clone();
            TabAction::new(move || collection.close(&id))
        });

        TabRenderContext {
            tab: entry,
            is_active,
            activate,
            close,
        }
    }
}
