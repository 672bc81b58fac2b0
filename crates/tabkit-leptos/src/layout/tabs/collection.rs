use leptos::logging::log;
use leptos::prelude::*;
use tabkit_core::{TabCollection, TabDeclaration, TabEntry};

use crate::shared::TabView;

/// Host-owned tab list rendered through per-type declarations.
///
/// Unmatched tab types are skipped and repeated declarations ignored, both with a
/// warning in the console.
#[component]
pub fn Tabs(
    /// Tab records, in display order
    #[prop(into)]
    tabs: Signal<Vec<TabEntry>>,
    /// One declaration per tab type
    declarations: Vec<TabDeclaration<TabView>>,
    /// Controlled active tab id
    #[prop(optional, into)]
    active_tab_id: Option<Signal<Option<String>>>,
    /// Initial active tab id when uncontrolled
    #[prop(optional, into)]
    default_active_tab_id: Option<String>,
    /// Called with the tab a render context activated
    #[prop(optional)]
    on_tab_change: Option<Callback<TabEntry>>,
    /// Called with the tab a render context closed; without it no `close` is offered
    #[prop(optional)]
    on_tab_close: Option<Callback<TabEntry>>,
    /// Rendered when there are no tabs
    #[prop(optional)]
    render_empty: Option<Callback<(), TabView>>,
) -> impl IntoView {
    // bumped whenever the collection changes its own active id
    let revision = RwSignal::new(0_u64);

    let mut collection = TabCollection::new(tabs.get_untracked(), declarations).on_tab_change(
        move |tab: &TabEntry| {
            revision.update(|r| *r += 1);
            if let Some(handler) = on_tab_change {
                handler.run(tab.clone());
            }
        },
    );
    if let Some(id) = default_active_tab_id {
        collection = collection.default_active_tab_id(id);
    }
    if let Some(handler) = on_tab_close {
        collection = collection.on_tab_close(move |tab: &TabEntry| {
            log!("🔴 Tabs: close '{}'", tab.id);
            revision.update(|r| *r += 1);
            handler.run(tab.clone());
        });
    }
    if let Some(view) = render_empty {
        collection = collection.render_empty(move || view.run(()));
    }

    let content = move || {
        revision.track();
        collection.set_entries(tabs.get());
        if let Some(controlled) = active_tab_id {
            collection.set_active_tab_id(controlled.get());
        }
        untrack(|| collection.render())
            .into_iter()
            .map(TabView::into_inner)
            .collect::<Vec<_>>()
    };

    view! { <div class="tabs-collection">{content}</div> }
}
