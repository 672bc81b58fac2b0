use leptos::logging::log;
use leptos::prelude::*;
use tabkit_core::Tab;

use super::tab::TabHeader;
use crate::layout::global_context::use_tabs_context;

/// Header strip for the tabs in `TabsContext`.
#[component]
pub fn TabBar(
    /// Close handler; defaults to removing the tab from the store
    #[prop(optional)]
    on_close: Option<Callback<String>>,
) -> impl IntoView {
    let ctx = use_tabs_context();
    let on_close = on_close.unwrap_or_else(|| Callback::new(move |id: String| ctx.close_tab(&id)));

    view! {
        <div class="tabs-bar">
            <For
                each=move || {
                    let tabs: Vec<Tab> = ctx.state.with(|state| state.ordered().into_iter().cloned().collect());
                    log!("📋 <For> each triggered. Tabs count: {}", tabs.len());
                    tabs
                }
                key=|tab| (tab.id.clone(), tab.title.clone(), tab.is_dirty())
                children=move |tab: Tab| {
                    view! { <TabHeader tab=tab on_close=on_close /> }
                }
            />
        </div>
    }
}
