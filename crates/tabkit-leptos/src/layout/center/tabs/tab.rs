use leptos::ev;
use leptos::prelude::*;
use tabkit_core::{LoaderStatus, Tab};

use crate::layout::global_context::use_tabs_context;

#[component]
pub fn TabHeader(tab: Tab, on_close: Callback<String>) -> impl IntoView {
    let ctx = use_tabs_context();

    let id_for_active = tab.id.clone();
    let is_active = Memo::new(move |_| {
        ctx.state
            .with(|state| state.active_id.as_deref() == Some(id_for_active.as_str()))
    });

    let id_for_status = tab.id.clone();
    let is_loading = Memo::new(move |_| {
        ctx.state
            .with(|state| state.status(&id_for_status) == Some(LoaderStatus::Loading))
    });

    let id_for_click = tab.id.clone();
    let on_click = move |_| ctx.activate_tab(&id_for_click);

    let id_for_close = tab.id.clone();
    let close = move |ev: ev::MouseEvent| {
        ev.stop_propagation();
        on_close.run(id_for_close.clone());
    };

    view! {
        <div class="tab" class:active=is_active class:tab--loading=is_loading on:click=on_click>
            <span>{tab.title.clone()}</span>
            {if tab.is_dirty() { " (*)" } else { "" }}
            <button class="tab-close" on:click=close>"×"</button>
        </div>
    }
}
