//! Leptos components over `tabkit-core`.
//!
//! Provide a [`TabsContext`] near the root, then render the active tab with
//! [`TabRouter`], a host-owned list with [`Tabs`], or a prototype factory with
//! [`TabFactoryView`].

#[cfg(feature = "demo")]
pub mod app;
pub mod layout;
pub mod shared;

pub use layout::center::tabs::TabBar;
pub use layout::tabs::{TabFactoryView, TabRouter, Tabs};
pub use layout::{use_tab_selector, use_tabs_context, TabsContext};
pub use shared::TabView;

#[cfg(feature = "demo")]
use wasm_bindgen::prelude::wasm_bindgen;

#[cfg(feature = "demo")]
#[wasm_bindgen]
pub fn hydrate() {
    // initializes logging using the `log` crate
    _ = console_log::init_with_level(log::Level::Debug);
    console_error_panic_hook::set_once();

    leptos::mount::mount_to_body(app::App);
}

#[cfg(feature = "demo")]
#[wasm_bindgen(start)]
pub fn start() {
    hydrate();
}
