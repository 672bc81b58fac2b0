//! TabRouter component - renders the feature of the active tab
//!
//! Responsible for:
//! - Resolving the tab id to its registered feature
//! - Starting loads on dependency changes and re-rendering when they settle
//! - Releasing lifecycle state of closed tabs

use std::sync::Arc;

use leptos::logging::log;
use leptos::prelude::*;
use leptos::task::spawn_local;
use tabkit_core::{
    Fallbacks, FeatureRegistry, LifecycleController, LoaderStatus, Navigate, Rendered, Tab,
    TabEnv, TabRouter as CoreRouter, TabsConfig,
};

use crate::layout::global_context::use_tabs_context;
use crate::shared::TabView;

/// Renders the feature behind tab `id`.
///
/// Needs a `TabsContext` in context. Every feature view receives the `TabEnv` built
/// from `id`, `context` and `on_navigate`.
#[component]
pub fn TabRouter<C>(
    /// Id of the tab to render
    #[prop(into)]
    id: Signal<Option<String>>,
    /// Host context passed to loaders and feature views
    #[prop(into)]
    context: Signal<C>,
    /// Called when a feature navigates
    on_navigate: Callback<Option<String>>,
    /// Registered features
    registry: Arc<FeatureRegistry<C, TabView>>,
    /// Loading view for features without their own
    #[prop(optional)]
    fallback_loading: Option<Callback<(), TabView>>,
    /// Error view for features without their own; receives the serialized error
    #[prop(optional)]
    fallback_error: Option<Callback<String, TabView>>,
    /// Placeholder texts and missing-feature policy
    #[prop(optional)]
    config: Option<TabsConfig>,
) -> impl IntoView
where
    C: Clone + Send + Sync + 'static,
{
    let ctx = use_tabs_context();

    let mut fallbacks = Fallbacks::none();
    if let Some(view) = fallback_loading {
        fallbacks = fallbacks.loading(move || view.run(()));
    }
    if let Some(view) = fallback_error {
        fallbacks = fallbacks.error(move |detail: &str| view.run(detail.to_string()));
    }
    let router = CoreRouter::new(registry, LifecycleController::new(ctx.store()))
        .with_fallbacks(fallbacks)
        .with_config(config.unwrap_or_default());
    let navigate = Navigate::new(move |to| on_navigate.run(to));

    let controller = router.controller().clone();
    Effect::new(move |_| {
        ctx.state
            .with(|state| controller.retain_tabs(|tab_id| state.tabs.contains_key(tab_id)));
    });

    // Only the routed tab and its status re-render the view.
    let routed = Memo::new(move |_| -> Option<(Tab, Option<LoaderStatus>)> {
        let id = id.get()?;
        ctx.state
            .with(|state| state.get(&id).cloned().map(|tab| (tab, state.status(&id))))
    });

    let content = move || {
        routed.track();
        let env = TabEnv::new(id.get(), context.get(), navigate.clone());
        let Rendered { view, ticket } = untrack(|| router.render(&env));
        if let Some(ticket) = ticket {
            log!("⏳ TabRouter: loading tab '{}'", ticket.key().tab_id);
            let router = router.clone();
            spawn_local(async move {
                let applied = router.load(ticket).await;
                if !applied {
                    log!("ℹ️ TabRouter: load finished for a tab that moved on");
                }
            });
        }
        view.map(TabView::into_inner)
    };

    on_cleanup(move || {
        log!("💥 TabRouter DESTROYED");
    });

    view! { <div class="tab-router">{content}</div> }
}
