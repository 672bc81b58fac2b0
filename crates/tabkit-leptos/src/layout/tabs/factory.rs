use std::sync::Arc;

use leptos::prelude::*;
use tabkit_core::TabFactory;

use crate::shared::{DefaultError, TabView};

/// Renders `data` through a prototype factory.
///
/// A factory built without an error component still never breaks the page: its
/// errors are shown with the default error view.
#[component]
pub fn TabFactoryView(
    factory: Arc<TabFactory<TabView>>,
    /// Payload carrying the prototype `key`
    #[prop(into)]
    data: Signal<serde_json::Value>,
) -> impl IntoView {
    move || {
        let rendered = data.with(|data| factory.render(data));
        match rendered {
            Ok(view) => view.into_inner(),
            Err(err) => {
                log::warn!("TabFactoryView: {}", err);
                view! { <DefaultError title="Invalid tab settings" detail=err.to_string() /> }
                    .into_any()
            }
        }
    }
}
