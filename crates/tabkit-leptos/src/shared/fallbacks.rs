//! Built-in loading, error and not-found views.

use leptos::prelude::*;
use tabkit_core::{Placeholder, RenderTarget};

use super::view::TabView;

#[component]
pub fn DefaultLoading(#[prop(into)] text: String) -> impl IntoView {
    view! {
        <div class="tab-router__loading" role="status">
            {text}
        </div>
    }
}

/// `detail` is the serialized error report.
#[component]
pub fn DefaultError(#[prop(into)] title: String, #[prop(into)] detail: String) -> impl IntoView {
    view! {
        <div class="tab-router__error" role="alert">
            <strong>{title}</strong>
            <pre class="tab-router__error-detail">{detail}</pre>
        </div>
    }
}

#[component]
pub fn FeatureNotFound(
    #[prop(into)] text: String,
    #[prop(into)] tab_id: String,
    #[prop(into)] feature_key: String,
) -> impl IntoView {
    view! {
        <div class="tab-router__not-found" data-tab-id=tab_id>
            {text}
            <code>{feature_key}</code>
        </div>
    }
}

impl RenderTarget for TabView {
    fn placeholder(placeholder: Placeholder<'_>) -> Self {
        match placeholder {
            Placeholder::Loading { text } => TabView::new(view! { <DefaultLoading text=text.to_string() /> }),
            Placeholder::Error { title, detail } => TabView::new(view! {
                <DefaultError title=title.to_string() detail=detail.to_string() />
            }),
            Placeholder::FeatureNotFound { text, error } => TabView::new(view! {
                <FeatureNotFound
                    text=text.to_string()
                    tab_id=error.tab_id.clone()
                    feature_key=error.feature_key.clone()
                />
            }),
        }
    }
}
