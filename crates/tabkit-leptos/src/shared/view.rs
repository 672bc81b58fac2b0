use leptos::prelude::*;

/// A rendered tab body.
///
/// Features, declarations and prototypes return `TabView` so the router can draw its
/// built-in placeholders with the same type.
pub struct TabView(AnyView);

impl TabView {
    pub fn new(view: impl IntoView + 'static) -> Self {
        Self(view.into_any())
    }

    pub fn into_inner(self) -> AnyView {
        self.0
    }
}

impl From<AnyView> for TabView {
    fn from(view: AnyView) -> Self {
        Self(view)
    }
}
