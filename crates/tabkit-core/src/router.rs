//! Active-tab routing.
//!
//! Resolves the active tab, finds its feature, validates the settings, asks the
//! lifecycle controller for the data and picks the view for the current state:
//! feature-specific loading/error views win over the host's fallbacks, which win over
//! the built-in placeholders.

use std::sync::Arc;

use crate::config::{MissingFeaturePolicy, TabsConfig};
use crate::env::{FeatureScope, TabEnv};
use crate::error::{FeatureNotFoundError, StoreError};
use crate::lifecycle::{LifecycleController, LoadState, LoadTicket};
use crate::registry::{FeatureRegistry, TabFeature};
use crate::store::TabStore;
use crate::tab::Tab;

/// Built-in views used when neither the feature nor the host provides one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder<'a> {
    Loading {
        text: &'a str,
    },
    Error {
        title: &'a str,
        detail: &'a str,
    },
    FeatureNotFound {
        text: &'a str,
        error: &'a FeatureNotFoundError,
    },
}

/// Output type of a renderer; knows how to draw the built-in placeholders.
pub trait RenderTarget: Sized {
    fn placeholder(placeholder: Placeholder<'_>) -> Self;
}

/// Plain-text rendering.
impl RenderTarget for String {
    fn placeholder(placeholder: Placeholder<'_>) -> Self {
        match placeholder {
            Placeholder::Loading { text } => text.to_string(),
            Placeholder::Error { title, detail } => format!("{}: {}", title, detail),
            Placeholder::FeatureNotFound { text, error } => format!("{} ({})", text, error),
        }
    }
}

/// Host-supplied loading/error views.
pub struct Fallbacks<V> {
    loading: Option<Arc<dyn Fn() -> V + Send + Sync>>,
    error: Option<Arc<dyn Fn(&str) -> V + Send + Sync>>,
}

impl<V> Clone for Fallbacks<V> {
    fn clone(&self) -> Self {
        Self {
            loading: self.loading.clone(),
            error: self.error.clone(),
        }
    }
}

impl<V> Default for Fallbacks<V> {
    fn default() -> Self {
        Self {
            loading: None,
            error: None,
        }
    }
}

impl<V> Fallbacks<V> {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn loading(mut self, view: impl Fn() -> V + Send + Sync + 'static) -> Self {
        self.loading = Some(Arc::new(view));
        self
    }

    pub fn error(mut self, view: impl Fn(&str) -> V + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(view));
        self
    }
}

/// Where an active tab id leads.
#[derive(Debug)]
pub enum Route<'a, C, V> {
    /// No active id, or no tab with that id.
    Empty,
    FeatureNotFound(FeatureNotFoundError),
    Mounted { feature: &'a TabFeature<C, V>, tab: Tab },
}

/// Result of one synchronous render pass.
pub struct Rendered<V> {
    pub view: Option<V>,
    /// A load the caller must drive (`TabRouter::load`) before re-rendering.
    pub ticket: Option<LoadTicket>,
}

impl<V> Rendered<V> {
    fn nothing() -> Self {
        Self {
            view: None,
            ticket: None,
        }
    }
}

pub struct TabRouter<C, V> {
    registry: Arc<FeatureRegistry<C, V>>,
    controller: LifecycleController,
    fallbacks: Fallbacks<V>,
    config: TabsConfig,
}

impl<C, V> Clone for TabRouter<C, V> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            controller: self.controller.clone(),
            fallbacks: self.fallbacks.clone(),
            config: self.config.clone(),
        }
    }
}

impl<C: Clone, V: RenderTarget> TabRouter<C, V> {
    pub fn new(registry: Arc<FeatureRegistry<C, V>>, controller: LifecycleController) -> Self {
        Self {
            registry,
            controller,
            fallbacks: Fallbacks::none(),
            config: TabsConfig::default(),
        }
    }

    pub fn with_fallbacks(mut self, fallbacks: Fallbacks<V>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    pub fn with_config(mut self, config: TabsConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store(&self) -> &TabStore {
        self.controller.store()
    }

    pub fn controller(&self) -> &LifecycleController {
        &self.controller
    }

    pub fn registry(&self) -> &FeatureRegistry<C, V> {
        &self.registry
    }

    pub fn route(&self, active_id: Option<&str>) -> Route<'_, C, V> {
        let Some(tab) = active_id.and_then(|id| self.store().get(id)) else {
            return Route::Empty;
        };
        match self.registry.lookup(tab.feature_key.as_str()) {
            Some(feature) => Route::Mounted { feature, tab },
            None => Route::FeatureNotFound(FeatureNotFoundError {
                tab_id: tab.id,
                feature_key: tab.feature_key.as_str().to_string(),
            }),
        }
    }

    /// Render the tab `env.current_tab_id` points at.
    pub fn render(&self, env: &TabEnv<C>) -> Rendered<V> {
        let (feature, tab) = match self.route(env.current_tab_id.as_deref()) {
            Route::Empty => return Rendered::nothing(),
            Route::FeatureNotFound(error) => return self.render_not_found(error),
            Route::Mounted { feature, tab } => (feature, tab),
        };

        let settings = match feature.parse_settings(&tab.settings) {
            Ok(settings) => settings,
            Err(error) => {
                self.controller.fail_validation(&tab.id, error);
                let view = self.view_for(feature, env, tab.clone(), tab.settings.clone());
                return Rendered {
                    view: Some(view),
                    ticket: None,
                };
            }
        };

        let deps = feature.dependencies(&env.global_context, &tab);
        let ticket = self.controller.request(feature, &tab, deps);
        let view = self.view_for(feature, env, tab, settings);
        Rendered {
            view: Some(view),
            ticket,
        }
    }

    /// Drive a ticket from `render`; `true` when its result became the tab's state.
    pub async fn load(&self, ticket: LoadTicket) -> bool {
        self.controller.drive(ticket).await
    }

    /// Close a tab: run its feature's `on_close`, delete it and forget its loads.
    pub fn close(&self, id: &str, context: &C) -> Result<Tab, StoreError> {
        let removed = self.registry.close_tab(self.store(), id, context)?;
        self.controller.forget(id);
        Ok(removed)
    }

    fn render_not_found(&self, error: FeatureNotFoundError) -> Rendered<V> {
        match self.config.router.missing_feature {
            MissingFeaturePolicy::Silent => Rendered::nothing(),
            MissingFeaturePolicy::Report => {
                log::warn!("{}", error);
                let view = V::placeholder(Placeholder::FeatureNotFound {
                    text: &self.config.placeholders.not_found_text,
                    error: &error,
                });
                Rendered {
                    view: Some(view),
                    ticket: None,
                }
            }
        }
    }

    fn view_for(&self, feature: &TabFeature<C, V>, env: &TabEnv<C>, tab: Tab, settings: serde_json::Value) -> V {
        match self.controller.state(&tab.id) {
            LoadState::Idle | LoadState::Loading => feature
                .render_loading()
                .or_else(|| self.fallbacks.loading.as_ref().map(|view| view()))
                .unwrap_or_else(|| {
                    V::placeholder(Placeholder::Loading {
                        text: &self.config.placeholders.loading_text,
                    })
                }),
            LoadState::Error(error) => {
                let detail = error.report().to_display_string();
                feature
                    .render_error(&detail)
                    .or_else(|| self.fallbacks.error.as_ref().map(|view| view(&detail)))
                    .unwrap_or_else(|| {
                        V::placeholder(Placeholder::Error {
                            title: &self.config.placeholders.error_title,
                            detail: &detail,
                        })
                    })
            }
            LoadState::Success(data) => {
                let scoped = TabEnv::new(
                    Some(tab.id.clone()),
                    env.global_context.clone(),
                    env.navigate.clone(),
                );
                let scope = FeatureScope::new(scoped, tab, settings, data, self.store().clone());
                feature.render(&scope)
            }
        }
    }
}
