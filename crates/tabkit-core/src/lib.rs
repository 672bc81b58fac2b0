//! Framework-independent tab management.
//!
//! A host registers [`TabFeature`]s (settings schema, async loader, views) in a
//! [`FeatureRegistry`], keeps its open tabs in a [`TabStore`], and lets a [`TabRouter`]
//! turn the active tab id into a view. Views are generic (`V`), so the same core drives
//! a Leptos UI or plain text.

pub mod collection;
pub mod config;
pub mod env;
pub mod error;
pub mod factory;
pub mod lifecycle;
pub mod registry;
pub mod router;
pub mod schema;
pub mod store;
pub mod tab;

pub use collection::{TabAction, TabCollection, TabDeclaration, TabRenderContext};
pub use config::{DuplicateTabPolicy, MissingFeaturePolicy, TabsConfig};
pub use env::{FeatureScope, Navigate, TabEnv};
pub use error::{
    DuplicateKeyError, ErrorReport, FactoryError, FeatureNotFoundError, LoaderFailure, StoreError,
    ValidationError, ValidationIssue,
};
pub use factory::{TabFactory, TabFactoryBuilder, TabFactoryOptions, TabPrototype};
pub use lifecycle::{DependencyKey, LifecycleController, LoadError, LoadState, LoadTicket};
pub use registry::{FeatureRegistry, LoaderFuture, TabFeature, TabFeatureBuilder};
pub use router::{Fallbacks, Placeholder, RenderTarget, Rendered, Route, TabRouter};
pub use store::{Subscription, TabStore, TabsState};
pub use tab::{FeatureKey, LoaderStatus, Tab, TabEntry};
