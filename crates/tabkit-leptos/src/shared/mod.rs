pub mod fallbacks;
pub mod view;

pub use fallbacks::{DefaultError, DefaultLoading, FeatureNotFound};
pub use view::TabView;
