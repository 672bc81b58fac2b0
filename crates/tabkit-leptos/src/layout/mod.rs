pub mod center;
pub mod global_context;
pub mod tabs;

pub use global_context::{use_tab_selector, use_tabs_context, TabsContext};
