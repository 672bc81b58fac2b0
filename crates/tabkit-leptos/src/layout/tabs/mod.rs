pub mod collection;
pub mod factory;
pub mod router;

pub use collection::Tabs;
pub use factory::TabFactoryView;
pub use router::TabRouter;
