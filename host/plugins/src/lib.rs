pub mod builtin;
pub mod event_bus;
pub mod lifecycle;
pub mod manager;
pub mod sdk;
pub mod settings;

pub use event_bus::EventBus;
pub use lifecycle::{FailureKind, FailureRecord, PluginState, Transition};
pub use manager::PluginManager;
pub use sdk::{Plugin, PluginContext, PluginFactory};
pub use settings::SettingsCatalog;
