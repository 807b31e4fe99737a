pub mod descriptor;
pub mod error;
pub mod schema;
pub mod store;
pub mod view;

pub use descriptor::{build_descriptor, ConfigItemDescriptor};
pub use error::ConfigError;
pub use schema::{ConfigItem, ConfigItemType, ConfigSchema, ConfigValue};
pub use store::{config_dir, config_file_path, ConfigStore};
pub use view::TypedConfig;
