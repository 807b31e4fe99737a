//! Settings catalog
//!
//! The descriptor query interface consumed by the settings UI: schemas of
//! running plugins, their item descriptors, and string-typed get/set over
//! the shared store. The UI batches persistence itself via
//! `ConfigStore::save`.

use std::sync::Arc;

use lodestone_config::{
    build_descriptor, ConfigError, ConfigItemDescriptor, ConfigSchema, ConfigStore, ConfigValue,
    TypedConfig,
};

use crate::manager::PluginManager;

pub struct SettingsCatalog {
    manager: PluginManager,
    store: Arc<ConfigStore>,
}

impl SettingsCatalog {
    pub fn new(manager: PluginManager, store: Arc<ConfigStore>) -> Self {
        Self { manager, store }
    }

    /// Schemas of currently-running plugins, in load order. Plugins without
    /// settings are omitted (a failed plugin's section simply disappears).
    pub fn running_schemas(&self) -> Vec<ConfigSchema> {
        self.manager
            .running_plugins()
            .iter()
            .filter_map(|p| p.config_schema())
            .collect()
    }

    /// Ordered item descriptors for one schema.
    pub fn descriptor(
        &self,
        schema: &ConfigSchema,
    ) -> Result<Vec<ConfigItemDescriptor>, ConfigError> {
        build_descriptor(schema)
    }

    /// Current string form of an item's value (declared default when unset).
    pub fn value(&self, schema: &ConfigSchema, item_key: &str) -> Result<String, ConfigError> {
        let view = TypedConfig::new(schema.clone(), self.store.clone())?;
        Ok(view.value(item_key)?.to_string())
    }

    /// Parse `raw` against the item's declared type and write it through.
    pub fn set_value(
        &self,
        schema: &ConfigSchema,
        item_key: &str,
        raw: &str,
    ) -> Result<(), ConfigError> {
        let item = schema.find_item(item_key).ok_or_else(|| {
            ConfigError::Schema(format!(
                "unknown item '{}' in group '{}'",
                item_key, schema.group
            ))
        })?;
        let value = ConfigValue::parse(item.item_type, raw).ok_or_else(|| {
            ConfigError::Validation {
                item: format!("{}.{}", schema.group, item.key),
                expected: item.item_type.label(),
                got: raw.to_string(),
            }
        })?;
        let view = TypedConfig::new(schema.clone(), self.store.clone())?;
        view.set_value(item_key, value)
    }
}
