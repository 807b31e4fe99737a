//! Typed accessors over the flat store, bound to one schema.
//!
//! Replaces runtime-generated proxies with an explicit view object; plugins
//! wrap a `TypedConfig` in a small hand-written struct with domain-named
//! getters.

use std::sync::Arc;

use tracing::debug;

use crate::descriptor::validate_schema;
use crate::error::ConfigError;
use crate::schema::{ConfigItem, ConfigSchema, ConfigValue};
use crate::store::ConfigStore;

/// A runtime view translating typed values to and from the store's string
/// representation for one configuration schema.
///
/// Writes are not persisted automatically; batching `save()` is the
/// caller's concern.
pub struct TypedConfig {
    schema: ConfigSchema,
    store: Arc<ConfigStore>,
}

impl TypedConfig {
    /// Bind a schema to a store. The schema is validated once here.
    pub fn new(schema: ConfigSchema, store: Arc<ConfigStore>) -> Result<Self, ConfigError> {
        validate_schema(&schema)?;
        Ok(Self { schema, store })
    }

    pub fn schema(&self) -> &ConfigSchema {
        &self.schema
    }

    /// Read an item's value: the stored string parsed per the declared type,
    /// or the declared default when absent or unparsable.
    pub fn value(&self, item_key: &str) -> Result<ConfigValue, ConfigError> {
        let item = self.item(item_key)?;
        match self.store.get(&self.schema.group, &item.key) {
            Some(raw) => Ok(ConfigValue::parse(item.item_type, &raw).unwrap_or_else(|| {
                debug!(
                    group = %self.schema.group,
                    key = %item.key,
                    raw = %raw,
                    "Stored value does not parse as declared type; using default"
                );
                item.default.clone()
            })),
            None => Ok(item.default.clone()),
        }
    }

    /// Serialize a typed value and write it through to the store.
    ///
    /// Fails with `ConfigError::Validation` when the value does not match
    /// the item's declared type.
    pub fn set_value(&self, item_key: &str, value: ConfigValue) -> Result<(), ConfigError> {
        let item = self.item(item_key)?;
        if value.item_type() != item.item_type {
            return Err(ConfigError::Validation {
                item: format!("{}.{}", self.schema.group, item.key),
                expected: item.item_type.label(),
                got: value.to_string(),
            });
        }
        self.store
            .set(&self.schema.group, &item.key, &value.to_string())
    }

    /// Remove an item's stored value, restoring the declared default.
    pub fn unset(&self, item_key: &str) -> Result<(), ConfigError> {
        let item = self.item(item_key)?;
        self.store.unset(&self.schema.group, &item.key)
    }

    pub fn bool_value(&self, item_key: &str) -> Result<bool, ConfigError> {
        self.value(item_key)?.as_bool().ok_or_else(|| {
            ConfigError::Schema(format!("item '{}' is not declared boolean", item_key))
        })
    }

    pub fn int_value(&self, item_key: &str) -> Result<i64, ConfigError> {
        self.value(item_key)?.as_int().ok_or_else(|| {
            ConfigError::Schema(format!("item '{}' is not declared integer", item_key))
        })
    }

    pub fn text_value(&self, item_key: &str) -> Result<String, ConfigError> {
        match self.value(item_key)? {
            ConfigValue::Text(s) => Ok(s),
            _ => Err(ConfigError::Schema(format!(
                "item '{}' is not declared string",
                item_key
            ))),
        }
    }

    fn item(&self, item_key: &str) -> Result<&ConfigItem, ConfigError> {
        self.schema.find_item(item_key).ok_or_else(|| {
            ConfigError::Schema(format!(
                "unknown item '{}' in group '{}'",
                item_key, self.schema.group
            ))
        })
    }
}
