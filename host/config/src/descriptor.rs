//! Descriptor generation: the read-only projection of a schema that drives
//! the settings UI. Never touches the store.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::schema::{ConfigItemType, ConfigSchema, ConfigValue};

/// Read-only projection of one schema item, produced on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigItemDescriptor {
    pub key: String,
    pub name: String,
    pub description: String,
    pub item_type: ConfigItemType,
    pub default: ConfigValue,
}

/// Walk the schema's declared items and return the ordered descriptor list.
///
/// Fails with `ConfigError::Schema` if the schema is malformed.
pub fn build_descriptor(schema: &ConfigSchema) -> Result<Vec<ConfigItemDescriptor>, ConfigError> {
    validate_schema(schema)?;
    Ok(schema
        .items
        .iter()
        .map(|item| ConfigItemDescriptor {
            key: item.key.clone(),
            name: item.name.clone(),
            description: item.description.clone(),
            item_type: item.item_type,
            default: item.default.clone(),
        })
        .collect())
}

/// Validate a schema: group/item keys must be non-empty and separator-free,
/// item keys unique within the schema, display names present, and defaults
/// matching the declared type.
pub(crate) fn validate_schema(schema: &ConfigSchema) -> Result<(), ConfigError> {
    check_key_part(&schema.group, "group key")?;
    if schema.name.is_empty() {
        return Err(ConfigError::Schema(format!(
            "group '{}' has no display name",
            schema.group
        )));
    }

    let mut seen = HashSet::new();
    for item in &schema.items {
        check_key_part(&item.key, "item key")?;
        if item.name.is_empty() {
            return Err(ConfigError::Schema(format!(
                "item '{}' in group '{}' has no display name",
                item.key, schema.group
            )));
        }
        if !seen.insert(item.key.as_str()) {
            return Err(ConfigError::Schema(format!(
                "duplicate item key '{}' in group '{}'",
                item.key, schema.group
            )));
        }
        if item.default.item_type() != item.item_type {
            return Err(ConfigError::Schema(format!(
                "default for '{}.{}' is not a {}",
                schema.group, item.key, item.item_type
            )));
        }
    }
    Ok(())
}

fn check_key_part(part: &str, what: &str) -> Result<(), ConfigError> {
    if part.is_empty() {
        return Err(ConfigError::Schema(format!("{} is empty", what)));
    }
    if part.contains('.') || part.contains('=') {
        return Err(ConfigError::Schema(format!(
            "{} '{}' contains a reserved character",
            what, part
        )));
    }
    Ok(())
}
