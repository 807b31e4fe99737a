//! Configuration schemas as explicit declarative values.
//!
//! Each plugin that exposes settings registers one `ConfigSchema` describing
//! its group key and the ordered set of typed items under it.

use serde::{Deserialize, Serialize};

/// Declared type of a configuration item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigItemType {
    Bool,
    Int,
    Text,
}

impl ConfigItemType {
    pub fn label(&self) -> &'static str {
        match self {
            ConfigItemType::Bool => "boolean",
            ConfigItemType::Int => "integer",
            ConfigItemType::Text => "string",
        }
    }
}

impl std::fmt::Display for ConfigItemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A typed configuration value.
///
/// The persisted representation is always a string: booleans serialize as
/// `"true"`/`"false"`, integers as decimal, text as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "type", content = "value")]
pub enum ConfigValue {
    Bool(bool),
    Int(i64),
    Text(String),
}

impl ConfigValue {
    pub fn item_type(&self) -> ConfigItemType {
        match self {
            ConfigValue::Bool(_) => ConfigItemType::Bool,
            ConfigValue::Int(_) => ConfigItemType::Int,
            ConfigValue::Text(_) => ConfigItemType::Text,
        }
    }

    /// Parse a stored string per the declared type. Returns `None` on
    /// mismatch so callers can fall back to the item's default.
    pub fn parse(ty: ConfigItemType, raw: &str) -> Option<ConfigValue> {
        match ty {
            ConfigItemType::Bool => {
                if raw.eq_ignore_ascii_case("true") {
                    Some(ConfigValue::Bool(true))
                } else if raw.eq_ignore_ascii_case("false") {
                    Some(ConfigValue::Bool(false))
                } else {
                    None
                }
            }
            ConfigItemType::Int => raw.trim().parse().ok().map(ConfigValue::Int),
            ConfigItemType::Text => Some(ConfigValue::Text(raw.to_string())),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigValue::Bool(b) => write!(f, "{}", b),
            ConfigValue::Int(n) => write!(f, "{}", n),
            ConfigValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// One declared configuration item within a group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigItem {
    /// Item key, unique within the schema.
    pub key: String,
    /// Display name for the settings UI.
    pub name: String,
    pub description: String,
    pub item_type: ConfigItemType,
    pub default: ConfigValue,
}

/// A plugin's declared configuration group: a group key unique across all
/// plugins plus an ordered set of items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSchema {
    /// Group key, unique across all plugins. Forms the first half of the
    /// persisted `group.key` composite.
    pub group: String,
    /// Display name for the settings UI.
    pub name: String,
    pub description: String,
    pub items: Vec<ConfigItem>,
}

impl ConfigSchema {
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            description: description.into(),
            items: Vec::new(),
        }
    }

    /// Append an item. The declared type is derived from the default value.
    pub fn item(
        mut self,
        key: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        default: ConfigValue,
    ) -> Self {
        self.items.push(ConfigItem {
            key: key.into(),
            name: name.into(),
            description: description.into(),
            item_type: default.item_type(),
            default,
        });
        self
    }

    pub fn find_item(&self, key: &str) -> Option<&ConfigItem> {
        self.items.iter().find(|i| i.key == key)
    }
}
