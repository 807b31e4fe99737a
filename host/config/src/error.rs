use thiserror::Error;

/// Errors produced by the configuration runtime.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The backing store could not be read or written.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration schema is malformed.
    #[error("malformed configuration schema: {0}")]
    Schema(String),

    /// A value does not match the item's declared type.
    #[error("invalid value for '{item}': expected {expected}, got '{got}'")]
    Validation {
        item: String,
        expected: &'static str,
        got: String,
    },

    /// A group or item key contains the separator or is empty.
    #[error("invalid configuration key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// A value would corrupt the line-oriented persisted form.
    #[error("configuration value for '{0}' must not contain line breaks")]
    InvalidValue(String),
}
