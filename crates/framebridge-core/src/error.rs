//! Configuration-level errors.

/// Errors raised while loading or mutating pipeline configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Format tag not in the closed set (hex/text/json/binary).
    #[error("Unknown frame format: {0}")]
    UnknownFormat(String),

    /// Declared field type not in the closed set.
    #[error("Unknown field type: {0}")]
    UnknownFieldType(String),

    /// A rule with this name is already registered.
    #[error("Duplicate rule name: {0}")]
    DuplicateRule(String),

    /// Referenced rule does not exist.
    #[error("Rule not found: {0}")]
    RuleNotFound(String),

    /// Structural validation failure (counts, empty pattern, ...).
    #[error("Invalid configuration: {0}")]
    Validation(String),

    /// I/O error while reading a configuration file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML syntax or shape error.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
