//! Mapping-level errors.

/// Errors raised while mapping a parsed record to an outbound payload.
///
/// Per-field variants are caught inside the engine and resolved via the
/// required/optional policy; only record-level problems (unknown endpoint)
/// surface to the caller, and then as a failed `MappingResult` rather than a
/// panic.
#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("Unknown endpoint: {0}")]
    UnknownEndpoint(String),

    #[error("No endpoints configured")]
    NoEndpoints,

    #[error("Converter '{name}' is not registered")]
    UnregisteredConverter { name: String },

    #[error("Converter '{name}' failed: {message}")]
    ConverterFailed { name: String, message: String },

    #[error("Cannot convert {value} to {target}: {message}")]
    Conversion {
        value: String,
        target: String,
        message: String,
    },
}
