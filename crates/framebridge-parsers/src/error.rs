//! Parse-level errors and rule validation findings.

/// Errors raised while validating a rule or reported inside a failed parse.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Frame payload is empty")]
    EmptyPayload,

    #[error("Pattern did not match the payload")]
    PatternMismatch,

    #[error("Invalid field spec '{spec}': {message}")]
    InvalidFieldSpec { spec: String, message: String },

    #[error("Pattern declares {specs} segments but rule has {fields} fields")]
    SegmentCountMismatch { specs: usize, fields: usize },

    #[error("Rule declares {fields} fields but {types} types")]
    FieldTypeCountMismatch { fields: usize, types: usize },

    #[error("Invalid regex '{pattern}': {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("Payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// One structural problem found by `RuleMatcher::validate_all`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleValidationError {
    #[error("duplicate rule name: {0}")]
    DuplicateName(String),

    #[error("rule '{0}' has an empty pattern")]
    EmptyPattern(String),

    #[error("rule '{name}' declares {fields} fields but {types} types")]
    FieldTypeCountMismatch {
        name: String,
        fields: usize,
        types: usize,
    },

    #[error("rule '{name}' has an invalid regex: {message}")]
    InvalidRegex { name: String, message: String },
}
