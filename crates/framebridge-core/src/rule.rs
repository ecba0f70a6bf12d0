//! Extraction rules.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::frame::FrameFormat;
use crate::value::FieldType;

/// Configuration entry describing how to extract fields from frames of a
/// given format.
///
/// `fields` and `types` are parallel ordered lists; the invariant
/// `fields.len() == types.len()` is checked by [`Rule::validate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule name.
    pub name: String,
    /// Wire format this rule applies to.
    pub format: FrameFormat,
    /// Format-specific pattern string (regex, position specs, JSON paths).
    pub pattern: String,
    /// Ordered field names.
    pub fields: Vec<String>,
    /// Declared value types, parallel to `fields`.
    pub types: Vec<FieldType>,
    /// Priority; higher wins when several rules compete.
    #[serde(default)]
    pub priority: i32,
}

impl Rule {
    pub fn new(
        name: impl Into<String>,
        format: FrameFormat,
        pattern: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            format,
            pattern: pattern.into(),
            fields: Vec::new(),
            types: Vec::new(),
            priority: 0,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.fields.push(name.into());
        self.types.push(ty);
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Structural validation of a single rule.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation("rule name is empty".to_string()));
        }
        if self.pattern.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "rule '{}' has an empty pattern",
                self.name
            )));
        }
        if self.fields.len() != self.types.len() {
            return Err(ConfigError::Validation(format!(
                "rule '{}' declares {} fields but {} types",
                self.name,
                self.fields.len(),
                self.types.len()
            )));
        }
        Ok(())
    }
}
