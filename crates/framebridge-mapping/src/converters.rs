//! Pluggable value converters and their registry.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use framebridge_core::FieldValue;

use crate::error::MappingError;

/// A transformation applied to a field value during mapping, before the
/// result is coerced to the mapping rule's target type.
pub trait Converter: Send + Sync {
    fn convert(&self, value: &FieldValue) -> Result<FieldValue, MappingError>;
}

/// Name -> converter registry.
///
/// Register and unregister are idempotent; overriding an existing name is
/// allowed but logged.
#[derive(Default)]
pub struct ConverterRegistry {
    converters: DashMap<String, Arc<dyn Converter>>,
}

impl ConverterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the built-in converters.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register("uppercase", Arc::new(Uppercase));
        registry.register("lowercase", Arc::new(Lowercase));
        registry.register("trim", Arc::new(Trim));
        registry.register("round", Arc::new(Round));
        registry.register("celsius_to_fahrenheit", Arc::new(Scale::new(1.8).then_offset(32.0)));
        registry
    }

    pub fn register(&self, name: impl Into<String>, converter: Arc<dyn Converter>) {
        let name = name.into();
        if self.converters.insert(name.clone(), converter).is_some() {
            warn!(converter = %name, "overriding registered converter");
        } else {
            debug!(converter = %name, "registered converter");
        }
    }

    /// Remove a converter; removing an unknown name is a no-op.
    pub fn unregister(&self, name: &str) {
        self.converters.remove(name);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Converter>> {
        self.converters.get(name).map(|entry| entry.clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.converters.contains_key(name)
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("len", &self.converters.len())
            .finish()
    }
}

fn numeric_input(value: &FieldValue, converter: &str) -> Result<f64, MappingError> {
    value.as_f64().ok_or_else(|| MappingError::ConverterFailed {
        name: converter.to_string(),
        message: format!("expected a numeric value, got {}", value.type_name()),
    })
}

/// Multiply a numeric value by a constant factor, with an optional offset.
pub struct Scale {
    factor: f64,
    offset: f64,
}

impl Scale {
    pub fn new(factor: f64) -> Self {
        Self { factor, offset: 0.0 }
    }

    pub fn then_offset(mut self, offset: f64) -> Self {
        self.offset = offset;
        self
    }
}

impl Converter for Scale {
    fn convert(&self, value: &FieldValue) -> Result<FieldValue, MappingError> {
        let v = numeric_input(value, "scale")?;
        Ok(FieldValue::Double(v * self.factor + self.offset))
    }
}

/// Add a constant to a numeric value.
pub struct Offset(pub f64);

impl Converter for Offset {
    fn convert(&self, value: &FieldValue) -> Result<FieldValue, MappingError> {
        let v = numeric_input(value, "offset")?;
        Ok(FieldValue::Double(v + self.0))
    }
}

/// Round a numeric value to the nearest integer.
pub struct Round;

impl Converter for Round {
    fn convert(&self, value: &FieldValue) -> Result<FieldValue, MappingError> {
        let v = numeric_input(value, "round")?;
        Ok(FieldValue::Long(v.round() as i64))
    }
}

struct Uppercase;

impl Converter for Uppercase {
    fn convert(&self, value: &FieldValue) -> Result<FieldValue, MappingError> {
        Ok(FieldValue::Str(value.to_string().to_uppercase()))
    }
}

struct Lowercase;

impl Converter for Lowercase {
    fn convert(&self, value: &FieldValue) -> Result<FieldValue, MappingError> {
        Ok(FieldValue::Str(value.to_string().to_lowercase()))
    }
}

struct Trim;

impl Converter for Trim {
    fn convert(&self, value: &FieldValue) -> Result<FieldValue, MappingError> {
        Ok(FieldValue::Str(value.to_string().trim().to_string()))
    }
}
