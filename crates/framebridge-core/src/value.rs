//! Typed field values and the shared coercion table.
//!
//! Every stage of the pipeline trades in [`FieldValue`], a closed tagged
//! union, and declares expectations with [`FieldType`]. The [`coerce`]
//! routine is the single string-to-typed-value conversion table; parsers and
//! the mapping engine both use it so the two never drift apart.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

/// A typed value extracted from a frame or produced by mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Str(String),
    Int(i32),
    Long(i64),
    Double(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v as i64),
            Self::Long(v) => Some(*v),
            Self::Double(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Long(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "string",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Double(_) => "double",
            Self::Bool(_) => "bool",
            Self::DateTime(_) => "datetime",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Long(v) => write!(f, "{}", v),
            Self::Double(v) => write!(f, "{}", v),
            Self::Bool(v) => write!(f, "{}", v),
            Self::DateTime(v) => write!(f, "{}", v.to_rfc3339()),
        }
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Declared type of a rule field or mapping target.
///
/// `Hex`, `Uint` and `Ascii` are slice interpretations understood by the
/// byte-oriented parsers; the remaining variants are value types shared with
/// the mapping engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Int,
    Long,
    Float,
    Double,
    Decimal,
    Bool,
    DateTime,
    /// Raw slice rendered as a hex string.
    Hex,
    /// Unsigned big-endian integer slice.
    Uint,
    /// NUL-trimmed ASCII slice.
    Ascii,
}

impl FieldType {
    /// The zero value written when conversion fails or a path is missing.
    pub fn default_value(&self) -> FieldValue {
        match self {
            Self::String | Self::Hex | Self::Ascii => FieldValue::Str(String::new()),
            Self::Int => FieldValue::Int(0),
            Self::Long | Self::Uint => FieldValue::Long(0),
            Self::Float | Self::Double | Self::Decimal => FieldValue::Double(0.0),
            Self::Bool => FieldValue::Bool(false),
            Self::DateTime => FieldValue::DateTime(DateTime::UNIX_EPOCH),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int => "int",
            Self::Long => "long",
            Self::Float => "float",
            Self::Double => "double",
            Self::Decimal => "decimal",
            Self::Bool => "bool",
            Self::DateTime => "datetime",
            Self::Hex => "hex",
            Self::Uint => "uint",
            Self::Ascii => "ascii",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FieldType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "str" => Ok(Self::String),
            "int" | "int32" | "integer" => Ok(Self::Int),
            "long" | "int64" => Ok(Self::Long),
            "float" | "single" => Ok(Self::Float),
            "double" => Ok(Self::Double),
            "decimal" => Ok(Self::Decimal),
            "bool" | "boolean" => Ok(Self::Bool),
            "datetime" | "date" => Ok(Self::DateTime),
            "hex" => Ok(Self::Hex),
            "uint" | "uint8" | "uint16" | "uint32" => Ok(Self::Uint),
            "ascii" => Ok(Self::Ascii),
            other => Err(ConfigError::UnknownFieldType(other.to_string())),
        }
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Convert a raw string into `ty`, falling back to the type's zero value.
///
/// Parsing is culture-invariant (`str::parse`, RFC 3339 or
/// `YYYY-MM-DD HH:MM:SS` for datetimes). Failures never propagate: callers
/// that need the required-vs-optional branch compare against
/// [`FieldType::default_value`].
pub fn coerce(raw: &str, ty: FieldType) -> FieldValue {
    let trimmed = raw.trim();
    match ty {
        FieldType::String | FieldType::Hex | FieldType::Ascii => FieldValue::Str(raw.to_string()),
        FieldType::Int => trimmed
            .parse::<i32>()
            .map(FieldValue::Int)
            .unwrap_or_else(|_| ty.default_value()),
        FieldType::Long | FieldType::Uint => trimmed
            .parse::<i64>()
            .map(FieldValue::Long)
            .unwrap_or_else(|_| ty.default_value()),
        FieldType::Float | FieldType::Double | FieldType::Decimal => trimmed
            .parse::<f64>()
            .map(FieldValue::Double)
            .unwrap_or_else(|_| ty.default_value()),
        FieldType::Bool => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => FieldValue::Bool(true),
            "false" | "0" | "no" | "off" => FieldValue::Bool(false),
            _ => ty.default_value(),
        },
        FieldType::DateTime => parse_datetime(trimmed)
            .map(FieldValue::DateTime)
            .unwrap_or_else(|| ty.default_value()),
    }
}

/// Re-type an already-typed value.
///
/// Values whose variant already satisfies `ty` pass through untouched;
/// numeric widening/narrowing happens in place; anything else goes through
/// the string table in [`coerce`].
pub fn coerce_value(value: FieldValue, ty: FieldType) -> FieldValue {
    match (ty, &value) {
        (FieldType::String | FieldType::Hex | FieldType::Ascii, FieldValue::Str(_)) => value,
        (FieldType::Int, FieldValue::Int(_)) => value,
        (FieldType::Int, _) => match value.as_i64() {
            Some(v) if i32::try_from(v).is_ok() => FieldValue::Int(v as i32),
            Some(_) => ty.default_value(),
            None => coerce(&value.to_string(), ty),
        },
        (FieldType::Long | FieldType::Uint, FieldValue::Long(_)) => value,
        (FieldType::Long | FieldType::Uint, _) => match value.as_i64() {
            Some(v) => FieldValue::Long(v),
            None => coerce(&value.to_string(), ty),
        },
        (FieldType::Float | FieldType::Double | FieldType::Decimal, FieldValue::Double(_)) => value,
        (FieldType::Float | FieldType::Double | FieldType::Decimal, _) => match value.as_f64() {
            Some(v) => FieldValue::Double(v),
            None => coerce(&value.to_string(), ty),
        },
        (FieldType::Bool, FieldValue::Bool(_)) => value,
        (FieldType::DateTime, FieldValue::DateTime(_)) => value,
        _ => coerce(&value.to_string(), ty),
    }
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}
