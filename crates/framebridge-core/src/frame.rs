//! Raw frames and the closed frame-format enumeration.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ConfigError;

/// Wire format a frame is declared (or detected) to carry.
///
/// Closed enumeration: unknown tags are rejected when configuration is
/// loaded, not at first use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameFormat {
    Hex,
    Text,
    Json,
    Binary,
}

impl FrameFormat {
    pub const ALL: [FrameFormat; 4] = [Self::Hex, Self::Text, Self::Json, Self::Binary];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Hex => "hex",
            Self::Text => "text",
            Self::Json => "json",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for FrameFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hex" => Ok(Self::Hex),
            "text" | "txt" | "ascii" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "binary" | "bin" => Ok(Self::Binary),
            other => Err(ConfigError::UnknownFormat(other.to_string())),
        }
    }
}

impl Serialize for FrameFormat {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for FrameFormat {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// One decoded unit of raw bytes from a device.
///
/// Created per incoming frame by the frame source, consumed once by parsing.
/// The payload is immutable; stages share the frame behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RawFrame {
    /// Raw byte payload.
    pub payload: Vec<u8>,
    /// Format declared by the source, if any.
    pub format: Option<FrameFormat>,
    /// Originating device identifier.
    pub device_id: String,
    /// Source / port identifier.
    pub source: String,
    /// When the frame was received.
    pub received_at: DateTime<Utc>,
}

impl RawFrame {
    pub fn new(
        device_id: impl Into<String>,
        source: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            payload,
            format: None,
            device_id: device_id.into(),
            source: source.into(),
            received_at: Utc::now(),
        }
    }

    /// Declare the wire format the payload carries.
    pub fn with_format(mut self, format: FrameFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Lossy UTF-8 view of the payload.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}
