//! Parse results: the typed record and its outcome wrapper.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::frame::RawFrame;
use crate::value::FieldValue;

/// Typed field set produced by applying a rule to a frame.
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    /// Originating device identifier.
    pub device_id: String,
    /// Source / port identifier.
    pub source: String,
    /// Frame reception time.
    pub timestamp: DateTime<Utc>,
    /// Name of the rule that produced this record.
    pub rule_name: String,
    /// Field name -> typed value.
    pub fields: HashMap<String, FieldValue>,
    /// Frame this record was extracted from.
    pub frame: Arc<RawFrame>,
}

impl ParsedRecord {
    pub fn from_frame(frame: Arc<RawFrame>, rule_name: impl Into<String>) -> Self {
        Self {
            device_id: frame.device_id.clone(),
            source: frame.source.clone(),
            timestamp: frame.received_at,
            rule_name: rule_name.into(),
            fields: HashMap::new(),
            frame,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// Result of one parse attempt.
///
/// Expected failures (short frame, pattern mismatch, bad spec) are returned
/// as a failed outcome with a message, never raised; field-level problems
/// surface as warnings on a successful outcome.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub success: bool,
    pub record: Option<ParsedRecord>,
    pub error: Option<String>,
    pub warnings: Vec<String>,
    pub elapsed: Duration,
}

impl ParseOutcome {
    pub fn ok(record: ParsedRecord, elapsed: Duration) -> Self {
        Self {
            success: true,
            record: Some(record),
            error: None,
            warnings: Vec::new(),
            elapsed,
        }
    }

    pub fn ok_with_warnings(
        record: ParsedRecord,
        warnings: Vec<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            success: true,
            record: Some(record),
            error: None,
            warnings,
            elapsed,
        }
    }

    pub fn fail(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            record: None,
            error: Some(message.into()),
            warnings: Vec::new(),
            elapsed,
        }
    }
}
