//! Outbound records and the mapping result wrapper.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use framebridge_core::{FieldValue, ParsedRecord};

/// Delivery metadata carried for tracing and retry accounting.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMeta {
    /// Message id, the only identity an outbound record has.
    pub message_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub priority: i32,
    /// Delivery attempts made so far; updated by the dispatcher.
    pub attempts: u32,
}

impl OutboundMeta {
    pub fn new(priority: i32) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            created_at: Utc::now(),
            priority,
            attempts: 0,
        }
    }
}

/// The payload and delivery metadata produced by the mapping engine.
#[derive(Debug, Clone)]
pub struct OutboundRecord {
    /// Target endpoint name.
    pub endpoint: String,
    /// HTTP method hint for the delivery collaborator.
    pub method: String,
    /// Content type hint.
    pub content_type: String,
    /// Target field name -> value.
    pub payload: HashMap<String, FieldValue>,
    pub meta: OutboundMeta,
    /// The parsed record this payload was mapped from.
    pub record: Arc<ParsedRecord>,
}

impl OutboundRecord {
    /// Payload serialized as a JSON object (untagged values).
    pub fn payload_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.payload).unwrap_or(serde_json::Value::Null)
    }
}

/// Result of one mapping attempt; expected failures are values, not panics.
#[derive(Debug, Clone)]
pub struct MappingResult {
    pub success: bool,
    pub record: Option<OutboundRecord>,
    pub message: Option<String>,
    pub elapsed: Duration,
}

impl MappingResult {
    pub fn ok(record: OutboundRecord, elapsed: Duration) -> Self {
        Self {
            success: true,
            record: Some(record),
            message: None,
            elapsed,
        }
    }

    pub fn fail(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            success: false,
            record: None,
            message: Some(message.into()),
            elapsed,
        }
    }
}
