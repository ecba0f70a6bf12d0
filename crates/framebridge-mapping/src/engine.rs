//! The mapping engine.
//!
//! Turns parsed records into outbound payloads by walking an endpoint's
//! mapping rules in configured order. Each field goes through an explicit
//! per-field `Result`: converter (if named), then shared coercion to the
//! declared target type, then reserved-word expansion for string values. A
//! failing field never discards the record; required targets get a default,
//! optional targets are omitted.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use framebridge_core::{
    coerce, coerce_value, EndpointConfig, FieldValue, MappingRule, ParsedRecord,
};

use crate::converters::ConverterRegistry;
use crate::error::MappingError;
use crate::outbound::{MappingResult, OutboundMeta, OutboundRecord};
use crate::template::TemplateEngine;

#[derive(Debug, Default)]
struct MappingStats {
    mapped_count: u64,
    last_latency: Duration,
    avg_latency_us: f64,
}

/// Point-in-time copy of the engine's running counters.
#[derive(Debug, Clone, PartialEq)]
pub struct MappingStatsSnapshot {
    pub mapped_count: u64,
    pub last_latency: Duration,
    pub avg_latency: Duration,
}

pub struct MappingEngine {
    endpoints: Vec<EndpointConfig>,
    converters: Arc<ConverterRegistry>,
    templates: TemplateEngine,
    stats: Mutex<MappingStats>,
}

impl MappingEngine {
    /// Engine with the built-in converter set.
    pub fn new(endpoints: Vec<EndpointConfig>, device_id: Option<String>) -> Self {
        Self::with_parts(
            endpoints,
            Arc::new(ConverterRegistry::with_builtins()),
            TemplateEngine::new(device_id),
        )
    }

    pub fn with_parts(
        endpoints: Vec<EndpointConfig>,
        converters: Arc<ConverterRegistry>,
        templates: TemplateEngine,
    ) -> Self {
        Self {
            endpoints,
            converters,
            templates,
            stats: Mutex::new(MappingStats::default()),
        }
    }

    pub fn converters(&self) -> &Arc<ConverterRegistry> {
        &self.converters
    }

    /// A mapping rule is usable when its referenced converter (if any) is
    /// registered.
    pub fn validate_mapping_rule(&self, rule: &MappingRule) -> Result<(), MappingError> {
        if let Some(name) = &rule.converter {
            if !self.converters.contains(name) {
                return Err(MappingError::UnregisteredConverter { name: name.clone() });
            }
        }
        Ok(())
    }

    /// Map a parsed record against a named endpoint.
    pub fn map_to_outbound(
        &self,
        record: &Arc<ParsedRecord>,
        endpoint_name: &str,
    ) -> MappingResult {
        let start = Instant::now();
        let Some(endpoint) = self.endpoints.iter().find(|e| e.name == endpoint_name) else {
            return MappingResult::fail(
                MappingError::UnknownEndpoint(endpoint_name.to_string()).to_string(),
                start.elapsed(),
            );
        };

        let mut payload: HashMap<String, FieldValue> = HashMap::new();
        for rule in &endpoint.mapping_rules {
            // Rules whose source field is absent are skipped entirely; the
            // required/optional policy only applies to conversion failures.
            let Some(value) = record.field(&rule.source_field) else {
                continue;
            };
            match self.map_field(rule, value) {
                Ok(mapped) => {
                    payload.insert(rule.target_field.clone(), mapped);
                }
                Err(e) => {
                    warn!(
                        source = %rule.source_field,
                        target = %rule.target_field,
                        error = %e,
                        "field mapping failed"
                    );
                    if rule.required {
                        payload.insert(rule.target_field.clone(), self.default_for(rule));
                    }
                }
            }
        }

        // Common fields, only when a mapping rule hasn't claimed the key.
        payload
            .entry("timestamp".to_string())
            .or_insert_with(|| FieldValue::Str(record.timestamp.to_rfc3339()));
        payload
            .entry("deviceId".to_string())
            .or_insert_with(|| FieldValue::Str(record.device_id.clone()));
        payload
            .entry("dataSource".to_string())
            .or_insert_with(|| FieldValue::Str(record.source.clone()));

        let outbound = OutboundRecord {
            endpoint: endpoint.name.clone(),
            method: endpoint.method.clone(),
            content_type: endpoint.content_type.clone(),
            payload,
            meta: OutboundMeta::new(endpoint.priority),
            record: record.clone(),
        };

        let elapsed = start.elapsed();
        self.record_latency(elapsed);
        debug!(
            endpoint = %endpoint.name,
            message_id = %outbound.meta.message_id,
            fields = outbound.payload.len(),
            "mapped record"
        );
        MappingResult::ok(outbound, elapsed)
    }

    /// Map a batch concurrently, one task per record.
    ///
    /// Every record is mapped against the FIRST configured endpoint,
    /// regardless of any per-record intended endpoint. Inherited
    /// simplification, kept as-is. Fan-out is uncapped; the batch size is
    /// the concurrency bound.
    pub async fn map_batch(self: &Arc<Self>, records: Vec<Arc<ParsedRecord>>) -> Vec<MappingResult> {
        let Some(first) = self.endpoints.first().map(|e| e.name.clone()) else {
            return records
                .iter()
                .map(|_| MappingResult::fail(MappingError::NoEndpoints.to_string(), Duration::ZERO))
                .collect();
        };

        let handles: Vec<_> = records
            .into_iter()
            .map(|record| {
                let engine = self.clone();
                let endpoint = first.clone();
                tokio::spawn(async move { engine.map_to_outbound(&record, &endpoint) })
            })
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => results.push(MappingResult::fail(
                    format!("mapping task failed: {}", e),
                    Duration::ZERO,
                )),
            }
        }
        results
    }

    pub fn stats(&self) -> MappingStatsSnapshot {
        let stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        MappingStatsSnapshot {
            mapped_count: stats.mapped_count,
            last_latency: stats.last_latency,
            avg_latency: Duration::from_secs_f64(stats.avg_latency_us / 1_000_000.0),
        }
    }

    fn map_field(
        &self,
        rule: &MappingRule,
        value: &FieldValue,
    ) -> Result<FieldValue, MappingError> {
        let converted = match &rule.converter {
            Some(name) => {
                let converter = self
                    .converters
                    .get(name)
                    .ok_or_else(|| MappingError::UnregisteredConverter { name: name.clone() })?;
                converter.convert(value)?
            }
            None => value.clone(),
        };
        let coerced = coerce_value(converted, rule.target_type);
        Ok(match coerced {
            FieldValue::Str(s) => FieldValue::Str(self.templates.expand(&s)),
            other => other,
        })
    }

    /// Default written for a required target whose mapping failed: the
    /// configured default (templated, then coerced) or the type's zero
    /// value.
    fn default_for(&self, rule: &MappingRule) -> FieldValue {
        match &rule.default_value {
            Some(raw) => coerce(&self.templates.expand(raw), rule.target_type),
            None => rule.target_type.default_value(),
        }
    }

    fn record_latency(&self, elapsed: Duration) {
        let mut stats = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        stats.mapped_count += 1;
        stats.last_latency = elapsed;
        let sample_us = elapsed.as_secs_f64() * 1_000_000.0;
        stats.avg_latency_us += (sample_us - stats.avg_latency_us) / stats.mapped_count as f64;
    }
}
