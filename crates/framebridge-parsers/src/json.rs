//! JSON frame parser.
//!
//! The rule pattern is a comma-separated list of dot-notation paths parallel
//! to the field list ("sensor.temp, sensor.unit"); a field whose path entry
//! is empty (or a rule with no pattern paths at all) resolves by its own
//! name. Paths support nested objects and array indices ("data.values[0]").
//! A missing path yields the declared type's default value plus a warning;
//! it does not fail the record.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::warn;

use framebridge_core::{
    coerce, coerce_value, FieldType, FieldValue, FrameFormat, ParseOutcome, ParsedRecord,
    RawFrame, Rule,
};

use crate::error::ParseError;
use crate::metrics::{ParserMetrics, ParserMetricsSnapshot};
use crate::FrameParser;

#[derive(Debug, Default)]
pub struct JsonParser {
    metrics: ParserMetrics,
}

impl JsonParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&self, message: String, start: Instant) -> ParseOutcome {
        let elapsed = start.elapsed();
        self.metrics.record(elapsed, false);
        ParseOutcome::fail(message, elapsed)
    }
}

impl FrameParser for JsonParser {
    fn format(&self) -> FrameFormat {
        FrameFormat::Json
    }

    /// Heuristic: first non-whitespace byte opens a JSON object or array.
    fn can_parse(&self, frame: &RawFrame) -> bool {
        frame
            .payload
            .iter()
            .find(|b| !b.is_ascii_whitespace())
            .map(|b| *b == b'{' || *b == b'[')
            .unwrap_or(false)
    }

    fn parse(&self, frame: &Arc<RawFrame>, rule: &Rule) -> ParseOutcome {
        let start = Instant::now();
        if frame.is_empty() {
            return self.fail("frame payload is empty".to_string(), start);
        }
        if rule.fields.len() != rule.types.len() {
            return self.fail(
                ParseError::FieldTypeCountMismatch {
                    fields: rule.fields.len(),
                    types: rule.types.len(),
                }
                .to_string(),
                start,
            );
        }
        let document: Value = match serde_json::from_slice(&frame.payload) {
            Ok(document) => document,
            Err(e) => return self.fail(format!("payload is not valid JSON: {}", e), start),
        };

        let paths: Vec<&str> = rule.pattern.split(',').map(str::trim).collect();
        let mut record = ParsedRecord::from_frame(frame.clone(), &rule.name);
        let mut warnings = Vec::new();
        for (i, field) in rule.fields.iter().enumerate() {
            let path = paths
                .get(i)
                .filter(|p| !p.is_empty())
                .copied()
                .unwrap_or(field.as_str());
            let ty = rule.types[i];
            let value = match resolve_path(&document, path) {
                Some(value) => json_to_field(value, ty),
                None => {
                    warn!(rule = %rule.name, field = %field, path = %path, "json path missing");
                    warnings.push(format!("{}: path '{}' not found", field, path));
                    ty.default_value()
                }
            };
            record.fields.insert(field.clone(), value);
        }

        let elapsed = start.elapsed();
        self.metrics.record(elapsed, true);
        ParseOutcome::ok_with_warnings(record, warnings, elapsed)
    }

    fn validate_rule(&self, rule: &Rule) -> Result<(), ParseError> {
        if rule.fields.len() != rule.types.len() {
            return Err(ParseError::FieldTypeCountMismatch {
                fields: rule.fields.len(),
                types: rule.types.len(),
            });
        }
        let paths = rule
            .pattern
            .split(',')
            .filter(|p| !p.trim().is_empty())
            .count();
        if paths > rule.fields.len() {
            return Err(ParseError::SegmentCountMismatch {
                specs: paths,
                fields: rule.fields.len(),
            });
        }
        Ok(())
    }

    fn metrics(&self) -> ParserMetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Resolve a dot-notation path ("a.b[0].c") inside a JSON document.
///
/// Returns `None` when any step is missing, out of bounds, or resolves to
/// `null`.
fn resolve_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut current = document;
    for part in trimmed.split('.') {
        let part = part.trim();
        if part.is_empty() || part == "$" {
            continue;
        }
        if let (Some(open), Some(close)) = (part.find('['), part.find(']')) {
            let key = &part[..open];
            if !key.is_empty() {
                current = current.as_object()?.get(key)?;
            }
            let index: usize = part[open + 1..close].parse().ok()?;
            current = current.as_array()?.get(index)?;
        } else {
            current = current.as_object()?.get(part)?;
        }
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

fn json_to_field(value: &Value, ty: FieldType) -> FieldValue {
    match value {
        Value::String(s) => coerce(s, ty),
        Value::Number(n) => {
            let field = if let Some(i) = n.as_i64() {
                FieldValue::Long(i)
            } else {
                FieldValue::Double(n.as_f64().unwrap_or_default())
            };
            coerce_value(field, ty)
        }
        Value::Bool(b) => coerce_value(FieldValue::Bool(*b), ty),
        other => coerce(&other.to_string(), ty),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn frame(document: &Value) -> Arc<RawFrame> {
        Arc::new(
            RawFrame::new("dev-1", "COM3", document.to_string().into_bytes())
                .with_format(FrameFormat::Json),
        )
    }

    #[test]
    fn test_nested_path() {
        let parser = JsonParser::new();
        let rule = Rule::new("temp", FrameFormat::Json, "sensor.temp")
            .with_field("temperature", FieldType::Double);
        let outcome = parser.parse(&frame(&json!({"sensor": {"temp": 21.5}})), &rule);
        assert!(outcome.success);
        assert!(outcome.warnings.is_empty());
        let record = outcome.record.unwrap();
        assert_eq!(
            record.field("temperature"),
            Some(&FieldValue::Double(21.5))
        );
    }

    #[test]
    fn test_missing_path_yields_default_with_warning() {
        let parser = JsonParser::new();
        let rule = Rule::new("temp", FrameFormat::Json, "sensor.humidity")
            .with_field("humidity", FieldType::Double);
        let outcome = parser.parse(&frame(&json!({"sensor": {"temp": 21.5}})), &rule);
        assert!(outcome.success);
        assert_eq!(outcome.warnings.len(), 1);
        let record = outcome.record.unwrap();
        assert_eq!(record.field("humidity"), Some(&FieldValue::Double(0.0)));
    }

    #[test]
    fn test_field_name_used_when_pattern_empty() {
        let parser = JsonParser::new();
        let rule = Rule::new("plain", FrameFormat::Json, "")
            .with_field("battery", FieldType::Int);
        // An empty pattern is structurally invalid for other formats but the
        // JSON parser treats it as "resolve every field by its own name".
        let outcome = parser.parse(&frame(&json!({"battery": 85})), &rule);
        let record = outcome.record.unwrap();
        assert_eq!(record.field("battery"), Some(&FieldValue::Int(85)));
    }

    #[test]
    fn test_array_index_path() {
        let parser = JsonParser::new();
        let rule = Rule::new("arr", FrameFormat::Json, "sensors[1].value")
            .with_field("second", FieldType::Double);
        let document = json!({"sensors": [{"value": 1.0}, {"value": 2.5}]});
        let record = parser.parse(&frame(&document), &rule).record.unwrap();
        assert_eq!(record.field("second"), Some(&FieldValue::Double(2.5)));
    }

    #[test]
    fn test_invalid_json_fails() {
        let parser = JsonParser::new();
        let rule = Rule::new("r", FrameFormat::Json, "a").with_field("a", FieldType::Int);
        let raw = Arc::new(RawFrame::new("d", "s", b"{not json".to_vec()));
        let outcome = parser.parse(&raw, &rule);
        assert!(!outcome.success);
    }

    #[test]
    fn test_can_parse_heuristic() {
        let parser = JsonParser::new();
        assert!(parser.can_parse(&RawFrame::new("d", "s", b"  {\"a\":1}".to_vec())));
        assert!(parser.can_parse(&RawFrame::new("d", "s", b"[1,2]".to_vec())));
        assert!(!parser.can_parse(&RawFrame::new("d", "s", b"TEMP:25".to_vec())));
        assert!(!parser.can_parse(&RawFrame::new("d", "s", vec![])));
    }

    #[test]
    fn test_string_coercion_through_shared_table() {
        let parser = JsonParser::new();
        let rule = Rule::new("s", FrameFormat::Json, "reading")
            .with_field("reading", FieldType::Double);
        let record = parser
            .parse(&frame(&json!({"reading": "19.75"})), &rule)
            .record
            .unwrap();
        assert_eq!(record.field("reading"), Some(&FieldValue::Double(19.75)));
    }
}
