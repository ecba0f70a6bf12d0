//! Binary frame parser.
//!
//! Same `position:length[:type]` pattern grammar as the hex parser, with a
//! different degradation policy: numeric fields are read with graceful
//! narrowing, so a 2-byte slice requested as a wider integer type is read at
//! the narrower width instead of failing. Byte order is big-endian, matching
//! the hex parser.

use std::sync::Arc;
use std::time::Instant;

use tracing::warn;

use framebridge_core::{
    coerce, FieldType, FieldValue, FrameFormat, ParseOutcome, ParsedRecord, RawFrame, Rule,
};

use crate::bytes::{parse_slice_specs, read_be_signed, read_be_unsigned};
use crate::error::ParseError;
use crate::metrics::{ParserMetrics, ParserMetricsSnapshot};
use crate::FrameParser;

#[derive(Debug, Default)]
pub struct BinaryParser {
    metrics: ParserMetrics,
}

impl BinaryParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&self, message: String, start: Instant) -> ParseOutcome {
        let elapsed = start.elapsed();
        self.metrics.record(elapsed, false);
        ParseOutcome::fail(message, elapsed)
    }
}

impl FrameParser for BinaryParser {
    fn format(&self) -> FrameFormat {
        FrameFormat::Binary
    }

    fn can_parse(&self, frame: &RawFrame) -> bool {
        !frame.is_empty()
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
        let specs = match parse_slice_specs(&rule.pattern) {
            Ok(specs) => specs,
            Err(e) => return self.fail(e.to_string(), start),
        };
        if specs.len() != rule.fields.len() {
            return self.fail(
                ParseError::SegmentCountMismatch {
                    specs: specs.len(),
                    fields: rule.fields.len(),
                }
                .to_string(),
                start,
            );
        }

        let mut record = ParsedRecord::from_frame(frame.clone(), &rule.name);
        let mut warnings = Vec::new();
        for (i, spec) in specs.iter().enumerate() {
            let field = &rule.fields[i];
            let ty = spec.ty.unwrap_or(rule.types[i]);
            let value = match spec
                .position
                .checked_add(spec.length)
                .and_then(|end| frame.payload.get(spec.position..end))
            {
                Some(slice) => decode_slice(slice, ty, field, &mut warnings),
                None => {
                    warn!(
                        rule = %rule.name,
                        field = %field,
                        position = spec.position,
                        length = spec.length,
                        payload_len = frame.payload.len(),
                        "binary slice out of range"
                    );
                    warnings.push(format!(
                        "{}: slice {}:{} out of range for {} byte payload",
                        field,
                        spec.position,
                        spec.length,
                        frame.payload.len()
                    ));
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
        let specs = parse_slice_specs(&rule.pattern)?;
        if specs.len() != rule.fields.len() {
            return Err(ParseError::SegmentCountMismatch {
                specs: specs.len(),
                fields: rule.fields.len(),
            });
        }
        Ok(())
    }

    fn metrics(&self) -> ParserMetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Decode one slice with graceful narrowing: integers read whatever width
/// the slice actually has (up to 8 bytes); floats pick f32 or f64 from the
/// slice length.
fn decode_slice(
    slice: &[u8],
    ty: FieldType,
    field: &str,
    warnings: &mut Vec<String>,
) -> FieldValue {
    let mut degrade = |message: String| {
        warn!(field = %field, "{}", message);
        warnings.push(format!("{}: {}", field, message));
        ty.default_value()
    };
    match ty {
        FieldType::Uint => match read_be_unsigned(slice) {
            Some(v) if i64::try_from(v).is_ok() => FieldValue::Long(v as i64),
            _ => degrade(format!("cannot read {} bytes as uint", slice.len())),
        },
        FieldType::Int | FieldType::Long => match read_be_signed(slice) {
            Some(v) if ty == FieldType::Int && i32::try_from(v).is_ok() => {
                FieldValue::Int(v as i32)
            }
            Some(v) => FieldValue::Long(v),
            None => degrade(format!("cannot read {} bytes as integer", slice.len())),
        },
        FieldType::Float | FieldType::Double | FieldType::Decimal => {
            if let Ok(bytes) = <[u8; 8]>::try_from(slice) {
                FieldValue::Double(f64::from_be_bytes(bytes))
            } else if let Ok(bytes) = <[u8; 4]>::try_from(slice) {
                FieldValue::Double(f32::from_be_bytes(bytes) as f64)
            } else {
                degrade(format!(
                    "float slice must be 4 or 8 bytes, got {}",
                    slice.len()
                ))
            }
        }
        FieldType::Hex => FieldValue::Str(hex::encode_upper(slice)),
        FieldType::Ascii | FieldType::String => {
            let trimmed: Vec<u8> = slice.iter().copied().filter(|b| *b != 0).collect();
            FieldValue::Str(String::from_utf8_lossy(&trimmed).into_owned())
        }
        FieldType::Bool | FieldType::DateTime => {
            let text = String::from_utf8_lossy(slice);
            coerce(text.trim_matches('\0'), ty)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(payload: Vec<u8>) -> Arc<RawFrame> {
        Arc::new(RawFrame::new("dev-2", "COM4", payload).with_format(FrameFormat::Binary))
    }

    #[test]
    fn test_triples_with_explicit_types() {
        let parser = BinaryParser::new();
        let rule = Rule::new("b", FrameFormat::Binary, "0:2:uint,2:1:int")
            .with_field("count", FieldType::Uint)
            .with_field("delta", FieldType::Int);
        let record = parser.parse(&frame(vec![0x01, 0x00, 0xFF]), &rule).record.unwrap();
        assert_eq!(record.field("count"), Some(&FieldValue::Long(256)));
        assert_eq!(record.field("delta"), Some(&FieldValue::Int(-1)));
    }

    #[test]
    fn test_graceful_narrowing_for_wide_types() {
        let parser = BinaryParser::new();
        // A 2-byte slice declared long reads as a 2-byte integer.
        let rule = Rule::new("narrow", FrameFormat::Binary, "0:2:long")
            .with_field("wide", FieldType::Long);
        let record = parser.parse(&frame(vec![0x00, 0x2A]), &rule).record.unwrap();
        assert_eq!(record.field("wide"), Some(&FieldValue::Long(42)));
    }

    #[test]
    fn test_float_width_from_slice_length() {
        let parser = BinaryParser::new();
        let mut payload = 1.5f32.to_be_bytes().to_vec();
        payload.extend_from_slice(&2.25f64.to_be_bytes());
        let rule = Rule::new("floats", FrameFormat::Binary, "0:4:double,4:8:double")
            .with_field("narrow", FieldType::Double)
            .with_field("wide", FieldType::Double);
        let record = parser.parse(&frame(payload), &rule).record.unwrap();
        assert_eq!(record.field("narrow"), Some(&FieldValue::Double(1.5)));
        assert_eq!(record.field("wide"), Some(&FieldValue::Double(2.25)));
    }

    #[test]
    fn test_out_of_range_degrades_to_type_default() {
        let parser = BinaryParser::new();
        let rule = Rule::new("r", FrameFormat::Binary, "0:1:uint,5:2:uint")
            .with_field("ok", FieldType::Uint)
            .with_field("gone", FieldType::Uint);
        let outcome = parser.parse(&frame(vec![0x09]), &rule);
        assert!(outcome.success);
        let record = outcome.record.unwrap();
        assert_eq!(record.field("ok"), Some(&FieldValue::Long(9)));
        assert_eq!(record.field("gone"), Some(&FieldValue::Long(0)));
    }

    #[test]
    fn test_position_at_usize_max_degrades_to_default() {
        let parser = BinaryParser::new();
        let pattern = format!("{}:4:uint", usize::MAX);
        let rule = Rule::new("wrap", FrameFormat::Binary, pattern)
            .with_field("v", FieldType::Uint);
        let outcome = parser.parse(&frame(vec![0x01, 0x02]), &rule);
        assert!(outcome.success);
        assert!(!outcome.warnings.is_empty());
        let record = outcome.record.unwrap();
        assert_eq!(record.field("v"), Some(&FieldValue::Long(0)));
    }

    #[test]
    fn test_empty_payload_fails() {
        let parser = BinaryParser::new();
        let rule = Rule::new("r", FrameFormat::Binary, "0:1:uint")
            .with_field("a", FieldType::Uint);
        assert!(!parser.parse(&frame(vec![]), &rule).success);
    }
}
