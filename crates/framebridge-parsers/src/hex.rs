//! Hex frame parser.
//!
//! The pattern is a comma-separated list of `position:length[:type]`
//! segments over the raw bytes. Each slice is reinterpreted per its type
//! (explicit in the segment, or the field's declared type): hex string,
//! signed/unsigned big-endian integer, f32/f64, or NUL-trimmed ASCII.
//! Out-of-range slices are logged and coerced to an empty string instead of
//! failing the whole record.

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
pub struct HexParser {
    metrics: ParserMetrics,
}

impl HexParser {
    pub fn new() -> Self {
        Self::default()
    }

    fn fail(&self, message: String, start: Instant) -> ParseOutcome {
        let elapsed = start.elapsed();
        self.metrics.record(elapsed, false);
        ParseOutcome::fail(message, elapsed)
    }
}

impl FrameParser for HexParser {
    fn format(&self) -> FrameFormat {
        FrameFormat::Hex
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
                    // Out-of-range slice degrades to an empty string, the
                    // rest of the record still goes through.
                    warn!(
                        rule = %rule.name,
                        field = %field,
                        position = spec.position,
                        length = spec.length,
                        payload_len = frame.payload.len(),
                        "hex slice out of range"
                    );
                    warnings.push(format!(
                        "{}: slice {}:{} out of range for {} byte payload",
                        field,
                        spec.position,
                        spec.length,
                        frame.payload.len()
                    ));
                    FieldValue::Str(String::new())
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
        FieldType::Hex => FieldValue::Str(hex::encode_upper(slice)),
        FieldType::Uint => match read_be_unsigned(slice) {
            Some(v) if i64::try_from(v).is_ok() => FieldValue::Long(v as i64),
            _ => degrade(format!("cannot read {} bytes as uint", slice.len())),
        },
        FieldType::Int => match read_be_signed(slice) {
            Some(v) if i32::try_from(v).is_ok() => FieldValue::Int(v as i32),
            Some(v) => FieldValue::Long(v),
            None => degrade(format!("cannot read {} bytes as int", slice.len())),
        },
        FieldType::Long => match read_be_signed(slice) {
            Some(v) => FieldValue::Long(v),
            None => degrade(format!("cannot read {} bytes as long", slice.len())),
        },
        FieldType::Float => match <[u8; 4]>::try_from(slice) {
            Ok(bytes) => FieldValue::Double(f32::from_be_bytes(bytes) as f64),
            Err(_) => degrade(format!("float slice must be 4 bytes, got {}", slice.len())),
        },
        FieldType::Double | FieldType::Decimal => match <[u8; 8]>::try_from(slice) {
            Ok(bytes) => FieldValue::Double(f64::from_be_bytes(bytes)),
            Err(_) => degrade(format!("double slice must be 8 bytes, got {}", slice.len())),
        },
        FieldType::Ascii | FieldType::String => FieldValue::Str(trim_nul_ascii(slice)),
        FieldType::Bool | FieldType::DateTime => coerce(&trim_nul_ascii(slice), ty),
    }
}

fn trim_nul_ascii(slice: &[u8]) -> String {
    let trimmed: Vec<u8> = slice.iter().copied().filter(|b| *b != 0).collect();
    String::from_utf8_lossy(&trimmed).into_owned()
}
