//! Slice specs and big-endian byte readers shared by the hex and binary
//! parsers.

use framebridge_core::FieldType;

use crate::error::ParseError;

/// One `position:length[:type]` segment of a byte-oriented pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct SliceSpec {
    pub position: usize,
    pub length: usize,
    /// Explicit slice type; falls back to the field's declared type.
    pub ty: Option<FieldType>,
}

/// Parse a comma-separated `position:length[:type]` pattern.
pub fn parse_slice_specs(pattern: &str) -> Result<Vec<SliceSpec>, ParseError> {
    pattern
        .split(',')
        .map(|segment| parse_segment(segment.trim()))
        .collect()
}

fn parse_segment(segment: &str) -> Result<SliceSpec, ParseError> {
    let invalid = |message: &str| ParseError::InvalidFieldSpec {
        spec: segment.to_string(),
        message: message.to_string(),
    };

    let mut parts = segment.split(':');
    let position = parts
        .next()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| invalid("missing position"))?
        .trim()
        .parse::<usize>()
        .map_err(|_| invalid("position is not a number"))?;
    let length = parts
        .next()
        .ok_or_else(|| invalid("missing length"))?
        .trim()
        .parse::<usize>()
        .map_err(|_| invalid("length is not a number"))?;
    if length == 0 {
        return Err(invalid("length must be at least 1"));
    }
    let ty = match parts.next() {
        Some(tag) => Some(
            tag.parse::<FieldType>()
                .map_err(|e| invalid(&e.to_string()))?,
        ),
        None => None,
    };
    if parts.next().is_some() {
        return Err(invalid("too many ':' separators"));
    }
    Ok(SliceSpec {
        position,
        length,
        ty,
    })
}

/// Read an unsigned big-endian integer of 1..=8 bytes.
pub fn read_be_unsigned(slice: &[u8]) -> Option<u64> {
    if slice.is_empty() || slice.len() > 8 {
        return None;
    }
    Some(slice.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64))
}

/// Read a sign-extended big-endian integer of 1..=8 bytes.
pub fn read_be_signed(slice: &[u8]) -> Option<i64> {
    let raw = read_be_unsigned(slice)?;
    let bits = slice.len() * 8;
    if bits == 64 {
        return Some(raw as i64);
    }
    let sign = 1u64 << (bits - 1);
    if raw & sign != 0 {
        Some((raw | !(sign | (sign - 1))) as i64)
    } else {
        Some(raw as i64)
    }
}
