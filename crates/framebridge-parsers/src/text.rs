//! Text frame parser.
//!
//! The rule pattern is a case-insensitive regular expression, compiled once
//! per distinct pattern string and cached. Capture groups map positionally:
//! group *k* produces declared field *k*, coerced via the shared conversion
//! table. A non-match is a parse failure; there is no partial result.

use std::sync::Arc;
use std::time::Instant;

use tracing::trace;

use framebridge_core::{coerce, FrameFormat, ParseOutcome, ParsedRecord, RawFrame, Rule};

use crate::cache::RegexCache;
use crate::error::ParseError;
use crate::metrics::{ParserMetrics, ParserMetricsSnapshot};
use crate::FrameParser;

/// Fraction of NUL/control characters above which a payload is treated as
/// binary rather than text.
const BINARY_RATIO: f64 = 0.10;

#[derive(Debug, Default)]
pub struct TextParser {
    metrics: ParserMetrics,
    cache: Arc<RegexCache>,
}

impl TextParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share a compiled-regex cache with other components.
    pub fn with_cache(cache: Arc<RegexCache>) -> Self {
        Self {
            metrics: ParserMetrics::new(),
            cache,
        }
    }

    fn fail(&self, message: String, start: Instant) -> ParseOutcome {
        let elapsed = start.elapsed();
        self.metrics.record(elapsed, false);
        ParseOutcome::fail(message, elapsed)
    }
}

impl FrameParser for TextParser {
    fn format(&self) -> FrameFormat {
        FrameFormat::Text
    }

    /// Heuristic: payloads where more than 10% of the characters are NUL or
    /// non-whitespace control characters are not text.
    fn can_parse(&self, frame: &RawFrame) -> bool {
        if frame.is_empty() {
            return false;
        }
        let text = frame.text();
        let total = text.chars().count();
        let suspicious = text
            .chars()
            .filter(|c| *c == '\0' || (c.is_control() && !c.is_whitespace()))
            .count();
        (suspicious as f64) <= BINARY_RATIO * total as f64
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
        let regex = match self.cache.get_or_compile(&rule.pattern) {
            Ok(regex) => regex,
            Err(e) => return self.fail(e.to_string(), start),
        };

        let text = frame.text();
        let Some(captures) = regex.captures(&text) else {
            trace!(rule = %rule.name, "text pattern did not match");
            return self.fail(ParseError::PatternMismatch.to_string(), start);
        };

        let mut record = ParsedRecord::from_frame(frame.clone(), &rule.name);
        let mut warnings = Vec::new();
        for (i, field) in rule.fields.iter().enumerate() {
            let value = match captures.get(i + 1) {
                Some(group) => coerce(group.as_str(), rule.types[i]),
                None => {
                    warnings.push(format!("{}: capture group {} missing", field, i + 1));
                    rule.types[i].default_value()
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
        self.cache.get_or_compile(&rule.pattern).map(|_| ())
    }

    fn metrics(&self) -> ParserMetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use framebridge_core::{FieldType, FieldValue};

    fn frame(text: &str) -> Arc<RawFrame> {
        Arc::new(RawFrame::new("dev-1", "COM3", text.as_bytes().to_vec())
            .with_format(FrameFormat::Text))
    }

    fn temp_rule() -> Rule {
        Rule::new("temp", FrameFormat::Text, r"^TEMP:(\d+\.\d+)$")
            .with_field("temperature", FieldType::Double)
    }

    #[test]
    fn test_match_extracts_group() {
        let parser = TextParser::new();
        let outcome = parser.parse(&frame("TEMP:25.6"), &temp_rule());
        assert!(outcome.success);
        let record = outcome.record.unwrap();
        assert_eq!(
            record.field("temperature"),
            Some(&FieldValue::Double(25.6))
        );
    }

    #[test]
    fn test_non_match_is_failure() {
        let parser = TextParser::new();
        let outcome = parser.parse(&frame("HUMID:50"), &temp_rule());
        assert!(!outcome.success);
        assert!(outcome.record.is_none());
    }

    #[test]
    fn test_match_is_case_insensitive() {
        let parser = TextParser::new();
        let outcome = parser.parse(&frame("temp:25.6"), &temp_rule());
        assert!(outcome.success);
    }

    #[test]
    fn test_multiple_groups_map_positionally() {
        let parser = TextParser::new();
        let rule = Rule::new("kv", FrameFormat::Text, r"^(\w+)=(\d+)$")
            .with_field("key", FieldType::String)
            .with_field("value", FieldType::Int);
        let record = parser.parse(&frame("speed=80"), &rule).record.unwrap();
        assert_eq!(record.field("key"), Some(&FieldValue::Str("speed".into())));
        assert_eq!(record.field("value"), Some(&FieldValue::Int(80)));
    }

    #[test]
    fn test_can_parse_rejects_binary() {
        let parser = TextParser::new();
        let binary = Arc::new(RawFrame::new("d", "s", vec![0x00, 0x01, 0x02, 0x03, b'A']));
        assert!(!parser.can_parse(&binary));
        assert!(parser.can_parse(&frame("plain text\r\n")));
        assert!(!parser.can_parse(&Arc::new(RawFrame::new("d", "s", vec![]))));
    }

    #[test]
    fn test_invalid_regex_fails_cleanly() {
        let parser = TextParser::new();
        let rule = Rule::new("bad", FrameFormat::Text, r"([unclosed")
            .with_field("a", FieldType::String);
        let outcome = parser.parse(&frame("anything"), &rule);
        assert!(!outcome.success);
        assert!(parser.validate_rule(&rule).is_err());
    }

    #[test]
    fn test_regex_cached_across_parses() {
        let parser = TextParser::new();
        parser.parse(&frame("TEMP:1.0"), &temp_rule());
        parser.parse(&frame("TEMP:2.0"), &temp_rule());
        assert_eq!(parser.cache.len(), 1);
    }
}
