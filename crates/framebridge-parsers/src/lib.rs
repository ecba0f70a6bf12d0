//! Format parsers, parser selection and rule matching.
//!
//! This crate turns raw frames into typed records:
//! - **RuleMatcher**: holds an immutable, priority-sorted rule snapshot and
//!   picks the best rule for an incoming frame
//! - **ParserSelector**: compile-time registry of the four format parsers,
//!   dispatched on the closed [`FrameFormat`] enumeration
//! - **Hex / Text / Json / Binary parsers**: format-specific field
//!   extraction behind one [`FrameParser`] contract
//!
//! All parsers are stateless per call except their shared metrics counters,
//! which are safe under concurrent updates.

pub mod binary;
pub mod bytes;
pub mod cache;
pub mod error;
pub mod hex;
pub mod json;
pub mod matcher;
pub mod metrics;
pub mod selector;
pub mod text;

use framebridge_core::{FrameFormat, ParseOutcome, RawFrame, Rule};
use std::sync::Arc;

pub use binary::BinaryParser;
pub use cache::RegexCache;
pub use error::{ParseError, RuleValidationError};
pub use hex::HexParser;
pub use json::JsonParser;
pub use matcher::RuleMatcher;
pub use metrics::{ParserMetrics, ParserMetricsSnapshot};
pub use selector::ParserSelector;
pub use text::TextParser;

/// Common contract implemented by every format parser.
pub trait FrameParser: Send + Sync {
    /// Wire format this parser handles.
    fn format(&self) -> FrameFormat;

    /// Cheap heuristic: could this payload plausibly be this format?
    fn can_parse(&self, frame: &RawFrame) -> bool;

    /// Extract the rule's fields from the frame.
    ///
    /// Never panics on malformed input; expected failures come back as a
    /// failed [`ParseOutcome`].
    fn parse(&self, frame: &Arc<RawFrame>, rule: &Rule) -> ParseOutcome;

    /// Structural validation of a rule against this parser's pattern grammar.
    fn validate_rule(&self, rule: &Rule) -> Result<(), ParseError>;

    /// Running counters for this parser instance.
    fn metrics(&self) -> ParserMetricsSnapshot;
}
