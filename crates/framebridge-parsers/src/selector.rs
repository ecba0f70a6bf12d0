//! Parser selection.
//!
//! The selector is a compile-time registry: it owns one instance of each
//! format parser and dispatches on the closed [`FrameFormat`] enumeration.
//! There is no string-keyed lookup and nothing instantiated at first use.

use std::sync::Arc;

use framebridge_core::{FrameFormat, RawFrame};

use crate::binary::BinaryParser;
use crate::cache::RegexCache;
use crate::hex::HexParser;
use crate::json::JsonParser;
use crate::text::TextParser;
use crate::FrameParser;

pub struct ParserSelector {
    hex: HexParser,
    text: TextParser,
    json: JsonParser,
    binary: BinaryParser,
}

impl ParserSelector {
    pub fn new() -> Self {
        Self::with_cache(Arc::new(RegexCache::new()))
    }

    /// Build with a shared compiled-regex cache (typically the rule
    /// matcher's).
    pub fn with_cache(cache: Arc<RegexCache>) -> Self {
        Self {
            hex: HexParser::new(),
            text: TextParser::with_cache(cache),
            json: JsonParser::new(),
            binary: BinaryParser::new(),
        }
    }

    /// The parser for a declared format.
    pub fn parser_for(&self, format: FrameFormat) -> &dyn FrameParser {
        match format {
            FrameFormat::Hex => &self.hex,
            FrameFormat::Text => &self.text,
            FrameFormat::Json => &self.json,
            FrameFormat::Binary => &self.binary,
        }
    }

    /// Pick a parser for a frame.
    ///
    /// A declared format wins outright. Undeclared frames are probed in
    /// detection order JSON -> text -> hex; the binary parser is only ever
    /// chosen through a declared format, since any non-empty payload
    /// satisfies its `can_parse`.
    pub fn select(&self, frame: &RawFrame) -> Option<&dyn FrameParser> {
        if let Some(format) = frame.format {
            return Some(self.parser_for(format));
        }
        if frame.is_empty() {
            return None;
        }
        if self.json.can_parse(frame) {
            Some(&self.json)
        } else if self.text.can_parse(frame) {
            Some(&self.text)
        } else if self.hex.can_parse(frame) {
            Some(&self.hex)
        } else {
            None
        }
    }
}

impl Default for ParserSelector {
    fn default() -> Self {
        Self::new()
    }
}
