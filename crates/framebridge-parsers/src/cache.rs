//! Compiled-regex cache.

use std::sync::Arc;

use dashmap::DashMap;
use regex::{Regex, RegexBuilder};

use crate::error::ParseError;

/// Cache of compiled case-insensitive regexes, keyed by pattern string.
///
/// Grows without eviction; bounded in practice by the configuration-bounded
/// rule set.
#[derive(Debug, Default)]
pub struct RegexCache {
    compiled: DashMap<String, Arc<Regex>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the compiled regex for `pattern`, compiling on first use.
    pub fn get_or_compile(&self, pattern: &str) -> Result<Arc<Regex>, ParseError> {
        if let Some(existing) = self.compiled.get(pattern) {
            return Ok(existing.clone());
        }
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ParseError::InvalidRegex {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })?;
        let regex = Arc::new(regex);
        self.compiled.insert(pattern.to_string(), regex.clone());
        Ok(regex)
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }
}
