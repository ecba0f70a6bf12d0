//! Rule matching over an immutable, snapshot-swapped rule set.
//!
//! Lookups clone an `Arc` snapshot and never hold the lock while matching;
//! mutations rebuild a freshly sorted vector and publish it atomically, so a
//! reload cannot stall concurrent lookups mid-match.
//!
//! Matching is deliberately asymmetric: text (and undeclared) frames are
//! matched by actually running each candidate's regex against the decoded
//! payload, while hex/JSON/binary frames take the highest-priority rule for
//! their declared format without any content validation. That asymmetry is
//! inherited behavior, kept on purpose and covered by tests.

use std::sync::{Arc, RwLock};

use tracing::{debug, trace};

use framebridge_core::{ConfigError, FrameFormat, RawFrame, Rule};

use crate::cache::RegexCache;
use crate::error::RuleValidationError;

pub struct RuleMatcher {
    snapshot: RwLock<Arc<Vec<Rule>>>,
    cache: Arc<RegexCache>,
}

impl RuleMatcher {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self::with_cache(rules, Arc::new(RegexCache::new()))
    }

    /// Build with a shared compiled-regex cache (typically shared with the
    /// text parser).
    pub fn with_cache(rules: Vec<Rule>, cache: Arc<RegexCache>) -> Self {
        Self {
            snapshot: RwLock::new(Arc::new(sorted(rules))),
            cache,
        }
    }

    pub fn regex_cache(&self) -> Arc<RegexCache> {
        self.cache.clone()
    }

    /// Current rule snapshot, priority descending.
    pub fn snapshot(&self) -> Arc<Vec<Rule>> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Rules with the given format tag, priority descending.
    pub fn rules_for_format(&self, format: FrameFormat) -> Vec<Rule> {
        self.snapshot()
            .iter()
            .filter(|r| r.format == format)
            .cloned()
            .collect()
    }

    /// Pick the best rule for a frame.
    ///
    /// Text or undeclared frames: first candidate, in priority order, whose
    /// regex matches the decoded payload. Other declared formats: the
    /// highest-priority candidate for that format, pattern unvalidated.
    pub fn find_matching_rule(&self, frame: &RawFrame) -> Option<Rule> {
        let rules = self.snapshot();
        match frame.format {
            Some(FrameFormat::Text) | None => {
                let text = frame.text();
                let candidates = rules
                    .iter()
                    .filter(|r| frame.format.is_none() || r.format == FrameFormat::Text);
                for rule in candidates {
                    match self.cache.get_or_compile(&rule.pattern) {
                        Ok(regex) if regex.is_match(&text) => {
                            trace!(rule = %rule.name, "text rule matched");
                            return Some(rule.clone());
                        }
                        Ok(_) => {}
                        Err(e) => {
                            // A non-regex pattern on a non-text rule is
                            // normal when probing undeclared frames.
                            trace!(rule = %rule.name, error = %e, "pattern not usable as regex");
                        }
                    }
                }
                None
            }
            Some(format) => rules.iter().find(|r| r.format == format).cloned(),
        }
    }

    /// Add a rule; duplicate names are rejected.
    pub fn add_rule(&self, rule: Rule) -> Result<(), ConfigError> {
        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        if guard.iter().any(|r| r.name == rule.name) {
            return Err(ConfigError::DuplicateRule(rule.name));
        }
        let mut rules = guard.as_ref().clone();
        debug!(rule = %rule.name, priority = rule.priority, "adding rule");
        rules.push(rule);
        *guard = Arc::new(sorted(rules));
        Ok(())
    }

    /// Replace the rule with the same name.
    pub fn update_rule(&self, rule: Rule) -> Result<(), ConfigError> {
        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        let mut rules = guard.as_ref().clone();
        let Some(slot) = rules.iter_mut().find(|r| r.name == rule.name) else {
            return Err(ConfigError::RuleNotFound(rule.name));
        };
        debug!(rule = %rule.name, "updating rule");
        *slot = rule;
        *guard = Arc::new(sorted(rules));
        Ok(())
    }

    /// Remove a rule by name; returns whether anything was removed.
    pub fn remove_rule(&self, name: &str) -> bool {
        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        let mut rules = guard.as_ref().clone();
        let before = rules.len();
        rules.retain(|r| r.name != name);
        let removed = rules.len() != before;
        if removed {
            debug!(rule = %name, "removed rule");
            *guard = Arc::new(sorted(rules));
        }
        removed
    }

    /// Atomically replace the entire rule set.
    pub fn reload(&self, rules: Vec<Rule>) {
        let mut guard = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
        debug!(count = rules.len(), "reloading rule set");
        *guard = Arc::new(sorted(rules));
    }

    /// Structural errors across the whole rule set. Idempotent: calling it
    /// twice without mutation yields identical lists.
    pub fn validate_all(&self) -> Vec<RuleValidationError> {
        let rules = self.snapshot();
        let mut errors = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for rule in rules.iter() {
            if !seen.insert(rule.name.as_str()) {
                errors.push(RuleValidationError::DuplicateName(rule.name.clone()));
            }
            if rule.pattern.trim().is_empty() {
                errors.push(RuleValidationError::EmptyPattern(rule.name.clone()));
            }
            if rule.fields.len() != rule.types.len() {
                errors.push(RuleValidationError::FieldTypeCountMismatch {
                    name: rule.name.clone(),
                    fields: rule.fields.len(),
                    types: rule.types.len(),
                });
            }
            if rule.format == FrameFormat::Text {
                if let Err(e) = self.cache.get_or_compile(&rule.pattern) {
                    errors.push(RuleValidationError::InvalidRegex {
                        name: rule.name.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }
        errors
    }
}

fn sorted(mut rules: Vec<Rule>) -> Vec<Rule> {
    // Stable: equal priorities keep configuration order.
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));
    rules
}
