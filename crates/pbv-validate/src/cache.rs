//! # Pattern Cache
//!
//! Memoizing compiler for `regex` rules. Patterns are compiled on first use
//! and cached under the exact pattern string, so a schema with thousands of
//! messages sharing one pattern compiles it once.
//!
//! ## Matching Semantics
//!
//! Rules describe a full-string match. A pattern is first compiled on its
//! own to decide whether it is valid, then as `\A(?:<pattern>)\z`, so
//! [`Regex::is_match`] on a cached entry only succeeds when the whole input
//! matches.
//!
//! ## Thread Safety
//!
//! `PatternCache` is `Send + Sync` and needs no caller-side locking.
//! Compilation happens outside the lock; two threads missing on the same
//! pattern may both compile it and the later insert wins. Both results are
//! equivalent, so the race is unobservable apart from the wasted work.
//! A [`PatternCache::reset`] racing with lookups only causes recompilation.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use regex::Regex;
use thiserror::Error;

/// A `regex` rule that does not compile.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid pattern {pattern:?}: {reason}")]
pub struct PatternError {
    /// The pattern as written in the rule.
    pub pattern: String,
    /// Compiler diagnostic.
    pub reason: String,
}

/// Thread-safe cache of compiled, fully-anchored patterns.
#[derive(Debug, Default)]
pub struct PatternCache {
    entries: RwLock<HashMap<String, Arc<Regex>>>,
}

impl PatternCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled form of `pattern`, compiling and caching it on first use.
    ///
    /// Compile failures are not cached; a bad pattern is recompiled (and
    /// fails again) on every call.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] if `pattern` is not a valid regex.
    pub fn get(&self, pattern: &str) -> Result<Arc<Regex>, PatternError> {
        if let Some(hit) = self.entries.read().get(pattern) {
            return Ok(Arc::clone(hit));
        }

        tracing::debug!(pattern, "compiling rule pattern");
        let compiled = Arc::new(compile_anchored(pattern)?);
        self.entries
            .write()
            .insert(pattern.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Drop every cached pattern.
    pub fn reset(&self) {
        let mut entries = self.entries.write();
        tracing::debug!(evicted = entries.len(), "resetting pattern cache");
        entries.clear();
    }

    /// Number of cached patterns.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Compile `pattern` for full-string matching.
///
/// Validity is decided on the bare pattern, so anchoring can neither make
/// a broken pattern compile nor break a valid one.
fn compile_anchored(pattern: &str) -> Result<Regex, PatternError> {
    Regex::new(pattern).map_err(|e| pattern_error(pattern, e))?;
    match Regex::new(&format!(r"\A(?:{pattern})\z")) {
        Ok(re) => Ok(re),
        // A trailing `(?x)` comment swallowed the closing group; end it
        // with a newline, which verbose mode ignores.
        Err(_) => Regex::new(&format!("\\A(?:{pattern}\n)\\z"))
            .map_err(|e| pattern_error(pattern, e)),
    }
}

fn pattern_error(pattern: &str, e: regex::Error) -> PatternError {
    PatternError {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_compiles_once() {
        let cache = PatternCache::new();
        let a = cache.get("[a-z]+").unwrap();
        let b = cache.get("[a-z]+").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_patterns_match_whole_input() {
        let cache = PatternCache::new();
        let re = cache.get("[a-z]+").unwrap();
        assert!(re.is_match("abc"));
        assert!(!re.is_match("abc1"));
        assert!(!re.is_match("1abc"));
    }

    #[test]
    fn test_alternation_is_anchored_as_a_group() {
        let cache = PatternCache::new();
        let re = cache.get("cat|dog").unwrap();
        assert!(re.is_match("dog"));
        assert!(!re.is_match("hotdog"));
        assert!(!re.is_match("cats"));
    }

    #[test]
    fn test_invalid_pattern_is_not_cached() {
        let cache = PatternCache::new();
        let err = cache.get("(unclosed").unwrap_err();
        assert_eq!(err.pattern, "(unclosed");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unbalanced_pattern_rejected_before_anchoring() {
        let cache = PatternCache::new();
        let err = cache.get("a)|(b").unwrap_err();
        assert_eq!(err.pattern, "a)|(b");
        assert!(cache.is_empty());
    }

    #[test]
    fn test_verbose_trailing_comment_still_anchored() {
        let cache = PatternCache::new();
        let re = cache.get("(?x)[a-z]+ # letters").unwrap();
        assert!(re.is_match("abc"));
        assert!(!re.is_match("abc1"));
        assert!(!re.is_match("1abc"));
    }

    #[test]
    fn test_newline_in_plain_pattern_is_literal() {
        let cache = PatternCache::new();
        let re = cache.get("a\nb").unwrap();
        assert!(re.is_match("a\nb"));
        assert!(!re.is_match("ab"));
    }

    #[test]
    fn test_reset_clears_entries() {
        let cache = PatternCache::new();
        let before = cache.get("x+").unwrap();
        cache.get("y+").unwrap();
        cache.reset();
        assert!(cache.is_empty());
        let after = cache.get("x+").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(before.as_str(), after.as_str());
    }
}
