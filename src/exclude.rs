//! Exclusion rules for tree walks and copies.
//!
//! A rule is either a plain string fragment or a regular expression. A path
//! is excluded when any rule's fragment occurs somewhere in the normalized
//! relative path, or when the pattern matches (unanchored) anywhere in it.
//!
//! Rules are partitioned by whether they contain a `/`: separator-free rules
//! can be applied while walking (they never need more than the entry's own
//! relative path), while path-shaped rules like `a/b` are only meaningful
//! once the full relative path is known and are applied as a second pass.

use anyhow::{Context, Result};
use regex::Regex;

/// A single exclusion rule.
#[derive(Debug, Clone)]
pub enum ExcludeRule {
    /// Excludes any path containing this fragment.
    Fragment(String),
    /// Excludes any path the expression matches, unanchored.
    Pattern(Regex),
}

impl ExcludeRule {
    /// Create a substring rule.
    pub fn fragment(fragment: impl Into<String>) -> Self {
        ExcludeRule::Fragment(fragment.into())
    }

    /// Compile a pattern rule.
    pub fn pattern(pattern: &str) -> Result<Self> {
        let regex = Regex::new(pattern)
            .with_context(|| format!("compiling exclude pattern '{}'", pattern))?;
        Ok(ExcludeRule::Pattern(regex))
    }

    /// Whether this rule excludes `rel_path` (a forward-slash normalized
    /// path relative to the tree root).
    pub fn matches(&self, rel_path: &str) -> bool {
        match self {
            ExcludeRule::Fragment(fragment) => rel_path.contains(fragment.as_str()),
            ExcludeRule::Pattern(regex) => regex.is_match(rel_path),
        }
    }

    /// Rules whose text contains a separator can only be tested against the
    /// full relative path, not individual name components.
    pub fn is_path_shaped(&self) -> bool {
        match self {
            ExcludeRule::Fragment(fragment) => fragment.contains('/'),
            ExcludeRule::Pattern(regex) => regex.as_str().contains('/'),
        }
    }
}

/// Split rules into (simple, path-shaped).
pub fn partition(rules: &[ExcludeRule]) -> (Vec<&ExcludeRule>, Vec<&ExcludeRule>) {
    rules.iter().partition(|rule| !rule.is_path_shaped())
}

/// Whether any rule in `rules` excludes `rel_path`.
pub fn excluded(rules: &[&ExcludeRule], rel_path: &str) -> bool {
    rules.iter().any(|rule| rule.matches(rel_path))
}
