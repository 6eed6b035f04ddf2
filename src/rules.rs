//! # Rule Scopes
//!
//! Free-text layout rules are bucketed by target container name by an
//! external resolver; the core only merges buckets. A bucket keyed by the
//! reserved `"global"` name applies to every target; all other buckets apply
//! to the container they name. Bucket names match case-insensitively.
//!
//! The effective ruleset for a target is always: global entries first, then
//! the target's specific entries, each bucket in its authored order.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Reserved bucket name for rules that apply to every target.
pub const GLOBAL_SCOPE: &str = "global";

/// Scoped rule buckets, as produced by the external rule scope resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleScopes {
    buckets: HashMap<String, Vec<String>>,
}

impl RuleScopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule to a named bucket. Names are normalized to lowercase so
    /// lookups are case-insensitive.
    pub fn push(&mut self, scope: &str, rule: impl Into<String>) {
        self.buckets
            .entry(scope.to_lowercase())
            .or_default()
            .push(rule.into());
    }

    /// Ordered rules of one bucket, if present.
    pub fn bucket(&self, scope: &str) -> Option<&[String]> {
        self.buckets.get(&scope.to_lowercase()).map(Vec::as_slice)
    }

    /// Compose the effective ruleset for a target container name:
    /// global-bucket entries, then the target's specific-bucket entries, in
    /// that fixed order.
    pub fn effective_ruleset(&self, target_name: &str) -> Vec<String> {
        let mut rules = Vec::new();
        if let Some(global) = self.bucket(GLOBAL_SCOPE) {
            rules.extend_from_slice(global);
        }
        let target = target_name.to_lowercase();
        if target != GLOBAL_SCOPE {
            if let Some(specific) = self.buckets.get(&target) {
                rules.extend_from_slice(specific);
            }
        }
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scopes() -> RuleScopes {
        let mut s = RuleScopes::new();
        s.push("global", "keep 8px of breathing room");
        s.push("Banner", "logo goes top-left");
        s.push("banner", "never crop faces");
        s.push("story", "fill the full height");
        s
    }

    #[test]
    fn global_then_specific_in_order() {
        let rules = scopes().effective_ruleset("banner");
        assert_eq!(
            rules,
            [
                "keep 8px of breathing room",
                "logo goes top-left",
                "never crop faces",
            ]
        );
    }

    #[test]
    fn target_lookup_is_case_insensitive() {
        let s = scopes();
        assert_eq!(s.effective_ruleset("BANNER"), s.effective_ruleset("banner"));
    }

    #[test]
    fn unknown_target_gets_global_only() {
        let rules = scopes().effective_ruleset("square");
        assert_eq!(rules, ["keep 8px of breathing room"]);
    }

    #[test]
    fn global_target_does_not_duplicate() {
        let rules = scopes().effective_ruleset("global");
        assert_eq!(rules, ["keep 8px of breathing room"]);
    }

    #[test]
    fn empty_scopes_yield_empty_ruleset() {
        assert!(RuleScopes::new().effective_ruleset("banner").is_empty());
    }
}
