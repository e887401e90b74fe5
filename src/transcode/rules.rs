//! The ordered text-rewrite engine behind the direct-markup formats.
//!
//! Each target format is defined by a flat list of (pattern → replacement)
//! rules applied once, left-to-right, over the whole string. Rule order is
//! load-bearing: structural commands (fractions, roots, powers, subscripts)
//! must be rewritten before symbol-name substitutions (Greek letters,
//! operators, relations), which must precede cleanup (stripping residual
//! grouping and sizing commands). A pattern that matches nothing is a no-op
//! and unmatched spans pass through unchanged, so applying a rule set can
//! never fail.

use once_cell::sync::Lazy;
use regex::Regex;

/// One compiled rewrite rule.
pub struct RewriteRule {
    pattern: Regex,
    replacement: &'static str,
}

impl RewriteRule {
    /// Compile a rule. Patterns are compile-time constants; a malformed
    /// pattern is a programming error surfaced on first use of the table.
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).unwrap(),
            replacement,
        }
    }
}

/// An ordered list of rewrite rules for one target format.
pub struct RuleSet {
    rules: Vec<RewriteRule>,
}

impl RuleSet {
    pub fn new(pairs: &[(&str, &'static str)]) -> Self {
        Self {
            rules: pairs
                .iter()
                .map(|(p, r)| RewriteRule::new(p, r))
                .collect(),
        }
    }

    /// Apply every rule once, in order, over the whole string.
    pub fn apply(&self, input: &str) -> String {
        let mut out = input.to_string();
        for rule in &self.rules {
            out = rule.pattern.replace_all(&out, rule.replacement).into_owned();
        }
        out
    }
}

/// Shared cleanup tail: strip `\left`/`\right` sizing commands and escaped
/// brace literals. Every direct-markup table ends with these.
pub const CLEANUP_RULES: &[(&str, &'static str)] = &[
    (r"\\left", ""),
    (r"\\right", ""),
    (r"\\[{}]", ""),
];

/// A lazily-compiled rule set, the standard way tables are declared.
pub type LazyRuleSet = Lazy<RuleSet>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_apply_in_declared_order() {
        // First rule rewrites the structure; second renames the symbol the
        // structure exposed. Reversed order would leave `\alpha` untouched
        // inside the braces.
        let set = RuleSet::new(&[
            (r"\\boxed\{([^}]+)\}", "[${1}]"),
            (r"\\alpha", "alpha"),
        ]);
        assert_eq!(set.apply(r"\boxed{\alpha}"), "[alpha]");
    }

    #[test]
    fn unmatched_spans_pass_through() {
        let set = RuleSet::new(&[(r"\\pi", "pi")]);
        assert_eq!(set.apply("totally unrelated"), "totally unrelated");
        assert_eq!(set.apply(""), "");
    }

    #[test]
    fn cleanup_strips_sizing_and_escaped_braces() {
        let set = RuleSet::new(CLEANUP_RULES);
        assert_eq!(set.apply(r"\left( x \right)"), "( x )");
        assert_eq!(set.apply(r"\{ a, b \}"), " a, b ");
    }
}
