//! Per-format rewrite tables for the direct-markup targets.
//!
//! Each table follows the same three-band order: structural commands first
//! (fractions, roots, powers, subscripts), then symbol names (Greek
//! letters, big operators, relations), then the shared cleanup band. The
//! tables define output parity with the original product; widening a table
//! is safe, reordering one is not.

use super::rules::{LazyRuleSet, RuleSet, CLEANUP_RULES};
use once_cell::sync::Lazy;

fn table(structural_and_symbols: &[(&str, &'static str)]) -> RuleSet {
    let mut pairs: Vec<(&str, &'static str)> = structural_and_symbols.to_vec();
    pairs.extend_from_slice(CLEANUP_RULES);
    RuleSet::new(&pairs)
}

// ── AsciiMath ────────────────────────────────────────────────────────────

static ASCIIMATH: LazyRuleSet = Lazy::new(|| {
    table(&[
        (r"\\frac\{([^}]+)\}\{([^}]+)\}", "(${1})/(${2})"),
        (r"\\sqrt\{([^}]+)\}", "sqrt(${1})"),
        (r"\\sqrt\[([^\]]+)\]\{([^}]+)\}", "root(${1})(${2})"),
        (r"\^\{([^}]+)\}", "^(${1})"),
        (r"_\{([^}]+)\}", "_(${1})"),
        (r"\\alpha", "alpha"),
        (r"\\beta", "beta"),
        (r"\\gamma", "gamma"),
        (r"\\delta", "delta"),
        (r"\\theta", "theta"),
        (r"\\pi", "pi"),
        (r"\\sigma", "sigma"),
        (r"\\omega", "omega"),
        (r"\\infty", "oo"),
        (r"\\sum", "sum"),
        (r"\\prod", "prod"),
        (r"\\int", "int"),
        (r"\\pm", "+-"),
        (r"\\times", "xx"),
        (r"\\div", "-:"),
        (r"\\cdot", "*"),
        (r"\\leq", "<="),
        (r"\\geq", ">="),
        (r"\\neq", "!="),
        (r"\\approx", "~~"),
        (r"\\rightarrow", "->"),
        (r"\\leftarrow", "<-"),
        (r"\\Rightarrow", "=>"),
    ])
});

/// Render the expression as AsciiMath.
pub fn to_asciimath(latex: &str) -> String {
    ASCIIMATH.apply(latex)
}

// ── SymPy ────────────────────────────────────────────────────────────────

static SYMPY: LazyRuleSet = Lazy::new(|| {
    table(&[
        (r"\\frac\{([^}]+)\}\{([^}]+)\}", "Rational(${1}, ${2})"),
        (r"\\sqrt\{([^}]+)\}", "sqrt(${1})"),
        (r"\\sqrt\[([^\]]+)\]\{([^}]+)\}", "root(${2}, ${1})"),
        (r"\^\{([^}]+)\}", "**(${1})"),
        (r"_\{([^}]+)\}", "_${1}"),
        (r"\\alpha", "alpha"),
        (r"\\beta", "beta"),
        (r"\\gamma", "gamma"),
        (r"\\delta", "delta"),
        (r"\\theta", "theta"),
        (r"\\pi", "pi"),
        (r"\\sigma", "sigma"),
        (r"\\omega", "omega"),
        (r"\\infty", "oo"),
        (r"\\sum", "Sum"),
        (r"\\prod", "Product"),
        (r"\\int", "Integral"),
        (r"\\sin", "sin"),
        (r"\\cos", "cos"),
        (r"\\tan", "tan"),
        (r"\\log", "log"),
        (r"\\ln", "ln"),
        (r"\\exp", "exp"),
        (r"\\times", "*"),
        (r"\\cdot", "*"),
    ])
});

/// Render the expression as a SymPy script.
pub fn to_sympy(latex: &str) -> String {
    format!("from sympy import *\n\nexpr = {}", SYMPY.apply(latex))
}

// ── Wolfram ──────────────────────────────────────────────────────────────

static WOLFRAM: LazyRuleSet = Lazy::new(|| {
    table(&[
        (r"\\frac\{([^}]+)\}\{([^}]+)\}", "(${1})/(${2})"),
        (r"\\sqrt\{([^}]+)\}", "Sqrt[${1}]"),
        (r"\\sqrt\[([^\]]+)\]\{([^}]+)\}", "Power[${2}, 1/${1}]"),
        (r"\^\{([^}]+)\}", "^(${1})"),
        (r"_\{([^}]+)\}", "Subscript[#, ${1}]&"),
        (r"\\alpha", r"\[Alpha]"),
        (r"\\beta", r"\[Beta]"),
        (r"\\gamma", r"\[Gamma]"),
        (r"\\delta", r"\[Delta]"),
        (r"\\theta", r"\[Theta]"),
        (r"\\pi", "Pi"),
        (r"\\sigma", r"\[Sigma]"),
        (r"\\omega", r"\[Omega]"),
        (r"\\infty", "Infinity"),
        (r"\\sum", "Sum"),
        (r"\\prod", "Product"),
        (r"\\int", "Integrate"),
        (r"\\sin", "Sin"),
        (r"\\cos", "Cos"),
        (r"\\tan", "Tan"),
        (r"\\log", "Log"),
        (r"\\ln", "Log"),
        (r"\\exp", "Exp"),
        (r"\\times", "*"),
        (r"\\cdot", "*"),
    ])
});

/// Render the expression in Wolfram Language.
pub fn to_wolfram(latex: &str) -> String {
    WOLFRAM.apply(latex)
}

// ── Maple ────────────────────────────────────────────────────────────────

static MAPLE: LazyRuleSet = Lazy::new(|| {
    table(&[
        (r"\\frac\{([^}]+)\}\{([^}]+)\}", "(${1})/(${2})"),
        (r"\\sqrt\{([^}]+)\}", "sqrt(${1})"),
        (r"\\sqrt\[([^\]]+)\]\{([^}]+)\}", "root[${1}](${2})"),
        (r"\^\{([^}]+)\}", "^(${1})"),
        (r"_\{([^}]+)\}", "__${1}"),
        (r"\\alpha", "alpha"),
        (r"\\beta", "beta"),
        (r"\\gamma", "gamma"),
        (r"\\delta", "delta"),
        (r"\\theta", "theta"),
        (r"\\pi", "Pi"),
        (r"\\sigma", "sigma"),
        (r"\\omega", "omega"),
        (r"\\infty", "infinity"),
        (r"\\sum", "sum"),
        (r"\\prod", "product"),
        (r"\\int", "int"),
        (r"\\sin", "sin"),
        (r"\\cos", "cos"),
        (r"\\tan", "tan"),
        (r"\\log", "log"),
        (r"\\ln", "ln"),
        (r"\\exp", "exp"),
        (r"\\times", "*"),
        (r"\\cdot", "*"),
    ])
});

/// Render the expression in Maple syntax.
pub fn to_maple(latex: &str) -> String {
    MAPLE.apply(latex)
}

// ── Typst ────────────────────────────────────────────────────────────────

static TYPST: LazyRuleSet = Lazy::new(|| {
    table(&[
        (r"\\frac\{([^}]+)\}\{([^}]+)\}", "(${1}) / (${2})"),
        (r"\\sqrt\{([^}]+)\}", "sqrt(${1})"),
        (r"\^\{([^}]+)\}", "^(${1})"),
        (r"_\{([^}]+)\}", "_(${1})"),
        (r"\\alpha", "α"),
        (r"\\beta", "β"),
        (r"\\gamma", "γ"),
        (r"\\delta", "δ"),
        (r"\\theta", "θ"),
        (r"\\pi", "π"),
        (r"\\sigma", "σ"),
        (r"\\omega", "ω"),
        (r"\\infty", "∞"),
        (r"\\sum", "sum"),
        (r"\\prod", "product"),
        (r"\\int", "integral"),
        (r"\\times", "×"),
        (r"\\cdot", "·"),
    ])
});

/// Render the expression in Typst math syntax.
pub fn to_typst(latex: &str) -> String {
    TYPST.apply(latex)
}

// ── Unicode ──────────────────────────────────────────────────────────────

static UNICODE: LazyRuleSet = Lazy::new(|| {
    table(&[
        // U+2044 FRACTION SLASH between the preserved operands.
        (r"\\frac\{([^}]+)\}\{([^}]+)\}", "(${1})\u{2044}(${2})"),
        (r"\\sqrt\{([^}]+)\}", "√(${1})"),
        (r"\^\{0\}", "⁰"),
        (r"\^\{1\}", "¹"),
        (r"\^\{2\}", "²"),
        (r"\^\{3\}", "³"),
        (r"\^\{4\}", "⁴"),
        (r"\^\{5\}", "⁵"),
        (r"\^\{6\}", "⁶"),
        (r"\^\{7\}", "⁷"),
        (r"\^\{8\}", "⁸"),
        (r"\^\{9\}", "⁹"),
        (r"\^\{n\}", "ⁿ"),
        (r"_\{0\}", "₀"),
        (r"_\{1\}", "₁"),
        (r"_\{2\}", "₂"),
        (r"_\{3\}", "₃"),
        (r"_\{4\}", "₄"),
        (r"_\{5\}", "₅"),
        (r"_\{6\}", "₆"),
        (r"_\{7\}", "₇"),
        (r"_\{8\}", "₈"),
        (r"_\{9\}", "₉"),
        (r"\\alpha", "α"),
        (r"\\beta", "β"),
        (r"\\gamma", "γ"),
        (r"\\delta", "δ"),
        (r"\\epsilon", "ε"),
        (r"\\zeta", "ζ"),
        (r"\\eta", "η"),
        (r"\\theta", "θ"),
        (r"\\iota", "ι"),
        (r"\\kappa", "κ"),
        (r"\\lambda", "λ"),
        (r"\\mu", "μ"),
        (r"\\nu", "ν"),
        (r"\\xi", "ξ"),
        (r"\\pi", "π"),
        (r"\\rho", "ρ"),
        (r"\\sigma", "σ"),
        (r"\\tau", "τ"),
        (r"\\upsilon", "υ"),
        (r"\\phi", "φ"),
        (r"\\chi", "χ"),
        (r"\\psi", "ψ"),
        (r"\\omega", "ω"),
        (r"\\Gamma", "Γ"),
        (r"\\Delta", "Δ"),
        (r"\\Theta", "Θ"),
        (r"\\Lambda", "Λ"),
        (r"\\Xi", "Ξ"),
        (r"\\Pi", "Π"),
        (r"\\Sigma", "Σ"),
        (r"\\Phi", "Φ"),
        (r"\\Psi", "Ψ"),
        (r"\\Omega", "Ω"),
        (r"\\infty", "∞"),
        (r"\\sum", "∑"),
        (r"\\prod", "∏"),
        (r"\\int", "∫"),
        (r"\\pm", "±"),
        (r"\\times", "×"),
        (r"\\div", "÷"),
        (r"\\cdot", "·"),
        (r"\\leq", "≤"),
        (r"\\geq", "≥"),
        (r"\\neq", "≠"),
        (r"\\approx", "≈"),
        (r"\\equiv", "≡"),
        (r"\\rightarrow", "→"),
        (r"\\leftarrow", "←"),
        (r"\\Rightarrow", "⇒"),
        (r"\\Leftarrow", "⇐"),
        (r"\\leftrightarrow", "↔"),
        (r"\\Leftrightarrow", "⇔"),
        (r"\\forall", "∀"),
        (r"\\exists", "∃"),
        (r"\\nabla", "∇"),
        (r"\\partial", "∂"),
        (r"\\in", "∈"),
        (r"\\notin", "∉"),
        (r"\\subseteq", "⊆"),
        (r"\\supseteq", "⊇"),
        (r"\\subset", "⊂"),
        (r"\\supset", "⊃"),
        (r"\\cup", "∪"),
        (r"\\cap", "∩"),
        (r"\\emptyset", "∅"),
    ])
});

/// Render the expression as plain Unicode text.
pub fn to_unicode(latex: &str) -> String {
    UNICODE.apply(latex)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn asciimath_fraction() {
        assert!(to_asciimath(r"\frac{a}{b}").contains("(a)/(b)"));
    }

    #[test]
    fn asciimath_symbols_and_relations() {
        assert_eq!(to_asciimath(r"\alpha \leq \beta"), "alpha <= beta");
        assert_eq!(to_asciimath(r"x \rightarrow \infty"), "x -> oo");
        assert_eq!(to_asciimath(r"\sqrt{x}"), "sqrt(x)");
        assert_eq!(to_asciimath(r"\sqrt[3]{x}"), "root(3)(x)");
    }

    #[test]
    fn asciimath_strips_sizing() {
        assert_eq!(to_asciimath(r"\left( x \right)"), "( x )");
    }

    #[test]
    fn sympy_has_preamble_and_structure() {
        let out = to_sympy(r"\frac{1}{2} + \sqrt{x}");
        assert!(out.starts_with("from sympy import *\n\nexpr = "));
        assert!(out.contains("Rational(1, 2)"));
        assert!(out.contains("sqrt(x)"));
    }

    #[test]
    fn sympy_nth_root_swaps_arguments() {
        assert!(to_sympy(r"\sqrt[3]{x}").contains("root(x, 3)"));
    }

    #[test]
    fn wolfram_brackets_and_names() {
        assert_eq!(to_wolfram(r"\sqrt{x}"), "Sqrt[x]");
        assert_eq!(to_wolfram(r"\sqrt[3]{x}"), "Power[x, 1/3]");
        assert_eq!(to_wolfram(r"\alpha \pi"), r"\[Alpha] Pi");
        assert_eq!(to_wolfram(r"\sin x"), "Sin x");
    }

    #[test]
    fn maple_nth_root() {
        assert_eq!(to_maple(r"\sqrt[5]{y}"), "root[5](y)");
        assert_eq!(to_maple(r"\int f"), "int f");
    }

    #[test]
    fn typst_spacing_in_fraction() {
        assert_eq!(to_typst(r"\frac{a}{b}"), "(a) / (b)");
        assert_eq!(to_typst(r"\pi \cdot r^{2}"), "π · r^(2)");
    }

    #[test]
    fn unicode_super_sub_and_greek() {
        assert_eq!(to_unicode(r"x^{2} + y_{1}"), "x² + y₁");
        assert_eq!(to_unicode(r"\Omega \neq \emptyset"), "Ω ≠ ∅");
        assert_eq!(to_unicode(r"\frac{a}{b}"), "(a)\u{2044}(b)");
    }

    #[test]
    fn unicode_set_relations_ordered_before_subset() {
        // \subseteq must win over the \subset prefix.
        assert_eq!(to_unicode(r"A \subseteq B"), "A ⊆ B");
        assert_eq!(to_unicode(r"A \subset B"), "A ⊂ B");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(to_asciimath(""), "");
        assert_eq!(to_unicode(""), "");
        assert_eq!(to_typst(""), "");
    }
}
