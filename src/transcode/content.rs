//! Content MathML derivation.
//!
//! Derived from the presentation tree by a second pass: operator glyphs map
//! to named content operators, identifier/number nodes become `ci`/`cn`,
//! and fraction/root/power containers become `apply`-wrapped content
//! operators. Everything else passes through in its presentation form.
//!
//! This is a deliberate best-effort approximation, not strict Content
//! MathML — downstream exports depend on this exact shape, so the mapping
//! is preserved as-is rather than upgraded to a semantic converter.

use super::mathml::{fallback_markup, node_markup, parse_expression, MathNode, MATHML_NS};
use super::xml::xml_escape;

/// Render LaTeX to Content MathML, falling back on parse failure.
pub fn render_content(latex: &str) -> String {
    match parse_expression(latex) {
        Ok(tree) => content_markup(&tree),
        Err(_) => fallback_markup(latex),
    }
}

/// Serialize a presentation tree as one `<math>` content element.
pub(crate) fn content_markup(tree: &MathNode) -> String {
    format!(
        "<math xmlns=\"{MATHML_NS}\">{}</math>",
        content_node(tree)
    )
}

/// Operator glyphs with named content equivalents.
fn content_operator(glyph: &str) -> Option<&'static str> {
    Some(match glyph {
        "+" => "<plus/>",
        "-" | "−" => "<minus/>",
        "×" | "*" | "·" | "⋅" => "<times/>",
        "=" => "<eq/>",
        "<" => "<lt/>",
        ">" => "<gt/>",
        "≤" => "<leq/>",
        "≥" => "<geq/>",
        "≠" => "<neq/>",
        _ => return None,
    })
}

fn content_node(node: &MathNode) -> String {
    match node {
        MathNode::Ident(s) => format!("<ci>{}</ci>", xml_escape(s)),
        MathNode::Num(s) => format!("<cn>{}</cn>", xml_escape(s)),
        MathNode::Op(glyph) => match content_operator(glyph) {
            Some(named) => named.to_string(),
            // Unmapped operators keep their presentation form.
            None => node_markup(node),
        },
        MathNode::Frac(num, den) => format!(
            "<apply><divide/>{}{}</apply>",
            content_node(num),
            content_node(den)
        ),
        MathNode::Sqrt(base) => format!("<apply><root/>{}</apply>", content_node(base)),
        MathNode::Root(base, index) => format!(
            "<apply><root/><degree>{}</degree>{}</apply>",
            content_node(index),
            content_node(base)
        ),
        MathNode::Sup(base, exp) => format!(
            "<apply><power/>{}{}</apply>",
            content_node(base),
            content_node(exp)
        ),
        MathNode::Row(children) => children.iter().map(content_node).collect(),
        // Subscripts, tables, fences, text and spacing have no content
        // mapping here; they pass through unchanged.
        other => node_markup(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_becomes_divide_apply() {
        let xml = render_content(r"\frac{a}{b}");
        assert!(
            xml.contains("<apply><divide/><ci>a</ci><ci>b</ci></apply>"),
            "got: {xml}"
        );
    }

    #[test]
    fn power_becomes_power_apply() {
        let xml = render_content("x^{2}");
        assert!(
            xml.contains("<apply><power/><ci>x</ci><cn>2</cn></apply>"),
            "got: {xml}"
        );
    }

    #[test]
    fn nth_root_carries_degree() {
        let xml = render_content(r"\sqrt[3]{x}");
        assert!(
            xml.contains("<apply><root/><degree><cn>3</cn></degree><ci>x</ci></apply>"),
            "got: {xml}"
        );
    }

    #[test]
    fn mapped_operators_are_named() {
        let xml = render_content("a + b = c");
        assert!(xml.contains("<plus/>"));
        assert!(xml.contains("<eq/>"));
    }

    #[test]
    fn relations_map_to_named_operators() {
        let xml = render_content(r"a \leq b \neq c");
        assert!(xml.contains("<leq/>"));
        assert!(xml.contains("<neq/>"));
    }

    #[test]
    fn unmapped_operator_passes_through_as_presentation() {
        let xml = render_content(r"a \pm b");
        assert!(xml.contains("<mo>±</mo>"), "got: {xml}");
    }

    #[test]
    fn subscript_passes_through_as_presentation() {
        let xml = render_content("x_{i}");
        assert!(xml.contains("<msub>"), "got: {xml}");
    }

    #[test]
    fn identifiers_and_numbers() {
        let xml = render_content("3 x");
        assert!(xml.contains("<cn>3</cn>"));
        assert!(xml.contains("<ci>x</ci>"));
    }

    #[test]
    fn unparseable_input_falls_back_to_mtext() {
        let xml = render_content(r"\mystery{q}");
        assert!(xml.contains("<mtext>"));
        assert!(xml.starts_with("<math "));
        assert!(xml.ends_with("</math>"));
    }

    #[test]
    fn greek_identifier_is_ci() {
        let xml = render_content(r"\pi");
        assert!(xml.contains("<ci>π</ci>"));
    }
}
