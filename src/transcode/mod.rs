//! The transcoding engine: one canonical expression in, twelve renderings
//! out.
//!
//! [`transcode`] is a pure function of its input — no I/O, no shared state
//! — and it is total: for any input string (empty, malformed, not LaTeX at
//! all) every catalog format is present in the result and the call never
//! fails. Renderers degrade rather than error: the rule chains pass
//! unmatched spans through unchanged, and the MathML pair falls back to an
//! escaped `<mtext>` wrapper for input the parser rejects.
//!
//! ## Format families
//!
//! * **Direct markup** ([`formats`]) — ordered rewrite rules over the flat
//!   string: AsciiMath, SymPy, Wolfram, Maple, Typst, Unicode.
//! * **MathML** ([`mathml`], [`content`]) — parsed tree rendered as
//!   Presentation MathML, with Content MathML derived in a second pass;
//!   both share the pretty-print + NCR post-process in [`xml`].
//! * **Documents** ([`document`]) — templated wrapping: Markdown display
//!   math, the XHTML/EPUB table, and the LaTeX passthrough.

pub mod content;
pub mod document;
pub mod formats;
pub mod mathml;
pub mod rules;
pub mod xml;

use crate::output::{Expression, OutputBundle};

/// Render the full output bundle for one expression.
///
/// The `latex` entry always equals the input unmodified; the remaining
/// eleven entries are generated from it.
pub fn transcode(expression: &Expression) -> OutputBundle {
    let latex = expression.as_str();

    // Parse once; presentation and content are two views of the same tree.
    let (presentation_line, content_line) = match mathml::parse_expression(latex) {
        Ok(tree) => (
            mathml::presentation_markup(&tree),
            content::content_markup(&tree),
        ),
        Err(e) => {
            tracing::debug!("transcode falling back to mtext for {latex:?}: {}", e.0);
            let fallback = mathml::fallback_markup(latex);
            (fallback.clone(), fallback)
        }
    };

    let presentation = xml::escape_non_ascii(&xml::pretty_print(&presentation_line));
    let content_pretty = xml::escape_non_ascii(&xml::pretty_print(&content_line));

    OutputBundle::from_entries([
        ("latex", latex.to_string()),
        ("mathml", presentation.clone()),
        ("mathml_presentation", presentation.clone()),
        ("mathml_content", content_pretty),
        ("asciimath", formats::to_asciimath(latex)),
        ("sympy", formats::to_sympy(latex)),
        ("wolfram", formats::to_wolfram(latex)),
        ("maple", formats::to_maple(latex)),
        ("markdown", document::to_markdown(latex)),
        ("html", document::to_html(&presentation)),
        ("typst", formats::to_typst(latex)),
        ("unicode", formats::to_unicode(latex)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FORMATS;

    #[test]
    fn every_catalog_format_is_present() {
        let bundle = transcode(&Expression::new(r"\frac{a}{b}"));
        assert!(bundle.is_complete());
        for f in FORMATS {
            assert!(bundle.get(f.id).is_some(), "missing {}", f.id);
        }
    }

    #[test]
    fn latex_entry_is_the_input_unchanged() {
        for input in [r"\frac{a}{b}", "", "not math at all", r"\broken{", "x \\\\ y"] {
            let bundle = transcode(&Expression::new(input));
            assert_eq!(bundle.get("latex"), Some(input));
        }
    }

    #[test]
    fn fraction_fixture() {
        let bundle = transcode(&Expression::new(r"\frac{a}{b}"));
        assert!(bundle.get("asciimath").unwrap().contains("(a)/(b)"));
    }

    #[test]
    fn total_on_arbitrary_input() {
        for input in ["", "{{{", r"\undefined\commands", "∀x∈ℝ", "a&b", "\\"] {
            let bundle = transcode(&Expression::new(input));
            assert!(bundle.is_complete(), "incomplete bundle for {input:?}");
        }
    }

    #[test]
    fn mathml_is_one_balanced_element() {
        for input in [r"\frac{a}{b}", r"\nonsense{x}", ""] {
            let bundle = transcode(&Expression::new(input));
            let mathml = bundle.get("mathml").unwrap();
            assert!(mathml.starts_with("<math "), "got: {mathml}");
            assert!(mathml.trim_end().ends_with("</math>"), "got: {mathml}");
        }
    }

    #[test]
    fn malformed_input_uses_mtext_fallback() {
        let bundle = transcode(&Expression::new(r"\frac{a}{"));
        assert!(bundle.get("mathml").unwrap().contains("<mtext>"));
        assert!(bundle.get("mathml_content").unwrap().contains("<mtext>"));
    }

    #[test]
    fn mathml_outputs_are_ascii_safe() {
        let bundle = transcode(&Expression::new(r"\alpha + \beta \leq \pi"));
        assert!(bundle.get("mathml").unwrap().is_ascii());
        assert!(bundle.get("mathml_content").unwrap().is_ascii());
        assert!(bundle.get("mathml").unwrap().contains("&#x3B1;"));
    }

    #[test]
    fn presentation_and_alias_are_identical() {
        let bundle = transcode(&Expression::new("x^{2}"));
        assert_eq!(bundle.get("mathml"), bundle.get("mathml_presentation"));
    }

    #[test]
    fn html_embeds_flattened_mathml() {
        let bundle = transcode(&Expression::new("x"));
        let html = bundle.get("html").unwrap();
        assert!(html.starts_with("<?xml version=\"1.0\""));
        assert!(html.contains("images/expression.png"));
        // The embedded MathML cell must be single-line.
        let cell = html
            .lines()
            .find(|l| l.starts_with("<tr>"))
            .expect("table row present");
        assert!(cell.contains("<math "));
        assert!(cell.ends_with("</td></tr>"));
    }

    #[test]
    fn markdown_wraps_input() {
        let bundle = transcode(&Expression::new("E = mc^2"));
        assert_eq!(bundle.get("markdown"), Some("$$\nE = mc^2\n$$"));
    }
}
