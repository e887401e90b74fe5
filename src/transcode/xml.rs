//! Shared XML post-processing for the MathML variants.
//!
//! The renderers emit single-line markup; exports want either an indented
//! human-readable form (pretty printing) or a strictly single-line form for
//! embedding in table cells (flattening). ASCII-safety is a separate pass:
//! every non-ASCII character becomes a numeric character reference so the
//! output survives any downstream encoding, MathML glyphs included.

use once_cell::sync::Lazy;
use regex::Regex;

/// Escape XML-special characters in text content.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            other => out.push(other),
        }
    }
    out
}

/// Replace every non-ASCII character with a hex numeric character reference.
///
/// Applied after pretty printing; the result round-trips through any
/// encoding because only ASCII bytes remain.
pub fn escape_non_ascii(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            out.push_str(&format!("&#x{:X};", c as u32));
        }
    }
    out
}

static RE_NEWLINE_INDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\r?\n[ \t]*").unwrap());
static RE_SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Collapse markup to a single line: newlines (with their indentation) are
/// removed and runs of two or more spaces become one.
pub fn flatten(xml: &str) -> String {
    let s = RE_NEWLINE_INDENT.replace_all(xml, "");
    RE_SPACE_RUNS.replace_all(&s, " ").into_owned()
}

// ── Pretty printer ───────────────────────────────────────────────────────

enum XmlToken<'a> {
    Open(&'a str),
    Close(&'a str),
    SelfClose(&'a str),
    Text(&'a str),
}

fn tokenize(xml: &str) -> Vec<XmlToken<'_>> {
    let mut tokens = Vec::new();
    let mut rest = xml;
    while !rest.is_empty() {
        if let Some(start) = rest.find('<') {
            if start > 0 {
                tokens.push(XmlToken::Text(&rest[..start]));
            }
            let after = &rest[start..];
            match after.find('>') {
                Some(end) => {
                    let tag = &after[..=end];
                    if tag.starts_with("</") {
                        tokens.push(XmlToken::Close(tag));
                    } else if tag.ends_with("/>") || tag.starts_with("<?") || tag.starts_with("<!")
                    {
                        tokens.push(XmlToken::SelfClose(tag));
                    } else {
                        tokens.push(XmlToken::Open(tag));
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    // Malformed tail; emit as text rather than losing it.
                    tokens.push(XmlToken::Text(after));
                    break;
                }
            }
        } else {
            tokens.push(XmlToken::Text(rest));
            break;
        }
    }
    tokens
}

fn push_line(out: &mut String, depth: usize, content: &str) {
    if !out.is_empty() {
        out.push('\n');
    }
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(content);
}

/// Reformat one-line XML into indented form without disturbing nesting.
///
/// Elements whose entire content is one text node stay on a single line
/// (`<mi>x</mi>`), everything else gets one tag per line with two-space
/// indentation. Already-pretty input is normalised to the same shape, so
/// the function is idempotent.
pub fn pretty_print(xml: &str) -> String {
    let tokens = tokenize(xml);
    let mut out = String::with_capacity(xml.len() * 2);
    let mut depth = 0usize;
    let mut i = 0;

    while i < tokens.len() {
        match &tokens[i] {
            XmlToken::Open(tag) => {
                // Inline a pure-text element: <tag>text</tag>
                if let (Some(XmlToken::Text(text)), Some(XmlToken::Close(close))) =
                    (tokens.get(i + 1), tokens.get(i + 2))
                {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        push_line(&mut out, depth, &format!("{tag}{trimmed}{close}"));
                        i += 3;
                        continue;
                    }
                }
                push_line(&mut out, depth, tag);
                depth += 1;
                i += 1;
            }
            XmlToken::Close(tag) => {
                depth = depth.saturating_sub(1);
                push_line(&mut out, depth, tag);
                i += 1;
            }
            XmlToken::SelfClose(tag) => {
                push_line(&mut out, depth, tag);
                i += 1;
            }
            XmlToken::Text(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    push_line(&mut out, depth, trimmed);
                }
                i += 1;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_basics() {
        assert_eq!(xml_escape("a < b & c > \"d\""), "a &lt; b &amp; c &gt; &quot;d&quot;");
        assert_eq!(xml_escape("plain"), "plain");
    }

    #[test]
    fn non_ascii_becomes_ncr() {
        assert_eq!(escape_non_ascii("α"), "&#x3B1;");
        assert_eq!(escape_non_ascii("x ≤ ∞"), "x &#x2264; &#x221E;");
        assert!(escape_non_ascii("π r²").is_ascii());
        assert_eq!(escape_non_ascii("ascii only"), "ascii only");
    }

    #[test]
    fn pretty_print_indents_nesting() {
        let xml = "<math><mfrac><mi>a</mi><mi>b</mi></mfrac></math>";
        let pretty = pretty_print(xml);
        assert_eq!(
            pretty,
            "<math>\n  <mfrac>\n    <mi>a</mi>\n    <mi>b</mi>\n  </mfrac>\n</math>"
        );
    }

    #[test]
    fn pretty_print_keeps_self_closing_tags() {
        let xml = "<mrow><mspace width=\"1em\"/></mrow>";
        let pretty = pretty_print(xml);
        assert_eq!(pretty, "<mrow>\n  <mspace width=\"1em\"/>\n</mrow>");
    }

    #[test]
    fn pretty_print_is_idempotent() {
        let xml = "<math><mrow><mi>x</mi><mo>+</mo><mn>1</mn></mrow></math>";
        let once = pretty_print(xml);
        let twice = pretty_print(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn flatten_collapses_newlines_and_space_runs() {
        let pretty = "<math>\n  <mrow>\n    <mi>x</mi>\n  </mrow>\n</math>";
        assert_eq!(flatten(pretty), "<math><mrow><mi>x</mi></mrow></math>");
        assert_eq!(flatten("a    b"), "a b");
    }

    #[test]
    fn flatten_then_pretty_round_trip() {
        let xml = "<math><msqrt><mi>x</mi></msqrt></math>";
        let pretty = pretty_print(xml);
        assert_eq!(flatten(&pretty), xml);
    }
}
