//! Document-format wrapping: Markdown and the XHTML+MathML table.
//!
//! The XHTML skeleton is a byte-level compatibility contract shared between
//! the per-expression `html` rendering and the batch exporter — EPUB
//! toolchains downstream parse it with fixed expectations, so the template
//! lives in exactly one place and is covered by an exact-output test.

use super::xml::flatten;

/// Wrap the expression as display math in a Markdown document.
pub fn to_markdown(latex: &str) -> String {
    format!("$$\n{latex}\n$$")
}

/// One row of the XHTML table: the source image and its flattened MathML.
pub struct XhtmlRow<'a> {
    /// Filename referenced as `images/<filename>` next to the document.
    pub image_filename: &'a str,
    /// MathML markup; flattened to a single line before embedding.
    pub mathml: &'a str,
}

/// Render the fixed XHTML/EPUB-compatible document, one table row per
/// entry, in the given order.
pub fn xhtml_document(title: &str, rows: &[XhtmlRow<'_>]) -> String {
    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(
        "<html xmlns=\"http://www.w3.org/1999/xhtml\" \
         xmlns:epub=\"http://www.idpf.org/2007/ops\" \
         xmlns:m=\"http://www.w3.org/1998/Math/MathML\">\n",
    );
    out.push_str(&format!("<head><title>{title}</title></head>\n"));
    out.push_str("<body epub:type=\"bodymatter chapter\">\n");
    out.push_str("<table border=\"1\"><tbody>\n");
    for row in rows {
        out.push_str(&format!(
            "<tr><td style=\"text-align: right;\"><img src=\"images/{}\" alt=\"\"/></td><td>{}</td></tr>\n",
            row.image_filename,
            flatten(row.mathml),
        ));
    }
    out.push_str("</tbody></table>\n");
    out.push_str("</body>\n</html>\n");
    out
}

/// The per-expression `html` rendering: the shared skeleton with a single
/// row under the conventional `images/expression.png` reference.
pub fn to_html(mathml: &str) -> String {
    xhtml_document(
        "Recognized Expressions",
        &[XhtmlRow {
            image_filename: "expression.png",
            mathml,
        }],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markdown_wraps_display_math() {
        assert_eq!(to_markdown("E = mc^2"), "$$\nE = mc^2\n$$");
    }

    #[test]
    fn xhtml_skeleton_is_byte_stable() {
        let doc = xhtml_document(
            "Recognized Expressions",
            &[XhtmlRow {
                image_filename: "eq-01.png",
                mathml: "<math><mi>x</mi></math>",
            }],
        );
        let expected = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
            <html xmlns=\"http://www.w3.org/1999/xhtml\" \
            xmlns:epub=\"http://www.idpf.org/2007/ops\" \
            xmlns:m=\"http://www.w3.org/1998/Math/MathML\">\n\
            <head><title>Recognized Expressions</title></head>\n\
            <body epub:type=\"bodymatter chapter\">\n\
            <table border=\"1\"><tbody>\n\
            <tr><td style=\"text-align: right;\"><img src=\"images/eq-01.png\" alt=\"\"/></td><td><math><mi>x</mi></math></td></tr>\n\
            </tbody></table>\n\
            </body>\n\
            </html>\n";
        assert_eq!(doc, expected);
    }

    #[test]
    fn xhtml_rows_preserve_order_and_flatten_mathml() {
        let doc = xhtml_document(
            "T",
            &[
                XhtmlRow {
                    image_filename: "a.png",
                    mathml: "<math>\n  <mi>a</mi>\n</math>",
                },
                XhtmlRow {
                    image_filename: "b.png",
                    mathml: "<math><mi>b</mi></math>",
                },
            ],
        );
        let a = doc.find("a.png").unwrap();
        let b = doc.find("b.png").unwrap();
        assert!(a < b);
        assert!(doc.contains("<td><math><mi>a</mi></math></td>"), "mathml not flattened");
    }

    #[test]
    fn empty_queue_still_renders_the_skeleton() {
        let doc = xhtml_document("T", &[]);
        assert!(doc.contains("<table border=\"1\"><tbody>\n</tbody></table>"));
    }
}
