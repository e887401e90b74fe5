//! The static catalog of output formats.
//!
//! Every rendered bundle is keyed by the `id` fields below. The catalog is
//! deliberately a compile-time constant: downstream consumers (history
//! stores, exporters, UI tabs) rely on the key set being closed and stable,
//! so adding a format is an API change here, never a runtime discovery.

use serde::{Deserialize, Serialize};

/// Broad grouping used by exporters and UI grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatCategory {
    /// Math markup languages (LaTeX, MathML, AsciiMath, Typst).
    Markup,
    /// Document containers (Markdown, HTML).
    Document,
    /// Computer-algebra input languages (SymPy, Wolfram, Maple).
    Code,
    /// Plain renderings (Unicode).
    Text,
}

/// Descriptor for one output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    /// Stable identifier, used as the bundle key and CLI flag value.
    pub id: &'static str,
    /// Human-readable name shown in exports.
    pub name: &'static str,
    /// File extension (with dot) used when writing per-format files.
    pub extension: &'static str,
    pub category: FormatCategory,
}

/// All known formats, in canonical display order.
pub const FORMATS: &[OutputFormat] = &[
    OutputFormat { id: "latex", name: "LaTeX", extension: ".tex", category: FormatCategory::Markup },
    OutputFormat { id: "mathml", name: "MathML", extension: ".mml", category: FormatCategory::Markup },
    OutputFormat { id: "mathml_presentation", name: "MathML (Presentation)", extension: ".mml", category: FormatCategory::Markup },
    OutputFormat { id: "mathml_content", name: "MathML (Content)", extension: ".mml", category: FormatCategory::Markup },
    OutputFormat { id: "asciimath", name: "AsciiMath", extension: ".txt", category: FormatCategory::Markup },
    OutputFormat { id: "sympy", name: "SymPy (Python)", extension: ".py", category: FormatCategory::Code },
    OutputFormat { id: "wolfram", name: "Wolfram", extension: ".wl", category: FormatCategory::Code },
    OutputFormat { id: "maple", name: "Maple", extension: ".mpl", category: FormatCategory::Code },
    OutputFormat { id: "markdown", name: "Markdown", extension: ".md", category: FormatCategory::Document },
    OutputFormat { id: "html", name: "HTML", extension: ".html", category: FormatCategory::Document },
    OutputFormat { id: "typst", name: "Typst", extension: ".typ", category: FormatCategory::Markup },
    OutputFormat { id: "unicode", name: "Unicode", extension: ".txt", category: FormatCategory::Text },
];

/// Look up a format descriptor by id.
pub fn format_by_id(id: &str) -> Option<&'static OutputFormat> {
    FORMATS.iter().find(|f| f.id == id)
}

/// True when `id` names a catalog format.
pub fn is_known_format(id: &str) -> bool {
    format_by_id(id).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_twelve_formats() {
        assert_eq!(FORMATS.len(), 12);
    }

    #[test]
    fn ids_are_unique() {
        for (i, f) in FORMATS.iter().enumerate() {
            assert!(
                !FORMATS[i + 1..].iter().any(|g| g.id == f.id),
                "duplicate id {}",
                f.id
            );
        }
    }

    #[test]
    fn lookup_known_and_unknown() {
        assert_eq!(format_by_id("latex").unwrap().extension, ".tex");
        assert_eq!(format_by_id("sympy").unwrap().category, FormatCategory::Code);
        assert!(format_by_id("pdf").is_none());
        assert!(is_known_format("mathml_content"));
        assert!(!is_known_format("MATHML"));
    }
}
