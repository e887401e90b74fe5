//! Exporters for completed batch results.
//!
//! Three shapes, all driven by the same queue snapshot, all covering
//! completed items only, in queue order:
//!
//! * **Flat text** — `===` item headers with `---` per-format sections,
//!   matching the historical download format byte-for-byte.
//! * **XHTML table** — the fixed EPUB-compatible skeleton from
//!   [`crate::transcode::document`], one row per item, MathML flattened.
//! * **Zip archive** — the XHTML document plus an `images/` directory with
//!   each source image and an `outputs/` tree with per-format files.
//!
//! File writes go through [`write_atomic`] (temp file + rename) so a
//! failed export never leaves a truncated file behind.

use crate::batch::queue::{BatchItem, BatchQueue};
use crate::catalog;
use crate::error::Math2AnyError;
use crate::output::OutputBundle;
use crate::pipeline::input;
use crate::transcode::document::{xhtml_document, XhtmlRow};
use std::collections::HashSet;
use std::io::Write as _;
use std::path::Path;
use tracing::info;

/// Title used in the exported XHTML document.
pub const EXPORT_TITLE: &str = "Recognized Expressions";

/// Completed items with collision-free image names, in queue order.
///
/// Shared by the XHTML and zip exporters so the `images/<name>` references
/// inside the document always match the archive entries.
fn completed_with_names(queue: &BatchQueue) -> Vec<(&BatchItem, &OutputBundle, String)> {
    let mut used = HashSet::new();
    queue
        .completed_items()
        .map(|(item, bundle)| {
            let name = if used.insert(item.name.clone()) {
                item.name.clone()
            } else {
                let unique = format!("{}-{}", item.id, item.name);
                used.insert(unique.clone());
                unique
            };
            (item, bundle, name)
        })
        .collect()
}

/// Render the flat-text export.
pub fn flat_text(queue: &BatchQueue, formats: &[String]) -> String {
    let completed: Vec<_> = queue.completed_items().collect();
    let mut content = String::new();

    for (index, (item, bundle)) in completed.iter().enumerate() {
        content.push_str(&format!("=== {} ===\n\n", item.name));
        for format_id in formats {
            let Some(format) = catalog::format_by_id(format_id) else {
                continue;
            };
            if let Some(output) = bundle.get(format_id) {
                content.push_str(&format!("--- {} ---\n", format.name));
                content.push_str(output);
                content.push_str("\n\n");
            }
        }
        if index < completed.len() - 1 {
            content.push_str(&format!("\n{}\n\n", "=".repeat(50)));
        }
    }

    content
}

/// Render the XHTML+MathML table export.
pub fn xhtml_table(queue: &BatchQueue) -> String {
    let entries = completed_with_names(queue);
    let rows: Vec<XhtmlRow<'_>> = entries
        .iter()
        .map(|(_, bundle, name)| XhtmlRow {
            image_filename: name,
            mathml: bundle.get("mathml").unwrap_or_default(),
        })
        .collect();
    xhtml_document(EXPORT_TITLE, &rows)
}

/// Build the zip archive in memory.
///
/// Layout: `math.xhtml` at the root, each source image under `images/`,
/// and per-format files under `outputs/<image stem>/`.
pub async fn zip_archive(
    queue: &BatchQueue,
    formats: &[String],
    download_timeout_secs: u64,
) -> Result<Vec<u8>, Math2AnyError> {
    let archive_err = |detail: String| Math2AnyError::ArchiveFailed {
        path: "<in memory>".into(),
        detail,
    };

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();

    writer
        .start_file("math.xhtml", options)
        .map_err(|e| archive_err(e.to_string()))?;
    writer
        .write_all(xhtml_table(queue).as_bytes())
        .map_err(|e| archive_err(e.to_string()))?;

    for (item, bundle, image_name) in completed_with_names(queue) {
        let resolved = input::resolve_input(&item.source, download_timeout_secs).await?;
        writer
            .start_file(format!("images/{image_name}"), options)
            .map_err(|e| archive_err(e.to_string()))?;
        writer
            .write_all(&resolved.bytes)
            .map_err(|e| archive_err(e.to_string()))?;

        let stem = image_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(&image_name);
        for format_id in formats {
            let Some(format) = catalog::format_by_id(format_id) else {
                continue;
            };
            let Some(output) = bundle.get(format_id) else {
                continue;
            };
            writer
                .start_file(format!("outputs/{stem}/{}{}", format.id, format.extension), options)
                .map_err(|e| archive_err(e.to_string()))?;
            writer
                .write_all(output.as_bytes())
                .map_err(|e| archive_err(e.to_string()))?;
        }
    }

    let cursor = writer.finish().map_err(|e| archive_err(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Write bytes to `path` atomically (temp file in the same directory,
/// then rename).
pub async fn write_atomic(path: impl AsRef<Path>, bytes: &[u8]) -> Result<(), Math2AnyError> {
    let path = path.as_ref();
    let write_err = |source: std::io::Error| Math2AnyError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }
    }

    let tmp_path = path.with_extension("tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::queue::BatchQueue;
    use crate::output::Expression;
    use crate::transcode::transcode;

    fn queue_with(items: &[(&str, &str)]) -> BatchQueue {
        let mut queue = BatchQueue::new();
        for (source, latex) in items {
            let id = queue.enqueue(*source);
            queue.mark_processing(id);
            queue.mark_completed(id, transcode(&Expression::new(*latex)), 1);
        }
        queue
    }

    #[test]
    fn flat_text_sections_and_separators() {
        let queue = queue_with(&[("a.png", "x + 1"), ("b.png", "y")]);
        let formats = vec!["latex".to_string(), "asciimath".to_string()];
        let text = flat_text(&queue, &formats);

        assert!(text.starts_with("=== a.png ===\n\n"));
        assert!(text.contains("--- LaTeX ---\nx + 1\n\n"));
        assert!(text.contains("--- AsciiMath ---\n"));
        assert!(text.contains(&format!("\n{}\n\n", "=".repeat(50))));
        assert!(text.contains("=== b.png ==="));
        // Separator between items only, not after the last.
        assert_eq!(text.matches(&"=".repeat(50)).count(), 1);
    }

    #[test]
    fn flat_text_skips_incomplete_items() {
        let mut queue = queue_with(&[("a.png", "x")]);
        queue.enqueue("pending.png");
        let text = flat_text(&queue, &["latex".to_string()]);
        assert!(!text.contains("pending.png"));
    }

    #[test]
    fn xhtml_rows_in_queue_order() {
        let queue = queue_with(&[("first.png", "a"), ("second.png", "b")]);
        let doc = xhtml_table(&queue);
        let first = doc.find("images/first.png").unwrap();
        let second = doc.find("images/second.png").unwrap();
        assert!(first < second);
        assert_eq!(doc.matches("<tr>").count(), 2);
    }

    #[test]
    fn xhtml_mathml_cells_are_single_line() {
        let queue = queue_with(&[("a.png", r"\frac{a}{b}")]);
        let doc = xhtml_table(&queue);
        let row = doc.lines().find(|l| l.starts_with("<tr>")).unwrap();
        assert!(row.contains("<mfrac>"));
        assert!(row.ends_with("</td></tr>"));
    }

    #[test]
    fn duplicate_image_names_are_disambiguated() {
        let queue = queue_with(&[("left/eq.png", "a"), ("right/eq.png", "b")]);
        let doc = xhtml_table(&queue);
        assert!(doc.contains("images/eq.png"));
        assert!(doc.contains("-eq.png"), "second row should carry an id prefix: {doc}");
    }

    #[tokio::test]
    async fn zip_contains_document_images_and_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let img = dir.path().join("eq.png");
        std::fs::write(&img, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();

        let queue = queue_with(&[(img.to_str().unwrap(), "x^{2}")]);
        let bytes = zip_archive(&queue, &["latex".to_string(), "typst".to_string()], 5)
            .await
            .unwrap();

        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"math.xhtml".to_string()), "names: {names:?}");
        assert!(names.contains(&"images/eq.png".to_string()));
        assert!(names.contains(&"outputs/eq/latex.tex".to_string()));
        assert!(names.contains(&"outputs/eq/typst.typ".to_string()));
    }

    #[tokio::test]
    async fn write_atomic_creates_parent_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.txt");
        write_atomic(&path, b"hello").await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
        assert!(!path.with_extension("tmp").exists());
    }
}
