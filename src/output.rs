//! Output types: the canonical expression, the per-expression format
//! bundle, and the end-of-run report.

use crate::catalog::{self, FORMATS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One recognized mathematical expression in canonical LaTeX.
///
/// Produced once per successful gateway call and never mutated afterwards;
/// every generated format is a function of this string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Expression(String);

impl Expression {
    pub fn new(latex: impl Into<String>) -> Self {
        Self(latex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Expression {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The complete set of generated renderings for one [`Expression`].
///
/// Keys are always the full 12-entry catalog; the `latex` entry always
/// equals the source expression unmodified. A `BTreeMap` keeps iteration
/// order stable for exports and serialized history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputBundle {
    outputs: BTreeMap<String, String>,
}

impl OutputBundle {
    /// Build a bundle from (format id, rendering) pairs.
    ///
    /// Intended for the transcoding engine: ids outside the catalog are a
    /// programming error and panic in debug builds only.
    pub(crate) fn from_entries(entries: impl IntoIterator<Item = (&'static str, String)>) -> Self {
        let mut outputs = BTreeMap::new();
        for (id, rendered) in entries {
            debug_assert!(catalog::is_known_format(id), "unknown format id {id}");
            outputs.insert(id.to_string(), rendered);
        }
        Self { outputs }
    }

    /// The rendering for a format id, if present.
    pub fn get(&self, format_id: &str) -> Option<&str> {
        self.outputs.get(format_id).map(String::as_str)
    }

    /// The canonical LaTeX source.
    pub fn latex(&self) -> &str {
        self.get("latex").unwrap_or_default()
    }

    /// Iterate (format id, rendering) in stable key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outputs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    /// True when every catalog format is present.
    pub fn is_complete(&self) -> bool {
        FORMATS.iter().all(|f| self.outputs.contains_key(f.id))
    }
}

/// Summary statistics for one completed batch run.
///
/// All counts are derived from the queue at the moment the run returns;
/// the orchestrator maintains no counters of its own.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchRunReport {
    /// Items in the queue when the run ended.
    pub total: usize,
    /// Items in `Completed` state (including ones completed by earlier runs).
    pub completed: usize,
    /// Items in `Failed` state.
    pub failed: usize,
    /// Items never attempted (still `Pending`, e.g. after cancellation).
    pub pending: usize,
    /// True when the run ended because cancellation was observed.
    pub cancelled: bool,
    /// Wall-clock duration of the run.
    pub duration_ms: u64,
}
