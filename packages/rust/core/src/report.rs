//! Report rendering.
//!
//! [`render`] turns a [`Grouping`] into a [`RenderedReport`]: one section per
//! environment, one row per (application, cluster), versions joined with
//! `", "`. Versions are ordered by plain string comparison, so `v10` sorts
//! before `v2`.
//!
//! Rendering is pure. The same grouping always produces byte-identical
//! Markdown, which is what keeps repeated merges from changing the document.

use serde::Serialize;
use syncreport_markdown::{escape_inline, heading, heading_rank, table};
use syncreport_shared::{Result, SyncReportError};

use crate::grouping::Grouping;

/// Fixed table columns.
pub const COLUMNS: [&str; 3] = ["Application", "Cluster", "Versions"];

/// Separator between versions in one cell.
pub const VERSION_SEPARATOR: &str = ", ";

/// Shown instead of tables when nothing was reported.
pub const EMPTY_NOTICE: &str = "_No applications reported._";

/// Heading used for the whole-document overwrite mode.
pub const OVERWRITE_TITLE: &str = "# Application Versions";

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Ordered report, ready to serialize.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedReport {
    pub sections: Vec<EnvironmentSection>,
}

/// All rows of one environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnvironmentSection {
    pub environment: String,
    pub rows: Vec<ReportRow>,
}

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub application: String,
    pub cluster: String,
    pub versions: String,
}

/// How environment names are titled in Markdown output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentTitle {
    /// ATX heading at the given level.
    Heading(u8),
    /// Bold paragraph. Used when no heading level would stay inside the
    /// marker's section.
    Bold,
}

impl EnvironmentTitle {
    /// Title style that nests under `marker`.
    ///
    /// A heading marker of rank `n < 6` gets level `n + 1` titles. A marker
    /// that is not a heading, or is already rank 6, gets bold titles: any
    /// heading would end its section.
    pub fn nested_under(marker: &str) -> Self {
        match heading_rank(marker.trim_end()) {
            Some(rank) if rank < 6 => Self::Heading(rank + 1),
            _ => Self::Bold,
        }
    }

    fn write(&self, out: &mut String, environment: &str) {
        let environment = escape_inline(environment);
        match self {
            Self::Heading(level) => out.push_str(&heading(*level, &environment)),
            Self::Bold => {
                out.push_str("**");
                out.push_str(&environment);
                out.push_str("**\n");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Build the ordered report from a grouping.
pub fn render(grouping: &Grouping) -> RenderedReport {
    let sections = grouping
        .environments()
        .map(|environment| EnvironmentSection {
            environment: environment.to_string(),
            rows: grouping
                .leaves_in(environment)
                .map(|leaf| ReportRow {
                    application: leaf.application.to_string(),
                    cluster: leaf.cluster.to_string(),
                    versions: leaf
                        .versions
                        .iter()
                        .map(String::as_str)
                        .collect::<Vec<_>>()
                        .join(VERSION_SEPARATOR),
                })
                .collect(),
        })
        .collect();

    RenderedReport { sections }
}

impl RenderedReport {
    pub fn row_count(&self) -> usize {
        self.sections.iter().map(|s| s.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Markdown body: per environment a blank line, title, blank line,
    /// table, blank line.
    pub fn to_markdown(&self, title: EnvironmentTitle) -> String {
        let mut out = String::new();

        if self.sections.is_empty() {
            out.push('\n');
            out.push_str(EMPTY_NOTICE);
            out.push_str("\n\n");
            return out;
        }

        for section in &self.sections {
            let rows: Vec<Vec<String>> = section
                .rows
                .iter()
                .map(|row| vec![row.application.clone(), row.cluster.clone(), row.versions.clone()])
                .collect();

            out.push('\n');
            title.write(&mut out, &section.environment);
            out.push('\n');
            out.push_str(&table(&COLUMNS, &rows));
            out.push('\n');
        }

        out
    }

    /// Standalone document for the overwrite mode.
    pub fn to_document(&self) -> String {
        let mut out = String::from(OVERWRITE_TITLE);
        out.push('\n');
        out.push_str(&self.to_markdown(EnvironmentTitle::nested_under(OVERWRITE_TITLE)));
        out
    }

    /// Pretty JSON form.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SyncReportError::validation(format!("failed to serialize report: {e}")))
    }
}
