//! End-to-end `update` pipeline: fetch → classify → aggregate → render → merge → persist.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use syncreport_controller::Source;
use syncreport_shared::{AppRecord, IdentifierPolicy, Result, SyncReportError, WriteMode};
use syncreport_storage::{fingerprint, read_document, write_document};

use crate::classify::classify;
use crate::grouping::Grouping;
use crate::report::{EnvironmentTitle, RenderedReport, render};

/// Configuration for the `update` pipeline.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Target document.
    pub document: PathBuf,
    /// Marker heading of the generated section.
    pub marker: String,
    /// Malformed identifier handling.
    pub identifiers: IdentifierPolicy,
    /// Section merge or whole-document overwrite.
    pub mode: WriteMode,
    /// Compute the result without writing it.
    pub check: bool,
}

/// What happened to the target document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The merged document was written.
    Written,
    /// The document already held exactly this report.
    Unchanged,
    /// Check mode: the document is out of date and would be rewritten.
    WouldChange,
    /// Check mode: the document is already current.
    WouldKeep,
}

/// Result of the `update` pipeline.
#[derive(Debug)]
pub struct RunSummary {
    /// Time-sortable identifier of this run (also on every log line).
    pub run_id: Uuid,
    /// Records received from the source.
    pub records: usize,
    /// Records skipped for malformed identifiers (lenient mode only).
    pub skipped: usize,
    /// Environment sections in the report.
    pub environments: usize,
    /// Table rows in the report.
    pub rows: usize,
    /// (environment, application, cluster) leaves with more than one version.
    pub drift: usize,
    /// What happened to the document.
    pub outcome: Outcome,
    /// Target document path.
    pub document: PathBuf,
    /// Total elapsed time.
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the pipeline completes.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Grouping built from a record feed.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub grouping: Grouping,
    /// Identifiers dropped under [`IdentifierPolicy::Lenient`].
    pub skipped: Vec<String>,
}

/// Classify every record and fold it into a fresh grouping.
///
/// Under [`IdentifierPolicy::Strict`] the first malformed identifier aborts
/// with [`SyncReportError::MalformedIdentifier`].
pub fn aggregate(records: &[AppRecord], policy: IdentifierPolicy) -> Result<Aggregation> {
    let mut aggregation = Aggregation::default();

    for record in records {
        let classification = match classify(&record.raw_name) {
            Ok(c) => c,
            Err(e @ SyncReportError::MalformedIdentifier { .. }) => match policy {
                IdentifierPolicy::Strict => return Err(e),
                IdentifierPolicy::Lenient => {
                    warn!(identifier = %record.raw_name, "skipping malformed application identifier");
                    aggregation.skipped.push(record.raw_name.clone());
                    continue;
                }
            },
            Err(e) => return Err(e),
        };

        let added = aggregation
            .grouping
            .insert(&classification, record.revision.as_str());
        debug!(
            environment = %classification.environment,
            application = %classification.application,
            cluster = %classification.cluster,
            revision = %record.revision,
            added,
            "record grouped"
        );
    }

    for leaf in aggregation.grouping.drift() {
        warn!(
            environment = leaf.environment,
            application = leaf.application,
            cluster = leaf.cluster,
            versions = leaf.versions.len(),
            "multiple revisions reported for one cluster"
        );
    }

    Ok(aggregation)
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Produce the new document text from the current one.
pub fn compose(
    existing: &str,
    report: &RenderedReport,
    marker: &str,
    mode: WriteMode,
) -> Result<String> {
    match mode {
        WriteMode::Merge => {
            let body = report.to_markdown(EnvironmentTitle::nested_under(marker));
            syncreport_markdown::merge(existing, marker, &body)
        }
        WriteMode::Overwrite => Ok(report.to_document()),
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full `update` pipeline.
///
/// 1. Fetch records from `source`
/// 2. Classify and aggregate
/// 3. Render
/// 4. Merge into the target document
/// 5. Write it back (skipped when unchanged or in check mode)
///
/// Any failure aborts before the write; the document is written whole or not at all.
pub async fn run(
    config: &RunConfig,
    source: &Source,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let run_id = Uuid::now_v7();
    let span = info_span!("run", %run_id, document = %config.document.display());
    run_inner(run_id, config, source, progress)
        .instrument(span)
        .await
}

async fn run_inner(
    run_id: Uuid,
    config: &RunConfig,
    source: &Source,
    progress: &dyn ProgressReporter,
) -> Result<RunSummary> {
    let start = Instant::now();
    info!(source = %source.describe(), mode = %config.mode, check = config.check, "starting update");

    // --- Phase 1: Fetch ---
    progress.phase("Fetching applications");
    let records = source.fetch().await?;

    // --- Phase 2: Aggregate / render ---
    progress.phase("Rendering report");
    let aggregation = aggregate(&records, config.identifiers)?;
    let report = render(&aggregation.grouping);

    // --- Phase 3: Merge ---
    progress.phase("Merging document");
    let existing = read_document(&config.document)?;
    let merged = compose(&existing, &report, &config.marker, config.mode)?;

    let before = fingerprint(&existing);
    let after = fingerprint(&merged);
    debug!(%before, %after, "document fingerprints");

    // --- Phase 4: Persist ---
    let outcome = if config.check {
        if before == after {
            Outcome::WouldKeep
        } else {
            Outcome::WouldChange
        }
    } else if before == after {
        Outcome::Unchanged
    } else {
        progress.phase("Writing document");
        write_document(&config.document, &merged)?;
        Outcome::Written
    };

    let summary = RunSummary {
        run_id,
        records: records.len(),
        skipped: aggregation.skipped.len(),
        environments: report.sections.len(),
        rows: report.row_count(),
        drift: aggregation.grouping.drift().len(),
        outcome,
        document: config.document.clone(),
        elapsed: start.elapsed(),
    };

    info!(
        records = summary.records,
        skipped = summary.skipped,
        rows = summary.rows,
        drift = summary.drift,
        outcome = ?summary.outcome,
        "update finished"
    );
    progress.done(&summary);

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use syncreport_controller::FileSource;
    use syncreport_shared::RevisionPreference;

    fn record(name: &str, rev: &str) -> AppRecord {
        AppRecord::new(name, Some(rev.to_string()))
    }

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sr-pipeline-{label}-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn listing(apps: &[(&str, &str)]) -> String {
        let items: Vec<serde_json::Value> = apps
            .iter()
            .map(|(name, rev)| {
                serde_json::json!({
                    "metadata": {"name": name},
                    "status": {"sync": {"revision": rev}}
                })
            })
            .collect();
        serde_json::json!({ "items": items }).to_string()
    }

    fn file_source(dir: &Path, apps: &[(&str, &str)]) -> Source {
        let path = dir.join("apps.json");
        std::fs::write(&path, listing(apps)).unwrap();
        Source::File(FileSource::new(path, RevisionPreference::Synced))
    }

    fn run_config(document: PathBuf) -> RunConfig {
        RunConfig {
            document,
            marker: "## Example Output".into(),
            identifiers: IdentifierPolicy::Strict,
            mode: WriteMode::Merge,
            check: false,
        }
    }

    #[test]
    fn duplicate_records_collapse_to_one_row() {
        let records = vec![record("api-prod-us", "v3"), record("api-prod-us", "v3")];
        let aggregation = aggregate(&records, IdentifierPolicy::Strict).unwrap();
        let report = render(&aggregation.grouping);

        assert_eq!(report.sections.len(), 1);
        assert_eq!(report.sections[0].environment, "prod");
        assert_eq!(report.sections[0].rows.len(), 1);
        let row = &report.sections[0].rows[0];
        assert_eq!(
            (row.application.as_str(), row.cluster.as_str(), row.versions.as_str()),
            ("api", "us", "v3")
        );
    }

    #[test]
    fn strict_policy_fails_on_malformed_identifier() {
        let records = vec![record("api-prod-us", "v3"), record("orphan", "v1")];
        let err = aggregate(&records, IdentifierPolicy::Strict).unwrap_err();
        assert!(matches!(err, SyncReportError::MalformedIdentifier { .. }));
    }

    #[test]
    fn lenient_policy_skips_malformed_identifier() {
        let records = vec![record("orphan", "v1"), record("api-prod-us", "v3")];
        let aggregation = aggregate(&records, IdentifierPolicy::Lenient).unwrap();
        assert_eq!(aggregation.skipped, vec!["orphan".to_string()]);
        assert_eq!(aggregation.grouping.leaf_count(), 1);
    }

    #[test]
    fn compose_overwrite_ignores_existing_text() {
        let aggregation =
            aggregate(&[record("api-prod-us", "v3")], IdentifierPolicy::Strict).unwrap();
        let report = render(&aggregation.grouping);
        let doc = compose("# Old\nstuff\n", &report, "## Example Output", WriteMode::Overwrite)
            .unwrap();
        assert!(doc.starts_with("# Application Versions\n"));
        assert!(!doc.contains("stuff"));
    }

    #[tokio::test]
    async fn end_to_end_update_is_idempotent() {
        let dir = scratch_dir("e2e");
        let doc_path = dir.join("README.md");
        std::fs::write(&doc_path, "# Service\n\nIntro.\n\n## Example Output\nstale\n\n## License\nMIT\n")
            .unwrap();
        let source = file_source(&dir, &[("api-prod-us", "v3"), ("api-prod-us", "v3")]);
        let config = run_config(doc_path.clone());

        let first = run(&config, &source, &SilentProgress).await.unwrap();
        assert_eq!(first.outcome, Outcome::Written);
        assert_eq!(first.records, 2);
        assert_eq!(first.rows, 1);

        let written = std::fs::read_to_string(&doc_path).unwrap();
        assert_eq!(
            written,
            "# Service\n\nIntro.\n\n## Example Output\n\
             \n### prod\n\n\
             | Application | Cluster | Versions |\n\
             | --- | --- | --- |\n\
             | api | us | v3 |\n\
             \n## License\nMIT\n"
        );

        let second = run(&config, &source, &SilentProgress).await.unwrap();
        assert_eq!(second.outcome, Outcome::Unchanged);
        assert_eq!(std::fs::read_to_string(&doc_path).unwrap(), written);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn creates_missing_document() {
        let dir = scratch_dir("create");
        let doc_path = dir.join("STATUS.md");
        let source = file_source(&dir, &[("web-staging", "abc123")]);

        let summary = run(&run_config(doc_path.clone()), &source, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(summary.outcome, Outcome::Written);

        let written = std::fs::read_to_string(&doc_path).unwrap();
        assert!(written.starts_with("## Example Output\n\n### staging\n"));
        assert!(written.contains("| web |  | abc123 |"));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn check_mode_reports_without_writing() {
        let dir = scratch_dir("check");
        let doc_path = dir.join("README.md");
        std::fs::write(&doc_path, "# Service\n").unwrap();
        let source = file_source(&dir, &[("api-prod-us", "v3")]);

        let mut config = run_config(doc_path.clone());
        config.check = true;

        let summary = run(&config, &source, &SilentProgress).await.unwrap();
        assert_eq!(summary.outcome, Outcome::WouldChange);
        assert_eq!(std::fs::read_to_string(&doc_path).unwrap(), "# Service\n");

        config.check = false;
        run(&config, &source, &SilentProgress).await.unwrap();
        let current = std::fs::read_to_string(&doc_path).unwrap();

        config.check = true;
        let summary = run(&config, &source, &SilentProgress).await.unwrap();
        assert_eq!(summary.outcome, Outcome::WouldKeep);
        assert_eq!(std::fs::read_to_string(&doc_path).unwrap(), current);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn failure_leaves_document_untouched() {
        let dir = scratch_dir("abort");
        let doc_path = dir.join("README.md");
        std::fs::write(&doc_path, "# Service\n").unwrap();
        let source = file_source(&dir, &[("api-prod-us", "v3"), ("broken", "v1")]);

        let err = run(&run_config(doc_path.clone()), &source, &SilentProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncReportError::MalformedIdentifier { .. }));
        assert_eq!(std::fs::read_to_string(&doc_path).unwrap(), "# Service\n");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn drift_is_counted() {
        let dir = scratch_dir("drift");
        let doc_path = dir.join("README.md");
        let source = file_source(
            &dir,
            &[("frontend-prod-a", "v1"), ("frontend-prod-a", "v2"), ("api-prod-a", "v1")],
        );

        let summary = run(&run_config(doc_path.clone()), &source, &SilentProgress)
            .await
            .unwrap();
        assert_eq!(summary.drift, 1);
        assert!(
            std::fs::read_to_string(&doc_path)
                .unwrap()
                .contains("| frontend | a | v1, v2 |")
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
