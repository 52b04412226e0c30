//! Markdown document model and section merge.
//!
//! The generated report lives in a section of a larger, hand-written
//! document. [`merge`] replaces that section (or appends it) while every byte
//! outside the section is carried over untouched. Section boundaries come
//! from heading structure, not from text patterns.

mod document;
mod table;

use tracing::{debug, instrument};

use syncreport_shared::{Result, SyncReportError};

use document::Document;

pub use document::heading_rank;
pub use table::{escape_cell, escape_inline, heading, table};

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Splice `body` into `document` under the line `marker_heading`.
///
/// - When a line equal to `marker_heading` exists (outside code fences), the
///   region from it up to the next heading of equal-or-higher rank is
///   replaced by the marker followed by `body`. If the marker is not itself a
///   heading, the region ends at the next heading of any rank. A final line
///   without a terminator is never part of the region.
/// - Otherwise the marker and body are appended, separated from existing
///   content by a single blank line.
///
/// `body` always ends up newline-terminated. The function is pure and
/// idempotent: merging the same body into its own output changes nothing.
/// A body that would end the section early (a heading of equal-or-higher
/// rank than the marker, or an unclosed code fence) is rejected.
#[instrument(skip(document, body), fields(doc_len = document.len(), body_len = body.len()))]
pub fn merge(document: &str, marker_heading: &str, body: &str) -> Result<String> {
    validate_marker(marker_heading)?;
    let rank = heading_rank(marker_heading);
    validate_body(body, rank)?;

    let mut body = body.to_string();
    if !body.is_empty() && !body.ends_with('\n') {
        body.push('\n');
    }

    let doc = Document::parse(document);
    let Some(start) = doc.find_marker(marker_heading) else {
        debug!("marker not found, appending section");
        return Ok(append(document, marker_heading, &body));
    };

    let end = doc.section_end(start, rank);
    let total = doc.lines().len();

    let marker_line = doc.lines()[start].raw;
    let mut merged = doc.text(0..start);
    merged.push_str(marker_line);
    if !marker_line.ends_with('\n') {
        merged.push('\n');
    }
    merged.push_str(&body);
    merged.push_str(&doc.text(end..total));

    debug!(start, end, "replaced existing section");
    Ok(merged)
}

/// Append `marker_heading` + `body` after a single `\n`.
///
/// On a newline-terminated document that `\n` is the blank separator line;
/// otherwise it terminates the document's last line.
fn append(document: &str, marker_heading: &str, body: &str) -> String {
    let mut out = String::with_capacity(document.len() + marker_heading.len() + body.len() + 2);
    out.push_str(document);

    if !document.is_empty() {
        out.push('\n');
    }
    out.push_str(marker_heading);
    out.push('\n');
    out.push_str(body);
    out
}

/// The marker must be a single, non-blank line.
fn validate_marker(marker_heading: &str) -> Result<()> {
    if marker_heading.trim().is_empty() {
        return Err(SyncReportError::validation("marker heading must not be empty"));
    }
    if marker_heading.contains('\n') || marker_heading.contains('\r') {
        return Err(SyncReportError::validation(format!(
            "marker heading must be a single line, got {marker_heading:?}"
        )));
    }
    Ok(())
}

/// The body must stay inside the section it is written to.
fn validate_body(body: &str, marker_rank: Option<u8>) -> Result<()> {
    let parsed = Document::parse(body);
    if parsed.has_unclosed_fence() {
        return Err(SyncReportError::validation("body has an unclosed code fence"));
    }
    let limit = marker_rank.unwrap_or(u8::MAX);
    if let Some(top) = parsed.top_rank().filter(|&top| top <= limit) {
        return Err(SyncReportError::validation(format!(
            "body heading of rank {top} would end the section early"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const MARKER: &str = "## Report";

    #[test]
    fn replaces_existing_section() {
        let merged = merge("X\n## Report\nold\nY", MARKER, "new\n").unwrap();
        assert_eq!(merged, "X\n## Report\nnew\nY");
    }

    #[test]
    fn replacing_twice_is_stable() {
        let once = merge("X\n## Report\nold\nY", MARKER, "new\n").unwrap();
        let twice = merge(&once, MARKER, "new\n").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn appends_when_marker_missing() {
        let merged = merge("X", MARKER, "new\n").unwrap();
        assert_eq!(merged, "X\n## Report\nnew\n");
        assert!(merged.starts_with('X'));

        let again = merge(&merged, MARKER, "new\n").unwrap();
        assert_eq!(again, merged);
    }

    #[test]
    fn append_after_terminated_document_leaves_one_blank_line() {
        let merged = merge("# Title\n\nIntro.\n", MARKER, "body\n").unwrap();
        assert_eq!(merged, "# Title\n\nIntro.\n\n## Report\nbody\n");
    }

    #[test]
    fn append_to_empty_document() {
        assert_eq!(merge("", MARKER, "body\n").unwrap(), "## Report\nbody\n");
    }

    #[test]
    fn section_stops_at_next_sibling_heading() {
        let doc = "# Title\n\n## Report\n\n### prod\n\nold table\n\n## License\n\nMIT\n";
        let merged = merge(doc, MARKER, "\n### prod\n\nnew table\n\n").unwrap();
        assert_eq!(
            merged,
            "# Title\n\n## Report\n\n### prod\n\nnew table\n\n## License\n\nMIT\n"
        );
    }

    #[test]
    fn section_stops_at_higher_heading() {
        let doc = "## Report\nold\n# Appendix\nkeep\n";
        let merged = merge(doc, MARKER, "new\n").unwrap();
        assert_eq!(merged, "## Report\nnew\n# Appendix\nkeep\n");
    }

    #[test]
    fn surrounding_bytes_are_preserved() {
        let doc = "  leading spaces\r\n\n## Report\r\nold\r\n## Other\r\n\ttab\r\n";
        let merged = merge(doc, MARKER, "new\n").unwrap();
        assert_eq!(
            merged,
            "  leading spaces\r\n\n## Report\r\nnew\n## Other\r\n\ttab\r\n"
        );
    }

    #[test]
    fn body_gets_terminated() {
        let merged = merge("## Report\nold\n", MARKER, "new").unwrap();
        assert_eq!(merged, "## Report\nnew\n");
    }

    #[test]
    fn marker_as_unterminated_last_line() {
        let merged = merge("X\n## Report", MARKER, "new\n").unwrap();
        assert_eq!(merged, "X\n## Report\nnew\n");
    }

    #[test]
    fn only_first_marker_is_replaced() {
        let doc = "## Report\na\n## Report\nb\n";
        let merged = merge(doc, MARKER, "new\n").unwrap();
        assert_eq!(merged, "## Report\nnew\n## Report\nb\n");
    }

    #[test]
    fn marker_in_code_fence_is_left_alone() {
        let doc = "```\n## Report\n```\n";
        let merged = merge(doc, MARKER, "new\n").unwrap();
        assert_eq!(merged, "```\n## Report\n```\n\n## Report\nnew\n");
    }

    #[test]
    fn comment_marker_stops_at_any_heading() {
        let marker = "<!-- versions -->";
        let doc = format!("{marker}\nold\n#### Notes\nkeep\n");
        let merged = merge(&doc, marker, "new\n").unwrap();
        assert_eq!(merged, format!("{marker}\nnew\n#### Notes\nkeep\n"));
    }

    #[test]
    fn empty_or_multiline_marker_is_rejected() {
        assert!(matches!(
            merge("doc", "  ", "body"),
            Err(SyncReportError::Validation { .. })
        ));
        assert!(merge("doc", "## a\n## b", "body").is_err());
    }

    #[test]
    fn body_heading_at_marker_rank_is_rejected() {
        let err = merge("X\n## Report\nold\nY", MARKER, "## Sub\nx\n").unwrap_err();
        assert!(matches!(err, SyncReportError::Validation { .. }));
        assert!(merge("doc\n", MARKER, "# Top\n").is_err());
        assert!(merge("doc\n", "<!-- versions -->", "###### tiny\n").is_err());
    }

    #[test]
    fn nested_or_fenced_body_headings_are_allowed() {
        let body = "### prod\n```md\n## not a heading\n```\n";
        let once = merge("X\n## Report\nold\nY", MARKER, body).unwrap();
        let twice = merge(&once, MARKER, body).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn body_with_unclosed_fence_is_rejected() {
        assert!(matches!(
            merge("## Report\nold\n## Next\n", MARKER, "```\ncode\n"),
            Err(SyncReportError::Validation { .. })
        ));
    }

    #[test]
    fn merge_is_idempotent_across_shapes() {
        let docs = [
            "",
            "X",
            "X\n",
            "# T\n## Report\nold\n## Next\ntail",
            "## Report",
            "a\n## Report\n\n### prod\n\n| x |\n",
        ];
        let body = "\n### prod\n\n| Application | Cluster | Versions |\n\n";
        for doc in docs {
            let once = merge(doc, MARKER, body).unwrap();
            let twice = merge(&once, MARKER, body).unwrap();
            assert_eq!(once, twice, "not idempotent for {doc:?}");
        }
    }
}
