//! Identifier classification.
//!
//! Application names follow `<application>-<environment>[-<cluster>]`. The
//! cluster keeps any further hyphens (`frontend-prod-cluster-a` → cluster
//! `cluster-a`), and is empty for two-segment names. No case folding or
//! trimming happens here; identifiers are taken as canonical.

use syncreport_shared::{Classification, Result, SyncReportError};

/// Segment delimiter inside an application name.
const DELIMITER: char = '-';

/// Derive (application, environment, cluster) from a flat identifier.
///
/// Fails with [`SyncReportError::MalformedIdentifier`] when the name has fewer
/// than two segments or when the application or environment segment is empty.
pub fn classify(raw_name: &str) -> Result<Classification> {
    let mut parts = raw_name.splitn(3, DELIMITER);

    let application = parts.next().unwrap_or_default();
    let environment = parts
        .next()
        .ok_or_else(|| SyncReportError::malformed(raw_name))?;
    let cluster = parts.next().unwrap_or_default();

    if application.is_empty() || environment.is_empty() {
        return Err(SyncReportError::malformed(raw_name));
    }

    Ok(Classification {
        application: application.to_string(),
        environment: environment.to_string(),
        cluster: cluster.to_string(),
    })
}
