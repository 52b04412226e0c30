//! Record types passed between the fetch collaborators and the report core.

use serde::{Deserialize, Serialize};

/// Revision reported when the controller gives none for an application.
pub const UNKNOWN_REVISION: &str = "unknown";

// ---------------------------------------------------------------------------
// AppRecord
// ---------------------------------------------------------------------------

/// One deployed application as reported by the GitOps controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppRecord {
    /// Flat identifier, e.g. `frontend-prod-cluster-a`.
    pub raw_name: String,
    /// Synced revision (commit, tag, ...), or [`UNKNOWN_REVISION`].
    pub revision: String,
}

impl AppRecord {
    /// Build a record, substituting [`UNKNOWN_REVISION`] for a missing or
    /// empty revision.
    pub fn new(raw_name: impl Into<String>, revision: Option<String>) -> Self {
        let revision = revision
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| UNKNOWN_REVISION.to_string());
        Self {
            raw_name: raw_name.into(),
            revision,
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// The three grouping keys derived from an [`AppRecord::raw_name`].
///
/// `application` and `environment` are never empty. `cluster` is empty for
/// two-segment identifiers such as `frontend-prod`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    pub application: String,
    pub environment: String,
    pub cluster: String,
}
