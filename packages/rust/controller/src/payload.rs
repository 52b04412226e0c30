//! Application listing decoder.
//!
//! The REST API answers `{"items": [...]}` (with `items: null` when nothing is
//! deployed); the companion CLI prints a bare JSON array. Both carry the same
//! application objects, of which only three fields matter:
//! - `metadata.name`
//! - `status.sync.revision`
//! - `spec.source.targetRevision`

use serde::Deserialize;
use syncreport_shared::{AppRecord, Result, RevisionPreference, SyncReportError};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing {
    Bare(Vec<Application>),
    /// `items` must be present; the API sends `null` for an empty list.
    Wrapped {
        #[serde(deserialize_with = "Option::deserialize")]
        items: Option<Vec<Application>>,
    },
}

#[derive(Debug, Deserialize)]
struct Application {
    metadata: Metadata,
    #[serde(default)]
    spec: Option<Spec>,
    #[serde(default)]
    status: Option<Status>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Spec {
    #[serde(default)]
    source: Option<Source>,
}

#[derive(Debug, Deserialize)]
struct Source {
    #[serde(default, rename = "targetRevision")]
    target_revision: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Status {
    #[serde(default)]
    sync: Option<SyncStatus>,
}

#[derive(Debug, Deserialize)]
struct SyncStatus {
    #[serde(default)]
    revision: Option<String>,
}

impl Application {
    fn synced_revision(&self) -> Option<String> {
        self.status
            .as_ref()
            .and_then(|s| s.sync.as_ref())
            .and_then(|s| s.revision.clone())
            .filter(|r| !r.is_empty())
    }

    fn target_revision(&self) -> Option<String> {
        self.spec
            .as_ref()
            .and_then(|s| s.source.as_ref())
            .and_then(|s| s.target_revision.clone())
            .filter(|r| !r.is_empty())
    }

    fn into_record(self, preference: RevisionPreference) -> AppRecord {
        let revision = match preference {
            RevisionPreference::Synced => self.synced_revision().or_else(|| self.target_revision()),
            RevisionPreference::Target => self.target_revision().or_else(|| self.synced_revision()),
        };
        AppRecord::new(self.metadata.name, revision)
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode an application listing into records, preserving order.
pub fn parse_listing(json: &str, preference: RevisionPreference) -> Result<Vec<AppRecord>> {
    let listing: Listing = serde_json::from_str(json)
        .map_err(|e| SyncReportError::fetch(format!("unexpected application listing: {e}")))?;

    let apps = match listing {
        Listing::Bare(apps) => apps,
        Listing::Wrapped { items } => items.unwrap_or_default(),
    };

    Ok(apps
        .into_iter()
        .map(|app| app.into_record(preference))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use syncreport_shared::UNKNOWN_REVISION;

    const API_BODY: &str = r#"{
        "metadata": {"resourceVersion": "123"},
        "items": [
            {
                "metadata": {"name": "frontend-prod-cluster-a", "namespace": "argocd"},
                "spec": {"source": {"repoURL": "https://git.example.com/app.git", "targetRevision": "HEAD"}},
                "status": {"sync": {"status": "Synced", "revision": "4f2a9c1"}}
            },
            {
                "metadata": {"name": "api-staging"},
                "spec": {"source": {"targetRevision": "v1.4.0"}},
                "status": {"sync": {"status": "OutOfSync"}}
            },
            {
                "metadata": {"name": "worker-dev-eu"}
            }
        ]
    }"#;

    #[test]
    fn decodes_wrapped_api_listing() {
        let records = parse_listing(API_BODY, RevisionPreference::Synced).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].raw_name, "frontend-prod-cluster-a");
        assert_eq!(records[0].revision, "4f2a9c1");
        assert_eq!(records[1].revision, "v1.4.0");
        assert_eq!(records[2].revision, UNKNOWN_REVISION);
    }

    #[test]
    fn target_preference_flips_precedence() {
        let records = parse_listing(API_BODY, RevisionPreference::Target).unwrap();
        assert_eq!(records[0].revision, "HEAD");
        assert_eq!(records[1].revision, "v1.4.0");
    }

    #[test]
    fn decodes_bare_cli_array() {
        let json = r#"[
            {"metadata": {"name": "b-prod"}, "status": {"sync": {"revision": "r2"}}},
            {"metadata": {"name": "a-prod"}, "status": {"sync": {"revision": ""}}}
        ]"#;
        let records = parse_listing(json, RevisionPreference::Synced).unwrap();
        assert_eq!(records[0].raw_name, "b-prod");
        assert_eq!(records[1].raw_name, "a-prod");
        assert_eq!(records[1].revision, UNKNOWN_REVISION);
    }

    #[test]
    fn null_items_is_empty() {
        let records = parse_listing(r#"{"items": null}"#, RevisionPreference::Synced).unwrap();
        assert!(records.is_empty());
        let records = parse_listing(r#"{"metadata": {}, "items": []}"#, RevisionPreference::Synced)
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn object_without_items_is_a_fetch_failure() {
        let err = parse_listing(r#"{"metadata": {}}"#, RevisionPreference::Synced).unwrap_err();
        assert!(matches!(err, SyncReportError::Fetch(_)));

        let err = parse_listing(
            r#"{"error": "permission denied", "code": 7}"#,
            RevisionPreference::Synced,
        )
        .unwrap_err();
        assert!(matches!(err, SyncReportError::Fetch(_)));
    }

    #[test]
    fn garbage_is_a_fetch_failure() {
        let err = parse_listing("<html>login</html>", RevisionPreference::Synced).unwrap_err();
        assert!(matches!(err, SyncReportError::Fetch(_)));

        let err = parse_listing(r#"[{"spec": {}}]"#, RevisionPreference::Synced).unwrap_err();
        assert!(err.to_string().contains("unexpected application listing"));
    }
}
