//! Target document persistence.
//!
//! The report core never touches the filesystem; this crate reads the target
//! document once and writes the merged result once.
//!
//! **Write rules:**
//! - the new text goes to a sibling temp file which is then renamed over the
//!   target, so readers see either the old document or the new one
//! - a missing document reads as empty, so the first run creates it

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use syncreport_shared::{Result, SyncReportError};
use tracing::{debug, info};
use uuid::Uuid;

/// Read the target document. A missing file is an empty document.
pub fn read_document(path: &Path) -> Result<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            debug!(path = %path.display(), bytes = text.len(), "document read");
            Ok(text)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "document does not exist yet, starting empty");
            Ok(String::new())
        }
        Err(e) => Err(SyncReportError::document_access(path, e)),
    }
}

/// Replace the document at `path` with `text` in one rename.
pub fn write_document(path: &Path, text: &str) -> Result<()> {
    let tmp = temp_path(path);

    let written = (|| -> std::io::Result<()> {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp, path)
    })();

    if let Err(e) = written {
        let _ = std::fs::remove_file(&tmp);
        return Err(SyncReportError::document_access(path, e));
    }

    info!(path = %path.display(), bytes = text.len(), "document written");
    Ok(())
}

/// SHA-256 hex digest of `text`.
pub fn fingerprint(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `.<name>.<uuid>.tmp` next to `path`, so the rename stays on one filesystem.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", Uuid::now_v7()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("sr-{label}-{}", Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn missing_document_reads_empty() {
        let dir = scratch_dir("missing");
        assert_eq!(read_document(&dir.join("README.md")).unwrap(), "");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_then_read_back() {
        let dir = scratch_dir("write");
        let path = dir.join("README.md");

        write_document(&path, "# Title\n").unwrap();
        write_document(&path, "# Title\n\n## Report\n").unwrap();
        assert_eq!(read_document(&path).unwrap(), "# Title\n\n## Report\n");

        // No temp files left behind.
        let leftovers: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unwritable_location_is_document_access_error() {
        let dir = scratch_dir("unwritable");
        let path = dir.join("no-such-subdir").join("README.md");

        let err = write_document(&path, "text").unwrap_err();
        assert!(matches!(err, SyncReportError::DocumentAccess { .. }));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn reading_a_directory_fails() {
        let dir = scratch_dir("dir");
        let err = read_document(&dir).unwrap_err();
        assert!(matches!(err, SyncReportError::DocumentAccess { .. }));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn fingerprint_is_sha256_hex() {
        let hash = fingerprint("hello");
        assert_eq!(hash.len(), 64);
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        assert_ne!(fingerprint("hello\n"), hash);
    }
}
