//! Snapshot engine (§4.I) — produces a deterministic, content-addressed
//! record of exactly which revision each repository was at.
//!
//! Grounded on the teacher's `worktree_id` hashing (a `sha2::Sha256` over a
//! canonical string, hex-encoded) but applied to a whole-workspace revision
//! set instead of a single worktree path.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::status::StatusRow;

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotEntry {
    pub id: String,
    pub url: String,
    pub branch: String,
    pub revision: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub identifier: String,
    pub repositories: Vec<SnapshotEntry>,
}

/// Build the identifier: SHA-256 over the comma-joined revision list of
/// repositories sorted by id (§3), so two snapshots of the same state
/// always produce the same identifier regardless of collection order.
fn identifier(entries: &[SnapshotEntry]) -> String {
    let mut sorted: Vec<&SnapshotEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    let joined = sorted.iter().map(|e| e.revision.clone()).collect::<Vec<_>>().join(",");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hex::encode(hasher.finalize())
}

/// Build a [`Snapshot`] from collected status rows. Missing repositories
/// (no working copy on disk) are skipped rather than recorded with an
/// empty revision (§4.I "partial workspaces").
pub fn build(rows: &[StatusRow]) -> Snapshot {
    let entries: Vec<SnapshotEntry> = rows
        .iter()
        .filter(|r| !r.is_missing)
        .map(|r| SnapshotEntry {
            id: r.repo_id.clone(),
            url: r.url.clone(),
            branch: r.local_branch.clone(),
            revision: r.local_rev.clone(),
        })
        .collect();

    let identifier = identifier(&entries);
    Snapshot { identifier, repositories: entries }
}

/// Render as pretty-printed, two-space-indent JSON (§6 `--output`).
pub fn render(snapshot: &Snapshot) -> Result<String, crate::error::MistletoeError> {
    serde_json::to_string_pretty(snapshot).map_err(|e| crate::error::MistletoeError::ConfigInvalidFormat { detail: e.to_string() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn row(id: &str, branch: &str, rev: &str) -> StatusRow {
        StatusRow {
            repo_id: id.to_string(),
            dir: PathBuf::new(),
            url: format!("https://example.com/{id}.git"),
            local_branch: branch.to_string(),
            local_rev: rev.to_string(),
            remote_rev: String::new(),
            remote_branch: String::new(),
            is_ahead: false,
            is_behind: false,
            is_pullable: false,
            has_unpushed: false,
            has_conflict: false,
            has_uncommitted: false,
            is_detached: false,
            branch_mismatch: false,
            expected_branch: None,
            is_missing: false,
        }
    }

    #[test]
    fn identifier_is_stable_regardless_of_input_order() {
        let a = vec![row("alpha", "main", "aaa"), row("beta", "main", "bbb")];
        let b = vec![row("beta", "main", "bbb"), row("alpha", "main", "aaa")];
        assert_eq!(build(&a).identifier, build(&b).identifier);
    }

    #[test]
    fn identifier_changes_when_a_revision_changes() {
        let a = build(&[row("alpha", "main", "aaa")]);
        let b = build(&[row("alpha", "main", "zzz")]);
        assert_ne!(a.identifier, b.identifier);
    }

    #[test]
    fn missing_repositories_are_skipped() {
        let mut missing = row("gone", "", "");
        missing.is_missing = true;
        let snap = build(&[row("present", "main", "abc"), missing]);
        assert_eq!(snap.repositories.len(), 1);
        assert_eq!(snap.repositories[0].id, "present");
    }

    #[test]
    fn identifier_matches_bare_comma_joined_revision_hash() {
        let snap = build(&[row("a", "main", "1111"), row("b", "main", "2222")]);
        let mut hasher = Sha256::new();
        hasher.update(b"1111,2222");
        assert_eq!(snap.identifier, hex::encode(hasher.finalize()));
    }

    #[test]
    fn entries_carry_the_repository_url() {
        let snap = build(&[row("alpha", "main", "aaa")]);
        assert_eq!(snap.repositories[0].url, "https://example.com/alpha.git");
    }

    #[test]
    fn identifier_is_lowercase_hex_sha256_length() {
        let snap = build(&[row("alpha", "main", "aaa")]);
        assert_eq!(snap.identifier.len(), 64);
        assert!(snap.identifier.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn render_is_pretty_printed_json() {
        let snap = build(&[row("alpha", "main", "aaa")]);
        let text = render(&snap).unwrap();
        assert!(text.contains("\n  "));
        assert!(text.contains("\"identifier\""));
    }
}
