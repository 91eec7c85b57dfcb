//! Manifest loader & validator (§3, §4.A, §6).
//!
//! Grounded on the teacher's `config::user::WorktrunkConfig` (a single
//! `serde`-derived struct loaded from disk and validated as a unit) and on
//! `git::Worktree::parse_porcelain_list`'s discipline of never half-parsing:
//! any validation failure aborts before a partial `Manifest` escapes.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::MistletoeError;

/// One working copy governed by a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Always present after loading: either given explicitly, or derived
    /// from `url`'s last path segment with any trailing ".git" stripped.
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none", rename = "base_branch")]
    pub base_branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

/// A [`Repository`] after §4.A validation: `id` is always `Some`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRepository {
    pub id: String,
    pub url: String,
    pub branch: Option<String>,
    pub base_branch: Option<String>,
    pub revision: Option<String>,
}

impl ValidatedRepository {
    /// §8 "Reset determinism": first non-empty of (Revision, BaseBranch, Branch).
    pub fn reset_target(&self) -> Option<&str> {
        self.revision
            .as_deref()
            .or(self.base_branch.as_deref())
            .or(self.branch.as_deref())
    }

    pub fn to_wire(&self) -> Repository {
        Repository {
            id: Some(self.id.clone()),
            url: self.url.clone(),
            branch: self.branch.clone(),
            base_branch: self.base_branch.clone(),
            revision: self.revision.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jobs: Option<u32>,
    pub repositories: Vec<Repository>,
}

/// The manifest after validation: owns its repositories by value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatedManifest {
    pub jobs: Option<u32>,
    pub repositories: Vec<ValidatedRepository>,
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().filter(|v| !v.is_empty())
}

fn derive_id(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit(['/', ':'])
        .next()
        .unwrap_or(url);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

fn is_valid_id_shape(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

fn is_valid_ref_shape(value: &str) -> bool {
    !value.is_empty()
        && !value.starts_with('-')
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '/' | '_' | '-'))
}

fn validate_url(id: &str, url: &str) -> Result<(), MistletoeError> {
    if url.starts_with("ext::") || url.contains(['\n', '\r', '\t']) {
        return Err(MistletoeError::ConfigInvalidUrl { id: id.to_string(), url: url.to_string() });
    }
    Ok(())
}

fn validate_ref_field(id: &str, field: &'static str, value: &Option<String>) -> Result<(), MistletoeError> {
    if let Some(v) = non_empty(value)
        && !is_valid_ref_shape(v)
    {
        return Err(MistletoeError::ConfigInvalidRef { id: id.to_string(), field, value: v.to_string() });
    }
    Ok(())
}

/// Validate a raw [`Manifest`], producing a [`ValidatedManifest`] or the
/// first violation found, in the order specified by §4.A: ID shape, ID
/// reserved name, URL protocol prefix, URL control characters, ref shape,
/// then uniqueness across the whole set.
pub fn validate(manifest: Manifest) -> Result<ValidatedManifest, MistletoeError> {
    let mut repositories = Vec::with_capacity(manifest.repositories.len());
    let mut seen_ids: HashSet<String> = HashSet::new();

    for repo in manifest.repositories {
        let id = match non_empty(&repo.id) {
            Some(explicit) => explicit.to_string(),
            None => derive_id(&repo.url),
        };

        if !is_valid_id_shape(&id) {
            return Err(MistletoeError::ConfigInvalidId { id });
        }
        if id == "." || id == ".." {
            return Err(MistletoeError::ConfigInvalidId { id });
        }
        if Path::new(&id).is_absolute() {
            return Err(MistletoeError::ConfigInvalidId { id });
        }

        validate_url(&id, &repo.url)?;
        validate_ref_field(&id, "branch", &repo.branch)?;
        validate_ref_field(&id, "base_branch", &repo.base_branch)?;
        validate_ref_field(&id, "revision", &repo.revision)?;

        if !seen_ids.insert(id.clone()) {
            return Err(MistletoeError::ConfigDuplicateId { id });
        }

        repositories.push(ValidatedRepository {
            id,
            url: repo.url,
            branch: non_empty(&repo.branch).map(str::to_string),
            base_branch: non_empty(&repo.base_branch).map(str::to_string),
            revision: non_empty(&repo.revision).map(str::to_string),
        });
    }

    Ok(ValidatedManifest { jobs: manifest.jobs, repositories })
}

fn parse(bytes: &[u8]) -> Result<Manifest, MistletoeError> {
    serde_json::from_slice(bytes).map_err(|e| MistletoeError::ConfigInvalidFormat { detail: e.to_string() })
}

/// Load and validate a manifest. `blob` wins over `path` when non-empty
/// (§4.A, §9 open question (b): stdin precedence is resolved one layer up
/// by the config-locator; this function only implements "blob-or-file").
pub fn load(path: &Path, blob: &[u8]) -> Result<ValidatedManifest, MistletoeError> {
    let bytes = if !blob.is_empty() {
        blob.to_vec()
    } else {
        std::fs::read(path).map_err(|_| MistletoeError::ConfigFileNotFound { path: path.to_path_buf() })?
    };
    validate(parse(&bytes)?)
}

impl ValidatedManifest {
    pub fn find(&self, id: &str) -> Option<&ValidatedRepository> {
        self.repositories.iter().find(|r| r.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest_json(body: &str) -> Vec<u8> {
        body.as_bytes().to_vec()
    }

    #[test]
    fn derives_id_from_url_last_segment_stripping_git_suffix() {
        let m = parse(&manifest_json(
            r#"{"repositories":[{"url":"https://example.com/org/thing.git"}]}"#,
        ))
        .unwrap();
        let v = validate(m).unwrap();
        assert_eq!(v.repositories[0].id, "thing");
    }

    #[test]
    fn derives_id_from_scp_style_url() {
        let m = parse(&manifest_json(r#"{"repositories":[{"url":"git@host:org/thing.git"}]}"#)).unwrap();
        let v = validate(m).unwrap();
        assert_eq!(v.repositories[0].id, "thing");
    }

    #[test]
    fn explicit_id_wins_over_derivation() {
        let m = parse(&manifest_json(r#"{"repositories":[{"id":"a","url":"https://example.com/b.git"}]}"#)).unwrap();
        let v = validate(m).unwrap();
        assert_eq!(v.repositories[0].id, "a");
    }

    #[test]
    fn rejects_reserved_ids() {
        let m = parse(&manifest_json(r#"{"repositories":[{"id":".","url":"https://example.com/a.git"}]}"#)).unwrap();
        assert!(matches!(validate(m), Err(MistletoeError::ConfigInvalidId { .. })));

        let m = parse(&manifest_json(r#"{"repositories":[{"id":"..","url":"https://example.com/a.git"}]}"#)).unwrap();
        assert!(matches!(validate(m), Err(MistletoeError::ConfigInvalidId { .. })));
    }

    #[test]
    fn rejects_id_with_bad_characters() {
        let m = parse(&manifest_json(r#"{"repositories":[{"id":"a/b","url":"https://example.com/a.git"}]}"#)).unwrap();
        assert!(matches!(validate(m), Err(MistletoeError::ConfigInvalidId { .. })));
    }

    #[test]
    fn rejects_ext_colon_colon_url() {
        let m = parse(&manifest_json(r#"{"repositories":[{"id":"a","url":"ext::sh -c true"}]}"#)).unwrap();
        assert!(matches!(validate(m), Err(MistletoeError::ConfigInvalidUrl { .. })));
    }

    #[test]
    fn rejects_url_with_control_characters() {
        let m = parse(&manifest_json(
            "{\"repositories\":[{\"id\":\"a\",\"url\":\"https://example.com/a\\t.git\"}]}",
        ))
        .unwrap();
        assert!(matches!(validate(m), Err(MistletoeError::ConfigInvalidUrl { .. })));
    }

    #[test]
    fn rejects_flag_injection_in_branch() {
        let m = parse(&manifest_json(
            r#"{"repositories":[{"id":"a","url":"https://example.com/a.git","branch":"--force"}]}"#,
        ))
        .unwrap();
        assert!(matches!(validate(m), Err(MistletoeError::ConfigInvalidRef { .. })));
    }

    #[test]
    fn rejects_duplicate_ids() {
        let m = parse(&manifest_json(
            r#"{"repositories":[{"id":"a","url":"https://example.com/1.git"},{"id":"a","url":"https://example.com/2.git"}]}"#,
        ))
        .unwrap();
        assert!(matches!(validate(m), Err(MistletoeError::ConfigDuplicateId { .. })));
    }

    #[test]
    fn missing_file_is_distinct_error_kind() {
        let err = load(Path::new("/nonexistent/mistletoe.json"), &[]).unwrap_err();
        assert!(matches!(err, MistletoeError::ConfigFileNotFound { .. }));
    }

    #[test]
    fn blob_wins_over_file_when_non_empty() {
        let blob = manifest_json(r#"{"repositories":[{"id":"a","url":"https://example.com/a.git"}]}"#);
        let v = load(Path::new("/nonexistent/mistletoe.json"), &blob).unwrap();
        assert_eq!(v.repositories.len(), 1);
    }

    #[test]
    fn manifest_determinism_round_trip() {
        let m = parse(&manifest_json(
            r#"{"jobs":4,"repositories":[{"id":"a","url":"https://example.com/a.git","branch":"main"}]}"#,
        ))
        .unwrap();
        let v1 = validate(m).unwrap();
        let wire: Manifest = Manifest { jobs: v1.jobs, repositories: v1.repositories.iter().map(|r| r.to_wire()).collect() };
        let serialized = serde_json::to_vec(&wire).unwrap();
        let v2 = validate(parse(&serialized).unwrap()).unwrap();
        assert_eq!(v1, v2);
    }

    #[test]
    fn reset_target_priority() {
        let r = ValidatedRepository {
            id: "r".into(),
            url: "u".into(),
            branch: Some("main".into()),
            base_branch: Some("dev".into()),
            revision: Some("abc123".into()),
        };
        assert_eq!(r.reset_target(), Some("abc123"));

        let r = ValidatedRepository { revision: None, ..r };
        assert_eq!(r.reset_target(), Some("dev"));

        let r = ValidatedRepository { base_branch: None, ..r };
        assert_eq!(r.reset_target(), Some("main"));
    }
}
