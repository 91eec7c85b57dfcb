//! Config-locator (§4.G) — finds the manifest governing the current
//! invocation and, when the command is run from inside one of the
//! manifest's own working copies, offers to adopt that discovery.
//!
//! Grounded on the teacher's `config::discover` walk (ancestor search for a
//! marker file) combined with `git::Worktree::find_containing_repo` (asking
//! the SCM driver itself where the workspace root is, rather than walking
//! the filesystem by hand).

use std::io::{BufRead, Read};
use std::path::{Path, PathBuf};

use crate::confirm::{confirm, Io};
use crate::error::MistletoeError;
use crate::manifest::ValidatedManifest;
use crate::scm::ScmDriver;

pub const DEFAULT_FILENAME: &str = "mistletoe.json";

/// Where the manifest bytes came from, for diagnostics and for the `init`
/// command's "already have a config" guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Stdin,
    ExplicitPath(PathBuf),
    Cwd(PathBuf),
    WorkspaceRoot(PathBuf),
}

impl Source {
    pub fn path(&self) -> Option<&Path> {
        match self {
            Source::Stdin => None,
            Source::ExplicitPath(p) | Source::Cwd(p) | Source::WorkspaceRoot(p) => Some(p),
        }
    }
}

pub struct Located {
    pub manifest: ValidatedManifest,
    pub source: Source,
}

/// Resolve which manifest governs this run, per §4.G's precedence:
/// stdin (when `--file -` or piped and not `--ignore-stdin`) > explicit
/// `--file PATH` > `mistletoe.json` in the current directory > a manifest
/// in the *parent* of the enclosing working copy's toplevel, discovered
/// via the SCM driver and adopted only after validation and confirmation.
/// Returns `ConfigFileNotFound` if none of these produce a file.
pub fn locate(
    explicit_file: Option<&Path>,
    stdin_requested: bool,
    ignore_stdin: bool,
    cwd: &Path,
    scm: &ScmDriver,
    stdin: &mut dyn BufRead,
    auto_yes: bool,
) -> Result<Located, MistletoeError> {
    if stdin_requested && !ignore_stdin {
        let mut bytes = Vec::new();
        stdin
            .read_to_end(&mut bytes)
            .map_err(|e| MistletoeError::Io { detail: e.to_string() })?;
        let manifest = crate::manifest::load(Path::new("-"), &bytes)?;
        return Ok(Located { manifest, source: Source::Stdin });
    }

    if let Some(path) = explicit_file {
        let manifest = crate::manifest::load(path, &[])?;
        return Ok(Located { manifest, source: Source::ExplicitPath(path.to_path_buf()) });
    }

    let cwd_candidate = cwd.join(DEFAULT_FILENAME);
    if cwd_candidate.is_file() {
        let manifest = crate::manifest::load(&cwd_candidate, &[])?;
        return Ok(Located { manifest, source: Source::Cwd(cwd_candidate) });
    }

    if scm.inside_worktree(&cwd.to_string_lossy()) {
        let toplevel = scm.workspace_root(&cwd.to_string_lossy())?;
        if let Some(parent) = toplevel.parent() {
            let parent_candidate = parent.join(DEFAULT_FILENAME);
            if parent_candidate.is_file() {
                let manifest = crate::manifest::load(&parent_candidate, &[])?;
                if validate_parent_adoption(&manifest, parent, scm).is_ok() {
                    let source = Source::WorkspaceRoot(parent_candidate);
                    let mut stderr = std::io::stderr();
                    let mut io = Io { stdin, stderr: &mut stderr };
                    if confirm_adoption(&mut io, &source, auto_yes)? {
                        return Ok(Located { manifest, source });
                    }
                }
            }
        }
    }

    Err(MistletoeError::ConfigFileNotFound { path: cwd_candidate })
}

/// Verify that the repository directories a parent config names on disk are
/// real working copies whose `origin` matches the manifest (§4.G "parent
/// config validation"). Used both by [`locate`], when a manifest is
/// discovered in the parent of the enclosing worktree's toplevel, and by
/// every mutating command's own integrity check before its command body runs.
pub fn validate_parent_adoption(
    manifest: &ValidatedManifest,
    base_dir: &Path,
    scm: &ScmDriver,
) -> Result<(), MistletoeError> {
    for repo in &manifest.repositories {
        let dir = base_dir.join(&repo.id);
        if !dir.is_dir() {
            return Err(MistletoeError::IntegrityMissingDir { repo: repo.id.clone(), path: dir });
        }
        let cwd = dir.to_string_lossy().to_string();
        if !scm.inside_worktree(&cwd) {
            return Err(MistletoeError::IntegrityNotARepo { repo: repo.id.clone(), path: dir });
        }
        let actual = scm.remote_url(&cwd, Some(&repo.id))?;
        if actual != repo.url {
            return Err(MistletoeError::IntegrityOriginMismatch {
                repo: repo.id.clone(),
                expected: repo.url.clone(),
                actual,
            });
        }
    }
    Ok(())
}

/// Ask whether to adopt a discovered parent manifest rather than writing a
/// fresh one in place. Skipped entirely under `--yes` (auto-adopt).
pub fn confirm_adoption(io: &mut Io<'_>, source: &Source, auto_yes: bool) -> Result<bool, MistletoeError> {
    let path = source.path().map(|p| p.display().to_string()).unwrap_or_else(|| "<stdin>".to_string());
    confirm(io, &format!("Use existing manifest at {path} for this workspace?"), auto_yes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn explicit_file_takes_precedence_over_cwd() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(DEFAULT_FILENAME), r#"{"repositories":[]}"#).unwrap();
        let explicit = tmp.path().join("other.json");
        std::fs::write(&explicit, r#"{"repositories":[{"id":"x","url":"https://example.com/x.git"}]}"#).unwrap();

        let scm = ScmDriver::new("git".into(), false);
        let mut stdin: Cursor<&[u8]> = Cursor::new(b"");
        let located = locate(Some(&explicit), false, false, tmp.path(), &scm, &mut stdin, false).unwrap();
        assert_eq!(located.manifest.repositories.len(), 1);
        assert_eq!(located.source, Source::ExplicitPath(explicit));
    }

    #[test]
    fn stdin_wins_over_explicit_file_unless_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let explicit = tmp.path().join("other.json");
        std::fs::write(&explicit, r#"{"repositories":[]}"#).unwrap();

        let scm = ScmDriver::new("git".into(), false);
        let data = br#"{"repositories":[{"id":"y","url":"https://example.com/y.git"}]}"#;
        let mut stdin: Cursor<&[u8]> = Cursor::new(data);
        let located = locate(Some(&explicit), true, false, tmp.path(), &scm, &mut stdin, false).unwrap();
        assert_eq!(located.manifest.repositories[0].id, "y");
        assert_eq!(located.source, Source::Stdin);
    }

    #[test]
    fn ignore_stdin_falls_through_to_explicit_file() {
        let tmp = tempfile::tempdir().unwrap();
        let explicit = tmp.path().join("other.json");
        std::fs::write(&explicit, r#"{"repositories":[]}"#).unwrap();

        let scm = ScmDriver::new("git".into(), false);
        let mut stdin: Cursor<&[u8]> = Cursor::new(b"garbage");
        let located = locate(Some(&explicit), true, true, tmp.path(), &scm, &mut stdin, false).unwrap();
        assert_eq!(located.source, Source::ExplicitPath(explicit));
    }

    #[test]
    fn missing_manifest_anywhere_is_file_not_found() {
        let tmp = tempfile::tempdir().unwrap();
        let scm = ScmDriver::new("git".into(), false);
        let mut stdin: Cursor<&[u8]> = Cursor::new(b"");
        let err = locate(None, false, false, tmp.path(), &scm, &mut stdin, false).unwrap_err();
        assert!(matches!(err, MistletoeError::ConfigFileNotFound { .. }));
    }

    #[test]
    fn discovers_and_adopts_manifest_in_worktree_parent() {
        use std::process::Command;

        let tmp = tempfile::tempdir().unwrap();
        let parent = tmp.path().join("workspace");
        std::fs::create_dir(&parent).unwrap();
        let repo_dir = parent.join("r");
        std::fs::create_dir(&repo_dir).unwrap();
        let run = |args: &[&str]| {
            Command::new("git").args(args).current_dir(&repo_dir).output().unwrap();
        };
        run(&["init", "-q"]);
        run(&["remote", "add", "origin", "https://example.com/r.git"]);
        std::fs::write(parent.join(DEFAULT_FILENAME), r#"{"repositories":[{"id":"r","url":"https://example.com/r.git"}]}"#).unwrap();

        let scm = ScmDriver::new("git".into(), false);
        let mut stdin: Cursor<&[u8]> = Cursor::new(b"");
        let located = locate(None, false, false, &repo_dir, &scm, &mut stdin, true).unwrap();
        assert_eq!(located.manifest.repositories[0].id, "r");
        assert_eq!(located.source.path(), Some(parent.join(DEFAULT_FILENAME).as_path()));
    }

    #[test]
    fn declining_adoption_falls_through_to_not_found() {
        use std::process::Command;

        let tmp = tempfile::tempdir().unwrap();
        let parent = tmp.path().join("workspace");
        std::fs::create_dir(&parent).unwrap();
        let repo_dir = parent.join("r");
        std::fs::create_dir(&repo_dir).unwrap();
        let run = |args: &[&str]| {
            Command::new("git").args(args).current_dir(&repo_dir).output().unwrap();
        };
        run(&["init", "-q"]);
        run(&["remote", "add", "origin", "https://example.com/r.git"]);
        std::fs::write(parent.join(DEFAULT_FILENAME), r#"{"repositories":[{"id":"r","url":"https://example.com/r.git"}]}"#).unwrap();

        let scm = ScmDriver::new("git".into(), false);
        let mut stdin: Cursor<&[u8]> = Cursor::new(b"no\n");
        let err = locate(None, false, false, &repo_dir, &scm, &mut stdin, false).unwrap_err();
        assert!(matches!(err, MistletoeError::ConfigFileNotFound { .. }));
    }

    #[test]
    fn parent_validation_rejects_origin_mismatch() {
        use crate::manifest::ValidatedRepository;
        use std::process::Command;

        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("r");
        std::fs::create_dir(&dir).unwrap();
        let run = |args: &[&str]| {
            Command::new("git").args(args).current_dir(&dir).output().unwrap();
        };
        run(&["init", "-q"]);
        run(&["remote", "add", "origin", "https://example.com/actual.git"]);

        let manifest = ValidatedManifest {
            jobs: None,
            repositories: vec![ValidatedRepository {
                id: "r".into(),
                url: "https://example.com/expected.git".into(),
                branch: None,
                base_branch: None,
                revision: None,
            }],
        };
        let scm = ScmDriver::new("git".into(), false);
        let err = validate_parent_adoption(&manifest, tmp.path(), &scm).unwrap_err();
        assert!(matches!(err, MistletoeError::IntegrityOriginMismatch { .. }));
    }
}
