//! Status collector (§4.D) — derives a normalised [`StatusRow`] per
//! repository by querying the SCM driver in parallel via the worker pool.
//!
//! Grounded on the teacher's `commands::list::collect` pipeline: one task
//! per piece of information (branch, upstream, ahead/behind, dirty),
//! dispatched through the pool and assembled into a single row per item —
//! except Mistletoe's row shape is fixed (no column selection), so the
//! per-field task dispatch collapses into one straight-line function per
//! repository, matching §4.D's own step list exactly.

use std::path::{Path, PathBuf};

use crate::error::MistletoeError;
use crate::manifest::ValidatedRepository;
use crate::pool;
use crate::scm::ScmDriver;

#[derive(Debug, Clone)]
pub struct StatusRow {
    pub repo_id: String,
    pub dir: PathBuf,
    pub url: String,
    pub local_branch: String,
    pub local_rev: String,
    pub remote_rev: String,
    pub remote_branch: String,
    pub is_ahead: bool,
    pub is_behind: bool,
    pub is_pullable: bool,
    pub has_unpushed: bool,
    pub has_conflict: bool,
    pub has_uncommitted: bool,
    pub is_detached: bool,
    pub branch_mismatch: bool,
    pub expected_branch: Option<String>,
    pub is_missing: bool,
}

impl StatusRow {
    fn missing(repo: &ValidatedRepository, dir: PathBuf) -> Self {
        StatusRow {
            repo_id: repo.id.clone(),
            dir,
            url: repo.url.clone(),
            local_branch: String::new(),
            local_rev: String::new(),
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
            expected_branch: repo.branch.clone(),
            is_missing: true,
        }
    }
}

/// Porcelain-v1 unmerged entries carry one of these two-char status codes
/// in the first two columns (see git-status(1), "Unmerged entries").
const UNMERGED_CODES: &[&str] = &["DD", "AU", "UD", "UA", "DU", "AA", "UU"];

fn has_unmerged_entries(porcelain: &str) -> bool {
    porcelain.lines().any(|line| {
        line.len() >= 2 && UNMERGED_CODES.contains(&&line[..2])
    })
}

fn has_worktree_modifications(porcelain: &str) -> bool {
    !porcelain.trim().is_empty()
}

fn collect_one(scm: &ScmDriver, repo: &ValidatedRepository, base_dir: &Path, fetch: bool) -> Result<StatusRow, MistletoeError> {
    let dir = base_dir.join(&repo.id);

    if !dir.is_dir() {
        return Ok(StatusRow::missing(repo, dir));
    }

    let cwd = dir.to_string_lossy().to_string();
    let id = repo.id.as_str();

    // Live `remote.origin.url`, falling back to the manifest's value if the
    // working copy has none configured (§4.I "copy URL, live ... fallback
    // to manifest").
    let url = scm.remote_url(&cwd, Some(id)).unwrap_or_else(|_| repo.url.clone());

    if fetch {
        scm.fetch(&cwd, Some(id), None)?;
    }

    let local_branch_opt = scm.current_branch(&cwd, Some(id))?;
    let is_detached = local_branch_opt.is_none();
    let local_branch = local_branch_opt.clone().unwrap_or_else(|| "detached".to_string());
    let local_rev = scm.current_head(&cwd, Some(id))?;

    let branch_mismatch = match (&repo.branch, &local_branch_opt) {
        (Some(expected), Some(actual)) => expected != actual,
        (Some(_), None) => true,
        (None, _) => false,
    };

    let mut remote_rev = String::new();
    let mut remote_branch = String::new();
    let mut is_ahead = false;
    let mut is_behind = false;

    if let Some(branch) = &local_branch_opt
        && let Some(upstream) = scm.upstream_of(&cwd, Some(id), branch)?
    {
        remote_branch = upstream.clone();
        if let Some(sha) = scm.resolve_ref(&cwd, Some(id), &upstream)? {
            remote_rev = sha;
            let (ahead, behind) = scm.ahead_behind(&cwd, Some(id), "HEAD", &upstream)?;
            is_ahead = ahead > 0;
            is_behind = behind > 0;
        }
    }

    let porcelain = scm.porcelain_status(&cwd, Some(id))?;
    let has_uncommitted = has_worktree_modifications(&porcelain);
    let has_conflict = is_ahead && is_behind && has_unmerged_entries(&porcelain);
    let has_unpushed = is_ahead;
    let is_pullable = is_behind && !has_conflict && !remote_rev.is_empty();

    Ok(StatusRow {
        repo_id: repo.id.clone(),
        dir,
        url,
        local_branch,
        local_rev,
        remote_rev,
        remote_branch,
        is_ahead,
        is_behind,
        is_pullable,
        has_unpushed,
        has_conflict,
        has_uncommitted,
        is_detached,
        branch_mismatch,
        expected_branch: repo.branch.clone(),
        is_missing: false,
    })
}

/// Collect one [`StatusRow`] per repository, in parallel via the worker
/// pool. A per-repository failure (e.g. a corrupt working copy) is
/// recorded on that slot and does not stop the rest of the set (§4.D).
pub fn collect(
    scm: &ScmDriver,
    repos: &[ValidatedRepository],
    base_dir: &Path,
    jobs: usize,
    fetch: bool,
) -> Vec<Result<StatusRow, MistletoeError>> {
    pool::run_indexed(jobs, repos.len(), |i| collect_one(scm, &repos[i], base_dir, fetch))
}
