//! Status validator (§4.E) — gates mutating commands on precondition state.
//!
//! Each subcommand protocol builds a [`Policy`] describing which
//! preconditions it cares about, then calls [`check`] against the
//! collected [`StatusRow`]s. Non-strict commands (`status`, `snapshot`)
//! never build a policy; they only read the rows.

use crate::error::MistletoeError;
use crate::status::StatusRow;

/// Which preconditions a command enforces. Constructed per-protocol in
/// §4.H; a command that doesn't care about a given check simply leaves
/// the corresponding field `false`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Policy {
    pub reject_conflict: bool,
    pub reject_pullable: bool,
    pub require_named_branch: bool,
    pub require_branch_match: bool,
}

impl Policy {
    pub const fn push() -> Self {
        Policy { reject_conflict: true, reject_pullable: true, require_named_branch: true, require_branch_match: true }
    }

    pub const fn sync() -> Self {
        Policy { reject_conflict: true, reject_pullable: false, require_named_branch: false, require_branch_match: false }
    }
}

/// Returns the first violated precondition, in the order listed by §4.E.
pub fn check(rows: &[StatusRow], policy: Policy) -> Result<(), MistletoeError> {
    if policy.reject_conflict
        && let Some(row) = rows.iter().find(|r| r.has_conflict)
    {
        return Err(MistletoeError::PreconditionConflict { repo: row.repo_id.clone() });
    }

    if policy.reject_pullable
        && let Some(row) = rows.iter().find(|r| r.is_pullable)
    {
        return Err(MistletoeError::PreconditionBehind { repo: row.repo_id.clone() });
    }

    if policy.require_named_branch
        && let Some(row) = rows.iter().find(|r| r.is_detached)
    {
        return Err(MistletoeError::PreconditionDetached { repo: row.repo_id.clone() });
    }

    if policy.require_branch_match
        && let Some(row) = rows.iter().find(|r| r.branch_mismatch)
    {
        return Err(MistletoeError::PreconditionBranchMismatch {
            repo: row.repo_id.clone(),
            expected: row.expected_branch.clone().unwrap_or_default(),
            actual: row.local_branch.clone(),
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn row(repo_id: &str) -> StatusRow {
        StatusRow {
            repo_id: repo_id.to_string(),
            dir: PathBuf::new(),
            url: String::new(),
            local_branch: "main".into(),
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
            expected_branch: None,
            is_missing: false,
        }
    }

    #[test]
    fn conflict_blocks_under_any_policy_that_checks_it() {
        let rows = vec![StatusRow { has_conflict: true, ..row("a") }];
        let err = check(&rows, Policy::push()).unwrap_err();
        assert!(matches!(err, MistletoeError::PreconditionConflict { .. }));
    }

    #[test]
    fn push_blocked_by_pullable_before_any_push_would_run() {
        let rows = vec![row("behind"), StatusRow { is_pullable: true, ..row("behind") }];
        let err = check(&rows, Policy::push()).unwrap_err();
        assert!(matches!(err, MistletoeError::PreconditionBehind { .. }));
    }

    #[test]
    fn detached_blocked_only_when_named_branch_required() {
        let rows = vec![StatusRow { is_detached: true, ..row("d") }];
        assert!(check(&rows, Policy::push()).is_err());
        assert!(check(&rows, Policy::sync()).is_ok());
    }

    #[test]
    fn non_strict_policy_never_blocks() {
        let rows = vec![StatusRow { has_conflict: true, is_pullable: true, is_detached: true, branch_mismatch: true, ..row("x") }];
        assert!(check(&rows, Policy::default()).is_ok());
    }
}
