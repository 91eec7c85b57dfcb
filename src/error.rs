//! Error kinds shared across every subsystem.
//!
//! Mirrors the teacher CLI's `GitError`: one hand-written enum with a manual
//! `Display` impl, not a `thiserror` derive. `anyhow::Result` is used at the
//! command/`main` boundary for context; this enum is what actually travels
//! between subsystems and what the worker pool stores per repository.

use std::path::PathBuf;

#[derive(Debug)]
pub enum MistletoeError {
    ConfigFileNotFound { path: PathBuf },
    ConfigInvalidFormat { detail: String },
    ConfigInvalidId { id: String },
    ConfigInvalidUrl { id: String, url: String },
    ConfigInvalidRef { id: String, field: &'static str, value: String },
    ConfigDuplicateId { id: String },

    FlagParse { detail: String },
    FlagConflict { flag: &'static str, short: String, long: String },
    FlagOutOfRange { flag: &'static str, value: String },

    IntegrityMissingDir { repo: String, path: PathBuf },
    IntegrityNotARepo { repo: String, path: PathBuf },
    IntegrityOriginMismatch { repo: String, expected: String, actual: String },

    PreconditionConflict { repo: String },
    PreconditionBehind { repo: String },
    PreconditionDetached { repo: String },
    PreconditionBranchMismatch { repo: String, expected: String, actual: String },
    PreconditionDirty { repo: String },

    ResetUnresolvedTarget { repo: String, target: String },
    ResetUnrelatedHistory { repo: String },
    ResetNoTarget { repo: String },

    ScmInvocation { repo: Option<String>, command: String, stderr: String, exit_code: Option<i32> },

    UserAborted,
    UserInputRequired { detail: String },

    Io { detail: String },
}

impl MistletoeError {
    /// The repository this error concerns, if any — used by commands to
    /// render the "<question> (yes/no): " style one-line reports from §7.
    pub fn repo(&self) -> Option<&str> {
        match self {
            MistletoeError::ConfigInvalidId { id } => Some(id),
            MistletoeError::ConfigInvalidUrl { id, .. } => Some(id),
            MistletoeError::ConfigInvalidRef { id, .. } => Some(id),
            MistletoeError::ConfigDuplicateId { id } => Some(id),
            MistletoeError::IntegrityMissingDir { repo, .. } => Some(repo),
            MistletoeError::IntegrityNotARepo { repo, .. } => Some(repo),
            MistletoeError::IntegrityOriginMismatch { repo, .. } => Some(repo),
            MistletoeError::PreconditionConflict { repo } => Some(repo),
            MistletoeError::PreconditionBehind { repo } => Some(repo),
            MistletoeError::PreconditionDetached { repo } => Some(repo),
            MistletoeError::PreconditionBranchMismatch { repo, .. } => Some(repo),
            MistletoeError::PreconditionDirty { repo } => Some(repo),
            MistletoeError::ResetUnresolvedTarget { repo, .. } => Some(repo),
            MistletoeError::ResetUnrelatedHistory { repo } => Some(repo),
            MistletoeError::ResetNoTarget { repo } => Some(repo),
            MistletoeError::ScmInvocation { repo, .. } => repo.as_deref(),
            _ => None,
        }
    }

    /// Short symbolic kind name, used in the single stderr line §7 mandates:
    /// "<repository>: <kind>: <detail>".
    pub fn kind(&self) -> &'static str {
        match self {
            MistletoeError::ConfigFileNotFound { .. } => "ConfigFileNotFound",
            MistletoeError::ConfigInvalidFormat { .. } => "ConfigInvalidFormat",
            MistletoeError::ConfigInvalidId { .. } => "ConfigInvalidID",
            MistletoeError::ConfigInvalidUrl { .. } => "ConfigInvalidURL",
            MistletoeError::ConfigInvalidRef { .. } => "ConfigInvalidRef",
            MistletoeError::ConfigDuplicateId { .. } => "ConfigDuplicateID",
            MistletoeError::FlagParse { .. } => "FlagParse",
            MistletoeError::FlagConflict { .. } => "FlagConflict",
            MistletoeError::FlagOutOfRange { .. } => "FlagOutOfRange",
            MistletoeError::IntegrityMissingDir { .. } => "IntegrityMissingDir",
            MistletoeError::IntegrityNotARepo { .. } => "IntegrityNotARepo",
            MistletoeError::IntegrityOriginMismatch { .. } => "IntegrityOriginMismatch",
            MistletoeError::PreconditionConflict { .. } => "PreconditionConflict",
            MistletoeError::PreconditionBehind { .. } => "PreconditionBehind",
            MistletoeError::PreconditionDetached { .. } => "PreconditionDetached",
            MistletoeError::PreconditionBranchMismatch { .. } => "PreconditionBranchMismatch",
            MistletoeError::PreconditionDirty { .. } => "PreconditionDirty",
            MistletoeError::ResetUnresolvedTarget { .. } => "ResetUnresolvedTarget",
            MistletoeError::ResetUnrelatedHistory { .. } => "ResetUnrelatedHistory",
            MistletoeError::ResetNoTarget { .. } => "ResetNoTarget",
            MistletoeError::ScmInvocation { .. } => "ScmInvocation",
            MistletoeError::UserAborted => "UserAborted",
            MistletoeError::UserInputRequired { .. } => "UserInputRequired",
            MistletoeError::Io { .. } => "IO",
        }
    }
}

impl std::fmt::Display for MistletoeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MistletoeError::ConfigFileNotFound { path } => {
                write!(f, "manifest not found: {}", path.display())
            }
            MistletoeError::ConfigInvalidFormat { detail } => {
                write!(f, "invalid manifest: {detail}")
            }
            MistletoeError::ConfigInvalidId { id } => {
                write!(f, "{id}: invalid repository id")
            }
            MistletoeError::ConfigInvalidUrl { id, url } => {
                write!(f, "{id}: invalid url {url:?}")
            }
            MistletoeError::ConfigInvalidRef { id, field, value } => {
                write!(f, "{id}: invalid {field} {value:?}")
            }
            MistletoeError::ConfigDuplicateId { id } => {
                write!(f, "{id}: duplicate repository id")
            }
            MistletoeError::FlagParse { detail } => write!(f, "{detail}"),
            MistletoeError::FlagConflict { flag, short, long } => {
                write!(f, "conflicting values for --{flag}: -{short} vs --{flag}={long}")
            }
            MistletoeError::FlagOutOfRange { flag, value } => {
                write!(f, "--{flag}={value} is out of range")
            }
            MistletoeError::IntegrityMissingDir { repo, path } => {
                write!(f, "{repo}: directory missing: {}", path.display())
            }
            MistletoeError::IntegrityNotARepo { repo, path } => {
                write!(f, "{repo}: not a working copy: {}", path.display())
            }
            MistletoeError::IntegrityOriginMismatch { repo, expected, actual } => {
                write!(f, "{repo}: origin mismatch: expected {expected}, found {actual}")
            }
            MistletoeError::PreconditionConflict { repo } => {
                write!(f, "{repo}: has unresolved conflicts")
            }
            MistletoeError::PreconditionBehind { repo } => {
                write!(f, "{repo}: behind upstream, pull before continuing")
            }
            MistletoeError::PreconditionDetached { repo } => {
                write!(f, "{repo}: detached HEAD, expected a named branch")
            }
            MistletoeError::PreconditionBranchMismatch { repo, expected, actual } => {
                write!(f, "{repo}: on branch {actual}, expected {expected}")
            }
            MistletoeError::PreconditionDirty { repo } => {
                write!(f, "{repo}: has uncommitted changes")
            }
            MistletoeError::ResetUnresolvedTarget { repo, target } => {
                write!(f, "{repo}: could not resolve reset target {target:?}")
            }
            MistletoeError::ResetUnrelatedHistory { repo } => {
                write!(f, "{repo}: target has unrelated history")
            }
            MistletoeError::ResetNoTarget { repo } => {
                write!(f, "{repo}: no revision, base_branch, or branch set")
            }
            MistletoeError::ScmInvocation { repo, command, stderr, exit_code } => {
                let prefix = repo.as_deref().unwrap_or("<none>");
                let code = exit_code.map(|c| c.to_string()).unwrap_or_else(|| "signal".into());
                write!(f, "{prefix}: `{command}` failed (exit {code}): {stderr}")
            }
            MistletoeError::UserAborted => write!(f, "Aborted"),
            MistletoeError::UserInputRequired { detail } => write!(f, "input required: {detail}"),
            MistletoeError::Io { detail } => write!(f, "{detail}"),
        }
    }
}

impl std::error::Error for MistletoeError {}
