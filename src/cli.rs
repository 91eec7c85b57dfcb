//! CLI surface (§6) — clap derive definitions plus the flag-precedence
//! reconciliation step clap itself cannot express: short and long forms of
//! the same setting may both be given, but only if identical.
//!
//! Grounded on the teacher's `cli::Cli` derive tree (one `Args` struct per
//! reusable flag group, flattened into each subcommand), adapted because
//! the teacher never needs two destinations for one logical flag — here
//! `-f`/`--file` and `-j`/`--jobs` are deliberately split into independent
//! fields so mismatches can be detected after parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::error::MistletoeError;

#[derive(Parser, Debug)]
#[command(name = "mistletoe", version, about = "Drive bulk operations across a declarative workspace of git working copies")]
pub struct Cli {
    /// Full path to the source-control binary (overrides GIT_EXEC_PATH).
    #[arg(long = "git-path", global = true, value_name = "PATH")]
    pub git_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clone every repository in the manifest that isn't already on disk.
    Init(InitArgs),
    /// Capture the exact revision set of every repository on disk.
    Snapshot(SnapshotArgs),
    /// Pull every repository that is behind its upstream.
    Sync(SyncArgs),
    /// Push every repository with unpushed local commits.
    Push(PushArgs),
    /// Switch every repository to the named branch.
    Switch(SwitchArgs),
    /// Report a normalised status row per repository.
    Status(StatusArgs),
    /// Reset every repository to its configured target.
    Reset(ResetArgs),
    /// Emergency-commit and push every repository to a throwaway branch.
    Fire(FireArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct FileFlag {
    #[arg(short = 'f', value_name = "FILE")]
    pub file_short: Option<String>,
    #[arg(long = "file", value_name = "FILE")]
    pub file_long: Option<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct JobsFlag {
    #[arg(short = 'j', value_name = "N")]
    pub jobs_short: Option<u32>,
    #[arg(long = "jobs", value_name = "N")]
    pub jobs_long: Option<u32>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct VerboseFlag {
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct YesFlag {
    #[arg(short = 'y', long = "yes")]
    pub yes: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct IgnoreStdinFlag {
    #[arg(long = "ignore-stdin")]
    pub ignore_stdin: bool,
}

#[derive(Args, Debug)]
pub struct InitArgs {
    #[command(flatten)]
    pub file: FileFlag,
    #[command(flatten)]
    pub jobs: JobsFlag,
    #[command(flatten)]
    pub verbose: VerboseFlag,
    #[command(flatten)]
    pub yes: YesFlag,
    #[command(flatten)]
    pub ignore_stdin: IgnoreStdinFlag,
}

#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub file: FileFlag,
    #[command(flatten)]
    pub verbose: VerboseFlag,
    /// Override the default `mistletoe-snapshot-<id>.json` output path.
    #[arg(short = 'o', long = "output", value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub file: FileFlag,
    #[command(flatten)]
    pub jobs: JobsFlag,
    #[command(flatten)]
    pub verbose: VerboseFlag,
    #[command(flatten)]
    pub yes: YesFlag,
    #[command(flatten)]
    pub ignore_stdin: IgnoreStdinFlag,
}

#[derive(Args, Debug)]
pub struct PushArgs {
    #[command(flatten)]
    pub file: FileFlag,
    #[command(flatten)]
    pub jobs: JobsFlag,
    #[command(flatten)]
    pub verbose: VerboseFlag,
    #[command(flatten)]
    pub yes: YesFlag,
    #[command(flatten)]
    pub ignore_stdin: IgnoreStdinFlag,
}

#[derive(Args, Debug)]
pub struct SwitchArgs {
    #[command(flatten)]
    pub file: FileFlag,
    #[command(flatten)]
    pub jobs: JobsFlag,
    #[command(flatten)]
    pub verbose: VerboseFlag,
    #[command(flatten)]
    pub yes: YesFlag,
    /// The branch every repository should end up on.
    pub branch: String,
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub file: FileFlag,
    #[command(flatten)]
    pub jobs: JobsFlag,
    #[command(flatten)]
    pub verbose: VerboseFlag,
}

#[derive(Args, Debug)]
pub struct ResetArgs {
    #[command(flatten)]
    pub file: FileFlag,
    #[command(flatten)]
    pub jobs: JobsFlag,
    #[command(flatten)]
    pub verbose: VerboseFlag,
    #[command(flatten)]
    pub yes: YesFlag,
    #[command(flatten)]
    pub ignore_stdin: IgnoreStdinFlag,
}

/// `fire` takes no flags at all (§6); it behaves as if `--yes` were always set.
#[derive(Args, Debug)]
pub struct FireArgs {}

impl Cli {
    /// Whether `-v`/`--verbose` was given to the selected subcommand
    /// (§A: this is read once, before dispatch, to configure `env_logger`).
    pub fn verbose(&self) -> bool {
        match &self.command {
            Command::Init(a) => a.verbose.verbose,
            Command::Snapshot(a) => a.verbose.verbose,
            Command::Sync(a) => a.verbose.verbose,
            Command::Push(a) => a.verbose.verbose,
            Command::Switch(a) => a.verbose.verbose,
            Command::Status(a) => a.verbose.verbose,
            Command::Reset(a) => a.verbose.verbose,
            Command::Fire(_) => false,
        }
    }
}

/// Reconcile a short/long pair into a single value, per §6's "short and long
/// flags for the same setting may both appear, but only if identical".
pub fn reconcile<T>(flag: &'static str, short: Option<T>, long: Option<T>) -> Result<Option<T>, MistletoeError>
where
    T: PartialEq + ToString,
{
    match (short, long) {
        (None, None) => Ok(None),
        (Some(s), None) => Ok(Some(s)),
        (None, Some(l)) => Ok(Some(l)),
        (Some(s), Some(l)) if s == l => Ok(Some(s)),
        (Some(s), Some(l)) => Err(MistletoeError::FlagConflict { flag, short: s.to_string(), long: l.to_string() }),
    }
}

impl FileFlag {
    pub fn resolve(self) -> Result<Option<String>, MistletoeError> {
        reconcile("file", self.file_short, self.file_long)
    }
}

impl JobsFlag {
    pub fn resolve(self) -> Result<Option<u32>, MistletoeError> {
        reconcile("jobs", self.jobs_short, self.jobs_long)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_short_and_long_values_reconcile() {
        assert_eq!(reconcile("file", Some("foo".to_string()), Some("foo".to_string())).unwrap(), Some("foo".to_string()));
    }

    #[test]
    fn differing_short_and_long_values_conflict() {
        let err = reconcile("file", Some("foo".to_string()), Some("bar".to_string())).unwrap_err();
        assert!(matches!(err, MistletoeError::FlagConflict { .. }));
    }

    #[test]
    fn either_form_alone_is_accepted() {
        assert_eq!(reconcile::<String>("file", Some("foo".to_string()), None).unwrap(), Some("foo".to_string()));
        assert_eq!(reconcile::<String>("file", None, Some("foo".to_string())).unwrap(), Some("foo".to_string()));
        assert_eq!(reconcile::<String>("file", None, None).unwrap(), None);
    }
}
