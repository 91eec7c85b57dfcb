//! `status` protocol (§4.H) — report a normalised status row per repository.
//! Non-strict: never gates on preconditions, only surfaces the flags.

use std::path::{Path, PathBuf};

use crate::cli::StatusArgs;
use crate::commands::common;
use crate::error::MistletoeError;
use crate::status;

fn flags(row: &status::StatusRow) -> String {
    let mut flags = Vec::new();
    if row.is_missing {
        flags.push("missing");
    }
    if row.is_detached {
        flags.push("detached");
    }
    if row.branch_mismatch {
        flags.push("branch-mismatch");
    }
    if row.has_conflict {
        flags.push("conflict");
    }
    if row.has_uncommitted {
        flags.push("dirty");
    }
    if row.is_ahead {
        flags.push("ahead");
    }
    if row.is_behind {
        flags.push("behind");
    }
    if flags.is_empty() {
        "clean".to_string()
    } else {
        flags.join(",")
    }
}

pub fn run(git_path: Option<PathBuf>, args: StatusArgs, cwd: &Path) -> Result<(), MistletoeError> {
    let file = args.file.resolve()?;
    let jobs_flag = args.jobs.resolve()?;
    let ctx = common::build_context(git_path, file, jobs_flag, args.verbose.verbose, false, true, cwd)?;

    let results = status::collect(&ctx.scm, &ctx.manifest.repositories, &ctx.base_dir, ctx.jobs, true);
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result?);
    }
    rows.sort_by(|a, b| a.repo_id.cmp(&b.repo_id));

    for row in &rows {
        println!("{}\t{}\t{}", row.repo_id, row.local_branch, flags(row));
    }

    Ok(())
}
