//! `sync` protocol (§4.H) — pull every repository that is behind, prompting
//! for a merge/rebase strategy when any repository has also diverged.

use std::path::{Path, PathBuf};

use crate::cli::SyncArgs;
use crate::commands::common;
use crate::confirm::{self, SyncChoice};
use crate::error::MistletoeError;
use crate::status;
use crate::validate::{self, Policy};

pub fn run(git_path: Option<PathBuf>, args: SyncArgs, cwd: &Path) -> Result<(), MistletoeError> {
    let file = args.file.resolve()?;
    let jobs_flag = args.jobs.resolve()?;
    let ctx = common::build_context(
        git_path,
        file,
        jobs_flag,
        args.verbose.verbose,
        args.ignore_stdin.ignore_stdin,
        args.yes.yes,
        cwd,
    )?;
    common::integrity_check(&ctx)?;

    let results = status::collect(&ctx.scm, &ctx.manifest.repositories, &ctx.base_dir, ctx.jobs, true);
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result?);
    }

    validate::check(&rows, Policy::sync())?;

    let pullable: Vec<_> = rows.iter().filter(|r| r.is_pullable).collect();
    if pullable.is_empty() {
        return Ok(());
    }

    let diverged = pullable.iter().any(|r| r.is_ahead);

    let choice = if diverged {
        let mut lock = std::io::stdin().lock();
        let mut stderr = std::io::stderr();
        let mut io = common::real_io(&mut lock, &mut stderr);
        confirm::ask_sync_strategy(&mut io, ctx.yes)?
    } else {
        SyncChoice::Merge
    };

    if choice == SyncChoice::Abort {
        return Err(MistletoeError::UserAborted);
    }

    let rebase = choice == SyncChoice::Rebase;
    for row in &pullable {
        let cwd = row.dir.to_string_lossy().to_string();
        ctx.scm.pull_interactive(&cwd, Some(&row.repo_id), rebase)?;
    }

    Ok(())
}
