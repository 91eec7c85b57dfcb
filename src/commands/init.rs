//! `init` protocol (§4.H) — clone every repository not already on disk.

use std::path::{Path, PathBuf};

use crate::cli::InitArgs;
use crate::commands::common::{self, Context};
use crate::confirm;
use crate::error::MistletoeError;
use crate::manifest::ValidatedRepository;
use crate::pool;
use crate::scm::ScmDriver;

fn clone_one(scm: &ScmDriver, repo: &ValidatedRepository, base_dir: &Path) -> Result<(), MistletoeError> {
    let dir = base_dir.join(&repo.id);

    if dir.is_dir() {
        log::warn!("{}: directory already exists, treating as already cloned", repo.id);
        return Ok(());
    }

    scm.clone(&dir, Some(&repo.id), &repo.url, repo.branch.as_deref())?;

    if let Some(revision) = &repo.revision {
        let cwd = dir.to_string_lossy().to_string();
        scm.checkout(&cwd, Some(&repo.id), revision)?;
    }

    Ok(())
}

/// Root-directory safety check: refuse to scatter clones into a directory
/// that already holds unrelated content and is not itself a working copy,
/// unless the user (or `--yes`) approves.
fn check_root_is_safe(ctx: &Context) -> Result<(), MistletoeError> {
    let is_empty = std::fs::read_dir(&ctx.base_dir).map(|mut it| it.next().is_none()).unwrap_or(true);
    if is_empty {
        return Ok(());
    }
    if ctx.scm.inside_worktree(&ctx.base_dir.to_string_lossy()) {
        return Ok(());
    }

    let mut lock = std::io::stdin().lock();
    let mut stderr = std::io::stderr();
    let mut io = common::real_io(&mut lock, &mut stderr);
    let question = format!(
        "{} is not empty and is not itself a working copy. Clone into it anyway?",
        ctx.base_dir.display()
    );
    if confirm::confirm(&mut io, &question, ctx.yes)? {
        Ok(())
    } else {
        Err(MistletoeError::UserAborted)
    }
}

pub fn run(git_path: Option<PathBuf>, args: InitArgs, cwd: &Path) -> Result<(), MistletoeError> {
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

    check_root_is_safe(&ctx)?;

    let results = pool::run_indexed(ctx.jobs, ctx.manifest.repositories.len(), |i| {
        clone_one(&ctx.scm, &ctx.manifest.repositories[i], &ctx.base_dir)
    });

    for result in results {
        result?;
    }
    Ok(())
}
