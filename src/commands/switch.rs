//! `switch` protocol (§4.H) — move every repository onto the named branch,
//! creating it locally (optionally tracking `origin/<branch>`) if needed.

use std::path::{Path, PathBuf};

use crate::cli::SwitchArgs;
use crate::commands::common;
use crate::error::MistletoeError;
use crate::manifest::ValidatedRepository;
use crate::pool;
use crate::scm::ScmDriver;

fn switch_one(scm: &ScmDriver, repo: &ValidatedRepository, base_dir: &Path, branch: &str) -> Result<(), MistletoeError> {
    let dir = base_dir.join(&repo.id);
    let cwd = dir.to_string_lossy().to_string();
    let id = repo.id.as_str();

    let local_ref = format!("refs/heads/{branch}");
    if scm.resolve_ref(&cwd, Some(id), &local_ref)?.is_some() {
        return scm.checkout(&cwd, Some(id), branch);
    }

    if scm.remote_branch_exists(&cwd, Some(id), branch)? {
        let remote = format!("origin/{branch}");
        return scm.checkout_new(&cwd, Some(id), branch, Some(&remote));
    }

    scm.checkout_new(&cwd, Some(id), branch, None)
}

pub fn run(git_path: Option<PathBuf>, args: SwitchArgs, cwd: &Path) -> Result<(), MistletoeError> {
    let file = args.file.resolve()?;
    let jobs_flag = args.jobs.resolve()?;
    let ctx = common::build_context(
        git_path,
        file,
        jobs_flag,
        args.verbose.verbose,
        false,
        args.yes.yes,
        cwd,
    )?;
    common::integrity_check(&ctx)?;

    let branch = args.branch;
    let results = pool::run_indexed(ctx.jobs, ctx.manifest.repositories.len(), |i| {
        switch_one(&ctx.scm, &ctx.manifest.repositories[i], &ctx.base_dir, &branch)
    });

    for result in results {
        result?;
    }
    Ok(())
}
