//! `reset` protocol (§4.H) — two-phase: verify every target resolves and
//! shares history with HEAD, confirm, then reset sequentially.

use std::path::{Path, PathBuf};

use crate::cli::ResetArgs;
use crate::commands::common;
use crate::confirm;
use crate::error::MistletoeError;
use crate::manifest::ValidatedRepository;
use crate::pool;
use crate::scm::ScmDriver;

struct ResetPlan {
    repo_id: String,
    dir: PathBuf,
    local_branch: String,
    target: String,
}

fn verify_one(scm: &ScmDriver, repo: &ValidatedRepository, base_dir: &Path) -> Result<ResetPlan, MistletoeError> {
    let dir = base_dir.join(&repo.id);
    let cwd = dir.to_string_lossy().to_string();
    let id = repo.id.as_str();

    let target = repo
        .reset_target()
        .ok_or_else(|| MistletoeError::ResetNoTarget { repo: repo.id.clone() })?
        .to_string();

    let resolved = match scm.resolve_ref(&cwd, Some(id), &target)? {
        Some(sha) => sha,
        None => {
            let _ = scm
                .fetch(&cwd, Some(id), Some(&target))
                .or_else(|_| scm.fetch(&cwd, Some(id), None));

            match scm.resolve_ref(&cwd, Some(id), &target)? {
                Some(sha) => sha,
                None => {
                    let origin_ref = format!("origin/{target}");
                    scm.resolve_ref(&cwd, Some(id), &origin_ref)?.ok_or_else(|| {
                        MistletoeError::ResetUnresolvedTarget { repo: repo.id.clone(), target: target.clone() }
                    })?
                }
            }
        }
    };

    if scm.merge_base(&cwd, Some(id), "HEAD", &resolved)?.is_none() {
        return Err(MistletoeError::ResetUnrelatedHistory { repo: repo.id.clone() });
    }

    let local_branch = scm.current_branch(&cwd, Some(id))?.unwrap_or_else(|| "detached".to_string());

    Ok(ResetPlan { repo_id: repo.id.clone(), dir, local_branch, target: resolved })
}

pub fn run(git_path: Option<PathBuf>, args: ResetArgs, cwd: &Path) -> Result<(), MistletoeError> {
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

    let results = pool::run_indexed(ctx.jobs, ctx.manifest.repositories.len(), |i| {
        verify_one(&ctx.scm, &ctx.manifest.repositories[i], &ctx.base_dir)
    });

    let mut plans = Vec::with_capacity(results.len());
    for result in results {
        plans.push(result?);
    }

    {
        let mut lock = std::io::stdin().lock();
        let mut stderr = std::io::stderr();
        let mut io = common::real_io(&mut lock, &mut stderr);
        for plan in &plans {
            eprintln!("{}\t{}\t{}", plan.repo_id, plan.local_branch, plan.target);
        }
        if !confirm::confirm(&mut io, "Reset the above repositories to their resolved targets?", ctx.yes)? {
            return Err(MistletoeError::UserAborted);
        }
    }

    for plan in &plans {
        let cwd = plan.dir.to_string_lossy().to_string();
        ctx.scm.reset_interactive(&cwd, Some(&plan.repo_id), &plan.target)?;
    }

    Ok(())
}
