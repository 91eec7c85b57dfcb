//! `push` protocol (§4.H) — push every repository with unpushed commits.
//! Per-repository push failures are reported but never abort the rest.

use std::path::{Path, PathBuf};

use crate::cli::PushArgs;
use crate::commands::common;
use crate::confirm;
use crate::error::MistletoeError;
use crate::status;
use crate::validate::{self, Policy};

pub fn run(git_path: Option<PathBuf>, args: PushArgs, cwd: &Path) -> Result<(), MistletoeError> {
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

    validate::check(&rows, Policy::push())?;

    let unpushed: Vec<_> = rows.iter().filter(|r| r.has_unpushed).collect();
    if unpushed.is_empty() {
        return Ok(());
    }

    {
        let mut lock = std::io::stdin().lock();
        let mut stderr = std::io::stderr();
        let mut io = common::real_io(&mut lock, &mut stderr);
        let question = format!("Push {} repository/repositories with unpushed commits?", unpushed.len());
        if !confirm::confirm(&mut io, &question, ctx.yes)? {
            return Err(MistletoeError::UserAborted);
        }
    }

    for row in &unpushed {
        let cwd = row.dir.to_string_lossy().to_string();
        if let Err(e) = ctx.scm.push_interactive(&cwd, Some(&row.repo_id), &row.local_branch) {
            log::error!("{}: push failed: {e}", row.repo_id);
        }
    }

    Ok(())
}
