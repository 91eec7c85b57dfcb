//! `fire` protocol (§4.H) — emergency-commit and push every repository to a
//! throwaway branch. Best-effort: every failure is logged and the affected
//! repository is skipped, never propagated as a fatal command error.

use std::path::{Path, PathBuf};

use rand::RngCore;

use crate::cli::FireArgs;
use crate::commands::common;
use crate::error::MistletoeError;
use crate::manifest::ValidatedRepository;
use crate::pool;
use crate::scm::ScmDriver;

fn random_suffix() -> String {
    let mut buf = [0u8; 4];
    match rand::rngs::OsRng.try_fill_bytes(&mut buf) {
        Ok(()) => hex::encode(buf),
        Err(_) => "emergency".to_string(),
    }
}

fn sanitize_username(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-')).collect();
    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}

fn current_username() -> String {
    let raw = std::env::var("USER").or_else(|_| std::env::var("USERNAME")).unwrap_or_default();
    sanitize_username(&raw)
}

fn fire_one(scm: &ScmDriver, repo: &ValidatedRepository, base_dir: &Path, username: &str) {
    let dir = base_dir.join(&repo.id);
    if !dir.is_dir() {
        log::error!("{}: directory missing, skipping", repo.id);
        return;
    }
    let cwd = dir.to_string_lossy().to_string();
    let id = repo.id.as_str();

    let start_point = match scm.current_head(&cwd, Some(id)) {
        Ok(sha) => sha,
        Err(e) => {
            log::error!("{}: {e}", repo.id);
            return;
        }
    };

    let mut suffix = random_suffix();

    for attempt in 0..5u32 {
        // A new suffix is only minted after a push failure; a remote-name
        // collision is resolved by appending `-<k>` to the same suffix.
        if attempt > 0 {
            suffix = random_suffix();
        }

        let mut name = None;
        for k in 0..=4u32 {
            let candidate = if k == 0 {
                format!("mstl-fire-{}-{username}-{suffix}", repo.id)
            } else {
                format!("mstl-fire-{}-{username}-{suffix}-{k}", repo.id)
            };
            match scm.remote_branch_exists(&cwd, Some(id), &candidate) {
                Ok(true) => continue,
                Ok(false) => {
                    name = Some(candidate);
                    break;
                }
                Err(e) => {
                    log::error!("{}: {e}", repo.id);
                    return;
                }
            }
        }

        let name = match name {
            Some(name) => name,
            None => {
                log::warn!("{}: every candidate branch name already exists remotely, retrying with a new suffix", repo.id);
                continue;
            }
        };

        if let Err(e) = scm.checkout_new(&cwd, Some(id), &name, Some(&start_point)) {
            log::error!("{}: {e}", repo.id);
            return;
        }
        if let Err(e) = scm.add_all(&cwd, Some(id)) {
            log::error!("{}: {e}", repo.id);
            return;
        }
        if let Err(e) = scm.commit(&cwd, Some(id), "Emergency commit via fire") {
            log::error!("{}: {e}", repo.id);
            return;
        }

        match scm.push_new_branch(&cwd, Some(id), &name) {
            Ok(()) => return,
            Err(e) => log::warn!("{}: push attempt {attempt} failed: {e}", repo.id),
        }
    }

    log::error!("{}: fire exhausted all push attempts", repo.id);
}

pub fn run(git_path: Option<PathBuf>, _args: FireArgs, cwd: &Path) -> Result<(), MistletoeError> {
    let ctx = common::build_context(git_path, None, None, false, false, true, cwd)?;
    let username = current_username();

    pool::run_indexed(ctx.jobs, ctx.manifest.repositories.len(), |i| {
        fire_one(&ctx.scm, &ctx.manifest.repositories[i], &ctx.base_dir, &username);
        Ok::<(), MistletoeError>(())
    });

    Ok(())
}
