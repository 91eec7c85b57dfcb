//! Shared subcommand skeleton (§4.H preamble): parse flags → resolve
//! config → resolve jobs → build driver → integrity check → command body.
//! Every protocol module calls [`build_context`] first and, unless it is
//! `init`/`status`/`snapshot` (which tolerate missing directories by
//! design), follows it with [`integrity_check`].

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::confirm::Io;
use crate::error::MistletoeError;
use crate::locate::{self, Source};
use crate::manifest::ValidatedManifest;
use crate::pool;
use crate::scm::ScmDriver;

pub struct Context {
    pub manifest: ValidatedManifest,
    pub scm: ScmDriver,
    pub jobs: usize,
    pub base_dir: PathBuf,
    pub source: Source,
    pub yes: bool,
}

/// Resolve the binary the SCM driver should invoke: `--git-path` wins,
/// else `GIT_EXEC_PATH` (a directory, per §6) joined with the literal
/// binary name, else the bare name resolved via `PATH`.
fn resolve_binary(git_path: Option<PathBuf>) -> PathBuf {
    if let Some(p) = git_path {
        return p;
    }
    if let Ok(dir) = std::env::var("GIT_EXEC_PATH") {
        if !dir.is_empty() {
            return PathBuf::from(dir).join("git");
        }
    }
    PathBuf::from("git")
}

#[allow(clippy::too_many_arguments)]
pub fn build_context(
    git_path: Option<PathBuf>,
    file: Option<String>,
    jobs_flag: Option<u32>,
    verbose: bool,
    ignore_stdin: bool,
    yes: bool,
    cwd: &Path,
) -> Result<Context, MistletoeError> {
    let binary = resolve_binary(git_path);
    let scm = ScmDriver::new(binary, verbose);

    let stdin_requested = !std::io::stdin().is_terminal();
    let stdin = std::io::stdin();
    let mut stdin_lock = stdin.lock();
    let located = locate::locate(
        file.as_deref().map(Path::new),
        stdin_requested,
        ignore_stdin,
        cwd,
        &scm,
        &mut stdin_lock,
        yes,
    )?;

    let jobs = pool::resolve_jobs(jobs_flag, located.manifest.jobs, verbose)?;

    Ok(Context { manifest: located.manifest, scm, jobs, base_dir: cwd.to_path_buf(), source: located.source, yes })
}

/// Verify every repository directory exists and its origin matches the
/// manifest (§4.H "integrity check"). Reuses the same check the
/// config-locator performs when validating an adopted parent manifest.
pub fn integrity_check(ctx: &Context) -> Result<(), MistletoeError> {
    locate::validate_parent_adoption(&ctx.manifest, &ctx.base_dir, &ctx.scm)
}

/// Build a real stdin/stderr [`Io`] handle for interactive prompts.
/// `StdinLock` already implements `BufRead`, so no extra buffering layer
/// is needed; callers keep `lock`/`stderr` alive for as long as `Io` is used.
pub fn real_io<'a>(lock: &'a mut std::io::StdinLock<'static>, stderr: &'a mut std::io::Stderr) -> Io<'a> {
    Io { stdin: lock, stderr }
}
