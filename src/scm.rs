//! SCM driver (§4.B) — the only place that spawns the external source-control
//! binary. Grounded on the teacher's `shell_exec::run` (timing + debug trace
//! around every subprocess) and `Repository::run_command_delayed_stream`
//! (verbose = inherit stdio). Never builds a shell string; argv is passed
//! literally, as the teacher's `ShellConfig::command` and `Repository`
//! helpers do for git invocations (as opposed to the teacher's *hook*
//! commands, which intentionally go through a shell).

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

use crate::error::MistletoeError;

/// Drives the external source-control binary. Stateless: every call spawns
/// a fresh child process, matching §3's "Ownership" note that the driver
/// keeps no subprocess state between invocations.
#[derive(Debug, Clone)]
pub struct ScmDriver {
    binary: PathBuf,
    verbose: bool,
}

impl ScmDriver {
    pub fn new(binary: PathBuf, verbose: bool) -> Self {
        Self { binary, verbose }
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }

    fn command(&self, cwd: &str, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        if !cwd.is_empty() {
            cmd.current_dir(cwd);
        }
        cmd
    }

    fn trace(&self, repo: Option<&str>, args: &[&str], dur_ms: f64, ok: bool) {
        let cmd_str = format!("{} {}", self.binary.display(), args.join(" "));
        match repo {
            Some(r) => log::debug!("$ {cmd_str} [{r}]"),
            None => log::debug!("$ {cmd_str}"),
        }
        match repo {
            Some(r) => log::debug!("[mistletoe-trace] repo={r} cmd=\"{cmd_str}\" dur={dur_ms:.1}ms ok={ok}"),
            None => log::debug!("[mistletoe-trace] cmd=\"{cmd_str}\" dur={dur_ms:.1}ms ok={ok}"),
        }
    }

    /// Run a command, returning trimmed stdout. In non-verbose mode, stdout
    /// and stderr are both captured (stderr surfaces in the returned error).
    /// In verbose mode, stdout/stderr are inherited so the user sees live
    /// output, and an empty string is returned on success (§4.B, §4.C).
    pub fn run(&self, cwd: &str, repo: Option<&str>, args: &[&str]) -> Result<String, MistletoeError> {
        let t0 = Instant::now();
        let mut cmd = self.command(cwd, args);

        let result = if self.verbose {
            cmd.stdin(Stdio::null()).stdout(Stdio::inherit()).stderr(Stdio::inherit());
            cmd.status().map(|status| (status.success(), status.code(), String::new(), String::new()))
        } else {
            cmd.stdin(Stdio::null());
            cmd.output().map(|out| {
                (
                    out.status.success(),
                    out.status.code(),
                    String::from_utf8_lossy(&out.stdout).trim_end().to_string(),
                    String::from_utf8_lossy(&out.stderr).to_string(),
                )
            })
        };

        let dur_ms = t0.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok((true, _, stdout, _)) => {
                self.trace(repo, args, dur_ms, true);
                Ok(stdout)
            }
            Ok((false, code, _, stderr)) => {
                self.trace(repo, args, dur_ms, false);
                Err(MistletoeError::ScmInvocation {
                    repo: repo.map(str::to_string),
                    command: format!("{} {}", self.binary.display(), args.join(" ")),
                    stderr,
                    exit_code: code,
                })
            }
            Err(e) => {
                self.trace(repo, args, dur_ms, false);
                Err(MistletoeError::Io { detail: e.to_string() })
            }
        }
    }

    /// Always inherits stdin/stdout/stderr, regardless of verbosity. Used by
    /// `pull`, `reset`, and `push` so the source-control binary can prompt
    /// for credentials or merge strategy.
    pub fn run_interactive(&self, cwd: &str, repo: Option<&str>, args: &[&str]) -> Result<(), MistletoeError> {
        let t0 = Instant::now();
        let mut cmd = self.command(cwd, args);
        cmd.stdin(Stdio::inherit()).stdout(Stdio::inherit()).stderr(Stdio::inherit());
        let result = cmd.status();
        let dur_ms = t0.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(status) if status.success() => {
                self.trace(repo, args, dur_ms, true);
                Ok(())
            }
            Ok(status) => {
                self.trace(repo, args, dur_ms, false);
                Err(MistletoeError::ScmInvocation {
                    repo: repo.map(str::to_string),
                    command: format!("{} {}", self.binary.display(), args.join(" ")),
                    stderr: String::new(),
                    exit_code: status.code(),
                })
            }
            Err(e) => {
                self.trace(repo, args, dur_ms, false);
                Err(MistletoeError::Io { detail: e.to_string() })
            }
        }
    }

    // ===================== High-level queries =====================

    pub fn resolve_ref(&self, cwd: &str, repo: Option<&str>, r: &str) -> Result<Option<String>, MistletoeError> {
        match self.run(cwd, repo, &["rev-parse", "--verify", r]) {
            Ok(sha) => Ok(Some(sha)),
            Err(MistletoeError::ScmInvocation { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn current_head(&self, cwd: &str, repo: Option<&str>) -> Result<String, MistletoeError> {
        self.run(cwd, repo, &["rev-parse", "HEAD"])
    }

    /// Returns the branch name, or `None` for detached HEAD (git's literal "HEAD").
    pub fn current_branch(&self, cwd: &str, repo: Option<&str>) -> Result<Option<String>, MistletoeError> {
        let branch = self.run(cwd, repo, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        if branch == "HEAD" { Ok(None) } else { Ok(Some(branch)) }
    }

    pub fn upstream_of(&self, cwd: &str, repo: Option<&str>, branch: &str) -> Result<Option<String>, MistletoeError> {
        let spec = format!("{branch}@{{upstream}}");
        match self.run(cwd, repo, &["rev-parse", "--abbrev-ref", &spec]) {
            Ok(upstream) => Ok(Some(upstream)),
            Err(MistletoeError::ScmInvocation { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// `(ahead, behind)` of `a` relative to `b`, via `rev-list --left-right --count a...b`.
    pub fn ahead_behind(&self, cwd: &str, repo: Option<&str>, a: &str, b: &str) -> Result<(u32, u32), MistletoeError> {
        let range = format!("{a}...{b}");
        let out = self.run(cwd, repo, &["rev-list", "--left-right", "--count", &range])?;
        let mut parts = out.split_whitespace();
        let ahead = parts.next().unwrap_or("0").parse().unwrap_or(0);
        let behind = parts.next().unwrap_or("0").parse().unwrap_or(0);
        Ok((ahead, behind))
    }

    pub fn porcelain_status(&self, cwd: &str, repo: Option<&str>) -> Result<String, MistletoeError> {
        self.run(cwd, repo, &["status", "--porcelain"])
    }

    pub fn remote_url(&self, cwd: &str, repo: Option<&str>) -> Result<String, MistletoeError> {
        self.run(cwd, repo, &["config", "--get", "remote.origin.url"])
    }

    pub fn inside_worktree(&self, cwd: &str) -> bool {
        matches!(self.run(cwd, None, &["rev-parse", "--is-inside-work-tree"]), Ok(s) if s == "true")
    }

    pub fn workspace_root(&self, cwd: &str) -> Result<PathBuf, MistletoeError> {
        self.run(cwd, None, &["rev-parse", "--show-toplevel"]).map(PathBuf::from)
    }

    pub fn fetch(&self, cwd: &str, repo: Option<&str>, refspec: Option<&str>) -> Result<(), MistletoeError> {
        match refspec {
            Some(r) => self.run(cwd, repo, &["fetch", "origin", r]).map(|_| ()),
            None => self.run(cwd, repo, &["fetch", "origin"]).map(|_| ()),
        }
    }

    pub fn clone(&self, dest_dir: &Path, repo: Option<&str>, url: &str, branch: Option<&str>) -> Result<(), MistletoeError> {
        let dest = dest_dir.to_string_lossy().to_string();
        let mut args: Vec<&str> = vec!["clone", url, &dest];
        if let Some(b) = branch {
            args.push("--branch");
            args.push(b);
        }
        self.run("", repo, &args).map(|_| ())
    }

    pub fn checkout(&self, cwd: &str, repo: Option<&str>, target: &str) -> Result<(), MistletoeError> {
        self.run(cwd, repo, &["checkout", target]).map(|_| ())
    }

    pub fn checkout_new(&self, cwd: &str, repo: Option<&str>, branch: &str, start_point: Option<&str>) -> Result<(), MistletoeError> {
        let mut args: Vec<&str> = vec!["checkout", "-b", branch];
        if let Some(sp) = start_point {
            args.push(sp);
        }
        self.run(cwd, repo, &args).map(|_| ())
    }

    pub fn add_all(&self, cwd: &str, repo: Option<&str>) -> Result<(), MistletoeError> {
        self.run(cwd, repo, &["add", "."]).map(|_| ())
    }

    pub fn commit(&self, cwd: &str, repo: Option<&str>, message: &str) -> Result<(), MistletoeError> {
        self.run(cwd, repo, &["commit", "-m", message, "--no-gpg-sign", "--allow-empty"]).map(|_| ())
    }

    pub fn push_new_branch(&self, cwd: &str, repo: Option<&str>, branch: &str) -> Result<(), MistletoeError> {
        self.run(cwd, repo, &["push", "-u", "origin", branch]).map(|_| ())
    }

    pub fn push_interactive(&self, cwd: &str, repo: Option<&str>, branch: &str) -> Result<(), MistletoeError> {
        self.run_interactive(cwd, repo, &["push", "-u", "origin", branch])
    }

    pub fn pull_interactive(&self, cwd: &str, repo: Option<&str>, rebase: bool) -> Result<(), MistletoeError> {
        if rebase {
            self.run_interactive(cwd, repo, &["pull", "--rebase"])
        } else {
            self.run_interactive(cwd, repo, &["pull", "--no-rebase"])
        }
    }

    pub fn reset_interactive(&self, cwd: &str, repo: Option<&str>, target: &str) -> Result<(), MistletoeError> {
        self.run_interactive(cwd, repo, &["reset", target])
    }

    pub fn merge_base(&self, cwd: &str, repo: Option<&str>, a: &str, b: &str) -> Result<Option<String>, MistletoeError> {
        match self.run(cwd, repo, &["merge-base", a, b]) {
            Ok(sha) => Ok(Some(sha)),
            Err(MistletoeError::ScmInvocation { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn remote_branch_exists(&self, cwd: &str, repo: Option<&str>, branch: &str) -> Result<bool, MistletoeError> {
        Ok(self.resolve_ref(cwd, repo, &format!("origin/{branch}"))?.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command as StdCommand;

    fn init_repo(dir: &Path) {
        let run = |args: &[&str]| {
            StdCommand::new("git").args(args).current_dir(dir).output().expect("git available");
        };
        run(&["init", "-q", "-b", "main"]);
        run(&["config", "user.email", "t@example.com"]);
        run(&["config", "user.name", "t"]);
        std::fs::write(dir.join("f.txt"), "one\n").unwrap();
        run(&["add", "."]);
        run(&["commit", "-q", "-m", "init"]);
    }

    #[test]
    fn current_head_and_branch_on_fresh_repo() {
        let tmp = tempfile::tempdir().unwrap();
        init_repo(tmp.path());
        let scm = ScmDriver::new(PathBuf::from("git"), false);
        let cwd = tmp.path().to_string_lossy().to_string();
        let head = scm.current_head(&cwd, None).unwrap();
        assert_eq!(head.len(), 40);
        assert_eq!(scm.current_branch(&cwd, None).unwrap(), Some("main".to_string()));
    }

    #[test]
    fn resolve_ref_returns_none_for_unknown_ref() {
        let tmp = tempfile::tempdir().unwrap();
        init_repo(tmp.path());
        let scm = ScmDriver::new(PathBuf::from("git"), false);
        let cwd = tmp.path().to_string_lossy().to_string();
        assert_eq!(scm.resolve_ref(&cwd, None, "nope-nope-nope").unwrap(), None);
    }

    #[test]
    fn porcelain_status_reports_dirty_worktree() {
        let tmp = tempfile::tempdir().unwrap();
        init_repo(tmp.path());
        let scm = ScmDriver::new(PathBuf::from("git"), false);
        let cwd = tmp.path().to_string_lossy().to_string();
        assert!(scm.porcelain_status(&cwd, None).unwrap().is_empty());
        std::fs::write(tmp.path().join("f.txt"), "two\n").unwrap();
        assert!(!scm.porcelain_status(&cwd, None).unwrap().is_empty());
    }

    #[test]
    fn scm_invocation_error_carries_stderr_and_repo() {
        let tmp = tempfile::tempdir().unwrap();
        init_repo(tmp.path());
        let scm = ScmDriver::new(PathBuf::from("git"), false);
        let cwd = tmp.path().to_string_lossy().to_string();
        let err = scm.run(&cwd, Some("r"), &["rev-parse", "--verify", "totally-bogus"]).unwrap_err();
        match err {
            MistletoeError::ScmInvocation { repo, .. } => assert_eq!(repo.as_deref(), Some("r")),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
