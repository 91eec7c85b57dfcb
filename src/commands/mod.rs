//! Subcommand protocols (§4.H). Each submodule implements one command's
//! two-phase verify-then-execute flow on top of the shared skeleton in
//! [`common`].

pub mod common;
pub mod fire;
pub mod init;
pub mod push;
pub mod reset;
pub mod snapshot;
pub mod status;
pub mod switch;
pub mod sync;

use std::path::Path;

use crate::cli::{Cli, Command};
use crate::error::MistletoeError;

/// Dispatch a parsed [`Cli`] invocation to its protocol, running against
/// the given working directory.
pub fn dispatch(cli: Cli, cwd: &Path) -> Result<(), MistletoeError> {
    let git_path = cli.git_path;
    match cli.command {
        Command::Init(args) => init::run(git_path, args, cwd),
        Command::Snapshot(args) => snapshot::run(git_path, args, cwd),
        Command::Sync(args) => sync::run(git_path, args, cwd),
        Command::Push(args) => push::run(git_path, args, cwd),
        Command::Switch(args) => switch::run(git_path, args, cwd),
        Command::Status(args) => status::run(git_path, args, cwd),
        Command::Reset(args) => reset::run(git_path, args, cwd),
        Command::Fire(args) => fire::run(git_path, args, cwd),
    }
}
