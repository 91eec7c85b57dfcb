//! `snapshot` protocol (§4.H, §4.I) — capture the live revision set of
//! every repository on disk and write it to a deterministically-named file.

use std::path::{Path, PathBuf};

use crate::cli::SnapshotArgs;
use crate::commands::common;
use crate::error::MistletoeError;
use crate::snapshot;
use crate::status;

pub fn run(git_path: Option<PathBuf>, args: SnapshotArgs, cwd: &Path) -> Result<(), MistletoeError> {
    let file = args.file.resolve()?;
    let ctx = common::build_context(git_path, file, None, args.verbose.verbose, false, true, cwd)?;

    let results = status::collect(&ctx.scm, &ctx.manifest.repositories, &ctx.base_dir, ctx.jobs, false);
    let mut rows = Vec::with_capacity(results.len());
    for result in results {
        rows.push(result?);
    }

    let snap = snapshot::build(&rows);
    let rendered = snapshot::render(&snap)?;

    let output_path = args
        .output
        .unwrap_or_else(|| cwd.join(format!("mistletoe-snapshot-{}.json", snap.identifier)));

    std::fs::write(&output_path, rendered).map_err(|e| MistletoeError::Io { detail: e.to_string() })?;
    println!("{}", output_path.display());

    Ok(())
}
