//! Confirmation & replaceable TTY I/O (§4.F).
//!
//! The teacher routes every status message through a pair of `anstream`
//! wrappers so output is testable and auto-detects color support. Mistletoe
//! has no rendering concerns to auto-detect, but keeps the same underlying
//! principle — no component talks to the real process stdio directly — by
//! passing a small [`Io`] handle down into every prompt site instead of
//! calling `std::io::stdin()`/`stdout()` inline.

use std::io::{BufRead, Write};

use crate::error::MistletoeError;

/// A replaceable stdin/stdout/stderr triple. Borrowed, not owned, so the
/// same real-stdio handles can be reused across an entire command run.
pub struct Io<'a> {
    pub stdin: &'a mut dyn BufRead,
    pub stderr: &'a mut dyn Write,
}

fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" => Some(true),
        "no" | "n" => Some(false),
        _ => None,
    }
}

/// Prompt once. `--yes` bypasses the prompt entirely and returns confirmed.
/// EOF on stdin (no input available) returns not-confirmed, never an error.
pub fn confirm(io: &mut Io<'_>, question: &str, auto_yes: bool) -> Result<bool, MistletoeError> {
    if auto_yes {
        return Ok(true);
    }

    write!(io.stderr, "{question} (yes/no): ").map_err(|e| MistletoeError::Io { detail: e.to_string() })?;
    io.stderr.flush().map_err(|e| MistletoeError::Io { detail: e.to_string() })?;

    let mut line = String::new();
    let n = io.stdin.read_line(&mut line).map_err(|e| MistletoeError::Io { detail: e.to_string() })?;
    if n == 0 {
        return Ok(false);
    }

    Ok(parse_answer(&line).unwrap_or(false))
}

/// Re-prompt until a decisive yes/no is given. `--yes` still short-circuits.
pub fn confirm_required(io: &mut Io<'_>, question: &str, auto_yes: bool) -> Result<bool, MistletoeError> {
    if auto_yes {
        return Ok(true);
    }

    loop {
        write!(io.stderr, "{question} (yes/no): ").map_err(|e| MistletoeError::Io { detail: e.to_string() })?;
        io.stderr.flush().map_err(|e| MistletoeError::Io { detail: e.to_string() })?;

        let mut line = String::new();
        let n = io.stdin.read_line(&mut line).map_err(|e| MistletoeError::Io { detail: e.to_string() })?;
        if n == 0 {
            return Ok(false);
        }

        if let Some(answer) = parse_answer(&line) {
            return Ok(answer);
        }
    }
}

/// A three-way sync prompt (§4.H "sync"): merge (default), rebase, or abort.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncChoice {
    Merge,
    Rebase,
    Abort,
}

pub fn ask_sync_strategy(io: &mut Io<'_>, auto_yes: bool) -> Result<SyncChoice, MistletoeError> {
    if auto_yes {
        return Ok(SyncChoice::Merge);
    }

    loop {
        write!(io.stderr, "Some repositories have diverged. [m]erge / [r]ebase / [a]bort? ")
            .map_err(|e| MistletoeError::Io { detail: e.to_string() })?;
        io.stderr.flush().map_err(|e| MistletoeError::Io { detail: e.to_string() })?;

        let mut line = String::new();
        let n = io.stdin.read_line(&mut line).map_err(|e| MistletoeError::Io { detail: e.to_string() })?;
        if n == 0 {
            return Ok(SyncChoice::Abort);
        }

        match line.trim().to_ascii_lowercase().as_str() {
            "m" | "merge" | "" => return Ok(SyncChoice::Merge),
            "r" | "rebase" => return Ok(SyncChoice::Rebase),
            "a" | "abort" => return Ok(SyncChoice::Abort),
            _ => continue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn io_with<'a>(input: &'a mut Cursor<&'a [u8]>, errbuf: &'a mut Vec<u8>) -> Io<'a> {
        Io { stdin: input, stderr: errbuf }
    }

    #[test]
    fn yes_flag_bypasses_prompt() {
        let mut input: Cursor<&[u8]> = Cursor::new(b"");
        let mut errbuf = Vec::new();
        let mut io = io_with(&mut input, &mut errbuf);
        assert!(confirm(&mut io, "proceed?", true).unwrap());
        assert!(errbuf.is_empty());
    }

    #[test]
    fn accepts_y_and_yes_case_insensitively() {
        for answer in ["y", "Y", "yes", "YES"] {
            let data = format!("{answer}\n");
            let mut input: Cursor<&[u8]> = Cursor::new(data.as_bytes());
            let mut errbuf = Vec::new();
            let mut io = io_with(&mut input, &mut errbuf);
            assert!(confirm(&mut io, "proceed?", false).unwrap());
        }
    }

    #[test]
    fn accepts_n_and_no() {
        for answer in ["n", "no", "N"] {
            let data = format!("{answer}\n");
            let mut input: Cursor<&[u8]> = Cursor::new(data.as_bytes());
            let mut errbuf = Vec::new();
            let mut io = io_with(&mut input, &mut errbuf);
            assert!(!confirm(&mut io, "proceed?", false).unwrap());
        }
    }

    #[test]
    fn eof_on_stdin_is_not_confirmed() {
        let mut input: Cursor<&[u8]> = Cursor::new(b"");
        let mut errbuf = Vec::new();
        let mut io = io_with(&mut input, &mut errbuf);
        assert!(!confirm(&mut io, "proceed?", false).unwrap());
    }

    #[test]
    fn required_variant_reprompts_until_decisive() {
        let mut input: Cursor<&[u8]> = Cursor::new(b"maybe\nnotsure\ny\n");
        let mut errbuf = Vec::new();
        let mut io = io_with(&mut input, &mut errbuf);
        assert!(confirm_required(&mut io, "proceed?", false).unwrap());
    }

    #[test]
    fn sync_strategy_defaults_to_merge_under_yes() {
        let mut input: Cursor<&[u8]> = Cursor::new(b"");
        let mut errbuf = Vec::new();
        let mut io = io_with(&mut input, &mut errbuf);
        assert_eq!(ask_sync_strategy(&mut io, true).unwrap(), SyncChoice::Merge);
    }

    #[test]
    fn sync_strategy_parses_rebase_and_abort() {
        let mut input: Cursor<&[u8]> = Cursor::new(b"r\n");
        let mut errbuf = Vec::new();
        let mut io = io_with(&mut input, &mut errbuf);
        assert_eq!(ask_sync_strategy(&mut io, false).unwrap(), SyncChoice::Rebase);

        let mut input: Cursor<&[u8]> = Cursor::new(b"a\n");
        let mut errbuf = Vec::new();
        let mut io = io_with(&mut input, &mut errbuf);
        assert_eq!(ask_sync_strategy(&mut io, false).unwrap(), SyncChoice::Abort);
    }
}
