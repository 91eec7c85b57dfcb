//! Mistletoe: a multi-repository orchestrator that treats a declarative
//! manifest of git working copies as one workspace and drives bulk,
//! consistent source-control operations across all of them.

pub mod cli;
pub mod commands;
pub mod confirm;
pub mod depgraph;
pub mod error;
pub mod locate;
pub mod manifest;
pub mod pool;
pub mod scm;
pub mod snapshot;
pub mod status;
pub mod validate;
