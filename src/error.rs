// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error types for every fallible piece of the engine.
//!
//! [`CompileError`] is fatal: a pattern either compiles once at startup or
//! the process never spawns a worker. [`WalkError`] is the opposite, it is
//! always caught at the task boundary and logged, never propagated.

use std::io;
use std::path::PathBuf;

/// Errors that can occur while parsing or compiling a pattern into an NFA.
///
/// All variants are fatal: the caller should print the error and exit with
/// status 2 without spawning any worker threads.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("unexpected end of pattern")]
    UnexpectedEnd,

    #[error("unmatched '(' in pattern at byte {pos}")]
    UnmatchedParen { pos: usize },

    #[error("unmatched ')' in pattern at byte {pos}")]
    UnmatchedCloseParen { pos: usize },

    #[error("unmatched '[' in pattern at byte {pos}")]
    UnmatchedBracket { pos: usize },

    #[error("trailing backslash in pattern")]
    TrailingBackslash,

    #[error("pattern compiles to {found} states, which exceeds the {limit} state limit")]
    OutOfMemory { found: usize, limit: usize },
}

/// Errors encountered while walking the directory tree or reading a single
/// file. These never propagate past the task that produced them: the
/// walker logs them at `warn` and moves on to the next task.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    #[error("failed to open directory {path}: {source}")]
    OpenDir { path: PathBuf, source: io::Error },

    #[error("failed to read directory entry under {path}: {source}")]
    ReadDir { path: PathBuf, source: io::Error },

    #[error("failed to stat {path}: {source}")]
    Stat { path: PathBuf, source: io::Error },

    #[error("failed to open {path}: {source}")]
    OpenFile { path: PathBuf, source: io::Error },

    #[error("failed to read {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },

    #[error("{path} looks binary, skipping")]
    BinaryLikely { path: PathBuf },
}

/// A failure to write rendered output to the sink. Unlike [`WalkError`],
/// this is always fatal: a broken stdout means there is nothing useful
/// left for any worker to do.
#[derive(Debug, thiserror::Error)]
#[error("failed to write search output: {0}")]
pub struct SinkError(#[from] pub io::Error);
