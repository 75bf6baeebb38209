// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Regex compiler and Thompson-NFA engine.
//!
//! [`Regex::new`] parses a pattern, compiles it to an [`Nfa`][compiler::Nfa]
//! and extracts an optional literal prefix in one pass. [`Regex::find`]
//! runs the simulation in `nfa::find`, first consulting the literal prefix
//! via the scanner when one was extracted.

pub mod class;
pub mod compiler;
pub mod literal;
pub mod nfa;
pub mod parser;

use crate::error::CompileError;
use crate::scanner;

/// A compiled regular expression: its NFA plus, when the pattern starts
/// with a run of at least two non-metacharacter bytes, the extracted
/// literal prefix used to pre-filter candidate haystacks.
#[derive(Clone, Debug)]
pub struct Regex {
    nfa: compiler::Nfa,
    prefix: Option<Vec<u8>>,
}

impl Regex {
    /// Compiles `pattern`. When `ignore_case` is set, every `Literal`/
    /// `Class` node is widened to also match the opposite ASCII case
    /// before compilation (see [`parser::fold_case`]); the literal-prefix
    /// pre-filter is skipped in that case since the prefix extracted from
    /// the raw pattern bytes would otherwise reject haystacks that differ
    /// only in case.
    pub fn new(pattern: &[u8], ignore_case: bool) -> Result<Regex, CompileError> {
        let mut ast = parser::Parser::parse(pattern)?;
        if ignore_case {
            ast = parser::fold_case(ast);
        }
        let nfa = compiler::compile(&ast)?;
        let prefix = if ignore_case { None } else { literal::extract_prefix(pattern) };
        Ok(Regex { nfa, prefix })
    }

    /// The extracted literal prefix, if any, used as a pre-filter.
    pub fn literal_prefix(&self) -> Option<&[u8]> {
        self.prefix.as_deref()
    }

    /// Returns the leftmost-starting, longest match in `haystack`, or
    /// `None`. When a literal prefix is available, the haystack is first
    /// scanned for it; if absent, the NFA is never touched.
    pub fn find(&self, haystack: &[u8]) -> Option<(usize, usize)> {
        if let Some(prefix) = &self.prefix {
            scanner::find_substring(haystack, prefix)?;
        }
        nfa::find(&self.nfa, haystack)
    }

    /// Like [`Regex::find`], but only accepts an `(start, end)` candidate
    /// when `accept` returns `true` for it, trying earlier `Match`
    /// activations of the same start before moving on (see
    /// [`nfa::find_accepting`]).
    pub fn find_accepting(
        &self,
        haystack: &[u8],
        accept: impl FnMut(usize, usize) -> bool,
    ) -> Option<(usize, usize)> {
        if let Some(prefix) = &self.prefix {
            scanner::find_substring(haystack, prefix)?;
        }
        nfa::find_accepting(&self.nfa, haystack, accept)
    }
}
