// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Thompson construction: walks the [`Ast`] and emits a flat [`State`]
//! table, patching dangling outputs as fragments are composed.
//!
//! `^` and `$` compile to plain `Epsilon` states — they do not anchor the
//! match. This is a documented simplification preserved from the source
//! behavior, not a bug to fix.

use crate::error::CompileError;
use crate::regex::class::ByteClass;
use crate::regex::parser::Ast;

/// The fixed state-bitset capacity the simulator (`regex::nfa`) is sized
/// for. Patterns that would compile to more states than this fail to
/// compile rather than silently growing.
pub const MAX_STATES: usize = 256;

#[derive(Clone, Debug)]
pub enum StateKind {
    Any,
    Char(u8),
    Class(ByteClass),
    Epsilon,
    Match,
}

/// One NFA state: a transition tag plus up to two successor indices.
/// `out1`/`out2` are `None` when unused for that state's tag.
#[derive(Clone, Debug)]
pub struct State {
    pub kind: StateKind,
    pub out1: Option<usize>,
    pub out2: Option<usize>,
}

/// A compiled NFA: a flat state table plus the start state index.
/// Exactly one `Match` state exists, and every state is reachable from
/// `start`.
#[derive(Clone, Debug)]
pub struct Nfa {
    pub states: Vec<State>,
    pub start: usize,
}

/// Identifies which output slot of a state is still dangling and needs to
/// be patched to point somewhere once the surrounding fragment is known.
#[derive(Clone, Copy, Debug)]
enum Out {
    One,
    Two,
}

/// A partially built sub-expression: its entry state plus the list of
/// dangling outputs still waiting to be patched.
struct Fragment {
    start: usize,
    dangling: Vec<(usize, Out)>,
}

struct Builder {
    states: Vec<State>,
}

impl Builder {
    fn push(&mut self, kind: StateKind) -> Result<usize, CompileError> {
        if self.states.len() >= MAX_STATES {
            return Err(CompileError::OutOfMemory {
                found: self.states.len() + 1,
                limit: MAX_STATES,
            });
        }
        self.states.push(State { kind, out1: None, out2: None });
        Ok(self.states.len() - 1)
    }

    fn patch(&mut self, dangling: &[(usize, Out)], target: usize) {
        for &(idx, slot) in dangling {
            match slot {
                Out::One => self.states[idx].out1 = Some(target),
                Out::Two => self.states[idx].out2 = Some(target),
            }
        }
    }

    fn compile_literal(&mut self, kind: StateKind) -> Result<Fragment, CompileError> {
        let idx = self.push(kind)?;
        Ok(Fragment { start: idx, dangling: vec![(idx, Out::One)] })
    }

    fn compile(&mut self, ast: &Ast) -> Result<Fragment, CompileError> {
        match ast {
            Ast::Literal(b) => self.compile_literal(StateKind::Char(*b)),
            Ast::Any => self.compile_literal(StateKind::Any),
            Ast::Class(c) => self.compile_literal(StateKind::Class(c.clone())),
            // Anchors are accepted but compile to epsilon transitions —
            // they do not alter semantics.
            Ast::StartAnchor | Ast::EndAnchor => {
                self.compile_literal(StateKind::Epsilon)
            }
            Ast::Concat(parts) => self.compile_concat(parts),
            Ast::Alternate(branches) => self.compile_alternate(branches),
            Ast::Star(inner) => self.compile_star(inner),
            Ast::Plus(inner) => self.compile_plus(inner),
            Ast::Question(inner) => self.compile_question(inner),
        }
    }

    fn compile_concat(
        &mut self,
        parts: &[Ast],
    ) -> Result<Fragment, CompileError> {
        if parts.is_empty() {
            // An empty concatenation matches the empty string: a single
            // epsilon state whose output is the only dangling end.
            return self.compile_literal(StateKind::Epsilon);
        }
        let mut frag = self.compile(&parts[0])?;
        for part in &parts[1..] {
            let next = self.compile(part)?;
            self.patch(&frag.dangling, next.start);
            frag = Fragment { start: frag.start, dangling: next.dangling };
        }
        Ok(frag)
    }

    fn compile_alternate(
        &mut self,
        branches: &[Ast],
    ) -> Result<Fragment, CompileError> {
        debug_assert!(branches.len() >= 2);
        // Fold right-to-left: each split's `out2` is the next alternative,
        // preserving leftmost-first precedence.
        let mut frags: Vec<Fragment> = Vec::with_capacity(branches.len());
        for b in branches {
            frags.push(self.compile(b)?);
        }
        let mut iter = frags.into_iter().rev();
        let mut acc = iter.next().unwrap();
        for frag in iter {
            let split = self.push(StateKind::Epsilon)?;
            self.states[split].out1 = Some(frag.start);
            self.states[split].out2 = Some(acc.start);
            let mut dangling = frag.dangling;
            dangling.extend(acc.dangling);
            acc = Fragment { start: split, dangling };
        }
        Ok(acc)
    }

    fn compile_star(&mut self, inner: &Ast) -> Result<Fragment, CompileError> {
        let inner_frag = self.compile(inner)?;
        let split = self.push(StateKind::Epsilon)?;
        self.states[split].out1 = Some(inner_frag.start);
        self.patch(&inner_frag.dangling, split);
        Ok(Fragment { start: split, dangling: vec![(split, Out::Two)] })
    }

    fn compile_plus(&mut self, inner: &Ast) -> Result<Fragment, CompileError> {
        let inner_frag = self.compile(inner)?;
        let split = self.push(StateKind::Epsilon)?;
        self.states[split].out1 = Some(inner_frag.start);
        self.patch(&inner_frag.dangling, split);
        // Unlike `*`, the start remains the inner fragment's start: the
        // first iteration is mandatory.
        Ok(Fragment {
            start: inner_frag.start,
            dangling: vec![(split, Out::Two)],
        })
    }

    fn compile_question(
        &mut self,
        inner: &Ast,
    ) -> Result<Fragment, CompileError> {
        let inner_frag = self.compile(inner)?;
        let split = self.push(StateKind::Epsilon)?;
        self.states[split].out1 = Some(inner_frag.start);
        let mut dangling = inner_frag.dangling;
        dangling.push((split, Out::Two));
        Ok(Fragment { start: split, dangling })
    }
}

/// Compiles `ast` into a flat NFA with exactly one `Match` state.
pub fn compile(ast: &Ast) -> Result<Nfa, CompileError> {
    let mut builder = Builder { states: Vec::new() };
    let frag = builder.compile(ast)?;
    let match_state = builder.push(StateKind::Match)?;
    builder.patch(&frag.dangling, match_state);
    Ok(Nfa { states: builder.states, start: frag.start })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::regex::parser::Parser;

    fn compile_str(pattern: &str) -> Nfa {
        let ast = Parser::parse(pattern.as_bytes()).unwrap();
        compile(&ast).unwrap()
    }

    #[test]
    fn single_match_state() {
        let nfa = compile_str("abc");
        let matches = nfa
            .states
            .iter()
            .filter(|s| matches!(s.kind, StateKind::Match))
            .count();
        assert_eq!(matches, 1);
    }

    #[test]
    fn every_state_reachable() {
        let nfa = compile_str("a(b|c)*d");
        let mut seen = vec![false; nfa.states.len()];
        let mut stack = vec![nfa.start];
        while let Some(idx) = stack.pop() {
            if seen[idx] {
                continue;
            }
            seen[idx] = true;
            if let Some(o) = nfa.states[idx].out1 {
                stack.push(o);
            }
            if let Some(o) = nfa.states[idx].out2 {
                stack.push(o);
            }
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn too_many_states_fails_to_compile() {
        let pattern = "a".repeat(300);
        let ast = Parser::parse(pattern.as_bytes()).unwrap();
        assert!(matches!(
            compile(&ast),
            Err(CompileError::OutOfMemory { .. })
        ));
    }
}
