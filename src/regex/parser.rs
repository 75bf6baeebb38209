// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A small recursive-descent parser for the following grammar:
//!
//! ```text
//! expr   := term ( '|' term )*
//! term   := atom quantifier?  (concatenation)
//! atom   := '.' | '[' class ']' | '(' expr ')' | '^' | '$' | '\' ch | LITERAL
//! quant  := '*' | '+' | '?'
//! ```
//!
//! `^` and `$` parse into dedicated AST nodes but [`crate::regex::compiler`]
//! compiles both to plain epsilon transitions — a documented simplification
//! carried over unchanged, not a bug.

use crate::error::CompileError;
use crate::regex::class::ByteClass;

/// Parsed regular expression syntax tree.
#[derive(Clone, Debug, PartialEq)]
pub enum Ast {
    Literal(u8),
    Any,
    Class(ByteClass),
    StartAnchor,
    EndAnchor,
    Concat(Vec<Ast>),
    Alternate(Vec<Ast>),
    Star(Box<Ast>),
    Plus(Box<Ast>),
    Question(Box<Ast>),
}

/// Rewrites `ast` so every `Literal`/`Class` node also matches the opposite
/// ASCII case, used when `-i` is requested for a pattern that took the
/// regex path rather than the literal fast path.
pub fn fold_case(ast: Ast) -> Ast {
    match ast {
        Ast::Literal(b) if b.is_ascii_alphabetic() => {
            let mut class = ByteClass::new();
            class.insert(b.to_ascii_lowercase());
            class.insert(b.to_ascii_uppercase());
            Ast::Class(class)
        }
        Ast::Literal(b) => Ast::Literal(b),
        Ast::Class(mut class) => {
            class.fold_ascii_case();
            Ast::Class(class)
        }
        Ast::Any | Ast::StartAnchor | Ast::EndAnchor => ast,
        Ast::Concat(parts) => {
            Ast::Concat(parts.into_iter().map(fold_case).collect())
        }
        Ast::Alternate(branches) => {
            Ast::Alternate(branches.into_iter().map(fold_case).collect())
        }
        Ast::Star(inner) => Ast::Star(Box::new(fold_case(*inner))),
        Ast::Plus(inner) => Ast::Plus(Box::new(fold_case(*inner))),
        Ast::Question(inner) => Ast::Question(Box::new(fold_case(*inner))),
    }
}

pub struct Parser<'p> {
    pattern: &'p [u8],
    pos: usize,
}

impl<'p> Parser<'p> {
    pub fn new(pattern: &'p [u8]) -> Self {
        Parser { pattern, pos: 0 }
    }

    pub fn parse(pattern: &'p [u8]) -> Result<Ast, CompileError> {
        let mut p = Parser::new(pattern);
        let ast = p.parse_expr()?;
        if p.pos != p.pattern.len() {
            // Only reachable if a ')' was left unconsumed.
            return Err(CompileError::UnmatchedCloseParen { pos: p.pos });
        }
        Ok(ast)
    }

    fn peek(&self) -> Option<u8> {
        self.pattern.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn parse_expr(&mut self) -> Result<Ast, CompileError> {
        let mut branches = vec![self.parse_term()?];
        while self.peek() == Some(b'|') {
            self.bump();
            branches.push(self.parse_term()?);
        }
        if branches.len() == 1 {
            Ok(branches.pop().unwrap())
        } else {
            Ok(Ast::Alternate(branches))
        }
    }

    fn parse_term(&mut self) -> Result<Ast, CompileError> {
        let mut seq = Vec::new();
        while let Some(c) = self.peek() {
            if c == b'|' || c == b')' {
                break;
            }
            let atom = self.parse_atom()?;
            seq.push(self.parse_quantifier(atom)?);
        }
        match seq.len() {
            0 => Ok(Ast::Concat(Vec::new())),
            1 => Ok(seq.pop().unwrap()),
            _ => Ok(Ast::Concat(seq)),
        }
    }

    fn parse_quantifier(&mut self, atom: Ast) -> Result<Ast, CompileError> {
        match self.peek() {
            Some(b'*') => {
                self.bump();
                Ok(Ast::Star(Box::new(atom)))
            }
            Some(b'+') => {
                self.bump();
                Ok(Ast::Plus(Box::new(atom)))
            }
            Some(b'?') => {
                self.bump();
                Ok(Ast::Question(Box::new(atom)))
            }
            _ => Ok(atom),
        }
    }

    fn parse_atom(&mut self) -> Result<Ast, CompileError> {
        let c = self.bump().ok_or(CompileError::UnexpectedEnd)?;
        match c {
            b'.' => Ok(Ast::Any),
            b'^' => Ok(Ast::StartAnchor),
            b'$' => Ok(Ast::EndAnchor),
            b'(' => {
                let inner = self.parse_expr()?;
                match self.bump() {
                    Some(b')') => Ok(inner),
                    _ => Err(CompileError::UnmatchedParen { pos: self.pos }),
                }
            }
            b'[' => self.parse_class(),
            b'\\' => {
                let escaped =
                    self.bump().ok_or(CompileError::TrailingBackslash)?;
                Ok(Ast::Literal(unescape(escaped)))
            }
            other => Ok(Ast::Literal(other)),
        }
    }

    fn parse_class(&mut self) -> Result<Ast, CompileError> {
        let mut class = ByteClass::new();
        if self.peek() == Some(b'^') {
            self.bump();
            class.negated = true;
        }
        let mut saw_member = false;
        loop {
            let c = self.bump().ok_or(CompileError::UnmatchedBracket {
                pos: self.pos,
            })?;
            if c == b']' && saw_member {
                break;
            }
            let lo = if c == b'\\' {
                let esc =
                    self.bump().ok_or(CompileError::TrailingBackslash)?;
                unescape(esc)
            } else {
                c
            };
            if self.peek() == Some(b'-')
                && self.pattern.get(self.pos + 1) != Some(&b']')
                && self.pos + 1 < self.pattern.len()
            {
                self.bump(); // consume '-'
                let hc = self.bump().ok_or(CompileError::UnmatchedBracket {
                    pos: self.pos,
                })?;
                let hi = if hc == b'\\' {
                    let esc = self
                        .bump()
                        .ok_or(CompileError::TrailingBackslash)?;
                    unescape(esc)
                } else {
                    hc
                };
                class.insert_range(lo, hi);
            } else {
                class.insert(lo);
            }
            saw_member = true;
        }
        Ok(Ast::Class(class))
    }
}

/// Maps an escaped byte following `\` to its literal value. `\n \r \t` map
/// to their control bytes, `\s` maps to a single space byte (a documented
/// simplification, not a character class), and any
/// other escaped byte maps to itself.
fn unescape(c: u8) -> u8 {
    match c {
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b's' => b' ',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_concat() {
        let ast = Parser::parse(b"abc").unwrap();
        assert_eq!(
            ast,
            Ast::Concat(vec![
                Ast::Literal(b'a'),
                Ast::Literal(b'b'),
                Ast::Literal(b'c'),
            ])
        );
    }

    #[test]
    fn alternation() {
        let ast = Parser::parse(b"cat|dog").unwrap();
        match ast {
            Ast::Alternate(branches) => assert_eq!(branches.len(), 2),
            other => panic!("expected alternate, got {:?}", other),
        }
    }

    #[test]
    fn quantifiers() {
        assert!(matches!(Parser::parse(b"a*").unwrap(), Ast::Star(_)));
        assert!(matches!(Parser::parse(b"a+").unwrap(), Ast::Plus(_)));
        assert!(matches!(Parser::parse(b"a?").unwrap(), Ast::Question(_)));
    }

    #[test]
    fn unmatched_paren_is_error() {
        assert!(matches!(
            Parser::parse(b"(abc"),
            Err(CompileError::UnmatchedParen { .. })
        ));
    }

    #[test]
    fn unmatched_close_paren_is_error() {
        assert!(Parser::parse(b"abc)").is_err());
    }

    #[test]
    fn unmatched_bracket_is_error() {
        assert!(matches!(
            Parser::parse(b"[abc"),
            Err(CompileError::UnmatchedBracket { .. })
        ));
    }

    #[test]
    fn trailing_backslash_is_error() {
        assert!(matches!(
            Parser::parse(b"abc\\"),
            Err(CompileError::TrailingBackslash)
        ));
    }

    #[test]
    fn escapes() {
        assert_eq!(Parser::parse(b"\\n").unwrap(), Ast::Literal(b'\n'));
        assert_eq!(Parser::parse(b"\\s").unwrap(), Ast::Literal(b' '));
        assert_eq!(Parser::parse(b"\\.").unwrap(), Ast::Literal(b'.'));
    }

    #[test]
    fn class_range() {
        let ast = Parser::parse(b"[a-z]").unwrap();
        match ast {
            Ast::Class(c) => {
                assert!(c.matches(b'm'));
                assert!(!c.matches(b'M'));
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn class_negated() {
        let ast = Parser::parse(b"[^0-9]").unwrap();
        match ast {
            Ast::Class(c) => {
                assert!(!c.matches(b'5'));
                assert!(c.matches(b'x'));
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn fold_case_turns_a_literal_into_a_two_case_class() {
        let ast = fold_case(Parser::parse(b"a").unwrap());
        match ast {
            Ast::Class(c) => {
                assert!(c.matches(b'a'));
                assert!(c.matches(b'A'));
                assert!(!c.matches(b'b'));
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn fold_case_widens_an_existing_class_and_recurses_into_alternation() {
        let ast = fold_case(Parser::parse(b"cat|[d-f]og").unwrap());
        match ast {
            Ast::Alternate(branches) => {
                assert!(matches!(branches[0], Ast::Concat(_)));
                match &branches[1] {
                    Ast::Concat(parts) => match &parts[0] {
                        Ast::Class(c) => {
                            assert!(c.matches(b'd'));
                            assert!(c.matches(b'D'));
                        }
                        other => panic!("expected class, got {:?}", other),
                    },
                    other => panic!("expected concat, got {:?}", other),
                }
            }
            other => panic!("expected alternate, got {:?}", other),
        }
    }

    #[test]
    fn anchors_parse_to_dedicated_nodes() {
        let ast = Parser::parse(b"^a$").unwrap();
        assert_eq!(
            ast,
            Ast::Concat(vec![
                Ast::StartAnchor,
                Ast::Literal(b'a'),
                Ast::EndAnchor,
            ])
        );
    }
}
