// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Quantified invariants checked against randomly generated inputs rather
//! than hand-picked cases: scanner totality, NFA acceptance closure on
//! literal-alternation patterns, and the ignore matcher's last-match-wins
//! equivalence.

use std::fs;
use std::io::Write as _;

use proptest::prelude::*;

use findr::ignore::IgnoreSet;
use findr::matcher::Matcher;
use findr::scanner;

/// Reference definition of `find_substring`: the smallest `p` such that
/// `H[p..p+|N|] == N`, or `None` if no such `p` exists.
fn naive_find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).find(|&p| &haystack[p..p + needle.len()] == needle)
}

proptest! {
    #[test]
    fn scanner_totality(
        haystack in prop::collection::vec(0u8..=3, 0..64),
        needle in prop::collection::vec(0u8..=3, 0..8),
    ) {
        prop_assert_eq!(scanner::find_substring(&haystack, &needle), naive_find(&haystack, &needle));
    }

    #[test]
    fn scanner_find_byte_matches_position_search(
        haystack in prop::collection::vec(0u8..=5, 0..128),
        target in 0u8..=5,
    ) {
        let expected = haystack.iter().position(|&b| b == target);
        prop_assert_eq!(scanner::find_byte(&haystack, target), expected);
    }

    #[test]
    fn lines_iterator_reconstructs_haystack_when_joined(
        haystack in prop::collection::vec(prop::collection::vec(1u8..=255u8, 0..16), 0..16),
    ) {
        // Build a haystack with no embedded '\n' in each segment, joined by '\n'.
        let joined: Vec<u8> = haystack.join(&b'\n');
        let lines: Vec<&[u8]> = scanner::Lines::new(&joined).collect();
        let rejoined: Vec<u8> = lines.join(&b'\n');
        prop_assert_eq!(rejoined, joined);
    }

    /// NFA acceptance closure, specialized to literal-alternation patterns
    /// (`lit0|lit1|...`): whatever `Matcher::find_first` reports as a match
    /// must be exactly one of the alternatives, verbatim.
    #[test]
    fn alternation_match_is_always_one_of_the_literals(
        literals in prop::collection::vec("[a-z]{2,6}", 2..5),
        prefix in "[a-z]{0,8}",
        suffix in "[a-z]{0,8}",
        pick in 0usize..4,
    ) {
        let pattern = literals.join("|");
        let matcher = Matcher::new(pattern.as_bytes(), false, false).unwrap();
        let chosen = &literals[pick % literals.len()];
        let haystack = format!("{prefix}{chosen}{suffix}");

        if let Some(m) = matcher.find_first(haystack.as_bytes()) {
            let matched = &haystack.as_bytes()[m.start..m.end];
            prop_assert!(literals.iter().any(|lit| lit.as_bytes() == matched));
        } else {
            // A match must exist: `chosen` is literally embedded.
            prop_assert!(false, "expected a match for {haystack:?} against {pattern:?}");
        }
    }

    /// Replays the same ordered pattern list with a straightforward
    /// last-match-wins loop and checks it agrees with `IgnoreSet`.
    #[test]
    fn ignore_last_match_wins_matches_reference_replay(
        rules in prop::collection::vec((any::<bool>(), "[a-c][a-c]\\.txt"), 1..6),
        candidate in "[a-c][a-c]\\.txt",
    ) {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join(".gitignore")).unwrap();
        for (negate, name) in &rules {
            if *negate {
                writeln!(f, "!{name}").unwrap();
            } else {
                writeln!(f, "{name}").unwrap();
            }
        }
        drop(f);

        let mut set = IgnoreSet::new();
        set.load_dir(dir.path()).unwrap();

        let mut reference = false;
        for (negate, name) in &rules {
            if name == &candidate {
                reference = !negate;
            }
        }

        let path = dir.path().join(&candidate);
        prop_assert_eq!(set.is_ignored(&path, false), reference);
    }
}
