// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Gitignore-style ignore matching: ordered patterns, last-match-wins, each
//! scoped to the directory its source file was loaded from.

pub mod glob;

use std::fs;
use std::path::{Path, PathBuf};

use bstr::ByteSlice;

use crate::error::WalkError;
use glob::GlobPattern;

/// Directory names that are never descended into, checked before any
/// pattern in the ignore list.
pub const ALWAYS_IGNORED_DIRS: &[&str] = &[".git", ".svn", ".hg"];

pub fn is_always_ignored_dir(name: &str) -> bool {
    ALWAYS_IGNORED_DIRS.contains(&name)
}

/// One parsed line from a `.gitignore` (or `.findrignore`) file.
#[derive(Clone)]
struct IgnorePattern {
    glob: GlobPattern,
    root: PathBuf,
    negated: bool,
    anchored: bool,
    directory_only: bool,
    contains_slash: bool,
}

impl IgnorePattern {
    /// Parses a single already-trimmed, non-empty, non-comment line.
    /// Leading `!`, leading `/`, and trailing `/` are stripped before the
    /// remainder is compiled into a glob.
    fn parse(line: &[u8], root: PathBuf) -> IgnorePattern {
        let mut bytes = line;
        let negated = bytes.first() == Some(&b'!');
        if negated {
            bytes = &bytes[1..];
        }
        let anchored = bytes.first() == Some(&b'/');
        if anchored {
            bytes = &bytes[1..];
        }
        let directory_only = bytes.last() == Some(&b'/');
        if directory_only {
            bytes = &bytes[..bytes.len() - 1];
        }
        // An interior slash (not counting one we just stripped) also
        // forces a match against the full relative path rather than just
        // the basename.
        let contains_slash = bytes.contains(&b'/');
        IgnorePattern {
            glob: GlobPattern::compile(bytes),
            root,
            negated,
            anchored,
            directory_only,
            contains_slash,
        }
    }

    fn matches(&self, path: &Path, is_dir: bool) -> bool {
        if self.directory_only && !is_dir {
            return false;
        }
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return false;
        };
        let rel_bytes = path_to_bytes(rel);
        if self.anchored || self.contains_slash {
            self.glob.is_match(rel_bytes)
        } else {
            let basename = rel_bytes.rfind(b"/").map_or(rel_bytes, |p| &rel_bytes[p + 1..]);
            self.glob.is_match(basename)
        }
    }
}

/// The accumulated, ordered set of ignore patterns collected while walking
/// a tree. Immutable once construction of the walk's pattern list is done;
/// read-only from every worker thread thereafter.
#[derive(Default, Clone)]
pub struct IgnoreSet {
    patterns: Vec<IgnorePattern>,
}

impl IgnoreSet {
    pub fn new() -> IgnoreSet {
        IgnoreSet { patterns: Vec::new() }
    }

    /// Returns a copy of this set extended with `dir`'s own `.gitignore` and
    /// `.findrignore`, for the walker to pass down to `dir`'s children.
    /// Patterns keep their ordering (ancestors first, `dir`'s own rules
    /// last) so last-match-wins still lets a nested file re-include what a
    /// parent excluded.
    pub fn fork_into_dir(&self, dir: &Path) -> Result<IgnoreSet, WalkError> {
        let mut next = self.clone();
        next.load_dir(dir)?;
        Ok(next)
    }

    /// Loads `.gitignore` and then `.findrignore` (if present) from `dir`,
    /// appending their patterns in that order so a `.findrignore` negation
    /// can override a `.gitignore` exclusion in the same directory.
    pub fn load_dir(&mut self, dir: &Path) -> Result<(), WalkError> {
        self.load_file(&dir.join(".gitignore"))?;
        self.load_file(&dir.join(".findrignore"))?;
        Ok(())
    }

    fn load_file(&mut self, path: &Path) -> Result<(), WalkError> {
        let bytes = match fs::read(path) {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(source) => {
                return Err(WalkError::ReadFile { path: path.to_path_buf(), source })
            }
        };
        let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        for line in bytes.split(|&b| b == b'\n') {
            let trimmed = trim_ignore_line(line);
            if trimmed.is_empty() || trimmed[0] == b'#' {
                continue;
            }
            self.patterns.push(IgnorePattern::parse(trimmed, root.clone()));
        }
        Ok(())
    }

    /// Returns whether `path` is ignored: the last pattern in the ordered
    /// list that matches determines the outcome, so a later `!pattern`
    /// can re-include something an earlier pattern excluded.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        let mut ignored = false;
        for pattern in &self.patterns {
            if pattern.matches(path, is_dir) {
                ignored = !pattern.negated;
            }
        }
        ignored
    }
}

/// Trims ASCII whitespace and a trailing `\r` (for CRLF ignore files).
fn trim_ignore_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    let start = line.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(line.len());
    let end = line.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |p| p + 1);
    &line[start..end]
}

#[cfg(unix)]
fn path_to_bytes(path: &Path) -> &[u8] {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes()
}

#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> &[u8] {
    // Paths are treated as byte strings throughout this crate; on
    // platforms without a native byte-oriented OsStr this falls back to
    // UTF-8, matching the ASCII/UTF-8-passthrough scope documented
    // elsewhere for this crate.
    path.to_str().expect("non-UTF-8 path on a non-Unix platform").as_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn always_ignored_dirs() {
        assert!(is_always_ignored_dir(".git"));
        assert!(!is_always_ignored_dir("src"));
    }

    #[test]
    fn negation_re_includes() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join(".gitignore")).unwrap();
        writeln!(f, "*.log").unwrap();
        writeln!(f, "!important.log").unwrap();
        drop(f);

        let mut set = IgnoreSet::new();
        set.load_dir(dir.path()).unwrap();

        assert!(set.is_ignored(&dir.path().join("debug.log"), false));
        assert!(!set.is_ignored(&dir.path().join("important.log"), false));
    }

    #[test]
    fn directory_only_pattern_skips_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join(".gitignore")).unwrap();
        writeln!(f, "build/").unwrap();
        drop(f);

        let mut set = IgnoreSet::new();
        set.load_dir(dir.path()).unwrap();

        assert!(set.is_ignored(&dir.path().join("build"), true));
        assert!(!set.is_ignored(&dir.path().join("build"), false));
    }

    #[test]
    fn anchored_pattern_only_matches_at_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join(".gitignore")).unwrap();
        writeln!(f, "/target").unwrap();
        drop(f);

        let mut set = IgnoreSet::new();
        set.load_dir(dir.path()).unwrap();

        assert!(set.is_ignored(&dir.path().join("target"), true));
        assert!(!set.is_ignored(&dir.path().join("nested/target"), true));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = fs::File::create(dir.path().join(".gitignore")).unwrap();
        writeln!(f, "# a comment").unwrap();
        writeln!(f).unwrap();
        writeln!(f, "*.tmp").unwrap();
        drop(f);

        let mut set = IgnoreSet::new();
        set.load_dir(dir.path()).unwrap();

        assert!(set.is_ignored(&dir.path().join("a.tmp"), false));
        assert!(!set.is_ignored(&dir.path().join("a.rs"), false));
    }

    #[test]
    fn findrignore_layers_after_gitignore() {
        let dir = tempfile::tempdir().unwrap();
        let mut gi = fs::File::create(dir.path().join(".gitignore")).unwrap();
        writeln!(gi, "*.log").unwrap();
        drop(gi);
        let mut fi = fs::File::create(dir.path().join(".findrignore")).unwrap();
        writeln!(fi, "!keep.log").unwrap();
        drop(fi);

        let mut set = IgnoreSet::new();
        set.load_dir(dir.path()).unwrap();

        assert!(set.is_ignored(&dir.path().join("other.log"), false));
        assert!(!set.is_ignored(&dir.path().join("keep.log"), false));
    }
}
