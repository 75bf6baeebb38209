// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The resolved search configuration the engine runs against. Carries no
//! parsing logic of its own — `cli.rs` is the only thing that builds one
//! from argv; tests construct one directly.

use std::path::PathBuf;

use crate::output::Mode;

/// When to colorize output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorChoice {
    Always,
    Never,
    /// Colorize only when stdout is a terminal.
    Auto,
}

/// Whether to group matches under a path heading or repeat the path on
/// every line. `Auto` defers to whether stdout is a terminal, matching
/// `ColorChoice::Auto`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadingChoice {
    Always,
    Never,
    Auto,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub pattern: Vec<u8>,
    pub paths: Vec<PathBuf>,
    pub ignore_case: bool,
    pub word_boundary: bool,
    pub line_numbers: bool,
    pub mode: Mode,
    pub globs: Vec<String>,
    pub no_ignore: bool,
    pub hidden: bool,
    pub threads: usize,
    pub max_depth: Option<usize>,
    pub color: ColorChoice,
    pub heading: HeadingChoice,
}

impl Config {
    pub fn new(pattern: impl Into<Vec<u8>>) -> Config {
        Config { pattern: pattern.into(), ..Config::default() }
    }

    pub fn with_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Config {
        self.paths = paths.into_iter().collect();
        self
    }

    pub fn with_ignore_case(mut self, yes: bool) -> Config {
        self.ignore_case = yes;
        self
    }

    pub fn with_word_boundary(mut self, yes: bool) -> Config {
        self.word_boundary = yes;
        self
    }

    pub fn with_line_numbers(mut self, yes: bool) -> Config {
        self.line_numbers = yes;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Config {
        self.mode = mode;
        self
    }

    pub fn with_globs(mut self, globs: impl IntoIterator<Item = String>) -> Config {
        self.globs = globs.into_iter().collect();
        self
    }

    pub fn with_no_ignore(mut self, yes: bool) -> Config {
        self.no_ignore = yes;
        self
    }

    pub fn with_hidden(mut self, yes: bool) -> Config {
        self.hidden = yes;
        self
    }

    pub fn with_threads(mut self, n: usize) -> Config {
        self.threads = n;
        self
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Config {
        self.max_depth = depth;
        self
    }

    pub fn with_color(mut self, color: ColorChoice) -> Config {
        self.color = color;
        self
    }

    pub fn with_heading(mut self, heading: HeadingChoice) -> Config {
        self.heading = heading;
        self
    }
}

impl Default for Config {
    fn default() -> Config {
        Config {
            pattern: Vec::new(),
            paths: vec![PathBuf::from(".")],
            ignore_case: false,
            word_boundary: false,
            line_numbers: true,
            mode: Mode::Normal,
            globs: Vec::new(),
            no_ignore: false,
            hidden: false,
            threads: default_thread_count(),
            max_depth: None,
            color: ColorChoice::Auto,
            heading: HeadingChoice::Auto,
        }
    }
}

fn default_thread_count() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_searches_current_directory() {
        let cfg = Config::default();
        assert_eq!(cfg.paths, vec![PathBuf::from(".")]);
        assert_eq!(cfg.mode, Mode::Normal);
        assert!(!cfg.no_ignore);
    }

    #[test]
    fn builder_setters_compose() {
        let cfg = Config::new(b"foo".to_vec())
            .with_ignore_case(true)
            .with_word_boundary(true)
            .with_mode(Mode::CountOnly)
            .with_hidden(true)
            .with_max_depth(Some(3));
        assert_eq!(cfg.pattern, b"foo");
        assert!(cfg.ignore_case);
        assert!(cfg.word_boundary);
        assert_eq!(cfg.mode, Mode::CountOnly);
        assert!(cfg.hidden);
        assert_eq!(cfg.max_depth, Some(3));
    }
}
