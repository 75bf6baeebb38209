// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Command-line argument parsing. Translates into a [`Config`]; carries
//! no search logic of its own.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{ColorChoice, Config, HeadingChoice};
use crate::output::Mode;

#[derive(Parser, Debug)]
#[command(name = "findr", version, about = "A recursive, gitignore-aware line search tool")]
pub struct Cli {
    /// Pattern to search for (literal or regex).
    pub pattern: String,

    /// Paths to search. Defaults to the current directory.
    pub paths: Vec<PathBuf>,

    /// Case-insensitive matching.
    #[arg(short = 'i', long = "ignore-case")]
    pub ignore_case: bool,

    /// Only match at word boundaries.
    #[arg(short = 'w', long = "word-regexp")]
    pub word_boundary: bool,

    /// Force line numbers on (on by default; kept for symmetry with -c/-l).
    #[arg(short = 'n', long = "line-number")]
    pub line_number: bool,

    /// Print only a per-file match count.
    #[arg(short = 'c', long = "count", conflicts_with = "files_with_matches")]
    pub count: bool,

    /// Print only the names of files with at least one match.
    #[arg(short = 'l', long = "files-with-matches")]
    pub files_with_matches: bool,

    /// Include/exclude glob, may be repeated. A leading `!` negates it.
    #[arg(short = 'g', long = "glob")]
    pub glob: Vec<String>,

    /// Disable gitignore/findrignore consultation.
    #[arg(long = "no-ignore")]
    pub no_ignore: bool,

    /// Include dot-prefixed files and directories.
    #[arg(long = "hidden")]
    pub hidden: bool,

    /// Worker thread count. Defaults to the available parallelism.
    #[arg(short = 'j', long = "threads")]
    pub threads: Option<usize>,

    /// Maximum recursion depth.
    #[arg(short = 'd', long = "max-depth")]
    pub max_depth: Option<usize>,

    /// Color policy.
    #[arg(long = "color", value_enum, default_value = "auto")]
    pub color: CliColorChoice,

    /// Force grouped (heading) output.
    #[arg(long = "heading", conflicts_with = "no_heading")]
    pub heading: bool,

    /// Force flat output.
    #[arg(long = "no-heading")]
    pub no_heading: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum CliColorChoice {
    Auto,
    Always,
    Never,
}

impl Cli {
    /// Resolves this parsed command line into a [`Config`]. The pattern
    /// itself is not compiled here; that stays the caller's job so a
    /// `CompileError` can be handled before any worker spawns.
    pub fn into_config(self) -> Config {
        let mode = if self.count {
            Mode::CountOnly
        } else if self.files_with_matches {
            Mode::FilesWithMatches
        } else {
            Mode::Normal
        };
        let color = match self.color {
            CliColorChoice::Auto => ColorChoice::Auto,
            CliColorChoice::Always => ColorChoice::Always,
            CliColorChoice::Never => ColorChoice::Never,
        };
        let heading = if self.heading {
            HeadingChoice::Always
        } else if self.no_heading {
            HeadingChoice::Never
        } else {
            HeadingChoice::Auto
        };
        let paths = if self.paths.is_empty() { vec![PathBuf::from(".")] } else { self.paths };

        let mut config = Config::new(self.pattern.into_bytes())
            .with_paths(paths)
            .with_ignore_case(self.ignore_case)
            .with_word_boundary(self.word_boundary)
            .with_mode(mode)
            .with_globs(self.glob)
            .with_no_ignore(self.no_ignore)
            .with_hidden(self.hidden)
            .with_max_depth(self.max_depth)
            .with_color(color)
            .with_heading(heading);
        if self.line_number {
            config = config.with_line_numbers(true);
        }
        if let Some(threads) = self.threads {
            config = config.with_threads(threads);
        }
        config
    }
}
