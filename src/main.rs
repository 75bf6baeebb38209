// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Wires the CLI surface to the search engine: parse argv, compile the
//! pattern, build the ignore matcher, run the walker against stdout, map
//! the result to an exit code.

use std::io::{self, Write};
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;

use findr::cli::Cli;
use findr::output::Sink;
use findr::{walk, Matcher};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(found_match) => {
            if found_match {
                ExitCode::from(0)
            } else {
                ExitCode::from(1)
            }
        }
        Err(e) => {
            eprintln!("findr: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run() -> anyhow::Result<bool> {
    let cli = Cli::parse();
    let config = cli.into_config();

    let matcher = Matcher::new(&config.pattern, config.ignore_case, config.word_boundary)
        .context("failed to compile pattern")?;
    log::debug!(
        "compiled pattern with literal prefix: {:?}",
        String::from_utf8_lossy(
            &config.pattern[..config.pattern.len().min(32)]
        )
    );

    let stdout = io::stdout();
    let sink = Sink::new(stdout.lock());
    let stats = walk(&config, &matcher, &sink);
    let found_match = sink.total_matches() > 0;
    // Release the stdout lock the sink holds before taking a fresh one to
    // flush; the lock is not reentrant.
    drop(sink);
    io::stdout().flush().context("failed to flush stdout")?;

    let summary = stats.snapshot();
    log::debug!(
        "walk complete: {} files scanned, {} skipped, {} bytes read, {} errors",
        summary.files_scanned,
        summary.files_skipped,
        summary.bytes_read,
        summary.errors
    );

    Ok(found_match)
}
