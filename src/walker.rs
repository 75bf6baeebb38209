// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A work-stealing parallel directory walker. One [`deque::Worker`] per
//! thread; a thread exhausts its own queue before stealing from a
//! randomly chosen victim. A shared in-flight counter, incremented before
//! every push and decremented after every pop finishes processing,
//! doubles as the termination signal: once it reaches zero no task exists
//! anywhere, queued or in progress.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::config::{Config, HeadingChoice};
use crate::deque::{Steal, Stealer, Worker};
use crate::error::WalkError;
use crate::ignore::{is_always_ignored_dir, IgnoreSet};
use crate::matcher::Matcher;
use crate::output::{FileBuffer, Layout, MatchRecord, Mode, Sink};
use crate::scanner;

/// A file at or below this size is read with a single `fs::read`.
const SMALL_FILE_THRESHOLD: u64 = 64 * 1024;
/// A file at or below this size is memory-mapped. Above it the walker
/// falls back to chunked streaming so a single huge file can't pin
/// hundreds of megabytes of address space per worker.
const MMAP_THRESHOLD: u64 = 128 * 1024 * 1024;
/// Chunk size for the streaming reader, and the window size checked for a
/// NUL byte before a file is committed to as text.
const STREAM_CHUNK: usize = 64 * 1024;

/// Accumulated, lock-free run statistics. Populated whether or not a
/// caller prints them.
#[derive(Default)]
pub struct WalkStats {
    files_scanned: AtomicU64,
    files_skipped: AtomicU64,
    bytes_read: AtomicU64,
    errors: AtomicU64,
}

/// A point-in-time, non-atomic copy of [`WalkStats`] for reporting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WalkSummary {
    pub files_scanned: u64,
    pub files_skipped: u64,
    pub bytes_read: u64,
    pub errors: u64,
}

impl WalkStats {
    pub fn new() -> WalkStats {
        WalkStats::default()
    }

    pub fn snapshot(&self) -> WalkSummary {
        WalkSummary {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_skipped: self.files_skipped.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

enum Task {
    /// `explicit` marks a path named directly in `Config::paths`: hidden
    /// and ignore-matcher filtering never applies to it, matching how a
    /// file named on the command line is always searched.
    Dir { path: PathBuf, depth: usize, ignore: Arc<IgnoreSet>, explicit: bool },
    File { path: PathBuf, explicit: bool },
}

/// Walks every path in `config.paths`, matching each file's lines against
/// `matcher` and writing results to `sink`. Blocks until every worker
/// thread has terminated.
pub fn walk<W: std::io::Write + Send>(
    config: &Config,
    matcher: &Matcher,
    sink: &Sink<W>,
) -> WalkStats {
    let stats = WalkStats::new();
    let thread_count = config.threads.max(1);
    let workers: Vec<Worker<Task>> = (0..thread_count).map(|_| Worker::new()).collect();
    let pending = AtomicUsize::new(0);

    let push = |worker: &Worker<Task>, task: Task| {
        pending.fetch_add(1, Ordering::SeqCst);
        worker.push(task);
    };

    let root_ignore = Arc::new(IgnoreSet::new());
    for path in &config.paths {
        let is_dir = path.is_dir();
        let task = if is_dir {
            Task::Dir { path: path.clone(), depth: 0, ignore: root_ignore.clone(), explicit: true }
        } else {
            Task::File { path: path.clone(), explicit: true }
        };
        push(&workers[0], task);
    }

    let stealers: Vec<Stealer<Task>> = workers.iter().map(|w| w.stealer()).collect();

    std::thread::scope(|scope| {
        for (i, worker) in workers.iter().enumerate() {
            let stealers = &stealers;
            let pending = &pending;
            let stats = &stats;
            scope.spawn(move || {
                log::debug!("walker thread {i} starting");
                run_worker(i, worker, stealers, pending, config, matcher, sink, stats);
                log::debug!("walker thread {i} terminating");
            });
        }
    });

    stats
}

fn run_worker<W: std::io::Write + Send>(
    id: usize,
    worker: &Worker<Task>,
    stealers: &[Stealer<Task>],
    pending: &AtomicUsize,
    config: &Config,
    matcher: &Matcher,
    sink: &Sink<W>,
    stats: &WalkStats,
) {
    let push = |task: Task| {
        pending.fetch_add(1, Ordering::SeqCst);
        worker.push(task);
    };

    loop {
        let task = worker.pop().or_else(|| steal_from_others(id, stealers));
        match task {
            Some(task) => {
                process_task(task, &push, config, matcher, sink, stats);
                pending.fetch_sub(1, Ordering::SeqCst);
            }
            None => {
                if pending.load(Ordering::SeqCst) == 0 {
                    return;
                }
                std::thread::sleep(Duration::from_micros(50));
            }
        }
    }
}

/// Starts from a randomly chosen victim and scans the rest in order,
/// retrying a victim that reports [`Steal::Retry`] before moving on.
fn steal_from_others(self_id: usize, stealers: &[Stealer<Task>]) -> Option<Task> {
    if stealers.len() <= 1 {
        return None;
    }
    let start = rand::thread_rng().gen_range(0..stealers.len());
    for offset in 0..stealers.len() {
        let idx = (start + offset) % stealers.len();
        if idx == self_id {
            continue;
        }
        loop {
            match stealers[idx].steal() {
                Steal::Success(task) => return Some(task),
                Steal::Empty => break,
                Steal::Retry => continue,
            }
        }
    }
    None
}

fn process_task<W: std::io::Write + Send>(
    task: Task,
    push: &impl Fn(Task),
    config: &Config,
    matcher: &Matcher,
    sink: &Sink<W>,
    stats: &WalkStats,
) {
    match task {
        Task::Dir { path, depth, ignore, explicit } => {
            process_dir(&path, depth, &ignore, explicit, push, config, stats)
        }
        Task::File { path, explicit: _ } => {
            process_file(&path, config, matcher, sink, stats)
        }
    }
}

fn process_dir(
    path: &Path,
    depth: usize,
    inherited: &IgnoreSet,
    explicit: bool,
    push: &impl Fn(Task),
    config: &Config,
    stats: &WalkStats,
) {
    let ignore = if config.no_ignore {
        None
    } else {
        match inherited.fork_into_dir(path) {
            Ok(set) => Some(set),
            Err(e) => {
                log::warn!("{e}");
                stats.errors.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    };
    // Shared by every subdirectory task spawned from here: one fork per
    // directory visited, not one per entry.
    let child_ignore = Arc::new(ignore.clone().unwrap_or_default());

    let entries = match std::fs::read_dir(path) {
        Ok(entries) => entries,
        Err(source) => {
            log::warn!(
                "{}",
                WalkError::OpenDir { path: path.to_path_buf(), source }
            );
            stats.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(source) => {
                log::warn!(
                    "{}",
                    WalkError::ReadDir { path: path.to_path_buf(), source }
                );
                stats.errors.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };
        let entry_path = entry.path();
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if !explicit && !config.hidden && name.starts_with('.') {
            continue;
        }

        let file_type = match entry.file_type() {
            Ok(t) => t,
            Err(source) => {
                log::warn!("{}", WalkError::Stat { path: entry_path.clone(), source });
                stats.errors.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        };
        let is_dir = file_type.is_dir();

        if is_dir && is_always_ignored_dir(&name) {
            continue;
        }
        if let Some(set) = &ignore {
            if set.is_ignored(&entry_path, is_dir) {
                stats.files_skipped.fetch_add(1, Ordering::Relaxed);
                continue;
            }
        }

        let next_depth = depth + 1;
        if let Some(max) = config.max_depth {
            if next_depth > max {
                continue;
            }
        }

        if is_dir {
            push(Task::Dir {
                path: entry_path,
                depth: next_depth,
                ignore: child_ignore.clone(),
                explicit: false,
            });
        } else if file_type.is_file() {
            if !matches_globs(&entry_path, &config.globs) {
                continue;
            }
            push(Task::File { path: entry_path, explicit: false });
        }
    }
}

fn matches_globs(path: &Path, globs: &[String]) -> bool {
    if globs.is_empty() {
        return true;
    }
    let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
    globs.iter().any(|g| {
        crate::ignore::glob::GlobPattern::compile(g.as_bytes()).is_match(name.as_bytes())
    })
}

fn process_file<W: std::io::Write + Send>(
    path: &Path,
    config: &Config,
    matcher: &Matcher,
    sink: &Sink<W>,
    stats: &WalkStats,
) {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(source) => {
            log::warn!("{}", WalkError::OpenFile { path: path.to_path_buf(), source });
            stats.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };
    let len = match file.metadata() {
        Ok(m) => m.len(),
        Err(source) => {
            log::warn!("{}", WalkError::Stat { path: path.to_path_buf(), source });
            stats.errors.fetch_add(1, Ordering::Relaxed);
            return;
        }
    };

    let color = resolve_color(config);
    let layout = resolve_layout(config);
    let mut buffer = FileBuffer::new();

    let result = if len == 0 {
        Ok(())
    } else if len <= SMALL_FILE_THRESHOLD {
        read_small(file, path).and_then(|bytes| {
            let result = scan_whole(path, &bytes, config, matcher, color, layout, &mut buffer);
            stats.bytes_read.fetch_add(bytes.len() as u64, Ordering::Relaxed);
            result
        })
    } else if len <= MMAP_THRESHOLD {
        scan_mmap(path, &file, config, matcher, color, layout, &mut buffer, stats)
    } else {
        scan_streaming(path, file, config, matcher, color, layout, &mut buffer, stats)
    };

    match result {
        Ok(()) => {
            stats.files_scanned.fetch_add(1, Ordering::Relaxed);
            if config.mode == Mode::CountOnly {
                buffer.finish_count_only(path, color);
            }
            if let Err(e) = sink.flush(buffer) {
                log::error!("{e}");
                stats.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
        Err(WalkError::BinaryLikely { path }) => {
            log::debug!("{path:?} looks binary, skipping");
            stats.files_skipped.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            log::warn!("{e}");
            stats.errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn read_small(mut file: File, path: &Path) -> Result<Vec<u8>, WalkError> {
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|source| WalkError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(bytes)
}

fn scan_mmap(
    path: &Path,
    file: &File,
    config: &Config,
    matcher: &Matcher,
    color: bool,
    layout: Layout,
    buffer: &mut FileBuffer,
    stats: &WalkStats,
) -> Result<(), WalkError> {
    // Safety: the mapping is read-only and this worker is the sole owner
    // of `file`; external truncation of the underlying file while mapped
    // is the one hazard `memmap2` itself documents and cannot rule out.
    let mmap = unsafe { memmap2::Mmap::map(file) }
        .map_err(|source| WalkError::ReadFile { path: path.to_path_buf(), source })?;
    let result = scan_whole(path, &mmap, config, matcher, color, layout, buffer);
    stats.bytes_read.fetch_add(mmap.len() as u64, Ordering::Relaxed);
    result
}

/// Scans an in-memory buffer (small-file or mmap path) one line at a
/// time, stopping early in [`Mode::FilesWithMatches`].
fn scan_whole(
    path: &Path,
    content: &[u8],
    config: &Config,
    matcher: &Matcher,
    color: bool,
    layout: Layout,
    buffer: &mut FileBuffer,
) -> Result<(), WalkError> {
    if scanner::find_nul(&content[..content.len().min(STREAM_CHUNK)]) {
        return Err(WalkError::BinaryLikely { path: path.to_path_buf() });
    }
    for (i, line) in scanner::Lines::new(content).enumerate() {
        if let Some(m) = matcher.find_first(line) {
            let keep_going = buffer.push_match(
                path,
                config.mode,
                layout,
                color,
                MatchRecord {
                    line_number: (i + 1) as u64,
                    line,
                    match_start: m.start,
                    match_end: m.end,
                },
            );
            if !keep_going {
                return Ok(());
            }
        }
    }
    Ok(())
}

/// Scans a file too large to memory-map, one fixed-size chunk at a time.
/// A line that straddles a chunk boundary is reassembled in `leftover`
/// before being matched.
fn scan_streaming(
    path: &Path,
    mut file: File,
    config: &Config,
    matcher: &Matcher,
    color: bool,
    layout: Layout,
    buffer: &mut FileBuffer,
    stats: &WalkStats,
) -> Result<(), WalkError> {
    let mut chunk = vec![0u8; STREAM_CHUNK];
    let mut leftover: Vec<u8> = Vec::new();
    let mut line_number: u64 = 1;
    let mut checked_for_binary = false;

    loop {
        let n = file
            .read(&mut chunk)
            .map_err(|source| WalkError::ReadFile { path: path.to_path_buf(), source })?;
        if n == 0 {
            break;
        }
        stats.bytes_read.fetch_add(n as u64, Ordering::Relaxed);
        if !checked_for_binary {
            checked_for_binary = true;
            if scanner::find_nul(&chunk[..n]) {
                return Err(WalkError::BinaryLikely { path: path.to_path_buf() });
            }
        }

        leftover.extend_from_slice(&chunk[..n]);
        let mut consumed = 0;
        loop {
            match scanner::find_newline(&leftover[consumed..]) {
                Some(rel) => {
                    let line = &leftover[consumed..consumed + rel];
                    if let Some(m) = matcher.find_first(line) {
                        let keep_going = buffer.push_match(
                            path,
                            config.mode,
                            layout,
                            color,
                            MatchRecord {
                                line_number,
                                line,
                                match_start: m.start,
                                match_end: m.end,
                            },
                        );
                        if !keep_going {
                            return Ok(());
                        }
                    }
                    line_number += 1;
                    consumed += rel + 1;
                }
                None => break,
            }
        }
        leftover.drain(..consumed);
    }

    if !leftover.is_empty() {
        if let Some(m) = matcher.find_first(&leftover) {
            buffer.push_match(
                path,
                config.mode,
                layout,
                color,
                MatchRecord { line_number, line: &leftover, match_start: m.start, match_end: m.end },
            );
        }
    }
    Ok(())
}

fn resolve_color(config: &Config) -> bool {
    use crate::config::ColorChoice;
    match config.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => is_terminal::IsTerminal::is_terminal(&std::io::stdout()),
    }
}

fn resolve_layout(config: &Config) -> Layout {
    let heading = match config.heading {
        HeadingChoice::Always => true,
        HeadingChoice::Never => false,
        HeadingChoice::Auto => is_terminal::IsTerminal::is_terminal(&std::io::stdout()),
    };
    if heading {
        Layout::Heading
    } else {
        Layout::Flat
    }
}
