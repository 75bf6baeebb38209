// Copyright 2014-2015 The Rust Project Developers. See the COPYRIGHT
// file at the top-level directory of this distribution and at
// http://rust-lang.org/COPYRIGHT.
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Per-file output buffering and ANSI rendering. A worker accumulates one
//! file's matches into a [`FileBuffer`] lock-free, then hands it to the
//! [`Sink`] for a single locked write.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

use crate::error::SinkError;

const RESET: &str = "\x1b[0m";
const PATH_COLOR: &str = "\x1b[35m"; // magenta
const LINE_NUMBER_COLOR: &str = "\x1b[32m"; // green
const SEPARATOR_COLOR: &str = "\x1b[36m"; // cyan
const MATCH_COLOR: &str = "\x1b[1;31m"; // bold red

/// How much of a file's content each match produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// `path:line:content`, match substring highlighted.
    Normal,
    /// One `path:count` line per file with at least one match.
    CountOnly,
    /// One `path` line per file with at least one match; the file task
    /// stops scanning after its first match.
    FilesWithMatches,
}

/// Grouped ("heading") output separates files with a path line and blank
/// line between them; flat output repeats the path on every match line.
/// The default is heading for a TTY, flat for a pipe.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    Heading,
    Flat,
}

/// A single located, rendered match within one line of a file.
pub struct MatchRecord<'a> {
    pub line_number: u64,
    pub line: &'a [u8],
    pub match_start: usize,
    pub match_end: usize,
}

/// Accumulates one file's rendered output. Built without touching the
/// sink; handed over on completion for a single locked write.
pub struct FileBuffer {
    path_rendered: bool,
    heading: bool,
    count: u64,
    bytes: Vec<u8>,
}

impl FileBuffer {
    pub fn new() -> FileBuffer {
        FileBuffer { path_rendered: false, heading: false, count: 0, bytes: Vec::new() }
    }

    pub fn match_count(&self) -> u64 {
        self.count
    }

    /// Whether this buffer was rendered in `Layout::Heading`; used by
    /// `Sink::flush` to decide whether a blank line belongs before it.
    pub fn is_heading(&self) -> bool {
        self.heading
    }

    /// Appends one match record, rendering it per `mode`/`layout`/`color`.
    /// Returns `true` if the caller should keep scanning this file (always
    /// true except in [`Mode::FilesWithMatches`] after the first match).
    pub fn push_match(
        &mut self,
        path: &Path,
        mode: Mode,
        layout: Layout,
        color: bool,
        record: MatchRecord<'_>,
    ) -> bool {
        self.count += 1;
        match mode {
            Mode::CountOnly => true,
            Mode::FilesWithMatches => {
                if self.count == 1 {
                    render_path_line(&mut self.bytes, path, color);
                }
                false
            }
            Mode::Normal => {
                match layout {
                    Layout::Heading => {
                        self.heading = true;
                        if !self.path_rendered {
                            render_path_line(&mut self.bytes, path, color);
                            self.path_rendered = true;
                        }
                        render_heading_match(&mut self.bytes, color, &record);
                    }
                    Layout::Flat => {
                        render_flat_match(&mut self.bytes, path, color, &record);
                    }
                }
                true
            }
        }
    }

    /// Finalizes the buffer for `Mode::CountOnly`, which only ever emits
    /// one line regardless of how many matches were accumulated.
    pub fn finish_count_only(&mut self, path: &Path, color: bool) {
        if self.count == 0 {
            return;
        }
        render_path_line(&mut self.bytes, path, color);
        self.bytes.pop(); // drop the trailing '\n' from render_path_line
        write!(self.bytes, ":{}\n", self.count).expect("writing to a Vec never fails");
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Default for FileBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn render_path_line(out: &mut Vec<u8>, path: &Path, color: bool) {
    if color {
        write!(out, "{PATH_COLOR}{}{RESET}\n", path.display())
    } else {
        write!(out, "{}\n", path.display())
    }
    .expect("writing to a Vec never fails");
}

fn render_heading_match(out: &mut Vec<u8>, color: bool, record: &MatchRecord<'_>) {
    if color {
        write!(
            out,
            "{LINE_NUMBER_COLOR}{}{RESET}{SEPARATOR_COLOR}:{RESET}",
            record.line_number
        )
        .unwrap();
    } else {
        write!(out, "{}:", record.line_number).unwrap();
    }
    render_highlighted_line(out, color, record);
    out.push(b'\n');
}

fn render_flat_match(out: &mut Vec<u8>, path: &Path, color: bool, record: &MatchRecord<'_>) {
    if color {
        write!(
            out,
            "{PATH_COLOR}{}{RESET}{SEPARATOR_COLOR}:{RESET}{LINE_NUMBER_COLOR}{}{RESET}{SEPARATOR_COLOR}:{RESET}",
            path.display(),
            record.line_number
        )
    } else {
        write!(out, "{}:{}:", path.display(), record.line_number)
    }
    .expect("writing to a Vec never fails");
    render_highlighted_line(out, color, record);
    out.push(b'\n');
}

fn render_highlighted_line(out: &mut Vec<u8>, color: bool, record: &MatchRecord<'_>) {
    let line = record.line;
    if !color {
        out.extend_from_slice(line);
        return;
    }
    out.extend_from_slice(&line[..record.match_start]);
    out.extend_from_slice(MATCH_COLOR.as_bytes());
    out.extend_from_slice(&line[record.match_start..record.match_end]);
    out.extend_from_slice(RESET.as_bytes());
    out.extend_from_slice(&line[record.match_end..]);
}

/// The shared, mutex-guarded destination every worker flushes into. A
/// global atomic counter tracks the total match count across all files
/// independently of any per-file bookkeeping.
pub struct Sink<W> {
    writer: Mutex<W>,
    total_matches: AtomicU64,
    files_with_matches: AtomicU64,
    any_heading_flushed: AtomicBool,
}

impl<W: Write> Sink<W> {
    pub fn new(writer: W) -> Sink<W> {
        Sink {
            writer: Mutex::new(writer),
            total_matches: AtomicU64::new(0),
            files_with_matches: AtomicU64::new(0),
            any_heading_flushed: AtomicBool::new(false),
        }
    }

    /// Flushes one file's buffer under a single lock acquisition,
    /// regardless of how many matches it contains. In `Layout::Heading`,
    /// every file after the first gets a blank line ahead of its path
    /// line; workers can flush in any order, so this is decided by whether
    /// a heading buffer has been flushed before, not by which file it is.
    pub fn flush(&self, buffer: FileBuffer) -> Result<(), SinkError> {
        if buffer.is_empty() {
            return Ok(());
        }
        self.total_matches.fetch_add(buffer.match_count(), Ordering::Relaxed);
        self.files_with_matches.fetch_add(1, Ordering::Relaxed);
        let heading = buffer.is_heading();
        let bytes = buffer.into_bytes();
        let mut writer = self.writer.lock().expect("sink mutex poisoned");
        // Decided under the same lock that serializes the actual write, so
        // the "first heading file" really is whichever one writes first.
        if heading && self.any_heading_flushed.swap(true, Ordering::Relaxed) {
            writer.write_all(b"\n")?;
        }
        writer.write_all(&bytes)?;
        Ok(())
    }

    pub fn total_matches(&self) -> u64 {
        self.total_matches.load(Ordering::Relaxed)
    }

    pub fn files_with_matches(&self) -> u64 {
        self.files_with_matches.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_match_renders_without_color() {
        let mut buf = FileBuffer::new();
        let path = Path::new("src/lib.rs");
        buf.push_match(
            path,
            Mode::Normal,
            Layout::Flat,
            false,
            MatchRecord { line_number: 3, line: b"let x = hello;", match_start: 8, match_end: 13 },
        );
        let out = String::from_utf8(buf.into_bytes()).unwrap();
        assert_eq!(out, "src/lib.rs:3:let x = hello;\n");
    }

    #[test]
    fn heading_mode_emits_path_once() {
        let mut buf = FileBuffer::new();
        let path = Path::new("a.txt");
        buf.push_match(
            path,
            Mode::Normal,
            Layout::Heading,
            false,
            MatchRecord { line_number: 1, line: b"abc", match_start: 0, match_end: 1 },
        );
        buf.push_match(
            path,
            Mode::Normal,
            Layout::Heading,
            false,
            MatchRecord { line_number: 2, line: b"xyz", match_start: 0, match_end: 1 },
        );
        let out = String::from_utf8(buf.into_bytes()).unwrap();
        assert_eq!(out, "a.txt\n1:abc\n2:xyz\n");
    }

    #[test]
    fn files_with_matches_mode_stops_after_first() {
        let mut buf = FileBuffer::new();
        let path = Path::new("a.txt");
        let keep_going = buf.push_match(
            path,
            Mode::FilesWithMatches,
            Layout::Flat,
            false,
            MatchRecord { line_number: 1, line: b"abc", match_start: 0, match_end: 1 },
        );
        assert!(!keep_going);
        let out = String::from_utf8(buf.into_bytes()).unwrap();
        assert_eq!(out, "a.txt\n");
    }

    #[test]
    fn count_only_mode_emits_single_summary_line() {
        let mut buf = FileBuffer::new();
        let path = Path::new("a.txt");
        buf.push_match(
            path,
            Mode::CountOnly,
            Layout::Flat,
            false,
            MatchRecord { line_number: 1, line: b"abc", match_start: 0, match_end: 1 },
        );
        buf.push_match(
            path,
            Mode::CountOnly,
            Layout::Flat,
            false,
            MatchRecord { line_number: 2, line: b"abc", match_start: 0, match_end: 1 },
        );
        buf.finish_count_only(path, false);
        let out = String::from_utf8(buf.into_bytes()).unwrap();
        assert_eq!(out, "a.txt:2\n");
    }

    #[test]
    fn color_wraps_match_substring_in_sgr_codes() {
        let mut buf = FileBuffer::new();
        let path = Path::new("a.txt");
        buf.push_match(
            path,
            Mode::Normal,
            Layout::Flat,
            true,
            MatchRecord { line_number: 1, line: b"hello world", match_start: 0, match_end: 5 },
        );
        let out = String::from_utf8(buf.into_bytes()).unwrap();
        assert!(out.contains(MATCH_COLOR));
        assert!(out.contains(RESET));
    }

    #[test]
    fn sink_flush_is_noop_for_empty_buffer() {
        let sink = Sink::new(Vec::new());
        sink.flush(FileBuffer::new()).unwrap();
        assert_eq!(sink.total_matches(), 0);
        assert_eq!(sink.files_with_matches(), 0);
    }

    fn heading_buffer(path: &Path, line: &[u8]) -> FileBuffer {
        let mut buf = FileBuffer::new();
        buf.push_match(
            path,
            Mode::Normal,
            Layout::Heading,
            false,
            MatchRecord { line_number: 1, line, match_start: 0, match_end: 1 },
        );
        buf
    }

    #[test]
    fn sink_inserts_blank_line_between_consecutive_heading_files() {
        let sink = Sink::new(Vec::new());
        sink.flush(heading_buffer(Path::new("a.txt"), b"abc")).unwrap();
        sink.flush(heading_buffer(Path::new("b.txt"), b"xyz")).unwrap();
        let out = String::from_utf8(sink.writer.into_inner().unwrap()).unwrap();
        assert_eq!(out, "a.txt\n1:abc\n\nb.txt\n1:xyz\n");
    }

    #[test]
    fn sink_emits_no_leading_blank_line_before_the_first_heading_file() {
        let sink = Sink::new(Vec::new());
        sink.flush(heading_buffer(Path::new("a.txt"), b"abc")).unwrap();
        let out = String::from_utf8(sink.writer.into_inner().unwrap()).unwrap();
        assert_eq!(out, "a.txt\n1:abc\n");
    }

    #[test]
    fn flat_layout_never_gets_a_blank_line_separator() {
        let sink = Sink::new(Vec::new());
        let mut buf_a = FileBuffer::new();
        buf_a.push_match(
            Path::new("a.txt"),
            Mode::Normal,
            Layout::Flat,
            false,
            MatchRecord { line_number: 1, line: b"abc", match_start: 0, match_end: 1 },
        );
        let mut buf_b = FileBuffer::new();
        buf_b.push_match(
            Path::new("b.txt"),
            Mode::Normal,
            Layout::Flat,
            false,
            MatchRecord { line_number: 1, line: b"xyz", match_start: 0, match_end: 1 },
        );
        sink.flush(buf_a).unwrap();
        sink.flush(buf_b).unwrap();
        let out = String::from_utf8(sink.writer.into_inner().unwrap()).unwrap();
        assert_eq!(out, "a.txt:1:abc\nb.txt:1:xyz\n");
    }
}
