//! Virtual console buffer
//!
//! Holds the plain text of everything written so far, a cursor, and the
//! style ranges over that text. Output is fed in arbitrary chunks; cursor
//! control characters and ANSI styling are interpreted the way a terminal
//! would, and every range change is forwarded to a [`RenderSink`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ranges::{RangeChange, RangeSet, StyleRange};
use super::term::{
    split_controls, AnsiCode, Control, EscapeParser, Hyperlink, Token, DEFAULT_MAX_PENDING,
};
use crate::ui::sink::{NullSink, RenderSink};

/// How ANSI escape sequences in output are treated
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnsiMode {
    /// Interpret colors, attributes and links
    #[default]
    On,
    /// Show escape sequences as literal text
    Off,
    /// Remove escape sequences without styling
    Strip,
}

impl AnsiMode {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "on" => Some(AnsiMode::On),
            "off" => Some(AnsiMode::Off),
            "strip" => Some(AnsiMode::Strip),
            _ => None,
        }
    }
}

/// Preferences read by the console
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConsolePrefs {
    pub ansi_mode: AnsiMode,
    /// Capture written text for announcement
    pub screen_reader: bool,
    /// Longest unfinished escape sequence kept between chunks
    pub max_pending_escape: usize,
}

impl Default for ConsolePrefs {
    fn default() -> Self {
        Self {
            ansi_mode: AnsiMode::On,
            screen_reader: false,
            max_pending_escape: DEFAULT_MAX_PENDING,
        }
    }
}

/// Terminal-like text buffer with styled ranges
pub struct VirtualConsole<S: RenderSink = NullSink> {
    buffer: Vec<char>,
    cursor: usize,
    /// Number of '\n' in the buffer
    newlines: usize,
    ranges: RangeSet,
    parser: EscapeParser,
    ansi: AnsiCode,
    link: Option<Hyperlink>,
    block_classes: Option<String>,
    prefs: ConsolePrefs,
    sink: S,
    /// Text captured for screen readers since the last take
    new_text: String,
    /// Ranges written by the most recent submit
    new_range_ids: Vec<u64>,
}

impl Default for VirtualConsole<NullSink> {
    fn default() -> Self {
        Self::new(ConsolePrefs::default(), NullSink)
    }
}

impl<S: RenderSink> VirtualConsole<S> {
    pub fn new(prefs: ConsolePrefs, sink: S) -> Self {
        Self {
            buffer: Vec::new(),
            cursor: 0,
            newlines: 0,
            ranges: RangeSet::new(),
            parser: EscapeParser::new(prefs.max_pending_escape),
            ansi: AnsiCode::new(),
            link: None,
            block_classes: None,
            prefs,
            sink,
            new_text: String::new(),
            new_range_ids: Vec::new(),
        }
    }

    pub fn prefs(&self) -> &ConsolePrefs {
        &self.prefs
    }

    pub fn set_prefs(&mut self, prefs: ConsolePrefs) {
        if prefs.max_pending_escape != self.prefs.max_pending_escape {
            self.parser = EscapeParser::new(prefs.max_pending_escape);
        }
        self.prefs = prefs;
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Write unstyled output
    pub fn submit(&mut self, text: &str) {
        self.submit_full(text, None, false, false);
    }

    /// Write output under a parent class
    pub fn submit_with_class(&mut self, text: &str, class: &str) {
        self.submit_full(text, Some(class), false, false);
    }

    /// Write a chunk of output.
    ///
    /// `class` is prepended to the ANSI classes of every written span.
    /// `force_new_range` keeps the first span of this chunk from merging with
    /// existing ranges. With `announce` set and the screen reader preference
    /// on, the written text is captured for [`take_new_text`](Self::take_new_text).
    pub fn submit_full(
        &mut self,
        text: &str,
        class: Option<&str>,
        force_new_range: bool,
        announce: bool,
    ) {
        self.new_range_ids.clear();
        let parent = class.unwrap_or("");
        let announce = announce && self.prefs.screen_reader;
        let mode = self.prefs.ansi_mode;

        let tokens = match mode {
            AnsiMode::Off => split_controls(text),
            AnsiMode::On | AnsiMode::Strip => self.parser.feed(text),
        };

        let mut force = force_new_range;
        for token in tokens {
            match token {
                Token::Text(run) => {
                    let (class, link) = match mode {
                        AnsiMode::On => (
                            join_classes(parent, self.ansi.classes().inline.as_deref()),
                            self.link.clone(),
                        ),
                        AnsiMode::Off | AnsiMode::Strip => (parent.to_string(), None),
                    };
                    self.write(&run, &class, link.as_ref(), force);
                    if announce {
                        self.new_text.push_str(&run);
                    }
                    force = false;
                }
                Token::Control(Control::Newline) => {
                    self.newline(parent, force);
                    if announce {
                        self.new_text.push('\n');
                    }
                    force = false;
                }
                Token::Control(Control::CarriageReturn) => self.carriage_return(),
                Token::Control(Control::Backspace) => self.backspace(),
                Token::Control(Control::FormFeed) => self.form_feed(),
                Token::Sgr(code) if mode == AnsiMode::On => {
                    let classes = self.ansi.process_code(&code);
                    self.set_block_classes(classes.block);
                }
                Token::DecLine(n) if mode == AnsiMode::On => {
                    let classes = self.ansi.process_line_attribute(n);
                    self.set_block_classes(classes.block);
                }
                Token::Hyperlink(link) if mode == AnsiMode::On => self.link = link,
                Token::Sgr(_) | Token::DecLine(_) | Token::Hyperlink(_) | Token::Ignored(_) => {}
            }
        }
    }

    /// Move the cursor to the start of the current line
    pub fn carriage_return(&mut self) {
        self.cursor = self.line_start();
    }

    /// Move the cursor back one character without erasing
    pub fn backspace(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// Move to the end of the current line and write a line break
    pub fn newline(&mut self, class: &str, force_new_range: bool) {
        self.cursor = self.line_end();
        self.write("\n", class, None, force_new_range);
    }

    /// Erase all output
    pub fn form_feed(&mut self) {
        self.buffer.clear();
        self.cursor = 0;
        self.newlines = 0;
        self.ranges.clear();
        self.new_range_ids.clear();
        self.sink.clear();
    }

    /// Erase all output and forget styling and partial sequences
    pub fn clear(&mut self) {
        self.form_feed();
        self.parser.reset();
        self.ansi = AnsiCode::new();
        self.link = None;
        self.set_block_classes(None);
        self.new_text.clear();
    }

    /// Remove the first `count` lines. Returns the number of characters removed.
    pub fn drop_leading_lines(&mut self, count: usize) -> usize {
        if count == 0 {
            return 0;
        }
        let cut = match self
            .buffer
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == '\n')
            .nth(count - 1)
        {
            Some((index, _)) => index + 1,
            None => return 0,
        };

        self.buffer.drain(..cut);
        self.cursor = self.cursor.saturating_sub(cut);
        self.newlines -= count;
        let changes = self.ranges.remove_prefix(cut);
        self.apply_changes(&changes);
        debug!("Dropped {} leading lines ({} chars)", count, cut);
        cut
    }

    /// Plain text of the buffer
    pub fn text(&self) -> String {
        self.buffer.iter().collect()
    }

    /// Text covered by a range
    pub fn range_text(&self, range: &StyleRange) -> String {
        self.buffer[range.start..range.end()].iter().collect()
    }

    pub fn ranges(&self) -> &[StyleRange] {
        self.ranges.as_slice()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Number of line breaks in the buffer
    pub fn line_count(&self) -> usize {
        self.newlines
    }

    pub fn block_classes(&self) -> Option<&str> {
        self.block_classes.as_deref()
    }

    /// Whether the last chunk ended inside an escape sequence
    pub fn has_pending_escape(&self) -> bool {
        self.parser.has_pending()
    }

    /// Text captured for screen readers since the last call
    pub fn take_new_text(&mut self) -> String {
        std::mem::take(&mut self.new_text)
    }

    /// Ranges created or extended by the most recent submit, in buffer order
    pub fn new_ranges(&self) -> Vec<&StyleRange> {
        self.ranges
            .iter()
            .filter(|r| self.new_range_ids.contains(&r.id))
            .collect()
    }

    /// Overwrite at the cursor and advance past the written text
    fn write(&mut self, text: &str, class: &str, link: Option<&Hyperlink>, force_new: bool) {
        let start = self.cursor;
        let mut len = 0;
        for ch in text.chars() {
            let pos = start + len;
            if ch == '\n' {
                self.newlines += 1;
            }
            if pos < self.buffer.len() {
                if self.buffer[pos] == '\n' {
                    self.newlines -= 1;
                }
                self.buffer[pos] = ch;
            } else {
                self.buffer.push(ch);
            }
            len += 1;
        }
        if len == 0 {
            return;
        }
        self.cursor = start + len;

        let outcome = self.ranges.write(start, len, class, link, force_new);
        self.apply_changes(&outcome.changes);
        if let Some(id) = outcome.target_id {
            if !self.new_range_ids.contains(&id) {
                self.new_range_ids.push(id);
            }
        }
    }

    fn apply_changes(&mut self, changes: &[RangeChange]) {
        for change in changes {
            match change {
                RangeChange::Inserted(index, range) => {
                    let text = self.range_text(range);
                    self.sink.insert(*index, range, &text);
                }
                RangeChange::Updated(index, range) => {
                    let text = self.range_text(range);
                    self.sink.update(*index, range, &text);
                }
                RangeChange::Extended(index, range, added) => {
                    let text: String = self.buffer[range.end() - *added..range.end()].iter().collect();
                    self.sink.append(*index, range, &text);
                }
                RangeChange::Clipped(index, range, count) => {
                    self.sink.trim_front(*index, range, *count);
                }
                RangeChange::Removed(index) => self.sink.remove(*index),
            }
        }
    }

    fn set_block_classes(&mut self, classes: Option<String>) {
        if classes != self.block_classes {
            self.sink.set_block_classes(classes.as_deref());
            self.block_classes = classes;
        }
    }

    fn line_start(&self) -> usize {
        self.buffer[..self.cursor]
            .iter()
            .rposition(|&c| c == '\n')
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    fn line_end(&self) -> usize {
        self.buffer[self.cursor..]
            .iter()
            .position(|&c| c == '\n')
            .map(|i| self.cursor + i)
            .unwrap_or(self.buffer.len())
    }
}

impl<S: RenderSink> fmt::Display for VirtualConsole<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.buffer.iter().try_for_each(|c| write!(f, "{}", c))
    }
}

/// Join a parent class and ANSI classes with a space
pub fn join_classes(parent: &str, ansi: Option<&str>) -> String {
    match ansi {
        Some(ansi) if !parent.is_empty() => format!("{} {}", parent, ansi),
        Some(ansi) => ansi.to_string(),
        None => parent.to_string(),
    }
}

/// Apply control characters and escapes to `text`, returning the plain result
pub fn consolify(text: &str) -> String {
    let mut console = VirtualConsole::default();
    console.submit(text);
    console.text()
}
