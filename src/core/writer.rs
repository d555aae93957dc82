//! Console output writer
//!
//! Wraps a [`VirtualConsole`] rendering into a [`MarkupDocument`] and adds
//! what a scrolling output pane needs on top: a line limit with trimming of
//! the oldest lines, separate spans for error output, and windowed rendering
//! of very long output.

use tracing::debug;

use crate::config::Config;
use crate::core::console::{ConsolePrefs, VirtualConsole};
use crate::ui::markup::{escape_attr, MarkupDocument};

/// Line-limited console output rendered as HTML
pub struct ConsoleOutputWriter {
    console: VirtualConsole<MarkupDocument>,
    max_output_lines: Option<usize>,
    limit_visible: bool,
    visible_window_lines: usize,
    /// Capture written text for screen readers
    announce: bool,
    /// Markup of the ranges written by the last error output
    new_elements: Vec<String>,
}

impl Default for ConsoleOutputWriter {
    fn default() -> Self {
        Self::new(ConsolePrefs::default())
    }
}

impl ConsoleOutputWriter {
    /// Create a writer with no line limit
    pub fn new(prefs: ConsolePrefs) -> Self {
        Self {
            console: VirtualConsole::new(prefs, MarkupDocument::new()),
            max_output_lines: None,
            limit_visible: false,
            visible_window_lines: 500,
            announce: true,
            new_elements: Vec::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let mut writer = Self::new(config.console_prefs());
        writer.max_output_lines = config.output_line_limit();
        writer.limit_visible = config.limit_visible;
        writer.visible_window_lines = config.visible_window_lines;
        writer
    }

    pub fn max_output_lines(&self) -> Option<usize> {
        self.max_output_lines
    }

    pub fn set_max_output_lines(&mut self, max: Option<usize>) {
        self.max_output_lines = max;
    }

    pub fn set_limit_visible(&mut self, limit: bool, window_lines: usize) {
        self.limit_visible = limit;
        self.visible_window_lines = window_lines;
    }

    /// Whether output is captured for [`take_new_text`](Self::take_new_text).
    ///
    /// Only has an effect with the screen reader preference on. Callers that
    /// never take the text should turn this off.
    pub fn set_announce(&mut self, announce: bool) {
        self.announce = announce;
        if !announce {
            self.console.take_new_text();
        }
    }

    /// Number of complete lines currently held
    pub fn current_lines(&self) -> usize {
        self.console.line_count()
    }

    /// Write a chunk of output.
    ///
    /// Error output always starts a new span. With `ignore_line_count` set the
    /// line limit is not enforced; call [`trim_excess`](Self::trim_excess)
    /// once the bulk write is done. Returns `false` if older lines had to be
    /// trimmed to make room.
    pub fn output(&mut self, text: &str, class: &str, is_error: bool, ignore_line_count: bool) -> bool {
        self.console.submit_full(text, Some(class), is_error, self.announce);

        self.new_elements.clear();
        if is_error {
            let document = self.console.sink();
            self.new_elements = self
                .console
                .new_ranges()
                .iter()
                .filter_map(|r| document.node_html(r.id))
                .collect();
        }

        if ignore_line_count {
            return true;
        }
        !self.trim_excess()
    }

    /// Remove the oldest lines beyond the limit. Returns `true` if anything was removed.
    pub fn trim_excess(&mut self) -> bool {
        let max = match self.max_output_lines {
            Some(max) => max,
            None => return false,
        };
        let lines = self.console.line_count();
        if lines <= max {
            return false;
        }

        let excess = lines - max;
        debug!("Trimming {} lines (limit {})", excess, max);
        self.console.drop_leading_lines(excess) > 0
    }

    /// Markup of the spans produced by the last error output
    pub fn new_elements(&self) -> &[String] {
        &self.new_elements
    }

    /// Text captured for screen readers since the last call
    pub fn take_new_text(&mut self) -> String {
        self.console.take_new_text()
    }

    /// Markup of the output, limited to the trailing window when configured
    pub fn render_html(&self) -> String {
        let document = self.console.sink();
        if self.limit_visible && self.current_lines() > self.visible_window_lines {
            document.render_tail(self.visible_window_lines)
        } else {
            document.inner_html()
        }
    }

    /// Output wrapped in a `<pre>` element carrying the block classes
    pub fn render_document(&self) -> String {
        let class = match self.console.sink().block_classes() {
            Some(block) => format!("vconsole {}", escape_attr(block)),
            None => "vconsole".to_string(),
        };
        format!("<pre class=\"{}\">{}</pre>", class, self.render_html())
    }

    /// Plain text of the output
    pub fn text(&self) -> String {
        self.console.text()
    }

    pub fn console(&self) -> &VirtualConsole<MarkupDocument> {
        &self.console
    }

    /// Remove all output and styling state
    pub fn clear(&mut self) {
        self.console.clear();
        self.new_elements.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MY_CLASS: &str = "myClass";
    const ERROR_CLASS: &str = "myErrorClass";

    fn numbered_line(i: usize) -> String {
        format!("{}\n", i)
    }

    fn error_span(text: &str) -> String {
        format!("<span class=\"myErrorClass\">{}</span>", text)
    }

    #[test]
    fn test_max_lines_default_unlimited() {
        let mut output = ConsoleOutputWriter::default();
        assert_eq!(output.max_output_lines(), None);
        output.set_max_output_lines(Some(1000));
        assert_eq!(output.max_output_lines(), Some(1000));
    }

    #[test]
    fn test_simple_line_count() {
        let mut output = ConsoleOutputWriter::default();
        assert_eq!(output.current_lines(), 0);
        assert!(output.output("Hello World", "", false, false));
        assert_eq!(output.current_lines(), 0);
        assert!(output.output(" more on same line", "", false, false));
        assert_eq!(output.current_lines(), 0);
        assert!(output.output("next line starts now\n", "", false, false));
        assert_eq!(output.current_lines(), 1);
    }

    #[test]
    fn test_trimming() {
        let mut output = ConsoleOutputWriter::default();
        let max_lines = 25;
        output.set_max_output_lines(Some(max_lines));

        for i in 0..max_lines {
            assert!(output.output(&numbered_line(i), "", false, false));
            assert_eq!(output.current_lines(), i + 1);
        }

        assert!(!output.trim_excess());
        assert_eq!(output.current_lines(), max_lines);

        assert!(!output.output(&numbered_line(max_lines), "", false, false));
        assert_eq!(output.current_lines(), max_lines);
        assert!(!output.output(&numbered_line(max_lines + 1), "", false, false));
        assert_eq!(output.current_lines(), max_lines);

        let expected: String = (2..=max_lines + 1).map(numbered_line).collect();
        assert_eq!(output.text(), expected);
        assert_eq!(output.render_html(), format!("<span>{}</span>", expected));
    }

    #[test]
    fn test_bulk_add_then_trim() {
        let mut output = ConsoleOutputWriter::default();
        let max_lines = 50;
        output.set_max_output_lines(Some(max_lines));

        for i in 0..max_lines + 10 {
            assert!(output.output(&numbered_line(i), MY_CLASS, false, true));
            assert_eq!(output.current_lines(), i + 1);
        }

        assert!(output.trim_excess());
        assert_eq!(output.current_lines(), max_lines);

        let expected: String = (10..max_lines + 10).map(numbered_line).collect();
        assert_eq!(
            output.render_html(),
            format!("<span class=\"myClass\">{}</span>", expected)
        );
    }

    #[test]
    fn test_simple_error() {
        let mut output = ConsoleOutputWriter::default();
        assert!(output.output("Oh no, an error!!", ERROR_CLASS, true, true));
        assert_eq!(output.current_lines(), 0);
        assert_eq!(output.render_html(), error_span("Oh no, an error!!"));

        let mut output = ConsoleOutputWriter::default();
        assert!(output.output("Oh no, an error!!\n", ERROR_CLASS, true, true));
        assert_eq!(output.current_lines(), 1);
        assert_eq!(output.render_html(), error_span("Oh no, an error!!\n"));
    }

    #[test]
    fn test_errors_get_own_spans() {
        let mut output = ConsoleOutputWriter::default();
        for line in ["1\n", "2\n", "3\n", "4\n"] {
            output.output(line, ERROR_CLASS, true, true);
        }
        let last = "Error in h() : An error! Oh No!";
        output.output(last, ERROR_CLASS, true, true);

        let expected: String = ["1\n", "2\n", "3\n", "4\n", last]
            .iter()
            .map(|t| error_span(t))
            .collect();
        assert_eq!(output.current_lines(), 4);
        assert_eq!(output.render_html(), expected);
        assert_eq!(output.new_elements(), &[error_span(last)]);
    }

    #[test]
    fn test_styled_multiline_error() {
        let mut output = ConsoleOutputWriter::default();
        for line in ["1\n", "2\n", "3\n", "4\n"] {
            output.output(line, ERROR_CLASS, true, true);
        }
        output.output(
            "Error in h2() : An error!\n\x1b[31mOh No!\n\x1b[39m\x1b[43m\x1b[31mWow!\x1b[39m\x1b[49m",
            ERROR_CLASS,
            true,
            true,
        );

        let new_elements = vec![
            error_span("Error in h2() : An error!\n"),
            "<span class=\"myErrorClass xtermColor1\">Oh No!</span>".to_string(),
            error_span("\n"),
            "<span class=\"myErrorClass xtermBgColor3 xtermColor1\">Wow!</span>".to_string(),
        ];
        assert_eq!(output.current_lines(), 6);
        assert_eq!(output.new_elements(), new_elements.as_slice());

        let expected: String = ["1\n", "2\n", "3\n", "4\n"]
            .iter()
            .map(|t| error_span(t))
            .chain(new_elements.iter().cloned())
            .collect();
        assert_eq!(output.render_html(), expected);
    }

    #[test]
    fn test_regular_output_merges() {
        let mut output = ConsoleOutputWriter::default();
        output.output("Hello", MY_CLASS, false, true);
        output.output("World", MY_CLASS, false, true);
        assert_eq!(output.render_html(), "<span class=\"myClass\">HelloWorld</span>");

        let mut output = ConsoleOutputWriter::default();
        for line in ["One\n", "Two\n", "Three\n", "Four\n"] {
            output.output(line, MY_CLASS, false, true);
        }
        assert_eq!(output.current_lines(), 4);
        assert_eq!(
            output.render_html(),
            "<span class=\"myClass\">One\nTwo\nThree\nFour\n</span>"
        );
    }

    #[test]
    fn test_mixed_error_and_regular_output() {
        let mut output = ConsoleOutputWriter::default();
        output.output("1\n", ERROR_CLASS, true, true);
        output.output("2\n", ERROR_CLASS, true, true);
        output.output("Hello ", MY_CLASS, false, true);
        assert!(output.new_elements().is_empty());
        output.output("world\n", MY_CLASS, false, true);
        output.output("3\n", ERROR_CLASS, true, true);

        assert_eq!(output.current_lines(), 4);
        assert_eq!(
            output.render_html(),
            format!(
                "{}{}<span class=\"myClass\">Hello world\n</span>{}",
                error_span("1\n"),
                error_span("2\n"),
                error_span("3\n")
            )
        );
        assert_eq!(output.new_elements(), &[error_span("3\n")]);
    }

    #[test]
    fn test_error_with_ansi() {
        let mut output = ConsoleOutputWriter::default();
        output.output("Error in test7a() : \x1b[32mHi\x1b[39m", ERROR_CLASS, true, true);
        assert_eq!(output.current_lines(), 0);
        assert_eq!(
            output.new_elements(),
            &[
                error_span("Error in test7a() : "),
                "<span class=\"myErrorClass xtermColor2\">Hi</span>".to_string(),
            ]
        );
    }

    #[test]
    fn test_windowed_rendering() {
        let mut output = ConsoleOutputWriter::default();
        output.set_limit_visible(true, 2);
        for i in 0..5 {
            output.output(&numbered_line(i), "", false, false);
        }
        assert_eq!(output.render_html(), "<span>3\n4\n</span>");
        assert_eq!(output.text(), "0\n1\n2\n3\n4\n");
    }

    #[test]
    fn test_render_document_and_clear() {
        let mut output = ConsoleOutputWriter::default();
        output.output("\x1b#6wide", "", false, false);
        assert_eq!(
            output.render_document(),
            "<pre class=\"vconsole xtermDoubleWidth\"><span>wide</span></pre>"
        );

        output.clear();
        assert_eq!(output.render_document(), "<pre class=\"vconsole\"></pre>");
        assert_eq!(output.current_lines(), 0);
    }

    #[test]
    fn test_announce_toggle() {
        let prefs = ConsolePrefs {
            screen_reader: true,
            ..ConsolePrefs::default()
        };
        let mut output = ConsoleOutputWriter::new(prefs);
        output.output("first\n", "", false, false);
        output.set_announce(false);
        output.output("second\n", "", false, false);
        assert_eq!(output.take_new_text(), "");

        output.set_announce(true);
        output.output("third", "", false, false);
        assert_eq!(output.take_new_text(), "third");
        assert_eq!(output.text(), "first\nsecond\nthird");
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            max_output_lines: 3,
            ..Config::default()
        };
        let mut output = ConsoleOutputWriter::from_config(&config);
        for i in 0..5 {
            output.output(&numbered_line(i), "", false, false);
        }
        assert_eq!(output.text(), "2\n3\n4\n");
    }
}
