//! HTML markup sink
//!
//! Mirrors the console's range list as a flat list of nodes, one `<span>` (or
//! `<a>` for hyperlinks) per range, and renders them as HTML.

use std::fmt::Write as _;

use crate::config::ColorScheme;
use crate::core::ranges::StyleRange;
use crate::core::term::{Hyperlink, LinkAction};
use crate::ui::sink::RenderSink;

/// One rendered range
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarkupNode {
    pub id: u64,
    pub class: String,
    pub text: String,
    pub link: Option<Hyperlink>,
}

impl MarkupNode {
    fn from_range(range: &StyleRange, text: &str) -> Self {
        Self {
            id: range.id,
            class: range.class.clone(),
            text: text.to_string(),
            link: range.link.clone(),
        }
    }

    /// Render this node as a single element
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        self.write_html(&mut html, &self.text);
        html
    }

    fn write_html(&self, out: &mut String, text: &str) {
        let class = if self.class.is_empty() {
            String::new()
        } else {
            format!(" class=\"{}\"", escape_attr(&self.class))
        };

        match &self.link {
            None => {
                let _ = write!(out, "<span{}>{}</span>", class, escape_html(text));
            }
            Some(link) => {
                let action = link.action();
                let target = match &action {
                    LinkAction::Run(code) => Some(code),
                    LinkAction::Help(topic) | LinkAction::Vignette(topic) => Some(topic),
                    LinkAction::OpenFile { .. } | LinkAction::Browse(_) => None,
                };
                let _ = match target {
                    Some(target) => write!(
                        out,
                        "<a{} data-action=\"{}\" data-target=\"{}\">{}</a>",
                        class,
                        action.kind(),
                        escape_attr(target),
                        escape_html(text)
                    ),
                    None => write!(
                        out,
                        "<a{} href=\"{}\">{}</a>",
                        class,
                        escape_attr(&link.url),
                        escape_html(text)
                    ),
                };
            }
        }
    }
}

/// Render sink holding the document as markup nodes
#[derive(Clone, Debug, Default)]
pub struct MarkupDocument {
    nodes: Vec<MarkupNode>,
    block_classes: Option<String>,
}

impl MarkupDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> &[MarkupNode] {
        &self.nodes
    }

    pub fn block_classes(&self) -> Option<&str> {
        self.block_classes.as_deref()
    }

    /// Markup of every node
    pub fn inner_html(&self) -> String {
        let mut html = String::new();
        for node in &self.nodes {
            node.write_html(&mut html, &node.text);
        }
        html
    }

    /// Markup of a single node by range id
    pub fn node_html(&self, id: u64) -> Option<String> {
        self.nodes.iter().find(|n| n.id == id).map(MarkupNode::to_html)
    }

    /// Markup of the last `lines` complete lines only.
    ///
    /// The partial line after the final line break is always included.
    pub fn render_tail(&self, lines: usize) -> String {
        let total: usize = self.nodes.iter().map(|n| count_newlines(&n.text)).sum();
        let mut skip = total.saturating_sub(lines);

        let mut html = String::new();
        for node in &self.nodes {
            if skip == 0 {
                node.write_html(&mut html, &node.text);
                continue;
            }
            let breaks = count_newlines(&node.text);
            if breaks < skip {
                skip -= breaks;
                continue;
            }
            // The window starts inside this node
            let rest = node
                .text
                .match_indices('\n')
                .nth(skip - 1)
                .map(|(i, _)| &node.text[i + 1..])
                .unwrap_or("");
            skip = 0;
            if !rest.is_empty() {
                node.write_html(&mut html, rest);
            }
        }
        html
    }
}

impl RenderSink for MarkupDocument {
    fn insert(&mut self, index: usize, range: &StyleRange, text: &str) {
        let index = index.min(self.nodes.len());
        self.nodes.insert(index, MarkupNode::from_range(range, text));
    }

    fn update(&mut self, index: usize, range: &StyleRange, text: &str) {
        match self.nodes.get_mut(index) {
            Some(node) => *node = MarkupNode::from_range(range, text),
            None => tracing::debug!("Update for missing node {}", index),
        }
    }

    fn append(&mut self, index: usize, _range: &StyleRange, text: &str) {
        match self.nodes.get_mut(index) {
            Some(node) => node.text.push_str(text),
            None => tracing::debug!("Append to missing node {}", index),
        }
    }

    fn trim_front(&mut self, index: usize, _range: &StyleRange, count: usize) {
        match self.nodes.get_mut(index) {
            Some(node) => {
                let cut = node
                    .text
                    .char_indices()
                    .nth(count)
                    .map(|(i, _)| i)
                    .unwrap_or(node.text.len());
                node.text.drain(..cut);
            }
            None => tracing::debug!("Trim of missing node {}", index),
        }
    }

    fn remove(&mut self, index: usize) {
        if index < self.nodes.len() {
            self.nodes.remove(index);
        }
    }

    fn clear(&mut self) {
        self.nodes.clear();
    }

    fn set_block_classes(&mut self, classes: Option<&str>) {
        self.block_classes = classes.map(str::to_string);
    }
}

fn count_newlines(text: &str) -> usize {
    text.bytes().filter(|&b| b == b'\n').count()
}

/// Escape text content
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape an attribute value
pub fn escape_attr(text: &str) -> String {
    escape_html(text).replace('"', "&quot;")
}

/// CSS rules for every class the console produces
pub fn stylesheet(scheme: &ColorScheme) -> String {
    let mut css = String::new();
    let _ = writeln!(
        css,
        ".vconsole {{ color: {}; background-color: {}; }}",
        scheme.foreground.to_hex(),
        scheme.background.to_hex()
    );
    for index in 0..=255u8 {
        let hex = scheme.xterm_color(index).to_hex();
        let _ = writeln!(css, ".xtermColor{} {{ color: {}; }}", index, hex);
        let _ = writeln!(css, ".xtermBgColor{} {{ background-color: {}; }}", index, hex);
    }
    let _ = writeln!(
        css,
        ".xtermInvertColor {{ color: {}; }}",
        scheme.background.to_hex()
    );
    let _ = writeln!(
        css,
        ".xtermInvertBgColor {{ background-color: {}; }}",
        scheme.foreground.to_hex()
    );
    css.push_str(
        ".xtermBold { font-weight: bold; }\n\
         .xtermBlurred { opacity: 0.6; }\n\
         .xtermItalic { font-style: italic; }\n\
         .xtermUnderline { text-decoration: underline; }\n\
         .xtermStrike { text-decoration: line-through; }\n\
         .xtermUnderline.xtermStrike { text-decoration: underline line-through; }\n\
         .xtermBlink { animation: xtermBlink 1s step-end infinite; }\n\
         @keyframes xtermBlink { 50% { opacity: 0; } }\n\
         .xtermHidden { visibility: hidden; }\n\
         .xtermDoubleWidth { font-size: 200%; }\n\
         .xtermDoubleHeightTop, .xtermDoubleHeightBottom { font-size: 200%; line-height: 1; }\n",
    );
    css
}
