//! Terminal renderer using crossterm
//!
//! Re-emits the console's styled ranges as ANSI output, translating the
//! class names back into crossterm colors and attributes.

use std::io::{self, Write};

use crossterm::{
    queue,
    style::{Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor},
};

use crate::config::ColorScheme;
use crate::core::console::VirtualConsole;
use crate::ui::sink::RenderSink;

/// Terminal style decoded from a range's class list
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TermStyle {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub attrs: Vec<Attribute>,
}

impl TermStyle {
    /// Decode a space-separated class list; classes that carry no style are skipped
    pub fn from_classes(classes: &str, scheme: &ColorScheme) -> Self {
        let mut style = Self::default();
        for class in classes.split_whitespace() {
            if let Some(n) = class
                .strip_prefix("xtermColor")
                .and_then(|n| n.parse::<u8>().ok())
            {
                style.fg = Some(Color::AnsiValue(n));
                continue;
            }
            if let Some(n) = class
                .strip_prefix("xtermBgColor")
                .and_then(|n| n.parse::<u8>().ok())
            {
                style.bg = Some(Color::AnsiValue(n));
                continue;
            }
            match class {
                "xtermInvertColor" => style.fg = Some(scheme.background.to_crossterm()),
                "xtermInvertBgColor" => style.bg = Some(scheme.foreground.to_crossterm()),
                "xtermBold" => style.attrs.push(Attribute::Bold),
                "xtermBlurred" => style.attrs.push(Attribute::Dim),
                "xtermItalic" => style.attrs.push(Attribute::Italic),
                "xtermUnderline" => style.attrs.push(Attribute::Underlined),
                "xtermBlink" => style.attrs.push(Attribute::SlowBlink),
                "xtermHidden" => style.attrs.push(Attribute::Hidden),
                "xtermStrike" => style.attrs.push(Attribute::CrossedOut),
                _ => {}
            }
        }
        style
    }

    pub fn is_plain(&self) -> bool {
        self.fg.is_none() && self.bg.is_none() && self.attrs.is_empty()
    }

    /// Apply style attributes
    fn apply<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for attr in &self.attrs {
            queue!(out, SetAttribute(*attr))?;
        }
        if let Some(fg) = self.fg {
            queue!(out, SetForegroundColor(fg))?;
        }
        if let Some(bg) = self.bg {
            queue!(out, SetBackgroundColor(bg))?;
        }
        Ok(())
    }
}

/// Renders a console buffer to an ANSI terminal
pub struct TerminalRenderer {
    scheme: ColorScheme,
}

impl Default for TerminalRenderer {
    fn default() -> Self {
        Self::new(ColorScheme::default())
    }
}

impl TerminalRenderer {
    pub fn new(scheme: ColorScheme) -> Self {
        Self { scheme }
    }

    /// Write every range with its style, resetting after each one
    pub fn render<W: Write, S: RenderSink>(
        &self,
        out: &mut W,
        console: &VirtualConsole<S>,
    ) -> io::Result<()> {
        for range in console.ranges() {
            let text = console.range_text(range);
            let style = TermStyle::from_classes(&range.class, &self.scheme);

            if let Some(link) = &range.link {
                queue!(out, Print(format!("\x1b]8;;{}\x1b\\", link.url)))?;
            }
            if style.is_plain() {
                queue!(out, Print(&text))?;
            } else {
                style.apply(out)?;
                queue!(out, Print(&text), SetAttribute(Attribute::Reset), ResetColor)?;
            }
            if range.link.is_some() {
                queue!(out, Print("\x1b]8;;\x1b\\"))?;
            }
        }
        out.flush()
    }
}
