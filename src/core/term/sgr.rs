//! ANSI SGR interpretation
//!
//! Turns Select Graphic Rendition sequences into CSS-like class names.
//! Colors map to `xtermColor{n}` / `xtermBgColor{n}`; attributes map to
//! `xtermBold`, `xtermUnderline` and friends. Inverse video swaps which
//! color each slot displays without touching the stored colors.

use bitflags::bitflags;
use tracing::debug;

/// 7-bit Control Sequence Introducer
pub const CSI: &str = "\x1b[";
/// SGR final character
pub const SGR: &str = "m";

pub const RESET: u16 = 0;
pub const BOLD: u16 = 1;
pub const BLURRED: u16 = 2;
pub const ITALIC: u16 = 3;
pub const UNDERLINE: u16 = 4;
pub const BLINK_SLOW: u16 = 5;
pub const BLINK_FAST: u16 = 6;
pub const INVERSE: u16 = 7;
pub const HIDDEN: u16 = 8;
pub const STRIKETHROUGH: u16 = 9;
pub const BOLD_BLURRED_OFF: u16 = 22;
pub const ITALIC_OFF: u16 = 23;
pub const UNDERLINE_OFF: u16 = 24;
pub const BLINK_OFF: u16 = 25;
pub const INVERSE_OFF: u16 = 27;
pub const HIDDEN_OFF: u16 = 28;
pub const STRIKETHROUGH_OFF: u16 = 29;
pub const FOREGROUND_MIN: u16 = 30;
pub const FOREGROUND_MAX: u16 = 37;
pub const FOREGROUND_EXT: u16 = 38;
pub const RESET_FOREGROUND: u16 = 39;
pub const BACKGROUND_MIN: u16 = 40;
pub const BACKGROUND_MAX: u16 = 47;
pub const BACKGROUND_EXT: u16 = 48;
pub const RESET_BACKGROUND: u16 = 49;
pub const FOREGROUND_INTENSE_MIN: u16 = 90;
pub const FOREGROUND_INTENSE_MAX: u16 = 97;
pub const BACKGROUND_INTENSE_MIN: u16 = 100;
pub const BACKGROUND_INTENSE_MAX: u16 = 107;
/// `38;5;n` / `48;5;n`
pub const EXT_BY_INDEX: u16 = 5;
/// `38;2;r;g;b` / `48;2;r;g;b`
pub const EXT_BY_RGB: u16 = 2;

pub const INVERT_COLOR_CLASS: &str = "xtermInvertColor";
pub const INVERT_BG_COLOR_CLASS: &str = "xtermInvertBgColor";

/// Named foreground color codes
pub mod fore {
    pub const BLACK: u16 = 30;
    pub const RED: u16 = 31;
    pub const GREEN: u16 = 32;
    pub const YELLOW: u16 = 33;
    pub const BLUE: u16 = 34;
    pub const MAGENTA: u16 = 35;
    pub const CYAN: u16 = 36;
    pub const WHITE: u16 = 37;
}

/// Named background color codes
pub mod back {
    pub const BLACK: u16 = 40;
    pub const RED: u16 = 41;
    pub const GREEN: u16 = 42;
    pub const YELLOW: u16 = 43;
    pub const BLUE: u16 = 44;
    pub const MAGENTA: u16 = 45;
    pub const CYAN: u16 = 46;
    pub const WHITE: u16 = 47;
}

/// Color held by the foreground or background slot
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Color {
    #[default]
    Default,
    Indexed(u8),
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct AttrFlags: u16 {
        const BOLD          = 0b0000_0000_0001;
        const BLURRED       = 0b0000_0000_0010;
        const ITALIC        = 0b0000_0000_0100;
        const UNDERLINE     = 0b0000_0000_1000;
        const BLINK         = 0b0000_0001_0000;
        const INVERSE       = 0b0000_0010_0000;
        const HIDDEN        = 0b0000_0100_0000;
        const STRIKETHROUGH = 0b0000_1000_0000;
    }
}

impl AttrFlags {
    /// Class for a single attribute; INVERSE is expressed through the color slots
    fn class(self) -> Option<&'static str> {
        match self {
            f if f == AttrFlags::BOLD => Some("xtermBold"),
            f if f == AttrFlags::BLURRED => Some("xtermBlurred"),
            f if f == AttrFlags::ITALIC => Some("xtermItalic"),
            f if f == AttrFlags::UNDERLINE => Some("xtermUnderline"),
            f if f == AttrFlags::BLINK => Some("xtermBlink"),
            f if f == AttrFlags::HIDDEN => Some("xtermHidden"),
            f if f == AttrFlags::STRIKETHROUGH => Some("xtermStrike"),
            _ => None,
        }
    }
}

/// Class names produced by the interpreter
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnsiClasses {
    /// Classes applied to the text being written
    pub inline: Option<String>,
    /// Classes applied to the enclosing output block
    pub block: Option<String>,
}

/// Class for a foreground SGR code (30-37, 90-97)
pub fn clazz_for_color(code: u16) -> String {
    match code {
        FOREGROUND_MIN..=FOREGROUND_MAX => format!("xtermColor{}", code - FOREGROUND_MIN),
        FOREGROUND_INTENSE_MIN..=FOREGROUND_INTENSE_MAX => {
            format!("xtermColor{}", code - FOREGROUND_INTENSE_MIN + 8)
        }
        _ => format!("xtermColor{}", code),
    }
}

/// Class for a background SGR code (40-47, 100-107)
pub fn clazz_for_bg_color(code: u16) -> String {
    match code {
        BACKGROUND_MIN..=BACKGROUND_MAX => format!("xtermBgColor{}", code - BACKGROUND_MIN),
        BACKGROUND_INTENSE_MIN..=BACKGROUND_INTENSE_MAX => {
            format!("xtermBgColor{}", code - BACKGROUND_INTENSE_MIN + 8)
        }
        _ => format!("xtermBgColor{}", code),
    }
}

/// Incremental SGR interpreter state
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnsiCode {
    fg: Color,
    bg: Color,
    flags: AttrFlags,
    /// Active inline classes, in the order they were applied
    inline: Vec<String>,
    block: Vec<String>,
}

impl AnsiCode {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fg(&self) -> Color {
        self.fg
    }

    pub fn bg(&self) -> Color {
        self.bg
    }

    pub fn flags(&self) -> AttrFlags {
        self.flags
    }

    /// Apply a complete SGR sequence (`ESC [ params m`) and return the active classes.
    ///
    /// Malformed parameters reset the whole state.
    pub fn process_code(&mut self, code: &str) -> AnsiClasses {
        let params = match parse_params(code) {
            Some(params) => params,
            None => {
                debug!("Malformed SGR sequence {:?}, resetting", code);
                self.reset();
                return self.classes();
            }
        };

        let mut iter = params.into_iter();
        while let Some(param) = iter.next() {
            match param {
                RESET => self.reset(),
                BOLD => self.set_flag(AttrFlags::BOLD),
                BLURRED => self.set_flag(AttrFlags::BLURRED),
                ITALIC => self.set_flag(AttrFlags::ITALIC),
                UNDERLINE => self.set_flag(AttrFlags::UNDERLINE),
                BLINK_SLOW | BLINK_FAST => self.set_flag(AttrFlags::BLINK),
                INVERSE => self.set_inverse(true),
                HIDDEN => self.set_flag(AttrFlags::HIDDEN),
                STRIKETHROUGH => self.set_flag(AttrFlags::STRIKETHROUGH),

                BOLD_BLURRED_OFF => {
                    self.clear_flag(AttrFlags::BOLD);
                    self.clear_flag(AttrFlags::BLURRED);
                }
                ITALIC_OFF => self.clear_flag(AttrFlags::ITALIC),
                UNDERLINE_OFF => self.clear_flag(AttrFlags::UNDERLINE),
                BLINK_OFF => self.clear_flag(AttrFlags::BLINK),
                INVERSE_OFF => self.set_inverse(false),
                HIDDEN_OFF => self.clear_flag(AttrFlags::HIDDEN),
                STRIKETHROUGH_OFF => self.clear_flag(AttrFlags::STRIKETHROUGH),

                FOREGROUND_MIN..=FOREGROUND_MAX => {
                    self.set_fg(Color::Indexed((param - FOREGROUND_MIN) as u8));
                }
                FOREGROUND_INTENSE_MIN..=FOREGROUND_INTENSE_MAX => {
                    self.set_fg(Color::Indexed((param - FOREGROUND_INTENSE_MIN + 8) as u8));
                }
                RESET_FOREGROUND => self.set_fg(Color::Default),

                BACKGROUND_MIN..=BACKGROUND_MAX => {
                    self.set_bg(Color::Indexed((param - BACKGROUND_MIN) as u8));
                }
                BACKGROUND_INTENSE_MIN..=BACKGROUND_INTENSE_MAX => {
                    self.set_bg(Color::Indexed((param - BACKGROUND_INTENSE_MIN + 8) as u8));
                }
                RESET_BACKGROUND => self.set_bg(Color::Default),

                FOREGROUND_EXT | BACKGROUND_EXT => match read_extended(&mut iter) {
                    Ok(Some(color)) if param == FOREGROUND_EXT => self.set_fg(color),
                    Ok(Some(color)) => self.set_bg(color),
                    // Truecolor is recognized but not rendered
                    Ok(None) => {}
                    Err(()) => {
                        debug!("Malformed extended color in {:?}, resetting", code);
                        self.reset();
                        return self.classes();
                    }
                },

                // Fonts, framing, overline and the like are not rendered
                _ => {}
            }
        }

        self.classes()
    }

    /// Apply a DEC line attribute (`ESC # n`)
    pub fn process_line_attribute(&mut self, n: u8) -> AnsiClasses {
        self.block.clear();
        match n {
            3 => self.block.push("xtermDoubleHeightTop".to_string()),
            4 => self.block.push("xtermDoubleHeightBottom".to_string()),
            6 => self.block.push("xtermDoubleWidth".to_string()),
            _ => {}
        }
        self.classes()
    }

    /// Current classes without applying anything
    pub fn classes(&self) -> AnsiClasses {
        AnsiClasses {
            inline: join(&self.inline),
            block: join(&self.block),
        }
    }

    /// Reset colors and attributes; block classes are left alone
    pub fn reset(&mut self) {
        self.fg = Color::Default;
        self.bg = Color::Default;
        self.flags = AttrFlags::empty();
        self.inline.clear();
    }

    fn set_flag(&mut self, flag: AttrFlags) {
        self.flags.insert(flag);
        if let Some(class) = flag.class() {
            self.add_class(class.to_string());
        }
    }

    fn clear_flag(&mut self, flag: AttrFlags) {
        self.flags.remove(flag);
        if let Some(class) = flag.class() {
            self.remove_class(class);
        }
    }

    fn set_fg(&mut self, color: Color) {
        let before = self.slot_classes();
        self.fg = color;
        self.refresh_slots(before);
    }

    fn set_bg(&mut self, color: Color) {
        let before = self.slot_classes();
        self.bg = color;
        self.refresh_slots(before);
    }

    fn set_inverse(&mut self, on: bool) {
        if self.flags.contains(AttrFlags::INVERSE) == on {
            return;
        }
        let (fg_before, bg_before) = self.slot_classes();
        self.flags.set(AttrFlags::INVERSE, on);
        for class in [fg_before, bg_before].into_iter().flatten() {
            self.remove_class(&class);
        }
        let (fg_after, bg_after) = self.slot_classes();
        for class in [fg_after, bg_after].into_iter().flatten() {
            self.add_class(class);
        }
    }

    /// Replace whichever slot classes changed, appending the new ones
    fn refresh_slots(&mut self, before: (Option<String>, Option<String>)) {
        let after = self.slot_classes();
        for (old, new) in [(before.0, after.0), (before.1, after.1)] {
            if old != new {
                if let Some(old) = old {
                    self.remove_class(&old);
                }
                if let Some(new) = new {
                    self.add_class(new);
                }
            }
        }
    }

    /// Classes displayed by the foreground and background slots
    fn slot_classes(&self) -> (Option<String>, Option<String>) {
        if self.flags.contains(AttrFlags::INVERSE) {
            let fg = match self.bg {
                Color::Indexed(n) => format!("xtermColor{}", n),
                Color::Default => INVERT_COLOR_CLASS.to_string(),
            };
            let bg = match self.fg {
                Color::Indexed(n) => format!("xtermBgColor{}", n),
                Color::Default => INVERT_BG_COLOR_CLASS.to_string(),
            };
            (Some(fg), Some(bg))
        } else {
            let fg = match self.fg {
                Color::Indexed(n) => Some(format!("xtermColor{}", n)),
                Color::Default => None,
            };
            let bg = match self.bg {
                Color::Indexed(n) => Some(format!("xtermBgColor{}", n)),
                Color::Default => None,
            };
            (fg, bg)
        }
    }

    fn add_class(&mut self, class: String) {
        if !self.inline.contains(&class) {
            self.inline.push(class);
        }
    }

    fn remove_class(&mut self, class: &str) {
        self.inline.retain(|c| c != class);
    }
}

/// Extract numeric parameters from `ESC [ ... m`; empty parameters count as 0
fn parse_params(code: &str) -> Option<Vec<u16>> {
    let body = code
        .strip_prefix(CSI)
        .or_else(|| code.strip_prefix('\u{9b}'))
        .unwrap_or(code);
    let body = body.strip_suffix(SGR).unwrap_or(body);

    if body.is_empty() {
        return Some(vec![RESET]);
    }

    body.split(|c| c == ';' || c == ':')
        .map(|p| if p.is_empty() { Some(0) } else { p.parse().ok() })
        .collect()
}

/// Read the tail of a `38`/`48` sequence.
///
/// `Ok(None)` means a well-formed color that is not rendered (RGB).
fn read_extended(iter: &mut impl Iterator<Item = u16>) -> Result<Option<Color>, ()> {
    match iter.next() {
        Some(EXT_BY_INDEX) => match iter.next() {
            Some(n) if n <= 255 => Ok(Some(Color::Indexed(n as u8))),
            _ => Err(()),
        },
        Some(EXT_BY_RGB) => {
            for _ in 0..3 {
                match iter.next() {
                    Some(v) if v <= 255 => {}
                    _ => return Err(()),
                }
            }
            Ok(None)
        }
        _ => Err(()),
    }
}

fn join(classes: &[String]) -> Option<String> {
    if classes.is_empty() {
        None
    } else {
        Some(classes.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csi(code: &str) -> String {
        format!("{}{}{}", CSI, code, SGR)
    }

    fn inline(ansi: &mut AnsiCode, code: &str) -> String {
        ansi.process_code(&csi(code)).inline.unwrap_or_default()
    }

    #[test]
    fn test_named_colors() {
        assert_eq!(clazz_for_color(fore::BLACK), "xtermColor0");
        assert_eq!(clazz_for_color(fore::RED), "xtermColor1");
        assert_eq!(clazz_for_color(fore::WHITE), "xtermColor7");
        assert_eq!(clazz_for_bg_color(back::GREEN), "xtermBgColor2");
        assert_eq!(clazz_for_bg_color(back::CYAN), "xtermBgColor6");

        let mut ansi = AnsiCode::new();
        let code = format!("{};{}", fore::YELLOW, back::BLUE);
        assert_eq!(inline(&mut ansi, &code), "xtermColor3 xtermBgColor4");
        let code = format!("{};{}", fore::MAGENTA, back::RED);
        assert_eq!(inline(&mut ansi, &code), "xtermColor5 xtermBgColor1");
    }

    #[test]
    fn test_color_class_helpers() {
        assert_eq!(clazz_for_color(FOREGROUND_MIN), "xtermColor0");
        assert_eq!(clazz_for_color(FOREGROUND_MAX), "xtermColor7");
        assert_eq!(clazz_for_bg_color(BACKGROUND_MIN), "xtermBgColor0");
        assert_eq!(clazz_for_bg_color(BACKGROUND_MAX), "xtermBgColor7");
        assert_eq!(clazz_for_color(FOREGROUND_INTENSE_MIN), "xtermColor8");
        assert_eq!(clazz_for_color(FOREGROUND_INTENSE_MAX), "xtermColor15");
        assert_eq!(clazz_for_bg_color(BACKGROUND_INTENSE_MIN), "xtermBgColor8");
        assert_eq!(clazz_for_bg_color(BACKGROUND_INTENSE_MAX), "xtermBgColor15");
    }

    #[test]
    fn test_basic_colors() {
        let mut ansi = AnsiCode::new();
        assert_eq!(inline(&mut ansi, "35"), "xtermColor5");
        assert_eq!(inline(&mut ansi, "42"), "xtermColor5 xtermBgColor2");
        assert_eq!(inline(&mut ansi, "39"), "xtermBgColor2");
        assert_eq!(inline(&mut ansi, "49"), "");
        assert_eq!(inline(&mut ansi, "103"), "xtermBgColor11");
    }

    #[test]
    fn test_indexed_colors() {
        let mut ansi = AnsiCode::new();
        assert_eq!(inline(&mut ansi, "38;5;65;48;5;252"), "xtermColor65 xtermBgColor252");
    }

    #[test]
    fn test_reset_returns_to_initial_state() {
        let mut ansi = AnsiCode::new();
        ansi.process_code(&csi("1;3;4;7;38;5;200;44;9"));
        assert_ne!(ansi, AnsiCode::default());

        let classes = ansi.process_code(&csi("0"));
        assert_eq!(classes, AnsiClasses::default());
        assert_eq!(ansi, AnsiCode::default());

        ansi.process_code(&csi("31"));
        ansi.process_code(&csi(""));
        assert_eq!(ansi, AnsiCode::default());
    }

    #[test]
    fn test_complex_sequence_drops_bold() {
        let mut ansi = AnsiCode::new();
        assert_eq!(
            inline(&mut ansi, "32;48;5;230;1;4;22;27"),
            "xtermColor2 xtermBgColor230 xtermUnderline"
        );
    }

    #[test]
    fn test_attributes() {
        let mut ansi = AnsiCode::new();
        assert_eq!(inline(&mut ansi, "1"), "xtermBold");
        assert_eq!(inline(&mut ansi, "3"), "xtermBold xtermItalic");
        assert_eq!(inline(&mut ansi, "9;8;5"), "xtermBold xtermItalic xtermStrike xtermHidden xtermBlink");
        assert_eq!(inline(&mut ansi, "23;22;29;28;25"), "");
        assert_eq!(ansi.flags(), AttrFlags::empty());
    }

    #[test]
    fn test_rgb_is_skipped() {
        let mut ansi = AnsiCode::new();
        assert_eq!(inline(&mut ansi, "38;2;123;231;121;1"), "xtermBold");

        let mut ansi = AnsiCode::new();
        assert_eq!(
            inline(&mut ansi, "1;38;2;1;2;3;4;48;2;1;2;3;38;5;255"),
            "xtermBold xtermUnderline xtermColor255"
        );
    }

    #[test]
    fn test_malformed_extended_resets() {
        let mut ansi = AnsiCode::new();
        ansi.process_code(&csi("1;31"));
        assert_eq!(inline(&mut ansi, "38;5"), "");
        assert_eq!(ansi, AnsiCode::default());

        ansi.process_code(&csi("4"));
        assert_eq!(inline(&mut ansi, "48;5;300"), "");
        ansi.process_code(&csi("4"));
        assert_eq!(inline(&mut ansi, "38;9;1"), "");
    }

    #[test]
    fn test_non_numeric_resets() {
        let mut ansi = AnsiCode::new();
        ansi.process_code(&csi("31"));
        assert_eq!(inline(&mut ansi, "3x"), "");
    }

    #[test]
    fn test_unsupported_codes_ignored() {
        let mut ansi = AnsiCode::new();
        assert_eq!(inline(&mut ansi, "31;11;53"), "xtermColor1");
    }

    #[test]
    fn test_inverse_default_colors() {
        let mut ansi = AnsiCode::new();
        assert_eq!(inline(&mut ansi, "7"), "xtermInvertColor xtermInvertBgColor");
        assert_eq!(inline(&mut ansi, "27"), "");
    }

    #[test]
    fn test_inverse_swaps_custom_colors() {
        let mut ansi = AnsiCode::new();
        assert_eq!(inline(&mut ansi, "42;7"), "xtermColor2 xtermInvertBgColor");

        let mut ansi = AnsiCode::new();
        assert_eq!(inline(&mut ansi, "34;7"), "xtermInvertColor xtermBgColor4");

        let mut ansi = AnsiCode::new();
        assert_eq!(
            inline(&mut ansi, "38;5;61;48;5;129;7"),
            "xtermColor129 xtermBgColor61"
        );
        assert_eq!(ansi.fg(), Color::Indexed(61));
        assert_eq!(ansi.bg(), Color::Indexed(129));
    }

    #[test]
    fn test_color_changes_while_inverted() {
        let mut ansi = AnsiCode::new();
        ansi.process_code(&csi("7"));
        assert_eq!(inline(&mut ansi, "31"), "xtermInvertColor xtermBgColor1");
        assert_eq!(inline(&mut ansi, "39"), "xtermInvertColor xtermInvertBgColor");

        let mut ansi = AnsiCode::new();
        ansi.process_code(&csi("7"));
        assert_eq!(inline(&mut ansi, "103"), "xtermInvertBgColor xtermColor11");
        assert_eq!(inline(&mut ansi, "49"), "xtermInvertBgColor xtermInvertColor");

        let mut ansi = AnsiCode::new();
        ansi.process_code(&csi("7"));
        ansi.process_code(&csi("103"));
        assert_eq!(inline(&mut ansi, "31"), "xtermColor11 xtermBgColor1");
        ansi.process_code(&csi("49"));
        assert_eq!(inline(&mut ansi, "39"), "xtermInvertColor xtermInvertBgColor");
    }

    #[test]
    fn test_inverse_off_when_not_inverted_is_noop() {
        let mut ansi = AnsiCode::new();
        ansi.process_code(&csi("32;44"));
        assert_eq!(inline(&mut ansi, "27"), "xtermColor2 xtermBgColor4");
    }

    #[test]
    fn test_line_attributes_are_block_classes() {
        let mut ansi = AnsiCode::new();
        let classes = ansi.process_line_attribute(6);
        assert_eq!(classes.block.as_deref(), Some("xtermDoubleWidth"));
        assert_eq!(classes.inline, None);

        // SGR reset leaves line attributes alone
        ansi.process_code(&csi("0"));
        assert_eq!(ansi.classes().block.as_deref(), Some("xtermDoubleWidth"));

        assert_eq!(ansi.process_line_attribute(5).block, None);
    }

    #[test]
    fn test_eight_bit_introducer() {
        let mut ansi = AnsiCode::new();
        let classes = ansi.process_code("\u{9b}31m");
        assert_eq!(classes.inline.as_deref(), Some("xtermColor1"));
    }
}
