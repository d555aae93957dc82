//! Escape sequence handling: tokenizer, SGR interpreter and OSC 8 links.

pub mod hyperlink;
pub mod parser;
pub mod sgr;

pub use hyperlink::{Hyperlink, LinkAction};
pub use parser::{split_controls, Control, EscapeParser, Token, DEFAULT_MAX_PENDING};
pub use sgr::{AnsiClasses, AnsiCode, AttrFlags, Color};
