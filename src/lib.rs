//! vconsole - a virtual console for ANSI-styled process output
//!
//! Feeds chunked output containing escape sequences and control characters
//! into a plain-text buffer with styled ranges, the way a terminal would
//! display it, and renders the result as HTML or ANSI.
//!
//! ```
//! use vconsole::consolify;
//!
//! assert_eq!(consolify("hello\rj"), "jello");
//! ```

pub mod config;
pub mod core;
pub mod ui;

pub use crate::config::{ColorScheme, Config, ConfigError};
pub use crate::core::{consolify, AnsiMode, ConsoleOutputWriter, ConsolePrefs, VirtualConsole};
pub use crate::ui::{MarkupDocument, RenderSink, TerminalRenderer};
