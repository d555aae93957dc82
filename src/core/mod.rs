//! Core virtual console components.
//!
//! This module contains the DOM-agnostic console logic:
//!
//! - **term**: escape sequence tokenizer, SGR interpreter and OSC 8 links
//! - **ranges**: styled ranges with terminal overwrite semantics
//! - **console**: the text buffer, cursor and control character handling
//! - **writer**: line-limited output with error spans and windowed rendering
//!
//! # Architecture
//!
//! ```text
//! ConsoleOutputWriter
//! └── VirtualConsole
//!     ├── EscapeParser (chunked input -> tokens)
//!     ├── AnsiCode (SGR -> class names)
//!     ├── RangeSet (styled ranges over the buffer)
//!     └── RenderSink (MarkupDocument, NullSink, ...)
//! ```

pub mod console;
pub mod ranges;
pub mod term;
pub mod writer;

pub use console::{consolify, AnsiMode, ConsolePrefs, VirtualConsole};
pub use ranges::{RangeChange, RangeSet, StyleRange};
pub use writer::ConsoleOutputWriter;
