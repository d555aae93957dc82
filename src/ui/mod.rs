//! Rendering of console output.
//!
//! - **sink**: the `RenderSink` trait the console reports range changes to
//! - **markup**: HTML document sink and stylesheet generation
//! - **renderer**: crossterm renderer re-emitting styled output as ANSI

pub mod markup;
pub mod renderer;
pub mod sink;

pub use markup::{stylesheet, MarkupDocument, MarkupNode};
pub use renderer::{TermStyle, TerminalRenderer};
pub use sink::{NullSink, RenderSink};
