//! Render sink abstraction
//!
//! The console reports every change of its range list through this trait, so
//! the same buffer logic can drive an HTML document, a terminal, or nothing.

use crate::core::ranges::StyleRange;

/// Receiver of range-list mutations.
///
/// Indices refer to positions in the range list at the time of the call.
pub trait RenderSink {
    /// A new range was inserted at `index`
    fn insert(&mut self, index: usize, range: &StyleRange, text: &str);

    /// The range at `index` changed its extent, class or text
    fn update(&mut self, index: usize, range: &StyleRange, text: &str);

    /// The range at `index` grew at its end by `text`
    fn append(&mut self, index: usize, range: &StyleRange, text: &str);

    /// The range at `index` lost its first `count` characters
    fn trim_front(&mut self, index: usize, range: &StyleRange, count: usize);

    /// The range at `index` was removed
    fn remove(&mut self, index: usize);

    /// Everything was removed
    fn clear(&mut self);

    /// Classes for the enclosing block changed
    fn set_block_classes(&mut self, _classes: Option<&str>) {}
}

/// Sink that discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn insert(&mut self, _index: usize, _range: &StyleRange, _text: &str) {}
    fn update(&mut self, _index: usize, _range: &StyleRange, _text: &str) {}
    fn append(&mut self, _index: usize, _range: &StyleRange, _text: &str) {}
    fn trim_front(&mut self, _index: usize, _range: &StyleRange, _count: usize) {}
    fn remove(&mut self, _index: usize) {}
    fn clear(&mut self) {}
}
