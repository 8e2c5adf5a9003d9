//! Sample writer trait definition.

use crate::error::Result;

/// Trait for writing extracted audio.
pub trait SampleWriter {
    /// Write `count` samples from each planar channel buffer.
    fn write_block(&mut self, planes: &[Vec<u8>], count: usize) -> Result<()>;

    /// Finalize the output (flush, patch headers, etc.).
    fn finalize(self: Box<Self>) -> Result<()>;
}
