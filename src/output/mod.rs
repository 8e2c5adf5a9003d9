//! Output writers for extracted audio.

pub mod pack;
pub mod progress;
mod wav;
mod writer;

pub use pack::interleave;
pub use wav::{RawFileWriter, WavFileWriter};
pub use writer::SampleWriter;
