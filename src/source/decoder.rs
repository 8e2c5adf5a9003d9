//! Sequential frame decoding with cursor tracking.

use super::backend::MediaBackend;
use super::frame::DecodedFrame;
use crate::error::Result;
use tracing::{debug, trace};

/// Counters describing the work done by a [`FrameDecoder`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeCounters {
    /// Seeks issued to the backend.
    pub seeks: u64,
    /// Frames produced.
    pub frames_decoded: u64,
    /// Samples per channel produced.
    pub samples_decoded: u64,
}

/// Drives a [`MediaBackend`] and owns the decode cursor.
///
/// The cursor is the decode-space position the next frame will start at.
/// It is unknown right after a seek or a failed decode, until a frame has
/// been produced.
#[derive(Debug)]
pub struct FrameDecoder<B> {
    backend: B,
    cursor: Option<u64>,
    /// Whether decoding has been continuous since sample 0.
    from_start: bool,
    end_of_stream: bool,
    counters: DecodeCounters,
}

impl<B: MediaBackend> FrameDecoder<B> {
    /// Wrap a freshly opened backend positioned at the start of the stream.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            cursor: Some(0),
            from_start: true,
            end_of_stream: false,
            counters: DecodeCounters::default(),
        }
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Position the next decoded frame will start at, if known.
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    /// Whether every frame since sample 0 has been decoded in order.
    pub fn is_from_start(&self) -> bool {
        self.from_start && self.cursor.is_some()
    }

    /// Whether the last decode reached end of stream.
    pub fn at_end(&self) -> bool {
        self.end_of_stream
    }

    /// Work done so far.
    pub fn counters(&self) -> DecodeCounters {
        self.counters
    }

    /// Decode the next non-empty frame.
    ///
    /// Returns `Ok(None)` at end of stream. A failure leaves the cursor
    /// unknown so the next access reseeks.
    pub fn decode_next(&mut self) -> Result<Option<DecodedFrame>> {
        if self.end_of_stream {
            return Ok(None);
        }
        loop {
            match self.backend.read_frame() {
                Ok(Some(frame)) if frame.is_empty() => {}
                Ok(Some(frame)) => {
                    trace!(start = frame.start, len = frame.len, "decoded frame");
                    self.cursor = Some(frame.end());
                    self.counters.frames_decoded += 1;
                    self.counters.samples_decoded += frame.len;
                    return Ok(Some(frame));
                }
                Ok(None) => {
                    debug!(cursor = ?self.cursor, "end of stream");
                    self.end_of_stream = true;
                    return Ok(None);
                }
                Err(e) => {
                    self.cursor = None;
                    self.from_start = false;
                    return Err(e);
                }
            }
        }
    }

    /// Reposition the backend near `target`, invalidating the cursor.
    pub fn seek_near(&mut self, target: u64) -> Result<()> {
        debug!(target, cursor = ?self.cursor, "seeking");
        self.counters.seeks += 1;
        self.end_of_stream = false;
        self.from_start = false;
        self.cursor = None;
        self.backend.seek(target)?;
        if target == 0 {
            self.cursor = Some(0);
            self.from_start = true;
        }
        Ok(())
    }
}
