//! Narrow capability interface over a demux/decode library.

use super::frame::DecodedFrame;
use super::properties::AudioProperties;
use crate::error::Result;

/// A timestamp expressed as `ts * numer / denom` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackStart {
    /// Timestamp in time-base units (may be negative).
    pub ts: i64,
    /// Time base numerator.
    pub numer: u32,
    /// Time base denominator.
    pub denom: u32,
}

impl TrackStart {
    /// A start at time zero.
    pub const ZERO: Self = Self {
        ts: 0,
        numer: 1,
        denom: 1,
    };

    /// Convert to a sample count at `sample_rate`, rounding towards zero.
    ///
    /// Integer arithmetic only, so long streams do not drift.
    pub fn to_samples(self, sample_rate: u32) -> i64 {
        if self.denom == 0 {
            return 0;
        }
        let scaled =
            i128::from(self.ts) * i128::from(sample_rate) * i128::from(self.numer) / i128::from(self.denom);
        i64::try_from(scaled).unwrap_or(if scaled < 0 { i64::MIN } else { i64::MAX })
    }
}

/// Start timing of the selected track and the other tracks in the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamTiming {
    /// Start of the selected audio track.
    pub audio: TrackStart,
    /// Start of every track, indexed like the container's track list.
    pub tracks: Vec<Option<TrackStart>>,
}

impl StreamTiming {
    /// Timing for a single track starting at zero.
    pub fn zero() -> Self {
        Self {
            audio: TrackStart::ZERO,
            tracks: vec![Some(TrackStart::ZERO)],
        }
    }
}

/// How much decoder output after a seek must be discarded before frames
/// match a decode from the start of the stream.
///
/// Lossy codecs carry state across frames (overlap-add windows, MP3's bit
/// reservoir), so the first frames after a seek decode differently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeekPriming {
    /// Samples to seek before the target so priming still ends at or
    /// before it.
    pub preroll: u64,
    /// Frames starting at or after the seek point to decode and discard.
    pub frames: u32,
}

impl SeekPriming {
    /// Whether frames right after a seek are usable as decoded.
    pub fn is_none(self) -> bool {
        self.frames == 0
    }
}

/// What the engine needs from a demux/decode library.
///
/// Implementations own their container and codec handles exclusively.
pub trait MediaBackend {
    /// Nominal properties of the selected track, as probed.
    fn properties(&self) -> &AudioProperties;

    /// Start timestamps used for automatic delay detection.
    fn timing(&self) -> StreamTiming;

    /// Decode the next frame in presentation order.
    ///
    /// Returns `Ok(None)` at end of stream. Frame positions are absolute
    /// decode-space sample indices and contiguous between seeks.
    fn read_frame(&mut self) -> Result<Option<DecodedFrame>>;

    /// Reposition near `target`.
    ///
    /// The next frame starts at or before `target` whenever the container
    /// allows it. `seek(0)` always restarts from the beginning of the stream.
    fn seek(&mut self, target: u64) -> Result<()>;

    /// Priming needed after a seek to a position other than 0.
    fn seek_priming(&self) -> SeekPriming {
        SeekPriming::default()
    }
}

impl<B: MediaBackend + ?Sized> MediaBackend for Box<B> {
    fn properties(&self) -> &AudioProperties {
        (**self).properties()
    }

    fn timing(&self) -> StreamTiming {
        (**self).timing()
    }

    fn read_frame(&mut self) -> Result<Option<DecodedFrame>> {
        (**self).read_frame()
    }

    fn seek(&mut self, target: u64) -> Result<()> {
        (**self).seek(target)
    }

    fn seek_priming(&self) -> SeekPriming {
        (**self).seek_priming()
    }
}
