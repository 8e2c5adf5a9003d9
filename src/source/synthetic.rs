//! Deterministic in-memory stream.
//!
//! Produces signed 16-bit frames whose values are a pure function of
//! channel and sample index, with configurable frame size, seek granularity,
//! post-seek priming and failure points. Useful for exercising the engine without media files.

use super::backend::{MediaBackend, SeekPriming, StreamTiming, TrackStart};
use super::frame::DecodedFrame;
use super::properties::{AudioProperties, SampleFormat};
use crate::error::{Error, Result};
use std::path::PathBuf;

/// Signed 16-bit synthetic stream.
#[derive(Debug, Clone)]
pub struct SyntheticBackend {
    properties: AudioProperties,
    true_len: u64,
    frame_len: u64,
    seek_granularity: u64,
    late_seek: u64,
    garbage_after_seek: u32,
    garbage_left: u32,
    fail_at: Option<u64>,
    timing: StreamTiming,
    next: u64,
}

impl SyntheticBackend {
    /// A stream of `len` samples whose container reports the exact length.
    pub fn new(sample_rate: u32, channels: usize, len: u64) -> Self {
        Self {
            properties: AudioProperties {
                format: SampleFormat::S16,
                channels,
                channel_layout: (1_u64 << channels.min(63)) - 1,
                sample_rate,
                num_samples: len,
                exact_samples: false,
            },
            true_len: len,
            frame_len: 1_152,
            seek_granularity: 1,
            late_seek: 0,
            garbage_after_seek: 0,
            garbage_left: 0,
            fail_at: None,
            timing: StreamTiming::zero(),
            next: 0,
        }
    }

    /// Samples per decoded frame.
    #[must_use]
    pub fn with_frame_len(mut self, frame_len: u64) -> Self {
        self.frame_len = frame_len.max(1);
        self
    }

    /// Seeks land on multiples of `frames` frames.
    #[must_use]
    pub fn with_seek_granularity(mut self, frames: u64) -> Self {
        self.seek_granularity = frames.max(1);
        self
    }

    /// Seeks to anything but sample 0 land `samples` past the target.
    #[must_use]
    pub fn with_late_seeks(mut self, samples: u64) -> Self {
        self.late_seek = samples;
        self
    }

    /// The first `frames` frames after a seek to anything but sample 0
    /// decode wrong, like a lossy decoder without its inter-frame state.
    /// The backend reports matching [`SeekPriming`].
    #[must_use]
    pub fn with_garbage_after_seek(mut self, frames: u32) -> Self {
        self.garbage_after_seek = frames;
        self
    }

    /// Length the container reports, which may differ from the real one.
    #[must_use]
    pub fn with_nominal_len(mut self, len: u64) -> Self {
        self.properties.num_samples = len;
        self
    }

    /// Decoding the frame containing `sample` fails.
    #[must_use]
    pub fn with_failure_at(mut self, sample: u64) -> Self {
        self.fail_at = Some(sample);
        self
    }

    /// Report these start times for automatic delay detection.
    #[must_use]
    pub fn with_timing(mut self, timing: StreamTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Track start of the audio only, with a reference track at zero.
    #[must_use]
    pub fn with_audio_start(self, audio: TrackStart) -> Self {
        self.with_timing(StreamTiming {
            audio,
            tracks: vec![Some(TrackStart::ZERO), Some(audio)],
        })
    }

    /// The value every decode of `(channel, index)` yields.
    #[allow(clippy::cast_possible_truncation)]
    pub fn sample_value(channel: usize, index: u64) -> i16 {
        let mixed = index
            .wrapping_mul(2_654_435_761)
            .wrapping_add(channel as u64 * 40_503);
        (mixed >> 7) as i16
    }

    /// Reference planar bytes for `[start, start + count)`, with samples
    /// at or beyond `len` rendered as silence.
    pub fn reference(channels: usize, len: u64, start: u64, count: u64) -> Vec<Vec<u8>> {
        (0..channels)
            .map(|ch| {
                (start..start + count)
                    .flat_map(|i| {
                        if i < len {
                            Self::sample_value(ch, i).to_le_bytes()
                        } else {
                            [0, 0]
                        }
                    })
                    .collect()
            })
            .collect()
    }

    fn landing_point(&self, target: u64) -> u64 {
        let step = self.frame_len * self.seek_granularity;
        let keyframe = target / step * step;
        if keyframe == 0 {
            0
        } else {
            let late = keyframe + self.late_seek;
            late / self.frame_len * self.frame_len
        }
    }
}

impl MediaBackend for SyntheticBackend {
    fn properties(&self) -> &AudioProperties {
        &self.properties
    }

    fn timing(&self) -> StreamTiming {
        self.timing.clone()
    }

    fn read_frame(&mut self) -> Result<Option<DecodedFrame>> {
        if self.next >= self.true_len {
            return Ok(None);
        }
        let start = self.next;
        let end = (start + self.frame_len).min(self.true_len);
        if let Some(bad) = self.fail_at
            && (start..end).contains(&bad)
        {
            return Err(Error::Decode {
                path: PathBuf::from("synthetic"),
                position: start,
                source: "corrupt frame".into(),
            });
        }
        self.next = end;
        let mut planes =
            Self::reference(self.properties.channels, self.true_len, start, end - start);
        if self.garbage_left > 0 {
            self.garbage_left -= 1;
            planes.iter_mut().flatten().for_each(|b| *b = !*b);
        }
        Ok(Some(DecodedFrame::new(start, 2, planes)))
    }

    fn seek(&mut self, target: u64) -> Result<()> {
        self.next = self.landing_point(target);
        self.garbage_left = if target == 0 { 0 } else { self.garbage_after_seek };
        Ok(())
    }

    fn seek_priming(&self) -> SeekPriming {
        if self.garbage_after_seek == 0 {
            return SeekPriming::default();
        }
        SeekPriming {
            preroll: (u64::from(self.garbage_after_seek) + 1) * self.frame_len,
            frames: self.garbage_after_seek,
        }
    }
}
