//! Mapping between output-space and decode-space sample indices.
//!
//! Output sample 0 corresponds to decode sample `offset`. A negative offset
//! means the output starts with `-offset` samples of silence.

use super::backend::StreamTiming;
use tracing::{debug, warn};

/// Which track automatic delay detection aligns the audio with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayReference {
    /// The track with the earliest start time (usually video).
    EarliestTrack,
    /// A specific track by container index.
    Track(usize),
}

impl std::str::FromStr for DelayReference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "earliest" | "auto" => Ok(Self::EarliestTrack),
            other => other
                .parse::<usize>()
                .map(Self::Track)
                .map_err(|_| format!("invalid delay reference: {other} (use 'earliest' or a track index)")),
        }
    }
}

/// How the delay offset is determined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DelaySpec {
    /// Explicit adjustment in samples.
    pub adjustment: i64,
    /// Optional automatic component.
    pub auto: Option<DelayReference>,
}

impl DelaySpec {
    /// An explicit adjustment with no automatic component.
    pub fn samples(adjustment: i64) -> Self {
        Self {
            adjustment,
            auto: None,
        }
    }
}

/// Where an output-space request lands in decode space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeWindow {
    /// Leading output samples that precede decode sample 0.
    pub leading_silence: u64,
    /// First decode-space sample.
    pub decode_start: u64,
    /// Number of decode-space samples.
    pub decode_count: u64,
}

/// Fixed signed offset between output space and decode space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayCompensator {
    offset: i64,
}

impl DelayCompensator {
    /// Use `offset` directly.
    pub fn new(offset: i64) -> Self {
        Self { offset }
    }

    /// Resolve `spec` against the container's track timing.
    pub fn from_spec(spec: DelaySpec, timing: &StreamTiming, sample_rate: u32) -> Self {
        let auto = spec.auto.map_or(0, |reference| {
            let audio = timing.audio.to_samples(sample_rate);
            let reference_start = match reference {
                DelayReference::EarliestTrack => timing
                    .tracks
                    .iter()
                    .flatten()
                    .map(|t| t.to_samples(sample_rate))
                    .min()
                    .unwrap_or(audio),
                DelayReference::Track(index) => {
                    if let Some(Some(t)) = timing.tracks.get(index) {
                        t.to_samples(sample_rate)
                    } else {
                        warn!(index, "delay reference track has no start time, ignoring");
                        audio
                    }
                }
            };
            reference_start.saturating_sub(audio)
        });
        let offset = spec.adjustment.saturating_add(auto);
        debug!(explicit = spec.adjustment, auto, offset, "delay offset");
        Self { offset }
    }

    /// The signed decode-space offset of output sample 0.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Output-space sample count for a decode-space total.
    pub fn output_len(&self, decode_total: u64) -> u64 {
        if self.offset >= 0 {
            decode_total.saturating_sub(self.offset.unsigned_abs())
        } else {
            decode_total.saturating_add(self.offset.unsigned_abs())
        }
    }

    /// Translate output-space `[start, start + count)` into decode space.
    pub fn map(&self, start: u64, count: u64) -> DecodeWindow {
        let shifted = i128::from(start) + i128::from(self.offset);
        if shifted >= 0 {
            return DecodeWindow {
                leading_silence: 0,
                decode_start: u64::try_from(shifted).unwrap_or(u64::MAX),
                decode_count: count,
            };
        }
        let before_zero = u64::try_from(-shifted).unwrap_or(u64::MAX);
        let leading_silence = before_zero.min(count);
        DecodeWindow {
            leading_silence,
            decode_start: 0,
            decode_count: count - leading_silence,
        }
    }
}
