//! Stream properties and canonical sample formats.

use crate::error::{Error, Result};
use serde::Serialize;

/// Canonical PCM layouts the engine can present.
///
/// Every sample is stored little-endian in native width; 24-bit audio is
/// stored left-justified in 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// Unsigned 8-bit.
    U8,
    /// Signed 16-bit.
    S16,
    /// Signed 24-bit, left-justified in a 32-bit container.
    S24,
    /// Signed 32-bit.
    S32,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl SampleFormat {
    /// Number of significant bits.
    pub const fn bits_per_sample(self) -> u32 {
        match self {
            Self::U8 => 8,
            Self::S16 => 16,
            Self::S24 => 24,
            Self::S32 | Self::F32 => 32,
            Self::F64 => 64,
        }
    }

    /// Storage size of one sample in bytes.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::S16 => 2,
            Self::S24 | Self::S32 | Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Whether samples are floating point.
    pub const fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Byte pattern of digital silence for one sample.
    pub const fn silence_byte(self) -> u8 {
        match self {
            Self::U8 => 0x80,
            _ => 0,
        }
    }
}

impl std::fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::U8 => write!(f, "u8"),
            Self::S16 => write!(f, "s16"),
            Self::S24 => write!(f, "s24"),
            Self::S32 => write!(f, "s32"),
            Self::F32 => write!(f, "f32"),
            Self::F64 => write!(f, "f64"),
        }
    }
}

/// Properties of the selected audio track.
///
/// `num_samples` is nominal until `exact_samples` is set; once exact it
/// never changes again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioProperties {
    /// Sample format of the decoded output.
    pub format: SampleFormat,
    /// Number of channels.
    pub channels: usize,
    /// Loudspeaker position bitmask (WAVE channel mask ordering).
    pub channel_layout: u64,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Total number of samples per channel.
    pub num_samples: u64,
    /// Whether `num_samples` was established by a full decode.
    pub exact_samples: bool,
}

impl AudioProperties {
    /// Number of significant bits per sample.
    pub fn bits_per_sample(&self) -> u32 {
        self.format.bits_per_sample()
    }

    /// Storage size of one sample in bytes.
    pub fn bytes_per_sample(&self) -> usize {
        self.format.bytes_per_sample()
    }

    /// Whether samples are floating point.
    pub fn is_float(&self) -> bool {
        self.format.is_float()
    }

    /// Duration in seconds.
    #[allow(clippy::cast_precision_loss)]
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.num_samples as f64 / f64::from(self.sample_rate)
    }

    /// Map to the sample type a host expects after repacking.
    ///
    /// Host output width is `ceil(bits / 8)`, so 24-bit audio is delivered
    /// tightly packed.
    pub fn host_format(&self) -> Result<HostSampleType> {
        let bytes = self.bits_per_sample().div_ceil(8);
        match (self.is_float(), bytes) {
            (true, 4) => Ok(HostSampleType::Float),
            (false, 1) => Ok(HostSampleType::Int8),
            (false, 2) => Ok(HostSampleType::Int16),
            (false, 3) => Ok(HostSampleType::Int24),
            (false, 4) => Ok(HostSampleType::Int32),
            _ => Err(Error::UnsupportedFormat {
                format: format!("bad audio format for host output: {}", self.format),
            }),
        }
    }
}

/// Sample types a frame-based host can consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostSampleType {
    /// 8-bit integer.
    Int8,
    /// 16-bit integer.
    Int16,
    /// Tightly packed 24-bit integer.
    Int24,
    /// 32-bit integer.
    Int32,
    /// 32-bit float.
    Float,
}

impl HostSampleType {
    /// Bytes per sample in the packed host layout.
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::Int8 => 1,
            Self::Int16 => 2,
            Self::Int24 => 3,
            Self::Int32 | Self::Float => 4,
        }
    }
}
