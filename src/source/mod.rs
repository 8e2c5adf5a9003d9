//! Random-access, sample-accurate audio source engine.
//!
//! [`AudioSource`] presents a decoded audio track as an array of samples
//! that can be read in any order. Requests pass through the delay
//! compensator into the range resolver, which serves them from the frame
//! cache and drives the frame decoder as needed.

pub mod backend;
mod cache;
mod decoder;
mod delay;
mod duration;
mod frame;
mod probe;
mod properties;
mod resolver;
pub mod synthetic;

pub use backend::{MediaBackend, SeekPriming, StreamTiming, TrackStart};
pub use cache::{FrameCache, Span};
pub use decoder::{DecodeCounters, FrameDecoder};
pub use delay::{DecodeWindow, DelayCompensator, DelayReference, DelaySpec};
pub use frame::DecodedFrame;
pub use probe::SymphoniaBackend;
pub use properties::{AudioProperties, HostSampleType, SampleFormat};
pub use resolver::{EngineStats, RangeResolver};

use crate::config::{DefaultsConfig, EngineConfig};
use crate::constants::AUTO_TRACK;
use crate::error::{Error, Result};
use std::path::Path;
use tracing::{debug, info};

/// Which track of the container to decode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TrackSelector {
    /// The first decodable audio track.
    #[default]
    Auto,
    /// A specific index into the container's track list.
    Index(usize),
}

impl TrackSelector {
    /// Map the integer convention used by hosts: `-1` (or any negative
    /// value) selects automatically.
    pub fn from_index(index: i64) -> Self {
        usize::try_from(index).map_or(Self::Auto, Self::Index)
    }
}

impl From<Option<i64>> for TrackSelector {
    fn from(index: Option<i64>) -> Self {
        Self::from_index(index.unwrap_or(AUTO_TRACK))
    }
}

/// Container-specific open options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SourceOptions {
    /// Follow references to other files some containers use.
    pub enable_external_references: bool,
    /// Resolve a relative source path against the working directory.
    ///
    /// This applies to the path given to [`AudioSource::open`] only. Paths
    /// stored inside a container (external data references) are not
    /// followed by the symphonia backend, so there is nothing to resolve
    /// relative to the source file.
    pub resolve_relative_paths: bool,
    /// Dynamic range compression scale forwarded to decoders that support it.
    pub drc_scale: f32,
}

impl From<&DefaultsConfig> for SourceOptions {
    fn from(defaults: &DefaultsConfig) -> Self {
        Self {
            enable_external_references: defaults.enable_external_references,
            resolve_relative_paths: defaults.resolve_relative_paths,
            drc_scale: defaults.drc_scale,
        }
    }
}

/// Random-access audio source over one track.
///
/// Single-threaded: each call completes before returning and the instance
/// owns its decoder exclusively. Separate instances are independent.
pub struct AudioSource<B = SymphoniaBackend> {
    resolver: RangeResolver<B>,
    delay: DelayCompensator,
    properties: AudioProperties,
}

impl AudioSource<SymphoniaBackend> {
    /// Open a media file.
    ///
    /// If the container does not report a length, the exact length is
    /// established immediately.
    pub fn open(
        path: &Path,
        track: TrackSelector,
        delay: DelaySpec,
        options: &SourceOptions,
        engine: &EngineConfig,
    ) -> Result<Self> {
        let backend = SymphoniaBackend::open(path, track, options)?;
        let needs_exact = !backend.has_length_estimate();
        let mut source = Self::with_backend(backend, delay, engine)?;
        if needs_exact {
            debug!(path = %path.display(), "container has no length estimate");
            source.establish_exact_duration()?;
        }
        Ok(source)
    }
}

impl<B: MediaBackend> AudioSource<B> {
    /// Build an engine over an already opened backend.
    pub fn with_backend(backend: B, delay: DelaySpec, engine: &EngineConfig) -> Result<Self> {
        let probed = backend.properties().clone();
        if probed.channels == 0 {
            return Err(Error::UnsupportedFormat {
                format: "stream has no channels".to_string(),
            });
        }
        let delay = DelayCompensator::from_spec(delay, &backend.timing(), probed.sample_rate);
        let properties = AudioProperties {
            num_samples: delay.output_len(probed.num_samples),
            ..probed
        };
        info!(
            format = %properties.format,
            channels = properties.channels,
            sample_rate = properties.sample_rate,
            samples = properties.num_samples,
            delay = delay.offset(),
            "audio source ready"
        );
        Ok(Self {
            resolver: RangeResolver::new(backend, engine),
            delay,
            properties,
        })
    }

    /// Properties in output space.
    pub fn properties(&self) -> &AudioProperties {
        &self.properties
    }

    /// Signed decode-space position of output sample 0.
    pub fn delay_offset(&self) -> i64 {
        self.delay.offset()
    }

    /// Work done so far.
    pub fn stats(&self) -> EngineStats {
        self.resolver.stats()
    }

    /// The underlying backend.
    pub fn backend(&self) -> &B {
        self.resolver.decoder().backend()
    }

    /// Replace the nominal sample count with the true one.
    ///
    /// Performs a full decode the first time; later calls do nothing. Only
    /// `num_samples` and `exact_samples` change.
    pub fn establish_exact_duration(&mut self) -> Result<()> {
        if self.properties.exact_samples {
            return Ok(());
        }
        let exact = self.resolver.establish_exact_duration()?;
        self.properties.num_samples = self.delay.output_len(exact);
        self.properties.exact_samples = true;
        Ok(())
    }

    /// Fill one buffer per channel with output samples
    /// `[start, start + count)`.
    ///
    /// Each buffer must hold at least `count * bytes_per_sample` bytes.
    /// Positions outside the stream are silence. On failure the buffers
    /// must be treated as unspecified.
    pub fn get_audio(&mut self, start: i64, count: i64, out: &mut [&mut [u8]]) -> Result<()> {
        let (Ok(start_u), Ok(count_u)) = (u64::try_from(start), u64::try_from(count)) else {
            return Err(Error::InvalidRange { start, count });
        };
        if count_u == 0 {
            return Err(Error::InvalidRange { start, count });
        }
        self.check_buffers(count_u, out)?;

        let window = self.delay.map(start_u, count_u);
        let leading = usize::try_from(window.leading_silence)
            .map_err(|_| Error::InvalidRange { start, count })?;

        self.resolver
            .get_audio(window.decode_start, window.decode_count, out, leading)?;

        if leading > 0 {
            let bytes = leading * self.properties.bytes_per_sample();
            let silence = self.properties.format.silence_byte();
            for plane in out.iter_mut() {
                plane[..bytes].fill(silence);
            }
        }
        Ok(())
    }

    /// Like [`get_audio`](Self::get_audio), allocating the planar buffers.
    pub fn get_audio_planar(&mut self, start: i64, count: i64) -> Result<Vec<Vec<u8>>> {
        let samples = usize::try_from(count).map_err(|_| Error::InvalidRange { start, count })?;
        let bytes = samples
            .checked_mul(self.properties.bytes_per_sample())
            .ok_or_else(|| Error::OutputBuffer {
                message: format!("request of {count} samples is too large"),
            })?;
        let mut planes = Vec::with_capacity(self.properties.channels);
        for _ in 0..self.properties.channels {
            let mut plane = Vec::new();
            plane
                .try_reserve_exact(bytes)
                .map_err(|e| Error::OutputBuffer {
                    message: format!("cannot allocate {bytes} bytes per channel: {e}"),
                })?;
            plane.resize(bytes, 0_u8);
            planes.push(plane);
        }
        {
            let mut out: Vec<&mut [u8]> = planes.iter_mut().map(Vec::as_mut_slice).collect();
            self.get_audio(start, count, &mut out)?;
        }
        Ok(planes)
    }

    fn check_buffers(&self, count: u64, out: &[&mut [u8]]) -> Result<()> {
        if out.len() != self.properties.channels {
            return Err(Error::OutputBuffer {
                message: format!(
                    "expected {} channel buffers, got {}",
                    self.properties.channels,
                    out.len()
                ),
            });
        }
        let needed = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(self.properties.bytes_per_sample()))
            .ok_or_else(|| Error::OutputBuffer {
                message: format!("request of {count} samples is too large"),
            })?;
        if let Some((channel, plane)) = out.iter().enumerate().find(|(_, p)| p.len() < needed) {
            return Err(Error::OutputBuffer {
                message: format!(
                    "channel {channel} buffer holds {} bytes, {needed} required",
                    plane.len()
                ),
            });
        }
        Ok(())
    }
}
