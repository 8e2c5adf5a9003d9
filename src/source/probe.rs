//! Container probing and frame decoding using symphonia.

use super::backend::{MediaBackend, SeekPriming, StreamTiming, TrackStart};
use super::frame::DecodedFrame;
use super::properties::{AudioProperties, SampleFormat};
use super::{SourceOptions, TrackSelector};
use crate::error::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{
    CODEC_TYPE_AAC, CODEC_TYPE_MP1, CODEC_TYPE_MP2, CODEC_TYPE_MP3, CODEC_TYPE_NULL,
    CODEC_TYPE_VORBIS, CodecParameters, Decoder, DecoderOptions,
};
use symphonia::core::errors::{Error as SymphoniaError, SeekErrorKind};
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo, Track};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;
use tracing::{debug, warn};

/// A decoded packet before it is placed in decode space.
struct RawFrame {
    ts: u64,
    format: SampleFormat,
    channels: usize,
    channel_layout: u64,
    sample_rate: u32,
    planes: Vec<Vec<u8>>,
}

/// Demuxer and decoder for one audio track of a media file.
pub struct SymphoniaBackend {
    path: PathBuf,
    track_index: usize,
    track_id: u32,
    start_ts: u64,
    codec_params: CodecParameters,
    priming: SeekPriming,
    format: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    properties: AudioProperties,
    timing: StreamTiming,
    /// Position of the next frame; `None` until a packet timestamp is seen
    /// after a seek.
    next_sample: Option<u64>,
    /// First frame, decoded while probing properties.
    pending: Option<DecodedFrame>,
    end_of_stream: bool,
}

impl SymphoniaBackend {
    /// Open `path` and select an audio track.
    ///
    /// The first frame is decoded to learn the output sample format; it is
    /// returned by the first [`MediaBackend::read_frame`] call.
    pub fn open(path: &Path, track: TrackSelector, options: &SourceOptions) -> Result<Self> {
        let path = resolve_path(path, options)?;
        if !path.exists() {
            return Err(Error::SourceNotFound { path });
        }
        if options.enable_external_references {
            warn!("external reference following is not supported by this backend, ignoring");
        }
        if options.drc_scale.abs() > f32::EPSILON {
            debug!(
                drc_scale = options.drc_scale,
                "dynamic range compression is not applied by this backend"
            );
        }

        let mut format = probe_format(&path)?;
        let default_id = format.default_track().map(|t| t.id);
        let track_index = select_track(format.tracks(), default_id, track, &path)?;
        let selected = &format.tracks()[track_index];
        let track_id = selected.id;
        let codec_params = selected.codec_params.clone();
        let timing = track_timing(format.tracks(), track_index);
        let mut decoder = make_decoder(&codec_params, &path)?;

        debug!(
            path = %path.display(),
            track_index,
            track_id,
            codec = ?codec_params.codec,
            default_id,
            "opened audio track"
        );

        let first = next_raw_frame(format.as_mut(), decoder.as_mut(), track_id, &path, 0)?
            .ok_or_else(|| Error::NoAudioTracks { path: path.clone() })?;

        let properties = AudioProperties {
            format: first.format,
            channels: first.channels,
            channel_layout: first.channel_layout,
            sample_rate: codec_params.sample_rate.unwrap_or(first.sample_rate),
            num_samples: codec_params.n_frames.unwrap_or(0),
            exact_samples: false,
        };
        let pending = DecodedFrame::new(0, properties.bytes_per_sample(), first.planes);

        Ok(Self {
            path,
            track_index,
            track_id,
            start_ts: codec_params.start_ts,
            priming: seek_priming_for(&codec_params),
            codec_params,
            format,
            decoder,
            next_sample: Some(pending.end()),
            pending: Some(pending),
            properties,
            timing,
            end_of_stream: false,
        })
    }

    /// Whether the container reported a sample count.
    pub fn has_length_estimate(&self) -> bool {
        self.codec_params.n_frames.is_some()
    }

    /// Path the backend decodes from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decode-space position of a packet timestamp.
    fn ts_to_samples(&self, ts: u64) -> u64 {
        let since_start = ts.saturating_sub(self.start_ts);
        match self.codec_params.time_base {
            Some(tb) if tb.denom != 0 => {
                let samples = u128::from(since_start)
                    * u128::from(self.properties.sample_rate)
                    * u128::from(tb.numer)
                    / u128::from(tb.denom);
                u64::try_from(samples).unwrap_or(u64::MAX)
            }
            _ => since_start,
        }
    }

    /// Packet timestamp at or before decode-space position `sample`.
    fn samples_to_ts(&self, sample: u64) -> u64 {
        let units = match self.codec_params.time_base {
            Some(tb) if tb.numer != 0 && self.properties.sample_rate != 0 => {
                let ts = u128::from(sample) * u128::from(tb.denom)
                    / (u128::from(self.properties.sample_rate) * u128::from(tb.numer));
                u64::try_from(ts).unwrap_or(u64::MAX)
            }
            _ => sample,
        };
        units.saturating_add(self.start_ts)
    }

    /// Reopen the file so decoding resumes at sample 0.
    fn restart(&mut self) -> Result<()> {
        let format = probe_format(&self.path)?;
        let track = format
            .tracks()
            .get(self.track_index)
            .ok_or_else(|| Error::TrackNotFound {
                path: self.path.clone(),
                index: self.track_index,
                count: format.tracks().len(),
            })?;
        self.track_id = track.id;
        self.decoder = make_decoder(&self.codec_params, &self.path)?;
        self.format = format;
        self.next_sample = Some(0);
        self.pending = None;
        self.end_of_stream = false;
        Ok(())
    }
}

impl MediaBackend for SymphoniaBackend {
    fn properties(&self) -> &AudioProperties {
        &self.properties
    }

    fn timing(&self) -> StreamTiming {
        self.timing.clone()
    }

    fn read_frame(&mut self) -> Result<Option<DecodedFrame>> {
        if let Some(frame) = self.pending.take() {
            return Ok(Some(frame));
        }
        if self.end_of_stream {
            return Ok(None);
        }

        let position = self.next_sample.unwrap_or(0);
        let Some(raw) = next_raw_frame(
            self.format.as_mut(),
            self.decoder.as_mut(),
            self.track_id,
            &self.path,
            position,
        )?
        else {
            self.end_of_stream = true;
            return Ok(None);
        };

        if raw.format != self.properties.format || raw.channels != self.properties.channels {
            return Err(Error::Decode {
                path: self.path.clone(),
                position,
                source: format!(
                    "stream changed from {} x{} to {} x{} mid-stream",
                    self.properties.format, self.properties.channels, raw.format, raw.channels
                )
                .into(),
            });
        }

        let start = self
            .next_sample
            .unwrap_or_else(|| self.ts_to_samples(raw.ts));
        let frame = DecodedFrame::new(start, self.properties.bytes_per_sample(), raw.planes);
        self.next_sample = Some(frame.end());
        Ok(Some(frame))
    }

    fn seek(&mut self, target: u64) -> Result<()> {
        if target == 0 {
            return self.restart();
        }

        self.pending = None;
        self.end_of_stream = false;
        self.next_sample = None;

        let seek_to = SeekTo::TimeStamp {
            ts: self.samples_to_ts(target),
            track_id: self.track_id,
        };
        match self.format.seek(SeekMode::Accurate, seek_to) {
            Ok(seeked) => {
                debug!(
                    target,
                    required_ts = seeked.required_ts,
                    actual_ts = seeked.actual_ts,
                    "container seek"
                );
                self.decoder.reset();
                Ok(())
            }
            Err(SymphoniaError::SeekError(SeekErrorKind::OutOfRange)) => {
                debug!(target, "seek target past end of stream");
                self.end_of_stream = true;
                Ok(())
            }
            Err(SymphoniaError::SeekError(
                SeekErrorKind::Unseekable | SeekErrorKind::ForwardOnly,
            )) => {
                debug!(target, "source not seekable, restarting from the beginning");
                self.restart()
            }
            Err(e) => Err(Error::Seek {
                target,
                source: Box::new(e),
            }),
        }
    }

    fn seek_priming(&self) -> SeekPriming {
        self.priming
    }
}

/// Apply the path options before opening.
fn resolve_path(path: &Path, options: &SourceOptions) -> Result<PathBuf> {
    if options.resolve_relative_paths && path.is_relative() {
        Ok(std::env::current_dir()?.join(path))
    } else {
        Ok(path.to_path_buf())
    }
}

fn probe_format(path: &Path) -> Result<Box<dyn FormatReader>> {
    let file = File::open(path).map_err(|e| Error::AudioOpen {
        path: path.to_path_buf(),
        source: Box::new(e),
    })?;

    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let format_options = FormatOptions {
        enable_gapless: true,
        ..FormatOptions::default()
    };

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &format_options, &MetadataOptions::default())
        .map_err(|e| Error::AudioOpen {
            path: path.to_path_buf(),
            source: Box::new(e),
        })?;

    Ok(probed.format)
}

fn is_audio(track: &Track) -> bool {
    track.codec_params.codec != CODEC_TYPE_NULL && track.codec_params.sample_rate.is_some()
}

fn is_decodable(track: &Track) -> bool {
    is_audio(track)
        && symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .is_ok()
}

/// Resolve a track selector to an index into `tracks`.
///
/// `Auto` takes the container's default track if it can be decoded, then
/// the first decodable audio track. With none decodable it settles on the
/// first audio track so opening reports the unsupported codec.
fn select_track(
    tracks: &[Track],
    default_id: Option<u32>,
    selector: TrackSelector,
    path: &Path,
) -> Result<usize> {
    match selector {
        TrackSelector::Index(index) => {
            let track = tracks.get(index).ok_or_else(|| Error::TrackNotFound {
                path: path.to_path_buf(),
                index,
                count: tracks.len(),
            })?;
            if is_audio(track) {
                Ok(index)
            } else {
                Err(Error::TrackNotAudio {
                    path: path.to_path_buf(),
                    index,
                })
            }
        }
        TrackSelector::Auto => default_id
            .and_then(|id| tracks.iter().position(|t| t.id == id))
            .filter(|&index| is_decodable(&tracks[index]))
            .or_else(|| tracks.iter().position(is_decodable))
            .or_else(|| tracks.iter().position(is_audio))
            .ok_or_else(|| Error::NoAudioTracks {
                path: path.to_path_buf(),
            }),
    }
}

/// Priming for codecs whose output depends on earlier packets.
///
/// One packet is discarded after a seek, and the seek point moves back by
/// two packets so that priming still ends before the target.
fn seek_priming_for(params: &CodecParameters) -> SeekPriming {
    let fallback_packet = match params.codec {
        CODEC_TYPE_MP1 | CODEC_TYPE_MP2 | CODEC_TYPE_MP3 => 1_152,
        CODEC_TYPE_AAC => 1_024,
        CODEC_TYPE_VORBIS => 4_096,
        _ => return SeekPriming::default(),
    };
    let packet = params.max_frames_per_packet.unwrap_or(fallback_packet);
    SeekPriming {
        preroll: packet * 2,
        frames: 1,
    }
}

fn track_timing(tracks: &[Track], selected: usize) -> StreamTiming {
    let starts: Vec<Option<TrackStart>> = tracks
        .iter()
        .map(|t| {
            let params = &t.codec_params;
            let (numer, denom) = match (params.time_base, params.sample_rate) {
                (Some(tb), _) => (tb.numer, tb.denom),
                (None, Some(rate)) => (1, rate),
                (None, None) => return None,
            };
            Some(TrackStart {
                ts: i64::try_from(params.start_ts).unwrap_or(i64::MAX),
                numer,
                denom,
            })
        })
        .collect();
    StreamTiming {
        audio: starts
            .get(selected)
            .copied()
            .flatten()
            .unwrap_or(TrackStart::ZERO),
        tracks: starts,
    }
}

fn make_decoder(params: &CodecParameters, path: &Path) -> Result<Box<dyn Decoder>> {
    symphonia::default::get_codecs()
        .make(params, &DecoderOptions::default())
        .map_err(|e| match e {
            SymphoniaError::Unsupported(what) => Error::UnsupportedFormat {
                format: what.to_string(),
            },
            other => Error::AudioOpen {
                path: path.to_path_buf(),
                source: Box::new(other),
            },
        })
}

/// Pull packets until one decodes to a non-empty buffer.
fn next_raw_frame(
    format: &mut dyn FormatReader,
    decoder: &mut dyn Decoder,
    track_id: u32,
    path: &Path,
    position: u64,
) -> Result<Option<RawFrame>> {
    let decode_error = |e: SymphoniaError| Error::Decode {
        path: path.to_path_buf(),
        position,
        source: Box::new(e),
    };

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                return Ok(None);
            }
            Err(SymphoniaError::ResetRequired) => {
                warn!(position, "track list changed mid-stream, treating as end of stream");
                return Ok(None);
            }
            Err(e) => return Err(decode_error(e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet).map_err(decode_error)?;
        if decoded.frames() == 0 {
            continue;
        }

        let spec = *decoded.spec();
        let (format, planes) = planes_from_buffer(&decoded)?;
        return Ok(Some(RawFrame {
            ts: packet.ts(),
            format,
            channels: spec.channels.count(),
            channel_layout: u64::from(spec.channels.bits()),
            sample_rate: spec.rate,
            planes,
        }));
    }
}

/// Copy a decoded buffer into canonical planar little-endian bytes.
fn planes_from_buffer(buffer: &AudioBufferRef<'_>) -> Result<(SampleFormat, Vec<Vec<u8>>)> {
    match buffer {
        AudioBufferRef::U8(buf) => Ok((SampleFormat::U8, collect_planes(buf, |s: u8| [s]))),
        AudioBufferRef::S16(buf) => Ok((SampleFormat::S16, collect_planes(buf, i16::to_le_bytes))),
        AudioBufferRef::S24(buf) => Ok((
            SampleFormat::S24,
            collect_planes(buf, |s| (s.inner() << 8).to_le_bytes()),
        )),
        AudioBufferRef::S32(buf) => Ok((SampleFormat::S32, collect_planes(buf, i32::to_le_bytes))),
        AudioBufferRef::F32(buf) => Ok((SampleFormat::F32, collect_planes(buf, f32::to_le_bytes))),
        AudioBufferRef::F64(buf) => Ok((SampleFormat::F64, collect_planes(buf, f64::to_le_bytes))),
        AudioBufferRef::S8(_) => Err(unsupported("signed 8-bit")),
        AudioBufferRef::U16(_) => Err(unsupported("unsigned 16-bit")),
        AudioBufferRef::U24(_) => Err(unsupported("unsigned 24-bit")),
        AudioBufferRef::U32(_) => Err(unsupported("unsigned 32-bit")),
    }
}

fn unsupported(what: &str) -> Error {
    Error::UnsupportedFormat {
        format: format!("{what} samples have no canonical PCM mapping"),
    }
}

fn collect_planes<S: Sample, const N: usize>(
    buffer: &AudioBuffer<S>,
    to_bytes: impl Fn(S) -> [u8; N],
) -> Vec<Vec<u8>> {
    (0..buffer.spec().channels.count())
        .map(|ch| buffer.chan(ch).iter().flat_map(|&s| to_bytes(s)).collect())
        .collect()
}
