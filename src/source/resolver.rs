//! Serving sample ranges from the cache and the decoder.
//!
//! A request is split into cached spans and gaps. Each gap is filled either
//! by continuing sequential decode from the cursor (when the cursor sits at
//! or shortly before the gap) or by seeking near the gap and decoding
//! forward. Every decoded frame goes into the cache except the priming
//! frames a lossy decoder emits right after a seek. Output is copied only
//! once the whole range is covered, so a failed request never leaves
//! partial data behind.

use super::backend::{MediaBackend, SeekPriming};
use super::cache::{FrameCache, Span};
use super::decoder::FrameDecoder;
use super::frame::DecodedFrame;
use crate::config::EngineConfig;
use crate::constants::engine::SEEK_BACKOFF_SAMPLES;
use crate::error::{Error, Result};
use serde::Serialize;
use std::ops::Range;
use tracing::{debug, trace};

/// Instrumentation for an engine instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Seeks issued to the backend.
    pub seeks: u64,
    /// Frames decoded.
    pub frames_decoded: u64,
    /// Samples per channel decoded.
    pub samples_decoded: u64,
    /// Spans served straight from the cache.
    pub cache_hits: u64,
    /// Spans that had to be decoded.
    pub cache_misses: u64,
    /// Frames evicted from the cache.
    pub evictions: u64,
}

/// Decode-space range server.
pub struct RangeResolver<B> {
    pub(super) decoder: FrameDecoder<B>,
    pub(super) cache: FrameCache,
    /// Decode-space sample count; requests are clamped to it.
    pub(super) total: u64,
    channels: usize,
    bytes_per_sample: usize,
    silence: u8,
    seek_tolerance: u64,
    seek_preroll: u64,
    max_seek_attempts: u32,
    cache_hits: u64,
    cache_misses: u64,
}

impl<B: MediaBackend> RangeResolver<B> {
    /// Build a resolver over a freshly opened backend.
    pub fn new(backend: B, engine: &EngineConfig) -> Self {
        let props = backend.properties().clone();
        Self {
            decoder: FrameDecoder::new(backend),
            cache: FrameCache::new(engine.cache_max_bytes, engine.cache_max_frames),
            total: props.num_samples,
            channels: props.channels,
            bytes_per_sample: props.bytes_per_sample(),
            silence: props.format.silence_byte(),
            seek_tolerance: engine.seek_tolerance_samples,
            seek_preroll: engine.seek_preroll_samples,
            max_seek_attempts: engine.max_seek_attempts.max(1),
            cache_hits: 0,
            cache_misses: 0,
        }
    }

    /// The frame decoder.
    pub fn decoder(&self) -> &FrameDecoder<B> {
        &self.decoder
    }

    /// Decode-space sample count requests are clamped to.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> EngineStats {
        let counters = self.decoder.counters();
        EngineStats {
            seeks: counters.seeks,
            frames_decoded: counters.frames_decoded,
            samples_decoded: counters.samples_decoded,
            cache_hits: self.cache_hits,
            cache_misses: self.cache_misses,
            evictions: self.cache.evictions(),
        }
    }

    /// Fill `out[c][offset..offset + count]` (in samples) with decode-space
    /// samples `[start, start + count)`.
    ///
    /// Positions past the end of the stream are silence.
    #[allow(clippy::cast_possible_truncation)]
    pub fn get_audio(
        &mut self,
        start: u64,
        count: u64,
        out: &mut [&mut [u8]],
        out_offset: usize,
    ) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        let end = start.saturating_add(count);
        let clamped_end = end.min(self.total);
        let pinned = start..clamped_end;

        let mut served_end = start;
        if start < clamped_end {
            for span in self.cache.lookup(start, clamped_end) {
                match span {
                    Span::Hit { .. } => self.cache_hits += 1,
                    Span::Gap { .. } => self.cache_misses += 1,
                }
            }
            served_end = self.fill(start, clamped_end, &pinned)?;
        }

        // All decoding is done; copy out.
        let mut pos = start;
        for span in self.cache.lookup(start, served_end) {
            match span {
                Span::Hit { frame, start: s, end: e } => {
                    let offset = out_offset + (s - start) as usize;
                    if !self.cache.copy_out(frame, s, e, out, offset) {
                        return Err(Error::Internal {
                            message: format!("cached frame at {frame} vanished during copy"),
                        });
                    }
                    pos = e;
                }
                Span::Gap { start: s, end: e } => {
                    return Err(Error::Internal {
                        message: format!("range {s}..{e} not covered after decoding"),
                    });
                }
            }
        }
        if pos < end {
            self.fill_silence(out, out_offset + (pos - start) as usize, (end - pos) as usize);
        }

        self.cache.evict(None);
        Ok(())
    }

    /// Decode until `[start, end)` is cached or the stream ends.
    ///
    /// Returns the end of the contiguous covered prefix.
    fn fill(&mut self, start: u64, end: u64, pinned: &Range<u64>) -> Result<u64> {
        let mut pos = start;
        while let Some((gap_start, gap_end)) = self.cache.first_gap(pos, end) {
            let reached = self.fill_gap(gap_start, gap_end, pinned)?;
            if reached < gap_end {
                debug!(
                    gap_start,
                    reached,
                    nominal_end = self.total,
                    "stream ended before nominal end, padding with silence"
                );
                return Ok(self.covered_until(start, end));
            }
            pos = gap_end;
        }
        Ok(end)
    }

    /// End of the contiguous cached run starting at `from`, capped at `limit`.
    fn covered_until(&self, from: u64, limit: u64) -> u64 {
        self.cache
            .first_gap(from, limit)
            .map_or(limit, |(gap_start, _)| gap_start)
    }

    /// Fill one gap, returning how far decoding got.
    fn fill_gap(&mut self, gap_start: u64, gap_end: u64, pinned: &Range<u64>) -> Result<u64> {
        match self.decoder.cursor() {
            Some(cursor) if self.decoder.at_end() && cursor <= gap_start => {
                return Ok(cursor);
            }
            Some(cursor) if cursor <= gap_start && gap_start - cursor <= self.seek_tolerance => {
                trace!(cursor, gap_start, "continuing sequential decode");
            }
            cursor => {
                debug!(?cursor, gap_start, gap_end, "gap not reachable sequentially");
                let Some(reached) = self.reseek(gap_start, pinned)? else {
                    return Ok(gap_start);
                };
                if reached >= gap_end {
                    return Ok(reached);
                }
            }
        }

        while let Some(frame) = self.decoder.decode_next()? {
            let frame_end = frame.end();
            self.cache.insert(frame, pinned);
            if frame_end >= gap_end {
                return Ok(frame_end);
            }
        }
        Ok(self.decoder.cursor().unwrap_or(gap_start))
    }

    /// Seek so the next frames cover `target`, caching the first usable frame.
    ///
    /// Returns the end of that frame, or `None` if the stream holds nothing
    /// at or after the landing point. A seek that lands after its target is
    /// retried further back, finally from sample 0.
    fn reseek(&mut self, target: u64, pinned: &Range<u64>) -> Result<Option<u64>> {
        let priming = self.decoder.backend().seek_priming();
        let mut seek_to = target.saturating_sub(self.seek_preroll.saturating_add(priming.preroll));
        let mut backoff = SEEK_BACKOFF_SAMPLES;
        let mut attempt = 1;

        loop {
            self.decoder.seek_near(seek_to)?;
            let first = self.first_usable_frame(seek_to, priming)?;
            match first {
                Some(frame) if frame.start <= target || seek_to == 0 => {
                    trace!(target, landed = frame.start, "seek landed");
                    let frame_end = frame.end();
                    self.cache.insert(frame, pinned);
                    return Ok(Some(frame_end));
                }
                None if seek_to == 0 => return Ok(None),
                landed => {
                    debug!(
                        target,
                        seek_to,
                        landed = ?landed.as_ref().map(|f| f.start),
                        attempt,
                        "seek landed after target, retrying earlier"
                    );
                    if let Some(frame) = landed {
                        self.cache.insert(frame, pinned);
                    }
                    attempt += 1;
                    seek_to = if attempt >= self.max_seek_attempts {
                        0
                    } else {
                        seek_to.saturating_sub(backoff)
                    };
                    backoff = backoff.saturating_mul(2);
                }
            }
        }
    }

    /// First frame after a seek to `seek_to` that matches a decode from the
    /// start of the stream.
    ///
    /// With priming, frames starting before `seek_to` and the first
    /// `priming.frames` frames after it are decoded and dropped. None of
    /// them reach the cache.
    fn first_usable_frame(
        &mut self,
        seek_to: u64,
        priming: SeekPriming,
    ) -> Result<Option<DecodedFrame>> {
        if seek_to == 0 || priming.is_none() {
            return self.decoder.decode_next();
        }
        let mut primed = 0;
        while let Some(frame) = self.decoder.decode_next()? {
            if frame.start >= seek_to {
                if primed >= priming.frames {
                    return Ok(Some(frame));
                }
                primed += 1;
            }
            trace!(start = frame.start, seek_to, "discarding priming frame");
        }
        Ok(None)
    }

    #[allow(clippy::cast_possible_truncation)]
    fn fill_silence(&self, out: &mut [&mut [u8]], offset: usize, count: usize) {
        let lo = offset * self.bytes_per_sample;
        let hi = lo + count * self.bytes_per_sample;
        for plane in out.iter_mut().take(self.channels) {
            plane[lo..hi].fill(self.silence);
        }
    }
}
