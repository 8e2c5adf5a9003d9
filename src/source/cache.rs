//! Bounded store of recently decoded frames.
//!
//! Frames are keyed by their decode-space start sample and never overlap.
//! Eviction is least-recently-used, bounded by a byte ceiling and a frame
//! count ceiling, with victims taken from an ordered recency index rather
//! than a scan over every frame. Frames overlapping the request currently being resolved
//! are pinned and survive eviction until the request completes.

use super::frame::DecodedFrame;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Range;
use tracing::trace;

/// One piece of a range lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Span {
    /// `[start, end)` is held by the cached frame keyed at `frame`.
    Hit {
        /// Key (start sample) of the frame holding this span.
        frame: u64,
        /// First sample of the span.
        start: u64,
        /// One past the last sample of the span.
        end: u64,
    },
    /// `[start, end)` is not cached.
    Gap {
        /// First sample of the gap.
        start: u64,
        /// One past the last sample of the gap.
        end: u64,
    },
}

#[derive(Debug)]
struct Entry {
    frame: DecodedFrame,
    last_used: u64,
}

/// LRU frame cache.
#[derive(Debug)]
pub struct FrameCache {
    frames: BTreeMap<u64, Entry>,
    /// `(last_used, key)` for every cached frame, oldest first.
    recency: BTreeSet<(u64, u64)>,
    bytes: usize,
    max_bytes: usize,
    max_frames: usize,
    tick: u64,
    evictions: u64,
}

impl FrameCache {
    /// Create a cache bounded by `max_bytes` and `max_frames`.
    pub fn new(max_bytes: usize, max_frames: usize) -> Self {
        Self {
            frames: BTreeMap::new(),
            recency: BTreeSet::new(),
            bytes: 0,
            max_bytes,
            max_frames: max_frames.max(1),
            tick: 0,
            evictions: 0,
        }
    }

    /// Number of cached frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Bytes held by cached sample buffers.
    pub fn byte_size(&self) -> usize {
        self.bytes
    }

    /// Frames evicted so far.
    pub fn evictions(&self) -> u64 {
        self.evictions
    }

    /// Describe `[start, end)` as an ordered sequence of hits and gaps.
    ///
    /// Frames touched by the lookup become most recently used.
    pub fn lookup(&mut self, start: u64, end: u64) -> Vec<Span> {
        let mut spans = Vec::new();
        if start >= end {
            return spans;
        }
        self.tick += 1;
        let tick = self.tick;

        let mut pos = start;
        for key in self.overlapping_keys(start, end) {
            let Some(entry) = self.frames.get_mut(&key) else {
                continue;
            };
            self.recency.remove(&(entry.last_used, key));
            self.recency.insert((tick, key));
            entry.last_used = tick;
            let frame_end = entry.frame.end().min(end);
            let frame_start = entry.frame.start.max(start);
            if frame_start > pos {
                spans.push(Span::Gap {
                    start: pos,
                    end: frame_start,
                });
            }
            spans.push(Span::Hit {
                frame: key,
                start: frame_start,
                end: frame_end,
            });
            pos = frame_end;
        }
        if pos < end {
            spans.push(Span::Gap { start: pos, end });
        }
        spans
    }

    /// First uncached sub-range of `[start, end)`, without touching recency.
    pub fn first_gap(&self, start: u64, end: u64) -> Option<(u64, u64)> {
        let mut pos = start;
        for key in self.overlapping_keys(start, end) {
            let frame = &self.frames[&key].frame;
            if frame.start > pos {
                return Some((pos, frame.start.min(end)));
            }
            pos = pos.max(frame.end());
            if pos >= end {
                return None;
            }
        }
        (pos < end).then_some((pos, end))
    }

    /// Insert a frame, keeping only the parts not already cached.
    ///
    /// Cached data wins for positions already covered. Afterwards the cache
    /// is trimmed to budget, never evicting frames overlapping `pinned`.
    pub fn insert(&mut self, frame: DecodedFrame, pinned: &Range<u64>) {
        if frame.is_empty() {
            return;
        }
        self.tick += 1;
        let tick = self.tick;

        let covered: Vec<(u64, u64)> = self
            .overlapping_keys(frame.start, frame.end())
            .into_iter()
            .map(|key| {
                let f = &self.frames[&key].frame;
                (f.start, f.end())
            })
            .collect();

        if covered.is_empty() {
            self.store(frame, tick);
        } else {
            let mut pos = frame.start;
            for (cached_start, cached_end) in covered {
                if cached_start > pos
                    && let Some(piece) = frame.slice(pos, cached_start)
                {
                    self.store(piece, tick);
                }
                pos = pos.max(cached_end);
            }
            if pos < frame.end()
                && let Some(piece) = frame.slice(pos, frame.end())
            {
                self.store(piece, tick);
            }
        }

        self.evict(Some(pinned));
    }

    /// Evict least-recently-used frames until within budget.
    ///
    /// Frames overlapping `pinned` are skipped; if only pinned frames remain
    /// the cache stays over budget until the next unpinned call.
    pub fn evict(&mut self, pinned: Option<&Range<u64>>) {
        while self.over_budget() {
            let victim = self.recency.iter().copied().find(|(_, key)| {
                pinned.is_none_or(|p| {
                    self.frames
                        .get(key)
                        .is_none_or(|e| !e.frame.overlaps(p.start, p.end))
                })
            });
            let Some((last_used, key)) = victim else {
                break;
            };
            self.recency.remove(&(last_used, key));
            if let Some(entry) = self.frames.remove(&key) {
                self.bytes -= entry.frame.byte_size();
                self.evictions += 1;
                trace!(start = entry.frame.start, len = entry.frame.len, "evicted frame");
            }
        }
    }

    /// Copy `[start, end)` from the frame keyed at `key` into `out`.
    ///
    /// Returns `false` if the frame is no longer cached.
    pub(crate) fn copy_out(
        &self,
        key: u64,
        start: u64,
        end: u64,
        out: &mut [&mut [u8]],
        out_offset: usize,
    ) -> bool {
        match self.frames.get(&key) {
            Some(entry) => {
                entry.frame.copy_into(start, end - start, out, out_offset);
                true
            }
            None => false,
        }
    }

    fn store(&mut self, frame: DecodedFrame, tick: u64) {
        let key = frame.start;
        self.bytes += frame.byte_size();
        self.recency.insert((tick, key));
        let replaced = self.frames.insert(
            key,
            Entry {
                frame,
                last_used: tick,
            },
        );
        if let Some(old) = replaced {
            self.bytes -= old.frame.byte_size();
            if old.last_used != tick {
                self.recency.remove(&(old.last_used, key));
            }
        }
    }

    fn over_budget(&self) -> bool {
        self.bytes > self.max_bytes || self.frames.len() > self.max_frames
    }

    /// Keys of cached frames intersecting `[start, end)`, in order.
    fn overlapping_keys(&self, start: u64, end: u64) -> Vec<u64> {
        let mut keys = Vec::new();
        if let Some((&key, entry)) = self.frames.range(..start).next_back()
            && entry.frame.end() > start
        {
            keys.push(key);
        }
        keys.extend(self.frames.range(start..end).map(|(&key, _)| key));
        keys
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NONE: Range<u64> = 0..0;

    /// A mono 8-bit frame whose bytes encode their own sample index.
    fn frame(start: u64, len: u64) -> DecodedFrame {
        let plane = (start..start + len).map(|i| (i % 251) as u8).collect();
        DecodedFrame::new(start, 1, vec![plane])
    }

    #[test]
    fn test_lookup_empty_cache_is_single_gap() {
        let mut cache = FrameCache::new(1024, 16);
        assert_eq!(cache.lookup(10, 20), vec![Span::Gap { start: 10, end: 20 }]);
    }

    #[test]
    fn test_lookup_reports_hits_and_gaps_in_order() {
        let mut cache = FrameCache::new(1024, 16);
        cache.insert(frame(0, 10), &NONE);
        cache.insert(frame(20, 10), &NONE);

        let spans = cache.lookup(5, 25);
        assert_eq!(
            spans,
            vec![
                Span::Hit {
                    frame: 0,
                    start: 5,
                    end: 10
                },
                Span::Gap { start: 10, end: 20 },
                Span::Hit {
                    frame: 20,
                    start: 20,
                    end: 25
                },
            ]
        );
    }

    #[test]
    fn test_first_gap() {
        let mut cache = FrameCache::new(1024, 16);
        cache.insert(frame(0, 10), &NONE);
        cache.insert(frame(10, 10), &NONE);
        assert_eq!(cache.first_gap(0, 20), None);
        assert_eq!(cache.first_gap(0, 30), Some((20, 30)));
        assert_eq!(cache.first_gap(25, 30), Some((25, 30)));
    }

    #[test]
    fn test_insert_overlap_keeps_cached_data() {
        let mut cache = FrameCache::new(1024, 16);
        cache.insert(frame(10, 10), &NONE);

        // Same range with different contents must not replace the cached bytes.
        let mut replacement = frame(5, 20);
        replacement.planes[0].iter_mut().for_each(|b| *b = 0xEE);
        cache.insert(replacement, &NONE);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.first_gap(5, 25), None);

        let mut buf = vec![0_u8; 20];
        {
            let mut out: Vec<&mut [u8]> = vec![buf.as_mut_slice()];
            for span in cache.lookup(5, 25) {
                if let Span::Hit { frame, start, end } = span {
                    assert!(cache.copy_out(frame, start, end, &mut out, (start - 5) as usize));
                }
            }
        }
        assert!(buf[..5].iter().all(|&b| b == 0xEE));
        assert_eq!(buf[5], 10);
        assert_eq!(buf[14], 19);
        assert!(buf[15..].iter().all(|&b| b == 0xEE));
    }

    #[test]
    fn test_insert_fully_covered_frame_is_dropped() {
        let mut cache = FrameCache::new(1024, 16);
        cache.insert(frame(0, 20), &NONE);
        cache.insert(frame(5, 5), &NONE);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.byte_size(), 20);
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let mut cache = FrameCache::new(30, 16);
        cache.insert(frame(0, 10), &NONE);
        cache.insert(frame(10, 10), &NONE);
        cache.insert(frame(20, 10), &NONE);

        // Touch the oldest so the middle frame becomes the victim.
        cache.lookup(0, 5);
        cache.insert(frame(30, 10), &NONE);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.evictions(), 1);
        assert_eq!(cache.first_gap(0, 40), Some((10, 20)));
    }

    #[test]
    fn test_eviction_follows_recency_index() {
        let mut cache = FrameCache::new(usize::MAX, 4);
        for i in 0..4 {
            cache.insert(frame(i * 10, 10), &NONE);
        }
        cache.lookup(0, 10);
        cache.lookup(20, 30);

        cache.insert(frame(40, 10), &NONE);
        assert_eq!(cache.first_gap(0, 50), Some((10, 20)));
        cache.insert(frame(50, 10), &NONE);
        assert_eq!(cache.first_gap(20, 60), Some((30, 40)));

        assert_eq!(cache.len(), 4);
        assert_eq!(cache.recency.len(), cache.len());
        assert_eq!(cache.evictions(), 2);
    }

    #[test]
    fn test_recency_index_tracks_many_frames() {
        let mut cache = FrameCache::new(usize::MAX, 256);
        for i in 0..5_000 {
            cache.insert(frame(i * 4, 4), &NONE);
            if i % 3 == 0 {
                cache.lookup(i * 2, i * 2 + 8);
            }
        }
        assert_eq!(cache.len(), 256);
        assert_eq!(cache.recency.len(), 256);
        assert!(cache.recency.iter().all(|(tick, key)| cache.frames[key].last_used == *tick));
    }

    #[test]
    fn test_frame_count_ceiling() {
        let mut cache = FrameCache::new(usize::MAX, 2);
        for i in 0..5 {
            cache.insert(frame(i * 10, 10), &NONE);
        }
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.first_gap(30, 50), None);
    }

    #[test]
    fn test_pinned_frames_survive_until_released() {
        let mut cache = FrameCache::new(10, 16);
        let pinned = 0..30;
        cache.insert(frame(0, 10), &pinned);
        cache.insert(frame(10, 10), &pinned);
        cache.insert(frame(20, 10), &pinned);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.byte_size(), 30);

        cache.evict(None);
        assert_eq!(cache.len(), 1);
        assert!(cache.byte_size() <= 10);
    }
}
