//! Decoded PCM frames.

/// One unit of planar PCM produced by a single decode operation.
///
/// `planes` holds one little-endian byte buffer per channel; each buffer is
/// exactly `len * bytes_per_sample` bytes long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedFrame {
    /// Absolute decode-space index of the first sample.
    pub start: u64,
    /// Number of samples per channel.
    pub len: u64,
    /// Storage size of one sample in bytes.
    pub bytes_per_sample: usize,
    /// Per-channel sample bytes.
    pub planes: Vec<Vec<u8>>,
}

impl DecodedFrame {
    /// Build a frame from per-channel buffers.
    ///
    /// The sample count is taken from the first plane.
    pub fn new(start: u64, bytes_per_sample: usize, planes: Vec<Vec<u8>>) -> Self {
        let len = planes
            .first()
            .map_or(0, |p| (p.len() / bytes_per_sample.max(1)) as u64);
        Self {
            start,
            len,
            bytes_per_sample,
            planes,
        }
    }

    /// One past the last sample index.
    pub fn end(&self) -> u64 {
        self.start + self.len
    }

    /// Whether the frame holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Memory held by the sample buffers.
    pub fn byte_size(&self) -> usize {
        self.planes.iter().map(Vec::len).sum()
    }

    /// Whether `[start, end)` intersects this frame.
    pub fn overlaps(&self, start: u64, end: u64) -> bool {
        self.start < end && start < self.end()
    }

    /// Return the part of this frame inside `[start, end)`, if any.
    pub fn slice(&self, start: u64, end: u64) -> Option<Self> {
        let from = start.max(self.start);
        let to = end.min(self.end());
        if from >= to {
            return None;
        }
        let bps = self.bytes_per_sample;
        let lo = usize::try_from(from - self.start).ok()? * bps;
        let hi = usize::try_from(to - self.start).ok()? * bps;
        Some(Self {
            start: from,
            len: to - from,
            bytes_per_sample: bps,
            planes: self.planes.iter().map(|p| p[lo..hi].to_vec()).collect(),
        })
    }

    /// Copy samples `[from, from + count)` of this frame into `out`, one
    /// destination buffer per channel, starting at sample `out_offset`.
    #[allow(clippy::cast_possible_truncation)]
    pub(crate) fn copy_into(&self, from: u64, count: u64, out: &mut [&mut [u8]], out_offset: usize) {
        let bps = self.bytes_per_sample;
        let src_lo = (from - self.start) as usize * bps;
        let bytes = count as usize * bps;
        let dst_lo = out_offset * bps;
        for (plane, dst) in self.planes.iter().zip(out.iter_mut()) {
            dst[dst_lo..dst_lo + bytes].copy_from_slice(&plane[src_lo..src_lo + bytes]);
        }
    }
}
