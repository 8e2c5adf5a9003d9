//! Exact sample count by full decode.

use super::backend::MediaBackend;
use super::resolver::RangeResolver;
use crate::error::Result;
use tracing::{debug, info};

impl<B: MediaBackend> RangeResolver<B> {
    /// Decode the whole stream once and return its true sample count.
    ///
    /// Decoding continues from the cursor when everything so far was decoded
    /// in order from sample 0; otherwise it restarts from the beginning.
    /// Frames produced along the way populate the cache subject to its
    /// normal budget. The resolver's clamp is updated to the result.
    pub fn establish_exact_duration(&mut self) -> Result<u64> {
        if self.decoder.is_from_start() {
            debug!(cursor = ?self.decoder.cursor(), "counting samples from current position");
        } else {
            self.decoder.seek_near(0)?;
        }

        let nominal = self.total;
        let no_pin = 0..0;
        while let Some(frame) = self.decoder.decode_next()? {
            self.cache.insert(frame, &no_pin);
        }
        let exact = self.decoder.cursor().unwrap_or(0);

        info!(nominal, exact, "established exact sample count");
        self.total = exact;
        Ok(exact)
    }
}
