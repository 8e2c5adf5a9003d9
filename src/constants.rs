//! Application-wide constants.
//!
//! All magic numbers and strings are defined here to ensure consistency
//! and make changes easy to track.

/// Application name used for config directories and user-facing messages.
pub const APP_NAME: &str = "audiosource";

/// Prefix host adapters put in front of engine error messages.
pub const ENGINE_NAME: &str = "AudioSource";

/// Track selector integer meaning "pick the best audio track".
pub const AUTO_TRACK: i64 = -1;

/// Engine tuning defaults.
pub mod engine {
    /// Default cache ceiling in bytes (64 MiB).
    pub const DEFAULT_CACHE_MAX_BYTES: usize = 64 * 1024 * 1024;

    /// Default cap on the number of cached frames.
    pub const DEFAULT_CACHE_MAX_FRAMES: usize = 4096;

    /// Default forward distance (in samples) the decode cursor may trail a
    /// gap and still be advanced sequentially instead of reseeking.
    ///
    /// One second at 48 kHz. Small backward hops always reseek; this only
    /// governs forward skips.
    pub const DEFAULT_SEEK_TOLERANCE_SAMPLES: u64 = 48_000;

    /// Default number of samples subtracted from every seek target.
    pub const DEFAULT_SEEK_PREROLL_SAMPLES: u64 = 0;

    /// Default number of seek attempts before restarting from sample 0.
    pub const DEFAULT_MAX_SEEK_ATTEMPTS: u32 = 4;

    /// Initial backoff when a seek lands after its target, in samples.
    pub const SEEK_BACKOFF_SAMPLES: u64 = 8_192;
}

/// Extraction (CLI) constants.
pub mod extract {
    /// Number of samples requested per `get_audio` call when extracting.
    pub const BLOCK_SAMPLES: u64 = 65_536;

    /// Default output file name for WAV extraction.
    pub const DEFAULT_WAV_OUTPUT: &str = "extract.wav";

    /// Default output file name for raw extraction.
    pub const DEFAULT_RAW_OUTPUT: &str = "extract.pcm";
}
