//! Configuration type definitions.

use crate::constants::engine::{
    DEFAULT_CACHE_MAX_BYTES, DEFAULT_CACHE_MAX_FRAMES, DEFAULT_MAX_SEEK_ATTEMPTS,
    DEFAULT_SEEK_PREROLL_SAMPLES, DEFAULT_SEEK_TOLERANCE_SAMPLES,
};
use serde::{Deserialize, Serialize};

/// Complete application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine tuning.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Default source settings.
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

/// Tunable engine parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Ceiling on cached sample bytes.
    pub cache_max_bytes: usize,

    /// Ceiling on the number of cached frames.
    pub cache_max_frames: usize,

    /// How far (in samples) the decode cursor may trail a requested range
    /// and still be advanced sequentially instead of reseeking.
    pub seek_tolerance_samples: u64,

    /// Samples subtracted from every seek target.
    pub seek_preroll_samples: u64,

    /// Seek attempts before falling back to decoding from the start.
    pub max_seek_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_max_bytes: DEFAULT_CACHE_MAX_BYTES,
            cache_max_frames: DEFAULT_CACHE_MAX_FRAMES,
            seek_tolerance_samples: DEFAULT_SEEK_TOLERANCE_SAMPLES,
            seek_preroll_samples: DEFAULT_SEEK_PREROLL_SAMPLES,
            max_seek_attempts: DEFAULT_MAX_SEEK_ATTEMPTS,
        }
    }
}

/// Defaults applied when opening sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Track index, or `None` to pick automatically.
    pub track: Option<i64>,

    /// Always establish the exact sample count when opening.
    pub exact_samples: bool,

    /// Follow external references in containers that use them.
    pub enable_external_references: bool,

    /// Resolve relative source paths against the working directory.
    pub resolve_relative_paths: bool,

    /// Dynamic range compression scale.
    pub drc_scale: f32,

    /// Disable progress bars.
    pub no_progress: bool,
}
