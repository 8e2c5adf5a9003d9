//! Error types for audiosource.

use std::path::PathBuf;

/// Result type alias for audiosource operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad classification of an [`Error`].
///
/// Callers that only need to know whether construction, decoding or a
/// particular request failed can match on this instead of every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The source could not be opened or its stream is unusable.
    Open,
    /// The decoder failed mid-stream.
    Decode,
    /// A request against an open source was invalid or could not be served.
    Audio,
    /// Configuration could not be loaded, saved or validated.
    Config,
    /// Plain I/O outside the decode path.
    Io,
}

/// Top-level error type for audiosource.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Open errors
    /// Source file does not exist.
    #[error("source file does not exist: {path}")]
    SourceNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// Failed to open or probe the source.
    #[error("failed to open audio file '{path}'")]
    AudioOpen {
        /// Path to the audio file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No decodable audio tracks found.
    #[error("no audio tracks found in '{path}'")]
    NoAudioTracks {
        /// Path to the audio file.
        path: PathBuf,
    },

    /// Requested track index does not exist.
    #[error("track {index} does not exist in '{path}' ({count} tracks)")]
    TrackNotFound {
        /// Path to the audio file.
        path: PathBuf,
        /// Requested track index.
        index: usize,
        /// Number of tracks in the container.
        count: usize,
    },

    /// Requested track is not a decodable audio track.
    #[error("track {index} in '{path}' is not an audio track")]
    TrackNotAudio {
        /// Path to the audio file.
        path: PathBuf,
        /// Requested track index.
        index: usize,
    },

    /// Decoder output has no canonical PCM mapping.
    #[error("unsupported audio format: {format}")]
    UnsupportedFormat {
        /// Description of the decoder output format.
        format: String,
    },

    // Decode errors
    /// Failed to decode audio.
    #[error("failed to decode audio from '{path}' near sample {position}")]
    Decode {
        /// Path to the audio file.
        path: PathBuf,
        /// Decode-space position the decoder was working towards.
        position: u64,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    // Audio errors
    /// Failed to reposition the decoder.
    #[error("failed to seek to sample {target}")]
    Seek {
        /// Decode-space target sample.
        target: u64,
        /// Underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Request range is not valid.
    #[error("invalid audio range: start {start}, count {count}")]
    InvalidRange {
        /// Requested start sample.
        start: i64,
        /// Requested sample count.
        count: i64,
    },

    /// Caller-provided output buffers do not fit the request.
    #[error("output buffer mismatch: {message}")]
    OutputBuffer {
        /// Description of the mismatch.
        message: String,
    },

    /// Failed to write WAV file.
    #[error("failed to write WAV file '{path}'")]
    WavWriteFailed {
        /// Path to the WAV file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: hound::Error,
    },

    // Config errors
    /// Configuration directory could not be determined.
    #[error("could not determine configuration directory for this platform")]
    ConfigDirNotFound,

    /// Failed to read configuration file.
    #[error("failed to read config file '{path}'")]
    ConfigRead {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse configuration file.
    #[error("failed to parse config file '{path}'")]
    ConfigParse {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Failed to write configuration file.
    #[error("failed to write config file '{path}'")]
    ConfigWrite {
        /// Path to the config file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize configuration.
    #[error("failed to serialize config")]
    ConfigSerialize {
        /// Underlying serialization error.
        #[source]
        source: toml::ser::Error,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    /// Internal error (for unexpected failures).
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
    },
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceNotFound { .. }
            | Self::AudioOpen { .. }
            | Self::NoAudioTracks { .. }
            | Self::TrackNotFound { .. }
            | Self::TrackNotAudio { .. }
            | Self::UnsupportedFormat { .. } => ErrorKind::Open,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::Seek { .. }
            | Self::InvalidRange { .. }
            | Self::OutputBuffer { .. }
            | Self::Internal { .. } => ErrorKind::Audio,
            Self::ConfigDirNotFound
            | Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::ConfigWrite { .. }
            | Self::ConfigSerialize { .. }
            | Self::ConfigValidation { .. } => ErrorKind::Config,
            Self::Io(_) | Self::WavWriteFailed { .. } => ErrorKind::Io,
        }
    }

    /// Render the full error chain as a single line.
    ///
    /// Host adapters pass this text through unmodified, optionally behind
    /// their own prefix.
    pub fn chain_message(&self) -> String {
        let mut message = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        message
    }
}
