//! Error types for sphfluid.
//!
//! The simulation step itself never fails: degenerate physical states are
//! clamped, not reported. Errors only come out of the one-time loading paths
//! (collision-shape assets, particle replay files, configuration).

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching an asset.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Failed to read the asset from disk.
    #[error("Failed to read asset '{}': {source}", .path.display())]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The loader has no asset with this name.
    #[error("Asset '{0}' not found")]
    NotFound(String),
    /// The asset is not valid UTF-8 text.
    #[error("Asset '{0}' is not valid UTF-8 text")]
    NotText(String),
    /// Failed to decode a heightmap image.
    #[cfg(feature = "heightmap-images")]
    #[error("Failed to decode heightmap image: {0}")]
    Image(#[from] image::ImageError),
    /// Heightmap decoding was requested but the crate was built without image support.
    #[cfg(not(feature = "heightmap-images"))]
    #[error("Heightmap images require the `heightmap-images` feature")]
    ImageSupportDisabled,
    /// The SDF volume asset is malformed.
    #[error(transparent)]
    SdfVolume(#[from] SdfParseError),
    /// The particle replay file is malformed (strict parsing only).
    #[error(transparent)]
    Replay(#[from] ReplayError),
}

/// Errors raised while parsing an SDF volume asset.
#[derive(Debug, Error, PartialEq)]
pub enum SdfParseError {
    /// A header line is missing.
    #[error("SDF volume is missing its {0} line")]
    MissingHeader(&'static str),
    /// A header value could not be parsed as a number.
    #[error("Invalid number '{value}' in SDF volume line {line}")]
    InvalidNumber {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        value: String,
    },
    /// A dimension is smaller than the 2 samples trilinear filtering needs.
    #[error("SDF volume dimensions must be at least 2x2x2, got {0}x{1}x{2}")]
    TooSmall(usize, usize, usize),
    /// `dim_x * dim_y * dim_z` does not fit in `usize`.
    #[error("SDF volume dimensions {0}x{1}x{2} are too large")]
    TooLarge(usize, usize, usize),
    /// The grid step is not a positive finite number.
    #[error("SDF volume step must be positive, got {0}")]
    InvalidStep(f32),
    /// Fewer samples than `dim_x * dim_y * dim_z`.
    #[error("SDF volume has {found} samples, expected {expected}")]
    SampleCount {
        /// Samples the header promises.
        expected: usize,
        /// Samples actually present.
        found: usize,
    },
}

/// Errors raised by strict replay-file parsing.
#[derive(Debug, Error, PartialEq)]
pub enum ReplayError {
    /// A row has fewer than the four `label,x,y,z` fields.
    #[error("Replay row {line} has {fields} fields, expected at least 4")]
    TooFewFields {
        /// 1-based line number.
        line: usize,
        /// Number of comma-separated fields found.
        fields: usize,
    },
    /// A coordinate is not a number.
    #[error("Replay row {line} has invalid coordinate '{value}'")]
    InvalidCoordinate {
        /// 1-based line number.
        line: usize,
        /// Offending text.
        value: String,
    },
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("Failed to read config file '{}': {source}", .path.display())]
    Io {
        /// Path of the configuration file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The TOML is malformed or has unknown keys.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// A value is out of its valid range.
    #[error("Invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Errors that can occur when starting a simulation session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A collision shape or particle asset failed to load.
    #[error("Asset loading failed: {0}")]
    Asset(#[from] AssetError),
    /// The session configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// `start` was called on a session that is already running or disposed.
    #[error("Session already started or disposed")]
    AlreadyStarted,
}
