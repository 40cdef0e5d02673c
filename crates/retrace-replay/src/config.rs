//! Session configuration and validation.

use std::error::Error;
use std::fmt;

/// Configuration for a [`ReplaySession`](crate::session::ReplaySession).
///
/// Validated once by [`ReplaySession::new`](crate::session::ReplaySession::new).
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayConfig {
    /// Gzip level used for channel payloads, 0-9. Default: 6.
    pub compression_level: u32,
    /// Pretty-print the session document. Default: false.
    pub pretty_json: bool,
    /// Seconds per fixed simulation step. Default: 0.02 (50 Hz).
    pub fixed_dt: f32,
    /// Longest recording accepted for upload, in seconds.
    /// `None` = unlimited. Default: 300.
    pub max_recording_secs: Option<f32>,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            compression_level: 6,
            pretty_json: false,
            fixed_dt: 0.02,
            max_recording_secs: Some(300.0),
        }
    }
}

impl ReplayConfig {
    /// Check invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.compression_level > 9 {
            return Err(ConfigError::InvalidCompressionLevel {
                level: self.compression_level,
            });
        }
        if !self.fixed_dt.is_finite() || self.fixed_dt <= 0.0 {
            return Err(ConfigError::InvalidFixedDt {
                value: self.fixed_dt,
            });
        }
        if let Some(limit) = self.max_recording_secs {
            if !limit.is_finite() || limit <= 0.0 {
                return Err(ConfigError::InvalidLengthLimit { value: limit });
            }
        }
        Ok(())
    }
}

/// Errors detected during [`ReplayConfig::validate()`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Gzip levels run from 0 to 9.
    InvalidCompressionLevel {
        /// The rejected level.
        level: u32,
    },
    /// fixed_dt is NaN, infinite, zero, or negative.
    InvalidFixedDt {
        /// The rejected value.
        value: f32,
    },
    /// max_recording_secs is NaN, infinite, zero, or negative.
    InvalidLengthLimit {
        /// The rejected value.
        value: f32,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCompressionLevel { level } => {
                write!(f, "compression_level {level} is outside 0..=9")
            }
            Self::InvalidFixedDt { value } => {
                write!(f, "fixed_dt must be finite and positive, got {value}")
            }
            Self::InvalidLengthLimit { value } => {
                write!(
                    f,
                    "max_recording_secs must be finite and positive, got {value}"
                )
            }
        }
    }
}

impl Error for ConfigError {}
