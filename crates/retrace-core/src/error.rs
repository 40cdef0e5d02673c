//! Error types for descriptor validation.

use std::error::Error;
use std::fmt;

/// Errors detected by [`ChannelDescriptor::validate()`](crate::ChannelDescriptor::validate).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DescriptorError {
    /// The channel name is empty.
    EmptyName,
    /// Stride must be at least 1.
    ZeroStride {
        /// Name of the offending channel.
        name: String,
    },
    /// A quantised data type was given a scale of zero or less.
    InvalidQuantiseScale {
        /// Name of the offending channel.
        name: String,
        /// The scale that was rejected.
        scale: i32,
    },
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => write!(f, "channel name must not be empty"),
            Self::ZeroStride { name } => {
                write!(f, "channel '{name}' has stride 0 (must be at least 1)")
            }
            Self::InvalidQuantiseScale { name, scale } => {
                write!(
                    f,
                    "channel '{name}' has quantise scale {scale} (must be positive)"
                )
            }
        }
    }
}

impl Error for DescriptorError {}
