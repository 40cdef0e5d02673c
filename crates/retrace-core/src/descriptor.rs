//! Channel descriptors: the immutable shape of a recorded channel.
//!
//! A descriptor travels inside the serialized session document next to
//! the channel bytes, so a recording can be decoded without any external
//! schema.

use serde::{Deserialize, Serialize};

use crate::error::DescriptorError;

/// How channel values are encoded on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Raw IEEE-754 single precision, 4 bytes per value, lossless.
    Float32,
    /// `round(value * scale)` as a signed 16-bit integer.
    Quant16,
    /// Scaled integer in a tagged 1-4 byte variable-length encoding.
    QuantAuto,
    /// Like [`QuantAuto`](Self::QuantAuto), but encodes the difference
    /// from the previous quantised value of the same component.
    QuantDelta,
}

impl DataType {
    /// Whether this type uses the quantise scale.
    pub fn is_quantised(self) -> bool {
        !matches!(self, Self::Float32)
    }
}

/// How values between keyframes are reconstructed during playback.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interpolation {
    /// Straight-line blend between the bracketing keyframes.
    #[default]
    Linear,
    /// Shortest-arc blend of angles in degrees.
    ///
    /// Also makes the variable-length codecs wrap values into
    /// (-180, 180] before quantising.
    Angular,
    /// Step function: hold the earlier keyframe until the next arrives.
    None,
}

/// Immutable description of one named channel on one entity.
///
/// # Examples
///
/// ```
/// use retrace_core::{ChannelDescriptor, DataType, Interpolation};
///
/// let position = ChannelDescriptor::new("position", DataType::Quant16, 3)
///     .with_quantise_scale(100)
///     .with_keyframe_interval(4);
///
/// assert_eq!(position.stride, 3);
/// assert_eq!(position.interpolation, Interpolation::Linear);
/// assert!(position.validate().is_ok());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelDescriptor {
    /// Channel name, unique per entity.
    pub name: String,
    /// Wire encoding.
    pub data_type: DataType,
    /// Values per sample (3 for a 3D vector).
    pub stride: u32,
    /// Quantisation scale. Ignored by [`DataType::Float32`].
    pub quantise_scale: i32,
    /// 0 commits every sample; `N > 0` commits one keyframe every `N`
    /// writes and interpolates the rest on playback.
    pub keyframe_interval: u32,
    /// Reconstruction between keyframes.
    pub interpolation: Interpolation,
}

impl ChannelDescriptor {
    /// A descriptor with scale 1, every sample a keyframe, and linear
    /// interpolation.
    pub fn new(name: impl Into<String>, data_type: DataType, stride: u32) -> Self {
        Self {
            name: name.into(),
            data_type,
            stride,
            quantise_scale: 1,
            keyframe_interval: 0,
            interpolation: Interpolation::Linear,
        }
    }

    /// Set the quantisation scale.
    pub fn with_quantise_scale(mut self, scale: i32) -> Self {
        self.quantise_scale = scale;
        self
    }

    /// Set the keyframe interval.
    pub fn with_keyframe_interval(mut self, interval: u32) -> Self {
        self.keyframe_interval = interval;
        self
    }

    /// Set the interpolation method.
    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    /// Stride as a `usize`, for slicing.
    pub fn stride(&self) -> usize {
        self.stride as usize
    }

    /// Number of playback steps covered by one keyframe (at least 1).
    pub fn steps_per_keyframe(&self) -> u32 {
        self.keyframe_interval.max(1)
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.name.is_empty() {
            return Err(DescriptorError::EmptyName);
        }
        if self.stride == 0 {
            return Err(DescriptorError::ZeroStride {
                name: self.name.clone(),
            });
        }
        if self.data_type.is_quantised() && self.quantise_scale <= 0 {
            return Err(DescriptorError::InvalidQuantiseScale {
                name: self.name.clone(),
                scale: self.quantise_scale,
            });
        }
        Ok(())
    }

    /// Whether `other` decodes the same bytes the same way.
    ///
    /// Compares everything except the name.
    pub fn is_compatible_with(&self, other: &ChannelDescriptor) -> bool {
        self.data_type == other.data_type
            && self.stride == other.stride
            && (!self.data_type.is_quantised() || self.quantise_scale == other.quantise_scale)
            && self.keyframe_interval == other.keyframe_interval
            && self.interpolation == other.interpolation
    }
}
