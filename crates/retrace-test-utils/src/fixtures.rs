//! Reusable descriptors, paths and payloads.

use retrace_core::{ChannelDescriptor, DataType, Interpolation};
use retrace_replay::codec::ByteCursor;
use retrace_replay::{CodecError, EventPayload, ReplayableSpec};

/// 3D position, 16-bit at centimetre precision, every sample a keyframe.
pub fn position_descriptor() -> ChannelDescriptor {
    ChannelDescriptor::new("position", DataType::Quant16, 3).with_quantise_scale(100)
}

/// Heading in degrees, tenth-of-a-degree precision, keyframe every 3rd
/// step with shortest-arc interpolation.
pub fn yaw_descriptor() -> ChannelDescriptor {
    ChannelDescriptor::new("yaw", DataType::QuantAuto, 1)
        .with_quantise_scale(10)
        .with_keyframe_interval(3)
        .with_interpolation(Interpolation::Angular)
}

/// Delta-coded 3D position with a keyframe every 2nd step.
pub fn projectile_descriptor() -> ChannelDescriptor {
    ChannelDescriptor::new("position", DataType::QuantDelta, 3)
        .with_quantise_scale(100)
        .with_keyframe_interval(2)
}

/// Channels of the scripted car.
pub fn car_spec() -> ReplayableSpec {
    ReplayableSpec::new()
        .with_channel(position_descriptor())
        .with_channel(yaw_descriptor())
        .with_event_channel("fire")
}

/// Channels of a scripted projectile.
pub fn projectile_spec() -> ReplayableSpec {
    ReplayableSpec::new().with_channel(projectile_descriptor())
}

/// Point `origin + velocity * t`.
pub fn linear_path(origin: [f32; 3], velocity: [f32; 3], t: f32) -> [f32; 3] {
    [
        origin[0] + velocity[0] * t,
        origin[1] + velocity[1] * t,
        origin[2] + velocity[2] * t,
    ]
}

/// Largest per-component absolute difference.
pub fn max_abs_diff(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f32::max)
}

/// Absolute shortest-arc difference between two headings in degrees.
pub fn angle_diff(a: f32, b: f32) -> f32 {
    retrace_replay::angle::delta_angle(a, b).abs()
}

/// Payload of a projectile launch event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaunchInfo {
    pub origin: [f32; 3],
    pub velocity: [f32; 3],
}

impl EventPayload for LaunchInfo {
    fn encode(&self, buf: &mut Vec<u8>) {
        self.origin.encode(buf);
        self.velocity.encode(buf);
    }

    fn decode(cursor: &mut ByteCursor<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            origin: <[f32; 3]>::decode(cursor)?,
            velocity: <[f32; 3]>::decode(cursor)?,
        })
    }
}
