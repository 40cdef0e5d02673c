//! Benchmark profiles for the Retrace replay engine.
//!
//! - [`codec_profiles`]: one 3-component descriptor per data type
//! - [`smooth_path`]: deterministic sample streams
//! - [`populated_store`]: a finished multi-entity recording

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use retrace_core::{ChannelDescriptor, DataType, EntityId, FrameId, Interpolation};
use retrace_replay::{Channel, EventChannel, SessionStore};

/// One position-like descriptor per data type, every sample a keyframe.
pub fn codec_profiles() -> Vec<ChannelDescriptor> {
    vec![
        ChannelDescriptor::new("float32", DataType::Float32, 3),
        ChannelDescriptor::new("quant16", DataType::Quant16, 3).with_quantise_scale(100),
        ChannelDescriptor::new("quant_auto", DataType::QuantAuto, 3).with_quantise_scale(100),
        ChannelDescriptor::new("quant_delta", DataType::QuantDelta, 3).with_quantise_scale(100),
    ]
}

/// `count` samples of a smooth 3D curve staying within +-100.
pub fn smooth_path(count: usize) -> Vec<[f32; 3]> {
    (0..count)
        .map(|i| {
            let t = i as f32 * 0.02;
            [t.sin() * 80.0, (t * 0.5).cos() * 40.0, t % 100.0]
        })
        .collect()
}

/// A finished store with `entities` entities, each recording `frames`
/// frames of position (QuantDelta) and heading (QuantAuto, angular,
/// keyframe every 4th frame), plus an event every 25 frames.
pub fn populated_store(entities: usize, frames: usize) -> SessionStore {
    let path = smooth_path(frames);
    let mut store = SessionStore::new();
    for e in 0..entities {
        let id = EntityId::scene(e);
        let mut position = Channel::for_recording(
            ChannelDescriptor::new("position", DataType::QuantDelta, 3).with_quantise_scale(100),
        );
        let mut heading = Channel::for_recording(
            ChannelDescriptor::new("heading", DataType::QuantAuto, 1)
                .with_quantise_scale(10)
                .with_keyframe_interval(4)
                .with_interpolation(Interpolation::Angular),
        );
        let mut events = EventChannel::for_recording("checkpoint");
        for (frame, p) in path.iter().enumerate() {
            position.write(p);
            heading.write(&[(frame * 3 + e * 10) as f32]);
            if frame % 25 == 0 {
                events.write(FrameId(frame as u32), &(frame as u32));
            }
        }
        store.add_channel(id, position);
        store.add_channel(id, heading);
        store.add_event_channel(id, events);
    }
    store.finish_all();
    store
}
