//! Recording fingerprints.
//!
//! FNV-1a over the store's layout and bytes. Two recordings of the same
//! deterministic run produce the same fingerprint; not cryptographically
//! secure.

use retrace_core::{ChannelDescriptor, DataType, Interpolation};

use crate::store::SessionStore;

const FNV_OFFSET: u64 = 0xcbf29ce484222325;
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &b in bytes {
        hash = (hash ^ b as u64).wrapping_mul(FNV_PRIME);
    }
    hash
}

#[inline]
fn fnv1a_u32(hash: u64, v: u32) -> u64 {
    fnv1a_bytes(hash, &v.to_le_bytes())
}

/// Length-prefixed so adjacent names cannot run together.
fn fnv1a_str(hash: u64, s: &str) -> u64 {
    fnv1a_bytes(fnv1a_u32(hash, s.len() as u32), s.as_bytes())
}

fn fnv1a_descriptor(mut hash: u64, d: &ChannelDescriptor) -> u64 {
    let data_type = match d.data_type {
        DataType::Float32 => 0,
        DataType::Quant16 => 1,
        DataType::QuantAuto => 2,
        DataType::QuantDelta => 3,
    };
    let interpolation = match d.interpolation {
        Interpolation::Linear => 0,
        Interpolation::Angular => 1,
        Interpolation::None => 2,
    };
    hash = fnv1a_str(hash, &d.name);
    hash = fnv1a_u32(hash, data_type);
    hash = fnv1a_u32(hash, d.stride);
    hash = fnv1a_u32(hash, d.quantise_scale as u32);
    hash = fnv1a_u32(hash, d.keyframe_interval);
    fnv1a_u32(hash, interpolation)
}

/// Fingerprint every entity id, descriptor, event channel name and
/// committed byte in `store`, in registration order.
///
/// Samples still pending in an unfinished channel are not included; hash
/// a store returned by `ReplaySession::stop` or loaded from a document.
pub fn session_fingerprint(store: &SessionStore) -> u64 {
    let mut hash = FNV_OFFSET;
    for id in store.entity_ids() {
        hash = fnv1a_u32(hash, id.0 as u32);
        let Some(record) = store.entity(id) else {
            continue;
        };
        hash = fnv1a_u32(hash, record.channels().len() as u32);
        for channel in record.channels() {
            hash = fnv1a_descriptor(hash, channel.descriptor());
            hash = fnv1a_u32(hash, channel.len_bytes() as u32);
            hash = fnv1a_bytes(hash, channel.data());
        }
        hash = fnv1a_u32(hash, record.event_channels().len() as u32);
        for events in record.event_channels() {
            hash = fnv1a_str(hash, events.name());
            hash = fnv1a_u32(hash, events.len_bytes() as u32);
            hash = fnv1a_bytes(hash, events.data());
        }
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use crate::event::EventChannel;
    use retrace_core::{EntityId, FrameId};

    fn store(value: f32) -> SessionStore {
        let mut store = SessionStore::new();
        let mut ch = Channel::for_recording(ChannelDescriptor::new("x", DataType::Float32, 1));
        ch.write(&[value]);
        store.add_channel(EntityId(-1), ch);
        let mut ev = EventChannel::for_recording("e");
        ev.write(FrameId(1), &());
        store.add_event_channel(EntityId(-1), ev);
        store
    }

    #[test]
    fn empty_store_hashes_to_offset() {
        assert_eq!(session_fingerprint(&SessionStore::new()), FNV_OFFSET);
    }

    #[test]
    fn identical_recordings_match() {
        assert_eq!(session_fingerprint(&store(1.0)), session_fingerprint(&store(1.0)));
    }

    #[test]
    fn any_byte_change_differs() {
        assert_ne!(session_fingerprint(&store(1.0)), session_fingerprint(&store(1.5)));
    }

    #[test]
    fn descriptor_change_differs() {
        let mut a = SessionStore::new();
        a.add_channel(
            EntityId(1),
            Channel::for_recording(ChannelDescriptor::new("x", DataType::Float32, 1)),
        );
        let mut b = SessionStore::new();
        b.add_channel(
            EntityId(1),
            Channel::for_recording(
                ChannelDescriptor::new("x", DataType::Float32, 1).with_keyframe_interval(2),
            ),
        );
        assert_ne!(session_fingerprint(&a), session_fingerprint(&b));
    }

    #[test]
    fn survives_serialization() {
        let mut original = store(2.5);
        let text = original.serialize(&crate::config::ReplayConfig::default()).unwrap();
        let loaded = SessionStore::deserialize(&text).unwrap();
        assert_eq!(session_fingerprint(&original), session_fingerprint(&loaded));
    }
}
