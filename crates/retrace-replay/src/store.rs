//! Per-session storage of every entity's channels.

use std::fmt;

use indexmap::map::Entry;
use indexmap::IndexMap;

use retrace_core::EntityId;

use crate::channel::Channel;
use crate::config::ReplayConfig;
use crate::document::{
    pack, unpack, ChannelDocument, EntityDocument, EventChannelDocument, SessionDocument,
    FORMAT_VERSION,
};
use crate::error::ReplayError;
use crate::event::EventChannel;

/// The channels and event channels owned by one entity.
#[derive(Clone, Debug, Default)]
pub struct EntityRecord {
    channels: Vec<Channel>,
    event_channels: Vec<EventChannel>,
}

impl EntityRecord {
    /// Continuous channels in registration order.
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Event channels in registration order.
    pub fn event_channels(&self) -> &[EventChannel] {
        &self.event_channels
    }

    /// Look up a channel by name.
    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name() == name)
    }

    /// Look up an event channel by name.
    pub fn event_channel(&self, name: &str) -> Option<&EventChannel> {
        self.event_channels.iter().find(|c| c.name() == name)
    }
}

/// Size summary of a store.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    /// Entities with at least one registration.
    pub entity_count: usize,
    /// Continuous channels across all entities.
    pub channel_count: usize,
    /// Event channels across all entities.
    pub event_channel_count: usize,
    /// Raw bytes held by continuous channels.
    pub channel_bytes: usize,
    /// Raw bytes held by event channels.
    pub event_bytes: usize,
}

impl StoreMetrics {
    /// Raw bytes held by all channels.
    pub fn total_bytes(&self) -> usize {
        self.channel_bytes + self.event_bytes
    }
}

impl fmt::Display for StoreMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "entities: {}, channels: {} ({} bytes), events: {} ({} bytes), size: {:.2} KiB",
            self.entity_count,
            self.channel_count,
            self.channel_bytes,
            self.event_channel_count,
            self.event_bytes,
            self.total_bytes() as f64 / 1024.0
        )
    }
}

/// Every channel recorded or loaded for one session, keyed by entity.
///
/// Entities keep their registration order, which is also the order they
/// appear in the serialized document.
#[derive(Clone, Debug, Default)]
pub struct SessionStore {
    entities: IndexMap<EntityId, EntityRecord>,
}

impl SessionStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every channel.
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Whether no entity has registered anything.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Number of entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Entity ids in registration order.
    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// One entity's channels.
    pub fn entity(&self, entity: EntityId) -> Option<&EntityRecord> {
        self.entities.get(&entity)
    }

    /// Register a channel and return its index within the entity.
    ///
    /// # Panics
    ///
    /// Panics if the entity already has a channel with the same name.
    pub fn add_channel(&mut self, entity: EntityId, channel: Channel) -> usize {
        let record = self.entities.entry(entity).or_default();
        assert!(
            record.channel(channel.name()).is_none(),
            "entity {entity} already has a channel named '{}'",
            channel.name()
        );
        record.channels.push(channel);
        record.channels.len() - 1
    }

    /// Register an event channel and return its index within the entity.
    ///
    /// # Panics
    ///
    /// Panics if the entity already has an event channel with the same name.
    pub fn add_event_channel(&mut self, entity: EntityId, channel: EventChannel) -> usize {
        let record = self.entities.entry(entity).or_default();
        assert!(
            record.event_channel(channel.name()).is_none(),
            "entity {entity} already has an event channel named '{}'",
            channel.name()
        );
        record.event_channels.push(channel);
        record.event_channels.len() - 1
    }

    /// Look up a channel; `None` if nothing was recorded under that name.
    pub fn try_get_channel(&self, entity: EntityId, name: &str) -> Option<&Channel> {
        self.entities.get(&entity)?.channel(name)
    }

    /// Look up an event channel; `None` if nothing was recorded under
    /// that name.
    pub fn try_get_event_channel(&self, entity: EntityId, name: &str) -> Option<&EventChannel> {
        self.entities.get(&entity)?.event_channel(name)
    }

    pub(crate) fn channel_index(&self, entity: EntityId, name: &str) -> Option<usize> {
        self.entities
            .get(&entity)?
            .channels
            .iter()
            .position(|c| c.name() == name)
    }

    pub(crate) fn event_channel_index(&self, entity: EntityId, name: &str) -> Option<usize> {
        self.entities
            .get(&entity)?
            .event_channels
            .iter()
            .position(|c| c.name() == name)
    }

    pub(crate) fn channel_at_mut(&mut self, entity: EntityId, index: usize) -> &mut Channel {
        match self.entities.get_mut(&entity) {
            Some(record) => &mut record.channels[index],
            None => panic!("entity {entity} has no channels in this session"),
        }
    }

    pub(crate) fn event_channel_at_mut(&mut self, entity: EntityId, index: usize) -> &mut EventChannel {
        match self.entities.get_mut(&entity) {
            Some(record) => &mut record.event_channels[index],
            None => panic!("entity {entity} has no event channels in this session"),
        }
    }

    /// Flush every channel's trailing sample.
    pub fn finish_all(&mut self) {
        for record in self.entities.values_mut() {
            for channel in &mut record.channels {
                channel.finish();
            }
        }
    }

    /// Finish recording and turn every channel into a read port at its
    /// start, so the store can be played back without a save/load trip.
    pub fn rewind(&mut self) {
        for record in self.entities.values_mut() {
            for channel in &mut record.channels {
                channel.rewind();
                channel.detach();
            }
            for channel in &mut record.event_channels {
                channel.rewind();
                channel.detach();
            }
        }
    }

    /// Size summary.
    pub fn metrics(&self) -> StoreMetrics {
        let mut metrics = StoreMetrics {
            entity_count: self.entities.len(),
            ..StoreMetrics::default()
        };
        for record in self.entities.values() {
            metrics.channel_count += record.channels.len();
            metrics.event_channel_count += record.event_channels.len();
            metrics.channel_bytes += record.channels.iter().map(Channel::len_bytes).sum::<usize>();
            metrics.event_bytes += record
                .event_channels
                .iter()
                .map(EventChannel::len_bytes)
                .sum::<usize>();
        }
        metrics
    }

    /// Finish every channel and render the store as a session document.
    pub fn serialize(&mut self, config: &ReplayConfig) -> Result<String, ReplayError> {
        self.finish_all();
        let mut entities = Vec::with_capacity(self.entities.len());
        for (&id, record) in &self.entities {
            let channels = record
                .channels
                .iter()
                .map(|c| {
                    Ok(ChannelDocument {
                        descriptor: c.descriptor().clone(),
                        data: pack(c.data(), config.compression_level)?,
                    })
                })
                .collect::<Result<Vec<_>, ReplayError>>()?;
            let event_channels = record
                .event_channels
                .iter()
                .map(|c| {
                    Ok(EventChannelDocument {
                        name: c.name().to_owned(),
                        data: pack(c.data(), config.compression_level)?,
                    })
                })
                .collect::<Result<Vec<_>, ReplayError>>()?;
            entities.push(EntityDocument {
                id,
                channels,
                event_channels,
            });
        }
        let document = SessionDocument {
            version: FORMAT_VERSION,
            entities,
        };
        let text = if config.pretty_json {
            serde_json::to_string_pretty(&document)?
        } else {
            serde_json::to_string(&document)?
        };
        Ok(text)
    }

    /// Load a session document into a store of read ports.
    pub fn deserialize(text: &str) -> Result<Self, ReplayError> {
        let document: SessionDocument = serde_json::from_str(text)?;
        if document.version != FORMAT_VERSION {
            return Err(ReplayError::UnsupportedVersion {
                found: document.version,
            });
        }

        let mut entities = IndexMap::with_capacity(document.entities.len());
        for entity_doc in document.entities {
            let entity = entity_doc.id;
            if !entity.is_valid() {
                return Err(ReplayError::InvalidEntityId);
            }
            let record = match entities.entry(entity) {
                Entry::Occupied(_) => return Err(ReplayError::DuplicateEntity { entity }),
                Entry::Vacant(slot) => slot.insert(EntityRecord::default()),
            };

            for channel_doc in entity_doc.channels {
                let descriptor = channel_doc.descriptor;
                descriptor
                    .validate()
                    .map_err(|reason| ReplayError::InvalidDescriptor { entity, reason })?;
                if record.channel(&descriptor.name).is_some() {
                    return Err(ReplayError::DuplicateChannel {
                        entity,
                        name: descriptor.name,
                    });
                }
                let data = unpack(&channel_doc.data)?;
                record.channels.push(Channel::from_recorded(descriptor, data));
            }

            for event_doc in entity_doc.event_channels {
                if event_doc.name.is_empty() {
                    return Err(ReplayError::UnnamedEventChannel { entity });
                }
                if record.event_channel(&event_doc.name).is_some() {
                    return Err(ReplayError::DuplicateEventChannel {
                        entity,
                        name: event_doc.name,
                    });
                }
                let data = unpack(&event_doc.data)?;
                record
                    .event_channels
                    .push(EventChannel::from_recorded(event_doc.name, data));
            }
        }
        Ok(Self { entities })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retrace_core::{ChannelDescriptor, DataType, FrameId};

    fn sample_store() -> SessionStore {
        let mut store = SessionStore::new();
        let mut pos = Channel::for_recording(
            ChannelDescriptor::new("position", DataType::Quant16, 3).with_quantise_scale(100),
        );
        for i in 0..10 {
            let t = i as f32 * 0.5;
            pos.write(&[t, -t, 1.0]);
        }
        store.add_channel(EntityId(-1), pos);
        let mut fire = EventChannel::for_recording("fire");
        fire.write(FrameId(3), &7u32);
        store.add_event_channel(EntityId(-1), fire);
        store.add_event_channel(EntityId(4), EventChannel::for_recording("hit"));
        store
    }

    #[test]
    fn metrics_count_everything() {
        let m = sample_store().metrics();
        assert_eq!(m.entity_count, 2);
        assert_eq!(m.channel_count, 1);
        assert_eq!(m.event_channel_count, 2);
        assert_eq!(m.channel_bytes, 60);
        assert_eq!(m.event_bytes, 8);
        assert_eq!(m.total_bytes(), 68);
    }

    #[test]
    fn metrics_display() {
        let m = StoreMetrics {
            entity_count: 2,
            channel_count: 3,
            event_channel_count: 1,
            channel_bytes: 1024,
            event_bytes: 512,
        };
        assert_eq!(
            m.to_string(),
            "entities: 2, channels: 3 (1024 bytes), events: 1 (512 bytes), size: 1.50 KiB"
        );
    }

    #[test]
    fn serialize_roundtrip_preserves_layout_and_bytes() {
        let mut store = sample_store();
        let text = store.serialize(&ReplayConfig::default()).unwrap();
        let loaded = SessionStore::deserialize(&text).unwrap();

        assert_eq!(loaded.entity_ids().collect::<Vec<_>>(), vec![EntityId(-1), EntityId(4)]);
        let original = store.try_get_channel(EntityId(-1), "position").unwrap();
        let copy = loaded.try_get_channel(EntityId(-1), "position").unwrap();
        assert_eq!(copy.descriptor(), original.descriptor());
        assert_eq!(copy.data(), original.data());
        assert!(!copy.is_writable());
        assert_eq!(loaded.metrics(), store.metrics());
    }

    #[test]
    fn pretty_output_loads_the_same() {
        let mut store = sample_store();
        let config = ReplayConfig {
            pretty_json: true,
            ..Default::default()
        };
        let text = store.serialize(&config).unwrap();
        assert!(text.contains('\n'));
        assert_eq!(SessionStore::deserialize(&text).unwrap().metrics(), store.metrics());
    }

    #[test]
    fn missing_lookups_return_none() {
        let store = sample_store();
        assert!(store.try_get_channel(EntityId(-1), "rotation").is_none());
        assert!(store.try_get_channel(EntityId(99), "position").is_none());
        assert!(store.try_get_event_channel(EntityId(4), "fire").is_none());
    }

    #[test]
    #[should_panic(expected = "already has a channel named 'position'")]
    fn duplicate_channel_panics() {
        let mut store = sample_store();
        store.add_channel(
            EntityId(-1),
            Channel::for_recording(ChannelDescriptor::new("position", DataType::Float32, 1)),
        );
    }

    #[test]
    fn rejects_wrong_version() {
        let err = SessionStore::deserialize(r#"{"version":7,"entities":[]}"#).unwrap_err();
        assert!(matches!(err, ReplayError::UnsupportedVersion { found: 7 }));
    }

    #[test]
    fn rejects_entity_zero() {
        let err = SessionStore::deserialize(r#"{"version":1,"entities":[{"id":0}]}"#).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidEntityId));
    }

    #[test]
    fn rejects_duplicate_entity() {
        let err =
            SessionStore::deserialize(r#"{"version":1,"entities":[{"id":3},{"id":3}]}"#).unwrap_err();
        assert!(matches!(err, ReplayError::DuplicateEntity { entity: EntityId(3) }));
    }

    #[test]
    fn rejects_invalid_descriptor() {
        let mut store = SessionStore::new();
        store.add_channel(
            EntityId(1),
            Channel::for_recording(ChannelDescriptor::new("x", DataType::Float32, 1)),
        );
        let text = store
            .serialize(&ReplayConfig::default())
            .unwrap()
            .replace("\"stride\":1", "\"stride\":0");
        let err = SessionStore::deserialize(&text).unwrap_err();
        assert!(matches!(err, ReplayError::InvalidDescriptor { .. }));
    }

    #[test]
    fn rejects_unnamed_event_channel() {
        let text = r#"{"version":1,"entities":[{"id":2,"event_channels":[{"name":"","data":""}]}]}"#;
        let err = SessionStore::deserialize(text).unwrap_err();
        assert!(matches!(err, ReplayError::UnnamedEventChannel { entity: EntityId(2) }));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            SessionStore::deserialize("{not json"),
            Err(ReplayError::Json(_))
        ));
    }
}
