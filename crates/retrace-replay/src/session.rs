//! The replay coordinator: mode, frame counter and session lifetime.
//!
//! A [`ReplaySession`] owns the [`SessionStore`] for the current session
//! and hands out handles to its channels. Starting a new session
//! ([`record`](ReplaySession::record), [`playback`](ReplaySession::playback)
//! or [`stop`](ReplaySession::stop)) bumps the session generation, which
//! invalidates every handle from the previous one.

use indexmap::IndexSet;
use tracing::{debug, info, warn};

use retrace_core::{
    ChannelDescriptor, EntityId, FrameId, SessionGeneration, SimulationMode,
};

use crate::channel::{Channel, Sample};
use crate::config::{ConfigError, ReplayConfig};
use crate::error::ReplayError;
use crate::event::{EventChannel, EventPayload};
use crate::handle::{ChannelReader, ChannelWriter, EventReader, EventWriter};
use crate::store::{SessionStore, StoreMetrics};

/// Central replay state shared by every replayable entity.
///
/// # Examples
///
/// ```
/// use retrace_core::{ChannelDescriptor, DataType, SimulationMode};
/// use retrace_replay::{ReplayConfig, ReplaySession};
///
/// let mut session = ReplaySession::new(ReplayConfig::default()).unwrap();
/// let player = session.register_static();
/// let position = ChannelDescriptor::new("position", DataType::Float32, 3);
///
/// session.record();
/// session.attach_entity(player);
/// let writer = session.open_writer(player, &position);
/// for step in 0..10 {
///     session.write(&writer, &[step as f32, 0.0, 0.0]);
///     session.advance_frame();
/// }
/// let blob = session.serialize().unwrap();
///
/// session.playback(&blob).unwrap();
/// assert_eq!(session.mode(), SimulationMode::Playback);
/// session.attach_entity(player);
/// let reader = session.open_reader(player, &position);
/// assert_eq!(session.read(&reader).unwrap().as_slice(), &[0.0, 0.0, 0.0]);
/// ```
#[derive(Debug)]
pub struct ReplaySession {
    config: ReplayConfig,
    mode: SimulationMode,
    generation: SessionGeneration,
    frame: FrameId,
    store: SessionStore,
    next_static: usize,
    attached: IndexSet<EntityId>,
}

impl ReplaySession {
    /// A session in [`SimulationMode::Off`].
    pub fn new(config: ReplayConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            mode: SimulationMode::Off,
            generation: SessionGeneration::default(),
            frame: FrameId::default(),
            store: SessionStore::new(),
            next_static: 0,
            attached: IndexSet::new(),
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Current mode.
    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    /// Current session generation.
    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }

    /// Current fixed frame.
    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Channels of the current session.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// Size summary of the current session.
    pub fn metrics(&self) -> StoreMetrics {
        self.store.metrics()
    }

    /// Whether `entity` is currently attached.
    pub fn is_attached(&self, entity: EntityId) -> bool {
        self.attached.contains(&entity)
    }

    /// Hand out the next static id: `-1`, `-2`, `-3`, ...
    ///
    /// Call in the same order when setting up the scene for recording and
    /// for playback. The sequence is not reset by starting a session.
    pub fn register_static(&mut self) -> EntityId {
        let id = EntityId::scene(self.next_static);
        self.next_static += 1;
        id
    }

    fn begin(&mut self, mode: SimulationMode, store: SessionStore) {
        self.mode = mode;
        self.generation = SessionGeneration(self.generation.0 + 1);
        self.frame = FrameId::default();
        self.store = store;
        self.attached.clear();
    }

    /// Start a fresh recording, discarding the current session.
    pub fn record(&mut self) {
        self.begin(SimulationMode::Record, SessionStore::new());
        info!(generation = %self.generation, "replay recording started");
    }

    /// Load a serialized session and start playing it back.
    ///
    /// On error the current session is left untouched.
    pub fn playback(&mut self, blob: &str) -> Result<(), ReplayError> {
        let store = SessionStore::deserialize(blob)?;
        self.playback_store(store);
        Ok(())
    }

    /// Start playing back an in-memory store, e.g. the one returned by
    /// [`stop`](Self::stop).
    pub fn playback_store(&mut self, mut store: SessionStore) {
        store.rewind();
        let metrics = store.metrics();
        self.begin(SimulationMode::Playback, store);
        info!(
            generation = %self.generation,
            entities = metrics.entity_count,
            channels = metrics.channel_count,
            event_channels = metrics.event_channel_count,
            "replay playback started"
        );
    }

    /// End the current session and return its store with every channel
    /// finished.
    pub fn stop(&mut self) -> SessionStore {
        let mut store = std::mem::take(&mut self.store);
        store.finish_all();
        let (previous, frames) = (self.mode, self.frame);
        self.begin(SimulationMode::Off, SessionStore::new());
        info!(previous = %previous, frames = frames.0, "replay session stopped");
        store
    }

    /// Advance the fixed frame counter and return the new frame.
    pub fn advance_frame(&mut self) -> FrameId {
        self.frame = self.frame.next();
        self.frame
    }

    /// Simulated time covered by the current session.
    pub fn elapsed_secs(&self) -> f32 {
        self.frame.0 as f32 * self.config.fixed_dt
    }

    /// Whether the session is short enough to be accepted for upload.
    pub fn within_length_limit(&self) -> bool {
        self.config
            .max_recording_secs
            .map_or(true, |limit| self.elapsed_secs() <= limit)
    }

    /// Finish every channel and render the session document.
    pub fn serialize(&mut self) -> Result<String, ReplayError> {
        let text = self.store.serialize(&self.config)?;
        let metrics = self.store.metrics();
        info!(
            entities = metrics.entity_count,
            channel_bytes = metrics.channel_bytes,
            event_bytes = metrics.event_bytes,
            document_bytes = text.len(),
            "replay session serialized"
        );
        Ok(text)
    }

    // ── Entity registration ─────────────────────────────────────

    /// Mark `entity` as live in this session.
    ///
    /// # Panics
    ///
    /// Panics on id 0 or if the entity is already attached.
    pub fn attach_entity(&mut self, entity: EntityId) {
        assert!(entity.is_valid(), "entity id 0 is reserved");
        assert!(
            self.attached.insert(entity),
            "entity {entity} is already attached to this session"
        );
        debug!(%entity, mode = %self.mode, "entity attached");
    }

    /// Mark `entity` as no longer live. Its channels stay in the store.
    pub fn detach_entity(&mut self, entity: EntityId) {
        if self.attached.shift_remove(&entity) {
            debug!(%entity, "entity detached");
        }
    }

    fn assert_attached(&self, entity: EntityId) {
        assert!(
            self.attached.contains(&entity),
            "entity {entity} must be attached before opening channels"
        );
    }

    fn assert_current(&self, generation: SessionGeneration, entity: EntityId) {
        assert_eq!(
            generation, self.generation,
            "handle for entity {entity} belongs to a previous replay session"
        );
    }

    // ── Opening and closing handles ─────────────────────────────

    /// Open a recording channel, creating it on first use.
    ///
    /// An entity that re-registers within the same recording reconnects
    /// to the channel it created earlier.
    ///
    /// # Panics
    ///
    /// Panics outside [`SimulationMode::Record`], if the entity is not
    /// attached, if the descriptor is invalid, or if an existing channel
    /// of that name has an incompatible descriptor.
    pub fn open_writer(&mut self, entity: EntityId, descriptor: &ChannelDescriptor) -> ChannelWriter {
        assert!(
            self.mode.is_recording(),
            "cannot open writer '{}' in {} mode",
            descriptor.name,
            self.mode
        );
        self.assert_attached(entity);
        let index = match self.store.channel_index(entity, &descriptor.name) {
            Some(index) => {
                let existing = self.store.channel_at_mut(entity, index).descriptor();
                assert!(
                    existing.is_compatible_with(descriptor),
                    "entity {entity} re-registered channel '{}' with a different descriptor",
                    descriptor.name
                );
                index
            }
            None => self
                .store
                .add_channel(entity, Channel::for_recording(descriptor.clone())),
        };
        self.store.channel_at_mut(entity, index).attach(entity);
        debug!(%entity, channel = %descriptor.name, "channel writer opened");
        ChannelWriter {
            entity,
            index,
            generation: self.generation,
            stride: descriptor.stride(),
        }
    }

    /// Open a playback channel, or a stub if nothing was recorded under
    /// that name.
    ///
    /// The recorded descriptor always decides how the bytes decode; a
    /// difference in codec, scale, keyframe interval or interpolation is
    /// logged.
    ///
    /// # Panics
    ///
    /// Panics outside [`SimulationMode::Playback`], if the entity is not
    /// attached, or if the recorded stride differs from the declared one.
    pub fn open_reader(&mut self, entity: EntityId, descriptor: &ChannelDescriptor) -> ChannelReader {
        assert!(
            self.mode.is_playback(),
            "cannot open reader '{}' in {} mode",
            descriptor.name,
            self.mode
        );
        self.assert_attached(entity);
        let Some(index) = self.store.channel_index(entity, &descriptor.name) else {
            warn!(%entity, channel = %descriptor.name, "no recorded channel, using stub");
            return ChannelReader {
                entity,
                slot: None,
                generation: self.generation,
                stride: descriptor.stride(),
            };
        };
        let channel = self.store.channel_at_mut(entity, index);
        assert_eq!(
            channel.descriptor().stride(),
            descriptor.stride(),
            "entity {entity}: channel '{}' was recorded with a different stride",
            descriptor.name
        );
        if !channel.descriptor().is_compatible_with(descriptor) {
            warn!(
                %entity,
                channel = %descriptor.name,
                recorded = ?channel.descriptor(),
                declared = ?descriptor,
                "recorded descriptor differs from declared one, decoding as recorded"
            );
        }
        channel.attach(entity);
        let stride = channel.descriptor().stride();
        debug!(%entity, channel = %descriptor.name, "channel reader opened");
        ChannelReader {
            entity,
            slot: Some(index),
            generation: self.generation,
            stride,
        }
    }

    /// Open a recording event channel, creating it on first use.
    ///
    /// # Panics
    ///
    /// Panics outside [`SimulationMode::Record`] or if the entity is not
    /// attached.
    pub fn open_event_writer(&mut self, entity: EntityId, name: &str) -> EventWriter {
        assert!(
            self.mode.is_recording(),
            "cannot open event writer '{name}' in {} mode",
            self.mode
        );
        self.assert_attached(entity);
        let index = match self.store.event_channel_index(entity, name) {
            Some(index) => index,
            None => self
                .store
                .add_event_channel(entity, EventChannel::for_recording(name)),
        };
        self.store.event_channel_at_mut(entity, index).attach(entity);
        debug!(%entity, event_channel = name, "event writer opened");
        EventWriter {
            entity,
            index,
            generation: self.generation,
        }
    }

    /// Open a playback event channel, or a stub if nothing was recorded
    /// under that name.
    ///
    /// # Panics
    ///
    /// Panics outside [`SimulationMode::Playback`] or if the entity is not
    /// attached.
    pub fn open_event_reader(&mut self, entity: EntityId, name: &str) -> EventReader {
        assert!(
            self.mode.is_playback(),
            "cannot open event reader '{name}' in {} mode",
            self.mode
        );
        self.assert_attached(entity);
        let slot = self.store.event_channel_index(entity, name);
        match slot {
            Some(index) => {
                self.store.event_channel_at_mut(entity, index).attach(entity);
                debug!(%entity, event_channel = name, "event reader opened");
            }
            None => warn!(%entity, event_channel = name, "no recorded event channel, using stub"),
        }
        EventReader {
            entity,
            slot,
            generation: self.generation,
        }
    }

    /// Release a writer. Handles from a previous session are ignored.
    pub fn close_writer(&mut self, writer: ChannelWriter) {
        if writer.generation == self.generation {
            self.store.channel_at_mut(writer.entity, writer.index).detach();
        }
    }

    /// Release a reader. Stubs and handles from a previous session are
    /// ignored.
    pub fn close_reader(&mut self, reader: ChannelReader) {
        if let (Some(index), true) = (reader.slot, reader.generation == self.generation) {
            self.store.channel_at_mut(reader.entity, index).detach();
        }
    }

    /// Release an event writer. Handles from a previous session are
    /// ignored.
    pub fn close_event_writer(&mut self, writer: EventWriter) {
        if writer.generation == self.generation {
            self.store
                .event_channel_at_mut(writer.entity, writer.index)
                .detach();
        }
    }

    /// Release an event reader. Stubs and handles from a previous session
    /// are ignored.
    pub fn close_event_reader(&mut self, reader: EventReader) {
        if let (Some(index), true) = (reader.slot, reader.generation == self.generation) {
            self.store.event_channel_at_mut(reader.entity, index).detach();
        }
    }

    // ── Per-frame access ────────────────────────────────────────

    /// Record one sample.
    ///
    /// # Panics
    ///
    /// Panics on a stale handle or a stride mismatch.
    pub fn write(&mut self, writer: &ChannelWriter, sample: &[f32]) {
        self.assert_current(writer.generation, writer.entity);
        self.store
            .channel_at_mut(writer.entity, writer.index)
            .write(sample);
    }

    /// Flush the channel's trailing sample now rather than at
    /// serialization. Further writes to it panic.
    pub fn finish(&mut self, writer: &ChannelWriter) {
        self.assert_current(writer.generation, writer.entity);
        self.store
            .channel_at_mut(writer.entity, writer.index)
            .finish();
    }

    /// Reconstruct the next sample into `out`. `false` for stubs and
    /// channels that recorded nothing.
    ///
    /// # Panics
    ///
    /// Panics on a stale handle or a stride mismatch.
    pub fn read_into(&mut self, reader: &ChannelReader, out: &mut [f32]) -> bool {
        self.assert_current(reader.generation, reader.entity);
        match reader.slot {
            Some(index) => self.store.channel_at_mut(reader.entity, index).read_into(out),
            None => false,
        }
    }

    /// Allocating form of [`read_into`](Self::read_into).
    pub fn read(&mut self, reader: &ChannelReader) -> Option<Sample> {
        self.assert_current(reader.generation, reader.entity);
        let index = reader.slot?;
        self.store.channel_at_mut(reader.entity, index).read()
    }

    /// Record an event on the current frame.
    pub fn emit<P: EventPayload>(&mut self, writer: &EventWriter, payload: &P) {
        self.assert_current(writer.generation, writer.entity);
        let frame = self.frame;
        self.store
            .event_channel_at_mut(writer.entity, writer.index)
            .write(frame, payload);
    }

    /// Record a payload-less event on the current frame.
    pub fn signal(&mut self, writer: &EventWriter) {
        self.emit(writer, &());
    }

    /// Consume the next event if it was recorded on the current frame.
    ///
    /// # Panics
    ///
    /// Panics if an event from an earlier frame is still pending: event
    /// readers must be polled every frame.
    pub fn try_read_event<P: EventPayload>(&mut self, reader: &EventReader) -> Option<P> {
        self.assert_current(reader.generation, reader.entity);
        let index = reader.slot?;
        let now = self.frame;
        self.store
            .event_channel_at_mut(reader.entity, index)
            .try_read(now)
    }

    /// Consume the next payload-less event if it was recorded on the
    /// current frame.
    pub fn try_read_signal(&mut self, reader: &EventReader) -> bool {
        self.try_read_event::<()>(reader).is_some()
    }
}
