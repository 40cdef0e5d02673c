//! Per-entity binding between game objects and the replay session.
//!
//! An entity declares its channels once in a [`ReplayableSpec`]. Attaching
//! a [`Replayable`] opens writers while recording, readers (or stubs)
//! during playback, and nothing when replay is off.

use indexmap::IndexMap;
use tracing::debug;

use retrace_core::{
    BehaviourRole, ChannelDescriptor, EntityId, SessionGeneration, SimulationMode,
};

use crate::handle::{ChannelReader, ChannelWriter, EventReader, EventWriter};
use crate::session::ReplaySession;

/// The channels an entity records and replays.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReplayableSpec {
    /// Continuous channels.
    pub channels: Vec<ChannelDescriptor>,
    /// Event channel names.
    pub event_channels: Vec<String>,
}

impl ReplayableSpec {
    /// A spec with no channels.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a continuous channel.
    pub fn with_channel(mut self, descriptor: ChannelDescriptor) -> Self {
        self.channels.push(descriptor);
        self
    }

    /// Add an event channel.
    pub fn with_event_channel(mut self, name: impl Into<String>) -> Self {
        self.event_channels.push(name.into());
        self
    }
}

/// One entity's live connection to a [`ReplaySession`].
///
/// Holds the handles for every channel in its spec, keyed by name. Call
/// [`detach`](Self::detach) when the entity is destroyed.
#[derive(Debug)]
pub struct Replayable {
    entity: EntityId,
    mode: SimulationMode,
    generation: SessionGeneration,
    writers: IndexMap<String, ChannelWriter>,
    readers: IndexMap<String, ChannelReader>,
    event_writers: IndexMap<String, EventWriter>,
    event_readers: IndexMap<String, EventReader>,
}

impl Replayable {
    /// Attach `entity` to the session and open its channels for the
    /// session's mode.
    ///
    /// # Panics
    ///
    /// Panics if the entity is already attached or its id is 0.
    pub fn attach(session: &mut ReplaySession, entity: EntityId, spec: &ReplayableSpec) -> Self {
        session.attach_entity(entity);
        let mode = session.mode();
        let mut bound = Self {
            entity,
            mode,
            generation: session.generation(),
            writers: IndexMap::new(),
            readers: IndexMap::new(),
            event_writers: IndexMap::new(),
            event_readers: IndexMap::new(),
        };
        match mode {
            SimulationMode::Record => {
                for d in &spec.channels {
                    bound.writers.insert(d.name.clone(), session.open_writer(entity, d));
                }
                for name in &spec.event_channels {
                    bound
                        .event_writers
                        .insert(name.clone(), session.open_event_writer(entity, name));
                }
            }
            SimulationMode::Playback => {
                for d in &spec.channels {
                    bound.readers.insert(d.name.clone(), session.open_reader(entity, d));
                }
                for name in &spec.event_channels {
                    bound
                        .event_readers
                        .insert(name.clone(), session.open_event_reader(entity, name));
                }
            }
            SimulationMode::Off => {}
        }
        debug!(
            %entity,
            %mode,
            channels = spec.channels.len(),
            event_channels = spec.event_channels.len(),
            "replayable attached"
        );
        bound
    }

    /// Release every handle and mark the entity as gone.
    ///
    /// A binding from an earlier session is simply dropped.
    pub fn detach(self, session: &mut ReplaySession) {
        if self.generation != session.generation() {
            return;
        }
        for (_, w) in self.writers {
            session.close_writer(w);
        }
        for (_, r) in self.readers {
            session.close_reader(r);
        }
        for (_, w) in self.event_writers {
            session.close_event_writer(w);
        }
        for (_, r) in self.event_readers {
            session.close_event_reader(r);
        }
        session.detach_entity(self.entity);
    }

    /// The bound entity.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Mode at attach time.
    pub fn mode(&self) -> SimulationMode {
        self.mode
    }

    /// Whether the entity's state is being captured.
    pub fn should_record(&self) -> bool {
        self.mode.is_recording()
    }

    /// Whether the entity should run its own simulation (Off or Record).
    pub fn drives_simulation(&self) -> bool {
        self.mode.drives_simulation()
    }

    /// Whether the entity should take its state from the recording.
    pub fn should_playback(&self) -> bool {
        self.mode.is_playback()
    }

    /// Writer for a declared channel (Record mode only).
    pub fn writer(&self, name: &str) -> Option<&ChannelWriter> {
        self.writers.get(name)
    }

    /// Reader for a declared channel (Playback mode only).
    pub fn reader(&self, name: &str) -> Option<&ChannelReader> {
        self.readers.get(name)
    }

    /// Writer for a declared event channel (Record mode only).
    pub fn event_writer(&self, name: &str) -> Option<&EventWriter> {
        self.event_writers.get(name)
    }

    /// Reader for a declared event channel (Playback mode only).
    pub fn event_reader(&self, name: &str) -> Option<&EventReader> {
        self.event_readers.get(name)
    }

    /// Build an optional sub-behaviour only if `role` is active in this
    /// binding's mode.
    pub fn construct_if<T>(&self, role: BehaviourRole, build: impl FnOnce() -> T) -> Option<T> {
        role.is_active(self.mode).then(build)
    }
}
