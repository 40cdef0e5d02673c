//! Session-scoped handles to channels and event channels.
//!
//! Handles are opened and closed through
//! [`ReplaySession`](crate::session::ReplaySession) and are only valid for
//! the session generation they were opened in. They are deliberately not
//! `Clone`: one open handle per channel.

use retrace_core::{EntityId, SessionGeneration};

/// Write access to one recording channel.
#[derive(Debug, PartialEq, Eq)]
pub struct ChannelWriter {
    pub(crate) entity: EntityId,
    pub(crate) index: usize,
    pub(crate) generation: SessionGeneration,
    pub(crate) stride: usize,
}

impl ChannelWriter {
    /// Owning entity.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Values per sample.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Session generation this handle belongs to.
    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }
}

/// Read access to one playback channel, or a stub when nothing was
/// recorded under the requested name.
#[derive(Debug, PartialEq, Eq)]
pub struct ChannelReader {
    pub(crate) entity: EntityId,
    pub(crate) slot: Option<usize>,
    pub(crate) generation: SessionGeneration,
    pub(crate) stride: usize,
}

impl ChannelReader {
    /// Owning entity.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Values per sample.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Whether this reader stands in for a missing channel. Stubs never
    /// yield a sample.
    pub fn is_stub(&self) -> bool {
        self.slot.is_none()
    }

    /// Session generation this handle belongs to.
    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }
}

/// Write access to one recording event channel.
#[derive(Debug, PartialEq, Eq)]
pub struct EventWriter {
    pub(crate) entity: EntityId,
    pub(crate) index: usize,
    pub(crate) generation: SessionGeneration,
}

impl EventWriter {
    /// Owning entity.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Session generation this handle belongs to.
    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }
}

/// Read access to one playback event channel, or a stub.
#[derive(Debug, PartialEq, Eq)]
pub struct EventReader {
    pub(crate) entity: EntityId,
    pub(crate) slot: Option<usize>,
    pub(crate) generation: SessionGeneration,
}

impl EventReader {
    /// Owning entity.
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Whether this reader stands in for a missing event channel.
    pub fn is_stub(&self) -> bool {
        self.slot.is_none()
    }

    /// Session generation this handle belongs to.
    pub fn generation(&self) -> SessionGeneration {
        self.generation
    }
}
