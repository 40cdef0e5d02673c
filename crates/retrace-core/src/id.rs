//! Strongly-typed identifiers for entities, frames, and sessions.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a replayable entity within a session.
///
/// Statically placed entities receive small negative identifiers in
/// scene-configuration order (see [`EntityId::scene`]); dynamically
/// spawned entities carry positive identifiers supplied by the caller.
/// `EntityId(0)` is reserved and never valid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub i32);

impl EntityId {
    /// Identifier of the `index`-th statically configured entity.
    ///
    /// Index 0 maps to `-1`, index 1 to `-2`, and so on.
    ///
    /// # Panics
    ///
    /// Panics if `index` does not fit the negative identifier range.
    pub fn scene(index: usize) -> Self {
        match i32::try_from(index).ok().and_then(|i| i.checked_add(1)) {
            Some(n) => Self(-n),
            None => panic!("scene entity index {index} exceeds i32 range"),
        }
    }

    /// Whether this identifier belongs to a statically configured entity.
    pub fn is_static(self) -> bool {
        self.0 < 0
    }

    /// Whether this identifier belongs to a dynamically spawned entity.
    pub fn is_dynamic(self) -> bool {
        self.0 > 0
    }

    /// Whether this identifier is usable at all (non-zero).
    pub fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for EntityId {
    fn from(v: i32) -> Self {
        Self(v)
    }
}

/// Fixed-step frame counter.
///
/// Incremented exactly once per fixed simulation step. This is the only
/// clock event channels are keyed on, and it is stored on the wire as a
/// little-endian `u32`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u32);

impl FrameId {
    /// The frame after this one.
    ///
    /// # Panics
    ///
    /// Panics if the counter would overflow `u32`.
    pub fn next(self) -> Self {
        Self(self.0.checked_add(1).expect("frame counter overflowed u32"))
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FrameId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Tracks which record/playback session a handle was opened in.
///
/// Incremented each time a new session starts, so handles left over from
/// a previous session can be detected instead of silently addressing the
/// wrong channel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionGeneration(pub u64);

impl fmt::Display for SessionGeneration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
