//! Retrace: deterministic record and playback for fixed-step simulations.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the Retrace sub-crates. For most users, adding `retrace` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use retrace::prelude::*;
//!
//! let mut session = ReplaySession::new(ReplayConfig::default()).unwrap();
//! let car = session.register_static();
//! let spec = ReplayableSpec::new()
//!     .with_channel(
//!         ChannelDescriptor::new("position", DataType::Quant16, 3).with_quantise_scale(100),
//!     )
//!     .with_event_channel("horn");
//!
//! // Record three frames.
//! session.record();
//! let bound = Replayable::attach(&mut session, car, &spec);
//! for frame in 0..3 {
//!     let x = frame as f32 * 1.5;
//!     session.write(bound.writer("position").unwrap(), &[x, 0.0, 0.0]);
//!     if frame == 1 {
//!         session.signal(bound.event_writer("horn").unwrap());
//!     }
//!     session.advance_frame();
//! }
//! bound.detach(&mut session);
//! let blob = session.serialize().unwrap();
//!
//! // Play them back.
//! session.playback(&blob).unwrap();
//! let bound = Replayable::attach(&mut session, car, &spec);
//! let mut honked = Vec::new();
//! for frame in 0..3 {
//!     let pos = session.read(bound.reader("position").unwrap()).unwrap();
//!     assert_eq!(pos[0], frame as f32 * 1.5);
//!     if session.try_read_signal(bound.event_reader("horn").unwrap()) {
//!         honked.push(frame);
//!     }
//!     session.advance_frame();
//! }
//! assert_eq!(honked, vec![1]);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `retrace-core` | Ids, modes, channel descriptors |
//! | [`replay`] | `retrace-replay` | Codecs, channels, session store, coordinator, bindings |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Ids, modes and channel descriptors (`retrace-core`).
pub use retrace_core as types;

/// Recording, serialization and playback (`retrace-replay`).
///
/// Start with [`replay::ReplaySession`] and bind entities with
/// [`replay::Replayable`].
pub use retrace_replay as replay;

/// Common imports for typical Retrace usage.
///
/// ```rust
/// use retrace::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use retrace_core::{
        BehaviourRole, ChannelDescriptor, DataType, EntityId, FrameId, Interpolation,
        SimulationMode,
    };

    // Session and bindings
    pub use retrace_replay::{
        ReplayConfig, ReplaySession, Replayable, ReplayableSpec, SessionStore, StoreMetrics,
    };

    // Events
    pub use retrace_replay::EventPayload;

    // Errors
    pub use retrace_replay::{ConfigError, ReplayError};
}
