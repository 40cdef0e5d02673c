//! Frame-locked recording and playback for deterministic simulations.
//!
//! Entities record named channels of float samples and sparse events
//! against the fixed frame counter. The whole session serializes to one
//! self-describing JSON document and plays back later, reconstructing
//! values between keyframes and delivering each event on the frame it
//! was recorded on.
//!
//! # Architecture
//!
//! - [`ReplaySession`] owns the mode, the frame counter and the
//!   [`SessionStore`], and hands out channel handles
//! - [`Replayable`] binds one entity's declared channels to a session
//! - [`Channel`] and [`EventChannel`] hold the bytes; [`SampleCodec`]
//!   encodes them
//! - [`session_fingerprint`] and [`compare_channels`] check two
//!   recordings against each other
//!
//! # Format
//!
//! ```text
//! channel bytes:  [sample 0][sample 1]...       each sample = stride values
//! event bytes:    [frame u32][payload]...       frames non-decreasing
//! document:       JSON, per-channel bytes gzip + base64
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod angle;
pub mod binding;
pub mod channel;
pub mod codec;
pub mod compare;
pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod handle;
pub mod hash;
pub mod interp;
pub mod session;
pub mod store;

pub use binding::{Replayable, ReplayableSpec};
pub use channel::{Channel, Sample};
pub use codec::{ByteCursor, SampleCodec};
pub use compare::{compare_channels, ChannelDivergence, DivergenceKind, DivergenceReport};
pub use config::{ConfigError, ReplayConfig};
pub use document::FORMAT_VERSION;
pub use error::{CodecError, ReplayError};
pub use event::{EventChannel, EventPayload};
pub use handle::{ChannelReader, ChannelWriter, EventReader, EventWriter};
pub use hash::session_fingerprint;
pub use interp::Interpolator;
pub use session::ReplaySession;
pub use store::{EntityRecord, SessionStore, StoreMetrics};
