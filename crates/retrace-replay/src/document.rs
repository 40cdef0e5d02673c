//! The portable session document.
//!
//! A session serializes to one JSON text. Each channel's bytes are gzip
//! compressed and base64 encoded individually and stored next to the
//! channel's descriptor (or the event channel's name), so the document
//! decodes with no outside schema:
//!
//! ```text
//! {
//!   "version": 1,
//!   "entities": [
//!     { "id": -1,
//!       "channels":       [ { "descriptor": { ... }, "data": "H4sI..." } ],
//!       "event_channels": [ { "name": "fire", "data": "H4sI..." } ] }
//!   ]
//! }
//! ```

use std::io::{Read, Write};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};

use retrace_core::{ChannelDescriptor, EntityId};

use crate::error::ReplayError;

/// Current document format version.
pub const FORMAT_VERSION: u32 = 1;

/// Top-level document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionDocument {
    /// Format version, see [`FORMAT_VERSION`].
    pub version: u32,
    /// Entities in registration order.
    pub entities: Vec<EntityDocument>,
}

/// One entity's channels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityDocument {
    /// Entity id.
    pub id: EntityId,
    /// Continuous channels.
    #[serde(default)]
    pub channels: Vec<ChannelDocument>,
    /// Event channels.
    #[serde(default)]
    pub event_channels: Vec<EventChannelDocument>,
}

/// One continuous channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelDocument {
    /// How `data` decodes.
    pub descriptor: ChannelDescriptor,
    /// Packed channel bytes.
    pub data: String,
}

/// One event channel.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventChannelDocument {
    /// Event channel name.
    pub name: String,
    /// Packed record bytes.
    pub data: String,
}

/// Gzip then base64 encode.
pub fn pack(bytes: &[u8], level: u32) -> Result<String, ReplayError> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::new(level));
    encoder.write_all(bytes)?;
    let compressed = encoder.finish()?;
    Ok(STANDARD.encode(compressed))
}

/// Base64 decode then gunzip.
pub fn unpack(text: &str) -> Result<Vec<u8>, ReplayError> {
    let compressed = STANDARD.decode(text)?;
    let mut out = Vec::new();
    GzDecoder::new(compressed.as_slice()).read_to_end(&mut out)?;
    Ok(out)
}
