//! Error types for the replay system.
//!
//! Only failures caused by external data are represented here. Contract
//! violations by calling code (stride mismatch, duplicate registration,
//! direction misuse, out-of-order events, unrepresentable quantised
//! values) panic at the call site instead.

use std::fmt;
use std::io;

use retrace_core::{DescriptorError, EntityId};

/// A byte buffer ended in the middle of a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes remained than the value needs.
    Truncated {
        /// Bytes the value needs.
        needed: usize,
        /// Bytes left in the buffer.
        available: usize,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { needed, available } => {
                write!(f, "truncated value: needed {needed} bytes, {available} available")
            }
        }
    }
}

impl std::error::Error for CodecError {}

/// Errors that can occur while saving or loading a session document.
#[derive(Debug)]
pub enum ReplayError {
    /// The document is not valid JSON or does not match the schema.
    Json(serde_json::Error),
    /// A channel payload is not valid base64.
    Base64(base64::DecodeError),
    /// Gzip compression or decompression failed.
    Compression(io::Error),
    /// The document was written by an incompatible format version.
    UnsupportedVersion {
        /// The version found in the document.
        found: u32,
    },
    /// The document uses the reserved entity id 0.
    InvalidEntityId,
    /// The same entity id appears twice in the document.
    DuplicateEntity {
        /// The repeated id.
        entity: EntityId,
    },
    /// A channel descriptor inside the document is invalid.
    InvalidDescriptor {
        /// Entity owning the channel.
        entity: EntityId,
        /// What was wrong with the descriptor.
        reason: DescriptorError,
    },
    /// Two channels on one entity share a name.
    DuplicateChannel {
        /// Entity owning the channels.
        entity: EntityId,
        /// The repeated name.
        name: String,
    },
    /// An event channel inside the document has an empty name.
    UnnamedEventChannel {
        /// Entity owning the event channel.
        entity: EntityId,
    },
    /// Two event channels on one entity share a name.
    DuplicateEventChannel {
        /// Entity owning the event channels.
        entity: EntityId,
        /// The repeated name.
        name: String,
    },
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(e) => write!(f, "malformed session document: {e}"),
            Self::Base64(e) => write!(f, "malformed channel payload: {e}"),
            Self::Compression(e) => write!(f, "compression error: {e}"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported session document version {found}")
            }
            Self::InvalidEntityId => write!(f, "session document uses reserved entity id 0"),
            Self::DuplicateEntity { entity } => {
                write!(f, "entity {entity} appears more than once")
            }
            Self::InvalidDescriptor { entity, reason } => {
                write!(f, "entity {entity}: {reason}")
            }
            Self::DuplicateChannel { entity, name } => {
                write!(f, "entity {entity} has two channels named '{name}'")
            }
            Self::UnnamedEventChannel { entity } => {
                write!(f, "entity {entity} has an event channel with an empty name")
            }
            Self::DuplicateEventChannel { entity, name } => {
                write!(f, "entity {entity} has two event channels named '{name}'")
            }
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Json(e) => Some(e),
            Self::Base64(e) => Some(e),
            Self::Compression(e) => Some(e),
            Self::InvalidDescriptor { reason, .. } => Some(reason),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ReplayError {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

impl From<base64::DecodeError> for ReplayError {
    fn from(e: base64::DecodeError) -> Self {
        Self::Base64(e)
    }
}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        Self::Compression(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn descriptor_errors_chain_as_source() {
        let err = ReplayError::InvalidDescriptor {
            entity: EntityId(-1),
            reason: DescriptorError::EmptyName,
        };
        assert!(err.source().is_some());
        assert_eq!(err.to_string(), "entity -1: channel name must not be empty");
    }

    #[test]
    fn truncated_display() {
        let err = CodecError::Truncated {
            needed: 4,
            available: 1,
        };
        assert_eq!(
            err.to_string(),
            "truncated value: needed 4 bytes, 1 available"
        );
    }
}
