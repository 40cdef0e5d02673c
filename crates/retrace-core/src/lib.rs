//! Core types for the Retrace replay engine.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by the rest of the workspace: entity and frame
//! identifiers, the simulation mode, and channel descriptors.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod descriptor;
pub mod error;
pub mod id;
pub mod mode;

pub use descriptor::{ChannelDescriptor, DataType, Interpolation};
pub use error::DescriptorError;
pub use id::{EntityId, FrameId, SessionGeneration};
pub use mode::{BehaviourRole, SimulationMode};
