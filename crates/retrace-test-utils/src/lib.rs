//! Test fixtures and scripted scenes for Retrace development.
//!
//! Provides ready-made channel descriptors, a projectile launch payload
//! implementing [`EventPayload`](retrace_replay::EventPayload), and a
//! [`ScriptedScene`] that records and replays a small deterministic scene
//! end to end.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod scene;

pub use fixtures::{
    angle_diff, car_spec, linear_path, max_abs_diff, position_descriptor, projectile_descriptor,
    projectile_spec, yaw_descriptor, LaunchInfo,
};
pub use scene::{SceneScript, SceneTrace, ScriptedScene, PROJECTILE_VELOCITY};
