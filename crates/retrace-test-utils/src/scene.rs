//! A scripted, fully deterministic scene for end-to-end replay tests.
//!
//! One static "car" drives a straight line while turning, and fires a
//! projectile (a dynamic entity with a positive id) on scripted frames.
//! Projectiles fly in a straight line and are destroyed after a fixed
//! number of frames.
//!
//! [`ScriptedScene::record`] runs the script against a recording session
//! and returns the ground truth; [`ScriptedScene::play`] runs a playback
//! session and returns what the replay reconstructed, driving
//! projectile spawns purely from recorded events.

use std::collections::BTreeMap;

use retrace_core::EntityId;
use retrace_replay::angle::wrap_degrees;
use retrace_replay::{Replayable, ReplayError, ReplaySession};

use crate::fixtures::{car_spec, linear_path, projectile_spec, LaunchInfo};

/// Muzzle velocity of every projectile.
pub const PROJECTILE_VELOCITY: [f32; 3] = [3.0, 4.0, -5.0];

/// What the scene does.
#[derive(Clone, Debug)]
pub struct SceneScript {
    /// Frames to simulate.
    pub frames: u32,
    /// Frames on which the car fires; a repeated frame fires again.
    pub fire_frames: Vec<u32>,
    /// Frames each projectile lives. Odd values keep the last sample on
    /// a keyframe; even values leave it to be flushed when the channel
    /// finishes.
    pub projectile_lifetime: u32,
}

impl Default for SceneScript {
    fn default() -> Self {
        Self {
            frames: 100,
            fire_frames: vec![50],
            projectile_lifetime: 9,
        }
    }
}

/// Per-frame state of the scene.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SceneTrace {
    pub car_positions: Vec<[f32; 3]>,
    pub car_yaw: Vec<f32>,
    /// `(frame, launch)` in order.
    pub launches: Vec<(u32, LaunchInfo)>,
    /// Projectile id to positions, one per frame alive.
    pub projectiles: BTreeMap<i32, Vec<[f32; 3]>>,
}

struct Projectile {
    binding: Replayable,
    launch: LaunchInfo,
    age: u32,
}

/// The scripted scene bound to one session's static ids.
pub struct ScriptedScene {
    pub car: EntityId,
    pub script: SceneScript,
}

impl ScriptedScene {
    /// Register the scene's static entities.
    pub fn new(session: &mut ReplaySession, script: SceneScript) -> Self {
        Self {
            car: session.register_static(),
            script,
        }
    }

    pub fn car_position(frame: u32) -> [f32; 3] {
        let t = frame as f32;
        [t * 0.25, 0.0, t * -0.1]
    }

    pub fn car_yaw(frame: u32) -> f32 {
        wrap_degrees(frame as f32 * 7.0)
    }

    /// Record the script and return the session document with the
    /// ground truth.
    pub fn record(&self, session: &mut ReplaySession) -> Result<(String, SceneTrace), ReplayError> {
        session.record();
        let dt = session.config().fixed_dt;
        let car = Replayable::attach(session, self.car, &car_spec());
        let mut trace = SceneTrace::default();
        let mut live: Vec<Projectile> = Vec::new();
        let mut next_id = 1;

        for frame in 0..self.script.frames {
            let position = Self::car_position(frame);
            let yaw = Self::car_yaw(frame);
            if let Some(w) = car.writer("position") {
                session.write(w, &position);
            }
            if let Some(w) = car.writer("yaw") {
                session.write(w, &[yaw]);
            }
            trace.car_positions.push(position);
            trace.car_yaw.push(yaw);

            let shots = self.script.fire_frames.iter().filter(|&&f| f == frame).count();
            for _ in 0..shots {
                let launch = LaunchInfo {
                    origin: position,
                    velocity: PROJECTILE_VELOCITY,
                };
                if let Some(w) = car.event_writer("fire") {
                    session.emit(w, &launch);
                }
                trace.launches.push((frame, launch));
                let binding = Replayable::attach(session, EntityId(next_id), &projectile_spec());
                next_id += 1;
                live.push(Projectile {
                    binding,
                    launch,
                    age: 0,
                });
            }

            for p in &mut live {
                let at = linear_path(p.launch.origin, p.launch.velocity, p.age as f32 * dt);
                if let Some(w) = p.binding.writer("position") {
                    session.write(w, &at);
                }
                trace
                    .projectiles
                    .entry(p.binding.entity().0)
                    .or_default()
                    .push(at);
                p.age += 1;
            }
            retire(session, &mut live, self.script.projectile_lifetime);
            session.advance_frame();
        }

        for p in live {
            p.binding.detach(session);
        }
        car.detach(session);
        let blob = session.serialize()?;
        Ok((blob, trace))
    }

    /// Play a recorded document back and return what it reconstructs.
    pub fn play(&self, session: &mut ReplaySession, blob: &str) -> Result<SceneTrace, ReplayError> {
        session.playback(blob)?;
        let car = Replayable::attach(session, self.car, &car_spec());
        let mut trace = SceneTrace::default();
        let mut live: Vec<Projectile> = Vec::new();
        let mut next_id = 1;

        for frame in 0..self.script.frames {
            let mut position = [0.0; 3];
            if let Some(r) = car.reader("position") {
                session.read_into(r, &mut position);
            }
            let mut yaw = [0.0];
            if let Some(r) = car.reader("yaw") {
                session.read_into(r, &mut yaw);
            }
            trace.car_positions.push(position);
            trace.car_yaw.push(yaw[0]);

            if let Some(r) = car.event_reader("fire") {
                while let Some(launch) = session.try_read_event::<LaunchInfo>(r) {
                    trace.launches.push((frame, launch));
                    let binding = Replayable::attach(session, EntityId(next_id), &projectile_spec());
                    next_id += 1;
                    live.push(Projectile {
                        binding,
                        launch,
                        age: 0,
                    });
                }
            }

            for p in &mut live {
                let mut at = [0.0; 3];
                if let Some(r) = p.binding.reader("position") {
                    session.read_into(r, &mut at);
                }
                trace
                    .projectiles
                    .entry(p.binding.entity().0)
                    .or_default()
                    .push(at);
                p.age += 1;
            }
            retire(session, &mut live, self.script.projectile_lifetime);
            session.advance_frame();
        }

        for p in live {
            p.binding.detach(session);
        }
        car.detach(session);
        Ok(trace)
    }
}

fn retire(session: &mut ReplaySession, live: &mut Vec<Projectile>, lifetime: u32) {
    let (expired, alive): (Vec<_>, Vec<_>) = live.drain(..).partition(|p| p.age >= lifetime);
    *live = alive;
    for p in expired {
        p.binding.detach(session);
    }
}
