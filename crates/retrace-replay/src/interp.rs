//! Reconstruction of values between keyframes (playback only).
//!
//! One [`Interpolator`] per channel component. The channel decodes whole
//! samples and feeds each component to its interpolator; all interpolators
//! of a channel advance in lockstep.

use retrace_core::Interpolation;

use crate::angle::delta_angle;

/// Unclamped linear blend.
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Blend along the shortest arc between two angles in degrees.
pub fn lerp_angle(a: f32, b: f32, t: f32) -> f32 {
    a + delta_angle(a, b) * t
}

/// Bracket of two keyframes plus the position between them.
#[derive(Clone, Debug, PartialEq)]
pub struct Interpolator {
    interpolation: Interpolation,
    steps_per_keyframe: u32,
    phase: u32,
    prev: f32,
    next: f32,
}

impl Interpolator {
    /// An interpolator that spreads each keyframe over
    /// `steps_per_keyframe` playback steps (0 behaves as 1).
    pub fn new(interpolation: Interpolation, steps_per_keyframe: u32) -> Self {
        Self {
            interpolation,
            steps_per_keyframe: steps_per_keyframe.max(1),
            phase: 0,
            prev: 0.0,
            next: 0.0,
        }
    }

    /// Load the first two keyframes and rewind to the start of the bracket.
    pub fn prime(&mut self, first: f32, second: f32) {
        self.prev = first;
        self.next = second;
        self.phase = 0;
    }

    /// Whether the next [`step`](Self::step) starts a new bracket, i.e. a
    /// new keyframe should be pushed first.
    pub fn at_keyframe(&self) -> bool {
        self.phase == 0
    }

    /// Shift the bracket forward onto a freshly decoded keyframe.
    pub fn push(&mut self, keyframe: f32) {
        self.prev = self.next;
        self.next = keyframe;
    }

    /// Shift the bracket forward with no new keyframe: the value freezes
    /// at the last one.
    pub fn hold(&mut self) {
        self.prev = self.next;
    }

    /// Produce the value for the current playback step and advance.
    pub fn step(&mut self) -> f32 {
        let mu = (self.phase as f32 / self.steps_per_keyframe as f32).clamp(0.0, 1.0);
        self.phase = (self.phase + 1) % self.steps_per_keyframe;
        match self.interpolation {
            Interpolation::Linear => lerp(self.prev, self.next, mu),
            Interpolation::Angular => lerp_angle(self.prev, self.next, mu),
            Interpolation::None => self.prev,
        }
    }
}
