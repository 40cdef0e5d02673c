//! Angle helpers (degrees).

/// Wrap `t` into `[0, length]`.
fn repeat(t: f32, length: f32) -> f32 {
    (t - (t / length).floor() * length).clamp(0.0, length)
}

/// Signed shortest difference from `current` to `target`, in (-180, 180].
pub fn delta_angle(current: f32, target: f32) -> f32 {
    let mut delta = repeat(target - current, 360.0);
    if delta > 180.0 {
        delta -= 360.0;
    }
    delta
}

/// Wrap an angle into (-180, 180].
pub fn wrap_degrees(angle: f32) -> f32 {
    delta_angle(0.0, angle)
}
