use std::f32::consts::{PI, TAU};

use glam::Vec2;

const MIN_SMOOTH_TIME: f32 = 0.0001;

/// Critically damped spring toward `target`, per-call state in `velocity`.
/// Never overshoots: a step that would pass the target lands on it.
pub fn smooth_damp(
    current: Vec2,
    target: Vec2,
    velocity: &mut Vec2,
    smooth_time: f32,
    dt: f32,
) -> Vec2 {
    if dt <= 0.0 {
        return current;
    }

    let smooth_time = smooth_time.max(MIN_SMOOTH_TIME);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut output = target + (change + temp) * decay;

    if (target - current).dot(output - target) > 0.0 {
        output = target;
        *velocity = Vec2::ZERO;
    }

    output
}

/// Wraps into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let mut wrapped = angle.rem_euclid(TAU);
    if wrapped > PI {
        wrapped -= TAU;
    }
    wrapped
}

/// Yaw about +Y for a ground-plane direction `(x, z)`, with +Z as forward.
pub fn yaw_of(direction: Vec2) -> f32 {
    direction.x.atan2(direction.y)
}

pub fn rotate_towards(current: f32, target: f32, max_step: f32) -> f32 {
    let diff = wrap_angle(target - current);
    if diff.abs() <= max_step {
        wrap_angle(target)
    } else {
        wrap_angle(current + max_step.copysign(diff))
    }
}

/// Moves `factor` of the shortest arc from `current` to `target`.
pub fn blend_angle(current: f32, target: f32, factor: f32) -> f32 {
    wrap_angle(current + wrap_angle(target - current) * factor.clamp(0.0, 1.0))
}
