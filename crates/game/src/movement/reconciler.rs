use glam::{Quat, Vec2, Vec3};

use super::config::ReconcilerConfig;
use super::ground::GroundHeight;
use super::smoothing::{blend_angle, rotate_towards, smooth_damp, yaw_of};

const MIN_DT: f32 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetOutcome {
    /// First target: placed directly.
    Placed,
    /// Correction exceeded the snap distance.
    Warped,
    Smoothed,
}

/// Turns a stream of authoritative ground-plane targets into a continuous
/// pose: smoothed x/z, gravity-integrated y against the ground service.
#[derive(Debug, Clone)]
pub struct MovementReconciler {
    config: ReconcilerConfig,
    target: Vec3,
    position: Vec3,
    vertical_velocity: f32,
    planar_velocity: Vec2,
    last_direction: Vec2,
    yaw: f32,
    initialized: bool,
}

impl MovementReconciler {
    pub fn new(config: ReconcilerConfig) -> Self {
        Self {
            config,
            target: Vec3::ZERO,
            position: Vec3::ZERO,
            vertical_velocity: 0.0,
            planar_velocity: Vec2::ZERO,
            last_direction: Vec2::ZERO,
            yaw: 0.0,
            initialized: false,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn set_target(&mut self, ground_pos: Vec2, ground: &dyn GroundHeight) -> TargetOutcome {
        self.target = self.project(ground_pos, ground);

        if !self.initialized {
            self.place_at_target();
            self.initialized = true;
            return TargetOutcome::Placed;
        }

        let offset = Vec2::new(
            self.target.x - self.position.x,
            self.target.z - self.position.z,
        );
        if offset.length_squared() > self.config.snap_distance * self.config.snap_distance {
            self.place_at_target();
            return TargetOutcome::Warped;
        }

        TargetOutcome::Smoothed
    }

    /// Teleports regardless of distance, e.g. on spawn or AOI re-entry.
    pub fn warp_to(&mut self, ground_pos: Vec2, ground: &dyn GroundHeight) {
        self.target = self.project(ground_pos, ground);
        self.place_at_target();
        self.initialized = true;
    }

    /// Advances one simulation tick. `auto_orient` turns toward the
    /// direction of travel; the local player's facing comes from input.
    pub fn step(&mut self, dt: f32, auto_orient: bool) {
        if !self.initialized || !dt.is_finite() || dt <= 0.0 {
            return;
        }

        let previous = Vec2::new(self.position.x, self.position.z);
        let planar = smooth_damp(
            previous,
            Vec2::new(self.target.x, self.target.z),
            &mut self.planar_velocity,
            self.config.smooth_time,
            dt,
        );

        self.position.x = planar.x;
        self.position.z = planar.y;
        self.step_vertical(dt);

        let delta = planar - previous;
        if delta.length_squared() > self.config.min_turn_delta_sq {
            self.last_direction = delta.normalize();
            if auto_orient {
                let max_step = self.config.turn_rate.to_radians() * dt;
                self.yaw = rotate_towards(self.yaw, yaw_of(self.last_direction), max_step);
            }
        }
    }

    fn step_vertical(&mut self, dt: f32) {
        let target_y = self.target.y;
        let rise = target_y - self.position.y;

        if self.position.y <= target_y + self.config.grounded_tolerance {
            self.vertical_velocity = self.config.grounded_bias;
        } else {
            self.vertical_velocity = (self.vertical_velocity + self.config.gravity * dt)
                .max(self.config.max_fall_speed);
        }

        // Steps and slopes are matched this tick instead of fallen-and-caught.
        if rise > 0.0 {
            self.vertical_velocity = self.vertical_velocity.max(rise / dt.max(MIN_DT));
        }

        self.position.y += self.vertical_velocity * dt;
        if self.position.y < target_y {
            self.position.y = target_y;
        }
    }

    /// Local-player facing, driven by input rather than travel.
    pub fn face_direction(&mut self, direction: Vec2) {
        if direction.length_squared() > self.config.min_turn_delta_sq {
            self.last_direction = direction.normalize();
            self.yaw = yaw_of(self.last_direction);
        }
    }

    /// Partial turn toward a ground-plane point; `factor` of the arc.
    pub fn blend_facing_towards(&mut self, point: Vec2, factor: f32) {
        let to_point = point - self.planar_position();
        if to_point.length_squared() > self.config.min_turn_delta_sq {
            self.yaw = blend_angle(self.yaw, yaw_of(to_point), factor);
        }
    }

    fn project(&self, ground_pos: Vec2, ground: &dyn GroundHeight) -> Vec3 {
        let y = ground
            .height_at(ground_pos.x, ground_pos.y)
            .map(|h| h + self.config.ground_offset)
            .unwrap_or(self.position.y);
        Vec3::new(ground_pos.x, y, ground_pos.y)
    }

    fn place_at_target(&mut self) {
        self.position = self.target;
        self.planar_velocity = Vec2::ZERO;
        self.vertical_velocity = 0.0;
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn planar_position(&self) -> Vec2 {
        Vec2::new(self.position.x, self.position.z)
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn vertical_velocity(&self) -> f32 {
        self.vertical_velocity
    }

    pub fn planar_velocity(&self) -> Vec2 {
        self.planar_velocity
    }

    pub fn last_direction(&self) -> Vec2 {
        self.last_direction
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn orientation(&self) -> Quat {
        Quat::from_rotation_y(self.yaw)
    }
}
