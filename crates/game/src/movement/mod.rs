mod config;
mod ground;
mod reconciler;
mod smoothing;

pub use config::ReconcilerConfig;
pub use ground::{FlatGround, GroundHeight, HeightField};
pub use reconciler::{MovementReconciler, TargetOutcome};
pub use smoothing::{blend_angle, rotate_towards, smooth_damp, wrap_angle, yaw_of};
