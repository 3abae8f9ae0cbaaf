pub mod behaviours;
pub mod camera;
pub mod camera3d;
pub mod cli;
pub mod composer;
pub mod config;
pub mod editor;
pub mod gizmo;
pub mod input;
pub mod interaction;
pub mod physics;
pub(crate) mod picking;
pub mod player;
pub mod runtime;
pub mod runtime_host;
pub mod scene_graph;
pub mod scripts;

pub use runtime::Runtime;
pub use runtime_host::{PlayState, RuntimeHost};

/// Wraps an angle into `[-PI, PI)`. Non-finite input collapses to zero.
pub(crate) fn wrap_angle(radians: f32) -> f32 {
    use std::f32::consts::{PI, TAU};
    if !radians.is_finite() {
        return 0.0;
    }
    (radians + PI).rem_euclid(TAU) - PI
}

#[cfg(test)]
mod tests {
    use super::wrap_angle;
    use std::f32::consts::PI;

    #[test]
    fn wrap_angle_folds_large_and_non_finite_values() {
        assert!((wrap_angle(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-5);
        assert!((wrap_angle(-0.5) + 0.5).abs() < 1e-6);
        let huge = wrap_angle(1.0e12);
        assert!((-PI..=PI).contains(&huge), "wrapped to {huge}");
        assert_eq!(wrap_angle(f32::INFINITY), 0.0);
        assert_eq!(wrap_angle(f32::NAN), 0.0);
    }
}
