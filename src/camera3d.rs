use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
use winit::dpi::PhysicalSize;

use crate::config::CameraConfig;

const DEFAULT_UP: Vec3 = Vec3::Y;

/// Perspective camera that scripts steer each frame.
#[derive(Debug, Clone)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub fov_y_radians: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera3D {
    pub fn new(position: Vec3, target: Vec3, fov_y_radians: f32, near: f32, far: f32) -> Self {
        Self { position, target, up: DEFAULT_UP, fov_y_radians, near, far }
    }

    pub fn from_config(cfg: &CameraConfig) -> Self {
        Self::new(
            Vec3::new(0.0, 5.0, 10.0),
            Vec3::ZERO,
            cfg.fov_degrees.to_radians(),
            cfg.near,
            cfg.far,
        )
    }

    pub fn look_at(&mut self, point: Vec3) {
        self.target = point;
    }

    /// Unit vector the camera is facing, or zero when position and target coincide.
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_y_radians, aspect.max(0.0001), self.near, self.far)
    }

    pub fn view_projection(&self, viewport: PhysicalSize<u32>) -> Mat4 {
        let aspect = if viewport.height > 0 { viewport.width as f32 / viewport.height as f32 } else { 1.0 };
        self.projection_matrix(aspect) * self.view_matrix()
    }

    /// Generates a world-space ray originating from the camera through a screen-space position.
    pub fn screen_ray(&self, screen: Vec2, viewport: PhysicalSize<u32>) -> Option<(Vec3, Vec3)> {
        if viewport.width == 0 || viewport.height == 0 {
            return None;
        }
        let ndc_x = (2.0 * screen.x / viewport.width as f32) - 1.0;
        let ndc_y = 1.0 - (2.0 * screen.y / viewport.height as f32);
        let clip = Vec4::new(ndc_x, ndc_y, 1.0, 1.0);
        let inv_view_proj = self.view_projection(viewport).inverse();
        let world = inv_view_proj * clip;
        if world.w.abs() < f32::EPSILON {
            return None;
        }
        let dir = ((world.truncate() / world.w) - self.position).normalize_or_zero();
        if dir == Vec3::ZERO || !dir.is_finite() {
            return None;
        }
        Some((self.position, dir))
    }

    /// Ray through the exact centre of the viewport.
    pub fn centre_ray(&self, viewport: PhysicalSize<u32>) -> Option<(Vec3, Vec3)> {
        let centre = Vec2::new(viewport.width as f32 * 0.5, viewport.height as f32 * 0.5);
        self.screen_ray(centre, viewport)
    }
}

/// Orbit-style controller storing yaw/pitch around a target. Drives the editor view.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub target: Vec3,
    pub radius: f32,
    pub yaw_radians: f32,
    pub pitch_radians: f32,
}

impl OrbitCamera {
    pub fn new(target: Vec3, radius: f32) -> Self {
        Self { target, radius: radius.max(0.01), yaw_radians: 0.0, pitch_radians: -0.4 }
    }

    pub fn eye(&self) -> Vec3 {
        let rotation = Quat::from_euler(glam::EulerRot::YXZ, self.yaw_radians, self.pitch_radians, 0.0);
        self.target + rotation * Vec3::new(0.0, 0.0, self.radius)
    }

    pub fn apply_to(&self, camera: &mut Camera3D) {
        camera.position = self.eye();
        camera.look_at(self.target);
    }

    pub fn orbit(&mut self, delta: Vec2) {
        self.yaw_radians = crate::wrap_angle(self.yaw_radians + delta.x);
        self.pitch_radians = (self.pitch_radians + delta.y)
            .clamp(-std::f32::consts::FRAC_PI_2 + 0.01, std::f32::consts::FRAC_PI_2 - 0.01);
    }

    pub fn zoom(&mut self, factor: f32) {
        self.radius = (self.radius * factor).clamp(0.1, 10_000.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centre_ray_follows_view_direction() {
        let camera = Camera3D::new(Vec3::new(0.0, 1.0, 5.0), Vec3::new(0.0, 1.0, 0.0), 60.0_f32.to_radians(), 0.1, 1000.0);
        let (origin, dir) = camera.centre_ray(PhysicalSize::new(1280, 720)).expect("centre ray");
        assert_eq!(origin, camera.position);
        assert!(dir.distance(Vec3::NEG_Z) < 1e-3, "dir = {dir:?}");
        assert!(camera.centre_ray(PhysicalSize::new(0, 720)).is_none());
    }

    #[test]
    fn orbit_camera_orbits_target() {
        let mut orbit = OrbitCamera::new(Vec3::ZERO, 5.0);
        orbit.orbit(Vec2::new(0.5, 0.25));
        let mut camera = Camera3D::new(Vec3::ZERO, Vec3::Z, 45.0f32.to_radians(), 0.1, 500.0);
        orbit.apply_to(&mut camera);
        assert!((camera.position.distance(Vec3::ZERO) - 5.0).abs() < 1e-4);
        assert_eq!(camera.target, Vec3::ZERO);
        orbit.orbit(Vec2::new(0.0, 10.0));
        assert!(orbit.pitch_radians < std::f32::consts::FRAC_PI_2);
    }
}
