use std::collections::HashMap;
use std::f32::consts::PI;

use anyhow::Result;
use bevy_ecs::prelude::Entity;
use glam::{Vec2, Vec3};

use crate::camera3d::{Camera3D, OrbitCamera};
use crate::config::CameraConfig;
use crate::scripts::{FrameContext, Script};

pub const THIRD_PERSON: &str = "thirdPerson";
pub const EDITOR_ORBIT: &str = "orbit";

pub const MIN_POLAR: f32 = 0.2;
pub const MAX_POLAR: f32 = PI - 0.2;

/// Follow camera on a sphere around its target with wall avoidance and smoothing.
#[derive(Debug, Clone)]
pub struct ThirdPersonCamera {
    radius: f32,
    phi: f32,
    theta: f32,
    sensitivity: f32,
    smoothing_rate: f32,
    collision_buffer: f32,
    look_offset: Vec3,
    current_position: Option<Vec3>,
    current_look_at: Option<Vec3>,
}

impl ThirdPersonCamera {
    pub fn from_config(cfg: &CameraConfig) -> Self {
        Self {
            radius: cfg.radius,
            phi: cfg.polar_angle.clamp(MIN_POLAR, MAX_POLAR),
            theta: 0.0,
            sensitivity: cfg.mouse_sensitivity,
            smoothing_rate: cfg.smoothing_rate,
            collision_buffer: cfg.collision_buffer,
            look_offset: Vec3::from(cfg.look_offset),
            current_position: None,
            current_look_at: None,
        }
    }

    pub fn polar_angle(&self) -> f32 {
        self.phi
    }

    pub fn azimuth(&self) -> f32 {
        self.theta
    }

    /// Rotates the sphere by a pointer delta. The polar angle never reaches the poles.
    pub fn apply_look(&mut self, delta: Vec2) {
        if !delta.is_finite() {
            return;
        }
        self.theta = crate::wrap_angle(self.theta - delta.x * self.sensitivity);
        self.phi = (self.phi - delta.y * self.sensitivity).clamp(MIN_POLAR, MAX_POLAR);
    }

    /// Offset from the target for the current spherical coordinates (Y up, theta measured from +Z).
    pub fn spherical_offset(&self) -> Vec3 {
        let sin_phi = self.phi.sin();
        Vec3::new(
            self.radius * sin_phi * self.theta.sin(),
            self.radius * self.phi.cos(),
            self.radius * sin_phi * self.theta.cos(),
        )
    }

    /// Forgets the smoothed pose so the next update starts from wherever the camera is.
    pub fn reset_smoothing(&mut self) {
        self.current_position = None;
        self.current_look_at = None;
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>, target: Entity, dt: f32) {
        if ctx.input.pointer_captured() {
            let delta = ctx.input.take_mouse_delta();
            self.apply_look(delta);
        }
        let Some(target_pos) = ctx.graph.world_position(target) else {
            return;
        };

        let offset = self.spherical_offset();
        let ideal_distance = offset.length();
        let mut desired = target_pos + offset;
        let hits = ctx.graph.raycast(target_pos, offset, ideal_distance);
        let blocker = hits.iter().find(|hit| !ctx.graph.is_self_or_descendant(hit.node, target));
        if let Some(hit) = blocker {
            let clamped = hit.distance * self.collision_buffer;
            desired = target_pos + offset.normalize_or_zero() * clamped;
        }
        let look_at = target_pos + self.look_offset;

        let alpha = (self.smoothing_rate * dt).clamp(0.0, 1.0);
        let position = self.current_position.get_or_insert(ctx.camera.position);
        *position = position.lerp(desired, alpha);
        let smoothed_look = self.current_look_at.get_or_insert(ctx.camera.target);
        *smoothed_look = smoothed_look.lerp(look_at, alpha);

        ctx.camera.position = *position;
        ctx.camera.look_at(*smoothed_look);
    }
}

/// Edit-mode orbit around the selection (or the machine's target): right-drag orbits, wheel zooms.
#[derive(Debug, Clone)]
pub struct EditorOrbitCamera {
    orbit: OrbitCamera,
    sensitivity: f32,
}

impl EditorOrbitCamera {
    pub fn new(radius: f32, sensitivity: f32) -> Self {
        Self { orbit: OrbitCamera::new(Vec3::ZERO, radius), sensitivity }
    }

    pub fn orbit(&self) -> &OrbitCamera {
        &self.orbit
    }

    fn update(&mut self, ctx: &mut FrameContext<'_>, target: Entity) {
        let delta = ctx.input.take_mouse_delta();
        if ctx.input.right_held() {
            self.orbit.orbit(-delta * self.sensitivity);
        }
        if let Some(wheel) = ctx.input.consume_wheel_delta() {
            self.orbit.zoom((-wheel * 0.1).exp());
        }
        let focus = ctx.editor.selected().unwrap_or(target);
        if let Some(pos) = ctx.graph.world_position(focus) {
            self.orbit.target = pos;
        }
        self.orbit.apply_to(ctx.camera);
    }
}

#[derive(Debug, Clone)]
pub enum CameraBehavior {
    ThirdPerson(ThirdPersonCamera),
    Orbit(EditorOrbitCamera),
}

impl CameraBehavior {
    fn update(&mut self, ctx: &mut FrameContext<'_>, target: Entity, dt: f32) {
        match self {
            CameraBehavior::ThirdPerson(cam) => cam.update(ctx, target, dt),
            CameraBehavior::Orbit(cam) => cam.update(ctx, target),
        }
    }
}

/// Named camera behaviours with one active at a time, driven once per frame as a script.
#[derive(Debug, Default)]
pub struct CameraStateMachine {
    states: HashMap<String, CameraBehavior>,
    active: Option<String>,
    target: Option<Entity>,
}

impl CameraStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_target(&mut self, target: Option<Entity>) {
        self.target = target;
    }

    pub fn target(&self) -> Option<Entity> {
        self.target
    }

    /// Registers a behaviour under `name` without activating it.
    pub fn set_state(&mut self, name: impl Into<String>, state: CameraBehavior) {
        self.states.insert(name.into(), state);
    }

    /// Switches the active behaviour. Unknown names are ignored.
    pub fn set_active_state(&mut self, name: &str) -> bool {
        if !self.states.contains_key(name) {
            log::debug!("[camera] ignoring unknown camera state '{name}'");
            return false;
        }
        if self.active.as_deref() != Some(name) {
            if let Some(CameraBehavior::ThirdPerson(cam)) = self.states.get_mut(name) {
                cam.reset_smoothing();
            }
            self.active = Some(name.to_string());
        }
        true
    }

    pub fn active_state(&self) -> Option<&str> {
        self.active.as_deref()
    }

    pub fn third_person(&self) -> Option<&ThirdPersonCamera> {
        self.states.values().find_map(|state| match state {
            CameraBehavior::ThirdPerson(cam) => Some(cam),
            CameraBehavior::Orbit(_) => None,
        })
    }

    pub fn with_defaults(cfg: &CameraConfig) -> Self {
        let mut machine = Self::new();
        machine.set_state(THIRD_PERSON, CameraBehavior::ThirdPerson(ThirdPersonCamera::from_config(cfg)));
        machine.set_state(EDITOR_ORBIT, CameraBehavior::Orbit(EditorOrbitCamera::new(12.0, cfg.mouse_sensitivity)));
        machine
    }

    /// Snaps the camera to the active orbit without waiting for a frame.
    pub fn sync_orbit(&self, camera: &mut Camera3D) {
        if let Some(CameraBehavior::Orbit(orbit)) = self.active.as_deref().and_then(|name| self.states.get(name)) {
            orbit.orbit().apply_to(camera);
        }
    }
}

impl Script for CameraStateMachine {
    fn update(&mut self, ctx: &mut FrameContext<'_>, dt: f32) -> Result<()> {
        let Some(target) = self.target else {
            return Ok(());
        };
        let Some(name) = self.active.as_deref() else {
            return Ok(());
        };
        if let Some(state) = self.states.get_mut(name) {
            state.update(ctx, target, dt);
        }
        Ok(())
    }

    fn label(&self) -> &str {
        "camera"
    }
}
