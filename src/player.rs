use anyhow::Result;
use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};

use crate::config::PlayerConfig;
use crate::input::ControlAction;
use crate::interaction::{ActiveInteractable, Interactable};
use crate::physics::{BodyDesc, BodyKind, BodyLink, ColliderShape, PhysicsWorld, RigidBodyHandle};
use crate::scene_graph::{MeshColor, PickShape, RayHits, SceneGraph, Transform3D};
use crate::scripts::{FrameContext, Script};

pub const PLAYER_ROOT_NAME: &str = "Player_Root";
const PLAYER_MESH_NAME: &str = "Player";
const PLAYER_COLOR: &str = "#4d908e";
const CAPSULE_RADIUS: f32 = 0.4;
const CAPSULE_HALF_HEIGHT: f32 = 0.6;
const PLAYER_MASS: f32 = 1.0;
const GROUNDED_SPEED: f32 = 0.1;
const TURN_RATE: f32 = 15.0;
const FACING_THRESHOLD_SQ: f32 = 0.1;
pub const INTERACT_COOLDOWN: f32 = 0.5;

#[derive(Component, Clone, Copy, Debug, Default)]
pub struct PlayerTag;

/// Live handles of the spawned player.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerRig {
    pub root: Entity,
    pub body: RigidBodyHandle,
}

/// Builds the player capsule: a root node linked to an upright dynamic body and a pickable mesh
/// child.
pub fn spawn_player(graph: &mut SceneGraph, physics: &mut PhysicsWorld, cfg: &PlayerConfig) -> PlayerRig {
    let spawn = Vec3::from(cfg.spawn);
    let body = physics.add_body(
        &BodyDesc::new(
            BodyKind::Dynamic,
            spawn,
            ColliderShape::CapsuleY { half_height: CAPSULE_HALF_HEIGHT, radius: CAPSULE_RADIUS },
        )
        .with_mass(PLAYER_MASS)
        .upright(),
    );
    let root = graph.spawn_node(PLAYER_ROOT_NAME, Transform3D::from_translation(spawn), None);
    graph.insert(root, PlayerTag);
    graph.insert(root, BodyLink(body));
    graph.insert(root, MeshColor(PLAYER_COLOR.to_string()));
    let mesh = graph.spawn_node(PLAYER_MESH_NAME, Transform3D::default(), Some(root));
    graph.insert(
        mesh,
        PickShape::Cuboid { half_extents: Vec3::new(CAPSULE_RADIUS, CAPSULE_HALF_HEIGHT + CAPSULE_RADIUS, CAPSULE_RADIUS) },
    );
    log::info!("[player] spawned at {spawn:?}");
    PlayerRig { root, body }
}

pub fn despawn_player(rig: PlayerRig, graph: &mut SceneGraph, physics: &mut PhysicsWorld) {
    graph.despawn_recursive(rig.root);
    physics.remove_body(rig.body);
    log::info!("[player] despawned");
}

/// Camera-relative locomotion, jumping and turning for a body-linked node.
pub struct PlayerMovement {
    node: Entity,
    speed: f32,
    jump_force: f32,
    grounded: bool,
}

impl PlayerMovement {
    pub fn new(node: Entity, cfg: &PlayerConfig) -> Self {
        Self { node, speed: cfg.speed, jump_force: cfg.jump_force, grounded: true }
    }

    pub fn grounded(&self) -> bool {
        self.grounded
    }

    /// World-space movement direction for the given axes and camera facing. Zero input stays zero.
    pub fn movement_direction(forward_axis: f32, right_axis: f32, camera_forward: Vec3) -> Vec3 {
        let raw = Vec3::new(-right_axis, 0.0, forward_axis);
        let yaw = camera_forward.x.atan2(camera_forward.z);
        (Quat::from_rotation_y(yaw) * raw).normalize_or_zero()
    }
}

impl Script for PlayerMovement {
    fn update(&mut self, ctx: &mut FrameContext<'_>, dt: f32) -> Result<()> {
        let Some(BodyLink(body)) = ctx.graph.get::<BodyLink>(self.node).copied() else {
            return Ok(());
        };
        let Some(velocity) = ctx.physics.linear_velocity(body) else {
            return Ok(());
        };
        // Velocity heuristic, not a contact check.
        self.grounded = velocity.y.abs() < GROUNDED_SPEED;

        let forward_axis = ctx.input.action_axis(ControlAction::MoveBackward, ControlAction::MoveForward);
        let right_axis = ctx.input.action_axis(ControlAction::MoveLeft, ControlAction::MoveRight);
        let direction = Self::movement_direction(forward_axis, right_axis, ctx.camera.forward());

        ctx.physics.set_linear_velocity(
            body,
            Vec3::new(direction.x * self.speed, velocity.y, direction.z * self.speed),
        );

        if self.grounded && ctx.input.action_held(ControlAction::Jump) {
            ctx.physics.apply_impulse(body, Vec3::new(0.0, self.jump_force, 0.0));
        }

        if direction.length_squared() > FACING_THRESHOLD_SQ {
            if let Some(current) = ctx.physics.rotation(body) {
                let target = Quat::from_rotation_y(direction.x.atan2(direction.z));
                let t = (TURN_RATE * dt).clamp(0.0, 1.0);
                ctx.physics.set_rotation(body, current.slerp(target, t).normalize());
            }
        }
        Ok(())
    }

    fn label(&self) -> &str {
        "player-movement"
    }
}

/// Finds what the player is looking at and fires its handler on the interact key.
pub struct PlayerInteraction {
    distance: f32,
    cooldown: f32,
}

impl PlayerInteraction {
    pub fn new(cfg: &PlayerConfig) -> Self {
        Self { distance: cfg.interaction_distance, cooldown: 0.0 }
    }

    pub fn cooldown(&self) -> f32 {
        self.cooldown
    }

    fn first_interactable(graph: &SceneGraph, hits: &RayHits) -> Option<Entity> {
        hits.iter().find_map(|hit| graph.find_ancestor_with::<Interactable>(hit.node))
    }
}

impl Script for PlayerInteraction {
    fn update(&mut self, ctx: &mut FrameContext<'_>, dt: f32) -> Result<()> {
        self.cooldown -= dt;
        let hits = match ctx.camera.centre_ray(ctx.viewport) {
            Some((origin, dir)) => ctx.graph.raycast(origin, dir, self.distance),
            None => RayHits::new(),
        };
        let found = Self::first_interactable(ctx.graph, &hits).and_then(|node| {
            ctx.graph.get::<Interactable>(node).map(|interactable| ActiveInteractable::from_component(node, interactable))
        });
        let Some(active) = found else {
            ctx.interaction.clear();
            return Ok(());
        };
        ctx.interaction.set_active(Some(active.clone()));
        if ctx.input.action_held(ControlAction::Interact) && self.cooldown <= 0.0 {
            active.interact(ctx.graph);
            self.cooldown = INTERACT_COOLDOWN;
        }
        Ok(())
    }

    fn label(&self) -> &str {
        "player-interaction"
    }
}
