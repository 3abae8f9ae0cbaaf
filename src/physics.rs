use bevy_ecs::prelude::Component;
use glam::{Quat, Vec3};
use rapier3d::na::{Quaternion, UnitQuaternion};
use rapier3d::prelude as rapier;

pub use rapier3d::prelude::RigidBodyHandle;

/// Links a scene node to the rigid body that drives it during play mode.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct BodyLink(pub RigidBodyHandle);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Fixed,
    Dynamic,
    KinematicPosition,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ColliderShape {
    Cuboid { half_extents: Vec3 },
    Ball { radius: f32 },
    CapsuleY { half_height: f32, radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub kind: BodyKind,
    pub translation: Vec3,
    pub rotation: Quat,
    pub shape: ColliderShape,
    pub mass: Option<f32>,
    /// Restricts rotation to the vertical axis (upright characters).
    pub upright: bool,
}

impl BodyDesc {
    pub fn new(kind: BodyKind, translation: Vec3, shape: ColliderShape) -> Self {
        Self { kind, translation, rotation: Quat::IDENTITY, shape, mass: None, upright: false }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = Some(mass);
        self
    }

    pub fn upright(mut self) -> Self {
        self.upright = true;
        self
    }
}

pub struct PhysicsWorld {
    pipeline: rapier::PhysicsPipeline,
    gravity: rapier::Vector<f32>,
    integration_params: rapier::IntegrationParameters,
    islands: rapier::IslandManager,
    broad_phase: rapier::DefaultBroadPhase,
    narrow_phase: rapier::NarrowPhase,
    impulse_joints: rapier::ImpulseJointSet,
    multibody_joints: rapier::MultibodyJointSet,
    ccd_solver: rapier::CCDSolver,
    bodies: rapier::RigidBodySet,
    colliders: rapier::ColliderSet,
}

impl PhysicsWorld {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            pipeline: rapier::PhysicsPipeline::new(),
            gravity: to_vector(gravity),
            integration_params: rapier::IntegrationParameters::default(),
            islands: rapier::IslandManager::new(),
            broad_phase: rapier::DefaultBroadPhase::new(),
            narrow_phase: rapier::NarrowPhase::new(),
            impulse_joints: rapier::ImpulseJointSet::new(),
            multibody_joints: rapier::MultibodyJointSet::new(),
            ccd_solver: rapier::CCDSolver::new(),
            bodies: rapier::RigidBodySet::new(),
            colliders: rapier::ColliderSet::new(),
        }
    }

    pub fn gravity(&self) -> Vec3 {
        from_vector(&self.gravity)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn contains(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).is_some()
    }

    pub fn add_body(&mut self, desc: &BodyDesc) -> RigidBodyHandle {
        let body_type = match desc.kind {
            BodyKind::Fixed => rapier::RigidBodyType::Fixed,
            BodyKind::Dynamic => rapier::RigidBodyType::Dynamic,
            BodyKind::KinematicPosition => rapier::RigidBodyType::KinematicPositionBased,
        };
        let mut builder =
            rapier::RigidBodyBuilder::new(body_type).position(to_isometry(desc.translation, desc.rotation));
        if desc.upright {
            builder = builder.enabled_rotations(false, true, false);
        }
        let handle = self.bodies.insert(builder);

        let mut collider = match desc.shape {
            ColliderShape::Cuboid { half_extents } => {
                rapier::ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            }
            ColliderShape::Ball { radius } => rapier::ColliderBuilder::ball(radius),
            ColliderShape::CapsuleY { half_height, radius } => rapier::ColliderBuilder::capsule_y(half_height, radius),
        };
        if let Some(mass) = desc.mass {
            collider = collider.mass(mass);
        }
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        handle
    }

    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies
            .remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .is_some()
    }

    pub fn translation(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| from_vector(b.translation()))
    }

    pub fn rotation(&self, handle: RigidBodyHandle) -> Option<Quat> {
        self.bodies.get(handle).map(|b| from_rotation(b.rotation()))
    }

    pub fn set_rotation(&mut self, handle: RigidBodyHandle, rotation: Quat) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_rotation(to_rotation(rotation), true);
        }
    }

    pub fn linear_velocity(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.bodies.get(handle).map(|b| from_vector(b.linvel()))
    }

    pub fn set_linear_velocity(&mut self, handle: RigidBodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_linvel(to_vector(velocity), true);
        }
    }

    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.apply_impulse(to_vector(impulse), true);
        }
    }

    pub fn set_next_kinematic_rotation(&mut self, handle: RigidBodyHandle, rotation: Quat) {
        if let Some(body) = self.bodies.get_mut(handle) {
            body.set_next_kinematic_rotation(to_rotation(rotation));
        }
    }

    pub fn step(&mut self, dt: f32) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.integration_params.dt = dt;
        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }
}

fn to_vector(v: Vec3) -> rapier::Vector<f32> {
    rapier::Vector::new(v.x, v.y, v.z)
}

fn from_vector(v: &rapier::Vector<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn to_rotation(q: Quat) -> UnitQuaternion<f32> {
    UnitQuaternion::from_quaternion(Quaternion::new(q.w, q.x, q.y, q.z))
}

fn from_rotation(r: &UnitQuaternion<f32>) -> Quat {
    Quat::from_xyzw(r.i, r.j, r.k, r.w)
}

fn to_isometry(translation: Vec3, rotation: Quat) -> rapier::Isometry<f32> {
    rapier::Isometry::from_parts(rapier::Translation::new(translation.x, translation.y, translation.z), to_rotation(rotation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dynamic_body_falls_under_gravity() {
        let mut world = PhysicsWorld::new(Vec3::new(0.0, -20.0, 0.0));
        let ball = world.add_body(&BodyDesc::new(
            BodyKind::Dynamic,
            Vec3::new(0.0, 10.0, 0.0),
            ColliderShape::Ball { radius: 0.5 },
        ));
        for _ in 0..10 {
            world.step(1.0 / 60.0);
        }
        let y = world.translation(ball).expect("ball exists").y;
        assert!(y < 10.0, "ball should fall, y = {y}");
        assert!(world.linear_velocity(ball).expect("velocity").y < 0.0);
    }

    #[test]
    fn fixed_floor_does_not_move() {
        let mut world = PhysicsWorld::new(Vec3::new(0.0, -20.0, 0.0));
        let floor = world.add_body(&BodyDesc::new(
            BodyKind::Fixed,
            Vec3::new(0.0, -0.5, 0.0),
            ColliderShape::Cuboid { half_extents: Vec3::new(50.0, 0.5, 50.0) },
        ));
        world.step(1.0 / 60.0);
        assert_eq!(world.translation(floor), Some(Vec3::new(0.0, -0.5, 0.0)));
    }

    #[test]
    fn kinematic_rotation_applies_on_step() {
        let mut world = PhysicsWorld::new(Vec3::ZERO);
        let spinner = world.add_body(&BodyDesc::new(
            BodyKind::KinematicPosition,
            Vec3::new(8.0, 1.0, 0.0),
            ColliderShape::Cuboid { half_extents: Vec3::splat(0.5) },
        ));
        let target = Quat::from_rotation_y(0.5);
        world.set_next_kinematic_rotation(spinner, target);
        world.step(1.0 / 60.0);
        let rotation = world.rotation(spinner).expect("rotation");
        assert!(rotation.angle_between(target) < 1e-3);
        assert_eq!(world.translation(spinner), Some(Vec3::new(8.0, 1.0, 0.0)));
    }

    #[test]
    fn removed_bodies_are_gone() {
        let mut world = PhysicsWorld::new(Vec3::ZERO);
        let handle = world.add_body(&BodyDesc::new(BodyKind::Fixed, Vec3::ZERO, ColliderShape::Ball { radius: 1.0 }));
        assert!(world.remove_body(handle));
        assert!(!world.contains(handle));
        assert!(!world.remove_body(handle));
        assert_eq!(world.translation(handle), None);
    }
}
