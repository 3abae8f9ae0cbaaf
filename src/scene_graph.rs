use crate::editor::SceneObjectId;
use crate::picking;
use bevy_ecs::prelude::*;
use glam::{EulerRot, Mat4, Quat, Vec3};
use smallvec::SmallVec;

const MAX_HIERARCHY_DEPTH: usize = 64;

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Transform3D {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform3D {
    fn default() -> Self {
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

impl Transform3D {
    pub fn from_parts(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { translation, rotation, scale }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Default::default() }
    }

    /// Builds a transform from XYZ Euler angles in radians.
    pub fn from_euler(translation: [f32; 3], rotation: [f32; 3], scale: [f32; 3]) -> Self {
        Self {
            translation: Vec3::from(translation),
            rotation: Quat::from_euler(EulerRot::XYZ, rotation[0], rotation[1], rotation[2]),
            scale: Vec3::from(scale),
        }
    }

    pub fn euler_rotation(&self) -> [f32; 3] {
        let (x, y, z) = self.rotation.to_euler(EulerRot::XYZ);
        [x, y, z]
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

#[derive(Component, Clone, Debug)]
pub struct NodeName(pub String);

#[derive(Component, Clone, Copy)]
pub struct Parent(pub Entity);

#[derive(Component, Default)]
pub struct Children(pub Vec<Entity>);

/// Marks the top node of a composed entity; selection and gizmos attach here.
#[derive(Component, Clone, Copy, Default)]
pub struct EntityRoot;

/// Back-reference from a live node to the store entry it projects.
#[derive(Component, Clone, Debug)]
pub struct SceneObjectTag {
    pub id: SceneObjectId,
}

impl SceneObjectTag {
    pub fn new(id: SceneObjectId) -> Self {
        Self { id }
    }
}

/// Colour the renderer should draw an entity with.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct MeshColor(pub String);

#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub enum PickShape {
    Cuboid { half_extents: Vec3 },
    Ball { radius: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub node: Entity,
    pub distance: f32,
}

pub type RayHits = SmallVec<[RayHit; 8]>;

#[derive(Debug, Clone, PartialEq)]
pub struct HierarchyEntry {
    pub node: Entity,
    pub name: String,
    pub depth: usize,
}

/// Live scene graph. Nodes are ECS entities; parent links are explicit components so ray hits can
/// be walked back up to their entity roots.
pub struct SceneGraph {
    pub world: World,
    root: Entity,
}

impl SceneGraph {
    pub fn new() -> Self {
        let mut world = World::new();
        let root = world.spawn((NodeName("Scene".to_string()), Transform3D::default(), Children::default())).id();
        Self { world, root }
    }

    pub fn root(&self) -> Entity {
        self.root
    }

    pub fn contains(&self, node: Entity) -> bool {
        self.world.get::<Transform3D>(node).is_some()
    }

    /// Spawns a named node under `parent` (the scene root when `None`).
    pub fn spawn_node(&mut self, name: impl Into<String>, transform: Transform3D, parent: Option<Entity>) -> Entity {
        let parent = parent.filter(|p| self.contains(*p)).unwrap_or(self.root);
        let node = self.world.spawn((NodeName(name.into()), transform, Parent(parent), Children::default())).id();
        if let Some(mut children) = self.world.get_mut::<Children>(parent) {
            children.0.push(node);
        }
        node
    }

    /// Removes `node` and everything below it. The scene root cannot be removed.
    pub fn despawn_recursive(&mut self, node: Entity) -> bool {
        if node == self.root || !self.contains(node) {
            return false;
        }
        if let Some(parent) = self.parent(node) {
            if let Some(mut children) = self.world.get_mut::<Children>(parent) {
                children.0.retain(|child| *child != node);
            }
        }
        let mut stack = vec![node];
        while let Some(current) = stack.pop() {
            if let Some(children) = self.world.get::<Children>(current) {
                stack.extend(children.0.iter().copied());
            }
            self.world.despawn(current);
        }
        true
    }

    pub fn insert<C: Component>(&mut self, node: Entity, component: C) -> bool {
        if !self.contains(node) {
            return false;
        }
        self.world.entity_mut(node).insert(component);
        true
    }

    pub fn get<C: Component>(&self, node: Entity) -> Option<&C> {
        self.world.get::<C>(node)
    }

    pub fn transform(&self, node: Entity) -> Option<Transform3D> {
        self.world.get::<Transform3D>(node).copied()
    }

    pub fn set_transform(&mut self, node: Entity, transform: Transform3D) -> bool {
        match self.world.get_mut::<Transform3D>(node) {
            Some(mut current) => {
                *current = transform;
                true
            }
            None => false,
        }
    }

    pub fn set_translation_rotation(&mut self, node: Entity, translation: Vec3, rotation: Quat) -> bool {
        match self.world.get_mut::<Transform3D>(node) {
            Some(mut current) => {
                current.translation = translation;
                current.rotation = rotation;
                true
            }
            None => false,
        }
    }

    pub fn name(&self, node: Entity) -> Option<&str> {
        self.world.get::<NodeName>(node).map(|name| name.0.as_str())
    }

    pub fn parent(&self, node: Entity) -> Option<Entity> {
        self.world.get::<Parent>(node).map(|parent| parent.0)
    }

    pub fn children(&self, node: Entity) -> &[Entity] {
        self.world.get::<Children>(node).map(|children| children.0.as_slice()).unwrap_or(&[])
    }

    pub fn object_id(&self, node: Entity) -> Option<&SceneObjectId> {
        self.world.get::<SceneObjectTag>(node).map(|tag| &tag.id)
    }

    /// Walks from `node` up through its ancestors and returns the first node carrying `C`.
    pub fn find_ancestor_with<C: Component>(&self, node: Entity) -> Option<Entity> {
        let mut current = Some(node);
        let mut depth = 0;
        while let Some(candidate) = current {
            if self.world.get::<C>(candidate).is_some() {
                return Some(candidate);
            }
            depth += 1;
            if depth > MAX_HIERARCHY_DEPTH {
                break;
            }
            current = self.parent(candidate);
        }
        None
    }

    /// True when `node` is `ancestor` itself or sits anywhere below it.
    pub fn is_self_or_descendant(&self, node: Entity, ancestor: Entity) -> bool {
        let mut current = Some(node);
        let mut depth = 0;
        while let Some(candidate) = current {
            if candidate == ancestor {
                return true;
            }
            depth += 1;
            if depth > MAX_HIERARCHY_DEPTH {
                break;
            }
            current = self.parent(candidate);
        }
        false
    }

    pub fn world_matrix(&self, node: Entity) -> Option<Mat4> {
        let mut chain: SmallVec<[Mat4; 8]> = SmallVec::new();
        let mut current = Some(node);
        while let Some(candidate) = current {
            chain.push(self.world.get::<Transform3D>(candidate)?.matrix());
            if chain.len() > MAX_HIERARCHY_DEPTH {
                return None;
            }
            current = self.parent(candidate);
        }
        Some(chain.iter().rev().fold(Mat4::IDENTITY, |acc, local| acc * *local))
    }

    pub fn world_position(&self, node: Entity) -> Option<Vec3> {
        self.world_matrix(node).map(|m| m.transform_point3(Vec3::ZERO))
    }

    pub fn find_by_name(&mut self, name: &str) -> Option<Entity> {
        let mut query = self.world.query::<(Entity, &NodeName)>();
        query.iter(&self.world).find(|(_, node_name)| node_name.0 == name).map(|(entity, _)| entity)
    }

    pub fn find_by_object_id(&mut self, id: &SceneObjectId) -> Option<Entity> {
        let mut query = self.world.query::<(Entity, &SceneObjectTag)>();
        query.iter(&self.world).find(|(_, tag)| &tag.id == id).map(|(entity, _)| entity)
    }

    /// Casts a ray against every node with a [`PickShape`] and returns hits nearest first.
    ///
    /// `direction` does not need to be normalized; a zero-length direction yields no hits.
    pub fn raycast(&mut self, origin: Vec3, direction: Vec3, max_distance: f32) -> RayHits {
        let mut hits = RayHits::new();
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO || !origin.is_finite() {
            return hits;
        }
        let shapes: SmallVec<[(Entity, PickShape); 32]> = {
            let mut query = self.world.query::<(Entity, &PickShape)>();
            query.iter(&self.world).map(|(entity, shape)| (entity, *shape)).collect()
        };
        for (node, shape) in shapes {
            let Some(world) = self.world_matrix(node) else {
                continue;
            };
            let distance = match shape {
                PickShape::Cuboid { half_extents } => picking::ray_hit_box(origin, dir, &world, half_extents),
                PickShape::Ball { radius } => picking::ray_hit_ball(origin, dir, &world, radius),
            };
            if let Some(distance) = distance {
                if distance <= max_distance {
                    hits.push(RayHit { node, distance });
                }
            }
        }
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Depth-first listing of named nodes, used by the hierarchy panel.
    pub fn hierarchy(&self) -> Vec<HierarchyEntry> {
        let mut out = Vec::new();
        let mut stack = vec![(self.root, 0usize)];
        while let Some((node, depth)) = stack.pop() {
            if let Some(name) = self.name(node) {
                out.push(HierarchyEntry { node, name: name.to_string(), depth });
            }
            for child in self.children(node).iter().rev() {
                stack.push((*child, depth + 1));
            }
        }
        out
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(graph: &mut SceneGraph, name: &str, at: Vec3, parent: Option<Entity>) -> Entity {
        let node = graph.spawn_node(name, Transform3D::from_translation(at), parent);
        graph.insert(node, PickShape::Cuboid { half_extents: Vec3::splat(0.5) });
        node
    }

    #[test]
    fn raycast_orders_hits_by_distance() {
        let mut graph = SceneGraph::new();
        let far = boxed(&mut graph, "far", Vec3::new(0.0, 0.0, -10.0), None);
        let near = boxed(&mut graph, "near", Vec3::new(0.0, 0.0, -4.0), None);
        let hits = graph.raycast(Vec3::ZERO, Vec3::NEG_Z, 100.0);
        assert_eq!(hits.iter().map(|hit| hit.node).collect::<Vec<_>>(), vec![near, far]);
        assert!((hits[0].distance - 3.5).abs() < 1e-4);

        let limited = graph.raycast(Vec3::ZERO, Vec3::NEG_Z, 5.0);
        assert_eq!(limited.len(), 1);
        assert!(graph.raycast(Vec3::ZERO, Vec3::ZERO, 100.0).is_empty());
    }

    #[test]
    fn child_world_matrix_includes_parent() {
        let mut graph = SceneGraph::new();
        let parent = graph.spawn_node("parent", Transform3D::from_translation(Vec3::new(1.0, 2.0, 3.0)), None);
        let child = boxed(&mut graph, "child", Vec3::new(0.0, 1.0, 0.0), Some(parent));
        let pos = graph.world_position(child).expect("child position");
        assert!((pos - Vec3::new(1.0, 3.0, 3.0)).length() < 1e-5);
        assert!(graph.is_self_or_descendant(child, parent));
        assert!(!graph.is_self_or_descendant(parent, child));
        graph.insert(parent, EntityRoot);
        assert_eq!(graph.find_ancestor_with::<EntityRoot>(child), Some(parent));
    }

    #[test]
    fn despawn_removes_subtree() {
        let mut graph = SceneGraph::new();
        let parent = graph.spawn_node("parent", Transform3D::default(), None);
        let child = boxed(&mut graph, "child", Vec3::ZERO, Some(parent));
        assert!(graph.despawn_recursive(parent));
        assert!(!graph.contains(child));
        assert!(graph.children(graph.root()).is_empty());
        assert!(!graph.despawn_recursive(graph.root()));
    }

    #[test]
    fn hierarchy_lists_depth_first() {
        let mut graph = SceneGraph::new();
        let a = graph.spawn_node("A", Transform3D::default(), None);
        graph.spawn_node("A.1", Transform3D::default(), Some(a));
        graph.spawn_node("B", Transform3D::default(), None);
        let names: Vec<(String, usize)> = graph.hierarchy().into_iter().map(|e| (e.name, e.depth)).collect();
        assert_eq!(
            names,
            vec![("Scene".to_string(), 0), ("A".to_string(), 1), ("A.1".to_string(), 2), ("B".to_string(), 1)]
        );
    }
}
