use std::collections::HashMap;

use bevy_ecs::prelude::*;
use glam::Vec3;

use crate::behaviours::{color_toggle_interactable, ColorToggle, SpinnerScript};
use crate::editor::{EditorState, SceneObject, SceneObjectId, SceneObjectKind};
use crate::physics::{BodyDesc, BodyKind, BodyLink, ColliderShape, PhysicsWorld, RigidBodyHandle};
use crate::scene_graph::{EntityRoot, MeshColor, PickShape, SceneGraph, SceneObjectTag, Transform3D};
use crate::scripts::{script_handle, ScriptHandle, ScriptScheduler};

pub const SPINNER_PRIORITY: i32 = 0;

const FLOOR_COLOR: &str = "#3a5a40";
const WALL_COLOR: &str = "#8a817c";

struct StaticPiece {
    name: &'static str,
    center: [f32; 3],
    size: [f32; 3],
    color: &'static str,
}

const STATIC_WORLD: [StaticPiece; 3] = [
    StaticPiece { name: "Floor", center: [0.0, -0.5, 0.0], size: [100.0, 1.0, 100.0], color: FLOOR_COLOR },
    StaticPiece { name: "BackWall", center: [0.0, 2.5, -15.0], size: [20.0, 5.0, 1.0], color: WALL_COLOR },
    StaticPiece { name: "LeftWall", center: [-10.0, 2.5, -5.0], size: [1.0, 5.0, 20.0], color: WALL_COLOR },
];

struct LiveObject {
    root: Entity,
    body: RigidBodyHandle,
    revision: u64,
    spinner: Option<ScriptHandle>,
}

/// Projects the scene object store onto the live graph and physics world.
///
/// `commit` plays the role of a render pass: it is the point at which store edits become visible
/// as nodes, so anything waiting on the live graph runs after it.
#[derive(Default)]
pub struct SceneComposer {
    live: HashMap<SceneObjectId, LiveObject>,
    static_roots: Vec<Entity>,
    commits: u64,
}

impl SceneComposer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commits(&self) -> u64 {
        self.commits
    }

    pub fn live_root(&self, id: &SceneObjectId) -> Option<Entity> {
        self.live.get(id).map(|live| live.root)
    }

    pub fn static_roots(&self) -> &[Entity] {
        &self.static_roots
    }

    pub fn commit(
        &mut self,
        graph: &mut SceneGraph,
        physics: &mut PhysicsWorld,
        editor: &mut EditorState,
        scheduler: &ScriptScheduler,
    ) {
        if self.static_roots.is_empty() {
            self.build_static_world(graph, physics);
        }

        let stale: Vec<SceneObjectId> = self.live.keys().filter(|id| !editor.contains(id)).cloned().collect();
        for id in stale {
            if let Some(live) = self.live.remove(&id) {
                Self::despawn(live, graph, physics, editor, scheduler);
            }
        }

        for object in editor.objects() {
            match self.live.get_mut(&object.id) {
                Some(live) if live.revision != object.revision() => {
                    Self::apply_object(live, object, graph, physics);
                }
                Some(_) => {}
                None => {
                    let live = Self::materialize(object, graph, physics, scheduler);
                    self.live.insert(object.id.clone(), live);
                }
            }
        }

        if editor.is_play_mode() {
            Self::copy_body_poses(graph, physics);
        }
        self.commits += 1;
    }

    /// Puts every live object back to its stored state. Used when switching between play and edit.
    pub fn reset_from_store(&mut self, graph: &mut SceneGraph, physics: &mut PhysicsWorld, editor: &EditorState) {
        for object in editor.objects() {
            if let Some(live) = self.live.get_mut(&object.id) {
                Self::apply_object(live, object, graph, physics);
            }
        }
        log::debug!("[composer] reset {} live objects from the store", self.live.len());
    }

    fn build_static_world(&mut self, graph: &mut SceneGraph, physics: &mut PhysicsWorld) {
        for piece in &STATIC_WORLD {
            let center = Vec3::from(piece.center);
            let half_extents = Vec3::from(piece.size) * 0.5;
            let body = physics.add_body(&BodyDesc::new(BodyKind::Fixed, center, ColliderShape::Cuboid { half_extents }));
            let root = graph.spawn_node(format!("{}_Root", piece.name), Transform3D::from_translation(center), None);
            graph.insert(root, EntityRoot);
            graph.insert(root, BodyLink(body));
            graph.insert(root, PickShape::Cuboid { half_extents });
            graph.insert(root, MeshColor(piece.color.to_string()));
            self.static_roots.push(root);
        }
    }

    fn materialize(
        object: &SceneObject,
        graph: &mut SceneGraph,
        physics: &mut PhysicsWorld,
        scheduler: &ScriptScheduler,
    ) -> LiveObject {
        let transform = object_transform(object);
        let root = graph.spawn_node(format!("{}_Root", object.display_name), transform, None);
        graph.insert(root, EntityRoot);
        graph.insert(root, SceneObjectTag::new(object.id.clone()));
        let mesh = graph.spawn_node(object.display_name.clone(), Transform3D::default(), Some(root));
        graph.insert(mesh, pick_shape(object.kind));

        let spinner = (object.kind == SceneObjectKind::KinematicSpinner).then(|| {
            let handle = script_handle(SpinnerScript::new(object.id.clone()));
            scheduler.register(handle.clone(), SPINNER_PRIORITY);
            handle
        });

        let body = physics.add_body(&body_desc(object, &transform));
        graph.insert(root, BodyLink(body));
        Self::apply_look(root, object, graph);
        log::debug!("[composer] materialized {} ({})", object.display_name, object.id);
        LiveObject { root, body, revision: object.revision(), spinner }
    }

    /// Pushes the stored transform and look of `object` onto its live node and rebuilds its body.
    fn apply_object(live: &mut LiveObject, object: &SceneObject, graph: &mut SceneGraph, physics: &mut PhysicsWorld) {
        let transform = object_transform(object);
        graph.set_transform(live.root, transform);

        physics.remove_body(live.body);
        live.body = physics.add_body(&body_desc(object, &transform));
        graph.insert(live.root, BodyLink(live.body));
        Self::apply_look(live.root, object, graph);
        live.revision = object.revision();
    }

    /// Colour and interaction state, both reset to what the store says.
    fn apply_look(root: Entity, object: &SceneObject, graph: &mut SceneGraph) {
        let color = object.properties.color.clone().unwrap_or_else(|| object.kind.default_color().to_string());
        graph.insert(root, MeshColor(color.clone()));
        if object.kind == SceneObjectKind::StaticInteractable {
            graph.insert(root, ColorToggle::new(color));
            graph.insert(root, color_toggle_interactable());
        }
    }

    fn despawn(
        live: LiveObject,
        graph: &mut SceneGraph,
        physics: &mut PhysicsWorld,
        editor: &mut EditorState,
        scheduler: &ScriptScheduler,
    ) {
        if editor.selected() == Some(live.root) {
            editor.set_selected(None);
        }
        if let Some(spinner) = &live.spinner {
            scheduler.unregister(spinner);
        }
        physics.remove_body(live.body);
        graph.despawn_recursive(live.root);
    }

    fn copy_body_poses(graph: &mut SceneGraph, physics: &PhysicsWorld) {
        let links: Vec<(Entity, RigidBodyHandle)> = {
            let mut query = graph.world.query::<(Entity, &BodyLink)>();
            query.iter(&graph.world).map(|(entity, link)| (entity, link.0)).collect()
        };
        for (node, body) in links {
            if let (Some(translation), Some(rotation)) = (physics.translation(body), physics.rotation(body)) {
                graph.set_translation_rotation(node, translation, rotation);
            }
        }
    }
}

fn object_transform(object: &SceneObject) -> Transform3D {
    let props = &object.properties;
    Transform3D::from_euler(props.position, props.rotation, props.scale)
}

fn pick_shape(kind: SceneObjectKind) -> PickShape {
    match kind {
        SceneObjectKind::PrimitiveSphere => PickShape::Ball { radius: 1.0 },
        _ => PickShape::Cuboid { half_extents: Vec3::splat(0.5) },
    }
}

fn body_desc(object: &SceneObject, transform: &Transform3D) -> BodyDesc {
    let scale = transform.scale.abs().max(Vec3::splat(0.01));
    let shape = match object.kind {
        SceneObjectKind::PrimitiveSphere => ColliderShape::Ball { radius: scale.max_element() },
        _ => ColliderShape::Cuboid { half_extents: scale * 0.5 },
    };
    BodyDesc::new(object.kind.body_kind(), transform.translation, shape).with_rotation(transform.rotation)
}
