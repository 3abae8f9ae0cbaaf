use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::rc::Rc;

use bevy_ecs::prelude::Entity;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use winit::dpi::PhysicalSize;

use crate::camera3d::Camera3D;
use crate::gizmo::{Axis3, TransformMode};
use crate::physics::BodyKind;
use crate::scene_graph::{EntityRoot, SceneGraph};
use crate::scripts::ScriptScheduler;

pub const INTERACTABLE_BASE_COLOR: &str = "#fca311";
pub const INTERACTABLE_ALT_COLOR: &str = "#9b5de5";
const SPINNER_COLOR: &str = "#e56b6f";
const PRIMITIVE_COLOR: &str = "#cccccc";
const DUPLICATE_OFFSET: f32 = 1.5;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneObjectId(String);

impl SceneObjectId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SceneObjectKind {
    KinematicSpinner,
    StaticInteractable,
    PrimitiveCube,
    PrimitiveSphere,
}

impl SceneObjectKind {
    /// Capitalised label used for generated display names.
    pub fn label(self) -> &'static str {
        match self {
            SceneObjectKind::KinematicSpinner => "SpinningCube",
            SceneObjectKind::StaticInteractable => "StaticBox",
            SceneObjectKind::PrimitiveCube => "Cube",
            SceneObjectKind::PrimitiveSphere => "Sphere",
        }
    }

    pub fn default_color(self) -> &'static str {
        match self {
            SceneObjectKind::KinematicSpinner => SPINNER_COLOR,
            SceneObjectKind::StaticInteractable => INTERACTABLE_BASE_COLOR,
            SceneObjectKind::PrimitiveCube | SceneObjectKind::PrimitiveSphere => PRIMITIVE_COLOR,
        }
    }

    pub fn default_speed(self) -> Option<f32> {
        match self {
            SceneObjectKind::KinematicSpinner => Some(0.5),
            _ => None,
        }
    }

    pub fn body_kind(self) -> BodyKind {
        match self {
            SceneObjectKind::KinematicSpinner => BodyKind::KinematicPosition,
            SceneObjectKind::StaticInteractable => BodyKind::Fixed,
            SceneObjectKind::PrimitiveCube | SceneObjectKind::PrimitiveSphere => BodyKind::Dynamic,
        }
    }
}

/// Properties of a scene object. Transform fields are always present; rotation is XYZ Euler radians.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectProperties {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f32>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ObjectProperties {
    pub fn at(position: [f32; 3]) -> Self {
        Self {
            position,
            rotation: [0.0; 3],
            scale: [1.0; 3],
            color: None,
            speed: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn for_kind(kind: SceneObjectKind, position: [f32; 3]) -> Self {
        Self {
            color: Some(kind.default_color().to_string()),
            speed: kind.default_speed(),
            ..Self::at(position)
        }
    }
}

/// Partial property update; `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyPatch {
    pub position: Option<[f32; 3]>,
    pub rotation: Option<[f32; 3]>,
    pub scale: Option<[f32; 3]>,
    pub color: Option<String>,
    pub speed: Option<f32>,
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PropertyPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, value: [f32; 3]) -> Self {
        self.position = Some(value);
        self
    }

    pub fn rotation(mut self, value: [f32; 3]) -> Self {
        self.rotation = Some(value);
        self
    }

    pub fn scale(mut self, value: [f32; 3]) -> Self {
        self.scale = Some(value);
        self
    }

    pub fn color(mut self, value: impl Into<String>) -> Self {
        self.color = Some(value.into());
        self
    }

    pub fn speed(mut self, value: f32) -> Self {
        self.speed = Some(value);
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// A patch carrying every field of `props`.
    pub fn from_properties(props: &ObjectProperties) -> Self {
        Self {
            position: Some(props.position),
            rotation: Some(props.rotation),
            scale: Some(props.scale),
            color: props.color.clone(),
            speed: props.speed,
            extra: props.extra.clone(),
        }
    }

    fn apply(&self, props: &mut ObjectProperties) -> bool {
        let before = props.clone();
        if let Some(position) = self.position {
            props.position = position;
        }
        if let Some(rotation) = self.rotation {
            props.rotation = rotation;
        }
        if let Some(scale) = self.scale {
            props.scale = scale;
        }
        if let Some(color) = &self.color {
            props.color = Some(color.clone());
        }
        if let Some(speed) = self.speed {
            props.speed = Some(speed);
        }
        for (key, value) in &self.extra {
            props.extra.insert(key.clone(), value.clone());
        }
        *props != before
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneObject {
    pub id: SceneObjectId,
    pub kind: SceneObjectKind,
    pub display_name: String,
    pub properties: ObjectProperties,
    #[serde(skip)]
    revision: u64,
}

impl SceneObject {
    fn new(kind: SceneObjectKind, display_name: impl Into<String>, properties: ObjectProperties) -> Self {
        Self { id: SceneObjectId::generate(), kind, display_name: display_name.into(), properties, revision: 0 }
    }

    /// Bumped whenever the properties actually change.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformField {
    Position,
    Rotation,
    Scale,
}

/// Parses a numeric inspector field. Anything that is not a finite number reads as 0.
pub fn parse_numeric_field(text: &str) -> f32 {
    text.trim().parse::<f32>().ok().filter(|value| value.is_finite()).unwrap_or(0.0)
}

/// Session-wide editor state and the canonical store of scene objects.
///
/// The live scene graph only mirrors these records; nodes carry an id back-reference and nothing
/// else. Selection is a live node, and the selected record is found through that node's tag.
pub struct EditorState {
    play_mode: bool,
    selected: Option<Entity>,
    transform_mode: TransformMode,
    objects: HashMap<SceneObjectId, SceneObject>,
    order: Vec<SceneObjectId>,
    scheduler: Rc<ScriptScheduler>,
}

impl EditorState {
    pub fn new(scheduler: Rc<ScriptScheduler>) -> Self {
        Self {
            play_mode: false,
            selected: None,
            transform_mode: TransformMode::default(),
            objects: HashMap::new(),
            order: Vec::new(),
            scheduler,
        }
    }

    /// Seeds the store with the sandbox's starting objects.
    pub fn with_default_objects(scheduler: Rc<ScriptScheduler>) -> Self {
        let mut editor = Self::new(scheduler);
        editor.seed_default_objects();
        editor
    }

    pub fn seed_default_objects(&mut self) {
        use SceneObjectKind::*;
        let seeds = [
            (KinematicSpinner, "SpinningCube_1", [8.0, 1.0, 0.0]),
            (StaticInteractable, "InteractBox_1", [-5.0, 0.5, 5.0]),
            (StaticInteractable, "InteractBox_2", [-5.0, 1.5, 5.0]),
            (StaticInteractable, "StaticBox_1", [0.0, 0.5, -8.0]),
        ];
        for (kind, name, position) in seeds {
            self.insert(SceneObject::new(kind, name, ObjectProperties::for_kind(kind, position)));
        }
    }

    fn insert(&mut self, object: SceneObject) -> SceneObjectId {
        let id = object.id.clone();
        self.order.push(id.clone());
        self.objects.insert(id.clone(), object);
        id
    }

    pub fn is_play_mode(&self) -> bool {
        self.play_mode
    }

    /// Switches between play and edit mode. Leaving play mode always clears the selection.
    pub fn set_play_mode(&mut self, play: bool) {
        if !play {
            self.selected = None;
        }
        if self.play_mode != play {
            log::info!("[editor] {} mode", if play { "play" } else { "edit" });
        }
        self.play_mode = play;
    }

    pub fn transform_mode(&self) -> TransformMode {
        self.transform_mode
    }

    pub fn set_transform_mode(&mut self, mode: TransformMode) {
        self.transform_mode = mode;
    }

    pub fn selected(&self) -> Option<Entity> {
        self.selected
    }

    /// Selects a live node. Selecting is ignored while playing; clearing always works.
    pub fn set_selected(&mut self, node: Option<Entity>) {
        if self.play_mode && node.is_some() {
            log::debug!("[editor] ignoring selection while in play mode");
            return;
        }
        self.selected = node;
    }

    /// The record behind the current selection, if the selected node is tagged.
    pub fn selected_object(&self, graph: &SceneGraph) -> Option<&SceneObject> {
        let id = graph.object_id(self.selected?)?;
        self.objects.get(id)
    }

    pub fn object(&self, id: &SceneObjectId) -> Option<&SceneObject> {
        self.objects.get(id)
    }

    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.order.iter().filter_map(|id| self.objects.get(id))
    }

    pub fn object_count(&self) -> usize {
        self.order.len()
    }

    pub fn contains(&self, id: &SceneObjectId) -> bool {
        self.objects.contains_key(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&SceneObject> {
        self.objects().find(|object| object.display_name == name)
    }

    /// Adds a new object of `kind` and selects its live node once the next render has built it.
    pub fn create_object(&mut self, kind: SceneObjectKind) -> SceneObjectId {
        let count = self.objects().filter(|object| object.kind == kind).count();
        let name = format!("{}_{}", kind.label(), count + 1);
        let id = self.insert(SceneObject::new(kind, name.clone(), ObjectProperties::for_kind(kind, [0.0, 1.0, 0.0])));
        log::info!("[editor] created {name} ({id})");
        self.defer_select(id.clone());
        id
    }

    /// Shallow-merges `patch` into the object's properties. Unknown ids are ignored.
    pub fn update_object(&mut self, id: &SceneObjectId, patch: &PropertyPatch) -> bool {
        let Some(object) = self.objects.get_mut(id) else {
            log::debug!("[editor] update for unknown object {id} ignored");
            return false;
        };
        let changed = patch.apply(&mut object.properties);
        if changed {
            object.revision += 1;
        }
        changed
    }

    /// Copies the live node's transform into the store entry it is tagged with.
    pub fn sync_object_transform_from_3d(&mut self, graph: &SceneGraph, node: Entity) -> bool {
        let Some(id) = graph.object_id(node).cloned() else {
            return false;
        };
        let Some(transform) = graph.transform(node) else {
            return false;
        };
        let patch = PropertyPatch::new()
            .position(transform.translation.to_array())
            .rotation(transform.euler_rotation())
            .scale(transform.scale.to_array());
        self.update_object(&id, &patch);
        self.contains(&id)
    }

    pub fn delete_object(&mut self, id: &SceneObjectId) -> bool {
        if self.objects.remove(id).is_none() {
            return false;
        }
        self.order.retain(|existing| existing != id);
        log::info!("[editor] deleted object {id}");
        true
    }

    /// Copies an object next to the original and selects the copy after the next render.
    pub fn duplicate_object(&mut self, id: &SceneObjectId) -> Option<SceneObjectId> {
        let source = self.objects.get(id)?;
        let mut properties = source.properties.clone();
        properties.position[0] += DUPLICATE_OFFSET;
        let base = format!("{}_clone", source.display_name);
        let mut name = base.clone();
        let mut suffix = 2;
        while self.find_by_name(&name).is_some() {
            name = format!("{base}_{suffix}");
            suffix += 1;
        }
        let kind = source.kind;
        let new_id = self.insert(SceneObject::new(kind, name, properties));
        self.defer_select(new_id.clone());
        Some(new_id)
    }

    pub fn delete_selected(&mut self, graph: &SceneGraph) -> bool {
        let Some(id) = self.selected_object(graph).map(|object| object.id.clone()) else {
            return false;
        };
        self.selected = None;
        self.delete_object(&id)
    }

    pub fn duplicate_selected(&mut self, graph: &SceneGraph) -> Option<SceneObjectId> {
        let id = self.selected_object(graph)?.id.clone();
        self.duplicate_object(&id)
    }

    /// Selects the live root tagged with `id`. Returns false when the graph has no such node yet.
    pub fn select_object(&mut self, graph: &mut SceneGraph, id: &SceneObjectId) -> bool {
        match graph.find_by_object_id(id) {
            Some(node) => {
                self.set_selected(Some(node));
                self.selected == Some(node)
            }
            None => {
                log::debug!("[editor] no live node for {id}");
                false
            }
        }
    }

    fn defer_select(&self, id: SceneObjectId) {
        self.scheduler.after_next_render(Box::new(move |ctx| {
            ctx.editor.select_object(ctx.graph, &id);
        }));
    }

    /// Picks the nearest entity under a screen position. A miss clears the selection.
    pub fn select_at(
        &mut self,
        graph: &mut SceneGraph,
        camera: &Camera3D,
        viewport: PhysicalSize<u32>,
        screen: glam::Vec2,
    ) -> Option<Entity> {
        if self.play_mode {
            return None;
        }
        let picked = camera.screen_ray(screen, viewport).and_then(|(origin, dir)| {
            let hits = graph.raycast(origin, dir, camera.far);
            hits.first().and_then(|hit| graph.find_ancestor_with::<EntityRoot>(hit.node))
        });
        self.set_selected(picked);
        picked
    }

    /// Applies an inspector edit to one axis of the selected object's transform. Rotation is
    /// entered in degrees.
    pub fn edit_selected_field(&mut self, graph: &SceneGraph, field: TransformField, axis: Axis3, text: &str) -> bool {
        let Some(object) = self.selected_object(graph) else {
            return false;
        };
        let id = object.id.clone();
        let mut value = parse_numeric_field(text);
        let props = &object.properties;
        let patch = match field {
            TransformField::Position => {
                let mut position = props.position;
                position[axis.index()] = value;
                PropertyPatch::new().position(position)
            }
            TransformField::Rotation => {
                value = value.to_radians();
                let mut rotation = props.rotation;
                rotation[axis.index()] = value;
                PropertyPatch::new().rotation(rotation)
            }
            TransformField::Scale => {
                let mut scale = props.scale;
                scale[axis.index()] = value;
                PropertyPatch::new().scale(scale)
            }
        };
        self.update_object(&id, &patch)
    }
}
