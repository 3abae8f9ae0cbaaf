use bevy_ecs::prelude::Entity;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::editor::EditorState;
use crate::scene_graph::{SceneGraph, Transform3D};

pub(crate) const SCALE_MIN_RATIO: f32 = 0.05;
pub(crate) const SCALE_MAX_RATIO: f32 = 20.0;
pub(crate) const SCALE_SNAP_STEP: f32 = 0.1;
pub(crate) const TRANSLATE_SNAP_STEP: f32 = 0.05;
pub(crate) const ROTATE_SNAP_STEP_RADIANS: f32 = 15.0_f32.to_radians();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    #[default]
    Translate,
    Rotate,
    Scale,
}

impl TransformMode {
    pub fn label(self) -> &'static str {
        match self {
            TransformMode::Translate => "translate",
            TransformMode::Rotate => "rotate",
            TransformMode::Scale => "scale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis3 {
    X,
    Y,
    Z,
}

impl Axis3 {
    pub fn index(self) -> usize {
        match self {
            Axis3::X => 0,
            Axis3::Y => 1,
            Axis3::Z => 2,
        }
    }
}

/// Drag input for the active gizmo, expressed relative to where the gesture started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GizmoDrag {
    Translate(Vec3),
    Rotate { axis: Vec3, angle: f32 },
    Scale { ratio: f32, axis: Option<Axis3> },
}

pub(crate) fn apply_scale_ratio(ratio: f32, snap: bool) -> f32 {
    let clamped = ratio.clamp(SCALE_MIN_RATIO, SCALE_MAX_RATIO);
    if snap {
        let snapped = (clamped / SCALE_SNAP_STEP).round() * SCALE_SNAP_STEP;
        snapped.clamp(SCALE_MIN_RATIO, SCALE_MAX_RATIO)
    } else {
        clamped
    }
}

fn snap_value(value: f32, step: f32) -> f32 {
    (value / step).round() * step
}

/// One manipulation gesture on the selected live node.
///
/// Drags move only the live node. The store learns about the result once, when the gesture
/// finishes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GizmoSession {
    node: Entity,
    mode: TransformMode,
    start: Transform3D,
    snap: bool,
}

impl GizmoSession {
    /// Starts a gesture on the current selection. Nothing to manipulate in play mode or without a
    /// selection.
    pub fn begin(editor: &EditorState, graph: &SceneGraph, snap: bool) -> Option<Self> {
        if editor.is_play_mode() {
            return None;
        }
        let node = editor.selected()?;
        // Static world roots are selectable but have nothing in the store to write back to.
        graph.object_id(node)?;
        let start = graph.transform(node)?;
        Some(Self { node, mode: editor.transform_mode(), start, snap })
    }

    pub fn node(&self) -> Entity {
        self.node
    }

    pub fn mode(&self) -> TransformMode {
        self.mode
    }

    /// Applies a drag. Drags that do not match the session's mode are ignored.
    pub fn drag(&self, graph: &mut SceneGraph, drag: GizmoDrag) -> bool {
        let mut next = self.start;
        match (self.mode, drag) {
            (TransformMode::Translate, GizmoDrag::Translate(delta)) => {
                let delta = if self.snap {
                    Vec3::new(
                        snap_value(delta.x, TRANSLATE_SNAP_STEP),
                        snap_value(delta.y, TRANSLATE_SNAP_STEP),
                        snap_value(delta.z, TRANSLATE_SNAP_STEP),
                    )
                } else {
                    delta
                };
                next.translation = self.start.translation + delta;
            }
            (TransformMode::Rotate, GizmoDrag::Rotate { axis, angle }) => {
                let axis = axis.normalize_or_zero();
                if axis == Vec3::ZERO || !angle.is_finite() {
                    return false;
                }
                let angle = if self.snap { snap_value(angle, ROTATE_SNAP_STEP_RADIANS) } else { angle };
                next.rotation = (Quat::from_axis_angle(axis, angle) * self.start.rotation).normalize();
            }
            (TransformMode::Scale, GizmoDrag::Scale { ratio, axis }) => {
                if !ratio.is_finite() {
                    return false;
                }
                let ratio = apply_scale_ratio(ratio, self.snap);
                match axis {
                    Some(axis) => next.scale[axis.index()] = self.start.scale[axis.index()] * ratio,
                    None => next.scale = self.start.scale * ratio,
                }
            }
            _ => return false,
        }
        graph.set_transform(self.node, next)
    }

    /// Ends the gesture and writes the node's final transform back into the store.
    pub fn finish(self, editor: &mut EditorState, graph: &SceneGraph) -> bool {
        editor.sync_object_transform_from_3d(graph, self.node)
    }

    /// Ends the gesture without committing, restoring the starting transform.
    pub fn cancel(self, graph: &mut SceneGraph) {
        graph.set_transform(self.node, self.start);
    }
}
