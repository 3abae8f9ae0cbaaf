use anyhow::Result;
use bevy_ecs::prelude::*;
use glam::{EulerRot, Quat};

use crate::editor::{SceneObjectId, INTERACTABLE_ALT_COLOR};
use crate::interaction::Interactable;
use crate::physics::BodyLink;
use crate::scene_graph::{MeshColor, SceneGraph};
use crate::scripts::{FrameContext, Script};

pub const PROMPT_CHANGE_COLOR: &str = "Change Color";
pub const PROMPT_CHANGE_COLOR_BACK: &str = "Change Color Back";

const DEFAULT_SPIN_SPEED: f32 = 1.0;

/// Spins a kinematic body about X and Y while playing. Speed is read from the store each frame.
pub struct SpinnerScript {
    id: SceneObjectId,
    node: Option<Entity>,
    elapsed: f32,
}

impl SpinnerScript {
    pub fn new(id: SceneObjectId) -> Self {
        Self { id, node: None, elapsed: 0.0 }
    }

    pub fn object_id(&self) -> &SceneObjectId {
        &self.id
    }

    pub fn spin_at(elapsed: f32, speed: f32) -> Quat {
        Quat::from_euler(EulerRot::XYZ, elapsed * speed * 0.5, elapsed * speed, 0.0)
    }

    fn resolve_node(&mut self, graph: &mut SceneGraph) -> Option<Entity> {
        if let Some(node) = self.node {
            if graph.object_id(node) == Some(&self.id) {
                return Some(node);
            }
        }
        self.node = graph.find_by_object_id(&self.id);
        self.node
    }
}

impl Script for SpinnerScript {
    fn update(&mut self, ctx: &mut FrameContext<'_>, dt: f32) -> Result<()> {
        if !ctx.editor.is_play_mode() {
            self.elapsed = 0.0;
            return Ok(());
        }
        let Some(speed) = ctx.editor.object(&self.id).map(|o| o.properties.speed.unwrap_or(DEFAULT_SPIN_SPEED)) else {
            return Ok(());
        };
        self.elapsed += dt;
        let Some(node) = self.resolve_node(ctx.graph) else {
            return Ok(());
        };
        if let Some(BodyLink(body)) = ctx.graph.get::<BodyLink>(node).copied() {
            ctx.physics.set_next_kinematic_rotation(body, Self::spin_at(self.elapsed, speed));
        }
        Ok(())
    }

    fn label(&self) -> &str {
        "spinner"
    }
}

/// Live-only colour state for an interactable box. Play-time toggles never reach the store.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct ColorToggle {
    pub base: String,
    pub alternate: String,
    pub showing_alternate: bool,
}

impl ColorToggle {
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into(), alternate: INTERACTABLE_ALT_COLOR.to_string(), showing_alternate: false }
    }

    pub fn current(&self) -> &str {
        if self.showing_alternate {
            &self.alternate
        } else {
            &self.base
        }
    }

    pub fn prompt(&self) -> &'static str {
        if self.showing_alternate {
            PROMPT_CHANGE_COLOR_BACK
        } else {
            PROMPT_CHANGE_COLOR
        }
    }
}

pub fn color_toggle_interactable() -> Interactable {
    Interactable::new(PROMPT_CHANGE_COLOR, toggle_color)
}

fn toggle_color(graph: &mut SceneGraph, node: Entity) {
    let Some(mut toggle) = graph.get::<ColorToggle>(node).cloned() else {
        return;
    };
    toggle.showing_alternate = !toggle.showing_alternate;
    let color = toggle.current().to_string();
    let prompt = toggle.prompt();
    if let Some(mut interactable) = graph.get::<Interactable>(node).cloned() {
        interactable.prompt_message = prompt.to_string();
        graph.insert(node, interactable);
    }
    log::info!("[interaction] {} -> {color}", graph.name(node).unwrap_or("?"));
    graph.insert(node, MeshColor(color));
    graph.insert(node, toggle);
}
