use std::fmt;
use std::sync::Arc;

use bevy_ecs::prelude::*;

use crate::scene_graph::SceneGraph;

/// Invoked with the graph and the node that carries the [`Interactable`].
pub type InteractHandler = Arc<dyn Fn(&mut SceneGraph, Entity) + Send + Sync>;

/// Interaction metadata attached to an entity root.
#[derive(Component, Clone)]
pub struct Interactable {
    pub prompt_message: String,
    on_interact: InteractHandler,
}

impl Interactable {
    pub fn new<F>(prompt_message: impl Into<String>, on_interact: F) -> Self
    where
        F: Fn(&mut SceneGraph, Entity) + Send + Sync + 'static,
    {
        Self { prompt_message: prompt_message.into(), on_interact: Arc::new(on_interact) }
    }

    pub fn handler(&self) -> InteractHandler {
        Arc::clone(&self.on_interact)
    }
}

impl fmt::Debug for Interactable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interactable").field("prompt_message", &self.prompt_message).finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct ActiveInteractable {
    pub node: Entity,
    pub prompt_message: String,
    on_interact: InteractHandler,
}

impl ActiveInteractable {
    pub fn from_component(node: Entity, interactable: &Interactable) -> Self {
        Self { node, prompt_message: interactable.prompt_message.clone(), on_interact: interactable.handler() }
    }

    pub fn interact(&self, graph: &mut SceneGraph) {
        (self.on_interact)(graph, self.node);
    }
}

impl fmt::Debug for ActiveInteractable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveInteractable")
            .field("node", &self.node)
            .field("prompt_message", &self.prompt_message)
            .finish_non_exhaustive()
    }
}

/// The single current interaction target, rebuilt every frame by the player's interaction script.
#[derive(Debug, Default)]
pub struct InteractionRegistry {
    active: Option<ActiveInteractable>,
}

impl InteractionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_active(&mut self, active: Option<ActiveInteractable>) {
        let before = self.active.as_ref().map(|a| a.node);
        let after = active.as_ref().map(|a| a.node);
        if before != after {
            log::debug!("[interaction] active interactable {before:?} -> {after:?}");
        }
        self.active = active;
    }

    pub fn clear(&mut self) {
        self.set_active(None);
    }

    pub fn active(&self) -> Option<&ActiveInteractable> {
        self.active.as_ref()
    }

    pub fn active_node(&self) -> Option<Entity> {
        self.active.as_ref().map(|a| a.node)
    }

    /// Text for the on-screen prompt, if something can be interacted with.
    pub fn prompt(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.prompt_message.as_str())
    }
}
