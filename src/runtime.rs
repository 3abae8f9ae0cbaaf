use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use anyhow::{bail, Result};
use bevy_ecs::prelude::Entity;
use glam::{Vec2, Vec3};
use winit::dpi::PhysicalSize;

use crate::camera::{CameraStateMachine, EDITOR_ORBIT, THIRD_PERSON};
use crate::camera3d::Camera3D;
use crate::composer::SceneComposer;
use crate::config::AppConfig;
use crate::editor::{EditorState, SceneObjectId, TransformField};
use crate::gizmo::{Axis3, GizmoDrag, GizmoSession, TransformMode};
use crate::input::{InputEvent, InputManager};
use crate::interaction::InteractionRegistry;
use crate::physics::PhysicsWorld;
use crate::player::{despawn_player, spawn_player, PlayerInteraction, PlayerMovement, PlayerRig};
use crate::runtime_host::{PlayState, RuntimeHost};
use crate::scene_graph::SceneGraph;
use crate::scripts::{script_handle, FrameContext, ScriptHandle, ScriptScheduler};

pub const PLAYER_MOVEMENT_PRIORITY: i32 = -10;
pub const CAMERA_PRIORITY: i32 = 10;
pub const PLAYER_INTERACTION_PRIORITY: i32 = 20;

struct PlayerSession {
    rig: PlayerRig,
    movement: ScriptHandle,
    interaction: ScriptHandle,
}

/// Snapshot of the interesting runtime state after a frame, for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub frame: u64,
    pub dt: f32,
    pub play_state: PlayState,
    pub camera_position: Vec3,
    pub player_position: Option<Vec3>,
    pub prompt: Option<String>,
    pub selected: Option<String>,
    pub transform_mode: TransformMode,
    pub objects: usize,
}

/// Owns every service and runs the frame pipeline: scripts, physics, scene commit, then callbacks
/// that were waiting for the commit.
pub struct Runtime {
    config: AppConfig,
    input: InputManager,
    camera: Camera3D,
    viewport: PhysicalSize<u32>,
    graph: SceneGraph,
    physics: PhysicsWorld,
    interaction: InteractionRegistry,
    editor: EditorState,
    scheduler: Rc<ScriptScheduler>,
    composer: SceneComposer,
    camera_rig: Rc<RefCell<CameraStateMachine>>,
    player: Option<PlayerSession>,
    paused: bool,
    frame: u64,
}

impl Runtime {
    /// Runtime with the sandbox's starting objects in the store.
    pub fn new(config: AppConfig) -> Self {
        Self::build(config, true)
    }

    /// Runtime with an empty object store. The static world is still built.
    pub fn empty(config: AppConfig) -> Self {
        Self::build(config, false)
    }

    fn build(config: AppConfig, seed: bool) -> Self {
        let scheduler = Rc::new(ScriptScheduler::with_max_delta(config.scheduler.max_delta));
        let input = match &config.input.bindings_path {
            Some(path) => InputManager::from_config(path),
            None => InputManager::new(),
        };
        let mut editor = EditorState::new(Rc::clone(&scheduler));
        if seed {
            editor.seed_default_objects();
        }
        let graph = SceneGraph::new();
        let camera_rig = Rc::new(RefCell::new(CameraStateMachine::with_defaults(&config.camera)));
        {
            let mut rig = camera_rig.borrow_mut();
            rig.set_active_state(EDITOR_ORBIT);
            rig.set_target(Some(graph.root()));
        }
        let camera_handle: ScriptHandle = camera_rig.clone();
        scheduler.register(camera_handle, CAMERA_PRIORITY);

        let mut camera = Camera3D::from_config(&config.camera);
        camera_rig.borrow().sync_orbit(&mut camera);
        log::info!(
            "[runtime] ready: {} objects, max delta {:.3}, gravity {:?}",
            editor.object_count(),
            scheduler.max_delta(),
            config.physics.gravity
        );
        Self {
            viewport: PhysicalSize::new(config.window.width, config.window.height),
            physics: PhysicsWorld::new(Vec3::from(config.physics.gravity)),
            config,
            input,
            camera,
            graph,
            interaction: InteractionRegistry::new(),
            editor,
            scheduler,
            composer: SceneComposer::new(),
            camera_rig,
            player: None,
            paused: false,
            frame: 0,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn input(&self) -> &InputManager {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputManager {
        &mut self.input
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    pub fn camera(&self) -> &Camera3D {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera3D {
        &mut self.camera
    }

    pub fn camera_rig(&self) -> Ref<'_, CameraStateMachine> {
        self.camera_rig.borrow()
    }

    pub fn camera_rig_mut(&self) -> RefMut<'_, CameraStateMachine> {
        self.camera_rig.borrow_mut()
    }

    pub fn viewport(&self) -> PhysicalSize<u32> {
        self.viewport
    }

    pub fn set_viewport(&mut self, viewport: PhysicalSize<u32>) {
        self.viewport = viewport;
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn physics(&self) -> &PhysicsWorld {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.physics
    }

    pub fn interaction(&self) -> &InteractionRegistry {
        &self.interaction
    }

    pub fn scheduler(&self) -> &Rc<ScriptScheduler> {
        &self.scheduler
    }

    pub fn composer(&self) -> &SceneComposer {
        &self.composer
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    pub fn player_rig(&self) -> Option<PlayerRig> {
        self.player.as_ref().map(|session| session.rig)
    }

    pub fn player_position(&self) -> Option<Vec3> {
        self.player.as_ref().and_then(|session| self.graph.world_position(session.rig.root))
    }

    /// Runs `f` with the same context scripts see during a frame.
    pub fn with_frame_context<R>(&mut self, f: impl FnOnce(&mut FrameContext<'_>) -> R) -> R {
        let scheduler = Rc::clone(&self.scheduler);
        let mut ctx = FrameContext {
            input: &mut self.input,
            camera: &mut self.camera,
            viewport: self.viewport,
            graph: &mut self.graph,
            physics: &mut self.physics,
            interaction: &mut self.interaction,
            editor: &mut self.editor,
            scheduler: &scheduler,
        };
        f(&mut ctx)
    }

    /// Advances one frame and returns the clamped delta scripts observed.
    pub fn frame(&mut self, dt: f32) -> f32 {
        let simulate = !(self.editor.is_play_mode() && self.paused);
        self.advance(dt, simulate)
    }

    fn advance(&mut self, dt: f32, simulate: bool) -> f32 {
        let scheduler = Rc::clone(&self.scheduler);
        let dt = scheduler.clamp_delta(dt);
        if simulate {
            self.with_frame_context(|ctx| scheduler.run_frame(ctx, dt));
            if self.editor.is_play_mode() {
                self.physics.step(dt);
            }
        }
        self.composer.commit(&mut self.graph, &mut self.physics, &mut self.editor, &scheduler);
        self.with_frame_context(|ctx| scheduler.drain_after_render(ctx));
        self.frame += 1;
        dt
    }

    pub fn report(&self, dt: f32) -> FrameReport {
        FrameReport {
            frame: self.frame,
            dt,
            play_state: self.play_state(),
            camera_position: self.camera.position,
            player_position: self.player_position(),
            prompt: self.interaction.prompt().map(str::to_string),
            selected: self.editor.selected_object(&self.graph).map(|object| object.display_name.clone()),
            transform_mode: self.editor.transform_mode(),
            objects: self.editor.object_count(),
        }
    }

    /// Edit-mode pick at a screen position.
    pub fn select_at(&mut self, screen: Vec2) -> Option<Entity> {
        self.editor.select_at(&mut self.graph, &self.camera, self.viewport, screen)
    }

    pub fn select_object(&mut self, id: &SceneObjectId) -> bool {
        self.editor.select_object(&mut self.graph, id)
    }

    pub fn delete_selected(&mut self) -> bool {
        self.editor.delete_selected(&self.graph)
    }

    pub fn duplicate_selected(&mut self) -> Option<SceneObjectId> {
        self.editor.duplicate_selected(&self.graph)
    }

    pub fn sync_object_transform_from_3d(&mut self, node: Entity) -> bool {
        self.editor.sync_object_transform_from_3d(&self.graph, node)
    }

    /// Inspector edit on the selection. Rotation text is in degrees.
    pub fn edit_selected_field(&mut self, field: TransformField, axis: Axis3, text: &str) -> bool {
        self.editor.edit_selected_field(&self.graph, field, axis, text)
    }

    /// Starts a gizmo gesture on the selected store-backed object.
    pub fn begin_gizmo(&self, snap: bool) -> Option<GizmoSession> {
        GizmoSession::begin(&self.editor, &self.graph, snap)
    }

    pub fn drag_gizmo(&mut self, session: &GizmoSession, drag: GizmoDrag) -> bool {
        session.drag(&mut self.graph, drag)
    }

    pub fn finish_gizmo(&mut self, session: GizmoSession) -> bool {
        session.finish(&mut self.editor, &self.graph)
    }

    pub fn cancel_gizmo(&mut self, session: GizmoSession) {
        session.cancel(&mut self.graph);
    }

    fn spawn_player_session(&mut self) {
        let rig = spawn_player(&mut self.graph, &mut self.physics, &self.config.player);
        let movement = script_handle(PlayerMovement::new(rig.root, &self.config.player));
        let interaction = script_handle(PlayerInteraction::new(&self.config.player));
        self.scheduler.register(movement.clone(), PLAYER_MOVEMENT_PRIORITY);
        self.scheduler.register(interaction.clone(), PLAYER_INTERACTION_PRIORITY);
        self.player = Some(PlayerSession { rig, movement, interaction });
    }

    fn despawn_player_session(&mut self) {
        if let Some(session) = self.player.take() {
            self.scheduler.unregister(&session.movement);
            self.scheduler.unregister(&session.interaction);
            despawn_player(session.rig, &mut self.graph, &mut self.physics);
        }
    }
}

impl RuntimeHost for Runtime {
    fn play_state(&self) -> PlayState {
        if self.editor.is_play_mode() {
            PlayState::Playing { paused: self.paused }
        } else {
            PlayState::Editing
        }
    }

    fn enter_play_mode(&mut self) {
        if self.editor.is_play_mode() {
            return;
        }
        self.editor.set_play_mode(true);
        self.paused = false;
        self.composer.reset_from_store(&mut self.graph, &mut self.physics, &self.editor);
        self.spawn_player_session();
        {
            let mut rig = self.camera_rig.borrow_mut();
            rig.set_target(self.player.as_ref().map(|session| session.rig.root));
            rig.set_active_state(THIRD_PERSON);
        }
        self.interaction.clear();
        self.input.set_pointer_captured(true);
    }

    fn exit_play_mode(&mut self) {
        if !self.editor.is_play_mode() {
            return;
        }
        self.editor.set_play_mode(false);
        self.paused = false;
        self.despawn_player_session();
        self.composer.reset_from_store(&mut self.graph, &mut self.physics, &self.editor);
        {
            let mut rig = self.camera_rig.borrow_mut();
            rig.set_target(Some(self.graph.root()));
            rig.set_active_state(EDITOR_ORBIT);
        }
        self.interaction.clear();
        self.input.release_all();
        self.input.set_pointer_captured(false);
    }

    fn pause_play_mode(&mut self) {
        if self.editor.is_play_mode() {
            self.paused = true;
        }
    }

    fn resume_play_mode(&mut self) {
        self.paused = false;
    }

    fn step_frame(&mut self, dt: f32) -> Result<()> {
        if self.play_state() != (PlayState::Playing { paused: true }) {
            bail!("step_frame requires a paused play session");
        }
        self.advance(dt, true);
        Ok(())
    }

    fn editor(&self) -> &EditorState {
        &self.editor
    }

    fn editor_mut(&mut self) -> &mut EditorState {
        &mut self.editor
    }

    fn graph(&self) -> &SceneGraph {
        &self.graph
    }
}
