use anyhow::Result;

use crate::editor::EditorState;
use crate::scene_graph::SceneGraph;

/// Describes the current runtime execution mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayState {
    /// Editor-only state; the simulation is not running.
    Editing,
    /// Runtime play mode. `paused` distinguishes between live play and paused single-step.
    Playing { paused: bool },
}

/// Narrow interface exposed by the runtime so an editor shell can drive it without reaching into
/// its services.
pub trait RuntimeHost {
    /// Current play/edit mode.
    fn play_state(&self) -> PlayState;

    /// Enter play mode (unpaused). Live objects restart from the store.
    fn enter_play_mode(&mut self);

    /// Exit play mode and return to editing. Live objects return to their stored state.
    fn exit_play_mode(&mut self);

    /// Pause the active play session.
    fn pause_play_mode(&mut self);

    /// Resume play after a pause.
    fn resume_play_mode(&mut self);

    /// Step a single frame while paused.
    fn step_frame(&mut self, dt: f32) -> Result<()>;

    /// Read access to the editor store for panels.
    fn editor(&self) -> &EditorState;

    /// Mutable editor access for toolbar and inspector actions.
    fn editor_mut(&mut self) -> &mut EditorState;

    /// The live scene graph, for hierarchy and inspection.
    fn graph(&self) -> &SceneGraph;
}
