use std::cell::{Cell, RefCell};
use std::rc::Rc;

use anyhow::Result;
use winit::dpi::PhysicalSize;

use crate::camera3d::Camera3D;
use crate::editor::EditorState;
use crate::input::InputManager;
use crate::interaction::InteractionRegistry;
use crate::physics::PhysicsWorld;
use crate::scene_graph::SceneGraph;

/// Everything a per-frame script may touch, handed over by the runtime for the duration of a frame.
pub struct FrameContext<'a> {
    pub input: &'a mut InputManager,
    pub camera: &'a mut Camera3D,
    pub viewport: PhysicalSize<u32>,
    pub graph: &'a mut SceneGraph,
    pub physics: &'a mut PhysicsWorld,
    pub interaction: &'a mut InteractionRegistry,
    pub editor: &'a mut EditorState,
    pub scheduler: &'a ScriptScheduler,
}

pub trait Script {
    fn update(&mut self, ctx: &mut FrameContext<'_>, dt: f32) -> Result<()>;

    fn label(&self) -> &str {
        "script"
    }
}

pub type ScriptHandle = Rc<RefCell<dyn Script>>;

/// Adapts a closure into a [`Script`].
pub struct FnScript<F> {
    label: String,
    func: F,
}

impl<F> Script for FnScript<F>
where
    F: FnMut(&mut FrameContext<'_>, f32) -> Result<()>,
{
    fn update(&mut self, ctx: &mut FrameContext<'_>, dt: f32) -> Result<()> {
        (self.func)(ctx, dt)
    }

    fn label(&self) -> &str {
        &self.label
    }
}

pub fn script_fn<F>(label: impl Into<String>, func: F) -> ScriptHandle
where
    F: FnMut(&mut FrameContext<'_>, f32) -> Result<()> + 'static,
{
    Rc::new(RefCell::new(FnScript { label: label.into(), func }))
}

pub fn script_handle<S: Script + 'static>(script: S) -> ScriptHandle {
    Rc::new(RefCell::new(script))
}

pub type AfterRenderCallback = Box<dyn FnOnce(&mut FrameContext<'_>)>;

struct ScheduledScript {
    handle: ScriptHandle,
    priority: i32,
}

fn same_script(a: &ScriptHandle, b: &ScriptHandle) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

/// Ordered registry of per-frame scripts.
///
/// Shared by handle between the runtime and anything that registers work from inside a frame, so
/// all state sits behind interior mutability. Each frame runs a sorted snapshot: registrations made
/// while a frame is running take effect on the next one.
pub struct ScriptScheduler {
    scripts: RefCell<Vec<ScheduledScript>>,
    after_render: RefCell<Vec<AfterRenderCallback>>,
    max_delta: Cell<f32>,
    enabled: Cell<bool>,
    error: RefCell<Option<String>>,
    frames: Cell<u64>,
}

impl ScriptScheduler {
    pub const DEFAULT_MAX_DELTA: f32 = 0.1;

    pub fn new() -> Self {
        Self::with_max_delta(Self::DEFAULT_MAX_DELTA)
    }

    pub fn with_max_delta(max_delta: f32) -> Self {
        let max_delta = if max_delta.is_finite() && max_delta > 0.0 { max_delta } else { Self::DEFAULT_MAX_DELTA };
        Self {
            scripts: RefCell::new(Vec::new()),
            after_render: RefCell::new(Vec::new()),
            max_delta: Cell::new(max_delta),
            enabled: Cell::new(true),
            error: RefCell::new(None),
            frames: Cell::new(0),
        }
    }

    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    pub fn max_delta(&self) -> f32 {
        self.max_delta.get()
    }

    pub fn enabled(&self) -> bool {
        self.enabled.get()
    }

    pub fn set_enabled(&self, enable: bool) {
        self.enabled.set(enable);
    }

    pub fn last_error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn frames_run(&self) -> u64 {
        self.frames.get()
    }

    pub fn len(&self) -> usize {
        self.scripts.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.borrow().is_empty()
    }

    pub fn is_registered(&self, handle: &ScriptHandle) -> bool {
        self.scripts.borrow().iter().any(|entry| same_script(&entry.handle, handle))
    }

    /// Adds `handle` to the registry. Returns false if the same script is already registered, in
    /// which case its original priority is kept.
    pub fn register(&self, handle: ScriptHandle, priority: i32) -> bool {
        let mut scripts = self.scripts.borrow_mut();
        if scripts.iter().any(|entry| same_script(&entry.handle, &handle)) {
            return false;
        }
        scripts.push(ScheduledScript { handle, priority });
        true
    }

    pub fn unregister(&self, handle: &ScriptHandle) -> bool {
        let mut scripts = self.scripts.borrow_mut();
        let before = scripts.len();
        scripts.retain(|entry| !same_script(&entry.handle, handle));
        scripts.len() != before
    }

    pub fn clamp_delta(&self, dt: f32) -> f32 {
        if !dt.is_finite() || dt <= 0.0 {
            return 0.0;
        }
        dt.min(self.max_delta.get())
    }

    /// Runs one frame of scripts and returns the clamped delta they observed.
    pub fn run_frame(&self, ctx: &mut FrameContext<'_>, dt: f32) -> f32 {
        let dt = self.clamp_delta(dt);
        if !self.enabled.get() {
            return dt;
        }
        let mut snapshot: Vec<(ScriptHandle, i32)> =
            self.scripts.borrow().iter().map(|entry| (entry.handle.clone(), entry.priority)).collect();
        snapshot.sort_by_key(|(_, priority)| *priority);

        for (handle, _) in snapshot {
            let mut script = match handle.try_borrow_mut() {
                Ok(script) => script,
                Err(_) => {
                    log::warn!("[script] skipping script already borrowed this frame");
                    continue;
                }
            };
            if let Err(err) = script.update(ctx, dt) {
                log::error!("[script] {} failed: {err:?}", script.label());
                *self.error.borrow_mut() = Some(format!("{}: {err}", script.label()));
            }
        }
        self.frames.set(self.frames.get() + 1);
        dt
    }

    /// Queues `callback` to run once after the next render commit.
    pub fn after_next_render(&self, callback: AfterRenderCallback) {
        self.after_render.borrow_mut().push(callback);
    }

    pub fn pending_after_render(&self) -> usize {
        self.after_render.borrow().len()
    }

    /// Runs callbacks queued before this commit. Anything they queue waits for the following one.
    pub fn drain_after_render(&self, ctx: &mut FrameContext<'_>) -> usize {
        let pending = std::mem::take(&mut *self.after_render.borrow_mut());
        let count = pending.len();
        for callback in pending {
            callback(ctx);
        }
        count
    }
}

impl Default for ScriptScheduler {
    fn default() -> Self {
        Self::new()
    }
}
