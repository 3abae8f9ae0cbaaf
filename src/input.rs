use glam::Vec2;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use winit::event::{DeviceEvent, ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};

/// Per-frame keyboard and pointer state.
///
/// Keys are sampled by physical code, so `get_key` answers "is it held right now" rather than
/// reporting presses. Pointer motion accumulates between polls and is handed out exactly once by
/// [`InputManager::take_mouse_delta`].
pub struct InputManager {
    bindings: ControlBindings,
    held: HashSet<KeyCode>,
    mouse_delta: Vec2,
    wheel: f32,
    right_pressed: bool,
    cursor_pos: Option<Vec2>,
    pointer_captured: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(path: impl AsRef<Path>) -> Self {
        Self::with_bindings(ControlBindings::load_or_default(path))
    }

    pub fn with_bindings(bindings: ControlBindings) -> Self {
        Self {
            bindings,
            held: HashSet::new(),
            mouse_delta: Vec2::ZERO,
            wheel: 0.0,
            right_pressed: false,
            cursor_pos: None,
            pointer_captured: false,
        }
    }

    pub fn push(&mut self, ev: InputEvent) {
        match ev {
            InputEvent::Key { code, pressed } => {
                if pressed {
                    self.held.insert(code);
                } else {
                    self.held.remove(&code);
                }
            }
            InputEvent::MouseMove { dx, dy } => {
                let delta = Vec2::new(dx, dy);
                if delta.is_finite() {
                    self.mouse_delta += delta;
                } else {
                    log::debug!("[input] dropped non-finite pointer motion {delta:?}");
                }
            }
            InputEvent::Wheel { delta } => {
                if delta.is_finite() {
                    self.wheel += delta;
                }
            }
            InputEvent::MouseButton { button, pressed } => match button {
                MouseButton::Right => self.right_pressed = pressed,
                _ => {}
            },
            InputEvent::CursorPos { x, y } => {
                self.cursor_pos = Some(Vec2::new(x, y));
            }
            InputEvent::Other => {}
        }
    }

    pub fn get_key(&self, code: KeyCode) -> bool {
        self.held.contains(&code)
    }

    /// -1 when only `negative` is held, 1 when only `positive` is held, 0 otherwise.
    pub fn get_axis(&self, negative: KeyCode, positive: KeyCode) -> f32 {
        let mut axis = 0.0;
        if self.get_key(negative) {
            axis -= 1.0;
        }
        if self.get_key(positive) {
            axis += 1.0;
        }
        axis
    }

    /// Returns the pointer motion accumulated since the previous call and resets it.
    pub fn take_mouse_delta(&mut self) -> Vec2 {
        std::mem::take(&mut self.mouse_delta)
    }

    pub fn consume_wheel_delta(&mut self) -> Option<f32> {
        if self.wheel.abs() > 0.0 {
            Some(std::mem::take(&mut self.wheel))
        } else {
            None
        }
    }

    pub fn action_held(&self, action: ControlAction) -> bool {
        self.bindings.keys_for(action).iter().any(|code| self.get_key(*code))
    }

    /// Same as [`InputManager::get_axis`] but over every key bound to each action.
    pub fn action_axis(&self, negative: ControlAction, positive: ControlAction) -> f32 {
        let mut axis = 0.0;
        if self.action_held(negative) {
            axis -= 1.0;
        }
        if self.action_held(positive) {
            axis += 1.0;
        }
        axis
    }

    pub fn bindings(&self) -> &ControlBindings {
        &self.bindings
    }

    pub fn right_held(&self) -> bool {
        self.right_pressed
    }

    pub fn cursor_position(&self) -> Option<Vec2> {
        self.cursor_pos
    }

    pub fn pointer_captured(&self) -> bool {
        self.pointer_captured
    }

    pub fn set_pointer_captured(&mut self, captured: bool) {
        if self.pointer_captured != captured {
            log::debug!("[input] pointer capture {}", if captured { "acquired" } else { "released" });
        }
        self.pointer_captured = captured;
        // Motion gathered while the pointer was free must not leak into look controls.
        self.mouse_delta = Vec2::ZERO;
    }

    pub fn release_all(&mut self) {
        self.held.clear();
        self.right_pressed = false;
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::with_bindings(ControlBindings::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlAction {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    Jump,
    Interact,
}

impl ControlAction {
    fn from_str(value: &str) -> Option<Self> {
        match value {
            "move_forward" => Some(Self::MoveForward),
            "move_backward" => Some(Self::MoveBackward),
            "move_left" => Some(Self::MoveLeft),
            "move_right" => Some(Self::MoveRight),
            "jump" => Some(Self::Jump),
            "interact" => Some(Self::Interact),
            _ => None,
        }
    }
}

/// Maps player-facing actions onto physical key codes.
#[derive(Debug, Clone)]
pub struct ControlBindings {
    action_keys: HashMap<ControlAction, Vec<KeyCode>>,
}

impl ControlBindings {
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<BindingsFile>(&contents) {
                Ok(config) => Self::with_overrides(config.into_overrides(&path.display().to_string())),
                Err(err) => {
                    log::warn!("[input] Failed to parse {}: {err}. Falling back to default bindings.", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!("[input] Failed to read {}: {err}. Falling back to default bindings.", path.display());
                Self::default()
            }
        }
    }

    fn with_overrides(overrides: HashMap<ControlAction, Vec<KeyCode>>) -> Self {
        let mut action_keys = Self::default_action_map();
        for (action, keys) in overrides {
            if keys.is_empty() {
                continue;
            }
            action_keys.insert(action, keys);
        }
        Self { action_keys }
    }

    fn default_action_map() -> HashMap<ControlAction, Vec<KeyCode>> {
        use ControlAction::*;
        let mut map = HashMap::new();
        map.insert(MoveForward, vec![KeyCode::KeyW]);
        map.insert(MoveBackward, vec![KeyCode::KeyS]);
        map.insert(MoveLeft, vec![KeyCode::KeyA]);
        map.insert(MoveRight, vec![KeyCode::KeyD]);
        map.insert(Jump, vec![KeyCode::Space]);
        map.insert(Interact, vec![KeyCode::KeyE]);
        map
    }

    pub fn keys_for(&self, action: ControlAction) -> &[KeyCode] {
        self.action_keys.get(&action).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Primary key for an action, used where an API takes a single code (axes).
    pub fn primary(&self, action: ControlAction) -> Option<KeyCode> {
        self.keys_for(action).first().copied()
    }
}

impl Default for ControlBindings {
    fn default() -> Self {
        Self { action_keys: Self::default_action_map() }
    }
}

#[derive(Debug, Deserialize)]
struct BindingsFile {
    #[serde(default)]
    bindings: HashMap<String, Vec<String>>,
}

impl BindingsFile {
    fn into_overrides(self, origin: &str) -> HashMap<ControlAction, Vec<KeyCode>> {
        let mut overrides = HashMap::new();
        for (action_name, keys) in self.bindings {
            let action_key = action_name.trim().to_lowercase();
            let Some(action) = ControlAction::from_str(&action_key) else {
                log::warn!("[input] {origin}: unknown action '{action_name}', ignoring.");
                continue;
            };
            let mut parsed = Vec::new();
            for key in keys {
                match parse_key_code(&key) {
                    Some(code) => parsed.push(code),
                    None => log::warn!("[input] {origin}: unknown key '{key}' for action '{action_name}', ignoring."),
                }
            }
            if parsed.is_empty() {
                log::warn!("[input] {origin}: action '{action_name}' has no valid keys, keeping defaults.");
                continue;
            }
            overrides.insert(action, parsed);
        }
        overrides
    }
}

/// Parses DOM-style physical key names ("KeyW", "Space", "ArrowUp", "Digit1").
pub fn parse_key_code(raw: &str) -> Option<KeyCode> {
    let name = raw.trim();
    if let Some(letter) = name.strip_prefix("Key") {
        let mut chars = letter.chars();
        let ch = chars.next()?.to_ascii_uppercase();
        if chars.next().is_some() {
            return None;
        }
        return letter_code(ch);
    }
    if let Some(digit) = name.strip_prefix("Digit") {
        return digit_code(digit);
    }
    let code = match name {
        "Space" => KeyCode::Space,
        "Enter" => KeyCode::Enter,
        "Escape" => KeyCode::Escape,
        "Tab" => KeyCode::Tab,
        "Delete" => KeyCode::Delete,
        "Backspace" => KeyCode::Backspace,
        "ShiftLeft" => KeyCode::ShiftLeft,
        "ShiftRight" => KeyCode::ShiftRight,
        "ControlLeft" => KeyCode::ControlLeft,
        "ControlRight" => KeyCode::ControlRight,
        "AltLeft" => KeyCode::AltLeft,
        "AltRight" => KeyCode::AltRight,
        "ArrowUp" => KeyCode::ArrowUp,
        "ArrowDown" => KeyCode::ArrowDown,
        "ArrowLeft" => KeyCode::ArrowLeft,
        "ArrowRight" => KeyCode::ArrowRight,
        _ => return None,
    };
    Some(code)
}

fn letter_code(ch: char) -> Option<KeyCode> {
    const LETTERS: [KeyCode; 26] = [
        KeyCode::KeyA,
        KeyCode::KeyB,
        KeyCode::KeyC,
        KeyCode::KeyD,
        KeyCode::KeyE,
        KeyCode::KeyF,
        KeyCode::KeyG,
        KeyCode::KeyH,
        KeyCode::KeyI,
        KeyCode::KeyJ,
        KeyCode::KeyK,
        KeyCode::KeyL,
        KeyCode::KeyM,
        KeyCode::KeyN,
        KeyCode::KeyO,
        KeyCode::KeyP,
        KeyCode::KeyQ,
        KeyCode::KeyR,
        KeyCode::KeyS,
        KeyCode::KeyT,
        KeyCode::KeyU,
        KeyCode::KeyV,
        KeyCode::KeyW,
        KeyCode::KeyX,
        KeyCode::KeyY,
        KeyCode::KeyZ,
    ];
    if ch.is_ascii_uppercase() {
        Some(LETTERS[(ch as u8 - b'A') as usize])
    } else {
        None
    }
}

fn digit_code(digit: &str) -> Option<KeyCode> {
    let code = match digit {
        "0" => KeyCode::Digit0,
        "1" => KeyCode::Digit1,
        "2" => KeyCode::Digit2,
        "3" => KeyCode::Digit3,
        "4" => KeyCode::Digit4,
        "5" => KeyCode::Digit5,
        "6" => KeyCode::Digit6,
        "7" => KeyCode::Digit7,
        "8" => KeyCode::Digit8,
        "9" => KeyCode::Digit9,
        _ => return None,
    };
    Some(code)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Key { code: KeyCode, pressed: bool },
    MouseMove { dx: f32, dy: f32 },
    Wheel { delta: f32 },
    MouseButton { button: MouseButton, pressed: bool },
    CursorPos { x: f32, y: f32 },
    Other,
}

impl InputEvent {
    pub fn from_window_event(ev: &WindowEvent) -> Self {
        match ev {
            WindowEvent::MouseWheel { delta, .. } => {
                let d = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(p) => p.y as f32,
                };
                InputEvent::Wheel { delta: d }
            }
            WindowEvent::CursorMoved { position, .. } => {
                InputEvent::CursorPos { x: position.x as f32, y: position.y as f32 }
            }
            WindowEvent::MouseInput { state, button, .. } => {
                InputEvent::MouseButton { button: *button, pressed: *state == ElementState::Pressed }
            }
            WindowEvent::KeyboardInput { event, .. } => match event.physical_key {
                PhysicalKey::Code(code) => {
                    InputEvent::Key { code, pressed: event.state == ElementState::Pressed }
                }
                PhysicalKey::Unidentified(_) => InputEvent::Other,
            },
            _ => InputEvent::Other,
        }
    }

    pub fn from_device_event(ev: &DeviceEvent) -> Self {
        match ev {
            DeviceEvent::MouseMotion { delta: (dx, dy) } => {
                InputEvent::MouseMove { dx: *dx as f32, dy: *dy as f32 }
            }
            _ => InputEvent::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axis_cancels_when_both_held() {
        let mut input = InputManager::new();
        input.push(InputEvent::Key { code: KeyCode::KeyA, pressed: true });
        assert_eq!(input.get_axis(KeyCode::KeyA, KeyCode::KeyD), -1.0);
        input.push(InputEvent::Key { code: KeyCode::KeyD, pressed: true });
        assert_eq!(input.get_axis(KeyCode::KeyA, KeyCode::KeyD), 0.0);
        input.push(InputEvent::Key { code: KeyCode::KeyA, pressed: false });
        assert_eq!(input.get_axis(KeyCode::KeyA, KeyCode::KeyD), 1.0);
    }

    #[test]
    fn mouse_delta_is_consumed_once() {
        let mut input = InputManager::new();
        input.push(InputEvent::MouseMove { dx: 3.0, dy: -1.0 });
        input.push(InputEvent::MouseMove { dx: 2.0, dy: 4.0 });
        assert_eq!(input.take_mouse_delta(), Vec2::new(5.0, 3.0));
        assert_eq!(input.take_mouse_delta(), Vec2::ZERO);
    }

    #[test]
    fn non_finite_motion_is_dropped() {
        let mut input = InputManager::new();
        input.push(InputEvent::MouseMove { dx: 1.0, dy: 2.0 });
        input.push(InputEvent::MouseMove { dx: 0.0, dy: f32::NAN });
        input.push(InputEvent::MouseMove { dx: f32::INFINITY, dy: 0.0 });
        input.push(InputEvent::Wheel { delta: f32::NEG_INFINITY });
        assert_eq!(input.take_mouse_delta(), Vec2::new(1.0, 2.0));
        assert_eq!(input.consume_wheel_delta(), None);
    }

    #[test]
    fn key_names_parse() {
        assert_eq!(parse_key_code("KeyW"), Some(KeyCode::KeyW));
        assert_eq!(parse_key_code("keyq"), None);
        assert_eq!(parse_key_code("Digit7"), Some(KeyCode::Digit7));
        assert_eq!(parse_key_code(" Space "), Some(KeyCode::Space));
        assert_eq!(parse_key_code("Hyper"), None);
    }
}
