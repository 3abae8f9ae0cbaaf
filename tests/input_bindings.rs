use glam::Vec2;
use kestrel_sandbox::input::{ControlAction, InputEvent, InputManager};
use std::io::Write;
use tempfile::NamedTempFile;
use winit::keyboard::KeyCode;

#[test]
fn remapped_movement_overrides_defaults() {
    let mut temp = NamedTempFile::new().expect("temp input config");
    write!(temp, r#"{{"bindings":{{"move_forward":["ArrowUp","KeyI"],"jump":["KeyJ"],"bogus":["KeyX"]}}}}"#)
        .expect("write remap config");

    let mut input = InputManager::from_config(temp.path());
    assert_eq!(input.action_axis(ControlAction::MoveBackward, ControlAction::MoveForward), 0.0);

    input.push(InputEvent::Key { code: KeyCode::KeyW, pressed: true });
    assert!(!input.action_held(ControlAction::MoveForward), "default key no longer fires when remapped");

    input.push(InputEvent::Key { code: KeyCode::KeyI, pressed: true });
    assert_eq!(input.action_axis(ControlAction::MoveBackward, ControlAction::MoveForward), 1.0);

    input.push(InputEvent::Key { code: KeyCode::KeyS, pressed: true });
    assert_eq!(
        input.action_axis(ControlAction::MoveBackward, ControlAction::MoveForward),
        0.0,
        "opposite keys cancel"
    );

    input.push(InputEvent::Key { code: KeyCode::KeyJ, pressed: true });
    assert!(input.action_held(ControlAction::Jump));
    assert_eq!(input.bindings().primary(ControlAction::Interact), Some(KeyCode::KeyE), "untouched actions keep defaults");
}

#[test]
fn unreadable_bindings_fall_back_to_defaults() {
    let mut temp = NamedTempFile::new().expect("temp input config");
    write!(temp, "not json").expect("write garbage");
    let input = InputManager::from_config(temp.path());
    assert_eq!(input.bindings().primary(ControlAction::MoveForward), Some(KeyCode::KeyW));

    let missing = InputManager::from_config("does/not/exist.json");
    assert_eq!(missing.bindings().keys_for(ControlAction::Jump), &[KeyCode::Space]);
}

#[test]
fn pointer_state_accumulates_until_consumed() {
    let mut input = InputManager::new();
    input.push(InputEvent::MouseMove { dx: 3.0, dy: -1.0 });
    input.push(InputEvent::MouseMove { dx: 1.0, dy: 2.0 });
    assert_eq!(input.take_mouse_delta(), Vec2::new(4.0, 1.0));
    assert_eq!(input.take_mouse_delta(), Vec2::ZERO);

    input.push(InputEvent::Wheel { delta: 1.5 });
    assert_eq!(input.consume_wheel_delta(), Some(1.5));
    assert_eq!(input.consume_wheel_delta(), None);

    input.push(InputEvent::CursorPos { x: 10.0, y: 20.0 });
    assert_eq!(input.cursor_position(), Some(Vec2::new(10.0, 20.0)));
}
