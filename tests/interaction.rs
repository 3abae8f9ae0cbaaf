use glam::Vec3;
use kestrel_sandbox::behaviours::{PROMPT_CHANGE_COLOR, PROMPT_CHANGE_COLOR_BACK};
use kestrel_sandbox::config::AppConfig;
use kestrel_sandbox::editor::{PropertyPatch, SceneObjectId, SceneObjectKind, INTERACTABLE_ALT_COLOR, INTERACTABLE_BASE_COLOR};
use kestrel_sandbox::input::InputEvent;
use kestrel_sandbox::scene_graph::MeshColor;
use kestrel_sandbox::{Runtime, RuntimeHost};
use winit::keyboard::KeyCode;

const BOX_POSITION: [f32; 3] = [10.0, 1.0, 6.0];
const EYE: Vec3 = Vec3::new(10.0, 1.0, 9.0);

/// Play session with one interactable box and a camera the test aims by hand.
fn aimed_session() -> (Runtime, SceneObjectId) {
    let mut runtime = Runtime::empty(AppConfig::default());
    let id = runtime.editor_mut().create_object(SceneObjectKind::StaticInteractable);
    runtime.editor_mut().update_object(&id, &PropertyPatch::new().position(BOX_POSITION));
    runtime.frame(0.016);
    runtime.enter_play_mode();
    runtime.camera_rig_mut().set_target(None);
    (runtime, id)
}

fn aim(runtime: &mut Runtime, at: Vec3) {
    let camera = runtime.camera_mut();
    camera.position = EYE;
    camera.look_at(at);
}

fn box_color(runtime: &Runtime, id: &SceneObjectId) -> String {
    let root = runtime.composer().live_root(id).expect("box is live");
    runtime.graph().get::<MeshColor>(root).map(|color| color.0.clone()).expect("box has a colour")
}

#[test]
fn prompt_appears_only_when_an_interactable_is_in_reach() {
    let (mut runtime, id) = aimed_session();

    for frame in 1..=3 {
        aim(&mut runtime, EYE + Vec3::Z * 10.0);
        runtime.frame(0.1);
        assert!(runtime.interaction().active().is_none(), "frame {frame} looks at empty space");
    }

    aim(&mut runtime, Vec3::from(BOX_POSITION));
    runtime.frame(0.1);
    assert_eq!(runtime.interaction().prompt(), Some(PROMPT_CHANGE_COLOR));
    assert_eq!(runtime.interaction().active_node(), runtime.composer().live_root(&id));

    aim(&mut runtime, EYE + Vec3::Z * 10.0);
    runtime.frame(0.1);
    assert_eq!(runtime.interaction().prompt(), None);
}

#[test]
fn out_of_reach_boxes_are_ignored() {
    let (mut runtime, _) = aimed_session();
    let camera = runtime.camera_mut();
    camera.position = Vec3::new(10.0, 1.0, 14.0);
    camera.look_at(Vec3::from(BOX_POSITION));
    runtime.frame(0.1);
    assert!(runtime.interaction().active().is_none());
}

#[test]
fn interacting_toggles_the_live_colour_with_a_cooldown() {
    let (mut runtime, id) = aimed_session();
    aim(&mut runtime, Vec3::from(BOX_POSITION));
    runtime.frame(0.1);
    assert_eq!(box_color(&runtime, &id), INTERACTABLE_BASE_COLOR);

    runtime.push_input(InputEvent::Key { code: KeyCode::KeyE, pressed: true });
    runtime.frame(0.1);
    assert_eq!(box_color(&runtime, &id), INTERACTABLE_ALT_COLOR);

    // Holding the key does nothing until the cooldown runs out.
    for _ in 0..3 {
        runtime.frame(0.1);
        assert_eq!(box_color(&runtime, &id), INTERACTABLE_ALT_COLOR);
    }
    assert_eq!(runtime.interaction().prompt(), Some(PROMPT_CHANGE_COLOR_BACK));

    for _ in 0..3 {
        runtime.frame(0.1);
    }
    assert_eq!(box_color(&runtime, &id), INTERACTABLE_BASE_COLOR, "second toggle after the cooldown");
    runtime.push_input(InputEvent::Key { code: KeyCode::KeyE, pressed: false });

    let stored = runtime.editor().object(&id).and_then(|object| object.properties.color.clone());
    assert_eq!(stored.as_deref(), Some(INTERACTABLE_BASE_COLOR), "play-time toggles stay out of the store");
}

#[test]
fn exiting_play_mode_restores_the_stored_colour() {
    let (mut runtime, id) = aimed_session();
    aim(&mut runtime, Vec3::from(BOX_POSITION));
    runtime.push_input(InputEvent::Key { code: KeyCode::KeyE, pressed: true });
    runtime.frame(0.1);
    assert_eq!(box_color(&runtime, &id), INTERACTABLE_ALT_COLOR);

    runtime.exit_play_mode();
    assert_eq!(box_color(&runtime, &id), INTERACTABLE_BASE_COLOR);
    assert!(runtime.interaction().active().is_none());
}
