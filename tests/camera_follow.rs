use kestrel_sandbox::camera::{EDITOR_ORBIT, MAX_POLAR, MIN_POLAR, THIRD_PERSON};
use kestrel_sandbox::config::AppConfig;
use kestrel_sandbox::editor::{PropertyPatch, SceneObjectKind};
use kestrel_sandbox::input::InputEvent;
use kestrel_sandbox::{Runtime, RuntimeHost};

fn camera_distance_to_player(runtime: &Runtime) -> f32 {
    let player = runtime.player_position().expect("player spawned");
    runtime.camera().position.distance(player)
}

#[test]
fn third_person_camera_settles_at_the_orbit_radius() {
    let mut runtime = Runtime::new(AppConfig::default());
    runtime.enter_play_mode();
    assert_eq!(runtime.camera_rig().active_state(), Some(THIRD_PERSON));

    let mut previous = None;
    for _ in 0..60 {
        runtime.frame(0.1);
        previous = Some(runtime.camera().position);
    }
    runtime.frame(0.1);

    let distance = camera_distance_to_player(&runtime);
    assert!((distance - 6.0).abs() < 0.05, "distance = {distance}");
    let drift = runtime.camera().position.distance(previous.expect("ran frames"));
    assert!(drift < 0.01, "camera still moving by {drift}");
}

#[test]
fn obstacles_behind_the_player_pull_the_camera_in() {
    let mut runtime = Runtime::empty(AppConfig::default());
    let wall = runtime.editor_mut().create_object(SceneObjectKind::StaticInteractable);
    runtime
        .editor_mut()
        .update_object(&wall, &PropertyPatch::new().position([0.0, 2.0, 3.0]).scale([4.0, 4.0, 0.5]));
    runtime.frame(0.016);

    runtime.enter_play_mode();
    for _ in 0..30 {
        runtime.frame(0.1);
    }
    let distance = camera_distance_to_player(&runtime);
    assert!(distance > 2.0 && distance < 3.0, "distance = {distance}");
}

#[test]
fn mouse_look_rotates_the_orbit_while_captured() {
    let mut runtime = Runtime::empty(AppConfig::default());
    runtime.enter_play_mode();
    assert!(runtime.input().pointer_captured());

    runtime.push_input(InputEvent::MouseMove { dx: 100.0, dy: -10_000.0 });
    runtime.frame(0.016);
    let rig = runtime.camera_rig();
    let third_person = rig.third_person().expect("third person state");
    assert!((third_person.azimuth() + 0.5).abs() < 1e-4, "azimuth = {}", third_person.azimuth());
    assert_eq!(third_person.polar_angle(), MAX_POLAR);
}

#[test]
fn non_finite_pointer_motion_keeps_the_camera_valid() {
    let mut runtime = Runtime::empty(AppConfig::default());
    runtime.enter_play_mode();

    runtime.push_input(InputEvent::MouseMove { dx: 0.0, dy: f32::NAN });
    runtime.frame(0.016);
    runtime.push_input(InputEvent::MouseMove { dx: f32::INFINITY, dy: 0.0 });
    runtime.push_input(InputEvent::MouseMove { dx: f32::NEG_INFINITY, dy: f32::INFINITY });
    runtime.frame(0.016);
    runtime.push_input(InputEvent::MouseMove { dx: 1.0e12, dy: 0.0 });
    runtime.frame(0.016);

    let rig = runtime.camera_rig();
    let third_person = rig.third_person().expect("third person state");
    let phi = third_person.polar_angle();
    assert!((MIN_POLAR..=MAX_POLAR).contains(&phi), "phi = {phi}");
    assert!(third_person.azimuth().is_finite());
    assert!(runtime.camera().position.is_finite(), "camera at {:?}", runtime.camera().position);
}

#[test]
fn camera_without_target_does_nothing() {
    let mut runtime = Runtime::empty(AppConfig::default());
    runtime.camera_rig_mut().set_target(None);
    let before = runtime.camera().position;
    runtime.frame(0.016);
    assert_eq!(runtime.camera().position, before);

    assert!(!runtime.camera_rig_mut().set_active_state("cinematic"));
    assert_eq!(runtime.camera_rig().active_state(), Some(EDITOR_ORBIT));
}

#[test]
fn leaving_play_mode_returns_to_the_editor_orbit() {
    let mut runtime = Runtime::new(AppConfig::default());
    runtime.enter_play_mode();
    runtime.frame(0.016);
    runtime.exit_play_mode();
    assert_eq!(runtime.camera_rig().active_state(), Some(EDITOR_ORBIT));
    assert_eq!(runtime.camera_rig().target(), Some(runtime.graph().root()));
    assert!(!runtime.input().pointer_captured());
    assert!(runtime.player_rig().is_none());
}
