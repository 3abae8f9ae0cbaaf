use glam::Vec3;
use kestrel_sandbox::config::AppConfig;
use kestrel_sandbox::input::InputEvent;
use kestrel_sandbox::{Runtime, RuntimeHost};
use winit::keyboard::KeyCode;

fn settled_runtime() -> Runtime {
    let mut runtime = Runtime::empty(AppConfig::default());
    runtime.enter_play_mode();
    for _ in 0..20 {
        runtime.frame(0.05);
    }
    runtime
}

fn player(runtime: &Runtime) -> Vec3 {
    runtime.player_position().expect("player spawned")
}

#[test]
fn idle_player_stays_put() {
    let mut runtime = settled_runtime();
    let start = player(&runtime);
    assert!((start.y - 1.0).abs() < 0.1, "player rests on the floor, y = {}", start.y);
    for _ in 0..20 {
        runtime.frame(0.05);
    }
    let end = player(&runtime);
    assert!(Vec3::new(end.x - start.x, 0.0, end.z - start.z).length() < 1e-3, "drifted to {end:?}");
}

#[test]
fn forward_walks_where_the_camera_looks_and_turns_the_body() {
    let mut runtime = settled_runtime();
    let start = player(&runtime);
    let camera_forward = runtime.camera().forward();
    assert!(camera_forward.z < 0.0, "camera sits behind the player looking down -Z");

    runtime.push_input(InputEvent::Key { code: KeyCode::KeyW, pressed: true });
    for _ in 0..20 {
        runtime.frame(0.05);
    }
    runtime.push_input(InputEvent::Key { code: KeyCode::KeyW, pressed: false });

    let delta = player(&runtime) - start;
    assert!(delta.z < -3.0, "moved {delta:?}");
    assert!(delta.x.abs() < 0.1, "moved {delta:?}");

    let body = runtime.player_rig().expect("player rig").body;
    let facing = runtime.physics().rotation(body).expect("body rotation") * Vec3::Z;
    assert!(facing.z < -0.9, "facing {facing:?}");
}

#[test]
fn strafing_moves_sideways_relative_to_the_camera() {
    let mut runtime = settled_runtime();
    let start = player(&runtime);
    runtime.push_input(InputEvent::Key { code: KeyCode::KeyD, pressed: true });
    for _ in 0..10 {
        runtime.frame(0.05);
    }
    let delta = player(&runtime) - start;
    assert!(delta.x > 1.0, "moved {delta:?}");
    assert!(delta.z.abs() < 0.3, "moved {delta:?}");
}

#[test]
fn jump_only_fires_from_the_ground() {
    let mut runtime = settled_runtime();
    let rest = player(&runtime).y;

    runtime.push_input(InputEvent::Key { code: KeyCode::Space, pressed: true });
    runtime.frame(0.05);
    runtime.push_input(InputEvent::Key { code: KeyCode::Space, pressed: false });
    for _ in 0..3 {
        runtime.frame(0.05);
    }
    let airborne = player(&runtime).y;
    assert!(airborne > rest + 0.3, "rest {rest}, airborne {airborne}");

    let body = runtime.player_rig().expect("player rig").body;
    let rising = runtime.physics().linear_velocity(body).expect("velocity").y;
    runtime.push_input(InputEvent::Key { code: KeyCode::Space, pressed: true });
    runtime.frame(0.05);
    let after = runtime.physics().linear_velocity(body).expect("velocity").y;
    assert!(after < rising, "no second impulse mid-air: {rising} -> {after}");
}

#[test]
fn pausing_freezes_the_simulation_until_stepped() {
    let mut runtime = settled_runtime();
    runtime.push_input(InputEvent::Key { code: KeyCode::KeyW, pressed: true });
    runtime.pause_play_mode();
    let frozen = player(&runtime);
    for _ in 0..5 {
        runtime.frame(0.05);
    }
    assert_eq!(player(&runtime), frozen);

    runtime.step_frame(0.05).expect("paused step");
    runtime.step_frame(0.05).expect("paused step");
    assert!(player(&runtime).z < frozen.z, "a single step advances the simulation");

    runtime.resume_play_mode();
    assert!(runtime.step_frame(0.05).is_err());
}
