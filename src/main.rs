use kestrel_sandbox::cli::CliOverrides;
use kestrel_sandbox::config::AppConfig;
use kestrel_sandbox::input::{ControlAction, InputEvent};
use kestrel_sandbox::{Runtime, RuntimeHost};

const DEFAULT_CONFIG_PATH: &str = "config/app.json";

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = match CliOverrides::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };

    let mut config = match cli.config_path() {
        Some(path) => match AppConfig::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                eprintln!("[config] {err:?}");
                std::process::exit(2);
            }
        },
        None => AppConfig::load_or_default(DEFAULT_CONFIG_PATH),
    };
    let overrides = cli.config_overrides();
    if !overrides.is_empty() {
        log::info!("[cli] overriding {}", overrides.applied_fields().join(", "));
        config.apply_overrides(&overrides);
    }

    let mut runtime = Runtime::new(config);
    if cli.play() {
        runtime.enter_play_mode();
    }

    // Walk forward for the first half of the run so a headless session shows the player moving.
    let forward = runtime.input().bindings().primary(ControlAction::MoveForward);
    let frames = cli.frames();
    let mut last_dt = 0.0;
    for frame in 0..frames {
        if let Some(code) = forward {
            if frame == 0 {
                runtime.push_input(InputEvent::Key { code, pressed: true });
            } else if frame == frames / 2 {
                runtime.push_input(InputEvent::Key { code, pressed: false });
            }
        }
        last_dt = runtime.frame(cli.dt());
        if frame % 30 == 0 {
            log::debug!("{:?}", runtime.report(last_dt));
        }
    }

    let report = runtime.report(last_dt);
    log::info!(
        "[sandbox] {} frames, {:?} ({} tool), camera at {:?}, player at {:?}, {} objects",
        report.frame,
        report.play_state,
        report.transform_mode.label(),
        report.camera_position,
        report.player_position,
        report.objects
    );
    if let Some(err) = runtime.scheduler().last_error() {
        log::warn!("[sandbox] last script error: {err}");
    }
    for entry in runtime.graph().hierarchy() {
        log::debug!("{}{}", "  ".repeat(entry.depth), entry.name);
    }
}
