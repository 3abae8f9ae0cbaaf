use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    pub title: String,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhysicsConfig {
    #[serde(default = "PhysicsConfig::default_gravity")]
    pub gravity: [f32; 3],
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlayerConfig {
    #[serde(default = "PlayerConfig::default_speed")]
    pub speed: f32,
    #[serde(default = "PlayerConfig::default_jump_force")]
    pub jump_force: f32,
    #[serde(default = "PlayerConfig::default_interaction_distance")]
    pub interaction_distance: f32,
    #[serde(default = "PlayerConfig::default_spawn")]
    pub spawn: [f32; 3],
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default = "CameraConfig::default_radius")]
    pub radius: f32,
    #[serde(default = "CameraConfig::default_polar_angle")]
    pub polar_angle: f32,
    #[serde(default = "CameraConfig::default_sensitivity")]
    pub mouse_sensitivity: f32,
    #[serde(default = "CameraConfig::default_smoothing")]
    pub smoothing_rate: f32,
    #[serde(default = "CameraConfig::default_collision_buffer")]
    pub collision_buffer: f32,
    #[serde(default = "CameraConfig::default_look_offset")]
    pub look_offset: [f32; 3],
    #[serde(default = "CameraConfig::default_fov_degrees")]
    pub fov_degrees: f32,
    #[serde(default = "CameraConfig::default_near")]
    pub near: f32,
    #[serde(default = "CameraConfig::default_far")]
    pub far: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "SchedulerConfig::default_max_delta")]
    pub max_delta: f32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct InputConfig {
    /// Optional JSON file remapping control actions to key codes.
    #[serde(default)]
    pub bindings_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub player: PlayerConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub input: InputConfig,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfigOverrides {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub max_delta: Option<f32>,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self { title: "Kestrel Sandbox".to_string(), width: 1280, height: 720 }
    }
}

impl PhysicsConfig {
    const fn default_gravity() -> [f32; 3] {
        [0.0, -20.0, 0.0]
    }
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self { gravity: Self::default_gravity() }
    }
}

impl PlayerConfig {
    const fn default_speed() -> f32 {
        6.0
    }

    const fn default_jump_force() -> f32 {
        7.0
    }

    const fn default_interaction_distance() -> f32 {
        5.0
    }

    const fn default_spawn() -> [f32; 3] {
        [0.0, 1.0, 0.0]
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            speed: Self::default_speed(),
            jump_force: Self::default_jump_force(),
            interaction_distance: Self::default_interaction_distance(),
            spawn: Self::default_spawn(),
        }
    }
}

impl CameraConfig {
    const fn default_radius() -> f32 {
        6.0
    }

    fn default_polar_angle() -> f32 {
        std::f32::consts::PI / 2.5
    }

    const fn default_sensitivity() -> f32 {
        0.005
    }

    const fn default_smoothing() -> f32 {
        15.0
    }

    const fn default_collision_buffer() -> f32 {
        0.9
    }

    const fn default_look_offset() -> [f32; 3] {
        [0.0, 1.5, 0.0]
    }

    const fn default_fov_degrees() -> f32 {
        60.0
    }

    const fn default_near() -> f32 {
        0.1
    }

    const fn default_far() -> f32 {
        1000.0
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            radius: Self::default_radius(),
            polar_angle: Self::default_polar_angle(),
            mouse_sensitivity: Self::default_sensitivity(),
            smoothing_rate: Self::default_smoothing(),
            collision_buffer: Self::default_collision_buffer(),
            look_offset: Self::default_look_offset(),
            fov_degrees: Self::default_fov_degrees(),
            near: Self::default_near(),
            far: Self::default_far(),
        }
    }
}

impl SchedulerConfig {
    const fn default_max_delta() -> f32 {
        0.1
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { max_delta: Self::default_max_delta() }
    }
}

impl AppConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("Config load error: {err:?}. Falling back to defaults.");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &AppConfigOverrides) {
        if let Some(width) = overrides.width {
            self.window.width = width;
        }
        if let Some(height) = overrides.height {
            self.window.height = height;
        }
        if let Some(max_delta) = overrides.max_delta {
            if max_delta.is_finite() && max_delta > 0.0 {
                self.scheduler.max_delta = max_delta;
            } else {
                log::warn!("Ignoring invalid max_delta override {max_delta}");
            }
        }
    }
}

impl AppConfigOverrides {
    pub fn is_empty(&self) -> bool {
        self.width.is_none() && self.height.is_none() && self.max_delta.is_none()
    }

    pub fn applied_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.width.is_some() {
            fields.push("width");
        }
        if self.height.is_some() {
            fields.push("height");
        }
        if self.max_delta.is_some() {
            fields.push("max_delta");
        }
        fields
    }
}
