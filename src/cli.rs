use crate::config::AppConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

const DEFAULT_FRAMES: u32 = 120;
const DEFAULT_DT: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CliOverrides {
    config_path: Option<PathBuf>,
    frames: u32,
    dt: f32,
    play: bool,
    width: Option<u32>,
    height: Option<u32>,
    max_delta: Option<f32>,
}

impl Default for CliOverrides {
    fn default() -> Self {
        Self {
            config_path: None,
            frames: DEFAULT_FRAMES,
            dt: DEFAULT_DT,
            play: false,
            width: None,
            height: None,
            max_delta: None,
        }
    }
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            if !flag.starts_with("--") {
                bail!("Unexpected argument '{flag}'. Flags take the form --name value.");
            }
            let key = &flag[2..];
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => overrides.config_path = Some(PathBuf::from(value)),
                "frames" => {
                    overrides.frames =
                        value.parse::<u32>().with_context(|| format!("Invalid frame count '{value}'"))?;
                }
                "dt" => {
                    let dt = value.parse::<f32>().with_context(|| format!("Invalid dt '{value}'"))?;
                    if !dt.is_finite() || dt <= 0.0 {
                        bail!("dt must be a positive number, got '{value}'");
                    }
                    overrides.dt = dt;
                }
                "play" => overrides.play = parse_bool_flag("play", &value)?,
                "width" => {
                    overrides.width =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid width '{value}'"))?);
                }
                "height" => {
                    overrides.height =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid height '{value}'"))?);
                }
                "max-delta" => {
                    overrides.max_delta =
                        Some(value.parse::<f32>().with_context(|| format!("Invalid max-delta '{value}'"))?);
                }
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --frames, --dt, --play, --width, --height, --max-delta."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config_path.as_ref()
    }

    pub fn frames(&self) -> u32 {
        self.frames
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn play(&self) -> bool {
        self.play
    }

    pub fn config_overrides(&self) -> AppConfigOverrides {
        AppConfigOverrides { width: self.width, height: self.height, max_delta: self.max_delta }
    }
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}
