use crate::session::SessionConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted user settings: session timing plus audio preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub breaths_per_round: u32,
    pub breath_interval_ms: u64,
    pub recovery_ms: u64,
    pub rounds_planned: u32,
    pub bgm_enabled: bool,
    pub bgm_volume: f64,
    pub sfx_volume: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            breaths_per_round: 40,
            breath_interval_ms: 3000,
            recovery_ms: 30000,
            rounds_planned: 4,
            bgm_enabled: true,
            bgm_volume: 0.4,
            sfx_volume: 0.8,
        }
    }
}

impl Config {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            breaths_per_round: self.breaths_per_round,
            breath_interval_ms: self.breath_interval_ms,
            recovery_ms: self.recovery_ms,
            rounds_planned: self.rounds_planned,
        }
    }

    pub fn sfx_enabled(&self) -> bool {
        self.sfx_volume > 0.0
    }

    /// Background audio plays only when it is switched on and audible.
    pub fn bgm_on(&self) -> bool {
        self.bgm_enabled && self.bgm_volume > 0.0
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "pneuma") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("pneuma_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    // Missing or corrupt settings fall back to defaults; starting a session
    // must never fail on a bad settings file.
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}
