use crate::error::{ToolboxError, ToolboxResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Runtime settings for the toolbox. Every field has a default so a partial
/// TOML file (or none at all) is enough.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolboxConfig {
    pub api_base_url: String,
    /// Never logged. Filled from the environment when absent from the file.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub chat_model: String,
    pub video_model: String,
    pub video_resolution: String,
    pub video_aspect_ratio: String,
    pub number_of_videos: u32,
    pub poll_interval_ms: u64,
    pub progress_interval_ms: u64,
    pub trim_delay_ms: u64,
    pub excel_delay_ms: u64,
    pub simulated_delay_ms: u64,
    /// `None` keeps polling until the remote job reports done.
    pub max_poll_attempts: Option<u32>,
    pub artifact_dir: Option<PathBuf>,
}

impl Default for ToolboxConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE.into(),
            api_key: None,
            chat_model: "gemini-3-flash-preview".into(),
            video_model: "veo-3.1-fast-generate-preview".into(),
            video_resolution: "720p".into(),
            video_aspect_ratio: "16:9".into(),
            number_of_videos: 1,
            poll_interval_ms: 10_000,
            progress_interval_ms: 4_000,
            trim_delay_ms: 2_000,
            excel_delay_ms: 2_500,
            simulated_delay_ms: 1_500,
            max_poll_attempts: None,
            artifact_dir: None,
        }
    }
}

impl ToolboxConfig {
    pub fn from_toml_str(raw: &str) -> ToolboxResult<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML file, then apply environment overrides.
    pub fn load(path: &Path) -> ToolboxResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env();
        log::info!("[config] loaded {}", path.display());
        Ok(config)
    }

    /// Defaults plus environment overrides.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let key = lookup("MULTITOOLBOX_API_KEY")
            .or_else(|| lookup("API_KEY"))
            .filter(|k| !k.trim().is_empty());
        if key.is_some() {
            self.api_key = key;
        }
        if let Some(base) = lookup("MULTITOOLBOX_API_BASE").filter(|b| !b.trim().is_empty()) {
            self.api_base_url = base;
        }
        if let Some(dir) = lookup("MULTITOOLBOX_ARTIFACT_DIR").filter(|d| !d.trim().is_empty()) {
            self.artifact_dir = Some(PathBuf::from(dir));
        }
    }

    pub fn validate(&self) -> ToolboxResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(ToolboxError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.progress_interval_ms == 0 {
            return Err(ToolboxError::Config(
                "progress_interval_ms must be > 0".into(),
            ));
        }
        if self.number_of_videos == 0 {
            return Err(ToolboxError::Config("number_of_videos must be > 0".into()));
        }
        if matches!(self.max_poll_attempts, Some(0)) {
            return Err(ToolboxError::Config(
                "max_poll_attempts must be > 0 when set".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn trim_delay(&self) -> Duration {
        Duration::from_millis(self.trim_delay_ms)
    }

    pub fn excel_delay(&self) -> Duration {
        Duration::from_millis(self.excel_delay_ms)
    }

    pub fn simulated_delay(&self) -> Duration {
        Duration::from_millis(self.simulated_delay_ms)
    }
}
