use std::path::Path;

use anyhow::{anyhow, bail, ensure, Context, Result};
use tracing::{debug, error, info, trace, warn};

use serde::{Deserialize, Serialize};

use crate::{ui::ui_types::Size, vision::CameraSettings};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppSettings {
    pub server_url: String,
    /// Landscape display size the overlays are drawn at.
    pub display_size: Size,
    pub preview_size: Size,
    pub jpeg_quality: u8,
    pub max_save_slots: u8,
    /// No timeout when unset.
    pub request_timeout_secs: Option<u64>,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    pub dir: String,
    /// `EnvFilter` directives, overridden by `RUST_LOG`.
    pub filter: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        AppSettings {
            server_url: "http://54.64.165.196".to_string(),
            display_size: Size::new(1280, 720),
            preview_size: Size::new(640, 480),
            jpeg_quality: 90,
            max_save_slots: 3,
            request_timeout_secs: None,
            log: LogSettings::default(),
        }
    }
}

impl Default for LogSettings {
    fn default() -> Self {
        LogSettings {
            dir: "logs".to_string(),
            filter: "info,roi_trainer=debug".to_string(),
        }
    }
}

impl AppSettings {
    /// Defaults when the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml(&s).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        let settings: AppSettings = toml::from_str(s)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let s = toml::to_string_pretty(self).context("Failed to serialize AppSettings to TOML")?;
        std::fs::write(path, s)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.server_url)
            .with_context(|| format!("Invalid server_url: {}", self.server_url))?;
        ensure!(
            self.display_size.width > 0 && self.display_size.height > 0,
            "display_size must be non-zero"
        );
        ensure!(
            (1..=100).contains(&self.jpeg_quality),
            "jpeg_quality must be in 1..=100"
        );
        ensure!(self.max_save_slots > 0, "max_save_slots must be at least 1");
        Ok(())
    }

    pub fn camera_settings(&self) -> CameraSettings {
        CameraSettings {
            requested_preview: self.preview_size,
            jpeg_quality: self.jpeg_quality,
        }
    }
}
