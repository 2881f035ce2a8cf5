use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::date::DateWindow;
use crate::geometry::{DomainRange, OverlayGeometry, PixelRect, Size};
use crate::playback::EndOfList;

pub const DEFAULT_MIN_DRAW_SIZE_PX: f64 = 10.0;
pub const DEFAULT_PLAYBACK_PERIOD_MS: u64 = 2000;
pub const DEFAULT_AUTHOR: &str = "Anonymous";

/// Tunables for one annotation view. Every field has a default, so a config
/// file only needs the values it changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Both sides of a drawn box must exceed this many pixels.
    pub min_draw_size_px: f64,
    pub playback_period_ms: u64,
    pub end_of_list: EndOfList,
    pub domain: DomainRange,
    /// Natural size of the spectrogram images.
    pub original_image: Size,
    /// Plotted-data region inside the original image.
    pub plot_bbox: PixelRect,
    pub default_author: String,
    pub date_window: DateWindow,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_draw_size_px: DEFAULT_MIN_DRAW_SIZE_PX,
            playback_period_ms: DEFAULT_PLAYBACK_PERIOD_MS,
            end_of_list: EndOfList::StopAndReset,
            domain: DomainRange::default(),
            original_image: Size::new(1000.0, 1000.0),
            plot_bbox: PixelRect::new(125.0, 60.0, 775.0, 770.0),
            default_author: DEFAULT_AUTHOR.to_string(),
            date_window: DateWindow::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !self.min_draw_size_px.is_finite() || self.min_draw_size_px < 0.0 {
            return Err(format!(
                "min_draw_size_px must be a non-negative number, got {}",
                self.min_draw_size_px
            ));
        }
        if self.playback_period_ms == 0 {
            return Err("playback_period_ms must be greater than zero".to_string());
        }
        self.domain.validate()?;
        self.overlay_geometry()?;
        self.date_window.validate()?;
        Ok(())
    }

    pub fn playback_period(&self) -> Duration {
        Duration::from_millis(self.playback_period_ms)
    }

    pub fn overlay_geometry(&self) -> Result<OverlayGeometry, String> {
        OverlayGeometry::new(self.original_image, self.plot_bbox)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, String> {
        let config: Self =
            yaml_serde::from_str(text).map_err(|e| format!("Failed to parse YAML config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, String> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| format!("Failed to parse JSON config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a `.yaml`/`.yml` or `.json` config file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Self::from_yaml_str(&content),
            "json" => Self::from_json_str(&content),
            other => Err(format!(
                "Unsupported config extension '{other}' for {} (use .yaml, .yml or .json)",
                path.display()
            )),
        }
    }

    /// Apply values that take precedence over the file (environment, flags).
    pub fn with_overrides(
        mut self,
        playback_period_ms: Option<u64>,
        min_draw_size_px: Option<f64>,
    ) -> Result<Self, String> {
        if let Some(ms) = playback_period_ms {
            self.playback_period_ms = ms;
        }
        if let Some(px) = min_draw_size_px {
            self.min_draw_size_px = px;
        }
        self.validate()?;
        Ok(self)
    }
}
