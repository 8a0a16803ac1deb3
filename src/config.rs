//! Application configuration file (JSON)
//!
//! ```json
//! {
//!   "display": { "width": 128, "height": 40, "background_color": 0 },
//!   "layout": { "virtual_width": 256, "virtual_height": 80 },
//!   "refresh_rate_ms": 100,
//!   "widgets": [
//!     { "type": "gauge", "id": "seconds",
//!       "position": { "x": 0, "y": 0, "w": 128, "h": 40, "z_order": 0 },
//!       "properties": { "update_interval": 0.5, "sampler": "seconds" } }
//!   ]
//! }
//! ```

use crate::rendering::PlacementConfig;
use crate::{CompositorConfig, DisplayConfig, Error, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub display: DisplaySection,
    pub layout: LayoutSection,
    pub refresh_rate_ms: u64,
    pub event_name: String,
    pub widgets: Vec<WidgetConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySection {
    pub width: u32,
    pub height: u32,
    pub background_color: u8,
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            width: 128,
            height: 40,
            background_color: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSection {
    pub virtual_width: Option<u32>,
    pub virtual_height: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    pub x: i32,
    pub y: i32,
    pub w: Option<u32>,
    pub h: Option<u32>,
    pub z_order: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetProperties {
    /// Seconds between `update()` calls
    pub update_interval: f64,
    pub fill_color: u8,
    pub background_color: u8,
    /// Solid widgets only: render with this opacity
    pub alpha: Option<u8>,
    /// Gauges only: draw a frame around the bar
    pub border: bool,
    /// Gauges only: `"seconds"` or `"constant"`
    pub sampler: String,
    /// Value reported by the `"constant"` sampler (0.0..=1.0)
    pub value: f32,
}

impl Default for WidgetProperties {
    fn default() -> Self {
        Self {
            update_interval: 1.0,
            fill_color: 255,
            background_color: 0,
            alpha: None,
            border: true,
            sampler: "seconds".to_string(),
            value: 0.0,
        }
    }
}

impl WidgetProperties {
    pub fn update_interval(&self) -> Duration {
        if self.update_interval.is_finite() && self.update_interval > 0.0 {
            Duration::from_secs_f64(self.update_interval)
        } else {
            Duration::from_secs(1)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    pub enabled: bool,
    pub position: PositionConfig,
    pub scale: f32,
    pub properties: WidgetProperties,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            kind: String::new(),
            id: String::new(),
            enabled: true,
            position: PositionConfig::default(),
            scale: 1.0,
            properties: WidgetProperties::default(),
        }
    }
}

impl WidgetConfig {
    pub fn placement(&self) -> PlacementConfig {
        PlacementConfig {
            x: self.position.x,
            y: self.position.y,
            w: self.position.w,
            h: self.position.h,
            z_order: self.position.z_order,
            scale: self.scale,
        }
    }

    /// Name used for the widget: the id, or the type when no id is given
    pub fn display_name(&self) -> &str {
        if self.id.is_empty() {
            &self.kind
        } else {
            &self.id
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            display: DisplaySection::default(),
            layout: LayoutSection::default(),
            refresh_rate_ms: 100,
            event_name: "DISPLAY".to_string(),
            widgets: vec![WidgetConfig {
                kind: "gauge".to_string(),
                id: "seconds".to_string(),
                position: PositionConfig {
                    w: Some(128),
                    h: Some(40),
                    ..Default::default()
                },
                properties: WidgetProperties {
                    update_interval: 0.5,
                    ..Default::default()
                },
                ..Default::default()
            }],
        }
    }
}

impl AppConfig {
    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Config file not found: {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&text)?;
        info!("Config loaded from: {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let d = self.display_config();
        if d.width == 0 || d.height == 0 {
            return Err(Error::Config("display size must be non-zero".into()));
        }
        let vw = d.virtual_width.unwrap_or(d.width);
        let vh = d.virtual_height.unwrap_or(d.height);
        if vw < d.width || vh < d.height {
            return Err(Error::Config(format!(
                "virtual canvas {}x{} is smaller than display {}x{}",
                vw, vh, d.width, d.height
            )));
        }
        for w in &self.widgets {
            if w.kind.is_empty() {
                return Err(Error::Config(format!(
                    "widget '{}' has no type",
                    w.display_name()
                )));
            }
        }
        Ok(())
    }

    pub fn display_config(&self) -> DisplayConfig {
        DisplayConfig {
            width: self.display.width,
            height: self.display.height,
            virtual_width: self.layout.virtual_width,
            virtual_height: self.layout.virtual_height,
            background: self.display.background_color,
        }
    }

    pub fn compositor_config(&self) -> CompositorConfig {
        CompositorConfig {
            refresh_rate_ms: self.refresh_rate_ms,
            event_name: self.event_name.clone(),
            ..Default::default()
        }
    }

    pub fn enabled_widgets(&self) -> impl Iterator<Item = &WidgetConfig> {
        self.widgets.iter().filter(|w| w.enabled)
    }
}
