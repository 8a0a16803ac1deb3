//! oledframe
//!
//! Widget compositor for small fixed-resolution monochrome displays. Widgets
//! are placed on a virtual canvas, composited in z-order, optionally viewed
//! through a scrolling/zooming viewport, encoded to a 1-bit bitmap and
//! pushed to a frame sink at a fixed refresh rate.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::{Arc, Mutex};
//! use oledframe::rendering::{LayoutManager, PlacementConfig};
//! use oledframe::sink::{MemorySink, MonochromeEncoder};
//! use oledframe::widgets::SolidWidget;
//! use oledframe::{Compositor, CompositorConfig, DisplayConfig};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let display = DisplayConfig::default();
//! let mut layout = LayoutManager::new(display.clone())?;
//! layout.add_widget(Arc::new(SolidWidget::new("fill", 255)), PlacementConfig::at(0, 0));
//!
//! let compositor = Compositor::new(
//!     Arc::new(Mutex::new(layout)),
//!     Arc::new(MonochromeEncoder::new(display.width, display.height)),
//!     Arc::new(MemorySink::new()),
//!     CompositorConfig::default(),
//! );
//! compositor.start()?;
//! std::thread::sleep(std::time::Duration::from_millis(500));
//! compositor.stop(std::time::Duration::from_secs(2));
//! println!("frames: {}", compositor.stats().frame_count);
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

pub mod rendering;
pub mod widget;
pub use widget::{Widget, WidgetImage};

pub mod sink;

pub mod compositor;
pub use compositor::{Compositor, CompositorStats};

// Async-friendly control surface over the render thread
pub mod async_api;
pub use async_api::DisplayHandle;

pub mod scheduler;
pub use scheduler::UpdateScheduler;

pub mod widgets;

pub mod config;

/// Physical display and virtual canvas geometry
///
/// The virtual canvas defaults to the display size (basic mode). Making it
/// larger switches the layout into viewport mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub virtual_width: Option<u32>,
    pub virtual_height: Option<u32>,
    /// Canvas fill value (0 = black, 255 = white)
    pub background: u8,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 40,
            virtual_width: None,
            virtual_height: None,
            background: 0,
        }
    }
}

/// Render loop configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CompositorConfig {
    /// Tick period in milliseconds (0 is treated as 1)
    pub refresh_rate_ms: u64,
    /// Event name frames are sent under
    pub event_name: String,
    /// Consecutive failed ticks tolerated before backing off
    pub error_backoff_threshold: u32,
    /// Extra delay inserted once the threshold is exceeded
    pub error_backoff: Duration,
    /// Minimum wall time between two sink error log lines
    pub sink_log_interval: Duration,
    /// Default join timeout used when the compositor is dropped
    pub stop_timeout: Duration,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: 100,
            event_name: "DISPLAY".to_string(),
            error_backoff_threshold: 10,
            error_backoff: Duration::from_secs(1),
            sink_log_interval: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(2),
        }
    }
}

impl CompositorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.refresh_rate_ms.max(1))
    }
}
