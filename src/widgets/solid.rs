use crate::widget::{SizeCell, Widget, WidgetImage};
use crate::Result;
use image::{GrayAlphaImage, GrayImage, Luma, LumaA};
use std::time::Duration;

/// Fills its whole area with one value, optionally translucent.
pub struct SolidWidget {
    name: String,
    value: u8,
    alpha: Option<u8>,
    preferred: (u32, u32),
    size: SizeCell,
}

impl SolidWidget {
    pub fn new(name: impl Into<String>, value: u8) -> Self {
        Self {
            name: name.into(),
            value,
            alpha: None,
            preferred: (128, 40),
            size: SizeCell::new(128, 40),
        }
    }

    pub fn with_alpha(mut self, alpha: u8) -> Self {
        self.alpha = Some(alpha);
        self
    }

    pub fn with_preferred_size(mut self, width: u32, height: u32) -> Self {
        self.preferred = (width, height);
        self.size.set(width, height);
        self
    }
}

impl Widget for SolidWidget {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&self) -> Result<()> {
        Ok(())
    }

    fn render(&self) -> Result<WidgetImage> {
        let (w, h) = self.size.get();
        Ok(match self.alpha {
            Some(a) => GrayAlphaImage::from_pixel(w, h, LumaA([self.value, a])).into(),
            None => GrayImage::from_pixel(w, h, Luma([self.value])).into(),
        })
    }

    fn preferred_size(&self) -> (u32, u32) {
        self.preferred
    }

    fn set_size(&self, width: u32, height: u32) {
        self.size.set(width, height);
    }

    fn update_interval(&self) -> Duration {
        Duration::from_secs(60)
    }
}
