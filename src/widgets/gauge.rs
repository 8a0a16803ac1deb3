use crate::rendering::paint::{paint, PaintCommand};
use crate::rendering::raster::blank_canvas;
use crate::widget::{SizeCell, Snapshot, Widget, WidgetImage};
use crate::{Error, Result};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Source of a gauge reading in `0.0..=1.0`
pub trait Sampler: Send + Sync {
    fn sample(&self) -> Result<f32>;
}

impl<F> Sampler for F
where
    F: Fn() -> Result<f32> + Send + Sync,
{
    fn sample(&self) -> Result<f32> {
        self()
    }
}

/// Fraction of the current minute that has elapsed
#[derive(Debug, Default, Clone, Copy)]
pub struct SecondsSampler;

impl Sampler for SecondsSampler {
    fn sample(&self) -> Result<f32> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Update(format!("clock before epoch: {}", e)))?;
        let secs = (now.as_secs() % 60) as f32 + now.subsec_millis() as f32 / 1000.0;
        Ok(secs / 60.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstantSampler(pub f32);

impl Sampler for ConstantSampler {
    fn sample(&self) -> Result<f32> {
        Ok(self.0)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GaugeStyle {
    pub fill: u8,
    pub background: u8,
    pub border: bool,
}

impl Default for GaugeStyle {
    fn default() -> Self {
        Self {
            fill: 255,
            background: 0,
            border: true,
        }
    }
}

/// Horizontal bar showing the latest sample.
///
/// `update()` samples and swaps the reading into a [`Snapshot`];
/// `render()` only reads that snapshot.
pub struct GaugeWidget {
    name: String,
    sampler: Box<dyn Sampler>,
    reading: Snapshot<f32>,
    style: GaugeStyle,
    interval: Duration,
    size: SizeCell,
}

impl GaugeWidget {
    pub fn new(name: impl Into<String>, sampler: Box<dyn Sampler>, interval: Duration) -> Self {
        Self {
            name: name.into(),
            sampler,
            reading: Snapshot::new(0.0),
            style: GaugeStyle::default(),
            interval,
            size: SizeCell::new(128, 40),
        }
    }

    pub fn with_style(mut self, style: GaugeStyle) -> Self {
        self.style = style;
        self
    }

    pub fn reading(&self) -> f32 {
        self.reading.get()
    }
}

impl Widget for GaugeWidget {
    fn name(&self) -> &str {
        &self.name
    }

    fn update(&self) -> Result<()> {
        let v = self.sampler.sample()?;
        if v.is_nan() {
            return Err(Error::Update(format!("{} sampled NaN", self.name)));
        }
        self.reading.replace(v.clamp(0.0, 1.0));
        Ok(())
    }

    fn render(&self) -> Result<WidgetImage> {
        let (w, h) = self.size.get();
        let mut img = blank_canvas(w, h, self.style.background);
        paint(
            &mut img,
            &[PaintCommand::ProgressBar {
                x: 0,
                y: 0,
                width: w,
                height: h,
                fraction: self.reading.get(),
                border: self.style.border,
                value: self.style.fill,
            }],
        );
        Ok(img.into())
    }

    fn preferred_size(&self) -> (u32, u32) {
        (128, 40)
    }

    fn set_size(&self, width: u32, height: u32) {
        self.size.set(width, height);
    }

    fn update_interval(&self) -> Duration {
        self.interval
    }
}
