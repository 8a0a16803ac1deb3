//! Widget contract
//!
//! A widget is a long-lived renderable unit shared between two schedules:
//! the update scheduler (single writer, calls [`Widget::update`]) and the
//! compositor's render thread (single reader, calls [`Widget::render`]).
//! Both run concurrently, so every method takes `&self` and implementations
//! keep their state behind interior mutability. [`Snapshot`] and [`SizeCell`]
//! are the building blocks the built-in widgets use for that.

use crate::Result;
use image::imageops::{self, FilterType};
use image::{GrayAlphaImage, GrayImage};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Image produced by a widget.
///
/// `GrayAlpha` images are alpha-blended onto the canvas, `Gray` images
/// overwrite it.
#[derive(Debug, Clone)]
pub enum WidgetImage {
    Gray(GrayImage),
    GrayAlpha(GrayAlphaImage),
}

impl WidgetImage {
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            WidgetImage::Gray(img) => img.dimensions(),
            WidgetImage::GrayAlpha(img) => img.dimensions(),
        }
    }

    pub fn has_alpha(&self) -> bool {
        matches!(self, WidgetImage::GrayAlpha(_))
    }

    /// Resample to `width` x `height` (Lanczos3). Returns `self` untouched
    /// when the size already matches.
    pub fn resized(self, width: u32, height: u32) -> Self {
        if self.dimensions() == (width, height) {
            return self;
        }
        match self {
            WidgetImage::Gray(img) => {
                WidgetImage::Gray(imageops::resize(&img, width, height, FilterType::Lanczos3))
            }
            WidgetImage::GrayAlpha(img) => WidgetImage::GrayAlpha(imageops::resize(
                &img,
                width,
                height,
                FilterType::Lanczos3,
            )),
        }
    }
}

impl From<GrayImage> for WidgetImage {
    fn from(img: GrayImage) -> Self {
        WidgetImage::Gray(img)
    }
}

impl From<GrayAlphaImage> for WidgetImage {
    fn from(img: GrayAlphaImage) -> Self {
        WidgetImage::GrayAlpha(img)
    }
}

/// Core trait for renderable display widgets
pub trait Widget: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Refresh internal state (sample a metric, read the clock, ...).
    ///
    /// Called by the update scheduler, never by the render thread. Any I/O
    /// belongs here.
    fn update(&self) -> Result<()>;

    /// Render the current state.
    ///
    /// Must not block. The returned image has the size last passed to
    /// [`Widget::set_size`], or [`Widget::preferred_size`] if it was never
    /// called.
    fn render(&self) -> Result<WidgetImage>;

    fn preferred_size(&self) -> (u32, u32);

    fn set_size(&self, width: u32, height: u32);

    /// How often the update scheduler should call [`Widget::update`]
    fn update_interval(&self) -> Duration;
}

/// Widgets are shared by reference; identity is the allocation, not the value.
pub fn same_widget(a: &Arc<dyn Widget>, b: &Arc<dyn Widget>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Width and height packed into one atomic word so readers never observe a
/// half-written size.
#[derive(Debug)]
pub struct SizeCell(AtomicU64);

impl SizeCell {
    pub fn new(width: u32, height: u32) -> Self {
        SizeCell(AtomicU64::new(pack(width, height)))
    }

    pub fn get(&self) -> (u32, u32) {
        unpack(self.0.load(Ordering::Acquire))
    }

    pub fn set(&self, width: u32, height: u32) {
        self.0.store(pack(width, height), Ordering::Release);
    }
}

fn pack(width: u32, height: u32) -> u64 {
    ((width as u64) << 32) | height as u64
}

fn unpack(v: u64) -> (u32, u32) {
    ((v >> 32) as u32, v as u32)
}

/// Mutex-guarded state snapshot.
///
/// The writer builds a complete new value and swaps it in with
/// [`Snapshot::replace`]; the reader clones the whole value with
/// [`Snapshot::get`]. Multi-field state is therefore never read half-updated.
#[derive(Debug, Default)]
pub struct Snapshot<T> {
    inner: Mutex<T>,
}

impl<T: Clone> Snapshot<T> {
    pub fn new(value: T) -> Self {
        Snapshot {
            inner: Mutex::new(value),
        }
    }

    pub fn get(&self) -> T {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn replace(&self, value: T) -> T {
        let mut guard = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::replace(&mut *guard, value)
    }
}
