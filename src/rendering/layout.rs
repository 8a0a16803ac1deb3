//! Widget placement and composition onto the virtual canvas
use crate::rendering::raster;
use crate::rendering::viewport::Viewport;
use crate::widget::{same_widget, Widget};
use crate::{DisplayConfig, Error, Result};
use image::GrayImage;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Where and how to place a widget, as read from configuration.
///
/// `w`/`h` of `None` (or `0`) fall back to the widget's preferred size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    pub x: i32,
    pub y: i32,
    pub w: Option<u32>,
    pub h: Option<u32>,
    pub z_order: i32,
    pub scale: f32,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            w: None,
            h: None,
            z_order: 0,
            scale: 1.0,
        }
    }
}

impl PlacementConfig {
    pub fn at(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            ..Default::default()
        }
    }

    pub fn with_size(mut self, w: u32, h: u32) -> Self {
        self.w = Some(w);
        self.h = Some(h);
        self
    }

    pub fn with_z_order(mut self, z_order: i32) -> Self {
        self.z_order = z_order;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale;
        self
    }
}

/// A widget attached to the layout
pub struct Placement {
    widget: Arc<dyn Widget>,
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
    pub z_order: i32,
    pub visible: bool,
    /// Local scale, only honoured in viewport mode
    pub scale: f32,
    seq: u64,
}

impl Placement {
    pub fn widget(&self) -> &Arc<dyn Widget> {
        &self.widget
    }

    /// Insertion sequence number; breaks z-order ties.
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    fn contains(&self, px: i32, py: i32) -> bool {
        let (px, py) = (px as i64, py as i64);
        let (x, y) = (self.x as i64, self.y as i64);
        x <= px && px < x + self.w as i64 && y <= py && py < y + self.h as i64
    }
}

impl std::fmt::Debug for Placement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Placement")
            .field("widget", &self.widget.name())
            .field("x", &self.x)
            .field("y", &self.y)
            .field("w", &self.w)
            .field("h", &self.h)
            .field("z_order", &self.z_order)
            .field("visible", &self.visible)
            .field("scale", &self.scale)
            .finish()
    }
}

/// Owns the ordered placements and composites them into frames.
///
/// Two modes:
/// - basic: the virtual canvas is the display, `composite` returns it as is
/// - viewport: the virtual canvas is larger than the display and a
///   [`Viewport`] selects (and zooms) the part that is shown
///
/// Placements are kept sorted by `(z_order, insertion sequence)`, lowest
/// first. Not internally synchronized; callers serialize access.
#[derive(Debug)]
pub struct LayoutManager {
    display_width: u32,
    display_height: u32,
    virtual_width: u32,
    virtual_height: u32,
    background: u8,
    viewport_mode: bool,
    viewport: Option<Viewport>,
    placements: Vec<Placement>,
    next_seq: u64,
}

impl LayoutManager {
    pub fn new(config: DisplayConfig) -> Result<Self> {
        let virtual_width = config.virtual_width.unwrap_or(config.width);
        let virtual_height = config.virtual_height.unwrap_or(config.height);
        validate_sizes(config.width, config.height, virtual_width, virtual_height)?;

        let mut manager = Self {
            display_width: config.width,
            display_height: config.height,
            virtual_width,
            virtual_height,
            background: config.background,
            viewport_mode: false,
            viewport: None,
            placements: Vec::new(),
            next_seq: 0,
        };
        manager.refresh_mode();

        if manager.viewport_mode {
            info!(
                "LayoutManager initialized (viewport mode): display={}x{}, virtual={}x{}",
                manager.display_width,
                manager.display_height,
                manager.virtual_width,
                manager.virtual_height
            );
        } else {
            info!(
                "LayoutManager initialized (basic mode): {}x{}",
                manager.display_width, manager.display_height
            );
        }
        Ok(manager)
    }

    /// Virtual canvas width
    pub fn width(&self) -> u32 {
        self.virtual_width
    }

    /// Virtual canvas height
    pub fn height(&self) -> u32 {
        self.virtual_height
    }

    pub fn display_size(&self) -> (u32, u32) {
        (self.display_width, self.display_height)
    }

    pub fn background(&self) -> u8 {
        self.background
    }

    pub fn is_viewport_mode(&self) -> bool {
        self.viewport_mode
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    pub fn viewport_mut(&mut self) -> Option<&mut Viewport> {
        self.viewport.as_mut()
    }

    pub fn placements(&self) -> impl Iterator<Item = &Placement> {
        self.placements.iter()
    }

    pub fn len(&self) -> usize {
        self.placements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Attach a widget. Missing sizes come from `preferred_size()`, the final
    /// size is pushed to the widget with `set_size`. Outside viewport mode
    /// the scale is forced to 1.0.
    pub fn add_widget(&mut self, widget: Arc<dyn Widget>, placement: PlacementConfig) {
        let (pref_w, pref_h) = widget.preferred_size();
        let w = placement.w.filter(|w| *w > 0).unwrap_or(pref_w);
        let h = placement.h.filter(|h| *h > 0).unwrap_or(pref_h);
        widget.set_size(w, h);

        let scale = if self.viewport_mode {
            sanitize_scale(placement.scale, widget.name())
        } else {
            1.0
        };

        let seq = self.next_seq;
        self.next_seq += 1;

        // Insert after every placement with the same or lower z-order so
        // ties keep insertion order.
        let z_order = placement.z_order;
        let idx = self.placements.partition_point(|p| p.z_order <= z_order);

        if scale != 1.0 {
            info!(
                "Widget added: {} at ({},{}) size ({}x{}) scale={:.2}",
                widget.name(),
                placement.x,
                placement.y,
                w,
                h,
                scale
            );
        } else {
            info!(
                "Widget added: {} at ({},{}) size ({}x{})",
                widget.name(),
                placement.x,
                placement.y,
                w,
                h
            );
        }

        self.placements.insert(
            idx,
            Placement {
                widget,
                x: placement.x,
                y: placement.y,
                w,
                h,
                z_order,
                visible: true,
                scale,
                seq,
            },
        );
    }

    /// Detach the first placement holding `widget`.
    pub fn remove_widget(&mut self, widget: &Arc<dyn Widget>) -> bool {
        match self.position_of(widget) {
            Some(idx) => {
                let removed = self.placements.remove(idx);
                info!("Widget removed: {}", removed.widget.name());
                true
            }
            None => false,
        }
    }

    /// Returns whether the widget was found.
    pub fn set_widget_visibility(&mut self, widget: &Arc<dyn Widget>, visible: bool) -> bool {
        match self.position_of(widget) {
            Some(idx) => {
                self.placements[idx].visible = visible;
                debug!("Widget {} visibility: {}", widget.name(), visible);
                true
            }
            None => false,
        }
    }

    /// Change a placement's size and push it to the widget.
    pub fn resize_widget(&mut self, widget: &Arc<dyn Widget>, w: u32, h: u32) -> bool {
        match self.position_of(widget) {
            Some(idx) => {
                let p = &mut self.placements[idx];
                p.w = w;
                p.h = h;
                p.widget.set_size(w, h);
                debug!("Widget {} resized to {}x{}", widget.name(), w, h);
                true
            }
            None => false,
        }
    }

    /// Topmost visible widget whose box contains `(x, y)`.
    pub fn get_widget_at(&self, x: i32, y: i32) -> Option<Arc<dyn Widget>> {
        self.placements
            .iter()
            .rev()
            .filter(|p| p.visible)
            .find(|p| p.contains(x, y))
            .map(|p| Arc::clone(&p.widget))
    }

    pub fn clear(&mut self) {
        self.placements.clear();
        info!("Layout cleared");
    }

    /// Render every visible placement onto a fresh canvas.
    ///
    /// With `apply_viewport` in viewport mode, placements outside the
    /// viewport are culled (not rendered) and the result is the
    /// display-sized projection; otherwise the full virtual canvas is
    /// returned. A failing widget leaves its area as background.
    pub fn composite(&self, apply_viewport: bool) -> GrayImage {
        let mut canvas =
            raster::blank_canvas(self.virtual_width, self.virtual_height, self.background);

        let active_viewport = if apply_viewport && self.viewport_mode {
            self.viewport.as_ref()
        } else {
            None
        };

        for placement in self.placements.iter().filter(|p| p.visible) {
            let (w, h) = self.footprint(placement);
            if w == 0 || h == 0 {
                continue;
            }
            if let Some(vp) = active_viewport {
                if !vp.is_canvas_rect_visible(placement.x, placement.y, w, h) {
                    continue;
                }
            }

            let rendered = panic::catch_unwind(AssertUnwindSafe(|| placement.widget.render()))
                .unwrap_or_else(|_| Err(Error::Render("widget panicked".to_string())));
            match rendered {
                Ok(img) => {
                    let img = img.resized(w, h);
                    raster::paste(&mut canvas, &img, placement.x as i64, placement.y as i64);
                }
                Err(e) => {
                    error!("Failed to render widget {}: {}", placement.widget.name(), e);
                }
            }
        }

        match active_viewport {
            Some(vp) => vp.project(&canvas, self.background),
            None => canvas,
        }
    }

    /// Resize the virtual canvas. Entering viewport mode for the first time
    /// creates a viewport at offset (0, 0), zoom 1.0.
    pub fn set_virtual_size(&mut self, width: u32, height: u32) -> Result<()> {
        validate_sizes(self.display_width, self.display_height, width, height)?;
        self.virtual_width = width;
        self.virtual_height = height;
        self.refresh_mode();
        info!("Virtual canvas resized to {}x{}", width, height);
        Ok(())
    }

    /// Clamp the viewport offset against the zoomed virtual canvas. No-op in
    /// basic mode.
    pub fn constrain_viewport(&mut self) {
        if !self.viewport_mode {
            return;
        }
        let (vw, vh) = (self.virtual_width, self.virtual_height);
        if let Some(vp) = self.viewport.as_mut() {
            let zoomed_w = (vw as f64 * vp.zoom() as f64) as u32;
            let zoomed_h = (vh as f64 * vp.zoom() as f64) as u32;
            vp.constrain_to_canvas(zoomed_w, zoomed_h);
        }
    }

    fn refresh_mode(&mut self) {
        self.viewport_mode = self.virtual_width != self.display_width
            || self.virtual_height != self.display_height;
        if self.viewport_mode && self.viewport.is_none() {
            self.viewport = Some(Viewport::new(self.display_width, self.display_height));
        }
    }

    fn position_of(&self, widget: &Arc<dyn Widget>) -> Option<usize> {
        self.placements
            .iter()
            .position(|p| same_widget(&p.widget, widget))
    }

    /// On-canvas size of a placement, with local scale applied in viewport
    /// mode.
    fn footprint(&self, p: &Placement) -> (u32, u32) {
        if self.viewport_mode && p.scale != 1.0 {
            (
                (p.w as f64 * p.scale as f64) as u32,
                (p.h as f64 * p.scale as f64) as u32,
            )
        } else {
            (p.w, p.h)
        }
    }
}

fn validate_sizes(width: u32, height: u32, virtual_width: u32, virtual_height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(Error::Config(format!(
            "display size must be non-zero, got {}x{}",
            width, height
        )));
    }
    if virtual_width < width || virtual_height < height {
        return Err(Error::Config(format!(
            "virtual canvas {}x{} is smaller than display {}x{}",
            virtual_width, virtual_height, width, height
        )));
    }
    Ok(())
}

fn sanitize_scale(scale: f32, name: &str) -> f32 {
    if scale.is_finite() && scale > 0.0 {
        scale
    } else {
        warn!("Ignoring invalid scale {} for widget {}", scale, name);
        1.0
    }
}
