//! Scroll and zoom window over the virtual canvas

use crate::rendering::raster;
use image::GrayImage;

pub const MIN_ZOOM: f32 = 0.1;
pub const MAX_ZOOM: f32 = 10.0;
pub const DEFAULT_ZOOM_STEP: f32 = 0.1;

/// Display-sized window onto the virtual canvas.
///
/// Offsets are expressed in zoomed-canvas pixels and are not constrained
/// unless [`Viewport::constrain_to_canvas`] is called. The zoom factor is
/// clamped to `[MIN_ZOOM, MAX_ZOOM]` on every mutation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub offset_x: i32,
    pub offset_y: i32,
    zoom: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(128, 40)
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            offset_x: 0,
            offset_y: 0,
            zoom: 1.0,
        }
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn scroll_to(&mut self, x: i32, y: i32) {
        self.offset_x = x;
        self.offset_y = y;
    }

    pub fn scroll_by(&mut self, dx: i32, dy: i32) {
        self.offset_x = self.offset_x.saturating_add(dx);
        self.offset_y = self.offset_y.saturating_add(dy);
    }

    /// Place `(x, y)` at the center of the viewport. Odd dimensions round the
    /// half-size down.
    pub fn center_on(&mut self, x: i32, y: i32) {
        self.offset_x = clamp_i32(x as i64 - (self.width / 2) as i64);
        self.offset_y = clamp_i32(y as i64 - (self.height / 2) as i64);
    }

    /// NaN leaves the zoom unchanged; infinities clamp to the nearest bound.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_nan() {
            return;
        }
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
    }

    pub fn zoom_in(&mut self, step: f32) {
        self.set_zoom(self.zoom + step);
    }

    pub fn zoom_out(&mut self, step: f32) {
        self.set_zoom(self.zoom - step);
    }

    pub fn reset(&mut self) {
        self.offset_x = 0;
        self.offset_y = 0;
        self.zoom = 1.0;
    }

    /// `(left, top, right, bottom)`, right and bottom exclusive
    pub fn visible_region(&self) -> (i64, i64, i64, i64) {
        let left = self.offset_x as i64;
        let top = self.offset_y as i64;
        (left, top, left + self.width as i64, top + self.height as i64)
    }

    /// Clamp the offset into `[0, max(0, canvas - viewport)]` on each axis.
    pub fn constrain_to_canvas(&mut self, canvas_width: u32, canvas_height: u32) {
        let max_x = (canvas_width as i64 - self.width as i64).max(0);
        let max_y = (canvas_height as i64 - self.height as i64).max(0);
        self.offset_x = clamp_i32((self.offset_x as i64).clamp(0, max_x));
        self.offset_y = clamp_i32((self.offset_y as i64).clamp(0, max_y));
    }

    pub fn is_point_visible(&self, x: i32, y: i32) -> bool {
        let (left, top, right, bottom) = self.visible_region();
        let (x, y) = (x as i64, y as i64);
        left <= x && x < right && top <= y && y < bottom
    }

    /// AABB intersection against the visible region. A zero extent counts as
    /// one pixel, so zero-size rectangles behave like points.
    pub fn is_rect_visible(&self, x: i32, y: i32, w: u32, h: u32) -> bool {
        let (left, top, right, bottom) = self.visible_region();
        let (x, y) = (x as i64, y as i64);
        let w = w.max(1) as i64;
        let h = h.max(1) as i64;
        !(x + w <= left || x >= right || y + h <= top || y >= bottom)
    }

    /// Like [`Viewport::is_rect_visible`], but for a rectangle given in
    /// unzoomed virtual-canvas coordinates.
    pub fn is_canvas_rect_visible(&self, x: i32, y: i32, w: u32, h: u32) -> bool {
        if self.zoom == 1.0 {
            return self.is_rect_visible(x, y, w, h);
        }
        let z = self.zoom as f64;
        let zx = (x as f64 * z).floor();
        let zy = (y as f64 * z).floor();
        let zw = (w as f64 * z).ceil();
        let zh = (h as f64 * z).ceil();
        self.is_rect_visible(
            clamp_i32(zx as i64),
            clamp_i32(zy as i64),
            zw.min(u32::MAX as f64) as u32,
            zh.min(u32::MAX as f64) as u32,
        )
    }

    /// Turn a full virtual canvas into a display-sized frame: resample by the
    /// zoom factor, then cut out the window at the current offset, filling
    /// anything outside the canvas with `background`.
    pub fn project(&self, canvas: &GrayImage, background: u8) -> GrayImage {
        let zoomed;
        let source = if self.zoom != 1.0 {
            zoomed = raster::resample(canvas, self.zoom);
            &zoomed
        } else {
            canvas
        };
        raster::crop_letterboxed(
            source,
            self.offset_x as i64,
            self.offset_y as i64,
            self.width,
            self.height,
            background,
        )
    }
}

fn clamp_i32(v: i64) -> i32 {
    v.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl std::fmt::Display for Viewport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Viewport(size={}x{}, offset=({},{}), zoom={:.2})",
            self.width, self.height, self.offset_x, self.offset_y, self.zoom
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn defaults() {
        let v = Viewport::default();
        assert_eq!((v.width, v.height), (128, 40));
        assert_eq!((v.offset_x, v.offset_y), (0, 0));
        assert_eq!(v.zoom(), 1.0);
    }

    #[test]
    fn scroll_to_and_by() {
        let mut v = Viewport::new(128, 40);
        v.scroll_to(10, 20);
        v.scroll_by(-15, 5);
        assert_eq!((v.offset_x, v.offset_y), (-5, 25));
    }

    #[test]
    fn center_on_floors_odd_sizes() {
        let mut v = Viewport::new(127, 41);
        v.center_on(100, 50);
        assert_eq!((v.offset_x, v.offset_y), (37, 30));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut v = Viewport::default();
        v.set_zoom(50.0);
        assert_eq!(v.zoom(), MAX_ZOOM);
        v.set_zoom(-3.0);
        assert_eq!(v.zoom(), MIN_ZOOM);
        v.set_zoom(f32::INFINITY);
        assert_eq!(v.zoom(), MAX_ZOOM);
        v.set_zoom(f32::NAN);
        assert_eq!(v.zoom(), MAX_ZOOM);
    }

    #[test]
    fn repeated_zoom_steps_stay_in_range() {
        let mut v = Viewport::default();
        for _ in 0..500 {
            v.zoom_in(DEFAULT_ZOOM_STEP);
        }
        assert_eq!(v.zoom(), MAX_ZOOM);
        for _ in 0..500 {
            v.zoom_out(DEFAULT_ZOOM_STEP);
        }
        assert_eq!(v.zoom(), MIN_ZOOM);
        v.zoom_out(DEFAULT_ZOOM_STEP);
        assert_eq!(v.zoom(), MIN_ZOOM);
    }

    #[test]
    fn reset_keeps_size() {
        let mut v = Viewport::new(64, 32);
        v.scroll_to(5, 6);
        v.set_zoom(2.0);
        v.reset();
        assert_eq!(v, Viewport::new(64, 32));
    }

    #[test]
    fn visible_region_follows_offset() {
        let mut v = Viewport::new(128, 40);
        v.scroll_to(100, 30);
        assert_eq!(v.visible_region(), (100, 30, 228, 70));
    }

    #[test]
    fn constrain_clamps_each_axis() {
        let mut v = Viewport::new(128, 40);
        v.scroll_to(500, -20);
        v.constrain_to_canvas(256, 80);
        assert_eq!((v.offset_x, v.offset_y), (128, 0));
    }

    #[test]
    fn constrain_collapses_when_viewport_is_larger() {
        let mut v = Viewport::new(128, 40);
        v.scroll_to(30, 30);
        v.constrain_to_canvas(64, 20);
        assert_eq!((v.offset_x, v.offset_y), (0, 0));
    }

    #[test]
    fn constrain_invariant_over_grid() {
        for ox in [-1000, -1, 0, 1, 50, 128, 129, 1000] {
            for (cw, ch) in [(0u32, 0u32), (64, 20), (128, 40), (256, 80), (1000, 10)] {
                let mut v = Viewport::new(128, 40);
                v.scroll_to(ox, -ox);
                v.constrain_to_canvas(cw, ch);
                let max_x = (cw as i64 - 128).max(0);
                let max_y = (ch as i64 - 40).max(0);
                assert!((0..=max_x).contains(&(v.offset_x as i64)));
                assert!((0..=max_y).contains(&(v.offset_y as i64)));
            }
        }
    }

    #[test]
    fn point_visibility_is_half_open() {
        let v = Viewport::new(128, 40);
        assert!(v.is_point_visible(0, 0));
        assert!(v.is_point_visible(127, 39));
        assert!(!v.is_point_visible(128, 0));
        assert!(!v.is_point_visible(0, 40));
        assert!(!v.is_point_visible(-1, 0));
    }

    #[test]
    fn rect_visibility() {
        let mut v = Viewport::new(128, 40);
        v.scroll_to(100, 30);
        // Strictly outside on every side
        assert!(!v.is_rect_visible(0, 0, 100, 30));
        assert!(!v.is_rect_visible(228, 30, 10, 10));
        assert!(!v.is_rect_visible(100, 70, 10, 10));
        // Overlapping
        assert!(v.is_rect_visible(90, 20, 11, 11));
        assert!(v.is_rect_visible(150, 50, 64, 20));
        // Zero-size rectangles behave like points
        assert!(v.is_rect_visible(100, 30, 0, 0));
        assert!(!v.is_rect_visible(228, 30, 0, 0));
        assert!(!v.is_rect_visible(100, 70, 0, 0));
    }

    #[test]
    fn canvas_rect_visibility_accounts_for_zoom() {
        let mut v = Viewport::new(128, 40);
        v.set_zoom(2.0);
        v.scroll_to(200, 0);
        // Canvas x 100..110 maps to zoomed 200..220
        assert!(v.is_canvas_rect_visible(100, 0, 10, 10));
        assert!(!v.is_canvas_rect_visible(40, 0, 10, 10));
    }

    #[test]
    fn project_without_zoom_crops() {
        let mut canvas = GrayImage::from_pixel(256, 80, Luma([0]));
        canvas.put_pixel(150, 50, Luma([255]));
        let mut v = Viewport::new(128, 40);
        v.scroll_to(100, 30);
        let out = v.project(&canvas, 0);
        assert_eq!(out.dimensions(), (128, 40));
        assert_eq!(out.get_pixel(50, 20).0[0], 255);
    }

    #[test]
    fn project_with_zoom_returns_display_size() {
        let canvas = GrayImage::from_pixel(256, 80, Luma([255]));
        let mut v = Viewport::new(128, 40);
        v.set_zoom(0.25);
        let out = v.project(&canvas, 0);
        assert_eq!(out.dimensions(), (128, 40));
        // Zoomed canvas is 64x20; the rest is letterboxed.
        assert_eq!(out.get_pixel(100, 30).0[0], 0);
    }
}
