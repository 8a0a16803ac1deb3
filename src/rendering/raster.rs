//! Canvas primitives: allocation, resampling, clipped pasting and cropping.
//!
//! The canvas is always 8-bit grayscale; the encoder reduces it to one bit
//! per pixel at the very end of a tick.
use crate::widget::WidgetImage;
use image::imageops::{self, FilterType};
use image::{GrayAlphaImage, GrayImage, Luma};

pub fn blank_canvas(width: u32, height: u32, background: u8) -> GrayImage {
    GrayImage::from_pixel(width, height, Luma([background]))
}

/// Scale the whole canvas by `factor`, truncating the target size and never
/// going below 1x1.
pub fn resample(canvas: &GrayImage, factor: f32) -> GrayImage {
    let (w, h) = scaled_dimensions(canvas.dimensions(), factor);
    imageops::resize(canvas, w, h, FilterType::Lanczos3)
}

pub fn scaled_dimensions((width, height): (u32, u32), factor: f32) -> (u32, u32) {
    let w = (width as f64 * factor as f64) as u32;
    let h = (height as f64 * factor as f64) as u32;
    (w.max(1), h.max(1))
}

/// Paste a widget image at `(x, y)`, clipped at the canvas edges.
pub fn paste(canvas: &mut GrayImage, img: &WidgetImage, x: i64, y: i64) {
    match img {
        WidgetImage::Gray(src) => paste_opaque(canvas, src, x, y),
        WidgetImage::GrayAlpha(src) => paste_alpha(canvas, src, x, y),
    }
}

pub fn paste_opaque(canvas: &mut GrayImage, src: &GrayImage, x: i64, y: i64) {
    imageops::replace(canvas, src, x, y);
}

/// Blend `src` onto the canvas using its alpha channel as the mask.
pub fn paste_alpha(canvas: &mut GrayImage, src: &GrayAlphaImage, x: i64, y: i64) {
    let Some(area) = overlap(canvas.dimensions(), src.dimensions(), x, y) else {
        return;
    };
    for dy in area.top..area.bottom {
        for dx in area.left..area.right {
            let sx = (dx as i64 - x) as u32;
            let sy = (dy as i64 - y) as u32;
            let [value, alpha] = src.get_pixel(sx, sy).0;
            let dst = canvas.get_pixel_mut(dx, dy);
            dst.0[0] = blend(value, dst.0[0], alpha);
        }
    }
}

fn blend(src: u8, dst: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    ((src as u32 * a + dst as u32 * (255 - a) + 127) / 255) as u8
}

/// Canvas-space rectangle (half-open) covered by an image placed at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Overlap {
    left: u32,
    top: u32,
    right: u32,
    bottom: u32,
}

fn overlap(canvas: (u32, u32), src: (u32, u32), x: i64, y: i64) -> Option<Overlap> {
    let left = x.max(0);
    let top = y.max(0);
    let right = (x + src.0 as i64).min(canvas.0 as i64);
    let bottom = (y + src.1 as i64).min(canvas.1 as i64);
    if right <= left || bottom <= top {
        return None;
    }
    Some(Overlap {
        left: left as u32,
        top: top as u32,
        right: right as u32,
        bottom: bottom as u32,
    })
}

/// Cut a `width` x `height` window at `(left, top)` out of `canvas`.
///
/// Parts of the window that fall outside the canvas are filled with
/// `background`, so scrolling past the content edge letterboxes instead of
/// wrapping or failing.
pub fn crop_letterboxed(
    canvas: &GrayImage,
    left: i64,
    top: i64,
    width: u32,
    height: u32,
    background: u8,
) -> GrayImage {
    let (cw, ch) = canvas.dimensions();
    let inside = left >= 0
        && top >= 0
        && left + width as i64 <= cw as i64
        && top + height as i64 <= ch as i64;
    if inside {
        return imageops::crop_imm(canvas, left as u32, top as u32, width, height).to_image();
    }

    let mut out = blank_canvas(width, height, background);
    let src_left = left.max(0);
    let src_top = top.max(0);
    let src_right = (left + width as i64).min(cw as i64);
    let src_bottom = (top + height as i64).min(ch as i64);
    if src_right > src_left && src_bottom > src_top {
        let visible = imageops::crop_imm(
            canvas,
            src_left as u32,
            src_top as u32,
            (src_right - src_left) as u32,
            (src_bottom - src_top) as u32,
        )
        .to_image();
        imageops::replace(&mut out, &visible, src_left - left, src_top - top);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::LumaA;

    #[test]
    fn blank_canvas_is_filled() {
        let c = blank_canvas(16, 8, 42);
        assert_eq!(c.dimensions(), (16, 8));
        assert!(c.pixels().all(|p| p.0[0] == 42));
    }

    #[test]
    fn opaque_paste_clips_at_edges() {
        let mut c = blank_canvas(10, 10, 0);
        let src = GrayImage::from_pixel(4, 4, Luma([255]));
        paste_opaque(&mut c, &src, 8, -2);
        assert_eq!(c.get_pixel(8, 0).0[0], 255);
        assert_eq!(c.get_pixel(9, 1).0[0], 255);
        assert_eq!(c.get_pixel(9, 2).0[0], 0);
        assert_eq!(c.get_pixel(7, 0).0[0], 0);
    }

    #[test]
    fn alpha_paste_blends() {
        let mut c = blank_canvas(4, 4, 0);
        let src = GrayAlphaImage::from_pixel(2, 2, LumaA([255, 128]));
        paste_alpha(&mut c, &src, 1, 1);
        assert_eq!(c.get_pixel(1, 1).0[0], 128);
        assert_eq!(c.get_pixel(0, 0).0[0], 0);

        let transparent = GrayAlphaImage::from_pixel(4, 4, LumaA([255, 0]));
        paste_alpha(&mut c, &transparent, 0, 0);
        assert_eq!(c.get_pixel(1, 1).0[0], 128);
        assert_eq!(c.get_pixel(3, 3).0[0], 0);
    }

    #[test]
    fn alpha_paste_fully_outside_is_noop() {
        let mut c = blank_canvas(4, 4, 9);
        let src = GrayAlphaImage::from_pixel(2, 2, LumaA([255, 255]));
        paste_alpha(&mut c, &src, -2, 0);
        paste_alpha(&mut c, &src, 4, 4);
        assert!(c.pixels().all(|p| p.0[0] == 9));
    }

    #[test]
    fn crop_inside_is_plain_crop() {
        let mut c = blank_canvas(8, 8, 0);
        c.put_pixel(3, 2, Luma([200]));
        let out = crop_letterboxed(&c, 2, 2, 4, 4, 0);
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(out.get_pixel(1, 0).0[0], 200);
    }

    #[test]
    fn crop_past_edge_letterboxes() {
        let c = blank_canvas(8, 8, 255);
        let out = crop_letterboxed(&c, -2, 6, 4, 4, 0);
        assert_eq!(out.dimensions(), (4, 4));
        // Left two columns and bottom two rows are outside the canvas.
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        assert_eq!(out.get_pixel(2, 0).0[0], 255);
        assert_eq!(out.get_pixel(3, 1).0[0], 255);
        assert_eq!(out.get_pixel(3, 2).0[0], 0);
    }

    #[test]
    fn crop_completely_outside_is_background() {
        let c = blank_canvas(8, 8, 255);
        let out = crop_letterboxed(&c, 100, 100, 4, 4, 17);
        assert!(out.pixels().all(|p| p.0[0] == 17));
    }

    #[test]
    fn scaled_dimensions_truncate_and_floor_at_one() {
        assert_eq!(scaled_dimensions((256, 80), 1.5), (384, 120));
        assert_eq!(scaled_dimensions((5, 5), 0.1), (1, 1));
    }
}
