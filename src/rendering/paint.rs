//! Very small paint command set used by the built-in widgets
use image::{GrayImage, Luma};

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        value: u8,
    },
    /// One-pixel rectangle outline
    Outline {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        value: u8,
    },
    /// Horizontal bar, optionally framed, filled to `fraction` (0.0..=1.0)
    ProgressBar {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        fraction: f32,
        border: bool,
        value: u8,
    },
}

pub fn paint(target: &mut GrayImage, commands: &[PaintCommand]) {
    for cmd in commands {
        match *cmd {
            PaintCommand::SolidRect {
                x,
                y,
                width,
                height,
                value,
            } => fill_rect(target, x, y, width, height, value),
            PaintCommand::Outline {
                x,
                y,
                width,
                height,
                value,
            } => outline(target, x, y, width, height, value),
            PaintCommand::ProgressBar {
                x,
                y,
                width,
                height,
                fraction,
                border,
                value,
            } => {
                if border {
                    outline(target, x, y, width, height, value);
                }
                // 2px inset from the frame on each side
                let inner = width.saturating_sub(4);
                let fraction = if fraction.is_nan() {
                    0.0
                } else {
                    fraction.clamp(0.0, 1.0)
                };
                let filled = (inner as f32 * fraction) as u32;
                if filled > 0 {
                    fill_rect(target, x + 2, y + 2, filled, height.saturating_sub(4), value);
                }
            }
        }
    }
}

fn fill_rect(target: &mut GrayImage, x: i32, y: i32, width: u32, height: u32, value: u8) {
    let (tw, th) = target.dimensions();
    let x0 = (x as i64).max(0);
    let y0 = (y as i64).max(0);
    let x1 = (x as i64 + width as i64).min(tw as i64);
    let y1 = (y as i64 + height as i64).min(th as i64);
    for py in y0..y1 {
        for px in x0..x1 {
            target.put_pixel(px as u32, py as u32, Luma([value]));
        }
    }
}

fn outline(target: &mut GrayImage, x: i32, y: i32, width: u32, height: u32, value: u8) {
    if width == 0 || height == 0 {
        return;
    }
    let right = x.saturating_add(width as i32 - 1);
    let bottom = y.saturating_add(height as i32 - 1);
    fill_rect(target, x, y, width, 1, value);
    fill_rect(target, x, bottom, width, 1, value);
    fill_rect(target, x, y, 1, height, value);
    fill_rect(target, right, y, 1, height, value);
}
