//! Anti-aliased path rasterisation onto RGB frame buffers
//!
//! Segments are drawn as capsules (round caps) and dots as discs. Coverage is
//! estimated from the distance between each pixel centre and the shape edge,
//! giving a one-pixel soft edge.

use image::{Rgb, RgbImage};
use imageproc::pixelops::interpolate;

/// A point in frame pixel coordinates
pub type FPoint = (f32, f32);

/// Draw a straight anti-aliased line of the given thickness from `a` to `b`
pub fn draw_segment(img: &mut RgbImage, a: FPoint, b: FPoint, thickness: f32, color: Rgb<u8>) {
    let radius = (thickness * 0.5).max(0.5);
    let bounds = (
        a.0.min(b.0) - radius,
        a.1.min(b.1) - radius,
        a.0.max(b.0) + radius,
        a.1.max(b.1) + radius,
    );

    fill_coverage(img, bounds, color, |px, py| {
        radius + 0.5 - distance_to_segment((px, py), a, b)
    });
}

/// Stamp a filled anti-aliased disc centred on `center`
pub fn draw_dot(img: &mut RgbImage, center: FPoint, radius: f32, color: Rgb<u8>) {
    let radius = radius.max(0.5);
    let bounds = (
        center.0 - radius,
        center.1 - radius,
        center.0 + radius,
        center.1 + radius,
    );

    fill_coverage(img, bounds, color, |px, py| {
        let (dx, dy) = (px - center.0, py - center.1);
        radius + 0.5 - (dx * dx + dy * dy).sqrt()
    });
}

/// Blend `color` into every pixel of `bounds` (grown by one pixel for the
/// soft edge) weighted by `coverage`, which is clamped to 0..=1
fn fill_coverage<F>(img: &mut RgbImage, bounds: (f32, f32, f32, f32), color: Rgb<u8>, coverage: F)
where
    F: Fn(f32, f32) -> f32,
{
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return;
    }

    let x0 = (bounds.0 - 1.0).floor().max(0.0);
    let y0 = (bounds.1 - 1.0).floor().max(0.0);
    let x1 = (bounds.2 + 1.0).ceil().min((width - 1) as f32);
    let y1 = (bounds.3 + 1.0).ceil().min((height - 1) as f32);
    if !(x0 <= x1 && y0 <= y1) {
        return;
    }

    for y in y0 as u32..=y1 as u32 {
        for x in x0 as u32..=x1 as u32 {
            let c = coverage(x as f32, y as f32).clamp(0.0, 1.0);
            if c <= 0.0 {
                continue;
            }
            let pixel = img.get_pixel_mut(x, y);
            *pixel = if c >= 1.0 {
                color
            } else {
                interpolate(color, *pixel, c)
            };
        }
    }
}

fn distance_to_segment(p: FPoint, a: FPoint, b: FPoint) -> f32 {
    let (abx, aby) = (b.0 - a.0, b.1 - a.1);
    let (apx, apy) = (p.0 - a.0, p.1 - a.1);
    let len_sq = abx * abx + aby * aby;

    let t = if len_sq > 0.0 {
        ((apx * abx + apy * aby) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let (dx, dy) = (apx - abx * t, apy - aby * t);
    (dx * dx + dy * dy).sqrt()
}
