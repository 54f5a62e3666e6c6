//! Saturation adjustment of RGB pixels stored channels-last.
//!
//! Two formulations are kept side by side. `adjust_saturation_reference`
//! round-trips every pixel through HSV and is the ground truth.
//! `adjust_saturation_closed_form` works directly in RGB. With hue and value
//! fixed, every channel is affine in saturation, so each channel moves toward
//! the pixel maximum by the same factor. The graph lowering emits the closed
//! form.

use crate::error::GraphError;

const CHANNELS: usize = 3;

fn check_pixels(images: &[f32]) -> Result<(), GraphError> {
    if images.len() % CHANNELS != 0 {
        return Err(GraphError::invalid_operation(
            crate::builder::ADJUST_SATURATION,
            format!("{} values do not form RGB pixels", images.len()),
        ));
    }
    Ok(())
}

fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let v = r.max(g.max(b));
    let range = v - r.min(g.min(b));
    let s = if v > 0.0 { range / v } else { 0.0 };
    let norm = 1.0 / (6.0 * range);
    let mut h = if r == v {
        norm * (g - b)
    } else if g == v {
        norm * (b - r) + 2.0 / 6.0
    } else {
        norm * (r - g) + 4.0 / 6.0
    };
    if range <= 0.0 {
        h = 0.0;
    }
    if h < 0.0 {
        h += 1.0;
    }
    (h, s, v)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = s * v;
    let m = v - c;
    let dh = h * 6.0;
    let x = c * (1.0 - (dh.rem_euclid(2.0) - 1.0).abs());
    // A tiny negative hue wraps to exactly 1.0 in f32; that is sector 5.
    let (r, g, b) = match (dh as i32).min(5) {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    (r + m, g + m, b + m)
}

fn clamp_unit(x: f32) -> f32 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}

pub fn adjust_saturation_reference(images: &[f32], scale: f32) -> Result<Vec<f32>, GraphError> {
    check_pixels(images)?;
    let mut out = Vec::with_capacity(images.len());
    for px in images.chunks_exact(CHANNELS) {
        let (h, s, v) = rgb_to_hsv(px[0], px[1], px[2]);
        let (r, g, b) = hsv_to_rgb(h, clamp_unit(s * scale), v);
        out.extend_from_slice(&[r, g, b]);
    }
    Ok(out)
}

pub fn adjust_saturation_closed_form(images: &[f32], scale: f32) -> Result<Vec<f32>, GraphError> {
    check_pixels(images)?;
    let mut out = Vec::with_capacity(images.len());
    for px in images.chunks_exact(CHANNELS) {
        let max = px[0].max(px[1].max(px[2]));
        let min = px[0].min(px[1].min(px[2]));
        let delta = max - min;
        if delta.min(max) > 0.0 {
            let saturation = clamp_unit(delta / max * scale);
            let k = saturation * max / delta;
            out.extend(px.iter().map(|&c| max - (max - c) * k));
        } else {
            out.extend_from_slice(&[max; CHANNELS]);
        }
    }
    Ok(out)
}
