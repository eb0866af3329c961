//! Reversible RGB <-> luma/chroma transform.
//!
//! Fusion decisions are driven by luma alone, so every frame is moved into a
//! YUV-style space before decomposition and moved back after collapse. The
//! inverse is the exact matrix inverse of the forward transform, so a round
//! trip reproduces the input to floating-point precision.

use std::sync::LazyLock;

use rayon::prelude::*;

use crate::focus_stack::raster::Plane;

/// Forward transform, rows are Y, U, V.
const RGB_TO_FOCUS: [[f64; 3]; 3] = [
    [0.299, 0.587, 0.114],
    [-0.14713, -0.28886, 0.436],
    [0.615, -0.51499, -0.10001],
];

static FOCUS_TO_RGB: LazyLock<[[f64; 3]; 3]> = LazyLock::new(|| invert3(&RGB_TO_FOCUS));

fn invert3(m: &[[f64; 3]; 3]) -> [[f64; 3]; 3] {
    let c00 = m[1][1] * m[2][2] - m[1][2] * m[2][1];
    let c01 = m[1][2] * m[2][0] - m[1][0] * m[2][2];
    let c02 = m[1][0] * m[2][1] - m[1][1] * m[2][0];
    let det = m[0][0] * c00 + m[0][1] * c01 + m[0][2] * c02;
    assert!(det.abs() > f64::EPSILON, "color transform is singular");
    let inv_det = 1.0 / det;

    [
        [
            c00 * inv_det,
            (m[0][2] * m[2][1] - m[0][1] * m[2][2]) * inv_det,
            (m[0][1] * m[1][2] - m[0][2] * m[1][1]) * inv_det,
        ],
        [
            c01 * inv_det,
            (m[0][0] * m[2][2] - m[0][2] * m[2][0]) * inv_det,
            (m[0][2] * m[1][0] - m[0][0] * m[1][2]) * inv_det,
        ],
        [
            c02 * inv_det,
            (m[0][1] * m[2][0] - m[0][0] * m[2][1]) * inv_det,
            (m[0][0] * m[1][1] - m[0][1] * m[1][0]) * inv_det,
        ],
    ]
}

#[inline]
fn apply(m: &[[f64; 3]; 3], px: [f32; 3]) -> [f32; 3] {
    let [a, b, c] = px.map(f64::from);
    [
        (m[0][0] * a + m[0][1] * b + m[0][2] * c) as f32,
        (m[1][0] * a + m[1][1] * b + m[1][2] * c) as f32,
        (m[2][0] * a + m[2][1] * b + m[2][2] * c) as f32,
    ]
}

/// Converts one RGB pixel to luma/chroma.
#[inline]
pub fn pixel_to_focus_space(rgb: [f32; 3]) -> [f32; 3] {
    apply(&RGB_TO_FOCUS, rgb)
}

/// Converts one luma/chroma pixel back to RGB.
#[inline]
pub fn pixel_to_rgb(focus: [f32; 3]) -> [f32; 3] {
    apply(&FOCUS_TO_RGB, focus)
}

fn transform_planes(planes: &[Plane; 3], m: &[[f64; 3]; 3]) -> [Plane; 3] {
    let (width, height) = planes[0].dimensions();
    let [p0, p1, p2] = planes.each_ref().map(|p| p.data());
    let n = width * height;

    let mut out = [vec![0.0f32; n], vec![0.0f32; n], vec![0.0f32; n]];
    let [o0, o1, o2] = &mut out;
    o0.par_iter_mut()
        .zip(o1.par_iter_mut())
        .zip(o2.par_iter_mut())
        .enumerate()
        .for_each(|(i, ((a, b), c))| {
            let [x, y, z] = apply(m, [p0[i], p1[i], p2[i]]);
            *a = x;
            *b = y;
            *c = z;
        });

    out.map(|data| Plane::from_vec(width, height, data))
}

/// RGB planes with values in `[0, 1]` to luma/chroma planes.
pub fn to_focus_space(rgb: &[Plane; 3]) -> [Plane; 3] {
    transform_planes(rgb, &RGB_TO_FOCUS)
}

/// Exact inverse of [`to_focus_space`].
pub fn to_rgb(focus: &[Plane; 3]) -> [Plane; 3] {
    transform_planes(focus, &FOCUS_TO_RGB)
}

/// Luma row of the forward transform, used as the registration signal.
pub fn luma(rgb: &[Plane; 3]) -> Plane {
    let [r, g, b] = rgb.each_ref().map(|p| p.data());
    let w = RGB_TO_FOCUS[0];
    let data = r
        .iter()
        .zip(g)
        .zip(b)
        .map(|((&r, &g), &b)| (w[0] * r as f64 + w[1] * g as f64 + w[2] * b as f64) as f32)
        .collect();
    Plane::from_vec(rgb[0].width(), rgb[0].height(), data)
}
