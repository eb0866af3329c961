use std::f64::consts::PI;

use rayon::prelude::*;
use tracing::warn;

use crate::focus_stack::raster::Plane;
use crate::focus_stack::registration::{AffineTransform, Interpolation};

const LANCZOS_A: isize = 4;

/// Mirrors an out-of-range index including the edge sample (`cba|abcd|dcb`).
#[inline]
fn reflect(mut i: isize, n: usize) -> usize {
    let n = n as isize;
    loop {
        if i < 0 {
            i = -i - 1;
        } else if i >= n {
            i = 2 * n - 1 - i;
        } else {
            return i as usize;
        }
    }
}

#[inline]
fn lanczos(x: f64) -> f64 {
    let a = LANCZOS_A as f64;
    if x.abs() < 1e-9 {
        return 1.0;
    }
    if x.abs() >= a {
        return 0.0;
    }
    let px = PI * x;
    a * px.sin() * (px / a).sin() / (px * px)
}

/// Taps `(index, weight)` along one axis for sampling at `pos`.
fn axis_taps(pos: f64, n: usize, interpolation: Interpolation) -> Vec<(usize, f64)> {
    let base = pos.floor();
    let frac = pos - base;
    let base = base as isize;
    match interpolation {
        Interpolation::Bilinear => vec![(reflect(base, n), 1.0 - frac), (reflect(base + 1, n), frac)],
        Interpolation::Lanczos4 => {
            let mut taps: Vec<(usize, f64)> = (1 - LANCZOS_A..=LANCZOS_A)
                .map(|k| (reflect(base + k, n), lanczos(frac - k as f64)))
                .collect();
            let sum: f64 = taps.iter().map(|&(_, w)| w).sum();
            if sum.abs() > 1e-12 {
                taps.iter_mut().for_each(|(_, w)| *w /= sum);
            }
            taps
        }
    }
}

/// Resamples three planes through `transform`, which maps source pixel
/// coordinates into output pixel coordinates. The output has the source's
/// size; pixels that map outside the source are filled by mirroring its
/// borders.
pub fn warp_planes(
    planes: &[Plane; 3],
    transform: &AffineTransform,
    interpolation: Interpolation,
) -> [Plane; 3] {
    if transform.is_identity(1e-12) {
        return planes.clone();
    }
    let Some(inverse) = transform.inverse() else {
        warn!("Frame transform is not invertible, leaving frame unwarped");
        return planes.clone();
    };

    let (w, h) = planes[0].dimensions();
    let mut out = vec![[0.0f32; 3]; w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, px) in row.iter_mut().enumerate() {
            let (sx, sy) = inverse.apply(x as f64, y as f64);
            let xs = axis_taps(sx, w, interpolation);
            let ys = axis_taps(sy, h, interpolation);
            for (c, plane) in planes.iter().enumerate() {
                let mut acc = 0.0f64;
                for &(iy, wy) in &ys {
                    let src_row = plane.row(iy);
                    let mut row_acc = 0.0f64;
                    for &(ix, wx) in &xs {
                        row_acc += src_row[ix] as f64 * wx;
                    }
                    acc += row_acc * wy;
                }
                px[c] = acc as f32;
            }
        }
    });

    let mut channels = [
        Vec::with_capacity(w * h),
        Vec::with_capacity(w * h),
        Vec::with_capacity(w * h),
    ];
    for px in &out {
        for (channel, &v) in channels.iter_mut().zip(px) {
            channel.push(v);
        }
    }
    channels.map(|c| Plane::from_vec(w, h, c))
}
