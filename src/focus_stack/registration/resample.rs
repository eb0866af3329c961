use rayon::prelude::*;

use crate::focus_stack::pyramid::reflect_101;
use crate::focus_stack::raster::Plane;

/// Source contributions `(index, weight)` for each destination sample when
/// shrinking `src_len` samples to `dst_len` by area averaging.
fn area_weights(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f32)>> {
    let ratio = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * ratio;
            let end = ((d + 1) as f64 * ratio).min(src_len as f64);
            let mut taps = Vec::new();
            let mut s = start.floor() as usize;
            while (s as f64) < end && s < src_len {
                let overlap = (end.min((s + 1) as f64) - start.max(s as f64)).max(0.0);
                if overlap > 0.0 {
                    taps.push((s, (overlap / (end - start)) as f32));
                }
                s += 1;
            }
            taps
        })
        .collect()
}

/// Area-averaging resize by `scale` (expected `<= 1`). The result is
/// `round(w * scale)` x `round(h * scale)`, at least one pixel each way.
pub fn resize_area(src: &Plane, scale: f64) -> Plane {
    let (w, h) = src.dimensions();
    let dw = ((w as f64 * scale).round() as usize).max(1);
    let dh = ((h as f64 * scale).round() as usize).max(1);
    if (dw, dh) == (w, h) {
        return src.clone();
    }

    let xw = area_weights(w, dw);
    let yw = area_weights(h, dh);

    let mut tmp = vec![0.0f32; dw * h];
    tmp.par_chunks_mut(dw).enumerate().for_each(|(y, out)| {
        let row = src.row(y);
        for (o, taps) in out.iter_mut().zip(&xw) {
            *o = taps.iter().map(|&(i, wt)| row[i] * wt).sum();
        }
    });

    let mut out = vec![0.0f32; dw * dh];
    out.par_chunks_mut(dw).zip(&yw).for_each(|(out_row, taps)| {
        for &(sy, wt) in taps {
            let src_row = &tmp[sy * dw..(sy + 1) * dw];
            for (o, &v) in out_row.iter_mut().zip(src_row) {
                *o += v * wt;
            }
        }
    });

    Plane::from_vec(dw, dh, out)
}

fn gaussian_taps(size: usize) -> Vec<f32> {
    let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (size / 2) as f64;
    let taps: Vec<f64> = (0..size)
        .map(|i| {
            let x = i as f64 - half;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = taps.iter().sum();
    taps.iter().map(|t| (t / sum) as f32).collect()
}

/// Separable Gaussian blur with an odd `size`x`size` kernel. Sizes below 3
/// return the input unchanged.
pub fn gaussian_blur(src: &Plane, size: usize) -> Plane {
    if size < 3 {
        return src.clone();
    }
    let size = size | 1;
    let taps = gaussian_taps(size);
    let radius = (size / 2) as isize;
    let (w, h) = src.dimensions();

    let mut tmp = vec![0.0f32; w * h];
    tmp.par_chunks_mut(w).enumerate().for_each(|(y, out)| {
        let row = src.row(y);
        for (x, o) in out.iter_mut().enumerate() {
            *o = taps
                .iter()
                .enumerate()
                .map(|(k, &t)| t * row[reflect_101(x as isize + k as isize - radius, w)])
                .sum();
        }
    });

    let mut out = vec![0.0f32; w * h];
    out.par_chunks_mut(w).enumerate().for_each(|(y, out_row)| {
        for (k, &t) in taps.iter().enumerate() {
            let sy = reflect_101(y as isize + k as isize - radius, h);
            for (o, &v) in out_row.iter_mut().zip(&tmp[sy * w..(sy + 1) * w]) {
                *o += t * v;
            }
        }
    });

    Plane::from_vec(w, h, out)
}

/// Central-difference gradients `(d/dx, d/dy)` with mirrored borders.
pub fn gradients(src: &Plane) -> (Plane, Plane) {
    let (w, h) = src.dimensions();
    let gx = Plane::from_fn(w, h, |x, y| {
        let right = src.at(reflect_101(x as isize + 1, w), y);
        let left = src.at(reflect_101(x as isize - 1, w), y);
        0.5 * (right - left)
    });
    let gy = Plane::from_fn(w, h, |x, y| {
        let down = src.at(x, reflect_101(y as isize + 1, h));
        let up = src.at(x, reflect_101(y as isize - 1, h));
        0.5 * (down - up)
    });
    (gx, gy)
}

/// Bilinear sample at `(x, y)`, or `None` outside `[0, w-1] x [0, h-1]`.
#[inline]
pub fn sample_bilinear(src: &Plane, x: f64, y: f64) -> Option<f32> {
    let (w, h) = src.dimensions();
    if !(x >= 0.0 && y >= 0.0 && x <= (w - 1) as f64 && y <= (h - 1) as f64) {
        return None;
    }
    let x0 = (x.floor() as usize).min(w.saturating_sub(2));
    let y0 = (y.floor() as usize).min(h.saturating_sub(2));
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = (x - x0 as f64) as f32;
    let fy = (y - y0 as f64) as f32;

    let top = src.at(x0, y0) + fx * (src.at(x1, y0) - src.at(x0, y0));
    let bottom = src.at(x0, y1) + fx * (src.at(x1, y1) - src.at(x0, y1));
    Some(top + fy * (bottom - top))
}
