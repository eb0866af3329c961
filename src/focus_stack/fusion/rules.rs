use rayon::prelude::*;

use crate::focus_stack::pyramid::PyramidLevel;
use crate::focus_stack::raster::Plane;

/// Running mean of the base level: `best = (best * count + new) / (count + 1)`.
pub fn fuse_coarsest(best: &mut PyramidLevel, new: &PyramidLevel, count: usize) {
    let n = count as f32;
    for (b, f) in best.channels.iter_mut().zip(&new.channels) {
        b.data_mut()
            .par_iter_mut()
            .zip(f.data())
            .for_each(|(b, &f)| *b = (*b * n + f) / (n + 1.0));
    }
}

/// Sum of each sample's 3x3 neighborhood, treating samples outside the plane
/// as zero.
pub fn neighborhood_sum(src: &Plane) -> Plane {
    let (w, h) = src.dimensions();
    let horizontal = Plane::from_fn(w, h, |x, y| {
        let row = src.row(y);
        let lo = x.saturating_sub(1);
        let hi = (x + 1).min(w - 1);
        row[lo..=hi].iter().sum()
    });
    Plane::from_fn(w, h, |x, y| {
        let lo = y.saturating_sub(1);
        let hi = (y + 1).min(h - 1);
        (lo..=hi).map(|r| horizontal.at(x, r)).sum()
    })
}

fn energy_difference(best: &PyramidLevel, new: &PyramidLevel) -> Plane {
    new.luma().zip_map(best.luma(), |n, b| n * n - b * b)
}

/// Copies `new` into `best` wherever `mask` is set, on every channel.
fn replace_masked(best: &mut PyramidLevel, new: &PyramidLevel, mask: &[bool]) -> usize {
    for (b, f) in best.channels.iter_mut().zip(&new.channels) {
        b.data_mut()
            .par_iter_mut()
            .zip(f.data())
            .zip(mask)
            .filter(|(_, m)| **m)
            .for_each(|((b, &f), _)| *b = f);
    }
    mask.iter().filter(|m| **m).count()
}

/// Full-resolution rule: a pixel is taken from `new` when the luma energy
/// gained over its 3x3 neighborhood exceeds `threshold` (or reaches it when
/// `ties_favor_new`). Returns the replacement mask.
pub fn fuse_finest(
    best: &mut PyramidLevel,
    new: &PyramidLevel,
    threshold: f32,
    ties_favor_new: bool,
) -> Vec<bool> {
    let support = neighborhood_sum(&energy_difference(best, new));
    let mask: Vec<bool> = support
        .data()
        .iter()
        .map(|&s| if ties_favor_new { s >= threshold } else { s > threshold })
        .collect();
    replace_masked(best, new, &mask);
    mask
}

/// Per-pixel winner-take-all on squared luma. Returns the number of pixels
/// replaced.
pub fn fuse_intermediate(best: &mut PyramidLevel, new: &PyramidLevel, ties_favor_new: bool) -> usize {
    let mask: Vec<bool> = energy_difference(best, new)
        .data()
        .iter()
        .map(|&d| if ties_favor_new { d >= 0.0 } else { d > 0.0 })
        .collect();
    replace_masked(best, new, &mask)
}
