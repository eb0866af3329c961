use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::focus_stack::color;
use crate::focus_stack::pyramid::kernel::{downsample_plane, upsample_plane};
use crate::focus_stack::raster::{Plane, RasterImage};

/// Short side, in pixels, below which no further octave is built.
const MIN_LEVEL_SIZE: f64 = 64.0;

/// Number of pyramid levels for an image of the given size:
/// `floor(log2(min(w, h) / 64)) + 1`, never fewer than one.
pub fn level_count(width: usize, height: usize) -> usize {
    let short = width.min(height) as f64;
    if short < MIN_LEVEL_SIZE {
        return 1;
    }
    (short / MIN_LEVEL_SIZE).log2().floor() as usize + 1
}

/// One octave of a luma/chroma pyramid: channel 0 is luma, 1 and 2 chroma.
#[derive(Debug, Clone, PartialEq)]
pub struct PyramidLevel {
    pub channels: [Plane; 3],
}

impl PyramidLevel {
    pub fn new(channels: [Plane; 3]) -> Self {
        debug_assert!(
            channels
                .iter()
                .all(|c| c.dimensions() == channels[0].dimensions())
        );
        Self { channels }
    }

    pub fn zeros(width: usize, height: usize) -> Self {
        Self::new([
            Plane::new(width, height),
            Plane::new(width, height),
            Plane::new(width, height),
        ])
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.channels[0].width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.channels[0].height()
    }

    #[inline]
    pub fn dimensions(&self) -> (usize, usize) {
        self.channels[0].dimensions()
    }

    #[inline]
    pub fn luma(&self) -> &Plane {
        &self.channels[0]
    }

    fn zip_map(&self, other: &PyramidLevel, f: impl Fn(f32, f32) -> f32) -> PyramidLevel {
        let channels = [0, 1, 2].map(|c| self.channels[c].zip_map(&other.channels[c], &f));
        PyramidLevel::new(channels)
    }

    pub fn add(&self, other: &PyramidLevel) -> PyramidLevel {
        self.zip_map(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &PyramidLevel) -> PyramidLevel {
        self.zip_map(other, |a, b| a - b)
    }
}

fn map_channels(level: &PyramidLevel, f: impl Fn(&Plane) -> Plane + Sync) -> PyramidLevel {
    let [y, u, v] = &level.channels;
    let (y, (u, v)) = rayon::join(|| f(y), || rayon::join(|| f(u), || f(v)));
    PyramidLevel::new([y, u, v])
}

/// Gaussian blur and stride-2 subsampling of every channel.
pub fn downsample(level: &PyramidLevel) -> PyramidLevel {
    map_channels(level, downsample_plane)
}

/// Zero-insert upsampling of every channel to exactly `width`x`height`.
pub fn upsample(level: &PyramidLevel, width: usize, height: usize) -> PyramidLevel {
    map_channels(level, |p| upsample_plane(p, width, height))
}

/// Laplacian pyramid, finest level first.
#[derive(Debug, Clone, PartialEq)]
pub struct Pyramid {
    levels: Vec<PyramidLevel>,
}

impl Pyramid {
    /// Wraps existing levels, finest first.
    ///
    /// # Panics
    ///
    /// Panics if `levels` is empty.
    pub fn from_levels(levels: Vec<PyramidLevel>) -> Self {
        assert!(!levels.is_empty(), "empty pyramid");
        Self { levels }
    }

    /// Decomposes an RGB raster: normalize, move to luma/chroma, then build.
    pub fn build_laplacian(image: &RasterImage) -> Self {
        let focus = color::to_focus_space(&image.to_planes());
        Self::build_laplacian_from_focus(focus)
    }

    /// Builds the Laplacian pyramid of an image already in focus space.
    #[instrument(skip_all, fields(width = focus[0].width(), height = focus[0].height()))]
    pub fn build_laplacian_from_focus(focus: [Plane; 3]) -> Self {
        let (width, height) = focus[0].dimensions();
        let count = level_count(width, height);

        let mut gaussian = Vec::with_capacity(count);
        gaussian.push(PyramidLevel::new(focus));
        for i in 1..count {
            let next = downsample(&gaussian[i - 1]);
            gaussian.push(next);
        }

        let mut levels: Vec<PyramidLevel> = (0..count - 1)
            .into_par_iter()
            .map(|i| {
                let (w, h) = gaussian[i].dimensions();
                gaussian[i].sub(&upsample(&gaussian[i + 1], w, h))
            })
            .collect();
        if let Some(top) = gaussian.pop() {
            levels.push(top);
        }

        debug!(levels = levels.len(), "Built Laplacian pyramid");
        Self { levels }
    }

    /// Reconstructs the luma/chroma image, coarsest level first.
    ///
    /// # Panics
    ///
    /// Panics if the pyramid is empty.
    pub fn collapse_focus(&self) -> [Plane; 3] {
        let (top, rest) = self.levels.split_last().expect("empty pyramid");
        let mut current = top.clone();
        for level in rest.iter().rev() {
            let (w, h) = level.dimensions();
            current = upsample(&current, w, h).add(level);
        }
        current.channels
    }

    /// Reconstructs the image and converts it back to RGB in `[0, 1]`
    /// (unclamped).
    #[instrument(skip_all, fields(levels = self.levels.len()))]
    pub fn collapse(&self) -> [Plane; 3] {
        color::to_rgb(&self.collapse_focus())
    }

    #[inline]
    pub fn levels(&self) -> &[PyramidLevel] {
        &self.levels
    }

    #[inline]
    pub fn levels_mut(&mut self) -> &mut [PyramidLevel] {
        &mut self.levels
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Original-resolution level.
    pub fn finest(&self) -> &PyramidLevel {
        &self.levels[0]
    }

    /// Low-pass base level.
    pub fn coarsest(&self) -> &PyramidLevel {
        &self.levels[self.levels.len() - 1]
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.finest().dimensions()
    }

    pub fn into_levels(self) -> Vec<PyramidLevel> {
        self.levels
    }
}
