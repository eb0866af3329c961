use tracing::{debug, instrument};

use crate::focus_stack::fusion::rules::{fuse_coarsest, fuse_finest, fuse_intermediate};
use crate::focus_stack::pyramid::Pyramid;
use crate::focus_stack::raster::{BitDepth, Plane, RasterImage};

/// Tuning of the per-level selection rules.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionConfig {
    /// Summed 3x3 luma energy gain a full-resolution pixel needs before it is
    /// taken from the new frame
    pub finest_threshold: f32,
    /// Take the new frame on equal energy instead of keeping the current best
    pub ties_favor_new: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            finest_threshold: 0.0,
            ties_favor_new: false,
        }
    }
}

/// Pixels updated by one frame, per level, finest first. Every base level
/// pixel is averaged, so the base always counts in full.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FusionStats {
    pub replaced: Vec<usize>,
    pub total_pixels: usize,
}

impl FusionStats {
    /// Share of all pyramid samples that changed hands, in percent.
    pub fn percent_replaced(&self) -> f64 {
        if self.total_pixels == 0 {
            return 0.0;
        }
        self.replaced.iter().sum::<usize>() as f64 * 100.0 / self.total_pixels as f64
    }
}

/// Best-so-far pyramid of a stack together with how many frames it has seen.
#[derive(Debug, Clone)]
pub struct FocusAccumulator {
    best: Pyramid,
    count: usize,
    contributions: Plane,
    config: FusionConfig,
}

impl FocusAccumulator {
    /// Starts a stack from the reference frame's pyramid.
    pub fn new(reference: Pyramid, config: FusionConfig) -> Self {
        let (w, h) = reference.dimensions();
        Self {
            best: reference,
            count: 1,
            contributions: Plane::new(w, h),
            config,
        }
    }

    /// Merges one more frame into the stack.
    ///
    /// # Panics
    ///
    /// Panics if `frame` does not have as many levels as the stack.
    #[instrument(skip_all, fields(frame = self.count))]
    pub fn update(&mut self, frame: &Pyramid) -> FusionStats {
        assert_eq!(
            self.best.len(),
            frame.len(),
            "pyramid level count does not match the accumulator"
        );

        let top = self.best.len() - 1;
        let mut stats = FusionStats::default();
        for (index, (best, new)) in self
            .best
            .levels_mut()
            .iter_mut()
            .zip(frame.levels())
            .enumerate()
        {
            stats.total_pixels += best.width() * best.height();
            let replaced = if index == top {
                fuse_coarsest(best, new, self.count);
                best.width() * best.height()
            } else if index == 0 {
                let mask = fuse_finest(
                    best,
                    new,
                    self.config.finest_threshold,
                    self.config.ties_favor_new,
                );
                for (marker, _) in self
                    .contributions
                    .data_mut()
                    .iter_mut()
                    .zip(&mask)
                    .filter(|(_, m)| **m)
                {
                    *marker = 1.0;
                }
                mask.iter().filter(|m| **m).count()
            } else {
                fuse_intermediate(best, new, self.config.ties_favor_new)
            };
            stats.replaced.push(replaced);
        }
        self.count += 1;

        debug!(
            frames = self.count,
            replaced = ?stats.replaced,
            percent = stats.percent_replaced(),
            "Fused frame"
        );
        stats
    }

    /// Consuming form of [`update`](Self::update) for folding over frames.
    pub fn fuse(mut self, frame: &Pyramid) -> Self {
        self.update(frame);
        self
    }

    /// Collapses the current best pyramid into an RGB image. Valid after any
    /// number of updates.
    pub fn current_composite(&self, depth: BitDepth) -> RasterImage {
        RasterImage::from_planes(&self.best.collapse(), depth)
    }

    /// Frames merged so far, reference included.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Full-resolution map holding `1.0` wherever any later frame has won a
    /// finest-level pixel.
    pub fn contribution_map(&self) -> &Plane {
        &self.contributions
    }

    pub fn pyramid(&self) -> &Pyramid {
        &self.best
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn into_pyramid(self) -> Pyramid {
        self.best
    }
}
