use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, info_span, warn};

use crate::focus_stack::color;
use crate::focus_stack::common::error::{Result, StackError};
use crate::focus_stack::fusion::FocusAccumulator;
use crate::focus_stack::io::{FrameReader, FrameWriter, ImageFrameReader, StandardFrameWriter};
use crate::focus_stack::pyramid::Pyramid;
use crate::focus_stack::raster::{Plane, RasterImage};
use crate::focus_stack::registration::{
    AffineTransform, CropRect, RegistrationReport, register_frames, warp_planes,
};
use crate::focus_stack::stacking::config::StackConfig;
use crate::focus_stack::stacking::progress::{CancelToken, Progress};

/// Result of a stacking run.
#[derive(Debug, Clone)]
pub struct StackOutput {
    /// The stacked image, cropped when the configuration asks for it
    pub image: RasterImage,
    /// Area of the reference frame covered by every warped frame
    pub crop: CropRect,
    /// Per frame, the map from its pixels into the reference frame's
    pub transforms: Vec<AffineTransform>,
    /// Registration outcome of every frame after the reference
    pub reports: Vec<RegistrationReport>,
    /// Full-resolution map of pixels any later frame won
    pub contributions: Plane,
}

/// Focus stacking pipeline. Each instance owns its configuration and runs
/// are independent of each other.
pub struct FocusStackPipeline<R: FrameReader> {
    reader: R,
    config: StackConfig,
    cancel: Option<CancelToken>,
}

impl FocusStackPipeline<ImageFrameReader> {
    pub fn new(config: StackConfig) -> Self {
        Self::with_reader(ImageFrameReader, config)
    }
}

impl<R: FrameReader> FocusStackPipeline<R> {
    pub fn with_reader(reader: R, config: StackConfig) -> Self {
        Self {
            reader,
            config,
            cancel: None,
        }
    }

    /// Lets `token` stop a run between frames.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &StackConfig {
        &self.config
    }

    /// Stacks the frames at `paths`; the first one is the reference.
    ///
    /// Any frame that cannot be decoded aborts the run.
    pub fn stack<P: AsRef<Path>>(
        &self,
        paths: &[P],
        on_progress: impl FnMut(&Progress<'_>),
    ) -> Result<StackOutput> {
        self.run(
            paths.len(),
            |i| self.reader.read_frame(paths[i].as_ref()),
            on_progress,
        )
    }

    /// Stacks frames that are already decoded.
    pub fn stack_frames(
        &self,
        frames: Vec<RasterImage>,
        on_progress: impl FnMut(&Progress<'_>),
    ) -> Result<StackOutput> {
        let total = frames.len();
        let mut frames = frames.into_iter();
        self.run(
            total,
            |_| frames.next().ok_or(StackError::NoInputFrames),
            on_progress,
        )
    }

    /// Stacks `paths` and writes the result to `output`.
    pub fn stack_to_file<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        paths: &[P],
        output: Q,
        on_progress: impl FnMut(&Progress<'_>),
    ) -> Result<StackOutput> {
        self.stack_to_writer(paths, output, &StandardFrameWriter, on_progress)
    }

    pub fn stack_to_writer<P: AsRef<Path>, Q: AsRef<Path>, W: FrameWriter>(
        &self,
        paths: &[P],
        output: Q,
        writer: &W,
        on_progress: impl FnMut(&Progress<'_>),
    ) -> Result<StackOutput> {
        let stacked = self.stack(paths, on_progress)?;
        writer.write_frame(&stacked.image, output.as_ref(), &self.config.output)?;
        Ok(stacked)
    }

    fn check_cancelled(&self) -> Result<()> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => {
                warn!("Stacking cancelled");
                Err(StackError::Cancelled)
            }
            _ => Ok(()),
        }
    }

    fn run(
        &self,
        total: usize,
        mut load: impl FnMut(usize) -> Result<RasterImage>,
        mut on_progress: impl FnMut(&Progress<'_>),
    ) -> Result<StackOutput> {
        if total == 0 {
            return Err(StackError::NoInputFrames);
        }
        let started = Instant::now();
        let _run_span = info_span!("stack", frames = total).entered();
        info!("Starting focus stack of {} frames", total);

        self.check_cancelled()?;
        let reference = {
            let _span = info_span!("decode", frame = 0).entered();
            load(0)?
        };
        let (width, height) = (reference.width, reference.height);
        on_progress(&Progress::reference(&reference, total, self.config.previews));

        let reference_planes = reference.to_planes();
        let mut previous_luma = color::luma(&reference_planes);
        let mut accumulator = FocusAccumulator::new(
            Pyramid::build_laplacian_from_focus(color::to_focus_space(&reference_planes)),
            self.config.fusion,
        );
        drop(reference_planes);

        let mut crop = CropRect::full(width, height);
        let mut transforms = vec![AffineTransform::identity()];
        let mut reports = Vec::with_capacity(total - 1);

        for index in 1..total {
            self.check_cancelled()?;
            let frame_started = Instant::now();
            let _frame_span = info_span!("frame", index).entered();
            info!("Processing frame {}/{}", index + 1, total);

            let frame = {
                let _span = info_span!("decode").entered();
                load(index)?
            };
            if (frame.width, frame.height) != (width, height) {
                return Err(StackError::DimensionMismatch {
                    index,
                    width: frame.width,
                    height: frame.height,
                    expected_width: width,
                    expected_height: height,
                });
            }

            let planes = frame.to_planes();
            drop(frame);
            let luma = color::luma(&planes);

            let report = if self.config.align {
                let _span = info_span!("register").entered();
                register_frames(&previous_luma, &luma, &self.config.registration)
            } else {
                RegistrationReport::skipped()
            };
            let cumulative = transforms[index - 1].compose(&report.local);

            let warped = {
                let _span = info_span!("warp").entered();
                warp_planes(&planes, &cumulative, self.config.registration.interpolation)
            };
            drop(planes);

            crop = crop.intersect(&CropRect::warped_bounds(&cumulative, width, height));
            debug!(x = crop.x, y = crop.y, width = crop.width, height = crop.height, "Crop");

            let pyramid = Pyramid::build_laplacian_from_focus(color::to_focus_space(&warped));
            drop(warped);
            {
                let _span = info_span!("fuse").entered();
                accumulator.update(&pyramid);
            }

            previous_luma = luma;
            transforms.push(cumulative);
            reports.push(report);

            on_progress(&Progress::fused(
                &accumulator,
                total,
                self.config.output_depth,
                self.config.previews,
            ));
            debug!(
                elapsed_ms = frame_started.elapsed().as_secs_f64() * 1000.0,
                "Frame done"
            );
            std::thread::yield_now();
        }

        let collapsed = {
            let _span = info_span!("collapse").entered();
            accumulator.current_composite(self.config.output_depth)
        };
        let image = if !self.config.crop {
            collapsed
        } else if crop.is_empty() {
            warn!("Frames share no common area, leaving the result uncropped");
            collapsed
        } else {
            crop.apply(&collapsed)
        };

        on_progress(&Progress::finished(&image, total));
        info!(
            "Focus stack complete: {}x{} in {:.3}ms",
            image.width,
            image.height,
            started.elapsed().as_secs_f64() * 1000.0
        );

        Ok(StackOutput {
            image,
            crop,
            transforms,
            reports,
            contributions: accumulator.contribution_map().clone(),
        })
    }
}
