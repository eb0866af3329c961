use std::borrow::Cow;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::focus_stack::fusion::FocusAccumulator;
use crate::focus_stack::raster::{BitDepth, RasterImage};

/// Shared flag that asks a running stack to stop at the next frame boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Clone, Copy)]
enum Snapshot<'a> {
    Hidden,
    Reference(&'a RasterImage),
    Composite(&'a FocusAccumulator, BitDepth),
    Finished(&'a RasterImage),
}

/// State of a run, handed to the progress callback after each frame.
///
/// The preview is only rendered when asked for, since collapsing the
/// accumulator costs about as much as decomposing a frame.
#[derive(Clone, Copy)]
pub struct Progress<'a> {
    /// Frames processed so far, reference included
    pub current: usize,
    /// Frames in the run
    pub limit: usize,
    /// False only for the last snapshot, which carries the result
    pub is_running: bool,
    snapshot: Snapshot<'a>,
}

impl<'a> Progress<'a> {
    pub(crate) fn reference(frame: &'a RasterImage, limit: usize, previews: bool) -> Self {
        Self {
            current: 1,
            limit,
            is_running: true,
            snapshot: if previews { Snapshot::Reference(frame) } else { Snapshot::Hidden },
        }
    }

    pub(crate) fn fused(
        accumulator: &'a FocusAccumulator,
        limit: usize,
        depth: BitDepth,
        previews: bool,
    ) -> Self {
        Self {
            current: accumulator.count(),
            limit,
            is_running: true,
            snapshot: if previews {
                Snapshot::Composite(accumulator, depth)
            } else {
                Snapshot::Hidden
            },
        }
    }

    pub(crate) fn finished(image: &'a RasterImage, limit: usize) -> Self {
        Self {
            current: limit,
            limit,
            is_running: false,
            snapshot: Snapshot::Finished(image),
        }
    }

    /// Completed share of the run in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.limit == 0 {
            return 0.0;
        }
        self.current as f64 / self.limit as f64
    }

    /// The image to show for this stage: the reference frame, the current
    /// composite, or the final result. `None` when previews are disabled.
    pub fn preview(&self) -> Option<Cow<'a, RasterImage>> {
        match self.snapshot {
            Snapshot::Hidden => None,
            Snapshot::Reference(frame) => Some(Cow::Borrowed(frame)),
            Snapshot::Composite(accumulator, depth) => {
                Some(Cow::Owned(accumulator.current_composite(depth)))
            }
            Snapshot::Finished(image) => Some(Cow::Borrowed(image)),
        }
    }
}

impl std::fmt::Debug for Progress<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("current", &self.current)
            .field("limit", &self.limit)
            .field("is_running", &self.is_running)
            .field("has_preview", &!matches!(self.snapshot, Snapshot::Hidden))
            .finish()
    }
}
