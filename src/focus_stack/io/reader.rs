use std::path::Path;

use crate::focus_stack::common::error::Result;
use crate::focus_stack::raster::RasterImage;

pub trait FrameReader {
    /// Decodes the frame at `path`. Failures are reported as
    /// [`StackError::UnableToOpen`](crate::focus_stack::StackError::UnableToOpen).
    fn read_frame(&self, path: &Path) -> Result<RasterImage>;
}
