use std::io::Write;
use std::path::Path;

use crate::focus_stack::common::error::Result;
use crate::focus_stack::io::types::OutputConfig;
use crate::focus_stack::raster::RasterImage;

pub trait FrameWriter {
    /// Encodes `image` as a TIFF stream.
    fn write_tiff(&self, image: &RasterImage, output: &mut dyn Write, config: &OutputConfig) -> Result<()>;

    /// Writes `image` to `path`, picking the format from the extension.
    fn write_frame(&self, image: &RasterImage, path: &Path, config: &OutputConfig) -> Result<()>;
}
