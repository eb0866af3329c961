//! Frame decoding through the `image` crate.
//!
//! Handles every format the crate is built with (JPEG, PNG, TIFF, BMP, WebP
//! by default). Sources with more than eight bits per channel are kept at
//! sixteen bits; alpha is discarded.

use std::path::Path;

use image::{DynamicImage, ImageReader};
use tracing::{debug, instrument};

use crate::focus_stack::common::error::{Result, StackError};
use crate::focus_stack::io::reader::FrameReader;
use crate::focus_stack::raster::{BitDepth, RasterImage};

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageFrameReader;

impl ImageFrameReader {
    /// Converts an already decoded image.
    pub fn from_dynamic(image: DynamicImage) -> Result<RasterImage> {
        let color = image.color();
        let wide = color.bytes_per_pixel() / color.channel_count() > 1;
        let (width, height) = (image.width() as usize, image.height() as usize);
        if wide {
            let rgb = image.into_rgb16();
            RasterImage::new(width, height, rgb.into_raw(), BitDepth::Sixteen)
        } else {
            let rgb = image.into_rgb8();
            RasterImage::from_rgb8(width, height, rgb.as_raw())
        }
    }
}

impl FrameReader for ImageFrameReader {
    #[instrument(skip_all, fields(path = %path.display()))]
    fn read_frame(&self, path: &Path) -> Result<RasterImage> {
        let decoded = ImageReader::open(path)
            .map_err(|e| StackError::unable_to_open(path, e))?
            .with_guessed_format()
            .map_err(|e| StackError::unable_to_open(path, e))?
            .decode()
            .map_err(|e| StackError::unable_to_open(path, e))?;

        let frame = Self::from_dynamic(decoded).map_err(|e| StackError::unable_to_open(path, e))?;
        debug!(
            width = frame.width,
            height = frame.height,
            bits = frame.depth.bits(),
            "Decoded frame"
        );
        Ok(frame)
    }
}
