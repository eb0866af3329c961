use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use image::{DynamicImage, ImageBuffer, Rgb};
use tracing::{debug, info};

use crate::focus_stack::common::error::{Result, StackError};
use crate::focus_stack::io::types::{OutputConfig, TiffCompression};
use crate::focus_stack::io::writer::FrameWriter;
use crate::focus_stack::raster::{BitDepth, RasterImage};

/// Writes `.tif`/`.tiff` through the `tiff` encoder and everything else
/// through the `image` crate.
pub struct StandardFrameWriter;

fn is_tiff(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"))
}

fn keeps_sixteen_bits(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

fn to_dynamic(image: &RasterImage, sixteen: bool) -> Result<DynamicImage> {
    let (w, h) = (image.width as u32, image.height as u32);
    let dynamic = if sixteen && image.depth == BitDepth::Sixteen {
        ImageBuffer::<Rgb<u16>, _>::from_raw(w, h, image.data.clone()).map(DynamicImage::ImageRgb16)
    } else {
        ImageBuffer::<Rgb<u8>, _>::from_raw(w, h, image.to_rgb8()).map(DynamicImage::ImageRgb8)
    };
    dynamic.ok_or_else(|| StackError::EncodeError("pixel buffer does not match image size".to_string()))
}

impl FrameWriter for StandardFrameWriter {
    fn write_tiff(&self, image: &RasterImage, output: &mut dyn Write, config: &OutputConfig) -> Result<()> {
        debug!("Encoding TIFF image: {}x{}", image.width, image.height);

        let mut buffer = Vec::new();

        let compression = match config.compression {
            TiffCompression::None => tiff::encoder::Compression::Uncompressed,
            TiffCompression::Lzw => tiff::encoder::Compression::Lzw,
            TiffCompression::DeflateFast => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Fast),
            TiffCompression::DeflateBalanced => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Balanced),
            TiffCompression::DeflateBest => tiff::encoder::Compression::Deflate(tiff::encoder::compression::DeflateLevel::Best),
        };

        let mut encoder = tiff::encoder::TiffEncoder::new(std::io::Cursor::new(&mut buffer))
            .map_err(|e| StackError::EncodeError(e.to_string()))?
            .with_compression(compression);

        if let Some(predictor_val) = config.predictor {
            let predictor = match predictor_val {
                2 => tiff::tags::Predictor::Horizontal,
                _ => tiff::tags::Predictor::None,
            };
            encoder = encoder.with_predictor(predictor);
        }

        let (w, h) = (image.width as u32, image.height as u32);
        match image.depth {
            BitDepth::Sixteen => encoder
                .write_image::<tiff::encoder::colortype::RGB16>(w, h, &image.data)
                .map_err(|e| StackError::EncodeError(e.to_string()))?,
            BitDepth::Eight => encoder
                .write_image::<tiff::encoder::colortype::RGB8>(w, h, &image.to_rgb8())
                .map_err(|e| StackError::EncodeError(e.to_string()))?,
        }

        output.write_all(&buffer)?;

        debug!("TIFF encoding complete");
        Ok(())
    }

    fn write_frame(&self, image: &RasterImage, path: &Path, config: &OutputConfig) -> Result<()> {
        if is_tiff(path) {
            let file = File::create(path)
                .map_err(|e| StackError::OutputWriteError(format!("{}: {}", path.display(), e)))?;
            let mut output = BufWriter::new(file);
            self.write_tiff(image, &mut output, config)?;
            output.flush()?;
        } else {
            to_dynamic(image, keeps_sixteen_bits(path))?
                .save(path)
                .map_err(|e| StackError::OutputWriteError(format!("{}: {}", path.display(), e)))?;
        }

        info!(
            path = %path.display(),
            width = image.width,
            height = image.height,
            bits = image.depth.bits(),
            "Wrote stacked image"
        );
        Ok(())
    }
}
