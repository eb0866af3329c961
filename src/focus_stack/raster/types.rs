//! Decoded RGB raster types

use crate::focus_stack::common::error::{Result, StackError};
use crate::focus_stack::raster::Plane;

/// Bits per color channel of a [`RasterImage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BitDepth {
    #[default]
    Eight,
    Sixteen,
}

impl BitDepth {
    pub fn bits(self) -> u32 {
        match self {
            BitDepth::Eight => 8,
            BitDepth::Sixteen => 16,
        }
    }

    /// Largest sample value representable at this depth.
    pub fn max_value(self) -> f32 {
        match self {
            BitDepth::Eight => u8::MAX as f32,
            BitDepth::Sixteen => u16::MAX as f32,
        }
    }
}

/// RGB image as decoded from a source file or produced by the pipeline.
///
/// Samples are interleaved `[R, G, B, R, G, B, ...]` in sRGB. Eight-bit
/// images keep their values in the low byte of each `u16`.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterImage {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
    /// Interleaved RGB samples
    pub data: Vec<u16>,
    /// Bits per channel of `data`
    pub depth: BitDepth,
}

impl RasterImage {
    pub fn new(width: usize, height: usize, data: Vec<u16>, depth: BitDepth) -> Result<Self> {
        if width == 0 || height == 0 || data.len() != width * height * 3 {
            return Err(StackError::InvalidDimensions(width, height));
        }
        Ok(Self {
            width,
            height,
            data,
            depth,
        })
    }

    pub fn from_rgb8(width: usize, height: usize, data: &[u8]) -> Result<Self> {
        Self::new(
            width,
            height,
            data.iter().map(|&v| v as u16).collect(),
            BitDepth::Eight,
        )
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> [u16; 3] {
        let i = (y * self.width + x) * 3;
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    /// Splits the image into three planes with samples scaled to `[0, 1]`.
    pub fn to_planes(&self) -> [Plane; 3] {
        let scale = 1.0 / self.depth.max_value();
        let n = self.width * self.height;
        let mut channels = [
            Vec::with_capacity(n),
            Vec::with_capacity(n),
            Vec::with_capacity(n),
        ];
        for px in self.data.chunks_exact(3) {
            for (channel, &v) in channels.iter_mut().zip(px) {
                channel.push(v as f32 * scale);
            }
        }
        channels.map(|c| Plane::from_vec(self.width, self.height, c))
    }

    /// Clamps normalized planes to `[0, 1]`, scales them to `depth` and
    /// rounds to the nearest representable value.
    pub fn from_planes(planes: &[Plane; 3], depth: BitDepth) -> Self {
        let (width, height) = planes[0].dimensions();
        debug_assert!(planes.iter().all(|p| p.dimensions() == (width, height)));
        let max = depth.max_value();
        let mut data = Vec::with_capacity(width * height * 3);
        for i in 0..width * height {
            for plane in planes {
                data.push((plane.data()[i].clamp(0.0, 1.0) * max).round() as u16);
            }
        }
        Self {
            width,
            height,
            data,
            depth,
        }
    }

    /// Extracts the `width`x`height` window whose top-left corner is `(x, y)`.
    pub fn crop(&self, x: usize, y: usize, width: usize, height: usize) -> Self {
        assert!(
            x + width <= self.width && y + height <= self.height,
            "crop window exceeds image bounds"
        );
        let mut data = Vec::with_capacity(width * height * 3);
        for row in y..y + height {
            let start = (row * self.width + x) * 3;
            data.extend_from_slice(&self.data[start..start + width * 3]);
        }
        Self {
            width,
            height,
            data,
            depth: self.depth,
        }
    }

    /// Rescales the samples to another bit depth.
    pub fn convert_depth(&self, depth: BitDepth) -> Self {
        if depth == self.depth {
            return self.clone();
        }
        let factor = depth.max_value() / self.depth.max_value();
        Self {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .map(|&v| (v as f32 * factor).round() as u16)
                .collect(),
            depth,
        }
    }

    /// Samples narrowed to `u8`, rescaling sixteen-bit data.
    pub fn to_rgb8(&self) -> Vec<u8> {
        match self.depth {
            BitDepth::Eight => self.data.iter().map(|&v| v as u8).collect(),
            BitDepth::Sixteen => self
                .data
                .iter()
                .map(|&v| ((v as u32 + 128) / 257) as u8)
                .collect(),
        }
    }
}
