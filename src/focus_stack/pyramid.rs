//! Multi-resolution pyramid module
//!
//! Band-pass (Laplacian) decomposition of a luma/chroma image and its
//! reconstruction. Level 0 is the finest level; the coarsest level holds the
//! low-pass base image rather than a band-pass residual.

mod kernel;
mod level;

pub use kernel::{downsample_plane, reflect_101, upsample_plane};
pub use level::{Pyramid, PyramidLevel, downsample, level_count, upsample};
