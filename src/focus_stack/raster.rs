//! Raster types module
//!
//! Decoded RGB frames as they enter and leave the pipeline, and the
//! single-channel float planes the algorithms operate on.

mod plane;
pub mod types;

pub use plane::Plane;
pub use types::{BitDepth, RasterImage};
