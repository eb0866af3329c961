//! Frame I/O module
//!
//! Decoding source photographs into [`RasterImage`](crate::focus_stack::raster::RasterImage)s
//! and encoding the stacked result. Both sides sit behind traits so the
//! pipeline can be driven by in-memory mocks.

mod reader;
mod image_reader;
mod writer;
mod standard_writer;
pub mod types;

pub use reader::FrameReader;
pub use image_reader::ImageFrameReader;
pub use writer::FrameWriter;
pub use standard_writer::StandardFrameWriter;
pub use types::{OutputConfig, OutputConfigBuilder, TiffCompression};
