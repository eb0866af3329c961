//! Focus stacking pipeline module
//!
//! This module turns an ordered burst of photographs focused at different
//! depths into one composite that is sharp everywhere. It is split into the
//! color transform, the Laplacian pyramid, frame registration, the focus
//! accumulator and the orchestrator that drives them frame by frame.

pub mod common;
pub mod raster;
pub mod color;
pub mod pyramid;
pub mod registration;
pub mod fusion;
pub mod io;
pub mod stacking;

pub use common::{
    StackError,
    Result,
};

pub use raster::{
    BitDepth,
    Plane,
    RasterImage,
};

pub use pyramid::{
    Pyramid,
    PyramidLevel,
};

pub use registration::{
    AffineTransform,
    CropRect,
    EccPass,
    Interpolation,
    RegistrationConfig,
    RegistrationReport,
};

pub use fusion::{
    FocusAccumulator,
    FusionConfig,
};

pub use io::{
    FrameReader,
    FrameWriter,
    ImageFrameReader,
    OutputConfig,
    StandardFrameWriter,
    TiffCompression,
};

pub use stacking::{
    CancelToken,
    FocusStackPipeline,
    Progress,
    StackConfig,
    StackConfigBuilder,
    StackOutput,
};
