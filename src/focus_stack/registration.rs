//! Frame registration module
//!
//! Coarse-to-fine affine alignment of each frame to its predecessor, the
//! chained transform into the reference frame, warping, and the running crop
//! of the area every warped frame covers.

mod transform;
mod resample;
mod ecc;
mod register;
mod warp;
mod crop;
pub mod types;

pub use transform::AffineTransform;
pub use resample::{gaussian_blur, resize_area, sample_bilinear};
pub use ecc::{EccError, EccEstimate, find_transform_ecc};
pub use register::{register_frames, run_pass};
pub use warp::warp_planes;
pub use crop::CropRect;
pub use types::{EccPass, Interpolation, PassOutcome, RegistrationConfig, RegistrationReport};
