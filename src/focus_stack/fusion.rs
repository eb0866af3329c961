//! Focus accumulator module
//!
//! Keeps the best-so-far Laplacian pyramid of a stack. Each incoming frame
//! competes level by level: the base level is averaged, detail levels are
//! won by the frame with more luma energy.

mod accumulator;
mod rules;

pub use accumulator::{FocusAccumulator, FusionConfig, FusionStats};
pub use rules::{fuse_coarsest, fuse_finest, fuse_intermediate, neighborhood_sum};

#[cfg(test)]
mod tests;
