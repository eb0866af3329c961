//! Stacking orchestrator module
//!
//! Drives a burst through decode, registration against the previous frame,
//! warping into the reference frame, pyramid decomposition and fusion,
//! reporting progress after every frame.

mod config;
mod progress;
mod pipeline;

pub use config::{StackConfig, StackConfigBuilder};
pub use progress::{CancelToken, Progress};
pub use pipeline::{FocusStackPipeline, StackOutput};

#[cfg(test)]
mod tests;
