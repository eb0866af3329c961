//! Registration configuration and report types

use crate::focus_stack::registration::AffineTransform;

/// Parameters of one ECC optimization pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EccPass {
    /// Both frames are area-downscaled so their longer side fits this size
    pub max_resolution: usize,
    /// Iteration cap
    pub max_iterations: usize,
    /// Stop once the correlation changes by less than this between iterations
    pub epsilon: f64,
    /// Gaussian prefilter size applied to both frames; 1 disables it
    pub gauss_filter_size: usize,
}

impl EccPass {
    pub const ROUGH: EccPass = EccPass {
        max_resolution: 256,
        max_iterations: 25,
        epsilon: 0.01,
        gauss_filter_size: 1,
    };

    pub const FINE: EccPass = EccPass {
        max_resolution: 2048,
        max_iterations: 50,
        epsilon: 0.001,
        gauss_filter_size: 3,
    };
}

/// Resampling filter used when warping a frame into the reference space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interpolation {
    /// Bilinear (fast, softer)
    Bilinear,
    /// Lanczos windowed sinc with a = 4
    #[default]
    Lanczos4,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationConfig {
    pub rough: EccPass,
    pub fine: EccPass,
    pub interpolation: Interpolation,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            rough: EccPass::ROUGH,
            fine: EccPass::FINE,
            interpolation: Interpolation::default(),
        }
    }
}

/// How one ECC pass ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PassOutcome {
    /// Correlation settled within epsilon
    Converged { correlation: f64, iterations: usize },
    /// Ran out of iterations while still improving
    IterationLimit { correlation: f64, iterations: usize },
    /// The optimization broke down; the pass produced no transform
    Diverged { reason: String },
}

impl PassOutcome {
    pub fn correlation(&self) -> Option<f64> {
        match self {
            PassOutcome::Converged { correlation, .. }
            | PassOutcome::IterationLimit { correlation, .. } => Some(*correlation),
            PassOutcome::Diverged { .. } => None,
        }
    }

    pub fn is_diverged(&self) -> bool {
        matches!(self, PassOutcome::Diverged { .. })
    }
}

/// Outcome of registering one frame against its predecessor.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationReport {
    /// Transform from this frame to the previous frame, full resolution
    pub local: AffineTransform,
    pub rough: PassOutcome,
    pub fine: PassOutcome,
}

impl RegistrationReport {
    /// The report of a frame that was not registered (pre-aligned input).
    pub fn skipped() -> Self {
        let reason = "registration disabled".to_string();
        Self {
            local: AffineTransform::identity(),
            rough: PassOutcome::Diverged { reason: reason.clone() },
            fine: PassOutcome::Diverged { reason },
        }
    }

    /// True when the fine pass failed and the rough estimate was kept.
    pub fn used_fallback(&self) -> bool {
        self.fine.is_diverged()
    }

    pub fn converged(&self) -> bool {
        matches!(self.fine, PassOutcome::Converged { .. })
    }
}
