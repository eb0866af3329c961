use tracing::{debug, info_span, warn};

use crate::focus_stack::raster::Plane;
use crate::focus_stack::registration::ecc::{EccError, EccEstimate, find_transform_ecc};
use crate::focus_stack::registration::resample::resize_area;
use crate::focus_stack::registration::{
    AffineTransform, EccPass, PassOutcome, RegistrationConfig, RegistrationReport,
};

/// Runs one ECC pass at reduced resolution.
///
/// `seed` and the returned warp are both full-resolution transforms mapping
/// `source` coordinates into `reference` coordinates. Only the translation is
/// rescaled between resolutions.
pub fn run_pass(
    reference: &Plane,
    source: &Plane,
    pass: &EccPass,
    seed: &AffineTransform,
) -> Result<EccEstimate, EccError> {
    let longest = reference.width().max(reference.height());
    let scale = if longest <= pass.max_resolution {
        1.0
    } else {
        pass.max_resolution as f64 / longest as f64
    };

    let estimate = if scale < 1.0 {
        let reference = resize_area(reference, scale);
        let source = resize_area(source, scale);
        find_transform_ecc(
            &source,
            &reference,
            &seed.rescaled(scale),
            pass.max_iterations,
            pass.epsilon,
            pass.gauss_filter_size,
        )?
    } else {
        find_transform_ecc(
            source,
            reference,
            seed,
            pass.max_iterations,
            pass.epsilon,
            pass.gauss_filter_size,
        )?
    };

    if !estimate.warp.is_invertible() {
        return Err(EccError::SingularHessian);
    }

    Ok(EccEstimate {
        warp: estimate.warp.rescaled(1.0 / scale),
        ..estimate
    })
}

fn outcome(result: &Result<EccEstimate, EccError>) -> PassOutcome {
    match result {
        Ok(e) if e.converged => PassOutcome::Converged {
            correlation: e.correlation,
            iterations: e.iterations,
        },
        Ok(e) => PassOutcome::IterationLimit {
            correlation: e.correlation,
            iterations: e.iterations,
        },
        Err(err) => PassOutcome::Diverged {
            reason: err.to_string(),
        },
    }
}

/// Estimates the transform taking `source` luma coordinates into
/// `reference` luma coordinates.
///
/// A rough pass seeded at identity is refined by a fine pass. When the fine
/// pass breaks down the rough estimate is kept, and when that also breaks
/// down the frames are assumed aligned. Registration never fails outright.
pub fn register_frames(
    reference: &Plane,
    source: &Plane,
    config: &RegistrationConfig,
) -> RegistrationReport {
    let rough = {
        let _span = info_span!("rough_pass", max_resolution = config.rough.max_resolution).entered();
        run_pass(reference, source, &config.rough, &AffineTransform::identity())
    };
    let rough_warp = match &rough {
        Ok(estimate) => estimate.warp,
        Err(e) => {
            warn!(error = %e, "Rough registration did not converge, assuming identity");
            AffineTransform::identity()
        }
    };

    let fine = {
        let _span = info_span!("fine_pass", max_resolution = config.fine.max_resolution).entered();
        run_pass(reference, source, &config.fine, &rough_warp)
    };
    let local = match &fine {
        Ok(estimate) => {
            if !estimate.converged {
                debug!(
                    iterations = estimate.iterations,
                    correlation = estimate.correlation,
                    "Fine registration hit the iteration limit"
                );
            }
            estimate.warp
        }
        Err(e) => {
            warn!(error = %e, "Fine registration did not converge, using rough estimate");
            rough_warp
        }
    };

    let [[a, b, tx], [c, d, ty]] = local.rows();
    debug!(a, b, tx, c, d, ty, "Frame warp");

    RegistrationReport {
        local,
        rough: outcome(&rough),
        fine: outcome(&fine),
    }
}
