//! Enhanced correlation coefficient (ECC) maximization for affine motion.
//!
//! Iteratively refines a warp `W` so that `input(W(p))` correlates best with
//! `template(p)` over the pixels that stay inside the input. Each iteration
//! linearizes the warped input around the current parameters and solves a
//! 6x6 normal system for the update.

use nalgebra::{Matrix6, Vector6};
use rayon::prelude::*;
use thiserror::Error;
use tracing::trace;

use crate::focus_stack::raster::Plane;
use crate::focus_stack::registration::AffineTransform;
use crate::focus_stack::registration::resample::{gaussian_blur, gradients, sample_bilinear};

/// Fewest overlapping pixels for which an affine fit is attempted.
const MIN_OVERLAP: usize = 16;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EccError {
    #[error("images do not overlap under the current warp")]
    NoOverlap,

    #[error("image has no contrast to correlate")]
    NoContrast,

    #[error("Hessian is singular")]
    SingularHessian,

    #[error("correlation diverged at iteration {0}")]
    Diverged(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EccEstimate {
    /// Map from template coordinates into input coordinates
    pub warp: AffineTransform,
    /// Correlation coefficient reached, in `[-1, 1]`
    pub correlation: f64,
    pub iterations: usize,
    /// False when the iteration cap stopped the search
    pub converged: bool,
}

/// One warped sample: template value, warped input value and warped gradients.
#[derive(Clone, Copy)]
struct Sample {
    x: f32,
    y: f32,
    t: f32,
    i: f32,
    gx: f32,
    gy: f32,
}

#[derive(Default)]
struct Moments {
    n: usize,
    t_sum: f64,
    t_sq: f64,
    i_sum: f64,
    i_sq: f64,
}

impl Moments {
    fn merge(mut self, other: Moments) -> Moments {
        self.n += other.n;
        self.t_sum += other.t_sum;
        self.t_sq += other.t_sq;
        self.i_sum += other.i_sum;
        self.i_sq += other.i_sq;
        self
    }
}

struct Normals {
    hessian: Matrix6<f64>,
    image_projection: Vector6<f64>,
    template_projection: Vector6<f64>,
    correlation: f64,
}

impl Normals {
    fn zero() -> Self {
        Self {
            hessian: Matrix6::zeros(),
            image_projection: Vector6::zeros(),
            template_projection: Vector6::zeros(),
            correlation: 0.0,
        }
    }

    fn merge(mut self, other: Normals) -> Normals {
        self.hessian += other.hessian;
        self.image_projection += other.image_projection;
        self.template_projection += other.template_projection;
        self.correlation += other.correlation;
        self
    }
}

/// Warps the input and its gradients onto the template grid, keeping only
/// samples that land inside the input.
fn warp_samples(
    template: &Plane,
    input: &Plane,
    grad_x: &Plane,
    grad_y: &Plane,
    warp: &AffineTransform,
) -> Vec<Sample> {
    let (tw, th) = template.dimensions();
    (0..th)
        .into_par_iter()
        .flat_map_iter(|y| {
            (0..tw).filter_map(move |x| {
                let (u, v) = warp.apply(x as f64, y as f64);
                let i = sample_bilinear(input, u, v)?;
                let gx = sample_bilinear(grad_x, u, v)?;
                let gy = sample_bilinear(grad_y, u, v)?;
                Some(Sample {
                    x: x as f32,
                    y: y as f32,
                    t: template.at(x, y),
                    i,
                    gx,
                    gy,
                })
            })
        })
        .collect()
}

/// Jacobian of the warped intensity w.r.t. the parameters
/// `[a00, a10, a01, a11, tx, ty]`.
#[inline]
fn jacobian(s: &Sample) -> Vector6<f64> {
    let (x, y, gx, gy) = (s.x as f64, s.y as f64, s.gx as f64, s.gy as f64);
    Vector6::new(gx * x, gy * x, gx * y, gy * y, gx, gy)
}

fn apply_update(warp: &mut AffineTransform, delta: &Vector6<f64>) {
    warp.set(0, 0, warp.get(0, 0) + delta[0]);
    warp.set(1, 0, warp.get(1, 0) + delta[1]);
    warp.set(0, 1, warp.get(0, 1) + delta[2]);
    warp.set(1, 1, warp.get(1, 1) + delta[3]);
    warp.set(0, 2, warp.get(0, 2) + delta[4]);
    warp.set(1, 2, warp.get(1, 2) + delta[5]);
}

/// Estimates the affine warp aligning `input` to `template`, starting from
/// `initial`.
///
/// Stops when the correlation changes by less than `epsilon` or after
/// `max_iterations`. A breakdown of the normal equations is reported as an
/// error rather than returning a meaningless warp.
pub fn find_transform_ecc(
    template: &Plane,
    input: &Plane,
    initial: &AffineTransform,
    max_iterations: usize,
    epsilon: f64,
    gauss_filter_size: usize,
) -> Result<EccEstimate, EccError> {
    let template = gaussian_blur(template, gauss_filter_size);
    let input = gaussian_blur(input, gauss_filter_size);
    let (grad_x, grad_y) = gradients(&input);

    let mut warp = *initial;
    let mut rho = -1.0f64;
    let mut last_rho = f64::NEG_INFINITY;
    let mut iterations = 0;

    while iterations < max_iterations && (rho - last_rho).abs() >= epsilon {
        iterations += 1;

        let samples = warp_samples(&template, &input, &grad_x, &grad_y, &warp);
        if samples.len() < MIN_OVERLAP {
            return Err(EccError::NoOverlap);
        }

        let moments = samples
            .par_iter()
            .fold(Moments::default, |mut m, s| {
                m.n += 1;
                m.t_sum += s.t as f64;
                m.t_sq += (s.t as f64) * (s.t as f64);
                m.i_sum += s.i as f64;
                m.i_sq += (s.i as f64) * (s.i as f64);
                m
            })
            .reduce(Moments::default, Moments::merge);

        let n = moments.n as f64;
        let t_mean = moments.t_sum / n;
        let i_mean = moments.i_sum / n;
        let t_norm = (moments.t_sq - n * t_mean * t_mean).max(0.0).sqrt();
        let i_norm = (moments.i_sq - n * i_mean * i_mean).max(0.0).sqrt();
        if t_norm <= f64::EPSILON || i_norm <= f64::EPSILON {
            return Err(EccError::NoContrast);
        }

        let normals = samples
            .par_iter()
            .fold(Normals::zero, |mut acc, s| {
                let j = jacobian(s);
                let tz = s.t as f64 - t_mean;
                let iz = s.i as f64 - i_mean;
                acc.hessian += j * j.transpose();
                acc.image_projection += j * iz;
                acc.template_projection += j * tz;
                acc.correlation += tz * iz;
                acc
            })
            .reduce(Normals::zero, Normals::merge);

        last_rho = rho;
        rho = normals.correlation / (i_norm * t_norm);
        if !rho.is_finite() {
            return Err(EccError::Diverged(iterations));
        }

        let hessian_inv = normals
            .hessian
            .try_inverse()
            .ok_or(EccError::SingularHessian)?;

        let image_projection_hessian = hessian_inv * normals.image_projection;
        let lambda_n = i_norm * i_norm - normals.image_projection.dot(&image_projection_hessian);
        let lambda_d = normals.correlation - normals.template_projection.dot(&image_projection_hessian);
        if lambda_d <= 0.0 {
            return Err(EccError::Diverged(iterations));
        }
        let lambda = lambda_n / lambda_d;

        let error_projection = normals.template_projection * lambda - normals.image_projection;
        let delta = hessian_inv * error_projection;
        if delta.iter().any(|d| !d.is_finite()) {
            return Err(EccError::Diverged(iterations));
        }
        apply_update(&mut warp, &delta);

        trace!(iteration = iterations, rho, "ECC iteration");
    }

    Ok(EccEstimate {
        warp,
        correlation: rho,
        iterations,
        converged: (rho - last_rho).abs() < epsilon,
    })
}
