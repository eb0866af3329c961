use nalgebra::{Matrix3, Vector3};

/// 2x3 affine map from a frame's pixel coordinates into another frame's.
///
/// Stored as a 3x3 homogeneous matrix whose last row is always `[0, 0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    matrix: Matrix3<f64>,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub fn identity() -> Self {
        Self {
            matrix: Matrix3::identity(),
        }
    }

    /// Builds a transform from the two rows `[a, b, tx]` and `[c, d, ty]`.
    pub fn from_rows(rows: [[f64; 3]; 2]) -> Self {
        let [[a, b, tx], [c, d, ty]] = rows;
        Self {
            matrix: Matrix3::new(a, b, tx, c, d, ty, 0.0, 0.0, 1.0),
        }
    }

    pub fn translation(tx: f64, ty: f64) -> Self {
        Self::from_rows([[1.0, 0.0, tx], [0.0, 1.0, ty]])
    }

    pub fn rows(&self) -> [[f64; 3]; 2] {
        let m = &self.matrix;
        [
            [m[(0, 0)], m[(0, 1)], m[(0, 2)]],
            [m[(1, 0)], m[(1, 1)], m[(1, 2)]],
        ]
    }

    /// The homogeneous 3x3 form.
    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.matrix
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix[(row, col)]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < 2, "the last row of an affine transform is fixed");
        self.matrix[(row, col)] = value;
    }

    pub fn offset(&self) -> (f64, f64) {
        (self.matrix[(0, 2)], self.matrix[(1, 2)])
    }

    /// Applies the transform to a point.
    #[inline]
    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let p = self.matrix * Vector3::new(x, y, 1.0);
        (p.x, p.y)
    }

    /// `self ∘ other`: first `other`, then `self`.
    pub fn compose(&self, other: &AffineTransform) -> AffineTransform {
        let mut matrix = self.matrix * other.matrix;
        matrix[(2, 0)] = 0.0;
        matrix[(2, 1)] = 0.0;
        matrix[(2, 2)] = 1.0;
        Self { matrix }
    }

    pub fn inverse(&self) -> Option<AffineTransform> {
        let det = self.matrix[(0, 0)] * self.matrix[(1, 1)] - self.matrix[(0, 1)] * self.matrix[(1, 0)];
        if !det.is_finite() || det.abs() < 1e-12 {
            return None;
        }
        self.matrix.try_inverse().map(|matrix| Self { matrix })
    }

    pub fn is_invertible(&self) -> bool {
        self.inverse().is_some()
    }

    /// The same motion expressed at another resolution. The linear part is
    /// scale-invariant; only the translation scales.
    pub fn rescaled(&self, factor: f64) -> AffineTransform {
        let mut scaled = *self;
        scaled.matrix[(0, 2)] *= factor;
        scaled.matrix[(1, 2)] *= factor;
        scaled
    }

    pub fn is_identity(&self, tolerance: f64) -> bool {
        (self.matrix - Matrix3::identity())
            .iter()
            .all(|v| v.abs() <= tolerance)
    }

    pub fn is_finite(&self) -> bool {
        self.matrix.iter().all(|v| v.is_finite())
    }
}
