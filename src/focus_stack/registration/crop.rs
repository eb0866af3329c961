use crate::focus_stack::raster::RasterImage;
use crate::focus_stack::registration::AffineTransform;

/// Distance from a whole pixel within which a warped edge is snapped to it.
pub const SNAP_TOLERANCE: f64 = 0.25;

#[inline]
fn snap(v: f64) -> f64 {
    let nearest = v.round();
    if (v - nearest).abs() <= SNAP_TOLERANCE { nearest } else { v }
}

/// Axis-aligned pixel rectangle in reference-frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CropRect {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl CropRect {
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The whole of a `width`x`height` frame.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn right(&self) -> usize {
        self.x + self.width
    }

    pub fn bottom(&self) -> usize {
        self.y + self.height
    }

    /// Overlap of two rectangles. Disjoint rectangles give a zero-sized one.
    pub fn intersect(&self, other: &CropRect) -> CropRect {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        CropRect::new(x, y, right.saturating_sub(x), bottom.saturating_sub(y))
    }

    /// Axis-aligned rectangle bounded by the inner edges of a
    /// `width`x`height` frame after mapping its corners through `transform`,
    /// rounded inward to whole pixels and clamped to the frame.
    ///
    /// Edges within [`SNAP_TOLERANCE`] of a whole pixel are taken as that
    /// pixel, so sub-pixel registration error does not cost a full column.
    pub fn warped_bounds(transform: &AffineTransform, width: usize, height: usize) -> CropRect {
        let (w, h) = (width as f64, height as f64);
        let [tl, tr, bl, br] = [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)].map(|(x, y)| transform.apply(x, y));
        if [tl, tr, bl, br].iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
            return CropRect::new(0, 0, 0, 0);
        }

        let left = snap(tl.0.max(bl.0)).ceil().clamp(0.0, w) as usize;
        let top = snap(tl.1.max(tr.1)).ceil().clamp(0.0, h) as usize;
        let right = snap(tr.0.min(br.0)).floor().clamp(0.0, w) as usize;
        let bottom = snap(bl.1.min(br.1)).floor().clamp(0.0, h) as usize;

        CropRect::new(
            left,
            top,
            right.saturating_sub(left),
            bottom.saturating_sub(top),
        )
    }

    /// Cuts this rectangle out of `image`. The rectangle is clamped to the
    /// image first.
    pub fn apply(&self, image: &RasterImage) -> RasterImage {
        let r = self.intersect(&CropRect::full(image.width, image.height));
        if r == CropRect::full(image.width, image.height) {
            return image.clone();
        }
        image.crop(r.x, r.y, r.width, r.height)
    }
}
