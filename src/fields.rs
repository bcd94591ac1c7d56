// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Per-image fields shared by both solve stages.
//!
//! [`WeightField`] turns neighbour intensity differences into edge-stopping
//! conductances `exp(-beta * d) + 1e-5`, capped at 1, after min-max
//! normalisation of each direction. [`GradientField`] is the normalised
//! central-difference gradient magnitude, zero on the image border. Both are
//! computed row-parallel and never change after construction.

use rayon::prelude::*;

use crate::grayscale::GrayscaleImage;

/// Edge sharpness used by the 2D ADI stage.
pub const BETA_2D: f64 = 80.0;
/// Edge sharpness used by the 1D propagation stage.
pub const BETA_1D: f64 = 90.0;
/// Weight floor keeping every edge conductive.
pub const WEIGHT_EPSILON: f64 = 1e-5;
/// Ranges narrower than this are left unnormalized.
pub const NORMALIZE_TOLERANCE: f64 = 1e-6;

/// Min-max rescale `data` to `[0, 1]` in place.
///
/// Leaves the data untouched when `max - min` is below
/// [`NORMALIZE_TOLERANCE`].
pub fn normalize(data: &mut [f64]) {
    let (lo, hi) = data
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;
    if !(range >= NORMALIZE_TOLERANCE) {
        return;
    }
    data.par_iter_mut().for_each(|v| *v = (*v - lo) / range);
}

#[inline]
fn edge_weight(normalized: f64, beta: f64) -> f64 {
    ((-beta * normalized).exp() + WEIGHT_EPSILON).min(1.0)
}

/// Horizontal and vertical edge-stopping weights of one image.
///
/// `wx[y * w + x]` couples `(x, y)` with `(x + 1, y)`; `wy[y * w + x]` couples
/// `(x, y)` with `(x, y + 1)`. Entries past the last column (for `wx`) or
/// row (for `wy`) have no edge but still hold the weight of a zero
/// difference. All values lie in `(0, 1]`.
#[derive(Debug, Clone)]
pub struct WeightField {
    width: usize,
    height: usize,
    wx: Box<[f64]>,
    wy: Box<[f64]>,
}

impl WeightField {
    /// Compute the weights of `image` with edge sharpness `beta`.
    pub fn compute(image: &GrayscaleImage, beta: f64) -> Self {
        let (w, h) = (image.width(), image.height());
        let px = image.as_slice();

        let mut wx = vec![0.0; w * h];
        wx.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            let src = &px[y * w..(y + 1) * w];
            for x in 0..w - 1 {
                row[x] = (src[x] - src[x + 1]).abs();
            }
        });

        let mut wy = vec![0.0; w * h];
        wy.par_chunks_mut(w)
            .enumerate()
            .take(h - 1)
            .for_each(|(y, row)| {
                let here = &px[y * w..(y + 1) * w];
                let below = &px[(y + 1) * w..(y + 2) * w];
                for x in 0..w {
                    row[x] = (here[x] - below[x]).abs();
                }
            });

        normalize(&mut wx);
        normalize(&mut wy);
        wx.par_iter_mut().for_each(|v| *v = edge_weight(*v, beta));
        wy.par_iter_mut().for_each(|v| *v = edge_weight(*v, beta));

        WeightField {
            width: w,
            height: h,
            wx: wx.into_boxed_slice(),
            wy: wy.into_boxed_slice(),
        }
    }

    /// Field width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Field height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Horizontal weights, row-major.
    pub fn horizontal(&self) -> &[f64] {
        &self.wx
    }

    /// Vertical weights, row-major.
    pub fn vertical(&self) -> &[f64] {
        &self.wy
    }

    /// Weight of the edge between `(x, y)` and `(x + 1, y)`.
    #[inline]
    pub fn wx(&self, x: usize, y: usize) -> f64 {
        self.wx[y * self.width + x]
    }

    /// Weight of the edge between `(x, y)` and `(x, y + 1)`.
    #[inline]
    pub fn wy(&self, x: usize, y: usize) -> f64 {
        self.wy[y * self.width + x]
    }
}

/// Normalized central-difference gradient magnitude.
#[derive(Debug, Clone)]
pub struct GradientField {
    width: usize,
    height: usize,
    grad: Box<[f64]>,
}

impl GradientField {
    /// Compute `|dI/dx| + |dI/dy|` at interior pixels (zero on the border),
    /// then normalize to `[0, 1]`.
    pub fn compute(image: &GrayscaleImage) -> Self {
        let (w, h) = (image.width(), image.height());
        let px = image.as_slice();
        let mut grad = vec![0.0; w * h];
        grad.par_chunks_mut(w)
            .enumerate()
            .skip(1)
            .take(h.saturating_sub(2))
            .for_each(|(y, row)| {
                for x in 1..w - 1 {
                    let gx = px[y * w + x + 1] - px[y * w + x - 1];
                    let gy = px[(y + 1) * w + x] - px[(y - 1) * w + x];
                    row[x] = gx.abs() + gy.abs();
                }
            });
        normalize(&mut grad);
        GradientField {
            width: w,
            height: h,
            grad: grad.into_boxed_slice(),
        }
    }

    /// Field width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Field height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Gradient magnitudes, row-major.
    pub fn as_slice(&self) -> &[f64] {
        &self.grad
    }

    /// Gradient magnitude at `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.grad[y * self.width + x]
    }
}
