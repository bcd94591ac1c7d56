// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use rayon::prelude::*;

use crate::error::{Result, SegmentationError};

/// Luma weights for RGB to gray conversion.
const LUMA_R: f64 = 0.2989;
const LUMA_G: f64 = 0.5870;
const LUMA_B: f64 = 0.1140;

/// Row-major grayscale image with intensities in `[0, 1]`.
///
/// Pixel `(x, y)` lives at flat index `y * width + x`.
#[derive(Debug, Clone, PartialEq)]
pub struct GrayscaleImage {
    width: usize,
    height: usize,
    data: Box<[f64]>,
}

impl GrayscaleImage {
    /// Create an image from row-major intensities.
    ///
    /// # Errors
    /// Returns an error if either dimension is below 2, if `data.len()` is not
    /// `width * height`, or if any value is non-finite or outside `[0, 1]`.
    pub fn new(width: usize, height: usize, data: Vec<f64>) -> Result<Self> {
        for (axis, &size) in [width, height].iter().enumerate() {
            if size < 2 {
                return Err(SegmentationError::InvalidDimensions { axis, size });
            }
        }
        if data.len() != width * height {
            return Err(SegmentationError::ShapeMismatch {
                expected: [width, height],
                got: data.len(),
            });
        }
        for (index, &value) in data.iter().enumerate() {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(SegmentationError::InvalidIntensity { index, value });
            }
        }
        Ok(GrayscaleImage {
            width,
            height,
            data: data.into_boxed_slice(),
        })
    }

    /// Create an image filled with a single intensity.
    pub fn uniform(width: usize, height: usize, value: f64) -> Result<Self> {
        Self::new(width, height, vec![value; width * height])
    }

    /// Convert interleaved 8-bit RGB into luma scaled to `[0, 1]`.
    pub fn from_rgb8(width: usize, height: usize, rgb: &[u8]) -> Result<Self> {
        if rgb.len() != width * height * 3 {
            return Err(SegmentationError::ShapeMismatch {
                expected: [width, height],
                got: rgb.len() / 3,
            });
        }
        let data = rgb
            .chunks_exact(3)
            .map(|px| {
                let luma =
                    LUMA_R * px[0] as f64 + LUMA_G * px[1] as f64 + LUMA_B * px[2] as f64;
                (luma / 255.0).clamp(0.0, 1.0)
            })
            .collect();
        Self::new(width, height, data)
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Intensity at `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    /// Row-major intensity buffer.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Apply a 3x3 median filter to interior pixels; the one-pixel border is
    /// copied unchanged.
    pub fn median_filter_3x3(&self) -> GrayscaleImage {
        let (w, h) = (self.width, self.height);
        let src = &self.data;
        let mut out = src.to_vec();
        out.par_chunks_mut(w)
            .enumerate()
            .skip(1)
            .take(h.saturating_sub(2))
            .for_each(|(y, row)| {
                for x in 1..w - 1 {
                    let mut window = [0.0f64; 9];
                    let mut k = 0;
                    for yy in y - 1..=y + 1 {
                        for xx in x - 1..=x + 1 {
                            window[k] = src[yy * w + xx];
                            k += 1;
                        }
                    }
                    window.sort_by(|a, b| a.total_cmp(b));
                    row[x] = window[4];
                }
            });
        GrayscaleImage {
            width: w,
            height: h,
            data: out.into_boxed_slice(),
        }
    }
}
