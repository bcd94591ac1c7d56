// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Seeded two-label image segmentation.
//!
//! Given a grayscale image and user-drawn foreground/background strokes, this
//! library computes a dense per-pixel foreground confidence. Foreground seeds
//! are first grown along rows and columns by independent 1D solves, then
//! diffused over the whole image with an alternating-direction-implicit (ADI)
//! scheme whose edge-stopping weights keep the confidence from leaking across
//! strong intensity edges. Every sweep reduces to independent tridiagonal
//! systems, solved serially or in parallel with rayon.
//!
//! ```no_run
//! use seedseg::{GrayscaleImage, Parameters, SeedStrokes, Segmenter};
//!
//! let image = GrayscaleImage::uniform(64, 64, 0.5)?;
//! let mut strokes = SeedStrokes::new();
//! strokes.add_foreground(vec![[10.0, 10.0], [20.0, 12.0]]);
//! strokes.add_background(vec![[50.0, 50.0], [60.0, 40.0]]);
//!
//! let mut seg = Segmenter::new(image, Parameters::default())?;
//! let report = seg.compute(&strokes);
//! let p = seg.probability().expect("computed");
//! println!("{} ms, p(15,11) = {}", report.elapsed_ms, p.get(15, 11));
//! # Ok::<(), seedseg::SegmentationError>(())
//! ```

#![warn(missing_docs)]

/// Error types for the library.
pub mod error;
/// Edge-stopping weights and gradient magnitude.
pub mod fields;
/// Grayscale image buffer, luma conversion and median pre-filter.
pub mod grayscale;
/// 1D row/column foreground propagation.
pub mod initializer;
/// File I/O for images, strokes and probability fields.
pub mod io;
/// Seed strokes and the tri-state label mask.
pub mod mask;
/// Tunable solver parameters.
pub mod params;
/// Image-bound pipeline driver.
pub mod segmenter;
/// 2D ADI solver and its sweep backends.
pub mod solver;
/// Tridiagonal line solver.
pub mod tridiag;

pub use crate::error::{Result, SegmentationError};
pub use crate::fields::{GradientField, WeightField};
pub use crate::grayscale::GrayscaleImage;
pub use crate::initializer::{Initializer, PropagationReport};
pub use crate::mask::{Label, LabelMask, SeedStrokes};
pub use crate::params::Parameters;
pub use crate::segmenter::{Segmenter, SolveReport};
pub use crate::solver::{
    ProbabilityField, RayonBackend, SerialBackend, SolveProgress, Solver, Stage, SweepBackend,
};
