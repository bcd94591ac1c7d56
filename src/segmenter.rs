// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::time::Instant;

use log::{debug, info};
use serde::Serialize;

use crate::error::Result;
use crate::fields::{GradientField, WeightField, BETA_1D, BETA_2D};
use crate::grayscale::GrayscaleImage;
use crate::initializer::Initializer;
use crate::mask::{LabelMask, SeedStrokes};
use crate::params::Parameters;
use crate::solver::{ProbabilityField, SolveProgress, Solver, SweepBackend};

/// Summary of one [`Segmenter::compute`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SolveReport {
    /// Image width in pixels.
    pub width: usize,
    /// Image height in pixels.
    pub height: usize,
    /// Wall time of propagation plus diffusion, in milliseconds.
    pub elapsed_ms: u64,
    /// Pixels promoted to foreground by the 1D stage.
    pub promoted: usize,
    /// Foreground pixels entering the 2D stage.
    pub foreground_seeds: usize,
    /// Background pixels entering the 2D stage.
    pub background_seeds: usize,
    /// 1D iterations executed.
    pub iterations_1d: usize,
    /// 2D iterations executed.
    pub iterations_2d: usize,
}

/// One image's segmentation pipeline.
///
/// Computes the weight and gradient fields once per image and keeps the
/// mask and solver buffers between runs, so repeated
/// [`compute`](Self::compute) calls with growing stroke sets only pay for
/// the solves.
pub struct Segmenter {
    params: Parameters,
    image: GrayscaleImage,
    weights_2d: WeightField,
    weights_1d: WeightField,
    gradient: GradientField,
    mask: LabelMask,
    initializer: Initializer,
    solver: Solver,
    solved: bool,
    progress_callback: Option<Box<dyn Fn(SolveProgress) + Send + Sync>>,
}

impl Segmenter {
    /// Bind `image` with the given parameters.
    ///
    /// # Errors
    /// Returns an error if the parameters are invalid.
    pub fn new(image: GrayscaleImage, params: Parameters) -> Result<Self> {
        params.validate()?;
        let (w, h) = (image.width(), image.height());
        let (weights_2d, weights_1d, gradient) = compute_fields(&image);
        Ok(Segmenter {
            params,
            weights_2d,
            weights_1d,
            gradient,
            mask: LabelMask::new(w, h),
            initializer: Initializer::new(w, h, params),
            solver: Solver::new(w, h, params),
            solved: false,
            progress_callback: None,
            image,
        })
    }

    /// Replace the 2D sweep backend (builder method).
    pub fn with_backend(mut self, backend: Box<dyn SweepBackend>) -> Self {
        self.solver.set_backend(backend);
        self
    }

    /// Set a progress callback invoked after every 1D and 2D iteration
    /// (builder method).
    pub fn with_progress(mut self, callback: Box<dyn Fn(SolveProgress) + Send + Sync>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Bound image.
    pub fn image(&self) -> &GrayscaleImage {
        &self.image
    }

    /// Current parameters.
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Replace the parameters used by subsequent runs.
    ///
    /// # Errors
    /// Returns an error if the parameters are invalid; the old ones are kept.
    pub fn set_params(&mut self, params: Parameters) -> Result<()> {
        params.validate()?;
        self.params = params;
        self.initializer.set_params(params);
        self.solver.set_params(params);
        Ok(())
    }

    /// Bind a new image, recomputing the fields and resizing buffers.
    ///
    /// Any previous result is discarded.
    pub fn set_image(&mut self, image: GrayscaleImage) {
        let (w, h) = (image.width(), image.height());
        let (weights_2d, weights_1d, gradient) = compute_fields(&image);
        self.weights_2d = weights_2d;
        self.weights_1d = weights_1d;
        self.gradient = gradient;
        self.mask = LabelMask::new(w, h);
        self.initializer.resize(w, h);
        self.solver.resize(w, h);
        self.image = image;
        self.solved = false;
    }

    /// Seed mask after the last run's propagation.
    pub fn mask(&self) -> &LabelMask {
        &self.mask
    }

    /// Probability field of the last run, or `None` before the first run.
    pub fn probability(&self) -> Option<&ProbabilityField> {
        self.solved.then(|| self.solver.field())
    }

    /// Rasterize `strokes`, propagate foreground seeds, then diffuse.
    pub fn compute(&mut self, strokes: &SeedStrokes) -> SolveReport {
        let (w, h) = (self.image.width(), self.image.height());
        let start = Instant::now();
        let progress = self
            .progress_callback
            .as_deref()
            .map(|cb| cb as &(dyn Fn(SolveProgress) + Sync));

        self.mask.rasterize(strokes);
        let propagation =
            self.initializer
                .run(&mut self.mask, &self.weights_1d, &self.gradient, progress);
        debug!(
            "propagation promoted {} pixels in {:.2?}",
            propagation.promoted,
            start.elapsed()
        );

        self.solver
            .solve(&self.mask, &self.weights_2d, &self.gradient, progress);
        self.solved = true;

        let report = SolveReport {
            width: w,
            height: h,
            elapsed_ms: start.elapsed().as_millis() as u64,
            promoted: propagation.promoted,
            foreground_seeds: self.mask.count_foreground(),
            background_seeds: self.mask.count_background(),
            iterations_1d: propagation.iterations,
            iterations_2d: self.params.max_iterations_2d,
        };
        info!(
            "segmented {}x{} in {} ms ({} backend): fg={} bg={} promoted={}",
            w,
            h,
            report.elapsed_ms,
            self.solver.backend_name(),
            report.foreground_seeds,
            report.background_seeds,
            report.promoted
        );
        report
    }
}

fn compute_fields(image: &GrayscaleImage) -> (WeightField, WeightField, GradientField) {
    let start = Instant::now();
    let (weights_2d, (weights_1d, gradient)) = rayon::join(
        || WeightField::compute(image, BETA_2D),
        || {
            rayon::join(
                || WeightField::compute(image, BETA_1D),
                || GradientField::compute(image),
            )
        },
    );
    debug!(
        "computed fields for {}x{} image in {:.2?}",
        image.width(),
        image.height(),
        start.elapsed()
    );
    (weights_2d, weights_1d, gradient)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::Label;
    use crate::solver::SerialBackend;

    fn two_seed_strokes() -> SeedStrokes {
        let mut strokes = SeedStrokes::new();
        strokes.add_foreground(vec![[1.0, 1.0]]);
        strokes.add_background(vec![[2.0, 2.0]]);
        strokes
    }

    #[test]
    fn probability_absent_before_first_run() {
        let img = GrayscaleImage::uniform(4, 4, 0.5).unwrap();
        let seg = Segmenter::new(img, Parameters::default()).unwrap();
        assert!(seg.probability().is_none());
    }

    #[test]
    fn report_counts_seeds() {
        let img = GrayscaleImage::uniform(4, 4, 0.5).unwrap();
        let params = Parameters::default()
            .with_iterations_1d(1)
            .with_iterations_2d(1);
        let mut seg = Segmenter::new(img, params)
            .unwrap()
            .with_backend(Box::new(SerialBackend));
        let report = seg.compute(&two_seed_strokes());
        assert_eq!((report.width, report.height), (4, 4));
        assert_eq!(report.promoted, 2);
        assert_eq!(report.foreground_seeds, 3);
        assert_eq!(report.background_seeds, 1);
        assert_eq!(report.iterations_1d, 1);
        assert_eq!(report.iterations_2d, 1);
        assert_eq!(seg.mask().get(2, 2), Label::Background);
        assert!(seg.probability().is_some());
    }

    #[test]
    fn set_image_discards_result() {
        let img = GrayscaleImage::uniform(4, 4, 0.5).unwrap();
        let mut seg = Segmenter::new(img, Parameters::default()).unwrap();
        seg.compute(&two_seed_strokes());
        seg.set_image(GrayscaleImage::uniform(6, 3, 0.2).unwrap());
        assert!(seg.probability().is_none());
        assert_eq!(seg.mask().width(), 6);
        let report = seg.compute(&two_seed_strokes());
        assert_eq!((report.width, report.height), (6, 3));
        let field = seg.probability().unwrap();
        assert_eq!(field.as_slice().len(), 18);
    }

    #[test]
    fn invalid_params_rejected_and_kept() {
        let img = GrayscaleImage::uniform(4, 4, 0.5).unwrap();
        let bad = Parameters {
            dt: -0.1,
            ..Default::default()
        };
        assert!(Segmenter::new(img.clone(), bad).is_err());
        let mut seg = Segmenter::new(img, Parameters::default()).unwrap();
        assert!(seg.set_params(bad).is_err());
        assert_eq!(seg.params().dt, 0.01);
    }
}
