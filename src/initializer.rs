// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::time::Instant;

use log::debug;

use crate::fields::{GradientField, WeightField};
use crate::mask::{Label, LabelMask};
use crate::params::Parameters;
use crate::solver::{SolveProgress, Stage};
use crate::tridiag::TridiagonalSystem;

/// Outcome of a full 1D propagation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PropagationReport {
    /// Iterations executed.
    pub iterations: usize,
    /// Pixels promoted to foreground across all iterations.
    pub promoted: usize,
    /// Foreground pixels after the run.
    pub foreground: usize,
}

/// Grows foreground seeds along rows and columns with independent 1D solves.
///
/// Each row (then column) holding at least one foreground pixel is solved
/// once per iteration; unlabeled pixels whose solution reaches
/// `fore_threshold` become foreground. Background is never touched, so the
/// foreground set only grows.
pub struct Initializer {
    params: Parameters,
    width: usize,
    height: usize,
    system: TridiagonalSystem,
}

impl Initializer {
    /// Create an initializer for `width x height` grids.
    pub fn new(width: usize, height: usize, params: Parameters) -> Self {
        Initializer {
            params,
            width,
            height,
            system: TridiagonalSystem::new(width.max(height)),
        }
    }

    /// Current parameters.
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Replace the parameters used by subsequent runs.
    pub fn set_params(&mut self, params: Parameters) {
        self.params = params;
    }

    /// Resize the line workspace for a new grid.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        if self.system.capacity() != width.max(height) {
            self.system = TridiagonalSystem::new(width.max(height));
        }
    }

    /// Run `max_iterations_1d` propagation iterations on `mask`.
    ///
    /// # Panics
    /// Panics if the mask or fields do not match the initializer's grid.
    pub fn run(
        &mut self,
        mask: &mut LabelMask,
        weights: &WeightField,
        grad: &GradientField,
        progress: Option<&(dyn Fn(SolveProgress) + Sync)>,
    ) -> PropagationReport {
        let start = Instant::now();
        let mut promoted = 0;
        for iteration in 0..self.params.max_iterations_1d {
            let changed = self.iterate(mask, weights, grad);
            promoted += changed;
            debug!(
                "1D iteration {}: promoted {} pixels (foreground={})",
                iteration,
                changed,
                mask.count_foreground()
            );
            if let Some(cb) = progress {
                cb(SolveProgress {
                    stage: Stage::Propagation,
                    iteration,
                    elapsed: start.elapsed(),
                });
            }
        }
        PropagationReport {
            iterations: self.params.max_iterations_1d,
            promoted,
            foreground: mask.count_foreground(),
        }
    }

    /// One row pass followed by one column pass. Returns the number of
    /// pixels promoted.
    ///
    /// # Panics
    /// Panics if the mask or fields do not match the initializer's grid.
    pub fn iterate(
        &mut self,
        mask: &mut LabelMask,
        weights: &WeightField,
        grad: &GradientField,
    ) -> usize {
        let (w, h) = (self.width, self.height);
        assert!(
            mask.width() == w && mask.height() == h,
            "mask is {}x{}, initializer expects {}x{}",
            mask.width(),
            mask.height(),
            w,
            h
        );
        assert!(
            weights.width() == w && weights.height() == h,
            "weight field is {}x{}, initializer expects {}x{}",
            weights.width(),
            weights.height(),
            w,
            h
        );
        assert!(
            grad.width() == w && grad.height() == h,
            "gradient field is {}x{}, initializer expects {}x{}",
            grad.width(),
            grad.height(),
            w,
            h
        );

        let mut promoted = 0;

        for y in 0..h {
            let row = &mask.as_slice()[y * w..(y + 1) * w];
            if !row.iter().any(|l| l.is_foreground()) {
                continue;
            }
            self.build_line(
                w,
                |x| weights.wx(x, y),
                |x| grad.get(x, y),
                |x| mask.get(x, y),
            );
            let threshold = self.params.fore_threshold;
            let solution = self.system.solve(w);
            for (x, &v) in solution.iter().enumerate() {
                if v >= threshold && mask.promote(x, y) {
                    promoted += 1;
                }
            }
        }

        for x in 0..w {
            if !(0..h).any(|y| mask.get(x, y).is_foreground()) {
                continue;
            }
            self.build_line(
                h,
                |y| weights.wy(x, y),
                |y| grad.get(x, y),
                |y| mask.get(x, y),
            );
            let threshold = self.params.fore_threshold;
            let solution = self.system.solve(h);
            for (y, &v) in solution.iter().enumerate() {
                if v >= threshold && mask.promote(x, y) {
                    promoted += 1;
                }
            }
        }

        promoted
    }

    /// Fill the workspace with the `n`-row system of one line.
    ///
    /// `weight(i)` couples samples `i` and `i + 1`.
    fn build_line(
        &mut self,
        n: usize,
        weight: impl Fn(usize) -> f64,
        grad: impl Fn(usize) -> f64,
        label: impl Fn(usize) -> Label,
    ) {
        let lambda = self.params.lambda_1d;
        let gamma = self.params.gamma_1d;
        let sys = &mut self.system;

        for i in 1..n - 1 {
            let l = label(i);
            sys.a[i] = -weight(i - 1);
            sys.c[i] = -weight(i);
            sys.b[i] = -(sys.a[i] + sys.c[i])
                + if l.is_seed() { lambda } else { 0.0 }
                + gamma * grad(i);
            sys.d[i] = if l.is_foreground() { lambda } else { 0.0 };
        }

        // One-sided closures; c[0] equals the first interior a.
        sys.a[0] = -1.0;
        sys.c[0] = -weight(0);
        sys.b[0] = -(sys.a[0] + sys.c[0]);

        sys.a[n - 1] = -weight(n - 2);
        sys.c[n - 1] = -1.0;
        sys.b[n - 1] = -(sys.a[n - 1] + sys.c[n - 1]);

        sys.d[0] = 0.0;
        sys.d[n - 1] = 0.0;
    }
}
