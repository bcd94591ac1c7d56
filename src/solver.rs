// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::time::{Duration, Instant};

use log::debug;
use rayon::prelude::*;

use crate::error::{Result, SegmentationError};
use crate::fields::{GradientField, WeightField};
use crate::mask::{Label, LabelMask};
use crate::params::Parameters;
use crate::tridiag::TridiagonalSystem;

/// Pipeline stage reported through progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// 1D row/column seed propagation.
    Propagation,
    /// 2D ADI diffusion.
    Diffusion,
}

/// Progress information passed to the optional callback.
#[derive(Debug, Clone, Copy)]
pub struct SolveProgress {
    /// Stage that just finished an iteration.
    pub stage: Stage,
    /// Zero-based iteration index within the stage.
    pub iteration: usize,
    /// Elapsed time since the stage started.
    pub elapsed: Duration,
}

/// Dense per-pixel foreground confidence.
///
/// Values are not clamped; they may fall slightly outside `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityField {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl ProbabilityField {
    fn zeros(width: usize, height: usize) -> Self {
        ProbabilityField {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Wrap a row-major buffer.
    ///
    /// # Errors
    /// Returns [`SegmentationError::ShapeMismatch`] if `data.len()` is not
    /// `width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<f64>) -> Result<Self> {
        if data.len() != width * height {
            return Err(SegmentationError::ShapeMismatch {
                expected: [width, height],
                got: data.len(),
            });
        }
        Ok(ProbabilityField {
            width,
            height,
            data,
        })
    }

    /// Field width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Field height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Confidence at `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    /// Row-major confidences.
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Consume the field and return its row-major buffer.
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Per-pixel foreground decision `p > threshold`.
    pub fn binarize(&self, threshold: f64) -> Vec<bool> {
        self.data.iter().map(|&p| p > threshold).collect()
    }

    /// Pixels whose thresholded label differs from at least one 4-neighbour.
    pub fn boundary(&self, threshold: f64) -> Vec<bool> {
        let (w, h) = (self.width, self.height);
        let inside = self.binarize(threshold);
        let mut edge = vec![false; w * h];
        edge.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                let k = y * w + x;
                let here = inside[k];
                *cell = (x > 0 && inside[k - 1] != here)
                    || (x + 1 < w && inside[k + 1] != here)
                    || (y > 0 && inside[k - w] != here)
                    || (y + 1 < h && inside[k + w] != here);
            }
        });
        edge
    }
}

/// Direction of the implicit solve in one ADI half-step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    /// One system per image row, implicit in x.
    Rows,
    /// One system per image column, implicit in y.
    Columns,
}

/// All inputs of one ADI half-step, shared read-only by every line.
///
/// Lines are numbered along the explicit axis; positions within a line run
/// along the implicit axis. Backends write each line's solution into
/// `out[line * line_len()..(line + 1) * line_len()]`.
pub struct LineSweep<'a> {
    axis: Axis,
    width: usize,
    height: usize,
    along: &'a [f64],
    across: &'a [f64],
    grad: &'a [f64],
    labels: &'a [Label],
    prev: &'a [f64],
    params: &'a Parameters,
}

impl LineSweep<'_> {
    /// Unknowns per line.
    pub fn line_len(&self) -> usize {
        match self.axis {
            Axis::Rows => self.width,
            Axis::Columns => self.height,
        }
    }

    /// Independent lines in the sweep.
    pub fn num_lines(&self) -> usize {
        match self.axis {
            Axis::Rows => self.height,
            Axis::Columns => self.width,
        }
    }

    #[inline]
    fn index(&self, line: usize, i: usize) -> usize {
        match self.axis {
            Axis::Rows => line * self.width + i,
            Axis::Columns => i * self.width + line,
        }
    }

    /// Row-major offsets to the next pixel along and across the line.
    #[inline]
    fn strides(&self) -> (usize, usize) {
        match self.axis {
            Axis::Rows => (1, self.width),
            Axis::Columns => (self.width, 1),
        }
    }

    /// Build and solve the system of `line`, writing the solution to `out`.
    ///
    /// `sys` must hold at least `line_len()` rows.
    pub fn solve_line(&self, line: usize, sys: &mut TridiagonalSystem, out: &mut [f64]) {
        let n = self.line_len();
        let last_line = self.num_lines() - 1;
        let (step, cross) = self.strides();
        let p = self.params;
        let prev = self.prev;

        for i in 0..n {
            let k = self.index(line, i);
            let label = self.labels[k];

            let (a, c, b) = if i == 0 {
                let (a, c) = (-1.0, -self.along[k]);
                (a, c, -(a + c))
            } else if i == n - 1 {
                let (a, c) = (-self.along[k - step], -1.0);
                (a, c, -(a + c))
            } else {
                let (a, c) = (-self.along[k - step], -self.along[k]);
                let seed = if label.is_seed() { p.lambda_2d } else { 0.0 };
                (a, c, -(a + c) + p.gamma_2d * self.grad[k] + seed + p.dt)
            };

            let explicit = if line == 0 {
                let (a, c) = (-1.0, -self.across[k]);
                prev[k] * -(a + c) + prev[k + cross] * c
            } else if line == last_line {
                let (a, c) = (-self.across[k - cross], -1.0);
                prev[k - cross] * a + prev[k] * -(a + c)
            } else {
                let (a, c) = (-self.across[k - cross], -self.across[k]);
                prev[k - cross] * a + prev[k] * -(a + c) + prev[k + cross] * c
            };
            let source = if label.is_foreground() { p.lambda_2d } else { 0.0 };

            sys.a[i] = a;
            sys.b[i] = b;
            sys.c[i] = c;
            sys.d[i] = source - explicit + prev[k] * p.dt;
        }

        out.copy_from_slice(sys.solve(n));
    }
}

/// Executes the independent line systems of one sweep.
///
/// Implementations may solve lines in any order or in parallel, but every
/// line must be solved exactly as [`LineSweep::solve_line`] does so that all
/// backends produce the same field.
pub trait SweepBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Solve every line of `sweep` into the line-major buffer `out`.
    fn run(&self, sweep: &LineSweep<'_>, out: &mut [f64]);
}

/// Solves lines one after another on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialBackend;

impl SweepBackend for SerialBackend {
    fn name(&self) -> &'static str {
        "serial"
    }

    fn run(&self, sweep: &LineSweep<'_>, out: &mut [f64]) {
        let n = sweep.line_len();
        let mut sys = TridiagonalSystem::new(n);
        for (line, chunk) in out.chunks_mut(n).enumerate() {
            sweep.solve_line(line, &mut sys, chunk);
        }
    }
}

/// Solves lines in parallel on a rayon pool.
///
/// Uses the global pool unless built with [`with_threads`](Self::with_threads).
#[derive(Default)]
pub struct RayonBackend {
    pool: Option<rayon::ThreadPool>,
}

impl RayonBackend {
    /// Backend on the global rayon pool.
    pub fn new() -> Self {
        RayonBackend { pool: None }
    }

    /// Backend on a dedicated pool of `threads` workers.
    ///
    /// # Errors
    /// Returns an error if `threads` is zero or the pool cannot be built.
    pub fn with_threads(threads: usize) -> Result<Self> {
        if threads == 0 {
            return Err(SegmentationError::InvalidParameter {
                name: "threads",
                value: 0.0,
            });
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|e| SegmentationError::Other(e.to_string()))?;
        Ok(RayonBackend { pool: Some(pool) })
    }

    /// Worker count of the pool in use.
    pub fn num_threads(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}

impl SweepBackend for RayonBackend {
    fn name(&self) -> &'static str {
        "rayon"
    }

    fn run(&self, sweep: &LineSweep<'_>, out: &mut [f64]) {
        match &self.pool {
            Some(pool) => pool.install(|| solve_lines_parallel(sweep, out)),
            None => solve_lines_parallel(sweep, out),
        }
    }
}

fn solve_lines_parallel(sweep: &LineSweep<'_>, out: &mut [f64]) {
    let n = sweep.line_len();
    out.par_chunks_mut(n).enumerate().for_each_init(
        || TridiagonalSystem::new(n),
        |sys, (line, chunk)| sweep.solve_line(line, sys, chunk),
    );
}

/// 2D ADI diffusion of the seed mask into a probability field.
///
/// Owns the field, the previous-iteration snapshot and the column scratch
/// buffer, all sized once per grid and reused across solves.
pub struct Solver {
    params: Parameters,
    width: usize,
    height: usize,
    backend: Box<dyn SweepBackend>,
    field: ProbabilityField,
    prev: Vec<f64>,
    scratch: Vec<f64>,
}

impl Solver {
    /// Create a solver for `width x height` grids on the global rayon pool.
    pub fn new(width: usize, height: usize, params: Parameters) -> Self {
        Solver {
            params,
            width,
            height,
            backend: Box::new(RayonBackend::new()),
            field: ProbabilityField::zeros(width, height),
            prev: vec![0.0; width * height],
            scratch: vec![0.0; width * height],
        }
    }

    /// Replace the sweep backend (builder method).
    pub fn with_backend(mut self, backend: Box<dyn SweepBackend>) -> Self {
        self.backend = backend;
        self
    }

    /// Replace the sweep backend in place.
    pub fn set_backend(&mut self, backend: Box<dyn SweepBackend>) {
        self.backend = backend;
    }

    /// Name of the active backend.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Current parameters.
    pub fn params(&self) -> &Parameters {
        &self.params
    }

    /// Replace the parameters used by subsequent solves.
    pub fn set_params(&mut self, params: Parameters) {
        self.params = params;
    }

    /// Resize all buffers for a new grid, reusing allocations where possible.
    pub fn resize(&mut self, width: usize, height: usize) {
        if (width, height) == (self.width, self.height) {
            return;
        }
        self.width = width;
        self.height = height;
        let n = width * height;
        self.field.width = width;
        self.field.height = height;
        self.field.data.clear();
        self.field.data.resize(n, 0.0);
        self.prev.resize(n, 0.0);
        self.scratch.resize(n, 0.0);
    }

    /// Field produced by the last solve.
    pub fn field(&self) -> &ProbabilityField {
        &self.field
    }

    /// Consume the solver and return its field.
    pub fn into_field(self) -> ProbabilityField {
        self.field
    }

    /// Run `max_iterations_2d` ADI iterations from the seeds in `mask`.
    ///
    /// `weights` should be computed with [`BETA_2D`](crate::fields::BETA_2D).
    ///
    /// # Panics
    /// Panics if the mask or fields do not match the solver's grid.
    pub fn solve(
        &mut self,
        mask: &LabelMask,
        weights: &WeightField,
        grad: &GradientField,
        progress: Option<&(dyn Fn(SolveProgress) + Sync)>,
    ) -> &ProbabilityField {
        let (w, h) = (self.width, self.height);
        assert!(
            mask.width() == w && mask.height() == h,
            "mask is {}x{}, solver expects {}x{}",
            mask.width(),
            mask.height(),
            w,
            h
        );
        assert!(
            weights.width() == w && weights.height() == h,
            "weight field is {}x{}, solver expects {}x{}",
            weights.width(),
            weights.height(),
            w,
            h
        );
        assert!(
            grad.width() == w && grad.height() == h,
            "gradient field is {}x{}, solver expects {}x{}",
            grad.width(),
            grad.height(),
            w,
            h
        );

        let start = Instant::now();
        let labels = mask.as_slice();
        for (u, label) in self.field.data.iter_mut().zip(labels) {
            *u = if label.is_foreground() { 1.0 } else { 0.0 };
        }
        self.prev.copy_from_slice(&self.field.data);

        for iteration in 0..self.params.max_iterations_2d {
            let rows = LineSweep {
                axis: Axis::Rows,
                width: w,
                height: h,
                along: weights.horizontal(),
                across: weights.vertical(),
                grad: grad.as_slice(),
                labels,
                prev: &self.prev,
                params: &self.params,
            };
            self.backend.run(&rows, &mut self.field.data);
            self.prev.copy_from_slice(&self.field.data);

            let columns = LineSweep {
                axis: Axis::Columns,
                width: w,
                height: h,
                along: weights.vertical(),
                across: weights.horizontal(),
                grad: grad.as_slice(),
                labels,
                prev: &self.prev,
                params: &self.params,
            };
            self.backend.run(&columns, &mut self.scratch);
            transpose_into(&self.scratch, &mut self.field.data, w, h);
            self.prev.copy_from_slice(&self.field.data);

            debug!(
                "2D iteration {} ({}): {:.2?} elapsed",
                iteration,
                self.backend.name(),
                start.elapsed()
            );
            if let Some(cb) = progress {
                cb(SolveProgress {
                    stage: Stage::Diffusion,
                    iteration,
                    elapsed: start.elapsed(),
                });
            }
        }

        &self.field
    }
}

/// Copy the column-major `src` (`src[x * h + y]`) into row-major `dst`.
fn transpose_into(src: &[f64], dst: &mut [f64], w: usize, h: usize) {
    dst.par_chunks_mut(w).enumerate().for_each(|(y, row)| {
        for (x, v) in row.iter_mut().enumerate() {
            *v = src[x * h + y];
        }
    });
}
