// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SegmentationError};

/// Tunable parameters for the 1D propagation and 2D ADI stages.
///
/// Passed by value into the [`Initializer`](crate::initializer::Initializer)
/// and [`Solver`](crate::solver::Solver), so several segmentations with
/// different settings can run side by side.
///
/// Unknown JSON fields are rejected; missing fields take their defaults.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Parameters {
    /// Number of 1D row/column propagation iterations.
    pub max_iterations_1d: usize,
    /// Gradient penalty in the 1D systems.
    pub gamma_1d: f64,
    /// Seed attachment strength in the 1D systems.
    pub lambda_1d: f64,
    /// 1D solution value at or above which an unlabeled pixel becomes foreground.
    pub fore_threshold: f64,
    /// Number of 2D ADI iterations (one row sweep plus one column sweep each).
    pub max_iterations_2d: usize,
    /// Gradient penalty in the 2D systems.
    pub gamma_2d: f64,
    /// Seed attachment strength in the 2D systems.
    pub lambda_2d: f64,
    /// Implicit time-step damping on the 2D diagonal.
    pub dt: f64,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            max_iterations_1d: 10,
            gamma_1d: 0.2,
            lambda_1d: 100.0,
            fore_threshold: 0.6,
            max_iterations_2d: 10,
            gamma_2d: 0.0006,
            lambda_2d: 100.0,
            dt: 0.01,
        }
    }
}

impl Parameters {
    /// Check that every real-valued parameter is finite and non-negative.
    ///
    /// # Errors
    /// Returns [`SegmentationError::InvalidParameter`] naming the first
    /// offending field.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("gamma_1d", self.gamma_1d),
            ("lambda_1d", self.lambda_1d),
            ("fore_threshold", self.fore_threshold),
            ("gamma_2d", self.gamma_2d),
            ("lambda_2d", self.lambda_2d),
            ("dt", self.dt),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(SegmentationError::InvalidParameter { name, value });
            }
        }
        Ok(())
    }

    /// Parse and validate parameters from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let params: Parameters = serde_json::from_str(json)?;
        params.validate()?;
        Ok(params)
    }

    /// Load and validate parameters from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Self::from_json(&data).map_err(|e| match e {
            SegmentationError::Parse(msg) => {
                SegmentationError::Parse(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Set the number of 1D iterations (builder method).
    pub fn with_iterations_1d(mut self, iterations: usize) -> Self {
        self.max_iterations_1d = iterations;
        self
    }

    /// Set the number of 2D iterations (builder method).
    pub fn with_iterations_2d(mut self, iterations: usize) -> Self {
        self.max_iterations_2d = iterations;
        self
    }
}
