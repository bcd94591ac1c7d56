// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::fmt;

/// Errors that can occur while building segmentation inputs, loading files,
/// or configuring the solver.
#[derive(Debug)]
pub enum SegmentationError {
    /// Image dimension is too small to build a tridiagonal system.
    InvalidDimensions {
        /// The axis index (0 = width, 1 = height).
        axis: usize,
        /// The size provided.
        size: usize,
    },
    /// Buffer length does not match the image dimensions.
    ShapeMismatch {
        /// The expected `[width, height]`.
        expected: [usize; 2],
        /// The number of elements actually supplied.
        got: usize,
    },
    /// Intensity value is not finite or lies outside `[0, 1]`.
    InvalidIntensity {
        /// The flat row-major index of the invalid value.
        index: usize,
        /// The invalid value.
        value: f64,
    },
    /// A solver parameter is out of its valid range.
    InvalidParameter {
        /// The parameter name.
        name: &'static str,
        /// The invalid value.
        value: f64,
    },
    /// Unsupported data type in file.
    UnsupportedDtype(String),
    /// Unsupported file format (unrecognized extension).
    UnsupportedFileFormat(String),
    /// Expected MAT variable not found in file.
    MatVariableNotFound {
        /// The variable name that was requested.
        expected: String,
        /// The variable names that are available.
        available: Vec<String>,
    },
    /// A JSON document (strokes or parameters) could not be parsed.
    Parse(String),
    /// Image decoding or encoding failed.
    Image(image::ImageError),
    /// I/O error occurred.
    IoError(std::io::Error),
    /// Other error with a descriptive message.
    Other(String),
}

impl fmt::Display for SegmentationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SegmentationError::InvalidDimensions { axis, size } => {
                write!(
                    f,
                    "invalid image dimensions: axis {} has size {} (must be >= 2)",
                    axis, size
                )
            }
            SegmentationError::ShapeMismatch { expected, got } => {
                write!(
                    f,
                    "shape mismatch: expected {}x{} = {} values, got {}",
                    expected[0],
                    expected[1],
                    expected[0] * expected[1],
                    got
                )
            }
            SegmentationError::InvalidIntensity { index, value } => {
                write!(
                    f,
                    "invalid intensity at index {}: {} (must be finite and within [0, 1])",
                    index, value
                )
            }
            SegmentationError::InvalidParameter { name, value } => {
                write!(
                    f,
                    "invalid parameter {}: {} (must be finite and non-negative)",
                    name, value
                )
            }
            SegmentationError::UnsupportedDtype(dtype) => {
                write!(f, "unsupported dtype: {}", dtype)
            }
            SegmentationError::UnsupportedFileFormat(ext) => {
                write!(f, "unsupported file format: {}", ext)
            }
            SegmentationError::MatVariableNotFound {
                expected,
                available,
            } => {
                write!(
                    f,
                    "MAT variable '{}' not found; available variables: {:?}",
                    expected, available
                )
            }
            SegmentationError::Parse(msg) => write!(f, "parse error: {}", msg),
            SegmentationError::Image(e) => write!(f, "image error: {}", e),
            SegmentationError::IoError(e) => write!(f, "I/O error: {}", e),
            SegmentationError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SegmentationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SegmentationError::IoError(e) => Some(e),
            SegmentationError::Image(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SegmentationError {
    fn from(e: std::io::Error) -> Self {
        SegmentationError::IoError(e)
    }
}

impl From<image::ImageError> for SegmentationError {
    fn from(e: image::ImageError) -> Self {
        SegmentationError::Image(e)
    }
}

impl From<serde_json::Error> for SegmentationError {
    fn from(e: serde_json::Error) -> Self {
        SegmentationError::Parse(e.to_string())
    }
}

/// Convenience type alias for Results with SegmentationError.
pub type Result<T> = std::result::Result<T, SegmentationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_dimensions() {
        let e = SegmentationError::InvalidDimensions { axis: 1, size: 1 };
        assert_eq!(
            e.to_string(),
            "invalid image dimensions: axis 1 has size 1 (must be >= 2)"
        );
    }

    #[test]
    fn display_shape_mismatch() {
        let e = SegmentationError::ShapeMismatch {
            expected: [4, 3],
            got: 10,
        };
        assert_eq!(
            e.to_string(),
            "shape mismatch: expected 4x3 = 12 values, got 10"
        );
    }

    #[test]
    fn display_invalid_intensity() {
        let e = SegmentationError::InvalidIntensity {
            index: 7,
            value: 1.5,
        };
        assert_eq!(
            e.to_string(),
            "invalid intensity at index 7: 1.5 (must be finite and within [0, 1])"
        );
    }

    #[test]
    fn display_invalid_parameter() {
        let e = SegmentationError::InvalidParameter {
            name: "dt",
            value: -0.5,
        };
        assert_eq!(
            e.to_string(),
            "invalid parameter dt: -0.5 (must be finite and non-negative)"
        );
    }

    #[test]
    fn display_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let e = SegmentationError::IoError(io_err);
        assert!(e.to_string().contains("file not found"));
    }

    #[test]
    fn from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let e: SegmentationError = io_err.into();
        assert!(matches!(e, SegmentationError::IoError(_)));
    }

    #[test]
    fn from_json_error() {
        let err = serde_json::from_str::<Vec<f64>>("[1.0,").unwrap_err();
        let e: SegmentationError = err.into();
        assert!(matches!(e, SegmentationError::Parse(_)));
        assert!(e.to_string().starts_with("parse error:"));
    }

    #[test]
    fn display_mat_variable_not_found() {
        let e = SegmentationError::MatVariableNotFound {
            expected: "image".to_string(),
            available: vec!["probability".to_string()],
        };
        assert!(e.to_string().contains("image"));
        assert!(e.to_string().contains("probability"));
    }
}
