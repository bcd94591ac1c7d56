// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::io::Write;
use std::path::Path;

use log::debug;
use ndarray::{Array2, ShapeBuilder};

use crate::error::{Result, SegmentationError};
use crate::grayscale::GrayscaleImage;
use crate::mask::SeedStrokes;
use crate::solver::ProbabilityField;

/// MAT variable read by [`load_image`].
pub const MAT_IMAGE_VARIABLE: &str = "image";
/// MAT variable written by [`save_probability`].
pub const MAT_PROBABILITY_VARIABLE: &str = "probability";

/// File formats recognized by extension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileFormat {
    /// NumPy `.npy` array.
    Npy,
    /// MATLAB Level 5 `.mat` file.
    Mat,
    /// Raster image (`.png`, `.jpg`, `.jpeg`).
    Raster,
}

/// Infer the file format from the path extension (case-insensitive).
pub fn infer_format(path: &Path) -> Result<FileFormat> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("npy") => Ok(FileFormat::Npy),
        Some("mat") => Ok(FileFormat::Mat),
        Some("png" | "jpg" | "jpeg") => Ok(FileFormat::Raster),
        Some(ext) => Err(SegmentationError::UnsupportedFileFormat(ext.to_string())),
        None => Err(SegmentationError::UnsupportedFileFormat(
            "(no extension)".to_string(),
        )),
    }
}

/// Load a grayscale image; the format is inferred from the extension.
///
/// Raster images are converted to luma. `.npy` files hold a 2D `[height,
/// width]` float array and `.mat` files a variable named `image`; both must
/// already lie in `[0, 1]`.
pub fn load_image(path: &Path) -> Result<GrayscaleImage> {
    let image = match infer_format(path)? {
        FileFormat::Raster => {
            let rgb = image::open(path)?.to_rgb8();
            let (w, h) = rgb.dimensions();
            GrayscaleImage::from_rgb8(w as usize, h as usize, rgb.as_raw())?
        }
        FileFormat::Npy => load_npy_image(path)?,
        FileFormat::Mat => load_mat_image(path, MAT_IMAGE_VARIABLE)?,
    };
    debug!(
        "loaded {}x{} image from {}",
        image.width(),
        image.height(),
        path.display()
    );
    Ok(image)
}

/// Load a 2D intensity array from a .npy file (f64, or f32 promoted).
pub fn load_npy_image(path: &Path) -> Result<GrayscaleImage> {
    let arr: Array2<f64> = match ndarray_npy::read_npy(path) {
        Ok(a) => a,
        Err(_) => {
            let arr32: Array2<f32> = ndarray_npy::read_npy(path)
                .map_err(|e| SegmentationError::UnsupportedDtype(format!("{}", e)))?;
            arr32.mapv(|v| v as f64)
        }
    };
    let (h, w) = arr.dim();
    // Fortran-order files would otherwise yield column-major data.
    let data = arr.as_standard_layout().to_owned().into_raw_vec();
    GrayscaleImage::new(w, h, data)
}

/// Load a 2D intensity array stored as `variable_name` in a .mat file.
pub fn load_mat_image(path: &Path, variable_name: &str) -> Result<GrayscaleImage> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let mat = matfile::MatFile::parse(&mut reader)
        .map_err(|e| SegmentationError::Other(format!("MAT parse error: {}", e)))?;

    let available: Vec<String> = mat.arrays().iter().map(|a| a.name().to_string()).collect();
    let array = mat
        .find_by_name(variable_name)
        .ok_or_else(|| SegmentationError::MatVariableNotFound {
            expected: variable_name.to_string(),
            available,
        })?;

    let data: Vec<f64> = match array.data() {
        matfile::NumericData::Double { real, imag: _ } => real.clone(),
        matfile::NumericData::Single { real, imag: _ } => real.iter().map(|&v| v as f64).collect(),
        _ => {
            return Err(SegmentationError::UnsupportedDtype(
                "MAT file array is not f64 or f32".to_string(),
            ))
        }
    };

    let size = array.size();
    if size.len() != 2 {
        return Err(SegmentationError::UnsupportedDtype(format!(
            "MAT variable '{}' has {} dimensions, expected 2",
            variable_name,
            size.len()
        )));
    }
    let (h, w) = (size[0], size[1]);
    if data.len() != w * h {
        return Err(SegmentationError::ShapeMismatch {
            expected: [w, h],
            got: data.len(),
        });
    }

    // MAT stores column-major.
    let arr = Array2::from_shape_vec((h, w).f(), data)
        .map_err(|e| SegmentationError::Other(format!("shape error: {}", e)))?;
    GrayscaleImage::new(w, h, arr.as_standard_layout().to_owned().into_raw_vec())
}

/// Load seed strokes from JSON.
pub fn load_strokes(path: &Path) -> Result<SeedStrokes> {
    let file = std::fs::File::open(path)?;
    let strokes: SeedStrokes = serde_json::from_reader(std::io::BufReader::new(file))
        .map_err(|e| SegmentationError::Parse(format!("{}: {}", path.display(), e)))?;
    debug!(
        "loaded {} foreground / {} background strokes from {}",
        strokes.foreground.len(),
        strokes.background.len(),
        path.display()
    );
    Ok(strokes)
}

/// Save a probability field; the format is inferred from the extension.
///
/// `.npy` writes a `[height, width]` f64 array, `.mat` a variable named
/// `probability`, and raster extensions an 8-bit preview.
pub fn save_probability(field: &ProbabilityField, path: &Path) -> Result<()> {
    match infer_format(path)? {
        FileFormat::Npy => save_npy(field, path),
        FileFormat::Mat => save_mat(field, path, MAT_PROBABILITY_VARIABLE),
        FileFormat::Raster => save_probability_png(field, path),
    }
}

/// Save a probability field to a .npy file with shape `[height, width]`.
pub fn save_npy(field: &ProbabilityField, path: &Path) -> Result<()> {
    let arr = Array2::from_shape_vec((field.height(), field.width()), field.as_slice().to_vec())
        .map_err(|e| SegmentationError::Other(format!("shape error: {}", e)))?;
    ndarray_npy::write_npy(path, &arr)
        .map_err(|e| SegmentationError::Other(format!("npy write error: {}", e)))?;
    Ok(())
}

/// Save a probability field to a MATLAB Level 5 .mat file as `var_name`.
pub fn save_mat(field: &ProbabilityField, path: &Path, var_name: &str) -> Result<()> {
    let (w, h) = (field.width(), field.height());
    let arr = Array2::from_shape_vec((h, w), field.as_slice().to_vec())
        .map_err(|e| SegmentationError::Other(format!("shape error: {}", e)))?;
    let col_major: Vec<f64> = arr.t().as_standard_layout().to_owned().into_raw_vec();
    write_mat_level5(path, var_name, &[h, w], &col_major)
}

/// Write a single real double matrix as an uncompressed Level 5 MAT file.
///
/// `data` must be column-major.
fn write_mat_level5(path: &Path, var_name: &str, dimensions: &[usize], data: &[f64]) -> Result<()> {
    let file = std::fs::File::create(path)?;
    let mut w = std::io::BufWriter::new(file);

    // 128-byte header: text, subsystem offset, version, endian indicator.
    let desc = b"MATLAB 5.0 MAT-file, created by seedseg";
    let mut header_text = [b' '; 116];
    header_text[..desc.len()].copy_from_slice(desc);
    w.write_all(&header_text)?;
    w.write_all(&[0u8; 8])?;
    w.write_all(&0x0100u16.to_le_bytes())?;
    w.write_all(b"IM")?;

    let flags_total = 16u32;
    let (dims_size, dims_total) = padded(dimensions.len() * 4);
    let name = var_name.as_bytes();
    let (name_size, name_total) = padded(name.len());
    let (real_size, real_total) = padded(data.len() * 8);
    let matrix_size = flags_total + dims_total + name_total + real_total;

    write_tag(&mut w, 14, matrix_size)?; // miMATRIX

    write_tag(&mut w, 6, 8)?; // miUINT32 array flags
    w.write_all(&6u32.to_le_bytes())?; // mxDOUBLE_CLASS
    w.write_all(&0u32.to_le_bytes())?;

    write_tag(&mut w, 5, dims_size)?; // miINT32 dimensions
    for &d in dimensions {
        w.write_all(&(d as i32).to_le_bytes())?;
    }
    write_padding(&mut w, dims_size, dims_total)?;

    write_tag(&mut w, 1, name_size)?; // miINT8 name
    w.write_all(name)?;
    write_padding(&mut w, name_size, name_total)?;

    write_tag(&mut w, 9, real_size)?; // miDOUBLE real part
    for &val in data {
        w.write_all(&val.to_le_bytes())?;
    }
    write_padding(&mut w, real_size, real_total)?;

    w.flush()?;
    Ok(())
}

/// Payload size and the tagged element size rounded up to 8 bytes.
fn padded(bytes: usize) -> (u32, u32) {
    let size = bytes as u32;
    (size, 8 + size.div_ceil(8) * 8)
}

fn write_tag(w: &mut impl Write, data_type: u32, size: u32) -> std::io::Result<()> {
    w.write_all(&data_type.to_le_bytes())?;
    w.write_all(&size.to_le_bytes())
}

fn write_padding(w: &mut impl Write, size: u32, total: u32) -> std::io::Result<()> {
    let pad = (total - 8 - size) as usize;
    if pad > 0 {
        w.write_all(&vec![0u8; pad])?;
    }
    Ok(())
}

fn to_u8(v: f64) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Save an 8-bit grayscale preview of the field, clamped to `[0, 1]`.
pub fn save_probability_png(field: &ProbabilityField, path: &Path) -> Result<()> {
    let buf: Vec<u8> = field.as_slice().iter().map(|&p| to_u8(p)).collect();
    let img = image::GrayImage::from_raw(field.width() as u32, field.height() as u32, buf)
        .ok_or_else(|| SegmentationError::Other("preview buffer size mismatch".to_string()))?;
    img.save(path)?;
    Ok(())
}

/// Save `image` with the `threshold` boundary of `field` drawn in red.
pub fn save_overlay_png(
    image: &GrayscaleImage,
    field: &ProbabilityField,
    threshold: f64,
    path: &Path,
) -> Result<()> {
    if (image.width(), image.height()) != (field.width(), field.height()) {
        return Err(SegmentationError::ShapeMismatch {
            expected: [image.width(), image.height()],
            got: field.as_slice().len(),
        });
    }
    let edge = field.boundary(threshold);
    let mut buf = Vec::with_capacity(edge.len() * 3);
    for (&gray, &on_edge) in image.as_slice().iter().zip(&edge) {
        if on_edge {
            buf.extend_from_slice(&[255, 0, 0]);
        } else {
            let g = to_u8(gray);
            buf.extend_from_slice(&[g, g, g]);
        }
    }
    let img = image::RgbImage::from_raw(image.width() as u32, image.height() as u32, buf)
        .ok_or_else(|| SegmentationError::Other("overlay buffer size mismatch".to_string()))?;
    img.save(path)?;
    Ok(())
}
