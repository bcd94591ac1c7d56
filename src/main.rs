// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;

use seedseg::io;
use seedseg::{Parameters, RayonBackend, SerialBackend, SolveProgress, Stage, Segmenter};

#[derive(Parser)]
#[command(name = "seedseg", about = "Seeded two-label image segmentation")]
struct Cli {
    /// Input image (.png, .jpg, .npy or .mat)
    #[arg(short = 'i', long)]
    image: PathBuf,

    /// Seed strokes as JSON: {"foreground": [[[x, y], ...]], "background": [...]}
    #[arg(short = 's', long)]
    strokes: PathBuf,

    /// JSON parameter file; individual flags below override it
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Number of 1D propagation iterations
    #[arg(long)]
    iterations_1d: Option<usize>,

    /// Gradient penalty in the 1D stage
    #[arg(long)]
    gamma_1d: Option<f64>,

    /// Seed attachment in the 1D stage
    #[arg(long)]
    lambda_1d: Option<f64>,

    /// 1D value at which unlabeled pixels become foreground
    #[arg(long)]
    fore_threshold: Option<f64>,

    /// Number of 2D ADI iterations
    #[arg(long)]
    iterations_2d: Option<usize>,

    /// Gradient penalty in the 2D stage
    #[arg(long)]
    gamma_2d: Option<f64>,

    /// Seed attachment in the 2D stage
    #[arg(long)]
    lambda_2d: Option<f64>,

    /// Implicit time-step damping
    #[arg(long)]
    dt: Option<f64>,

    /// Apply a 3x3 median filter before segmenting
    #[arg(long)]
    median: bool,

    /// Number of Rayon worker threads (1 selects the serial backend)
    #[arg(long)]
    threads: Option<usize>,

    /// Boundary cutoff for the overlay
    #[arg(short = 't', long, default_value = "0.5")]
    threshold: f64,

    /// Output probability field (.npy, .mat or .png)
    #[arg(short = 'o', long, default_value = "probability.npy")]
    output: PathBuf,

    /// Also write an 8-bit preview PNG of the field
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Also write the image with the thresholded boundary drawn in red
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Print per-iteration progress to stderr
    #[arg(long)]
    progress: bool,
}

fn build_params(cli: &Cli) -> Result<Parameters> {
    let mut params = match &cli.config {
        Some(path) => Parameters::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Parameters::default(),
    };
    if let Some(v) = cli.iterations_1d {
        params.max_iterations_1d = v;
    }
    if let Some(v) = cli.gamma_1d {
        params.gamma_1d = v;
    }
    if let Some(v) = cli.lambda_1d {
        params.lambda_1d = v;
    }
    if let Some(v) = cli.fore_threshold {
        params.fore_threshold = v;
    }
    if let Some(v) = cli.iterations_2d {
        params.max_iterations_2d = v;
    }
    if let Some(v) = cli.gamma_2d {
        params.gamma_2d = v;
    }
    if let Some(v) = cli.lambda_2d {
        params.lambda_2d = v;
    }
    if let Some(v) = cli.dt {
        params.dt = v;
    }
    params.validate().context("invalid parameters")?;
    Ok(params)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    if !cli.threshold.is_finite() {
        bail!("--threshold must be finite, got {}", cli.threshold);
    }
    let params = build_params(&cli)?;

    let mut image = io::load_image(&cli.image)
        .with_context(|| format!("failed to load image {}", cli.image.display()))?;
    if cli.median {
        image = image.median_filter_3x3();
    }
    let strokes = io::load_strokes(&cli.strokes)
        .with_context(|| format!("failed to load strokes {}", cli.strokes.display()))?;
    if strokes.foreground.is_empty() {
        log::warn!("no foreground strokes; the field will be all zero");
    }

    let mut seg = Segmenter::new(image, params)?;
    seg = match cli.threads {
        Some(0) => bail!("--threads must be at least 1"),
        Some(1) => seg.with_backend(Box::new(SerialBackend)),
        Some(n) => seg.with_backend(Box::new(RayonBackend::with_threads(n)?)),
        None => seg,
    };
    if cli.progress {
        seg = seg.with_progress(Box::new(|info: SolveProgress| {
            let stage = match info.stage {
                Stage::Propagation => "1D",
                Stage::Diffusion => "2D",
            };
            eprintln!(
                "[{:.3}s] {} iteration {}",
                info.elapsed.as_secs_f64(),
                stage,
                info.iteration + 1
            );
        }));
    }

    let report = seg.compute(&strokes);
    let field = seg
        .probability()
        .context("segmentation produced no probability field")?;

    io::save_probability(field, &cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    if let Some(path) = &cli.preview {
        io::save_probability_png(field, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    if let Some(path) = &cli.overlay {
        io::save_overlay_png(seg.image(), field, cli.threshold, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
