// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use seedseg::fields::BETA_1D;
use seedseg::{
    GradientField, GrayscaleImage, Initializer, Label, LabelMask, Parameters, RayonBackend,
    SeedStrokes, Segmenter, SerialBackend, WeightField,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn corner_seeds() -> SeedStrokes {
    let mut strokes = SeedStrokes::new();
    strokes.add_foreground(vec![[1.0, 1.0]]);
    strokes.add_background(vec![[2.0, 2.0]]);
    strokes
}

/// Left half dark, right half bright, separated by a vertical edge at x = 6.
fn two_region_image() -> GrayscaleImage {
    let (w, h) = (12, 8);
    let data = (0..w * h)
        .map(|i| if i % w < 6 { 0.2 } else { 0.8 })
        .collect();
    GrayscaleImage::new(w, h, data).unwrap()
}

fn two_region_strokes() -> SeedStrokes {
    let mut strokes = SeedStrokes::new();
    strokes.add_foreground(vec![[2.0, 2.0], [2.0, 5.0]]);
    strokes.add_background(vec![[9.0, 2.0], [9.0, 5.0]]);
    strokes
}

/// Test 1: Minimal 4x4 uniform image, one iteration per stage.
/// The foreground seed stays near 1 and the background seed near 0. The 1D
/// stage promotes (2,1) and (1,2). Pixels left unlabeled stay below 1 and
/// may undershoot 0 only slightly, since the field is not clamped.
#[test]
fn uniform_4x4_single_iteration() {
    init_logging();
    let img = GrayscaleImage::uniform(4, 4, 0.5).unwrap();
    let params = Parameters::default()
        .with_iterations_1d(1)
        .with_iterations_2d(1);
    let mut seg = Segmenter::new(img, params).unwrap();
    let report = seg.compute(&corner_seeds());
    let p = seg.probability().unwrap();
    let mask = seg.mask();

    assert_eq!(report.promoted, 2);
    assert_eq!(mask.get(2, 1), Label::Foreground);
    assert_eq!(mask.get(1, 2), Label::Foreground);
    assert!(p.get(1, 1) > 0.9, "p(1,1) = {}", p.get(1, 1));
    assert!(p.get(2, 2) < 0.1, "p(2,2) = {}", p.get(2, 2));
    let mut undershoot = Vec::new();
    for y in 0..4 {
        for x in 0..4 {
            if mask.get(x, y) != Label::Unlabeled {
                continue;
            }
            let v = p.get(x, y);
            assert!(v > -1e-3 && v < 1.0, "p({},{}) = {}", x, y, v);
            if v <= 0.0 {
                undershoot.push((x, y));
            }
        }
    }
    // Only the pixel below the promoted (1,2) dips under zero.
    assert!(undershoot.len() <= 1, "undershoot at {:?}", undershoot);
    assert!(p.as_slice().iter().all(|v| v.is_finite()));
}

/// Test 2: Same image with default parameters.
/// Every unseeded pixel ends strictly inside (0, 1).
#[test]
fn uniform_4x4_defaults_stay_bounded() {
    init_logging();
    let img = GrayscaleImage::uniform(4, 4, 0.5).unwrap();
    let mut seg = Segmenter::new(img, Parameters::default()).unwrap();
    seg.compute(&corner_seeds());
    let p = seg.probability().unwrap();
    let mask = seg.mask();

    assert!(p.get(1, 1) > 0.9);
    assert!(p.get(2, 2) < 0.05);
    for y in 0..4 {
        for x in 0..4 {
            if mask.get(x, y) == Label::Unlabeled {
                let v = p.get(x, y);
                assert!(v > 0.0 && v < 1.0, "p({},{}) = {}", x, y, v);
            }
        }
    }
}

/// Test 3: Edge-aware diffusion.
/// Foreground drawn left of a strong vertical edge fills the left region and
/// does not leak across the edge.
#[test]
fn diffusion_stops_at_strong_edge() {
    init_logging();
    let mut seg = Segmenter::new(two_region_image(), Parameters::default()).unwrap();
    seg.compute(&two_region_strokes());
    let p = seg.probability().unwrap();

    for y in 0..8 {
        for x in 6..12 {
            let v = p.get(x, y);
            assert!(v.abs() < 0.05, "leak across edge: p({},{}) = {}", x, y, v);
        }
    }
    for y in 1..7 {
        for x in 2..6 {
            let v = p.get(x, y);
            assert!(v > 0.9, "foreground region under-filled: p({},{}) = {}", x, y, v);
        }
    }

    let boundary = p.boundary(0.5);
    assert!(boundary[3 * 12 + 5] && boundary[3 * 12 + 6]);
    assert!(!boundary[3 * 12 + 9]);
}

/// Test 4: Repeated solves on the same segmenter are bitwise identical.
#[test]
fn repeated_solves_deterministic() {
    init_logging();
    let mut seg = Segmenter::new(two_region_image(), Parameters::default()).unwrap();
    seg.compute(&two_region_strokes());
    let first = seg.probability().unwrap().clone();
    let first_mask = seg.mask().clone();

    seg.compute(&two_region_strokes());
    assert_eq!(seg.probability().unwrap(), &first);
    assert_eq!(seg.mask(), &first_mask);
}

/// Test 5: Serial and multi-threaded backends agree.
#[test]
fn serial_and_rayon_backends_agree() {
    init_logging();
    let (w, h) = (48, 40);
    let data: Vec<f64> = (0..w * h)
        .map(|i| {
            let (x, y) = ((i % w) as f64, (i / w) as f64);
            let r = ((x - 20.0).powi(2) + (y - 18.0).powi(2)).sqrt();
            if r < 12.0 {
                0.75 + 0.02 * (x * 0.3).sin()
            } else {
                0.25 + 0.02 * (y * 0.4).cos()
            }
        })
        .collect();
    let img = GrayscaleImage::new(w, h, data).unwrap();
    let mut strokes = SeedStrokes::new();
    strokes.add_foreground(vec![[15.0, 15.0], [25.0, 20.0]]);
    strokes.add_background(vec![[2.0, 2.0], [45.0, 2.0], [45.0, 37.0]]);

    let mut serial = Segmenter::new(img.clone(), Parameters::default())
        .unwrap()
        .with_backend(Box::new(SerialBackend));
    let mut parallel = Segmenter::new(img, Parameters::default())
        .unwrap()
        .with_backend(Box::new(RayonBackend::with_threads(4).unwrap()));
    serial.compute(&strokes);
    parallel.compute(&strokes);

    let a = serial.probability().unwrap();
    let b = parallel.probability().unwrap();
    let max_diff = a
        .as_slice()
        .iter()
        .zip(b.as_slice())
        .map(|(x, y)| (x - y).abs())
        .fold(0.0_f64, f64::max);
    assert!(
        max_diff < 1e-12,
        "max diff between serial and rayon: {}",
        max_diff
    );
}

/// Test 6: 1D propagation grows the foreground monotonically and never
/// touches background seeds.
#[test]
fn propagation_monotone_and_background_locked() {
    init_logging();
    let img = two_region_image();
    let weights = WeightField::compute(&img, BETA_1D);
    let grad = GradientField::compute(&img);
    let mut mask = LabelMask::from_strokes(12, 8, &two_region_strokes());
    let background: Vec<usize> = (0..mask.as_slice().len())
        .filter(|&i| mask.as_slice()[i] == Label::Background)
        .collect();

    let mut init = Initializer::new(12, 8, Parameters::default());
    let mut last = mask.count_foreground();
    for iteration in 0..10 {
        init.iterate(&mut mask, &weights, &grad);
        let now = mask.count_foreground();
        assert!(
            now >= last,
            "iteration {}: foreground shrank {} -> {}",
            iteration,
            last,
            now
        );
        last = now;
    }
    assert!(last > 4, "propagation promoted nothing");
    for i in background {
        assert_eq!(mask.as_slice()[i], Label::Background);
    }
    // Nothing crosses the edge.
    for y in 0..8 {
        for x in 6..12 {
            assert_ne!(mask.get(x, y), Label::Foreground, "({}, {})", x, y);
        }
    }
}

/// Test 7: Overlapping strokes end as background regardless of draw order.
#[test]
fn overlapping_strokes_resolve_to_background() {
    init_logging();
    let mut strokes = SeedStrokes::new();
    strokes.add_background(vec![[0.0, 3.0], [7.0, 3.0]]);
    strokes.add_foreground(vec![[3.0, 0.0], [3.0, 7.0]]);
    let mask = LabelMask::from_strokes(8, 8, &strokes);
    assert_eq!(mask.get(3, 3), Label::Background);
    assert_eq!(mask.get(3, 0), Label::Foreground);
    assert_eq!(mask.get(0, 3), Label::Background);
}

/// Test 8: Stronger seed attachment pulls the foreground seed closer to 1.
#[test]
fn lambda_controls_seed_attachment() {
    init_logging();
    let run = |lambda: f64| -> f64 {
        let img = GrayscaleImage::uniform(4, 4, 0.5).unwrap();
        let params = Parameters {
            lambda_2d: lambda,
            ..Parameters::default()
        };
        let mut seg = Segmenter::new(img, params).unwrap();
        seg.compute(&corner_seeds());
        seg.probability().unwrap().get(1, 1)
    };
    let weak = run(1.0);
    let strong = run(100.0);
    assert!(
        strong > weak,
        "lambda 100 gave {}, lambda 1 gave {}",
        strong,
        weak
    );
}

/// Test 9: Parameters swapped between runs take effect on the next run.
#[test]
fn set_params_between_runs() {
    init_logging();
    let img = GrayscaleImage::uniform(4, 4, 0.5).unwrap();
    let mut seg = Segmenter::new(img, Parameters::default()).unwrap();
    let report = seg.compute(&corner_seeds());
    assert_eq!(report.iterations_2d, 10);

    seg.set_params(Parameters::default().with_iterations_1d(0).with_iterations_2d(0))
        .unwrap();
    let report = seg.compute(&corner_seeds());
    assert_eq!(report.promoted, 0);
    assert_eq!(report.foreground_seeds, 1);
    let p = seg.probability().unwrap();
    assert_eq!(p.get(1, 1), 1.0);
    assert_eq!(p.get(2, 1), 0.0);
}
