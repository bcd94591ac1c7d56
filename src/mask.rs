// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// Ordered pixel-coordinate sequence `[x, y]` drawn by the user.
pub type Polyline = Vec<[f64; 2]>;

/// Per-pixel seed label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Label {
    /// No user or propagated label.
    #[default]
    Unlabeled,
    /// Locked to the foreground.
    Foreground,
    /// Locked to the background.
    Background,
}

impl Label {
    /// True for foreground or background.
    #[inline]
    pub fn is_seed(self) -> bool {
        self != Label::Unlabeled
    }

    /// True for foreground only.
    #[inline]
    pub fn is_foreground(self) -> bool {
        self == Label::Foreground
    }
}

/// Foreground and background strokes accumulated while drawing.
///
/// Append-only until [`clear`](Self::clear). Foreground strokes are always
/// rasterized before background strokes, so background wins where they
/// overlap.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedStrokes {
    /// Foreground polylines in drawing order.
    pub foreground: Vec<Polyline>,
    /// Background polylines in drawing order.
    pub background: Vec<Polyline>,
}

impl SeedStrokes {
    /// Empty stroke set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a foreground polyline.
    pub fn add_foreground(&mut self, stroke: Polyline) {
        self.foreground.push(stroke);
    }

    /// Append a background polyline.
    pub fn add_background(&mut self, stroke: Polyline) {
        self.background.push(stroke);
    }

    /// Append `point` to the last foreground stroke, starting one if none exists.
    pub fn extend_foreground(&mut self, point: [f64; 2]) {
        extend_last(&mut self.foreground, point);
    }

    /// Append `point` to the last background stroke, starting one if none exists.
    pub fn extend_background(&mut self, point: [f64; 2]) {
        extend_last(&mut self.background, point);
    }

    /// Drop all strokes of both labels.
    pub fn clear(&mut self) {
        self.foreground.clear();
        self.background.clear();
    }

    /// True when no stroke of either label has been drawn.
    pub fn is_empty(&self) -> bool {
        self.foreground.is_empty() && self.background.is_empty()
    }
}

fn extend_last(strokes: &mut Vec<Polyline>, point: [f64; 2]) {
    match strokes.last_mut() {
        Some(line) => line.push(point),
        None => strokes.push(vec![point]),
    }
}

/// Tri-state label buffer, row-major, one entry per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelMask {
    width: usize,
    height: usize,
    labels: Box<[Label]>,
}

impl LabelMask {
    /// All-unlabeled mask of the given size.
    pub fn new(width: usize, height: usize) -> Self {
        LabelMask {
            width,
            height,
            labels: vec![Label::Unlabeled; width * height].into_boxed_slice(),
        }
    }

    /// Mask width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Mask height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Label at `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Label {
        self.labels[y * self.width + x]
    }

    /// Overwrite the label at `(x, y)`.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, label: Label) {
        self.labels[y * self.width + x] = label;
    }

    /// Row-major labels.
    pub fn as_slice(&self) -> &[Label] {
        &self.labels
    }

    /// Reset every pixel to [`Label::Unlabeled`].
    pub fn reset(&mut self) {
        self.labels.fill(Label::Unlabeled);
    }

    /// Promote `(x, y)` to foreground unless it is background.
    ///
    /// Returns true if the pixel changed.
    #[inline]
    pub fn promote(&mut self, x: usize, y: usize) -> bool {
        let cell = &mut self.labels[y * self.width + x];
        if *cell == Label::Unlabeled {
            *cell = Label::Foreground;
            true
        } else {
            false
        }
    }

    /// Number of foreground pixels.
    pub fn count_foreground(&self) -> usize {
        self.labels.iter().filter(|l| l.is_foreground()).count()
    }

    /// Number of background pixels.
    pub fn count_background(&self) -> usize {
        self.labels.iter().filter(|&&l| l == Label::Background).count()
    }

    /// Rebuild the mask from `strokes`: all foreground strokes first, then
    /// all background strokes.
    pub fn rasterize(&mut self, strokes: &SeedStrokes) {
        self.reset();
        let mut clipped = 0usize;
        for line in &strokes.foreground {
            clipped += self.stamp_polyline(line, Label::Foreground);
        }
        for line in &strokes.background {
            clipped += self.stamp_polyline(line, Label::Background);
        }
        if clipped > 0 {
            warn!(
                "{} stroke samples fell outside the {}x{} image",
                clipped, self.width, self.height
            );
        }
        debug!(
            "rasterized {} foreground / {} background strokes: fg={} bg={}",
            strokes.foreground.len(),
            strokes.background.len(),
            self.count_foreground(),
            self.count_background()
        );
    }

    /// Build a new mask of the given size from `strokes`.
    pub fn from_strokes(width: usize, height: usize, strokes: &SeedStrokes) -> Self {
        let mut mask = LabelMask::new(width, height);
        mask.rasterize(strokes);
        mask
    }

    /// Stamp one polyline, returning the number of samples outside the mask.
    fn stamp_polyline(&mut self, line: &[[f64; 2]], label: Label) -> usize {
        match line {
            [] => 0,
            [p] => usize::from(!self.stamp(*p, label)),
            _ => line
                .windows(2)
                .map(|pair| self.stamp_segment(pair[0], pair[1], label))
                .sum(),
        }
    }

    /// Sample `from -> to` at unit arc-length steps, end point included.
    ///
    /// Only the samples whose parameter falls inside the image are visited;
    /// the rest are counted as missed.
    fn stamp_segment(&mut self, from: [f64; 2], to: [f64; 2], label: Label) -> usize {
        if !from.iter().chain(&to).all(|v| v.is_finite()) {
            return 1;
        }
        let dir = [to[0] - from[0], to[1] - from[1]];
        let length = dir[0].hypot(dir[1]);
        let mut missed = 0;
        if length.is_finite() && length > 0.0 {
            let unit = [dir[0] / length, dir[1] / length];
            // Samples sit at t = 0, 1, ..., floor(length).
            let last = length.floor();
            let total = (last as usize).saturating_add(1);
            let mut visited = 0;
            if let Some((t0, t1)) = self.clip(from, unit, last) {
                let first = t0.ceil();
                let count = (t1.floor() - first) as usize + 1;
                for i in 0..count {
                    let t = first + i as f64;
                    let p = [from[0] + unit[0] * t, from[1] + unit[1] * t];
                    missed += usize::from(!self.stamp(p, label));
                }
                visited = count;
            }
            missed += total.saturating_sub(visited);
        }
        missed += usize::from(!self.stamp(to, label));
        missed
    }

    /// Parameter range of `origin + unit * t`, `t` in `[0, last]`, that lies
    /// inside `[0, width] x [0, height]`.
    fn clip(&self, origin: [f64; 2], unit: [f64; 2], last: f64) -> Option<(f64, f64)> {
        let (mut t0, mut t1) = (0.0_f64, last);
        for (axis, size) in [self.width as f64, self.height as f64].into_iter().enumerate() {
            let (o, u) = (origin[axis], unit[axis]);
            if u == 0.0 {
                if !(0.0..=size).contains(&o) {
                    return None;
                }
                continue;
            }
            let (a, b) = ((0.0 - o) / u, (size - o) / u);
            t0 = t0.max(a.min(b));
            t1 = t1.min(a.max(b));
        }
        (t0.ceil() <= t1.floor()).then_some((t0, t1))
    }

    /// Write `label` at the pixel containing `p`; false if `p` is outside.
    fn stamp(&mut self, p: [f64; 2], label: Label) -> bool {
        let (fx, fy) = (p[0].floor(), p[1].floor());
        if !(fx >= 0.0 && fy >= 0.0) || fx >= self.width as f64 || fy >= self.height as f64 {
            return false;
        }
        self.set(fx as usize, fy as usize, label);
        true
    }
}
