// Copyright (c) 2026, Chad Hogan
// All rights reserved.
//
// This source code is licensed under the BSD-3-Clause license found in the
// LICENSE file in the root directory of this source tree.

//! Thomas algorithm for tridiagonal systems.

/// Solve the tridiagonal system `A x = d` in place.
///
/// Row `i` of `A` is `a[i] * x[i-1] + b[i] * x[i] + c[i] * x[i+1]`; `a[0]`
/// and `c[n-1]` lie outside the matrix and are ignored.
///
/// Forward elimination overwrites `c` and `d` with the modified coefficients
/// c' and d', so both are garbage after the call.
///
/// The system must be diagonally dominant. This is not checked: a vanishing
/// pivot `b[i] - c'[i-1] * a[i]` produces non-finite output.
///
/// # Panics
/// Panics if the slices are empty or their lengths differ.
pub fn solve_in_place(a: &[f64], b: &[f64], c: &mut [f64], d: &mut [f64], x: &mut [f64]) {
    let n = b.len();
    assert!(n > 0, "tridiagonal system must have at least one row");
    assert!(
        a.len() == n && c.len() == n && d.len() == n && x.len() == n,
        "tridiagonal coefficient lengths differ: a={} b={} c={} d={} x={}",
        a.len(),
        n,
        c.len(),
        d.len(),
        x.len()
    );

    c[0] /= b[0];
    d[0] /= b[0];

    for i in 1..n {
        let inv = 1.0 / (b[i] - c[i - 1] * a[i]);
        c[i] *= inv;
        d[i] = (d[i] - a[i] * d[i - 1]) * inv;
    }

    x[n - 1] = d[n - 1];
    for i in (0..n - 1).rev() {
        x[i] = d[i] - c[i] * x[i + 1];
    }
}

/// Reusable coefficient storage for one tridiagonal solve per line.
///
/// Holds the four coefficient vectors and the solution, sized for the longest
/// line the caller will solve; [`solve`](Self::solve) works on a prefix.
#[derive(Debug, Clone)]
pub struct TridiagonalSystem {
    /// Sub-diagonal.
    pub a: Vec<f64>,
    /// Main diagonal.
    pub b: Vec<f64>,
    /// Super-diagonal.
    pub c: Vec<f64>,
    /// Right-hand side.
    pub d: Vec<f64>,
    x: Vec<f64>,
}

impl TridiagonalSystem {
    /// Allocate a workspace for systems of up to `capacity` rows.
    pub fn new(capacity: usize) -> Self {
        TridiagonalSystem {
            a: vec![0.0; capacity],
            b: vec![0.0; capacity],
            c: vec![0.0; capacity],
            d: vec![0.0; capacity],
            x: vec![0.0; capacity],
        }
    }

    /// Number of rows the workspace can hold.
    pub fn capacity(&self) -> usize {
        self.b.len()
    }

    /// Solve the first `n` rows and return the solution.
    ///
    /// `c` and `d` are consumed by the elimination and must be rebuilt before
    /// the next call.
    pub fn solve(&mut self, n: usize) -> &[f64] {
        assert!(
            n <= self.capacity(),
            "system of {} rows exceeds workspace capacity {}",
            n,
            self.capacity()
        );
        solve_in_place(
            &self.a[..n],
            &self.b[..n],
            &mut self.c[..n],
            &mut self.d[..n],
            &mut self.x[..n],
        );
        &self.x[..n]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic diagonally dominant system with a known solution.
    fn dominant_system(n: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
        let a: Vec<f64> = (0..n)
            .map(|i| if i > 0 { -0.3 - 0.5 * (i as f64).sin().abs() } else { 0.0 })
            .collect();
        let c: Vec<f64> = (0..n)
            .map(|i| if i + 1 < n { -0.2 - 0.6 * (i as f64 * 0.7).cos().abs() } else { 0.0 })
            .collect();
        let b: Vec<f64> = (0..n)
            .map(|i| a[i].abs() + c[i].abs() + 0.05 + (i % 3) as f64)
            .collect();
        let x: Vec<f64> = (0..n).map(|i| (i as f64 * 0.37).sin() * 2.0 - 0.5).collect();
        (a, b, c, x)
    }

    fn multiply(a: &[f64], b: &[f64], c: &[f64], x: &[f64]) -> Vec<f64> {
        let n = x.len();
        (0..n)
            .map(|i| {
                let mut v = b[i] * x[i];
                if i > 0 {
                    v += a[i] * x[i - 1];
                }
                if i + 1 < n {
                    v += c[i] * x[i + 1];
                }
                v
            })
            .collect()
    }

    #[test]
    fn identity_system() {
        let n = 5;
        let a = vec![0.0; n];
        let b = vec![1.0; n];
        let mut c = vec![0.0; n];
        let mut d = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let mut x = vec![0.0; n];
        solve_in_place(&a, &b, &mut c, &mut d, &mut x);
        assert_eq!(x, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn recovers_known_solution() {
        for &n in &[2usize, 3, 17, 256] {
            let (a, b, mut c, x_true) = dominant_system(n);
            let mut d = multiply(&a, &b, &c, &x_true);
            let mut x = vec![0.0; n];
            solve_in_place(&a, &b, &mut c, &mut d, &mut x);
            for i in 0..n {
                assert!(
                    (x[i] - x_true[i]).abs() < 1e-6,
                    "n={} x[{}]={} expected {}",
                    n,
                    i,
                    x[i],
                    x_true[i]
                );
            }
        }
    }

    #[test]
    fn neumann_closure_pattern() {
        // Boundary rows close with an off-matrix coefficient of -1, as the
        // propagation stages build them.
        let w = 1.0;
        let a = vec![-1.0, -w, -w, -w];
        let c = vec![-w, -w, -w, -1.0];
        let b = vec![1.0 + w, 2.0 * w + 100.0, 2.0 * w, 1.0 + w];
        let mut cc = c.clone();
        let mut d = vec![0.0, 100.0, 0.0, 0.0];
        let mut x = vec![0.0; 4];
        solve_in_place(&a, &b, &mut cc, &mut d, &mut x);
        let ax = multiply(&a, &b, &c, &x);
        assert!((ax[1] - 100.0).abs() < 1e-9);
        assert!(x[1] > 0.99 && x[1] < 1.0);
        assert!(x[0] > 0.0 && x[2] > x[3]);
    }

    #[test]
    fn workspace_solves_prefix() {
        let mut sys = TridiagonalSystem::new(8);
        let (a, b, c, x_true) = dominant_system(5);
        let d = multiply(&a, &b, &c, &x_true);
        sys.a[..5].copy_from_slice(&a);
        sys.b[..5].copy_from_slice(&b);
        sys.c[..5].copy_from_slice(&c);
        sys.d[..5].copy_from_slice(&d);
        let x = sys.solve(5);
        assert_eq!(x.len(), 5);
        for i in 0..5 {
            assert!((x[i] - x_true[i]).abs() < 1e-9);
        }
    }

    #[test]
    #[should_panic(expected = "lengths differ")]
    fn mismatched_lengths_panic() {
        let mut c = vec![0.0; 3];
        let mut d = vec![0.0; 3];
        let mut x = vec![0.0; 3];
        solve_in_place(&[0.0; 2], &[1.0; 3], &mut c, &mut d, &mut x);
    }
}
