// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Polynomial animation curves
//!
//! A curve passes through a list of `(key, value)` points and is evaluated
//! as the unique polynomial of degree `n - 1` through them. The coefficients
//! come from the Vandermonde system
//!
//! ```text
//! | 1  k0  k0² ... | |c0|   |v0|
//! | 1  k1  k1² ... | |c1| = |v1|
//! | ...            | |..|   |..|
//! ```
//!
//! solved with Gaussian elimination and partial pivoting. The fit is redone
//! lazily after the points change.

use std::fmt;

/// Polynomial through a set of keyframes
#[derive(Clone, PartialEq)]
pub struct Curve {
    keys: Vec<f32>,
    values: Vec<f32>,
    coefficients: Option<Vec<f32>>,
}

impl Curve {
    /// Create a curve through `(keys[i], values[i])`
    ///
    /// # Panics
    ///
    /// Panics if the lists differ in length, hold fewer than two points, or
    /// the keys are not strictly increasing
    pub fn new(keys: Vec<f32>, values: Vec<f32>) -> Self {
        validate(&keys, &values);
        Curve {
            keys,
            values,
            coefficients: None,
        }
    }

    /// Straight line from 0 to 1 over keys 0 to 1
    pub fn linear() -> Self {
        Self::new(vec![0.0, 1.0], vec![0.0, 1.0])
    }

    /// Keyframe positions
    pub fn keys(&self) -> &[f32] {
        &self.keys
    }

    /// Keyframe values
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Replace the keyframes; the fit is redone before the next evaluation
    ///
    /// # Panics
    ///
    /// Same conditions as [`Curve::new`]
    pub fn set_points(&mut self, keys: Vec<f32>, values: Vec<f32>) {
        validate(&keys, &values);
        self.keys = keys;
        self.values = values;
        self.coefficients = None;
    }

    /// True if the coefficients must be refit before evaluation
    pub fn is_dirty(&self) -> bool {
        self.coefficients.is_none()
    }

    /// First and last key
    pub fn range(&self) -> (f32, f32) {
        (self.keys[0], self.keys[self.keys.len() - 1])
    }

    /// Evaluate the polynomial at `t` in `0..=1`, mapped onto the key range
    pub fn evaluate(&mut self, t: f32) -> f32 {
        let (start, end) = self.range();
        let x = start + (end - start) * t;
        let coefficients = self
            .coefficients
            .get_or_insert_with(|| fit(&self.keys, &self.values));
        // Horner
        coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self::linear()
    }
}

impl fmt::Debug for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Curve")
            .field("keys", &self.keys)
            .field("values", &self.values)
            .finish()
    }
}

fn validate(keys: &[f32], values: &[f32]) {
    assert_eq!(
        keys.len(),
        values.len(),
        "Curve needs one value per key, got {} keys and {} values",
        keys.len(),
        values.len()
    );
    assert!(keys.len() >= 2, "Curve needs at least two keys, got {}", keys.len());
    assert!(
        keys.iter().all(|k| k.is_finite()) && keys.windows(2).all(|w| w[0] < w[1]),
        "Curve keys must be finite and strictly increasing: {:?}",
        keys
    );
}

/// Solve the Vandermonde system for the polynomial coefficients
fn fit(keys: &[f32], values: &[f32]) -> Vec<f32> {
    let n = keys.len();
    // Work in f64; Vandermonde matrices are badly conditioned
    let mut rows: Vec<Vec<f64>> = keys
        .iter()
        .zip(values)
        .map(|(&k, &v)| {
            let mut row = Vec::with_capacity(n + 1);
            let mut power = 1.0f64;
            for _ in 0..n {
                row.push(power);
                power *= k as f64;
            }
            row.push(v as f64);
            row
        })
        .collect();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&a, &b| rows[a][col].abs().total_cmp(&rows[b][col].abs()))
            .unwrap_or(col);
        rows.swap(col, pivot);
        let lead = rows[col][col];
        if lead == 0.0 {
            continue;
        }
        for row in (col + 1)..n {
            let factor = rows[row][col] / lead;
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                rows[row][k] -= factor * rows[col][k];
            }
        }
    }

    let mut coefficients = vec![0.0f64; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| rows[row][k] * coefficients[k]).sum();
        let lead = rows[row][row];
        coefficients[row] = if lead == 0.0 { 0.0 } else { (rows[row][n] - tail) / lead };
    }
    coefficients.into_iter().map(|c| c as f32).collect()
}
