//! Common test utilities and data generators.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use faer::{Col, Mat};

/// Deterministic uniform draws in [-1, 1).
pub struct Lcg(u64);

impl Lcg {
    pub fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub fn draw(&mut self) -> f64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1);
        ((self.0 >> 32) as f64) / (u32::MAX as f64 + 1.0) * 2.0 - 1.0
    }
}

/// Balanced panel: y = effect[entity] + time_effect[t] + x·beta + noise.
///
/// Returns (x, y, entity ids, time ids).
#[allow(dead_code)]
pub fn generate_panel_data(
    n_entities: usize,
    n_periods: usize,
    beta: &[f64],
    time_effects: bool,
    noise_std: f64,
    seed: u64,
) -> (Mat<f64>, Col<f64>, Vec<usize>, Vec<usize>) {
    let mut rng = Lcg::new(seed);
    let n = n_entities * n_periods;
    let k = beta.len();
    let entity_effect: Vec<f64> = (0..n_entities).map(|e| 3.0 * e as f64 - 5.0).collect();
    let time_effect: Vec<f64> = (0..n_periods).map(|t| 0.7 * t as f64).collect();

    let mut x = Mat::zeros(n, k);
    let mut y = Col::zeros(n);
    let mut entities = Vec::with_capacity(n);
    let mut times = Vec::with_capacity(n);
    for e in 0..n_entities {
        for t in 0..n_periods {
            let i = e * n_periods + t;
            // regressors correlated with the entity effect
            let mut yi = entity_effect[e];
            if time_effects {
                yi += time_effect[t];
            }
            for (j, b) in beta.iter().enumerate() {
                x[(i, j)] =
                    rng.draw() + 0.1 * entity_effect[e] + 0.05 * (t as f64) * (j as f64 + 1.0);
                yi += b * x[(i, j)];
            }
            y[i] = yi + noise_std * rng.draw();
            entities.push(e);
            times.push(t);
        }
    }
    (x, y, entities, times)
}

/// Binary outcome from a latent index with uniform noise; classes overlap.
#[allow(dead_code)]
pub fn generate_binary_data(
    n: usize,
    intercept: f64,
    slope: f64,
    seed: u64,
) -> (Mat<f64>, Col<f64>) {
    let mut rng = Lcg::new(seed);
    let x = Mat::from_fn(n, 1, |i, _| -2.0 + 4.0 * i as f64 / (n - 1) as f64);
    let outcomes: Vec<f64> = (0..n)
        .map(|i| {
            let latent = intercept + slope * x[(i, 0)] + 1.5 * rng.draw();
            if latent > 0.0 {
                1.0
            } else {
                0.0
            }
        })
        .collect();
    (x, Col::from_fn(n, |i| outcomes[i]))
}

/// Structural model with one endogenous regressor.
///
/// x_end = z + u, y = 1 + 2 x_end + 0.5 x1 + (u + e): OLS is biased, 2SLS is not.
/// Returns (y, x1, x_end, z).
#[allow(dead_code)]
pub fn generate_iv_data(n: usize, seed: u64) -> (Vec<f64>, Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut rng = Lcg::new(seed);
    let (mut y, mut x1, mut x_end, mut z) = (vec![], vec![], vec![], vec![]);
    for _ in 0..n {
        let zi = 2.0 * rng.draw();
        let x1i = rng.draw();
        let u = rng.draw();
        let e = 0.1 * rng.draw();
        let xe = zi + 0.3 * x1i + u;
        z.push(zi);
        x1.push(x1i);
        x_end.push(xe);
        y.push(1.0 + 2.0 * xe + 0.5 * x1i + u + e);
    }
    (y, x1, x_end, z)
}

/// Write named columns as CSV. `None` cells are left empty.
#[allow(dead_code)]
pub fn write_csv(dir: &Path, name: &str, columns: &[(&str, Vec<Option<String>>)]) -> PathBuf {
    let mut text = String::new();
    let header: Vec<&str> = columns.iter().map(|(n, _)| *n).collect();
    text.push_str(&header.join(","));
    text.push('\n');
    let n_rows = columns.first().map_or(0, |(_, v)| v.len());
    for i in 0..n_rows {
        let cells: Vec<&str> = columns
            .iter()
            .map(|(_, v)| v[i].as_deref().unwrap_or(""))
            .collect();
        let _ = writeln!(text, "{}", cells.join(","));
    }
    let path = dir.join(name);
    std::fs::write(&path, text).expect("write test csv");
    path
}

/// Numeric cells for [`write_csv`].
#[allow(dead_code)]
pub fn num(values: &[f64]) -> Vec<Option<String>> {
    values.iter().map(|v| Some(v.to_string())).collect()
}

/// Text cells for [`write_csv`].
#[allow(dead_code)]
pub fn text<S: ToString>(values: &[S]) -> Vec<Option<String>> {
    values.iter().map(|v| Some(v.to_string())).collect()
}

/// Approximate equality check for floating point values.
#[allow(dead_code)]
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}
