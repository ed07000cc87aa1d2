//! # t-Distributed Stochastic Neighbor Embedding
//!
//! Exact (O(N²) per iteration) t-SNE, intended for the small groups this crate
//! projects. Input affinities are Gaussian conditionals calibrated to the requested
//! perplexity and symmetrized; output affinities use a Student-t kernel. The layout
//! is optimized by gradient descent with momentum, per-parameter gains and early
//! exaggeration.
//!
//! The initial layout is random. Set [`TSNEConfig::seed`] for reproducible output;
//! without a seed every run differs.

use crate::data::{Group, ProjectedGroup};
use crate::dimred::{project_each, ProjectionMethod, Projector};
use crate::error::{ProjectionError, Result};
use anyhow::{anyhow, bail};
use log::{debug, log_enabled, Level};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

pub const DEFAULT_PERPLEXITY: f64 = 30.0;
pub const DEFAULT_LEARNING_RATE: f64 = 200.0;
pub const DEFAULT_EPOCHS: usize = 3000;

const EARLY_EXAGGERATION: f64 = 4.0;
const EXAGGERATION_EPOCHS: usize = 100;
const INITIAL_MOMENTUM: f64 = 0.5;
const FINAL_MOMENTUM: f64 = 0.8;
const MOMENTUM_SWITCH_EPOCH: usize = 20;
const MIN_GAIN: f64 = 0.01;
const INIT_STD_DEV: f64 = 1e-4;
const MIN_PROBABILITY: f64 = 1e-12;
const ENTROPY_TOLERANCE: f64 = 1e-5;
const MAX_BINARY_SEARCH_STEPS: usize = 50;
const REPORT_EVERY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TSNEConfig {
    perplexity: f64,
    learning_rate: f64,
    epochs: usize,
    seed: Option<u64>,
}

impl Default for TSNEConfig {
    fn default() -> Self {
        TSNEConfig {
            perplexity: DEFAULT_PERPLEXITY,
            learning_rate: DEFAULT_LEARNING_RATE,
            epochs: DEFAULT_EPOCHS,
            seed: None,
        }
    }
}

impl TSNEConfig {
    /// Effective number of neighbors. Groups with fewer than `perplexity + 1` points
    /// are calibrated against `N - 1` instead.
    pub fn perplexity(mut self, perplexity: f64) -> Self {
        self.perplexity = perplexity;
        self
    }

    pub fn learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn get_seed(&self) -> Option<u64> {
        self.seed
    }
}

/// Stochastic projection strategy.
#[derive(Debug, Clone, Default)]
pub struct Tsne {
    config: TSNEConfig,
}

impl Tsne {
    pub fn new(config: TSNEConfig) -> Self {
        Tsne { config }
    }

    pub fn config(&self) -> &TSNEConfig {
        &self.config
    }

    /// Embeds the rows of `x` into `output_dim` dimensions.
    pub fn embed<R: Rng + ?Sized>(
        &self,
        x: ArrayView2<f64>,
        output_dim: usize,
        rng: &mut R,
    ) -> anyhow::Result<Array2<f64>> {
        let n_samples = x.nrows();
        if n_samples < 2 {
            bail!("t-SNE needs at least two samples, got {}", n_samples);
        }
        if output_dim == 0 {
            bail!("output dimension must be positive");
        }
        if self.config.perplexity.is_nan() || self.config.perplexity <= 0.0 {
            bail!("perplexity must be positive, got {}", self.config.perplexity);
        }
        if x.iter().any(|v| !v.is_finite()) {
            bail!("input contains non-finite values");
        }

        let perplexity = self.config.perplexity.min((n_samples - 1) as f64);
        let p = joint_probabilities(x, perplexity);

        let normal = Normal::new(0.0, INIT_STD_DEV).map_err(|e| anyhow!("{}", e))?;
        let mut y = Array2::from_shape_simple_fn((n_samples, output_dim), || normal.sample(&mut *rng));
        let mut update = Array2::<f64>::zeros((n_samples, output_dim));
        let mut gains = Array2::<f64>::ones((n_samples, output_dim));

        for epoch in 0..self.config.epochs {
            let exaggeration = if epoch < EXAGGERATION_EPOCHS {
                EARLY_EXAGGERATION
            } else {
                1.0
            };
            let momentum = if epoch < MOMENTUM_SWITCH_EPOCH {
                INITIAL_MOMENTUM
            } else {
                FINAL_MOMENTUM
            };

            let kernel = student_t_kernel(&y);
            let kernel_sum = kernel.sum();
            let gradient = kl_gradient(&p, &kernel, kernel_sum, &y, exaggeration);

            for ((g, gain), step) in gradient
                .iter()
                .zip(gains.iter_mut())
                .zip(update.iter_mut())
            {
                *gain = if (*g > 0.0) != (*step > 0.0) {
                    *gain + 0.2
                } else {
                    *gain * 0.8
                };
                *gain = gain.max(MIN_GAIN);
                *step = momentum * *step - self.config.learning_rate * *gain * *g;
            }
            y += &update;

            if let Some(mean) = y.mean_axis(Axis(0)) {
                y -= &mean;
            }

            if (epoch + 1) % REPORT_EVERY == 0 && log_enabled!(Level::Debug) {
                debug!(
                    "t-SNE epoch {}: KL divergence {:.6}",
                    epoch + 1,
                    kl_divergence(&p, &kernel, kernel_sum)
                );
            }
        }

        if y.iter().any(|v| !v.is_finite()) {
            bail!("optimization diverged");
        }

        Ok(y)
    }

    fn rng(&self) -> ChaCha8Rng {
        match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        }
    }
}

impl Projector for Tsne {
    fn method(&self) -> ProjectionMethod {
        ProjectionMethod::Tsne
    }

    /// One random stream serves the whole batch, so a seeded run is reproducible for
    /// the same groups in the same order.
    fn project(&self, groups: &[Group], target_dim: usize) -> Result<Vec<ProjectedGroup>> {
        let mut rng = self.rng();
        project_each(groups, target_dim, false, |group| {
            let x = group.to_matrix()?;
            let y = self
                .embed(x.view(), target_dim, &mut rng)
                .map_err(|e| ProjectionError::decomposition(&group.name, e.to_string()))?;
            Ok(ProjectedGroup::from_rows(group, &y))
        })
    }
}

fn squared_distances(x: ArrayView2<f64>) -> Array2<f64> {
    let n = x.nrows();
    let mut distances = Array2::zeros((n, n));
    for i in 0..n {
        for j in (i + 1)..n {
            let d: f64 = x
                .row(i)
                .iter()
                .zip(x.row(j).iter())
                .map(|(a, b)| (a - b) * (a - b))
                .sum();
            distances[[i, j]] = d;
            distances[[j, i]] = d;
        }
    }
    distances
}

/// Conditional affinities of row `i`, with the Gaussian precision found by binary
/// search so the row's entropy matches `ln(perplexity)`.
fn conditional_row(distances: &Array2<f64>, i: usize, target_entropy: f64) -> Array1<f64> {
    let n = distances.nrows();
    let nearest = (0..n)
        .filter(|&j| j != i)
        .map(|j| distances[[i, j]])
        .fold(f64::INFINITY, f64::min);

    let mut beta = 1.0;
    let mut beta_min = f64::NEG_INFINITY;
    let mut beta_max = f64::INFINITY;
    let mut row = Array1::zeros(n);

    for _ in 0..MAX_BINARY_SEARCH_STEPS {
        // shifting by the nearest distance keeps exp() from underflowing
        let mut sum = 0.0;
        let mut weighted = 0.0;
        for j in 0..n {
            if j == i {
                row[j] = 0.0;
                continue;
            }
            let shifted = distances[[i, j]] - nearest;
            let value = (-shifted * beta).exp();
            row[j] = value;
            sum += value;
            weighted += shifted * value;
        }

        let entropy = sum.ln() + beta * weighted / sum;
        row /= sum;

        let diff = entropy - target_entropy;
        if diff.abs() < ENTROPY_TOLERANCE {
            break;
        }
        if diff > 0.0 {
            beta_min = beta;
            beta = if beta_max.is_infinite() {
                beta * 2.0
            } else {
                (beta + beta_max) / 2.0
            };
        } else {
            beta_max = beta;
            beta = if beta_min.is_infinite() {
                beta / 2.0
            } else {
                (beta + beta_min) / 2.0
            };
        }
    }

    row
}

/// Symmetrized input affinities `P`, normalized to sum to one.
fn joint_probabilities(x: ArrayView2<f64>, perplexity: f64) -> Array2<f64> {
    let n = x.nrows();
    let distances = squared_distances(x);
    let target_entropy = perplexity.ln();

    let mut conditional = Array2::zeros((n, n));
    for i in 0..n {
        conditional
            .row_mut(i)
            .assign(&conditional_row(&distances, i, target_entropy));
    }

    let mut p = &conditional + &conditional.t();
    let total = p.sum();
    p /= total;
    p.mapv_inplace(|v| v.max(MIN_PROBABILITY));
    p
}

/// Unnormalized Student-t similarities `1 / (1 + |y_i - y_j|²)`, zero on the diagonal.
fn student_t_kernel(y: &Array2<f64>) -> Array2<f64> {
    let mut kernel = squared_distances(y.view());
    kernel.mapv_inplace(|d| 1.0 / (1.0 + d));
    kernel.diag_mut().fill(0.0);
    kernel
}

fn kl_gradient(
    p: &Array2<f64>,
    kernel: &Array2<f64>,
    kernel_sum: f64,
    y: &Array2<f64>,
    exaggeration: f64,
) -> Array2<f64> {
    let (n, dim) = y.dim();
    let mut gradient = Array2::zeros((n, dim));

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let q = (kernel[[i, j]] / kernel_sum).max(MIN_PROBABILITY);
            let force = 4.0 * (exaggeration * p[[i, j]] - q) * kernel[[i, j]];
            for k in 0..dim {
                gradient[[i, k]] += force * (y[[i, k]] - y[[j, k]]);
            }
        }
    }

    gradient
}

fn kl_divergence(p: &Array2<f64>, kernel: &Array2<f64>, kernel_sum: f64) -> f64 {
    let n = p.nrows();
    let mut kl = 0.0;
    for i in 0..n {
        for j in 0..n {
            if i != j {
                let q = (kernel[[i, j]] / kernel_sum).max(MIN_PROBABILITY);
                kl += p[[i, j]] * (p[[i, j]] / q).ln();
            }
        }
    }
    kl
}
