//! # Principal Component Analysis
//!
//! Dense PCA over the rows of an N×D matrix. Components come from a thin SVD of the
//! mean-centered data and are ordered by descending eigenvalue (explained variance);
//! equal eigenvalues keep the order the decomposition produced them in.

use crate::data::{Group, ProjectedGroup};
use crate::dimred::{project_each, ProjectionMethod, Projector};
use crate::error::{ProjectionError, Result};
use crate::svd::{NalgebraSVD, SVDImplementation};
use anyhow::{anyhow, bail};
use log::debug;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use std::cmp::Ordering;

/// Norm below which a Gram–Schmidt candidate is treated as linearly dependent.
const BASIS_TOLERANCE: f64 = 1e-8;

pub struct PCABuilder<S: SVDImplementation> {
    n_components: Option<usize>,
    center: bool,
    svd_implementation: S,
}

impl<S: SVDImplementation> PCABuilder<S> {
    pub fn new(svd_implementation: S) -> Self {
        PCABuilder {
            n_components: None,
            center: true,
            svd_implementation,
        }
    }

    pub fn n_components(mut self, n_components: usize) -> Self {
        self.n_components = Some(n_components);
        self
    }

    /// Sets whether column means are subtracted before the decomposition.
    pub fn center(mut self, center: bool) -> Self {
        self.center = center;
        self
    }

    pub fn build(self) -> Pca<S> {
        Pca {
            n_components: self.n_components,
            center: self.center,
            svd_implementation: self.svd_implementation,
            components: None,
            mean: None,
            explained_variance_ratio: None,
            total_variance: None,
            eigenvalues: None,
        }
    }
}

impl Default for PCABuilder<NalgebraSVD> {
    fn default() -> Self {
        Self::new(NalgebraSVD::default())
    }
}

/// Principal Component Analysis model.
///
/// After [`Pca::fit`], `components` holds one unit-length principal axis per row
/// (n_components × n_features).
pub struct Pca<S: SVDImplementation> {
    n_components: Option<usize>,
    center: bool,
    svd_implementation: S,
    components: Option<Array2<f64>>,
    mean: Option<Array1<f64>>,
    explained_variance_ratio: Option<Array1<f64>>,
    total_variance: Option<f64>,
    eigenvalues: Option<Array1<f64>>,
}

impl<S: SVDImplementation> Pca<S> {
    /// Fits the principal axes to the rows of `x`.
    ///
    /// Fails when there are fewer than two samples, more components are requested than
    /// features exist, the SVD does not converge, or the data has no variance at all.
    /// Directions whose singular value falls below the rank tolerance are replaced by
    /// orthonormal zero-variance directions, so the model always has the requested
    /// number of components.
    pub fn fit(&mut self, x: ArrayView2<f64>) -> anyhow::Result<()> {
        let (n_samples, n_features) = x.dim();
        if n_samples < 2 {
            bail!("PCA needs at least two samples, got {}", n_samples);
        }
        let n_components = self
            .n_components
            .unwrap_or_else(|| n_features.min(n_samples));
        if n_components == 0 || n_components > n_features {
            bail!(
                "n_components={} must be between 1 and n_features={}",
                n_components,
                n_features
            );
        }
        if x.iter().any(|v| !v.is_finite()) {
            bail!("input contains non-finite values");
        }

        let mean = if self.center {
            x.mean_axis(Axis(0))
                .ok_or_else(|| anyhow!("Failed to compute mean"))?
        } else {
            Array1::zeros(n_features)
        };
        let x_centered = &x - &mean;

        let (s, vt) = self
            .svd_implementation
            .compute(x_centered.view())
            .ok_or_else(|| anyhow!("SVD did not converge"))?;
        if s.iter().any(|v| !v.is_finite()) || vt.iter().any(|v| !v.is_finite()) {
            bail!("SVD produced non-finite values");
        }

        let mut order: Vec<usize> = (0..s.len()).collect();
        order.sort_by(|&a, &b| s[b].partial_cmp(&s[a]).unwrap_or(Ordering::Equal));

        // Rank tolerance relative to the magnitude of the input
        let x_norm = x.iter().map(|v| v * v).sum::<f64>().sqrt();
        let tolerance = f64::EPSILON * n_samples.max(n_features) as f64 * x_norm;
        let rank = order.iter().take_while(|&&i| s[i] > tolerance).count();
        if rank == 0 {
            bail!("data has no variance");
        }

        let denominator = (n_samples - 1) as f64;
        let all_eigenvalues: Array1<f64> = order.iter().map(|&i| s[i] * s[i] / denominator).collect();
        let total_variance = all_eigenvalues.sum();

        let mut components = Array2::zeros((n_components, n_features));
        let mut eigenvalues = Array1::zeros(n_components);
        let available = rank.min(n_components);
        for (k, &idx) in order.iter().take(available).enumerate() {
            components.row_mut(k).assign(&vt.row(idx));
            eigenvalues[k] = all_eigenvalues[k];
        }
        if available < n_components {
            debug!(
                "completing {} zero-variance components",
                n_components - available
            );
            complete_basis(&mut components, available);
        }

        self.explained_variance_ratio = Some(&eigenvalues / total_variance);
        self.components = Some(components);
        self.mean = Some(mean);
        self.total_variance = Some(total_variance);
        self.eigenvalues = Some(eigenvalues);

        Ok(())
    }

    /// Projects the mean-centered rows of `x` onto the fitted components.
    pub fn transform(&self, x: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
        let components = self.fitted_components(x)?;
        let mean = self
            .mean
            .as_ref()
            .ok_or_else(|| anyhow!("PCA has not been fitted yet"))?;

        let x_centered = &x - mean;
        Ok(x_centered.dot(&components.t()))
    }

    /// Projects the rows of `x` as given, without subtracting the fitted mean.
    ///
    /// The result differs from [`Pca::transform`] by a constant offset per component.
    pub fn transform_original(&self, x: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
        let components = self.fitted_components(x)?;
        Ok(x.dot(&components.t()))
    }

    pub fn fit_transform(&mut self, x: ArrayView2<f64>) -> anyhow::Result<Array2<f64>> {
        self.fit(x)?;
        self.transform(x)
    }

    fn fitted_components(&self, x: ArrayView2<f64>) -> anyhow::Result<&Array2<f64>> {
        let components = self
            .components
            .as_ref()
            .ok_or_else(|| anyhow!("PCA has not been fitted yet"))?;
        if x.ncols() != components.ncols() {
            bail!(
                "expected {} features, got {}",
                components.ncols(),
                x.ncols()
            );
        }
        Ok(components)
    }

    pub fn components(&self) -> Option<&Array2<f64>> {
        self.components.as_ref()
    }

    pub fn explained_variance_ratio(&self) -> Option<&Array1<f64>> {
        self.explained_variance_ratio.as_ref()
    }

    /// Running sum of [`Pca::explained_variance_ratio`].
    pub fn cumulative_explained_variance_ratio(&self) -> Option<Array1<f64>> {
        let ratios = self.explained_variance_ratio.as_ref()?;
        let mut sum = 0.0;
        Some(ratios.mapv(|r| {
            sum += r;
            sum
        }))
    }

    pub fn total_variance(&self) -> Option<f64> {
        self.total_variance
    }

    pub fn eigenvalues(&self) -> Option<&Array1<f64>> {
        self.eigenvalues.as_ref()
    }
}

/// Fills rows `filled..` of `components` with unit vectors orthogonal to all previous
/// rows, taken from the canonical basis by modified Gram–Schmidt.
fn complete_basis(components: &mut Array2<f64>, mut filled: usize) {
    let (n_rows, n_features) = components.dim();

    for j in 0..n_features {
        if filled == n_rows {
            break;
        }
        let mut candidate = Array1::<f64>::zeros(n_features);
        candidate[j] = 1.0;
        for r in 0..filled {
            let row = components.row(r);
            let projection = row.dot(&candidate);
            candidate.scaled_add(-projection, &row);
        }
        let norm = candidate.dot(&candidate).sqrt();
        if norm > BASIS_TOLERANCE {
            candidate /= norm;
            components.row_mut(filled).assign(&candidate);
            filled += 1;
        }
    }
}

/// Linear projection strategy: one PCA per group, projecting each group's original
/// vectors onto its own top components.
#[derive(Debug, Clone)]
pub struct PcaProjector<S: SVDImplementation + Clone = NalgebraSVD> {
    svd_implementation: S,
}

impl Default for PcaProjector<NalgebraSVD> {
    fn default() -> Self {
        Self::new(NalgebraSVD::default())
    }
}

impl<S: SVDImplementation + Clone> PcaProjector<S> {
    pub fn new(svd_implementation: S) -> Self {
        PcaProjector { svd_implementation }
    }

    fn project_group(&self, group: &Group, target_dim: usize) -> Result<ProjectedGroup> {
        let x = group.to_matrix()?;
        let mut pca = PCABuilder::new(self.svd_implementation.clone())
            .n_components(target_dim)
            .build();

        let coordinates = pca
            .fit(x.view())
            .and_then(|_| pca.transform_original(x.view()))
            .map_err(|e| ProjectionError::decomposition(&group.name, e.to_string()))?;

        if let Some(ratio) = pca.explained_variance_ratio() {
            debug!("{}: explained variance ratio {}", group.name, ratio);
        }

        Ok(ProjectedGroup::from_rows(group, &coordinates))
    }
}

impl<S: SVDImplementation + Clone> Projector for PcaProjector<S> {
    fn method(&self) -> ProjectionMethod {
        ProjectionMethod::Pca
    }

    fn project(&self, groups: &[Group], target_dim: usize) -> Result<Vec<ProjectedGroup>> {
        project_each(groups, target_dim, true, |group| {
            self.project_group(group, target_dim)
        })
    }
}
