//! # Dimensionality Reduction
//!
//! Projects each [`Group`] of high-dimensional embeddings into 2 or 3 dimensions so the
//! groups can be plotted. Groups are projected independently and in input order.
//!
//! ## Available strategies
//! - **PCA** ([`pca`]): deterministic linear projection onto the directions of maximal
//!   variance
//! - **t-SNE** ([`tsne`]): stochastic neighbor embedding that preserves local structure;
//!   reproducible only when seeded
//!
//! Both implement [`Projector`]. Input that breaks the caller contract (no groups,
//! unequal vector lengths, unsupported target dimension) fails the whole call before
//! any group is projected. Groups that are too small or whose decomposition fails are
//! logged and left out of the output.

pub mod pca;
pub mod tsne;

use crate::data::{Group, ProjectedGroup};
use crate::error::{ProjectionError, Result};
use crate::svd::NalgebraSVD;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use pca::{PCABuilder, Pca, PcaProjector};
pub use tsne::{TSNEConfig, Tsne};

/// Groups with fewer points carry no usable neighborhood or variance information.
pub const MIN_POINTS: usize = 2;

pub const SUPPORTED_DIMENSIONS: [usize; 2] = [2, 3];

/// A projection strategy applied group by group.
pub trait Projector {
    fn method(&self) -> ProjectionMethod;

    /// Projects every group to `target_dim` coordinates per point.
    ///
    /// The result preserves group order and point order; skipped groups are omitted.
    fn project(&self, groups: &[Group], target_dim: usize) -> Result<Vec<ProjectedGroup>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProjectionMethod {
    #[default]
    Pca,
    Tsne,
}

impl ProjectionMethod {
    /// Builds the projector for this method. `seed` only affects t-SNE.
    pub fn projector(self, seed: Option<u64>) -> Box<dyn Projector> {
        match self {
            ProjectionMethod::Pca => Box::new(PcaProjector::<NalgebraSVD>::default()),
            ProjectionMethod::Tsne => {
                let mut config = TSNEConfig::default();
                if let Some(seed) = seed {
                    config = config.seed(seed);
                }
                Box::new(Tsne::new(config))
            }
        }
    }
}

impl fmt::Display for ProjectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectionMethod::Pca => write!(f, "pca"),
            ProjectionMethod::Tsne => write!(f, "tsne"),
        }
    }
}

impl FromStr for ProjectionMethod {
    type Err = ProjectionError;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("pca") {
            Ok(ProjectionMethod::Pca)
        } else if s.eq_ignore_ascii_case("tsne") || s.eq_ignore_ascii_case("t-sne") {
            Ok(ProjectionMethod::Tsne)
        } else {
            Err(ProjectionError::InvalidConfig(format!(
                "unknown projection method '{}', expected pca or tsne",
                s
            )))
        }
    }
}

impl TryFrom<String> for ProjectionMethod {
    type Error = ProjectionError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ProjectionMethod> for String {
    fn from(method: ProjectionMethod) -> Self {
        method.to_string()
    }
}

pub fn check_target_dimension(target_dim: usize) -> Result<()> {
    if SUPPORTED_DIMENSIONS.contains(&target_dim) {
        Ok(())
    } else {
        Err(ProjectionError::InvalidTargetDimension(target_dim))
    }
}

/// Checks the caller contract for a batch of groups.
///
/// `bounded_by_source` rejects groups whose vectors are shorter than `target_dim`,
/// which a linear projection cannot fill.
pub fn validate_groups(groups: &[Group], target_dim: usize, bounded_by_source: bool) -> Result<()> {
    if groups.is_empty() {
        return Err(ProjectionError::EmptyInput);
    }
    check_target_dimension(target_dim)?;

    for group in groups {
        let Some(source_dim) = group.dimension()? else {
            continue;
        };
        if bounded_by_source && target_dim > source_dim {
            return Err(ProjectionError::TargetExceedsSource {
                group: group.name.clone(),
                target: target_dim,
                source_dim,
            });
        }
    }

    Ok(())
}

/// Shared driver for [`Projector`] implementations: validates the batch, then runs
/// `project_group` on every group large enough, skipping recoverable failures.
pub(crate) fn project_each<F>(
    groups: &[Group],
    target_dim: usize,
    bounded_by_source: bool,
    mut project_group: F,
) -> Result<Vec<ProjectedGroup>>
where
    F: FnMut(&Group) -> Result<ProjectedGroup>,
{
    validate_groups(groups, target_dim, bounded_by_source)?;

    let mut projected = Vec::with_capacity(groups.len());
    for group in groups {
        let outcome = if group.len() < MIN_POINTS {
            Err(ProjectionError::InsufficientData {
                group: group.name.clone(),
                points: group.len(),
            })
        } else {
            project_group(group)
        };

        match outcome {
            Ok(p) => {
                debug!("projected {} ({} points)", p.name, p.points.len());
                projected.push(p);
            }
            Err(e) if e.is_recoverable() => warn!("skipping {}: {}", group.name, e),
            Err(e) => return Err(e),
        }
    }

    Ok(projected)
}
