//! # Embedding Groups
//!
//! In-memory representation of named embedding vectors grouped by a parent collection
//! (e.g. songs of an album), together with the JSON loader that produces them and the
//! projected counterparts emitted by [`crate::dimred`].
//!
//! The input format is a list of groups:
//!
//! ```json
//! [{"name": "Album1", "embeddings": [{"name": "Song1", "vector": [1.0, 0.0, 0.0]}]}]
//! ```

use crate::error::{ProjectionError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

/// A single named embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub name: String,
    pub vector: Vec<f64>,
}

impl Point {
    pub fn new(name: impl Into<String>, vector: Vec<f64>) -> Self {
        Point {
            name: name.into(),
            vector,
        }
    }
}

/// A named collection of points that is projected as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    #[serde(rename = "embeddings")]
    pub points: Vec<Point>,
}

impl Group {
    pub fn new(name: impl Into<String>, points: Vec<Point>) -> Self {
        Group {
            name: name.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Shared vector length of the group, after checking every point agrees on it.
    ///
    /// Returns `Ok(None)` for a group without points.
    pub fn dimension(&self) -> Result<Option<usize>> {
        let Some(first) = self.points.first() else {
            return Ok(None);
        };
        let expected = first.vector.len();

        for point in &self.points[1..] {
            if point.vector.len() != expected {
                return Err(ProjectionError::MismatchedDimensions {
                    group: self.name.clone(),
                    point: point.name.clone(),
                    expected,
                    found: point.vector.len(),
                });
            }
        }

        Ok(Some(expected))
    }

    /// Builds the N×D matrix whose row `i` is the vector of point `i`.
    pub fn to_matrix(&self) -> Result<Array2<f64>> {
        let n_dim = self.dimension()?.unwrap_or(0);
        let values: Vec<f64> = self
            .points
            .iter()
            .flat_map(|p| p.vector.iter().copied())
            .collect();

        Array2::from_shape_vec((self.points.len(), n_dim), values).map_err(|e| {
            ProjectionError::decomposition(&self.name, format!("cannot build matrix: {}", e))
        })
    }
}

/// A point after projection; `coordinates` has the target dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPoint {
    pub name: String,
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedGroup {
    pub name: String,
    pub points: Vec<ProjectedPoint>,
}

impl ProjectedGroup {
    /// Pairs row `i` of `coordinates` with point `i` of `source`.
    pub(crate) fn from_rows(source: &Group, coordinates: &Array2<f64>) -> Self {
        let points = source
            .points
            .iter()
            .zip(coordinates.rows())
            .map(|(point, row)| ProjectedPoint {
                name: point.name.clone(),
                coordinates: row.to_vec(),
            })
            .collect();

        ProjectedGroup {
            name: source.name.clone(),
            points,
        }
    }
}

pub fn parse_groups(input: &str) -> Result<Vec<Group>> {
    Ok(serde_json::from_str(input)?)
}

pub fn read_groups_from<R: Read>(reader: R) -> Result<Vec<Group>> {
    Ok(serde_json::from_reader(reader)?)
}

/// Reads a JSON group file from disk.
pub fn read_groups<P: AsRef<Path>>(path: P) -> Result<Vec<Group>> {
    let file = File::open(path.as_ref())?;
    let groups = read_groups_from(BufReader::new(file))?;
    log::debug!(
        "loaded {} groups from {}",
        groups.len(),
        path.as_ref().display()
    );
    Ok(groups)
}
