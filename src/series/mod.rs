//! # Series Assembly
//!
//! Flattens projected groups into one [`SeriesRecord`] per point, ready to hand to a
//! chart renderer. How a record is styled depends only on the output dimension and is
//! looked up from [`DimensionStyle`] rather than branched on.

use crate::data::ProjectedGroup;
use crate::dimred::check_target_dimension;
use crate::error::{ProjectionError, Result};
use serde::{Deserialize, Serialize};

/// Presentation rules for one output dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionStyle {
    /// Marker shape shared by every point.
    pub symbol: Option<&'static str>,
    /// Whether each group gets its own color.
    pub colored: bool,
    /// Hover text template; `{a}` is the series identity, `{b}` the point label.
    pub tooltip: Option<&'static str>,
}

const PLANAR: DimensionStyle = DimensionStyle {
    symbol: Some("roundRect"),
    colored: false,
    tooltip: None,
};

const SPATIAL: DimensionStyle = DimensionStyle {
    symbol: None,
    colored: true,
    tooltip: Some("{a}: {b}"),
};

impl DimensionStyle {
    pub fn for_dimension(dimension: usize) -> Result<&'static DimensionStyle> {
        check_target_dimension(dimension)?;
        Ok(if dimension == 2 { &PLANAR } else { &SPATIAL })
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    /// Hover text with the template already filled in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesRecord {
    pub label: String,
    pub coordinates: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub style: SeriesStyle,
}

/// All records of one identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub identity: String,
    pub records: Vec<SeriesRecord>,
}

/// Builds one record per point of every group, in group then point order.
///
/// `colors[i]` colors every point of `groups[i]`. Colors are required for
/// dimensions whose style is colored; a sequence shorter than `groups` is rejected
/// in every dimension.
pub fn assemble(
    identity: &str,
    groups: &[ProjectedGroup],
    dimension: usize,
    colors: Option<&[String]>,
) -> Result<Vec<SeriesRecord>> {
    let style = DimensionStyle::for_dimension(dimension)?;

    let palette = colors.unwrap_or(&[]);
    if (colors.is_some() || style.colored) && palette.len() < groups.len() {
        return Err(ProjectionError::ColorCountMismatch {
            expected: groups.len(),
            found: palette.len(),
        });
    }

    let mut records = Vec::with_capacity(groups.iter().map(|g| g.points.len()).sum());
    for (index, group) in groups.iter().enumerate() {
        let color = style.colored.then(|| palette[index].clone());

        for point in &group.points {
            if point.coordinates.len() != dimension {
                return Err(ProjectionError::MismatchedDimensions {
                    group: group.name.clone(),
                    point: point.name.clone(),
                    expected: dimension,
                    found: point.coordinates.len(),
                });
            }

            let label = format!("{} ({})", point.name, group.name);
            let tooltip = style
                .tooltip
                .map(|template| template.replace("{a}", identity).replace("{b}", &label));

            records.push(SeriesRecord {
                label,
                coordinates: point.coordinates.clone(),
                color: color.clone(),
                style: SeriesStyle {
                    symbol: style.symbol.map(str::to_string),
                    tooltip,
                },
            });
        }
    }

    Ok(records)
}

pub fn assemble_series(
    identity: &str,
    groups: &[ProjectedGroup],
    dimension: usize,
    colors: Option<&[String]>,
) -> Result<Series> {
    Ok(Series {
        identity: identity.to_string(),
        records: assemble(identity, groups, dimension, colors)?,
    })
}
