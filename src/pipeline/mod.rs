//! # Projection Pipeline
//!
//! Ties the pieces together for one or more identities: project every group with the
//! configured strategy, pick colors for the surviving groups and assemble the series.
//! All settings travel in one immutable [`PipelineConfig`].

use crate::color::ColorRegistry;
use crate::data::{Group, ProjectedGroup};
use crate::dimred::{check_target_dimension, ProjectionMethod, Projector};
use crate::error::Result;
use crate::series::{assemble_series, DimensionStyle, Series};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    pub target_dimension: usize,
    pub projection_method: ProjectionMethod,
    pub use_gradient_colors: bool,
    /// Seeds the stochastic projection. Without it t-SNE output changes between runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            target_dimension: 2,
            projection_method: ProjectionMethod::Pca,
            use_gradient_colors: false,
            seed: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target_dimension(mut self, target_dimension: usize) -> Self {
        self.target_dimension = target_dimension;
        self
    }

    pub fn projection_method(mut self, projection_method: ProjectionMethod) -> Self {
        self.projection_method = projection_method;
        self
    }

    pub fn use_gradient_colors(mut self, use_gradient_colors: bool) -> Self {
        self.use_gradient_colors = use_gradient_colors;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_target_dimension(self.target_dimension)
    }

    pub fn from_json(input: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    registry: ColorRegistry,
    projector: Box<dyn Projector>,
}

impl Pipeline {
    /// Builds a pipeline using the projector named by `config.projection_method`.
    pub fn new(config: PipelineConfig, registry: ColorRegistry) -> Result<Self> {
        let projector = config.projection_method.projector(config.seed);
        Self::with_projector(config, registry, projector)
    }

    /// Builds a pipeline around a caller-supplied projection strategy.
    pub fn with_projector(
        config: PipelineConfig,
        registry: ColorRegistry,
        projector: Box<dyn Projector>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Pipeline {
            config,
            registry,
            projector,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn registry(&self) -> &ColorRegistry {
        &self.registry
    }

    pub fn project(&self, groups: &[Group]) -> Result<Vec<ProjectedGroup>> {
        self.projector.project(groups, self.config.target_dimension)
    }

    /// One color per projected group, or `None` when the output dimension is drawn
    /// without per-group colors.
    pub fn colors(&self, identity: &str, group_count: usize) -> Result<Option<Vec<String>>> {
        let style = DimensionStyle::for_dimension(self.config.target_dimension)?;
        if !style.colored {
            return Ok(None);
        }
        self.registry
            .colors(identity, self.config.use_gradient_colors, group_count)
            .map(Some)
    }

    /// Projects, colors and assembles the groups of a single identity.
    pub fn run(&self, identity: &str, groups: &[Group]) -> Result<Series> {
        let projected = self.project(groups)?;
        info!(
            "{}: projected {} of {} groups with {}",
            identity,
            projected.len(),
            groups.len(),
            self.projector.method()
        );

        let colors = self.colors(identity, projected.len())?;
        assemble_series(
            identity,
            &projected,
            self.config.target_dimension,
            colors.as_deref(),
        )
    }

    /// Runs every `(identity, groups)` pair in order, stopping at the first fatal error.
    pub fn run_all<'a, I>(&self, inputs: I) -> Result<Vec<Series>>
    where
        I: IntoIterator<Item = (&'a str, &'a [Group])>,
    {
        inputs
            .into_iter()
            .map(|(identity, groups)| self.run(identity, groups))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Gradient;
    use crate::data::{parse_groups, Point};
    use crate::dimred::test_support::{album, clustered, single};
    use crate::error::ProjectionError;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn registry() -> ColorRegistry {
        let mut registry = ColorRegistry::new();
        registry
            .register("Taylor Swift", "yellow", Gradient::yl_or_rd())
            .unwrap()
            .register("Masterplan", "black", Gradient::greys().unwrap())
            .unwrap();
        registry
    }

    fn second_album() -> Group {
        Group::new(
            "Album2",
            vec![
                Point::new("Song4", vec![1.0, 1.0, 0.0]),
                Point::new("Song5", vec![0.0, 1.0, 1.0]),
                Point::new("Song6", vec![1.0, 0.0, 1.0]),
            ],
        )
    }

    #[test]
    fn test_config_from_json() {
        let config = PipelineConfig::from_json(
            r#"{"targetDimension": 3, "projectionMethod": "tsne", "useGradientColors": true, "seed": 7}"#,
        )
        .unwrap();
        assert_eq!(
            config,
            PipelineConfig::new()
                .target_dimension(3)
                .projection_method(ProjectionMethod::Tsne)
                .use_gradient_colors(true)
                .seed(7)
        );

        let defaults = PipelineConfig::from_json("{}").unwrap();
        assert_eq!(defaults, PipelineConfig::default());

        assert!(matches!(
            PipelineConfig::from_json(r#"{"targetDimension": 5}"#),
            Err(ProjectionError::InvalidTargetDimension(5))
        ));
    }

    #[test]
    fn test_pipeline_rejects_invalid_dimension() {
        let config = PipelineConfig::new().target_dimension(1);
        assert!(Pipeline::new(config, registry()).is_err());
    }

    #[test]
    fn test_end_to_end_album_pca() {
        init();
        let groups = parse_groups(
            r#"[{"name":"Album1","embeddings":[
                {"name":"Song1","vector":[1,0,0]},
                {"name":"Song2","vector":[0,1,0]},
                {"name":"Song3","vector":[0,0,1]}]}]"#,
        )
        .unwrap();
        let pipeline = Pipeline::new(PipelineConfig::default(), registry()).unwrap();

        let projected = pipeline.project(&groups).unwrap();
        assert_eq!(projected.len(), 1);
        assert_eq!(projected[0].name, "Album1");
        assert_eq!(projected[0].points.len(), 3);
        assert!(projected[0].points.iter().all(|p| p.coordinates.len() == 2));

        let series = pipeline.run("Taylor Swift", &groups).unwrap();
        assert_eq!(series.records.len(), 3);
        assert_eq!(series.records[0].label, "Song1 (Album1)");
        assert!(series.records.iter().all(|r| r.color.is_none()));
    }

    #[test]
    fn test_planar_run_does_not_need_registered_identity() {
        let pipeline = Pipeline::new(PipelineConfig::default(), ColorRegistry::new()).unwrap();
        let series = pipeline.run("Anyone", &[album()]).unwrap();
        assert_eq!(series.records.len(), 3);
    }

    #[test]
    fn test_spatial_run_colors_groups_in_order() {
        init();
        let config = PipelineConfig::new()
            .target_dimension(3)
            .use_gradient_colors(true);
        let pipeline = Pipeline::new(config, registry()).unwrap();

        let groups = vec![album(), single(), second_album()];
        let series = pipeline.run("Masterplan", &groups).unwrap();

        // the single-point group is skipped, so only two colors are drawn
        assert_eq!(series.records.len(), 6);
        assert!(series.records.iter().all(|r| !r.label.contains("Single")));
        assert_eq!(series.records[0].color.as_deref(), Some("#000000"));
        assert_eq!(series.records[2].color.as_deref(), Some("#000000"));
        assert_eq!(series.records[3].color.as_deref(), Some("#ffffff"));
        assert_eq!(
            series.records[3].style.tooltip.as_deref(),
            Some("Masterplan: Song4 (Album2)")
        );
    }

    #[test]
    fn test_spatial_run_solid_colors() {
        let config = PipelineConfig::new().target_dimension(3);
        let pipeline = Pipeline::new(config, registry()).unwrap();
        let series = pipeline
            .run("Taylor Swift", &[album(), second_album()])
            .unwrap();
        assert!(series
            .records
            .iter()
            .all(|r| r.color.as_deref() == Some("yellow")));
    }

    #[test]
    fn test_spatial_run_unknown_identity() {
        let config = PipelineConfig::new().target_dimension(3);
        let pipeline = Pipeline::new(config, registry()).unwrap();
        assert!(matches!(
            pipeline.run("Nobody", &[album()]),
            Err(ProjectionError::UnknownIdentity(_))
        ));
    }

    #[test]
    fn test_single_point_groups_never_assembled() {
        for method in [ProjectionMethod::Pca, ProjectionMethod::Tsne] {
            for gradient in [false, true] {
                for dim in [2, 3] {
                    let config = PipelineConfig::new()
                        .target_dimension(dim)
                        .projection_method(method)
                        .use_gradient_colors(gradient)
                        .seed(11);
                    let pipeline = Pipeline::new(config, registry()).unwrap();
                    let series = pipeline
                        .run("Taylor Swift", &[single(), album()])
                        .unwrap();
                    assert_eq!(series.records.len(), 3);
                    assert!(series.records.iter().all(|r| !r.label.contains("Lonely")));
                }
            }
        }
    }

    #[test]
    fn test_run_all_keeps_identity_order() {
        let pipeline = Pipeline::new(PipelineConfig::default(), registry()).unwrap();
        let first = vec![album()];
        let second = vec![clustered("Live", 3, 4)];

        let series = pipeline
            .run_all([
                ("Taylor Swift", first.as_slice()),
                ("Masterplan", second.as_slice()),
            ])
            .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series[0].identity, "Taylor Swift");
        assert_eq!(series[1].identity, "Masterplan");
        assert_eq!(series[1].records.len(), 6);
    }

    #[test]
    fn test_empty_input_is_contract_violation() {
        let pipeline = Pipeline::new(PipelineConfig::default(), registry()).unwrap();
        assert!(matches!(
            pipeline.run("Taylor Swift", &[]),
            Err(ProjectionError::EmptyInput)
        ));
    }
}
