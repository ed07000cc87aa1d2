pub mod color;
pub mod data;
pub mod dimred;
pub mod error;
pub mod pipeline;
pub mod series;
pub mod svd;

pub use color::{ColorRegistry, Gradient};
pub use data::{Group, Point, ProjectedGroup, ProjectedPoint};
pub use dimred::{ProjectionMethod, Projector};
pub use error::{ProjectionError, Result};
pub use pipeline::{Pipeline, PipelineConfig};
pub use series::{assemble, Series, SeriesRecord};
