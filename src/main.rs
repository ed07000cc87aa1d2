//! Command line front end: reads grouped embeddings per identity, projects them and
//! writes the chart document as JSON.
//!
//! Usage:
//!     embedding-projector --input "Taylor Swift=taylor.json" --dim 3 \
//!         --palettes palettes.json --gradient --out chart.json

use anyhow::{bail, Context};
use clap::Parser;
use embedding_projector::data::read_groups;
use embedding_projector::{
    ColorRegistry, Group, Pipeline, PipelineConfig, ProjectionMethod, Series,
};
use log::info;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "embedding-projector")]
#[command(about = "Project grouped embeddings into 2D/3D chart series")]
#[command(version)]
struct Args {
    /// Identity and its groups file, as IDENTITY=PATH (repeatable)
    #[arg(short, long = "input", value_parser = parse_input, required = true)]
    inputs: Vec<(String, PathBuf)>,

    /// Output dimension (2 or 3)
    #[arg(short, long, default_value_t = 2)]
    dim: usize,

    /// Projection method (pca or tsne)
    #[arg(short, long, default_value = "pca")]
    proj: ProjectionMethod,

    /// Color groups along the identity's gradient instead of its solid color
    #[arg(long)]
    gradient: bool,

    /// Seed for t-SNE
    #[arg(long)]
    seed: Option<u64>,

    /// Identity palettes JSON (required for 3D output)
    #[arg(long)]
    palettes: Option<PathBuf>,

    /// Chart title
    #[arg(long, default_value = "Embeddings")]
    title: String,

    /// Output file
    #[arg(short, long, default_value = "embeddings.json")]
    out: PathBuf,
}

#[derive(Serialize)]
struct ChartDocument<'a> {
    title: &'a str,
    subtitle: &'static str,
    dimension: usize,
    series: Vec<Series>,
}

fn parse_input(raw: &str) -> Result<(String, PathBuf), String> {
    match raw.split_once('=') {
        Some((identity, path)) if !identity.is_empty() && !path.is_empty() => {
            Ok((identity.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected IDENTITY=PATH, got '{}'", raw)),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = PipelineConfig::new()
        .target_dimension(args.dim)
        .projection_method(args.proj)
        .use_gradient_colors(args.gradient);
    if let Some(seed) = args.seed {
        config = config.seed(seed);
    }

    let registry = match &args.palettes {
        Some(path) => ColorRegistry::read(path)
            .with_context(|| format!("failed to load palettes from {}", path.display()))?,
        None if args.dim == 3 => bail!("--palettes is required for 3D output"),
        None => ColorRegistry::new(),
    };

    let mut loaded: Vec<(String, Vec<Group>)> = Vec::with_capacity(args.inputs.len());
    for (identity, path) in &args.inputs {
        let groups = read_groups(path)
            .with_context(|| format!("failed to read groups from {}", path.display()))?;
        info!("{}: loaded {} groups", identity, groups.len());
        loaded.push((identity.clone(), groups));
    }

    let pipeline = Pipeline::new(config, registry).context("invalid pipeline configuration")?;
    let series = pipeline.run_all(
        loaded
            .iter()
            .map(|(identity, groups)| (identity.as_str(), groups.as_slice())),
    )?;

    let document = ChartDocument {
        title: &args.title,
        subtitle: "Lyrics Embeddings",
        dimension: args.dim,
        series,
    };
    let file = File::create(&args.out)
        .with_context(|| format!("failed to create {}", args.out.display()))?;
    serde_json::to_writer_pretty(BufWriter::new(file), &document)?;

    info!("wrote {}", args.out.display());
    Ok(())
}
