//! # Color Identities
//!
//! Assigns colors to projected groups using `colorgrad` scales. Each identity (e.g. an
//! artist whose albums are plotted together) is registered with a solid default color
//! and a gradient palette.
//! Lookups of unregistered identities fail with
//! [`ProjectionError::UnknownIdentity`]; there is no fallback color.
//!
//! Palettes can be registered in code or loaded from JSON:
//!
//! ```json
//! {
//!   "Taylor Swift": {"defaultColor": "yellow", "gradient": "yl_or_rd"},
//!   "Masterplan": {"defaultColor": "black", "gradient": ["#000000", "#ffffff"]}
//! }
//! ```

use crate::error::{ProjectionError, Result};
use colorgrad::Gradient as _;
use colorgrad::{BasisGradient, Color, GradientBuilder, LinearGradient};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Parses `#rgb`, `#rrggbb`, CSS color names and the other forms colorgrad accepts.
pub fn parse_color(input: &str) -> Result<Color> {
    input
        .trim()
        .parse::<Color>()
        .map_err(|_| ProjectionError::InvalidColor(input.to_string()))
}

/// A color scale over the domain `[0, 1]`.
#[derive(Clone)]
pub struct Gradient {
    name: String,
    scale: Arc<dyn colorgrad::Gradient + Send + Sync>,
}

impl fmt::Debug for Gradient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gradient").field("name", &self.name).finish()
    }
}

impl Gradient {
    /// Linear RGB blend through `stops`, evenly spaced. A single stop gives a constant
    /// scale.
    pub fn new(stops: Vec<Color>) -> Result<Self> {
        let mut stops = stops;
        match stops.len() {
            0 => {
                return Err(ProjectionError::InvalidConfig(
                    "a gradient needs at least one color".to_string(),
                ))
            }
            1 => stops.push(stops[0].clone()),
            _ => {}
        }

        let scale = GradientBuilder::new()
            .colors(&stops)
            .build::<LinearGradient>()
            .map_err(|e| ProjectionError::InvalidConfig(format!("invalid gradient: {}", e)))?;

        Ok(Gradient {
            name: "custom".to_string(),
            scale: Arc::new(scale),
        })
    }

    pub fn from_colors<I, S>(colors: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stops = colors
            .into_iter()
            .map(|c| parse_color(c.as_ref()))
            .collect::<Result<Vec<Color>>>()?;
        Self::new(stops)
    }

    /// ColorBrewer YlOrRd as a basis spline, yellow to dark red.
    pub fn yl_or_rd() -> Self {
        let scale: BasisGradient = colorgrad::preset::yl_or_rd();
        Gradient {
            name: "yl_or_rd".to_string(),
            scale: Arc::new(scale),
        }
    }

    /// Black to white.
    pub fn greys() -> Result<Self> {
        let mut gradient = Self::new(vec![
            Color::new(0.0, 0.0, 0.0, 1.0),
            Color::new(1.0, 1.0, 1.0, 1.0),
        ])?;
        gradient.name = "greys".to_string();
        Ok(gradient)
    }

    pub fn preset(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "yl_or_rd" | "ylorrd" => Ok(Self::yl_or_rd()),
            "greys" | "grays" | "default" => Self::greys(),
            _ => Err(ProjectionError::InvalidConfig(format!(
                "unknown gradient preset '{}'",
                name
            ))),
        }
    }

    /// Preset name, or `"custom"` for scales built from explicit stops.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Color at position `t`, clamped to `[0, 1]`.
    pub fn at(&self, t: f64) -> Color {
        self.scale.at(t.clamp(0.0, 1.0) as f32)
    }

    /// `count` colors evenly spaced from the start to the end of the scale.
    pub fn sample(&self, count: usize) -> Vec<Color> {
        match count {
            0 => Vec::new(),
            1 => vec![self.at(0.0)],
            _ => self.scale.colors(count),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IdentityPalette {
    default_color: String,
    gradient: Gradient,
}

impl IdentityPalette {
    /// `default_color` is kept as written (e.g. `"yellow"`) once it parses as a color.
    pub fn new(default_color: impl Into<String>, gradient: Gradient) -> Result<Self> {
        let default_color = default_color.into();
        parse_color(&default_color)?;
        Ok(IdentityPalette {
            default_color,
            gradient,
        })
    }

    pub fn default_color(&self) -> &str {
        &self.default_color
    }

    pub fn gradient(&self) -> &Gradient {
        &self.gradient
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GradientSpec {
    Preset(String),
    Stops(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaletteSpec {
    default_color: String,
    gradient: GradientSpec,
}

/// Identity name → palette.
#[derive(Debug, Clone, Default)]
pub struct ColorRegistry {
    identities: HashMap<String, IdentityPalette>,
}

impl ColorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the palette of `identity`.
    pub fn register(
        &mut self,
        identity: impl Into<String>,
        default_color: &str,
        gradient: Gradient,
    ) -> Result<&mut Self> {
        let palette = IdentityPalette::new(default_color, gradient)?;
        self.identities.insert(identity.into(), palette);
        Ok(self)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.identities.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn palette(&self, identity: &str) -> Result<&IdentityPalette> {
        self.identities
            .get(identity)
            .ok_or_else(|| ProjectionError::UnknownIdentity(identity.to_string()))
    }

    /// `count` colors for `identity`: repetitions of its default color, or samples
    /// spread evenly over its gradient.
    pub fn colors(&self, identity: &str, use_gradient: bool, count: usize) -> Result<Vec<String>> {
        let palette = self.palette(identity)?;
        if use_gradient {
            Ok(palette
                .gradient
                .sample(count)
                .iter()
                .map(Color::to_hex_string)
                .collect())
        } else {
            Ok(vec![palette.default_color.clone(); count])
        }
    }

    pub fn from_json(input: &str) -> Result<Self> {
        let specs: BTreeMap<String, PaletteSpec> = serde_json::from_str(input)?;
        let mut registry = ColorRegistry::new();

        for (identity, spec) in specs {
            let gradient = match spec.gradient {
                GradientSpec::Preset(name) => Gradient::preset(&name).map_err(|e| {
                    ProjectionError::InvalidConfig(format!("identity '{}': {}", identity, e))
                })?,
                GradientSpec::Stops(colors) => Gradient::from_colors(&colors)?,
            };
            registry.register(identity, &spec.default_color, gradient)?;
        }

        Ok(registry)
    }

    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let input = std::fs::read_to_string(path)?;
        Self::from_json(&input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ColorRegistry {
        let mut registry = ColorRegistry::new();
        registry
            .register("A", "yellow", Gradient::yl_or_rd())
            .unwrap()
            .register("B", "#000", Gradient::greys().unwrap())
            .unwrap();
        registry
    }

    fn hex(colors: &[Color]) -> Vec<String> {
        colors.iter().map(Color::to_hex_string).collect()
    }

    #[test]
    fn test_parse_colors() {
        assert_eq!(parse_color("#ffa500").unwrap().to_hex_string(), "#ffa500");
        assert_eq!(parse_color("#FFF").unwrap().to_hex_string(), "#ffffff");
        assert_eq!(parse_color("Yellow").unwrap().to_hex_string(), "#ffff00");
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("#gggggg").is_err());
        assert!(matches!(
            parse_color("chartreuse-ish"),
            Err(ProjectionError::InvalidColor(c)) if c == "chartreuse-ish"
        ));
    }

    #[test]
    fn test_solid_colors_repeat_default() {
        let colors = registry().colors("A", false, 5).unwrap();
        assert_eq!(colors, vec!["yellow"; 5]);
    }

    #[test]
    fn test_gradient_colors_follow_palette_order() {
        let colors = registry().colors("A", true, 5).unwrap();
        assert_eq!(colors.len(), 5);
        assert_eq!(colors[0], "#ffffcc");
        assert_eq!(colors[4], "#800026");

        let mut distinct = colors.clone();
        distinct.sort();
        distinct.dedup();
        assert_eq!(distinct.len(), 5);

        // yellow to red: green falls monotonically along the scale
        let green: Vec<u8> = colors
            .iter()
            .map(|c| parse_color(c).unwrap().to_rgba8()[1])
            .collect();
        assert!(green.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_gradient_sampling_is_pure() {
        let registry = registry();
        let first = registry.colors("A", true, 3).unwrap();
        let second = registry.colors("A", true, 3).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_identities_use_their_own_palette() {
        let colors = registry().colors("B", true, 3).unwrap();
        assert_eq!(colors, vec!["#000000", "#808080", "#ffffff"]);
    }

    #[test]
    fn test_unknown_identity() {
        let err = registry().colors("unknown", false, 1).unwrap_err();
        assert!(matches!(err, ProjectionError::UnknownIdentity(name) if name == "unknown"));
    }

    #[test]
    fn test_sample_edge_counts() {
        let gradient = Gradient::yl_or_rd();
        assert!(gradient.sample(0).is_empty());
        assert_eq!(hex(&gradient.sample(1)), vec!["#ffffcc"]);

        let constant = Gradient::from_colors(["#010203"]).unwrap();
        assert_eq!(hex(&constant.sample(3)), vec!["#010203"; 3]);
        assert!(Gradient::new(vec![]).is_err());
        assert!(Gradient::from_colors(["black", "nope"]).is_err());
    }

    #[test]
    fn test_at_clamps_to_domain() {
        let greys = Gradient::greys().unwrap();
        assert_eq!(greys.at(-1.0).to_hex_string(), "#000000");
        assert_eq!(greys.at(2.0).to_hex_string(), "#ffffff");
    }

    #[test]
    fn test_register_rejects_invalid_default() {
        let mut registry = ColorRegistry::new();
        assert!(registry
            .register("A", "not a color", Gradient::yl_or_rd())
            .is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_from_json() {
        let registry = ColorRegistry::from_json(
            r##"{
                "Taylor Swift": {"defaultColor": "yellow", "gradient": "yl_or_rd"},
                "Masterplan": {"defaultColor": "black", "gradient": ["#000000", "#ffffff"]}
            }"##,
        )
        .unwrap();

        assert_eq!(registry.len(), 2);
        assert_eq!(
            registry.palette("Taylor Swift").unwrap().gradient().name(),
            "yl_or_rd"
        );
        assert_eq!(
            registry.colors("Masterplan", true, 2).unwrap(),
            vec!["#000000", "#ffffff"]
        );
        assert_eq!(registry.colors("Masterplan", false, 1).unwrap(), vec!["black"]);
    }

    #[test]
    fn test_registry_from_json_unknown_preset() {
        let err = ColorRegistry::from_json(
            r#"{"A": {"defaultColor": "red", "gradient": "rainbow"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ProjectionError::InvalidConfig(_)));
    }
}
