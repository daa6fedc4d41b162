use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::effects::blend::{BlendOp, CompositeOp};
use crate::foundation::core::Rect;
use crate::foundation::error::{CartoError, CartoResult};
use crate::render::backend::FillRule;
use crate::render::session::DEFAULT_FLUSH_THRESHOLD;
use crate::render::stroke::StrokeStyle;

/// Overrides [`RendererOpts::flush_vertex_threshold`] when set to a positive integer.
pub const FLUSH_THRESHOLD_ENV: &str = "CARTOBLEND_FLUSH_THRESHOLD";

fn parse_json<T: DeserializeOwned>(json: &str, what: &str) -> CartoResult<T> {
    serde_json::from_str(json)
        .map_err(|e| CartoError::configuration(format!("parse {what} JSON: {e}")))
}

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> CartoResult<T> {
    let f = File::open(path).map_err(|e| {
        CartoError::configuration(format!("open {what} JSON '{}': {e}", path.display()))
    })?;
    serde_json::from_reader(BufReader::new(f))
        .map_err(|e| CartoError::configuration(format!("parse {what} JSON: {e}")))
}

/// Resolve an optional comp-op name. Unknown or unsupported names degrade to `src-over`.
pub fn resolve_comp_op(name: Option<&str>) -> Option<BlendOp> {
    let name = name?;
    let op = match name.parse::<CompositeOp>() {
        Ok(op) => BlendOp::resolve(op),
        Err(_) => {
            tracing::warn!(comp_op = name, "unknown comp-op, using src-over");
            BlendOp::SrcOver
        }
    };
    Some(op.or_src_over())
}

/// Renderer-wide options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererOpts {
    /// Multiplier for stroke widths, dash lengths, marker sizes and clip padding.
    pub scale_factor: f64,
    /// Early-flush threshold in coordinate units (two per accumulated vertex).
    pub flush_vertex_threshold: usize,
    /// Straight-alpha RGBA8 background.
    pub background: Option<[u8; 4]>,
    /// Pixels the label collision extent reaches past each map edge.
    pub label_buffer: f64,
}

impl Default for RendererOpts {
    fn default() -> Self {
        Self {
            scale_factor: 1.0,
            flush_vertex_threshold: DEFAULT_FLUSH_THRESHOLD,
            background: None,
            label_buffer: 0.0,
        }
    }
}

impl RendererOpts {
    pub fn from_json(json: &str) -> CartoResult<Self> {
        parse_json(json, "renderer options")
    }

    pub fn from_path(path: impl AsRef<Path>) -> CartoResult<Self> {
        read_json(path.as_ref(), "renderer options")
    }

    /// Apply tuning overrides from the process environment.
    pub fn from_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply tuning overrides from an arbitrary key lookup.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(n) = lookup(FLUSH_THRESHOLD_ENV)
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
        {
            self.flush_vertex_threshold = n;
        }
        self
    }

    pub fn validate(&self) -> CartoResult<()> {
        if !self.scale_factor.is_finite() || self.scale_factor <= 0.0 {
            return Err(CartoError::validation(format!(
                "scale_factor must be finite and > 0 (got {})",
                self.scale_factor
            )));
        }
        if self.flush_vertex_threshold == 0 {
            return Err(CartoError::validation("flush_vertex_threshold must be > 0"));
        }
        if !self.label_buffer.is_finite() {
            return Err(CartoError::validation("label_buffer must be finite"));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    pub name: String,
    /// Extra pixels queried around the view so features crossing the edge still render.
    pub buffer_size: i32,
    /// `[minx, miny, maxx, maxy]`.
    pub maximum_extent: Option<[f64; 4]>,
    /// Forget placed labels before this layer draws.
    pub clear_label_cache: bool,
}

impl LayerConfig {
    pub fn from_json(json: &str) -> CartoResult<Self> {
        parse_json(json, "layer")
    }

    pub fn maximum_extent_rect(&self) -> Option<Rect> {
        self.maximum_extent
            .map(|[x0, y0, x1, y1]| Rect::new(x0, y0, x1, y1))
    }
}

/// Image filter configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterSpec {
    Blur {
        radius: u32,
        #[serde(default)]
        sigma: Option<f32>,
    },
    Gray,
    Invert,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub comp_op: Option<String>,
    pub opacity: f32,
    /// Applied to the isolated buffer before it merges.
    pub image_filters: Vec<FilterSpec>,
    /// Applied to the main target after the merge.
    pub direct_image_filters: Vec<FilterSpec>,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            comp_op: None,
            opacity: 1.0,
            image_filters: Vec::new(),
            direct_image_filters: Vec::new(),
        }
    }
}

impl StyleConfig {
    pub fn from_json(json: &str) -> CartoResult<Self> {
        parse_json(json, "style")
    }

    pub fn from_path(path: impl AsRef<Path>) -> CartoResult<Self> {
        read_json(path.as_ref(), "style")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillRuleDef {
    #[default]
    NonZero,
    EvenOdd,
}

impl From<FillRuleDef> for FillRule {
    fn from(v: FillRuleDef) -> Self {
        match v {
            FillRuleDef::NonZero => FillRule::NonZero,
            FillRuleDef::EvenOdd => FillRule::EvenOdd,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolygonSymbolizer {
    /// Straight-alpha RGBA8.
    pub fill: [u8; 4],
    pub opacity: f32,
    pub comp_op: Option<String>,
    pub fill_rule: FillRuleDef,
}

impl Default for PolygonSymbolizer {
    fn default() -> Self {
        Self {
            fill: [128, 128, 128, 255],
            opacity: 1.0,
            comp_op: None,
            fill_rule: FillRuleDef::NonZero,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineSymbolizer {
    #[serde(flatten)]
    pub stroke: StrokeStyle,
    pub comp_op: Option<String>,
    /// Cull features outside the padded line clip extent.
    pub clip: bool,
    /// Perpendicular offset in pixels; only widens the clip extent.
    pub offset: f64,
}

impl Default for LineSymbolizer {
    fn default() -> Self {
        Self {
            stroke: StrokeStyle::default(),
            comp_op: None,
            clip: true,
            offset: 0.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointSymbolizer {
    /// Marker name looked up in the marker source.
    pub file: String,
    pub opacity: f32,
    pub allow_overlap: bool,
    pub ignore_placement: bool,
    pub comp_op: Option<String>,
}

impl Default for PointSymbolizer {
    fn default() -> Self {
        Self {
            file: String::new(),
            opacity: 1.0,
            allow_overlap: false,
            ignore_placement: false,
            comp_op: None,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/model.rs"]
mod tests;
