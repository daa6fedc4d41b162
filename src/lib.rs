//! cartoblend is a layered map compositing renderer.
//!
//! A [`MapRenderer`] walks map → layer → style → feature:
//!
//! - Polygon and line features are accumulated by a [`VectorDrawSession`] and drawn with a
//!   stencil-then-cover pair on a [`RasterizationBackend`]
//! - Styles that set a comp-op, filters or partial opacity render into an isolated buffer
//!   merged with one of the [`CompositeOp`] formulas
//! - Point markers pass through a [`LabelPlacementGate`] before they are drawn
//!
//! Pixels stay premultiplied until [`MapRenderer::finish`] reads the frame back.
#![forbid(unsafe_code)]

pub mod effects;
pub mod foundation;
pub mod geometry;
pub mod label;
pub mod render;
/// Serde configuration for renderer, layers, styles and symbolizers.
pub mod scene;

pub use crate::foundation::core::{
    Affine, BezPath, Canvas, ColorSample, Point, Rect, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{CartoError, CartoResult};

pub use crate::effects::blend::{BlendOp, CompositeOp};
pub use crate::geometry::extract::{PathBuffers, PathCmd, PathExtractor};
pub use crate::geometry::vertex::{PathStorage, Vertex, VertexCmd};
pub use crate::label::{CollisionDetector, LabelPlacementGate};
pub use crate::render::backend::{FillRule, FrameRGBA, Paint, RasterizationBackend};
pub use crate::render::cpu::{CpuBackend, CpuBackendOpts};
pub use crate::render::marker::{Marker, MarkerCache, MarkerSource, PlacementOutcome, PremulImage};
pub use crate::render::pipeline::{CompositingPipeline, ResolvedStyle};
pub use crate::render::renderer::MapRenderer;
pub use crate::render::session::VectorDrawSession;
pub use crate::render::stroke::{LineCap, LineJoin, StrokeStyle};
pub use crate::scene::model::{
    LayerConfig, LineSymbolizer, PointSymbolizer, PolygonSymbolizer, RendererOpts, StyleConfig,
};
