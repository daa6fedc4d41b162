use kurbo::{Affine, BezPath, Point, Rect, Shape};

use crate::effects::blend::BlendOp;
use crate::effects::composite::composite_at;
use crate::foundation::core::Canvas;
use crate::foundation::error::{CartoError, CartoResult};
use crate::foundation::math::{premultiply_rgba8, unpremultiply_in_place};
use crate::geometry::extent::{QueryExtent, rects_intersect};
use crate::geometry::vertex::{PathStorage, Vertex};
use crate::label::{CollisionDetector, LabelPlacementGate};
use crate::render::backend::{FrameRGBA, Paint, RasterizationBackend};
use crate::render::cpu::CpuBackend;
use crate::render::marker::{
    Marker, MarkerPlacement, MarkerSource, PlacementOutcome, PremulImage, draw_bitmap_marker,
    draw_vector_marker,
};
use crate::render::pipeline::{CompositingPipeline, ResolvedStyle};
use crate::render::session::VectorDrawSession;
use crate::scene::model::{
    LayerConfig, LineSymbolizer, PointSymbolizer, PolygonSymbolizer, RendererOpts,
    resolve_comp_op,
};

/// Renders one map: layers bracket styles, styles bracket symbolizer draws.
///
/// Features are given in map units and mapped to device pixels with the view transform
/// (y grows downward on the surface). The pass ends with [`MapRenderer::finish`].
pub struct MapRenderer<B = CpuBackend, G = CollisionDetector> {
    opts: RendererOpts,
    canvas: Canvas,
    map_extent: Rect,
    view: Affine,
    pipeline: CompositingPipeline,
    session: VectorDrawSession,
    backend: B,
    gate: G,
    layer: Option<OpenLayer>,
}

#[derive(Clone, Debug)]
struct OpenLayer {
    name: String,
    query: QueryExtent,
}

impl MapRenderer {
    /// Start a map with the CPU backend and a collision detector over the padded canvas.
    pub fn new(canvas: Canvas, map_extent: Rect, opts: RendererOpts) -> CartoResult<Self> {
        let gate = CollisionDetector::for_canvas(canvas, opts.label_buffer);
        Self::with_parts(canvas, map_extent, opts, CpuBackend::default(), gate)
    }
}

impl<B: RasterizationBackend, G: LabelPlacementGate> MapRenderer<B, G> {
    #[tracing::instrument(skip_all, fields(width = canvas.width, height = canvas.height))]
    pub fn with_parts(
        canvas: Canvas,
        map_extent: Rect,
        opts: RendererOpts,
        backend: B,
        gate: G,
    ) -> CartoResult<Self> {
        opts.validate()?;
        let view = view_transform(canvas, map_extent)?;
        let mut pipeline = CompositingPipeline::new(canvas)?;
        if let Some(bg) = opts.background {
            pipeline.main_mut().clear(premultiply_rgba8(bg));
        }
        let session = VectorDrawSession::new(opts.flush_vertex_threshold, opts.scale_factor);
        Ok(Self {
            opts,
            canvas,
            map_extent,
            view,
            pipeline,
            session,
            backend,
            gate,
            layer: None,
        })
    }

    pub fn opts(&self) -> &RendererOpts {
        &self.opts
    }

    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    pub fn map_extent(&self) -> Rect {
        self.map_extent
    }

    /// Map units to device pixels.
    pub fn view_transform(&self) -> Affine {
        self.view
    }

    pub fn pipeline(&self) -> &CompositingPipeline {
        &self.pipeline
    }

    pub fn session(&self) -> &VectorDrawSession {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// Query extent of the open layer.
    pub fn query_extent(&self) -> Option<QueryExtent> {
        self.layer.as_ref().map(|l| l.query)
    }

    /// Tile `image` over the whole surface with src-over.
    pub fn set_background_image(&mut self, image: &PremulImage) -> CartoResult<()> {
        if image.width == 0 || image.height == 0 {
            return Ok(());
        }
        let (w, h) = (self.canvas.width, self.canvas.height);
        let main = self.pipeline.main_mut();
        for y in (0..h).step_by(image.height as usize) {
            for x in (0..w).step_by(image.width as usize) {
                composite_at(
                    main.data_mut(),
                    w,
                    h,
                    &image.view(),
                    (x as i32, y as i32),
                    BlendOp::SrcOver,
                    1.0,
                )?;
            }
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(layer = %layer.name))]
    pub fn start_layer(&mut self, layer: &LayerConfig) -> CartoResult<()> {
        if self.layer.is_some() {
            return Err(CartoError::validation(
                "start_layer called while another layer is open",
            ));
        }
        if layer.clear_label_cache {
            self.gate.clear();
        }
        let query = QueryExtent::new(
            self.map_extent,
            self.canvas.width,
            layer.buffer_size,
            layer.maximum_extent_rect(),
        );
        tracing::debug!(query = ?query.rect(), buffer = layer.buffer_size, "layer query extent");
        self.layer = Some(OpenLayer {
            name: layer.name.clone(),
            query,
        });
        Ok(())
    }

    pub fn end_layer(&mut self) -> CartoResult<()> {
        if self.pipeline.style_open() {
            return Err(CartoError::validation("end_layer called with a style still open"));
        }
        match self.layer.take() {
            Some(l) => {
                tracing::debug!(layer = %l.name, "layer done");
                Ok(())
            }
            None => Err(CartoError::validation("end_layer called without start_layer")),
        }
    }

    pub fn start_style(&mut self, style: &ResolvedStyle) -> CartoResult<()> {
        self.open_layer()?;
        self.pipeline.begin_style(style)
    }

    pub fn end_style(&mut self, style: &ResolvedStyle) -> CartoResult<()> {
        self.pipeline.end_style(style)
    }

    /// Fill polygon features. Returns the number of draw calls issued.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn render_polygons<'a, I>(
        &mut self,
        sym: &PolygonSymbolizer,
        features: I,
    ) -> CartoResult<usize>
    where
        I: IntoIterator<Item = &'a BezPath>,
    {
        let query = self.open_layer()?.query;
        let op = resolve_comp_op(sym.comp_op.as_deref()).unwrap_or(BlendOp::SrcOver);
        let paint = Paint::from_straight_rgba8(sym.fill, sym.opacity, op);
        if paint.is_invisible() {
            return Ok(0);
        }
        let view = self.view;
        let visible = features
            .into_iter()
            .filter(|f| query.intersects(f.bounding_box()))
            .map(|f| device_vertices(f, view));
        self.session.fill_features(
            &mut self.backend,
            self.pipeline.target_mut(),
            visible,
            &paint,
            sym.fill_rule.into(),
        )
    }

    /// Stroke line features. Returns the number of draw calls issued.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn render_lines<'a, I>(&mut self, sym: &LineSymbolizer, features: I) -> CartoResult<usize>
    where
        I: IntoIterator<Item = &'a BezPath>,
    {
        let query = self.open_layer()?.query;
        let op = resolve_comp_op(sym.comp_op.as_deref()).unwrap_or(BlendOp::SrcOver);
        let stroke = sym.stroke.sanitized();
        let paint = Paint::from_straight_rgba8(stroke.color, stroke.opacity, op);
        if paint.is_invisible() {
            return Ok(0);
        }
        let clip = sym
            .clip
            .then(|| query.stroke_clip(stroke.width, sym.offset, self.opts.scale_factor));
        let view = self.view;
        let visible = features
            .into_iter()
            .filter(|f| clip.is_none_or(|c| rects_intersect(c, f.bounding_box())))
            .map(|f| device_vertices(f, view));
        self.session.stroke_features(
            &mut self.backend,
            self.pipeline.target_mut(),
            visible,
            &stroke,
            &paint,
        )
    }

    /// Place one point marker at `at` (map units), consulting the label gate.
    #[tracing::instrument(level = "debug", skip(self, sym, markers), fields(file = %sym.file))]
    pub fn render_point(
        &mut self,
        sym: &PointSymbolizer,
        markers: &dyn MarkerSource,
        at: Point,
    ) -> CartoResult<PlacementOutcome> {
        self.open_layer()?;
        if sym.file.is_empty() {
            return Ok(PlacementOutcome::MissingMarker);
        }
        let Some(marker) = markers.find(&sym.file) else {
            tracing::debug!("marker not found, skipping point");
            return Ok(PlacementOutcome::MissingMarker);
        };

        let placement = MarkerPlacement {
            at: self.view * at,
            scale: self.opts.scale_factor,
            op: resolve_comp_op(sym.comp_op.as_deref()).unwrap_or(BlendOp::SrcOver),
            opacity: sym.opacity.clamp(0.0, 1.0),
        };
        let bbox = marker.placement_box(placement.at, placement.scale);
        if !sym.allow_overlap && !self.gate.has_placement(&bbox) {
            return Ok(PlacementOutcome::Collided);
        }

        match &*marker {
            Marker::Bitmap(img) => {
                draw_bitmap_marker(self.pipeline.target_mut(), img, &placement)?;
            }
            Marker::Vector(v) => {
                draw_vector_marker(
                    &mut self.session,
                    &mut self.backend,
                    self.pipeline.target_mut(),
                    v,
                    &placement,
                )?;
            }
        }
        if !sym.ignore_placement {
            self.gate.insert(bbox);
        }
        Ok(PlacementOutcome::Placed)
    }

    /// End the pass and read the surface back as straight alpha.
    #[tracing::instrument(skip_all)]
    pub fn finish(self) -> CartoResult<FrameRGBA> {
        if self.layer.is_some() {
            return Err(CartoError::validation("finish called with a layer still open"));
        }
        if self.pipeline.style_open() {
            return Err(CartoError::validation("finish called with a style still open"));
        }
        let stats = self.session.stats();
        tracing::debug!(
            draws = stats.draws,
            skipped = stats.skipped,
            failed = stats.failed,
            "map done"
        );
        let surface = self.pipeline.into_main();
        let (width, height) = (surface.width(), surface.height());
        let mut data = surface.data().to_vec();
        unpremultiply_in_place(&mut data);
        Ok(FrameRGBA {
            width,
            height,
            data,
            premultiplied: false,
        })
    }

    fn open_layer(&self) -> CartoResult<&OpenLayer> {
        self.layer
            .as_ref()
            .ok_or_else(|| CartoError::validation("no layer is open"))
    }
}

fn view_transform(canvas: Canvas, extent: Rect) -> CartoResult<Affine> {
    let (w, h) = (extent.width(), extent.height());
    if !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0) {
        return Err(CartoError::validation(format!(
            "map extent must have a positive finite size (got {extent:?})"
        )));
    }
    let sx = f64::from(canvas.width) / w;
    let sy = f64::from(canvas.height) / h;
    Ok(Affine::new([sx, 0.0, 0.0, -sy, -extent.x0 * sx, extent.y1 * sy]))
}

fn device_vertices(path: &BezPath, view: Affine) -> Vec<Vertex> {
    let mut storage = PathStorage::new();
    storage.concat_bezpath(&(view * path.clone()));
    storage.as_slice().to_vec()
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
