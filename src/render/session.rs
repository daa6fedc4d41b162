use kurbo::BezPath;

use crate::foundation::error::CartoResult;
use crate::geometry::extract::{ExtractStats, PathBuffers, PathExtractor};
use crate::geometry::vertex::{PathStorage, Vertex};
use crate::render::backend::{FillRule, Paint, PathId, PathObject, RasterizationBackend};
use crate::render::stroke::{PathParameters, StrokeStyle};
use crate::render::surface::Surface;

/// Default early-flush threshold in path-coordinate units (two per vertex).
pub const DEFAULT_FLUSH_THRESHOLD: usize = 900_000;

/// Draw-call lifecycle of the current path object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawState {
    Idle,
    Accumulating,
    Parameterized,
    Rasterizing,
}

/// What a draw call did with the accumulated geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawOutcome {
    Drawn,
    /// Nothing drawable survived extraction, or the stroke had no width.
    Skipped,
}

/// Counters over the session lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub draws: u64,
    pub skipped: u64,
    pub failed: u64,
    /// Draws forced by the vertex threshold before a feature list ended.
    pub early_flushes: u64,
    pub vertices: u64,
}

/// Accumulates geometry from one or more features and issues one stencil+cover pair per draw.
///
/// Every draw call, successful or not, consumes the current path identifier and leaves the
/// session idle with empty storage.
#[derive(Debug)]
pub struct VectorDrawSession {
    current: PathId,
    storage: PathStorage,
    buffers: PathBuffers,
    params: PathParameters,
    extractor: PathExtractor,
    flush_threshold: usize,
    scale_factor: f64,
    state: DrawState,
    stats: SessionStats,
}

impl Default for VectorDrawSession {
    fn default() -> Self {
        Self::new(DEFAULT_FLUSH_THRESHOLD, 1.0)
    }
}

impl VectorDrawSession {
    pub fn new(flush_threshold: usize, scale_factor: f64) -> Self {
        Self {
            current: PathId::default(),
            storage: PathStorage::new(),
            buffers: PathBuffers::new(),
            params: PathParameters::default(),
            extractor: PathExtractor::new(),
            flush_threshold: flush_threshold.max(1),
            scale_factor,
            state: DrawState::Idle,
            stats: SessionStats::default(),
        }
    }

    /// Identifier the next draw call will use.
    pub fn current_id(&self) -> PathId {
        self.current
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    pub fn stats(&self) -> SessionStats {
        self.stats
    }

    pub fn storage(&self) -> &PathStorage {
        &self.storage
    }

    pub fn buffers(&self) -> &PathBuffers {
        &self.buffers
    }

    pub fn params(&self) -> &PathParameters {
        &self.params
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    pub fn accumulate<I>(&mut self, geometry: I)
    where
        I: IntoIterator<Item = Vertex>,
    {
        self.storage.concat(geometry);
        self.state = DrawState::Accumulating;
    }

    pub fn accumulate_bezpath(&mut self, path: &BezPath) {
        self.storage.concat_bezpath(path);
        self.state = DrawState::Accumulating;
    }

    /// `true` once accumulated coordinates reach the early-flush threshold.
    pub fn needs_flush(&self) -> bool {
        self.storage.total_vertices().saturating_mul(2) >= self.flush_threshold
    }

    /// Fill everything accumulated so far as one path.
    pub fn draw_fill<B>(
        &mut self,
        backend: &mut B,
        target: &mut Surface,
        paint: &Paint,
        rule: FillRule,
    ) -> CartoResult<DrawOutcome>
    where
        B: RasterizationBackend + ?Sized,
    {
        let result = self.rasterize_fill(backend, target, paint, rule);
        self.retire(&result);
        result
    }

    /// Stroke everything accumulated so far as one path.
    pub fn draw_stroke<B>(
        &mut self,
        backend: &mut B,
        target: &mut Surface,
        stroke: &StrokeStyle,
        paint: &Paint,
    ) -> CartoResult<DrawOutcome>
    where
        B: RasterizationBackend + ?Sized,
    {
        let result = self.rasterize_stroke(backend, target, stroke, paint);
        self.retire(&result);
        result
    }

    /// Accumulate and fill a feature list, flushing early whenever the threshold is reached.
    ///
    /// Returns the number of draw calls issued.
    pub fn fill_features<B, I, G>(
        &mut self,
        backend: &mut B,
        target: &mut Surface,
        features: I,
        paint: &Paint,
        rule: FillRule,
    ) -> CartoResult<usize>
    where
        B: RasterizationBackend + ?Sized,
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = Vertex>,
    {
        let mut draws = 0;
        for geometry in features {
            self.accumulate(geometry);
            if self.needs_flush() {
                self.stats.early_flushes += 1;
                self.draw_fill(backend, target, paint, rule)?;
                draws += 1;
            }
        }
        if !self.storage.is_empty() {
            self.draw_fill(backend, target, paint, rule)?;
            draws += 1;
        }
        Ok(draws)
    }

    /// Stroke counterpart of [`VectorDrawSession::fill_features`].
    pub fn stroke_features<B, I, G>(
        &mut self,
        backend: &mut B,
        target: &mut Surface,
        features: I,
        stroke: &StrokeStyle,
        paint: &Paint,
    ) -> CartoResult<usize>
    where
        B: RasterizationBackend + ?Sized,
        I: IntoIterator<Item = G>,
        G: IntoIterator<Item = Vertex>,
    {
        let stroke = stroke.sanitized();
        let stroke: &StrokeStyle = &stroke;
        let mut draws = 0;
        for geometry in features {
            self.accumulate(geometry);
            if self.needs_flush() {
                self.stats.early_flushes += 1;
                self.draw_stroke(backend, target, stroke, paint)?;
                draws += 1;
            }
        }
        if !self.storage.is_empty() {
            self.draw_stroke(backend, target, stroke, paint)?;
            draws += 1;
        }
        Ok(draws)
    }

    fn extract(&mut self) -> ExtractStats {
        self.buffers.reserve_for(self.storage.total_vertices());
        let stats = self.extractor.extract(self.storage.iter(), &mut self.buffers);
        if stats.skipped > 0 {
            tracing::debug!(
                path = self.current.0,
                skipped = stats.skipped,
                "dropped malformed vertices"
            );
        }
        stats
    }

    fn rasterize_fill<B>(
        &mut self,
        backend: &mut B,
        target: &mut Surface,
        paint: &Paint,
        rule: FillRule,
    ) -> CartoResult<DrawOutcome>
    where
        B: RasterizationBackend + ?Sized,
    {
        let stats = self.extract();
        if stats.lines == 0 {
            return Ok(DrawOutcome::Skipped);
        }
        self.state = DrawState::Rasterizing;
        let path = PathObject {
            id: self.current,
            buffers: &self.buffers,
            params: &self.params,
        };
        backend.stencil_fill(target, &path, rule)?;
        backend.cover_fill(target, &path, paint)?;
        Ok(DrawOutcome::Drawn)
    }

    fn rasterize_stroke<B>(
        &mut self,
        backend: &mut B,
        target: &mut Surface,
        stroke: &StrokeStyle,
        paint: &Paint,
    ) -> CartoResult<DrawOutcome>
    where
        B: RasterizationBackend + ?Sized,
    {
        let stats = self.extract();
        if stats.lines == 0 {
            return Ok(DrawOutcome::Skipped);
        }

        let stroke = stroke.sanitized();
        let stroke: &StrokeStyle = &stroke;
        self.params.set_join_caps(stroke);
        self.params.set_miter_limit(stroke);
        self.params.set_width(stroke, self.scale_factor);
        if stroke.has_dash() {
            self.params.set_dash(stroke, self.scale_factor);
        } else {
            self.params.clear_dash();
        }
        self.state = DrawState::Parameterized;
        if self.params.width <= 0.0 {
            return Ok(DrawOutcome::Skipped);
        }

        self.state = DrawState::Rasterizing;
        let path = PathObject {
            id: self.current,
            buffers: &self.buffers,
            params: &self.params,
        };
        backend.stencil_stroke(target, &path)?;
        backend.cover_stroke(target, &path, paint)?;
        Ok(DrawOutcome::Drawn)
    }

    fn retire(&mut self, result: &CartoResult<DrawOutcome>) {
        self.stats.vertices += self.storage.total_vertices() as u64;
        match result {
            Ok(DrawOutcome::Drawn) => self.stats.draws += 1,
            Ok(DrawOutcome::Skipped) => self.stats.skipped += 1,
            Err(err) => {
                self.stats.failed += 1;
                tracing::warn!(path = self.current.0, error = %err, "draw call failed");
            }
        }
        self.storage.remove_all();
        self.buffers.clear();
        self.params = PathParameters::default();
        self.current = self.current.next();
        self.state = DrawState::Idle;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/session.rs"]
mod tests;
