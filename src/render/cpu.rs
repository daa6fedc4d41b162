use kurbo::Rect;

use crate::effects::blend::{BlendOp, blend_weighted};
use crate::foundation::core::ColorSample;
use crate::foundation::error::{CartoError, CartoResult};
use crate::geometry::extract::PathCmd;
use crate::render::backend::{FillRule, Paint, PathObject, RasterizationBackend};
use crate::render::surface::Surface;

/// CPU backend configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CpuBackendOpts {
    /// Accuracy used when expanding strokes into outlines, in device pixels.
    pub stroke_tolerance: f64,
}

impl Default for CpuBackendOpts {
    fn default() -> Self {
        Self {
            stroke_tolerance: 0.1,
        }
    }
}

/// Stencil-then-cover backend on top of `vello_cpu`.
///
/// `vello_cpu` only computes anti-aliased coverage: each stencil call renders the path in
/// opaque white into a scratch pixmap and adds the resulting alpha into an 8-bit stencil
/// plane. Cover calls run the paint's blend kernel through that coverage directly on the
/// target surface. Pixels with zero coverage are never touched.
pub struct CpuBackend {
    opts: CpuBackendOpts,
    raster: CoverageRaster,
    stencil: StencilPlane,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new(CpuBackendOpts::default())
    }
}

impl CpuBackend {
    pub fn new(opts: CpuBackendOpts) -> Self {
        Self {
            opts,
            raster: CoverageRaster::default(),
            stencil: StencilPlane::default(),
        }
    }

    pub fn opts(&self) -> CpuBackendOpts {
        self.opts
    }

    /// `true` when no coverage is waiting for a cover pass.
    pub fn stencil_is_clear(&self) -> bool {
        self.stencil.dirty.is_none() && self.stencil.coverage.iter().all(|&c| c == 0)
    }

    /// Rasterize `path` coverage into the stencil plane, restricted to `region`.
    fn stencil_path(
        &mut self,
        target: &Surface,
        path: &vello_cpu::kurbo::BezPath,
        rule: FillRule,
        region: PixelBox,
    ) {
        let (w, h) = target.dims_u16();
        self.stencil.ensure(u32::from(w), u32::from(h));
        let fill = match rule {
            FillRule::NonZero => vello_cpu::peniko::Fill::NonZero,
            FillRule::EvenOdd => vello_cpu::peniko::Fill::EvenOdd,
        };
        self.raster.with_ctx_mut(w, h, |ctx, scratch| {
            ctx.set_fill_rule(fill);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
            ctx.fill_path(path);
            ctx.flush();
            ctx.render_to_pixmap(scratch);
            self.stencil.accumulate(scratch.data_as_u8_slice(), region);
        });
    }

    fn cover(
        &mut self,
        target: &mut Surface,
        region: Option<PixelBox>,
        paint: &Paint,
    ) -> CartoResult<()> {
        let result = match (region, paint.op.kernel()) {
            (_, None) => Err(match paint.op {
                BlendOp::Unsupported(name) => CartoError::backend(format!(
                    "cover pass reached comp-op '{name}' without a blend formula"
                )),
                _ => CartoError::backend("cover pass reached a comp-op without a blend formula"),
            }),
            (None, Some(_)) => Ok(()),
            (Some(region), Some(kernel)) => {
                if let Some(region) = self.stencil.dirty.and_then(|d| d.intersect(region)) {
                    let width = target.width() as usize;
                    let data = target.data_mut();
                    for y in region.y0..region.y1 {
                        for x in region.x0..region.x1 {
                            let idx = y as usize * width + x as usize;
                            let c = self.stencil.coverage[idx];
                            if c == 0 {
                                continue;
                            }
                            let px = &mut data[idx * 4..idx * 4 + 4];
                            let dst = ColorSample::from_premul_rgba8([px[0], px[1], px[2], px[3]]);
                            let weight = f32::from(c) / 255.0;
                            let out = blend_weighted(kernel, paint.color, dst, weight);
                            px.copy_from_slice(&out.to_premul_rgba8());
                        }
                    }
                }
                Ok(())
            }
        };
        // Coverage never outlives its cover pass, even on error.
        self.stencil.reset();
        result
    }
}

impl RasterizationBackend for CpuBackend {
    #[tracing::instrument(level = "trace", skip_all, fields(path = path.id.0))]
    fn stencil_fill(
        &mut self,
        target: &mut Surface,
        path: &PathObject<'_>,
        rule: FillRule,
    ) -> CartoResult<()> {
        let Some(region) = path_region(target, path.bbox(), 0.0) else {
            return Ok(());
        };
        let cpu_path = path_to_cpu(path);
        self.stencil_path(target, &cpu_path, rule, region);
        Ok(())
    }

    fn cover_fill(
        &mut self,
        target: &mut Surface,
        path: &PathObject<'_>,
        paint: &Paint,
    ) -> CartoResult<()> {
        let region = path_region(target, path.bbox(), 0.0);
        self.cover(target, region, paint)
    }

    #[tracing::instrument(level = "trace", skip_all, fields(path = path.id.0))]
    fn stencil_stroke(&mut self, target: &mut Surface, path: &PathObject<'_>) -> CartoResult<()> {
        if path.params.width <= 0.0 {
            return Ok(());
        }
        let Some(region) = path_region(target, path.bbox(), path.params.stroke_reach()) else {
            return Ok(());
        };
        let centerline = path.buffers.to_bezpath();
        let outline = kurbo::stroke(
            centerline.iter(),
            &path.params.to_kurbo_stroke(),
            &kurbo::StrokeOpts::default(),
            self.opts.stroke_tolerance,
        );
        let cpu_path = bezpath_to_cpu(&outline);
        self.stencil_path(target, &cpu_path, FillRule::NonZero, region);
        Ok(())
    }

    fn cover_stroke(
        &mut self,
        target: &mut Surface,
        path: &PathObject<'_>,
        paint: &Paint,
    ) -> CartoResult<()> {
        let region = path_region(target, path.bbox(), path.params.stroke_reach());
        self.cover(target, region, paint)
    }
}

/// Reused `vello_cpu` context plus the scratch pixmap coverage is rendered into.
#[derive(Default)]
struct CoverageRaster {
    dims: (u16, u16),
    ctx: Option<vello_cpu::RenderContext>,
    scratch: Option<vello_cpu::Pixmap>,
}

impl CoverageRaster {
    fn with_ctx_mut<R>(
        &mut self,
        width: u16,
        height: u16,
        f: impl FnOnce(&mut vello_cpu::RenderContext, &mut vello_cpu::Pixmap) -> R,
    ) -> R {
        if self.dims != (width, height) {
            self.ctx = None;
            self.scratch = None;
            self.dims = (width, height);
        }
        let mut ctx = self
            .ctx
            .take()
            .unwrap_or_else(|| vello_cpu::RenderContext::new(width, height));
        ctx.reset();
        let mut scratch = self
            .scratch
            .take()
            .unwrap_or_else(|| vello_cpu::Pixmap::new(width, height));
        scratch.data_as_u8_slice_mut().fill(0);
        let out = f(&mut ctx, &mut scratch);
        self.ctx = Some(ctx);
        self.scratch = Some(scratch);
        out
    }
}

/// Half-open pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PixelBox {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl PixelBox {
    fn intersect(self, other: Self) -> Option<Self> {
        let b = Self {
            x0: self.x0.max(other.x0),
            y0: self.y0.max(other.y0),
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
        };
        (b.x0 < b.x1 && b.y0 < b.y1).then_some(b)
    }

    fn union(self, other: Self) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }
}

/// Pixels a path can touch: its bbox grown by `reach` plus one pixel of anti-aliasing,
/// clipped to the surface.
fn path_region(target: &Surface, bbox: Option<Rect>, reach: f64) -> Option<PixelBox> {
    let b = bbox?.inflate(reach + 1.0, reach + 1.0);
    let (w, h) = (f64::from(target.width()), f64::from(target.height()));
    let x0 = b.x0.floor().clamp(0.0, w) as u32;
    let y0 = b.y0.floor().clamp(0.0, h) as u32;
    let x1 = b.x1.ceil().clamp(0.0, w) as u32;
    let y1 = b.y1.ceil().clamp(0.0, h) as u32;
    (x0 < x1 && y0 < y1).then_some(PixelBox { x0, y0, x1, y1 })
}

#[derive(Default)]
struct StencilPlane {
    width: u32,
    height: u32,
    coverage: Vec<u8>,
    dirty: Option<PixelBox>,
}

impl StencilPlane {
    fn ensure(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            self.width = width;
            self.height = height;
            self.coverage = vec![0; width as usize * height as usize];
            self.dirty = None;
        }
    }

    /// Count-up: coverage from `rgba` alpha is added, saturating at full coverage.
    fn accumulate(&mut self, rgba: &[u8], region: PixelBox) {
        let width = self.width as usize;
        for y in region.y0..region.y1 {
            for x in region.x0..region.x1 {
                let idx = y as usize * width + x as usize;
                let a = rgba[idx * 4 + 3];
                if a != 0 {
                    self.coverage[idx] = self.coverage[idx].saturating_add(a);
                }
            }
        }
        self.dirty = Some(match self.dirty {
            Some(d) => d.union(region),
            None => region,
        });
    }

    fn reset(&mut self) {
        if let Some(d) = self.dirty.take() {
            let width = self.width as usize;
            for y in d.y0..d.y1 {
                let row = y as usize * width;
                self.coverage[row + d.x0 as usize..row + d.x1 as usize].fill(0);
            }
        }
    }
}

fn path_to_cpu(path: &PathObject<'_>) -> vello_cpu::kurbo::BezPath {
    let mut out = vello_cpu::kurbo::BezPath::new();
    let mut pts = path
        .coords()
        .chunks_exact(2)
        .map(|c| vello_cpu::kurbo::Point::new(f64::from(c[0]), f64::from(c[1])));
    for cmd in path.commands() {
        match cmd {
            PathCmd::Move => {
                if let Some(p) = pts.next() {
                    out.move_to(p);
                }
            }
            PathCmd::Line => {
                if let Some(p) = pts.next() {
                    out.line_to(p);
                }
            }
            PathCmd::Close => out.close_path(),
        }
    }
    out
}

fn bezpath_to_cpu(path: &kurbo::BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let pt = |p: kurbo::Point| vello_cpu::kurbo::Point::new(p.x, p.y);
    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(pt(p)),
            PathEl::LineTo(p) => out.line_to(pt(p)),
            PathEl::QuadTo(p1, p2) => out.quad_to(pt(p1), pt(p2)),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(pt(p1), pt(p2), pt(p3)),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
