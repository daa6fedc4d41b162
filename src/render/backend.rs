use std::path::Path;

use kurbo::Rect;

use crate::effects::blend::BlendOp;
use crate::foundation::core::ColorSample;
use crate::foundation::error::{CartoError, CartoResult};
use crate::foundation::math::unpremultiply_in_place;
use crate::geometry::extract::{PathBuffers, PathCmd};
use crate::render::stroke::PathParameters;
use crate::render::surface::Surface;

/// A rendered frame as RGBA8 pixels.
///
/// Frames handed out by [`crate::MapRenderer::finish`] are straight alpha; the
/// `premultiplied` flag keeps that explicit at API boundaries.
#[derive(Clone, Debug)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        let d = self.data.get(idx..idx + 4)?;
        Some([d[0], d[1], d[2], d[3]])
    }

    /// Convert to straight alpha if needed.
    pub fn into_straight(mut self) -> Self {
        if self.premultiplied {
            unpremultiply_in_place(&mut self.data);
            self.premultiplied = false;
        }
        self
    }

    /// Encode as PNG. Premultiplied frames are converted to straight alpha first.
    pub fn write_png(&self, path: impl AsRef<Path>) -> CartoResult<()> {
        let mut data = self.data.clone();
        if self.premultiplied {
            unpremultiply_in_place(&mut data);
        }
        let img = image::RgbaImage::from_raw(self.width, self.height, data)
            .ok_or_else(|| CartoError::validation("frame data does not match its dimensions"))?;
        img.save_with_format(path.as_ref(), image::ImageFormat::Png)
            .map_err(|e| CartoError::Other(anyhow::Error::new(e)))
    }
}

/// Identifier of a path object. Every draw call consumes exactly one.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PathId(pub u64);

impl PathId {
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// Coverage accumulation rule for fills.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FillRule {
    /// Overlapping contours add coverage.
    #[default]
    NonZero,
    EvenOdd,
}

/// Premultiplied paint color plus the blend formula used by the cover pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paint {
    pub color: ColorSample,
    pub op: BlendOp,
}

impl Paint {
    /// `rgba` is straight alpha; its alpha is multiplied by `opacity` before premultiplying.
    pub fn from_straight_rgba8(rgba: [u8; 4], opacity: f32, op: BlendOp) -> Self {
        let c = ColorSample::from_straight_rgba8(rgba);
        let opacity = opacity.clamp(0.0, 1.0);
        Self {
            color: c.scale(opacity),
            op,
        }
    }

    pub fn is_invisible(&self) -> bool {
        self.color.a <= 0.0 && self.op == BlendOp::SrcOver
    }
}

/// Borrowed view of the path object a draw call operates on.
#[derive(Clone, Copy, Debug)]
pub struct PathObject<'a> {
    pub id: PathId,
    pub buffers: &'a PathBuffers,
    /// Stroke parameters; fills ignore them.
    pub params: &'a PathParameters,
}

impl PathObject<'_> {
    pub fn commands(&self) -> &[PathCmd] {
        self.buffers.commands()
    }

    pub fn coords(&self) -> &[f32] {
        self.buffers.coords()
    }

    pub fn bbox(&self) -> Option<Rect> {
        self.buffers.bbox()
    }
}

/// Stencil-then-cover rasterization seam.
///
/// A stencil call accumulates coverage for `path` into the backend's stencil plane without
/// touching `target`. The matching cover call blends the paint through that coverage into
/// `target` inside the path's (stroke-inflated) bounding box and resets the stencil there.
/// Every stencil call is followed by exactly one cover call for the same path.
pub trait RasterizationBackend {
    fn stencil_fill(
        &mut self,
        target: &mut Surface,
        path: &PathObject<'_>,
        rule: FillRule,
    ) -> CartoResult<()>;

    fn cover_fill(
        &mut self,
        target: &mut Surface,
        path: &PathObject<'_>,
        paint: &Paint,
    ) -> CartoResult<()>;

    /// Stroke style comes from `path.params`.
    fn stencil_stroke(&mut self, target: &mut Surface, path: &PathObject<'_>) -> CartoResult<()>;

    fn cover_stroke(
        &mut self,
        target: &mut Surface,
        path: &PathObject<'_>,
        paint: &Paint,
    ) -> CartoResult<()>;
}

impl<B: RasterizationBackend + ?Sized> RasterizationBackend for Box<B> {
    fn stencil_fill(
        &mut self,
        target: &mut Surface,
        path: &PathObject<'_>,
        rule: FillRule,
    ) -> CartoResult<()> {
        (**self).stencil_fill(target, path, rule)
    }

    fn cover_fill(
        &mut self,
        target: &mut Surface,
        path: &PathObject<'_>,
        paint: &Paint,
    ) -> CartoResult<()> {
        (**self).cover_fill(target, path, paint)
    }

    fn stencil_stroke(&mut self, target: &mut Surface, path: &PathObject<'_>) -> CartoResult<()> {
        (**self).stencil_stroke(target, path)
    }

    fn cover_stroke(
        &mut self,
        target: &mut Surface,
        path: &PathObject<'_>,
        paint: &Paint,
    ) -> CartoResult<()> {
        (**self).cover_stroke(target, path, paint)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/backend.rs"]
mod tests;
