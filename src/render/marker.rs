use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use kurbo::{Affine, BezPath, PathEl, Point, Rect, Shape};

use crate::effects::blend::BlendOp;
use crate::effects::composite::{ImageView, byte_len, composite_at};
use crate::foundation::error::{CartoError, CartoResult};
use crate::foundation::math::premultiply_rgba8;
use crate::render::backend::{FillRule, Paint, RasterizationBackend};
use crate::render::session::{DrawOutcome, VectorDrawSession};
use crate::render::surface::Surface;

/// Owned premultiplied RGBA8 image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PremulImage {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

impl PremulImage {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> CartoResult<Self> {
        ImageView::new(width, height, &data)?;
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn from_straight_rgba8(width: u32, height: u32, mut data: Vec<u8>) -> CartoResult<Self> {
        for px in data.chunks_exact_mut(4) {
            let out = premultiply_rgba8([px[0], px[1], px[2], px[3]]);
            px.copy_from_slice(&out);
        }
        Self::new(width, height, data)
    }

    /// Decode any format the `image` crate understands.
    pub fn decode(bytes: &[u8]) -> CartoResult<Self> {
        let rgba = image::load_from_memory(bytes)
            .context("decode marker image")?
            .to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_straight_rgba8(width, height, rgba.into_raw())
    }

    pub fn open(path: impl AsRef<Path>) -> CartoResult<Self> {
        let path = path.as_ref();
        let bytes =
            std::fs::read(path).with_context(|| format!("read marker '{}'", path.display()))?;
        Self::decode(&bytes)
    }

    pub fn view(&self) -> ImageView<'_> {
        ImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    /// Nearest-neighbour resample to `scale` times the size, at least 1x1.
    pub fn scaled(&self, scale: f64) -> CartoResult<Self> {
        if !scale.is_finite() || scale <= 0.0 {
            return Err(CartoError::validation(format!(
                "marker scale must be finite and > 0 (got {scale})"
            )));
        }
        let w = ((f64::from(self.width) * scale).round() as u32).max(1);
        let h = ((f64::from(self.height) * scale).round() as u32).max(1);
        let mut data = vec![0u8; byte_len(w, h)?];
        for y in 0..h {
            let sy = ((u64::from(y) * u64::from(self.height)) / u64::from(h)) as usize;
            for x in 0..w {
                let sx = ((u64::from(x) * u64::from(self.width)) / u64::from(w)) as usize;
                let si = (sy * self.width as usize + sx) * 4;
                let di = (y as usize * w as usize + x as usize) * 4;
                data[di..di + 4].copy_from_slice(&self.data[si..si + 4]);
            }
        }
        Ok(Self {
            width: w,
            height: h,
            data,
        })
    }
}

/// Filled outline marker. The outline is centered on the placement point by its bounding box.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorMarker {
    pub path: BezPath,
    /// Straight-alpha RGBA8.
    pub fill: [u8; 4],
}

impl VectorMarker {
    /// Checked constructor: the outline must have at least one segment and finite coordinates.
    pub fn new(path: BezPath, fill: [u8; 4]) -> CartoResult<Self> {
        if path.segments().next().is_none() {
            return Err(CartoError::geometry("vector marker outline has no segments"));
        }
        let finite = |p: &Point| p.x.is_finite() && p.y.is_finite();
        let all_finite = path.elements().iter().all(|el| match el {
            PathEl::MoveTo(p) | PathEl::LineTo(p) => finite(p),
            PathEl::QuadTo(a, b) => finite(a) && finite(b),
            PathEl::CurveTo(a, b, c) => finite(a) && finite(b) && finite(c),
            PathEl::ClosePath => true,
        });
        if !all_finite {
            return Err(CartoError::geometry(
                "vector marker outline has non-finite coordinates",
            ));
        }
        Ok(Self { path, fill })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Marker {
    Bitmap(PremulImage),
    Vector(VectorMarker),
}

impl Marker {
    /// Unscaled marker size in pixels.
    pub fn size(&self) -> (f64, f64) {
        match self {
            Self::Bitmap(img) => (f64::from(img.width), f64::from(img.height)),
            Self::Vector(v) => {
                let bb = v.path.bounding_box();
                (bb.width(), bb.height())
            }
        }
    }

    /// Box the marker covers when centered on `at`.
    pub fn placement_box(&self, at: Point, scale: f64) -> Rect {
        let (w, h) = self.size();
        Rect::from_center_size(at, (w * scale, h * scale))
    }
}

/// Marker lookup collaborator.
pub trait MarkerSource {
    fn find(&self, name: &str) -> Option<Arc<Marker>>;
}

/// In-memory marker source keyed by name.
#[derive(Clone, Debug, Default)]
pub struct MarkerCache {
    markers: HashMap<String, Arc<Marker>>,
}

impl MarkerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, marker: Marker) -> Arc<Marker> {
        let marker = Arc::new(marker);
        self.markers.insert(name.into(), Arc::clone(&marker));
        marker
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

impl MarkerSource for MarkerCache {
    fn find(&self, name: &str) -> Option<Arc<Marker>> {
        self.markers.get(name).cloned()
    }
}

/// Result of one point placement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlacementOutcome {
    Placed,
    /// The label gate rejected the box.
    Collided,
    /// Empty name or not found in the marker source; nothing drawn.
    MissingMarker,
}

/// Where and how a marker is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MarkerPlacement {
    /// Center of the marker in device pixels.
    pub at: Point,
    pub scale: f64,
    pub op: BlendOp,
    pub opacity: f32,
}

/// Composite a bitmap marker centered on the placement point.
pub fn draw_bitmap_marker(
    target: &mut Surface,
    image: &PremulImage,
    placement: &MarkerPlacement,
) -> CartoResult<()> {
    let scaled;
    let image = if (placement.scale - 1.0).abs() > f64::EPSILON {
        scaled = image.scaled(placement.scale)?;
        &scaled
    } else {
        image
    };
    let dx = (placement.at.x - f64::from(image.width) / 2.0).round() as i32;
    let dy = (placement.at.y - f64::from(image.height) / 2.0).round() as i32;
    let (w, h) = (target.width(), target.height());
    composite_at(
        target.data_mut(),
        w,
        h,
        &image.view(),
        (dx, dy),
        placement.op,
        placement.opacity,
    )
}

/// Fill a vector marker centered on the placement point through the draw session.
pub fn draw_vector_marker<B>(
    session: &mut VectorDrawSession,
    backend: &mut B,
    target: &mut Surface,
    marker: &VectorMarker,
    placement: &MarkerPlacement,
) -> CartoResult<DrawOutcome>
where
    B: RasterizationBackend + ?Sized,
{
    let center = marker.path.bounding_box().center();
    let xf = Affine::translate(placement.at.to_vec2())
        * Affine::scale(placement.scale)
        * Affine::translate(-center.to_vec2());
    session.accumulate_bezpath(&(xf * marker.path.clone()));
    let paint = Paint::from_straight_rgba8(marker.fill, placement.opacity, placement.op);
    session.draw_fill(backend, target, &paint, FillRule::NonZero)
}

#[cfg(test)]
#[path = "../../tests/unit/render/marker.rs"]
mod tests;
