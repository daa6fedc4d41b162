use kurbo::Rect;

/// Layer query extent: the requested extent padded by the layer buffer, optionally
/// clipped to the layer's maximum extent.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueryExtent {
    rect: Rect,
    units_per_pixel: f64,
}

impl QueryExtent {
    pub fn new(
        extent: Rect,
        surface_width: u32,
        buffer_size: i32,
        maximum_extent: Option<Rect>,
    ) -> Self {
        let units_per_pixel = if surface_width > 0 {
            extent.width() / f64::from(surface_width)
        } else {
            0.0
        };
        let padding = f64::from(buffer_size) * units_per_pixel;
        let mut rect = extent.inflate(padding, padding);
        if let Some(max) = maximum_extent {
            rect = rect.intersect(max);
        }
        Self {
            rect,
            units_per_pixel,
        }
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Extent units covered by one surface pixel.
    pub fn units_per_pixel(&self) -> f64 {
        self.units_per_pixel
    }

    /// Clip box for stroked lines, grown so wide or offset strokes are not cut at the edge.
    pub fn stroke_clip(&self, stroke_width: f64, offset: f64, scale_factor: f64) -> Rect {
        let mut padding = self.units_per_pixel;
        let half_stroke = stroke_width / 2.0;
        if half_stroke > 1.0 {
            padding *= half_stroke;
        }
        if offset.abs() > 0.0 {
            padding *= offset.abs() * 1.2;
        }
        padding *= scale_factor;
        self.rect.inflate(padding, padding)
    }

    pub fn intersects(&self, other: Rect) -> bool {
        rects_intersect(self.rect, other)
    }
}

/// Inclusive intersection test: touching edges count as intersecting.
pub fn rects_intersect(a: Rect, b: Rect) -> bool {
    !(b.x0 > a.x1 || b.x1 < a.x0 || b.y0 > a.y1 || b.y1 < a.y0)
}

/// `true` when `inner` lies entirely inside `outer`.
pub fn rect_contains(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.y0 >= outer.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/extent.rs"]
mod tests;
