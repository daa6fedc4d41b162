//! Label placement gate: decides whether a marker's box may be drawn and remembers placed boxes.

use kurbo::Rect;

use crate::foundation::core::Canvas;
use crate::geometry::extent::{rect_contains, rects_intersect};

/// Collision gate consulted before placing point markers.
pub trait LabelPlacementGate {
    /// `true` when `candidate` lies inside the gate's extent and overlaps no placed box.
    fn has_placement(&self, candidate: &Rect) -> bool;

    fn insert(&mut self, placed: Rect);

    /// Forget every placed box.
    fn clear(&mut self);
}

/// Linear list of placed boxes over a fixed extent.
#[derive(Clone, Debug)]
pub struct CollisionDetector {
    extent: Rect,
    boxes: Vec<Rect>,
}

impl CollisionDetector {
    pub fn new(extent: Rect) -> Self {
        Self {
            extent,
            boxes: Vec::new(),
        }
    }

    /// Detector covering the canvas grown by `buffer` pixels on every side.
    pub fn for_canvas(canvas: Canvas, buffer: f64) -> Self {
        Self::new(canvas.bounds().inflate(buffer, buffer))
    }

    pub fn extent(&self) -> Rect {
        self.extent
    }

    pub fn boxes(&self) -> &[Rect] {
        &self.boxes
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

impl LabelPlacementGate for CollisionDetector {
    fn has_placement(&self, candidate: &Rect) -> bool {
        rect_contains(self.extent, *candidate)
            && !self.boxes.iter().any(|b| rects_intersect(*b, *candidate))
    }

    fn insert(&mut self, placed: Rect) {
        self.boxes.push(placed);
    }

    fn clear(&mut self) {
        self.boxes.clear();
    }
}

impl<G: LabelPlacementGate + ?Sized> LabelPlacementGate for Box<G> {
    fn has_placement(&self, candidate: &Rect) -> bool {
        (**self).has_placement(candidate)
    }

    fn insert(&mut self, placed: Rect) {
        (**self).insert(placed)
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}

#[cfg(test)]
#[path = "../tests/unit/label.rs"]
mod tests;
