//! Conversion of a vertex stream into the opcode/coordinate form consumed by the rasterizer.
//!
//! Rules:
//! - every `MoveTo` and `LineTo` emits one opcode and one coordinate pair,
//! - `Close` emits an opcode (no coordinates) only when the previous emitted opcode was a line,
//! - `LineTo` before any `MoveTo` is dropped,
//! - vertices with non-finite coordinates are dropped; a dropped `MoveTo` also drops the lines
//!   that follow it until the next valid `MoveTo`.

use kurbo::{BezPath, Point, Rect};

use crate::geometry::vertex::{Vertex, VertexCmd};

/// Path opcode in rasterizer form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PathCmd {
    Move,
    Line,
    Close,
}

/// Reusable opcode and coordinate buffers for one path object.
///
/// Coordinates are `f32` pairs, one pair per `Move`/`Line` opcode, in opcode order.
#[derive(Clone, Debug, Default)]
pub struct PathBuffers {
    commands: Vec<PathCmd>,
    coords: Vec<f32>,
    bbox: Option<Rect>,
}

impl PathBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[PathCmd] {
        &self.commands
    }

    pub fn coords(&self) -> &[f32] {
        &self.coords
    }

    /// Bounding box of all emitted coordinates, `None` when nothing was emitted.
    pub fn bbox(&self) -> Option<Rect> {
        self.bbox
    }

    pub fn vertex_count(&self) -> usize {
        self.coords.len() / 2
    }

    pub fn count(&self, cmd: PathCmd) -> usize {
        self.commands.iter().filter(|&&c| c == cmd).count()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
        self.coords.clear();
        self.bbox = None;
    }

    /// Make room for `vertices` input vertices without reallocating mid-extraction.
    ///
    /// Sized at twice the input count, matching the worst case the rasterizer expects.
    pub fn reserve_for(&mut self, vertices: usize) {
        let commands = vertices.saturating_mul(2);
        self.commands
            .reserve(commands.saturating_sub(self.commands.len()));
        self.coords
            .reserve(commands.saturating_mul(2).saturating_sub(self.coords.len()));
    }

    pub fn command_capacity(&self) -> usize {
        self.commands.capacity()
    }

    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.coords
            .chunks_exact(2)
            .map(|c| Point::new(f64::from(c[0]), f64::from(c[1])))
    }

    /// Rebuild the path as a kurbo path.
    pub fn to_bezpath(&self) -> BezPath {
        let mut path = BezPath::new();
        let mut pts = self.points();
        for cmd in &self.commands {
            match cmd {
                PathCmd::Move => {
                    if let Some(p) = pts.next() {
                        path.move_to(p);
                    }
                }
                PathCmd::Line => {
                    if let Some(p) = pts.next() {
                        path.line_to(p);
                    }
                }
                PathCmd::Close => path.close_path(),
            }
        }
        path
    }

    fn push(&mut self, cmd: PathCmd, x: f64, y: f64) {
        self.commands.push(cmd);
        self.coords.push(x as f32);
        self.coords.push(y as f32);
        let p = Point::new(x, y);
        self.bbox = Some(match self.bbox {
            Some(b) => b.union_pt(p),
            None => Rect::from_points(p, p),
        });
    }
}

/// Counts from one extraction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractStats {
    pub moves: usize,
    pub lines: usize,
    pub closes: usize,
    /// Vertices dropped as malformed.
    pub skipped: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Last {
    /// No valid contour is open.
    Idle,
    Move,
    Line,
    Close,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct PathExtractor;

impl PathExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Clear `out` and fill it from `source`, stopping at the first end marker.
    pub fn extract<I>(&self, source: I, out: &mut PathBuffers) -> ExtractStats
    where
        I: IntoIterator<Item = Vertex>,
    {
        out.clear();
        let mut stats = ExtractStats::default();
        let mut last = Last::Idle;

        for v in source {
            match v.cmd {
                VertexCmd::End => break,
                VertexCmd::MoveTo => {
                    if !(v.x.is_finite() && v.y.is_finite()) {
                        stats.skipped += 1;
                        last = Last::Idle;
                        continue;
                    }
                    out.push(PathCmd::Move, v.x, v.y);
                    stats.moves += 1;
                    last = Last::Move;
                }
                VertexCmd::LineTo => {
                    if last == Last::Idle || !(v.x.is_finite() && v.y.is_finite()) {
                        tracing::trace!(x = v.x, y = v.y, "dropping line vertex without a contour");
                        stats.skipped += 1;
                        continue;
                    }
                    out.push(PathCmd::Line, v.x, v.y);
                    stats.lines += 1;
                    last = Last::Line;
                }
                VertexCmd::Close => {
                    if last == Last::Line {
                        out.commands.push(PathCmd::Close);
                        stats.closes += 1;
                        last = Last::Close;
                    }
                }
            }
        }
        stats
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/extract.rs"]
mod tests;
