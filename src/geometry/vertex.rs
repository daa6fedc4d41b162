use kurbo::{BezPath, PathEl};

/// Flattening tolerance (device pixels) for curves fed into vertex storage.
pub const CURVE_TOLERANCE: f64 = 0.25;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VertexCmd {
    MoveTo,
    LineTo,
    /// Close the current contour. Carries no meaningful coordinates.
    Close,
    /// End of stream.
    End,
}

/// One entry in a device-space vertex stream.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub cmd: VertexCmd,
    pub x: f64,
    pub y: f64,
}

impl Vertex {
    pub fn move_to(x: f64, y: f64) -> Self {
        Self {
            cmd: VertexCmd::MoveTo,
            x,
            y,
        }
    }

    pub fn line_to(x: f64, y: f64) -> Self {
        Self {
            cmd: VertexCmd::LineTo,
            x,
            y,
        }
    }

    pub fn close() -> Self {
        Self {
            cmd: VertexCmd::Close,
            x: 0.0,
            y: 0.0,
        }
    }

    pub fn end() -> Self {
        Self {
            cmd: VertexCmd::End,
            x: 0.0,
            y: 0.0,
        }
    }
}

/// Growable vertex storage shared by every feature of one draw call.
#[derive(Clone, Debug, Default)]
pub struct PathStorage {
    vertices: Vec<Vertex>,
}

impl PathStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(capacity),
        }
    }

    pub fn move_to(&mut self, x: f64, y: f64) {
        self.vertices.push(Vertex::move_to(x, y));
    }

    pub fn line_to(&mut self, x: f64, y: f64) {
        self.vertices.push(Vertex::line_to(x, y));
    }

    pub fn close_path(&mut self) {
        self.vertices.push(Vertex::close());
    }

    /// Append a vertex stream, stopping at its end marker.
    pub fn concat<I>(&mut self, source: I)
    where
        I: IntoIterator<Item = Vertex>,
    {
        self.vertices.extend(
            source
                .into_iter()
                .take_while(|v| v.cmd != VertexCmd::End),
        );
    }

    /// Append a kurbo path, flattening curves to line segments.
    pub fn concat_bezpath(&mut self, path: &BezPath) {
        kurbo::flatten(path.iter(), CURVE_TOLERANCE, |el| match el {
            PathEl::MoveTo(p) => self.move_to(p.x, p.y),
            PathEl::LineTo(p) => self.line_to(p.x, p.y),
            PathEl::ClosePath => self.close_path(),
            // `flatten` only emits the three variants above.
            PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => self.line_to(p.x, p.y),
        });
    }

    /// Number of stored entries, close markers included.
    pub fn total_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Drop all vertices and keep the allocation.
    pub fn remove_all(&mut self) {
        self.vertices.clear();
    }

    pub fn as_slice(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Replay the stored stream followed by an end marker.
    pub fn iter(&self) -> impl Iterator<Item = Vertex> + '_ {
        self.vertices
            .iter()
            .copied()
            .chain(std::iter::once(Vertex::end()))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/vertex.rs"]
mod tests;
