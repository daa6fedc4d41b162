//! Device-space geometry: vertex streams, path extraction and layer extents.

pub mod extent;
/// Vertex stream to rasterizer opcode conversion.
pub mod extract;
pub mod vertex;
