//! Raster targets, the stencil-then-cover draw path and the map renderer.

pub mod backend;
/// `vello_cpu` implementation of [`backend::RasterizationBackend`].
pub mod cpu;
pub mod marker;
/// Main / isolated target switching and style merges.
pub mod pipeline;
pub mod renderer;
pub mod session;
pub mod stroke;
pub mod surface;
