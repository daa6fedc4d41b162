//! Pixel-level effects: blend formulas, buffer compositing and image filters.

/// Compositing operators and their premultiplied blend formulas.
pub mod blend;
pub mod blur;
/// Buffer-level compositing kernels.
pub mod composite;
pub mod filter;
