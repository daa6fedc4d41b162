//! JSON-facing configuration for renderer, layers, styles and symbolizers.

pub mod model;
