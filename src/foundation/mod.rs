//! Shared color, canvas and error types.

pub mod core;
pub mod error;
pub(crate) mod math;
