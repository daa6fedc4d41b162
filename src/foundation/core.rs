use crate::foundation::error::{CartoError, CartoResult};
use crate::foundation::math::{premultiply_rgba8, u8_to_unit, unit_to_u8};

pub use kurbo::{Affine, BezPath, Point, Rect, Vec2};

/// Output canvas dimensions in pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Canvas {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Canvas {
    /// Create a canvas that a raster surface can actually back.
    ///
    /// Both dimensions must be non-zero and fit in `u16`.
    pub fn new(width: u32, height: u32) -> CartoResult<Self> {
        if width == 0 || height == 0 {
            return Err(CartoError::validation("canvas dimensions must be non-zero"));
        }
        if width > u32::from(u16::MAX) || height > u32::from(u16::MAX) {
            return Err(CartoError::validation(format!(
                "canvas {width}x{height} exceeds u16 raster limits"
            )));
        }
        Ok(Self { width, height })
    }

    /// Number of pixels.
    pub fn pixel_count(self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Canvas bounds in device space.
    pub fn bounds(self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

/// Premultiplied RGBA8 (r,g,b already multiplied by a).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Rgba8Premul {
    /// Red channel premultiplied by alpha.
    pub r: u8,
    /// Green channel premultiplied by alpha.
    pub g: u8,
    /// Blue channel premultiplied by alpha.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8Premul {
    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self::default()
    }

    /// Convert straight-alpha RGBA8 into premultiplied RGBA8.
    pub fn from_straight_rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        let [r, g, b, a] = premultiply_rgba8([r, g, b, a]);
        Self { r, g, b, a }
    }

    /// Byte layout used by raster surfaces.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A premultiplied color sample with channels normalized to `[0, 1]`.
///
/// All blend math runs on this type. For a well-formed sample every color channel is `<= a`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ColorSample {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorSample {
    pub const TRANSPARENT: Self = Self {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        a: 0.0,
    };

    /// Build from channels that are already premultiplied.
    pub fn premul(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Build from straight (non-premultiplied) channels.
    pub fn from_straight(r: f32, g: f32, b: f32, a: f32) -> Self {
        let a = a.clamp(0.0, 1.0);
        Self {
            r: r.clamp(0.0, 1.0) * a,
            g: g.clamp(0.0, 1.0) * a,
            b: b.clamp(0.0, 1.0) * a,
            a,
        }
    }

    pub fn from_straight_rgba8(px: [u8; 4]) -> Self {
        Self::from_straight(
            u8_to_unit(px[0]),
            u8_to_unit(px[1]),
            u8_to_unit(px[2]),
            u8_to_unit(px[3]),
        )
    }

    pub fn from_premul_rgba8(px: [u8; 4]) -> Self {
        Self {
            r: u8_to_unit(px[0]),
            g: u8_to_unit(px[1]),
            b: u8_to_unit(px[2]),
            a: u8_to_unit(px[3]),
        }
    }

    pub fn to_premul_rgba8(self) -> [u8; 4] {
        let s = self.clamped();
        [
            unit_to_u8(s.r),
            unit_to_u8(s.g),
            unit_to_u8(s.b),
            unit_to_u8(s.a),
        ]
    }

    /// Multiply every channel, alpha included, by `k`.
    pub fn scale(self, k: f32) -> Self {
        Self {
            r: self.r * k,
            g: self.g * k,
            b: self.b * k,
            a: self.a * k,
        }
    }

    /// Move from `self` toward `other` by `t` (0 keeps `self`, 1 yields `other`).
    pub fn lerp(self, other: Self, t: f32) -> Self {
        Self {
            r: self.r + (other.r - self.r) * t,
            g: self.g + (other.g - self.g) * t,
            b: self.b + (other.b - self.b) * t,
            a: self.a + (other.a - self.a) * t,
        }
    }

    /// Clamp alpha into `[0, 1]` and every color channel into `[0, a]`.
    pub fn clamped(self) -> Self {
        let fix = |v: f32| if v.is_nan() { 0.0 } else { v };
        let a = fix(self.a).clamp(0.0, 1.0);
        Self {
            r: fix(self.r).clamp(0.0, a),
            g: fix(self.g).clamp(0.0, a),
            b: fix(self.b).clamp(0.0, a),
            a,
        }
    }

    /// Straight-alpha view of this sample. Zero alpha yields fully transparent black.
    pub fn unpremultiply(self) -> Self {
        if self.a <= 0.0 {
            return Self::TRANSPARENT;
        }
        Self {
            r: (self.r / self.a).clamp(0.0, 1.0),
            g: (self.g / self.a).clamp(0.0, 1.0),
            b: (self.b / self.a).clamp(0.0, 1.0),
            a: self.a,
        }
    }

    pub fn approx_eq(self, other: Self, eps: f32) -> bool {
        (self.r - other.r).abs() <= eps
            && (self.g - other.g).abs() <= eps
            && (self.b - other.b).abs() <= eps
            && (self.a - other.a).abs() <= eps
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
