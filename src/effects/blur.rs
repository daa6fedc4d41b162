use crate::effects::composite::byte_len;
use crate::foundation::error::{CartoError, CartoResult};

const Q16_ONE: u32 = 1 << 16;

/// Largest supported blur radius in pixels.
pub const MAX_BLUR_RADIUS: u32 = 254;

/// Normalized 1-D gaussian weights in Q16 fixed point; taps always sum to exactly `1 << 16`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GaussianKernel {
    taps: Vec<u32>,
}

impl GaussianKernel {
    pub fn new(radius: u32, sigma: f32) -> CartoResult<Self> {
        if radius == 0 {
            return Ok(Self {
                taps: vec![Q16_ONE],
            });
        }
        if radius > MAX_BLUR_RADIUS {
            return Err(CartoError::validation(format!(
                "blur radius {radius} exceeds {MAX_BLUR_RADIUS}"
            )));
        }
        if !sigma.is_finite() || sigma <= 0.0 {
            return Err(CartoError::validation("blur sigma must be > 0"));
        }

        let r = radius as i64;
        let denom = 2.0 * f64::from(sigma) * f64::from(sigma);
        let raw: Vec<f64> = (-r..=r)
            .map(|i| {
                let x = i as f64;
                (-x * x / denom).exp()
            })
            .collect();
        let sum: f64 = raw.iter().sum();
        if sum <= 0.0 {
            return Err(CartoError::validation("gaussian kernel sum is zero"));
        }

        let mut taps: Vec<u32> = raw
            .iter()
            .map(|w| ((w / sum) * f64::from(Q16_ONE)).round().clamp(0.0, 65536.0) as u32)
            .collect();
        let total: i64 = taps.iter().map(|&t| i64::from(t)).sum();
        let mid = taps.len() / 2;
        let fixed = (i64::from(taps[mid]) + i64::from(Q16_ONE) - total).clamp(0, 65536);
        taps[mid] = fixed as u32;
        Ok(Self { taps })
    }

    /// Default sigma for a radius when none is configured.
    pub fn default_sigma(radius: u32) -> f32 {
        (radius as f32 / 2.0).max(0.5)
    }

    pub fn radius(&self) -> u32 {
        (self.taps.len() / 2) as u32
    }

    pub fn taps(&self) -> &[u32] {
        &self.taps
    }
}

#[derive(Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

/// Separable gaussian blur of a premultiplied RGBA8 buffer, edges clamped.
pub fn blur_rgba8_premul(
    src: &[u8],
    width: u32,
    height: u32,
    kernel: &GaussianKernel,
) -> CartoResult<Vec<u8>> {
    let len = byte_len(width, height)?;
    if src.len() != len {
        return Err(CartoError::validation(
            "blur_rgba8_premul expects src matching width*height*4",
        ));
    }
    if kernel.radius() == 0 || len == 0 {
        return Ok(src.to_vec());
    }

    let mut tmp = vec![0u8; len];
    let mut out = vec![0u8; len];
    convolve(src, &mut tmp, width, height, kernel.taps(), Axis::Horizontal);
    convolve(&tmp, &mut out, width, height, kernel.taps(), Axis::Vertical);
    Ok(out)
}

fn convolve(src: &[u8], dst: &mut [u8], width: u32, height: u32, taps: &[u32], axis: Axis) {
    let radius = (taps.len() / 2) as i64;
    let (w, h) = (i64::from(width), i64::from(height));
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in taps.iter().enumerate() {
                let off = ki as i64 - radius;
                let (sx, sy) = match axis {
                    Axis::Horizontal => ((x + off).clamp(0, w - 1), y),
                    Axis::Vertical => (x, (y + off).clamp(0, h - 1)),
                };
                let idx = ((sy * w + sx) as usize) * 4;
                for (c, a) in acc.iter_mut().enumerate() {
                    *a += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out = ((y * w + x) as usize) * 4;
            for (c, a) in acc.iter().enumerate() {
                dst[out + c] = q16_to_u8(*a);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    ((acc + 32768) >> 16).min(255) as u8
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blur.rs"]
mod tests;
