use crate::effects::blend::{BlendKernel, BlendOp, blend_weighted};
use crate::foundation::core::ColorSample;
use crate::foundation::error::{CartoError, CartoResult};

pub type PremulRgba8 = [u8; 4];

/// Borrowed premultiplied RGBA8 image.
#[derive(Clone, Copy, Debug)]
pub struct ImageView<'a> {
    pub width: u32,
    pub height: u32,
    pub data: &'a [u8],
}

impl<'a> ImageView<'a> {
    pub fn new(width: u32, height: u32, data: &'a [u8]) -> CartoResult<Self> {
        let expected = byte_len(width, height)?;
        if data.len() != expected {
            return Err(CartoError::validation(format!(
                "image data is {} bytes, expected {expected} for {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }
}

pub(crate) fn byte_len(width: u32, height: u32) -> CartoResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| CartoError::validation("rgba8 buffer size overflow"))
}

/// Blend one premultiplied pixel onto another; `opacity` mixes the result back toward `dst`.
pub fn composite(
    dst: PremulRgba8,
    src: PremulRgba8,
    op: BlendOp,
    opacity: f32,
) -> Option<PremulRgba8> {
    let kernel = op.kernel()?;
    Some(blend_px(kernel, dst, src, opacity.clamp(0.0, 1.0)))
}

#[inline(always)]
fn blend_px(kernel: BlendKernel, dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let s = ColorSample::from_premul_rgba8(src);
    let d = ColorSample::from_premul_rgba8(dst);
    blend_weighted(kernel, s, d, opacity).to_premul_rgba8()
}

fn kernel_for(op: BlendOp) -> CartoResult<BlendKernel> {
    op.kernel().ok_or_else(|| match op {
        BlendOp::Unsupported(name) => {
            CartoError::validation(format!("comp-op '{name}' has no blend formula"))
        }
        _ => CartoError::validation("comp-op has no blend formula"),
    })
}

/// Composite `src` onto `dst` pixel for pixel. Both buffers must be the same size.
pub fn composite_in_place(
    dst: &mut [u8],
    src: &[u8],
    op: BlendOp,
    opacity: f32,
) -> CartoResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(CartoError::validation(
            "composite_in_place expects equal-length rgba8 buffers",
        ));
    }
    let kernel = kernel_for(op)?;
    let opacity = opacity.clamp(0.0, 1.0);
    let skip_clear_src = op == BlendOp::SrcOver;
    if skip_clear_src && opacity <= 0.0 {
        return Ok(());
    }

    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        if skip_clear_src && s[3] == 0 {
            continue;
        }
        let out = blend_px(kernel, [d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Composite `src` onto a `dst_width` x `dst_height` buffer with its top-left corner at
/// `(dx, dy)`. Parts of `src` that fall outside `dst` are ignored.
pub fn composite_at(
    dst: &mut [u8],
    dst_width: u32,
    dst_height: u32,
    src: &ImageView<'_>,
    (dx, dy): (i32, i32),
    op: BlendOp,
    opacity: f32,
) -> CartoResult<()> {
    if dst.len() != byte_len(dst_width, dst_height)? {
        return Err(CartoError::validation(
            "composite_at expects dst to match width*height*4",
        ));
    }
    let kernel = kernel_for(op)?;
    let opacity = opacity.clamp(0.0, 1.0);

    let x0 = i64::from(dx).max(0);
    let y0 = i64::from(dy).max(0);
    let x1 = (i64::from(dx) + i64::from(src.width)).min(i64::from(dst_width));
    let y1 = (i64::from(dy) + i64::from(src.height)).min(i64::from(dst_height));
    if x0 >= x1 || y0 >= y1 {
        return Ok(());
    }

    let dst_stride = dst_width as usize * 4;
    let src_stride = src.width as usize * 4;
    for y in y0..y1 {
        let sy = (y - i64::from(dy)) as usize;
        for x in x0..x1 {
            let sx = (x - i64::from(dx)) as usize;
            let si = sy * src_stride + sx * 4;
            let di = y as usize * dst_stride + x as usize * 4;
            let s = &src.data[si..si + 4];
            let d = &mut dst[di..di + 4];
            let out = blend_px(kernel, [d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
            d.copy_from_slice(&out);
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/effects/composite.rs"]
mod tests;
