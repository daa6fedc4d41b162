use std::fmt;

use crate::effects::blur::{GaussianKernel, MAX_BLUR_RADIUS, blur_rgba8_premul};
use crate::foundation::error::CartoResult;
use crate::render::surface::Surface;
use crate::scene::model::FilterSpec;

/// Raster filter applied to a whole surface in place.
pub trait ImageFilter: fmt::Debug {
    fn name(&self) -> &'static str;

    fn apply(&self, surface: &mut Surface) -> CartoResult<()>;
}

#[derive(Clone, Debug, PartialEq)]
pub enum BuiltinFilter {
    Blur(GaussianKernel),
    Gray,
    Invert,
}

impl BuiltinFilter {
    pub fn from_spec(spec: &FilterSpec) -> CartoResult<Self> {
        Ok(match *spec {
            FilterSpec::Blur { radius, sigma } => {
                if radius > MAX_BLUR_RADIUS {
                    tracing::warn!(radius, max = MAX_BLUR_RADIUS, "clamping blur radius");
                }
                let radius = radius.min(MAX_BLUR_RADIUS);
                let sigma = sigma.unwrap_or_else(|| GaussianKernel::default_sigma(radius));
                Self::Blur(GaussianKernel::new(radius, sigma)?)
            }
            FilterSpec::Gray => Self::Gray,
            FilterSpec::Invert => Self::Invert,
        })
    }
}

impl ImageFilter for BuiltinFilter {
    fn name(&self) -> &'static str {
        match self {
            Self::Blur(_) => "blur",
            Self::Gray => "gray",
            Self::Invert => "invert",
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(filter = self.name()))]
    fn apply(&self, surface: &mut Surface) -> CartoResult<()> {
        match self {
            Self::Blur(kernel) => {
                let (w, h) = (surface.width(), surface.height());
                let out = blur_rgba8_premul(surface.data(), w, h, kernel)?;
                surface.data_mut().copy_from_slice(&out);
            }
            Self::Gray => {
                for px in surface.data_mut().chunks_exact_mut(4) {
                    let luma = (77 * u32::from(px[0]) + 150 * u32::from(px[1]) + 29 * u32::from(px[2])
                        + 128)
                        >> 8;
                    let luma = luma.min(u32::from(px[3])) as u8;
                    px[0] = luma;
                    px[1] = luma;
                    px[2] = luma;
                }
            }
            // Inverting straight color then premultiplying is `a - c` on premultiplied data.
            Self::Invert => {
                for px in surface.data_mut().chunks_exact_mut(4) {
                    let a = px[3];
                    px[0] = a.saturating_sub(px[0]);
                    px[1] = a.saturating_sub(px[1]);
                    px[2] = a.saturating_sub(px[2]);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/filter.rs"]
mod tests;
