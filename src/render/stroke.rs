use std::borrow::Cow;

use smallvec::SmallVec;

use crate::foundation::error::{CartoError, CartoResult};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum LineJoin {
    /// Miter joins truncated at the miter limit.
    #[default]
    Miter,
    /// Miter joins that revert to bevel past the miter limit.
    MiterRevert,
    Round,
    Bevel,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum LineCap {
    #[default]
    Butt,
    Square,
    Round,
}

/// Stroke styling as configured on a line symbolizer.
///
/// `width` and `dash` are in device pixels before the renderer scale factor is applied.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct StrokeStyle {
    /// Straight-alpha RGBA8.
    pub color: [u8; 4],
    pub opacity: f32,
    pub width: f64,
    pub join: LineJoin,
    pub cap: LineCap,
    pub miter_limit: f64,
    /// `(dash, gap)` pairs.
    pub dash: Vec<(f64, f64)>,
    pub dash_offset: f64,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            color: [0, 0, 0, 255],
            opacity: 1.0,
            width: 1.0,
            join: LineJoin::Miter,
            cap: LineCap::Butt,
            miter_limit: 4.0,
            dash: Vec::new(),
            dash_offset: 0.0,
        }
    }
}

impl StrokeStyle {
    pub fn has_dash(&self) -> bool {
        !self.dash.is_empty()
    }

    pub fn validate(&self) -> CartoResult<()> {
        if !self.width.is_finite() || self.width < 0.0 {
            return Err(CartoError::validation(format!(
                "stroke width must be finite and >= 0 (got {})",
                self.width
            )));
        }
        if !self.miter_limit.is_finite() || self.miter_limit < 1.0 {
            return Err(CartoError::validation(format!(
                "stroke miter limit must be >= 1 (got {})",
                self.miter_limit
            )));
        }
        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(CartoError::validation("stroke opacity must be in [0, 1]"));
        }
        if !self.dash_offset.is_finite() {
            return Err(CartoError::validation("stroke dash offset must be finite"));
        }
        let mut total = 0.0;
        for &(dash, gap) in &self.dash {
            if !(dash.is_finite() && gap.is_finite()) || dash < 0.0 || gap < 0.0 {
                return Err(CartoError::validation(
                    "stroke dash lengths must be finite and >= 0",
                ));
            }
            total += dash + gap;
        }
        if self.has_dash() && total <= 0.0 {
            return Err(CartoError::validation("stroke dash pattern has zero length"));
        }
        Ok(())
    }

    /// A drawable copy of this style: out-of-range settings are clamped and a warning is logged.
    ///
    /// Bad widths become 0 (nothing is drawn), a miter limit below 1 becomes 1, opacity is
    /// clamped into `[0, 1]` and a broken dash pattern falls back to a solid line.
    pub fn sanitized(&self) -> Cow<'_, StrokeStyle> {
        let Err(err) = self.validate() else {
            return Cow::Borrowed(self);
        };
        tracing::warn!(error = %err, "clamping invalid stroke settings");

        let mut fixed = self.clone();
        if !fixed.width.is_finite() || fixed.width < 0.0 {
            fixed.width = 0.0;
        }
        fixed.miter_limit = if fixed.miter_limit.is_finite() {
            fixed.miter_limit.max(1.0)
        } else {
            StrokeStyle::default().miter_limit
        };
        fixed.opacity = if fixed.opacity.is_nan() {
            1.0
        } else {
            fixed.opacity.clamp(0.0, 1.0)
        };
        if !fixed.dash_offset.is_finite() {
            fixed.dash_offset = 0.0;
        }
        let dash_ok = fixed
            .dash
            .iter()
            .all(|&(d, g)| d.is_finite() && g.is_finite() && d >= 0.0 && g >= 0.0)
            && fixed.dash.iter().map(|&(d, g)| d + g).sum::<f64>() > 0.0;
        if !dash_ok {
            fixed.dash.clear();
        }
        Cow::Owned(fixed)
    }
}

/// Flatten `(dash, gap)` pairs into the linear array the rasterizer takes, scaled.
pub fn flatten_dash(dash: &[(f64, f64)], scale: f64) -> SmallVec<[f32; 8]> {
    dash.iter()
        .flat_map(|&(d, g)| [(d * scale) as f32, (g * scale) as f32])
        .collect()
}

/// Stroke parameters bound to the current path object.
#[derive(Clone, Debug, PartialEq)]
pub struct PathParameters {
    pub join: LineJoin,
    /// Applied to both the initial and the terminal end of every contour.
    pub cap: LineCap,
    pub miter_limit: f32,
    pub width: f32,
    pub dash: SmallVec<[f32; 8]>,
    pub dash_offset: f32,
}

impl Default for PathParameters {
    fn default() -> Self {
        Self {
            join: LineJoin::Miter,
            cap: LineCap::Butt,
            miter_limit: 4.0,
            width: 1.0,
            dash: SmallVec::new(),
            dash_offset: 0.0,
        }
    }
}

impl PathParameters {
    pub fn set_join_caps(&mut self, stroke: &StrokeStyle) {
        self.join = stroke.join;
        self.cap = stroke.cap;
    }

    pub fn set_miter_limit(&mut self, stroke: &StrokeStyle) {
        self.miter_limit = stroke.miter_limit as f32;
    }

    pub fn set_width(&mut self, stroke: &StrokeStyle, scale_factor: f64) {
        self.width = (stroke.width * scale_factor) as f32;
    }

    pub fn set_dash(&mut self, stroke: &StrokeStyle, scale_factor: f64) {
        self.dash = flatten_dash(&stroke.dash, scale_factor);
        self.dash_offset = (stroke.dash_offset * scale_factor) as f32;
    }

    pub fn clear_dash(&mut self) {
        self.dash.clear();
        self.dash_offset = 0.0;
    }

    /// How far outside the centerline the stroked outline can reach.
    pub fn stroke_reach(&self) -> f64 {
        let half = f64::from(self.width) / 2.0;
        let join = match self.join {
            LineJoin::Miter | LineJoin::MiterRevert => f64::from(self.miter_limit).max(1.0),
            LineJoin::Round | LineJoin::Bevel => 1.0,
        };
        let cap = match self.cap {
            LineCap::Square => std::f64::consts::SQRT_2,
            LineCap::Butt | LineCap::Round => 1.0,
        };
        half * join.max(cap)
    }

    pub(crate) fn to_kurbo_stroke(&self) -> kurbo::Stroke {
        let join = match self.join {
            LineJoin::Miter | LineJoin::MiterRevert => kurbo::Join::Miter,
            LineJoin::Round => kurbo::Join::Round,
            LineJoin::Bevel => kurbo::Join::Bevel,
        };
        let cap = match self.cap {
            LineCap::Butt => kurbo::Cap::Butt,
            LineCap::Square => kurbo::Cap::Square,
            LineCap::Round => kurbo::Cap::Round,
        };
        let stroke = kurbo::Stroke::new(f64::from(self.width))
            .with_join(join)
            .with_caps(cap)
            .with_miter_limit(f64::from(self.miter_limit));
        if self.dash.is_empty() {
            stroke
        } else {
            stroke.with_dashes(
                f64::from(self.dash_offset),
                self.dash.iter().map(|&d| f64::from(d)),
            )
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/stroke.rs"]
mod tests;
