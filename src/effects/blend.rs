use std::fmt;
use std::str::FromStr;

use crate::foundation::core::ColorSample;
use crate::foundation::error::CartoError;

/// Named compositing operator as it appears in style configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompositeOp {
    Clear,
    Src,
    Dst,
    SrcOver,
    DstOver,
    SrcIn,
    DstIn,
    SrcOut,
    DstOut,
    SrcAtop,
    DstAtop,
    Xor,
    Plus,
    Minus,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    Contrast,
    Invert,
    InvertRgb,
    GrainMerge,
    GrainExtract,
    Hue,
    Saturation,
    Color,
    Value,
}

impl CompositeOp {
    pub const ALL: [CompositeOp; 34] = [
        Self::Clear,
        Self::Src,
        Self::Dst,
        Self::SrcOver,
        Self::DstOver,
        Self::SrcIn,
        Self::DstIn,
        Self::SrcOut,
        Self::DstOut,
        Self::SrcAtop,
        Self::DstAtop,
        Self::Xor,
        Self::Plus,
        Self::Minus,
        Self::Multiply,
        Self::Screen,
        Self::Overlay,
        Self::Darken,
        Self::Lighten,
        Self::ColorDodge,
        Self::ColorBurn,
        Self::HardLight,
        Self::SoftLight,
        Self::Difference,
        Self::Exclusion,
        Self::Contrast,
        Self::Invert,
        Self::InvertRgb,
        Self::GrainMerge,
        Self::GrainExtract,
        Self::Hue,
        Self::Saturation,
        Self::Color,
        Self::Value,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Clear => "clear",
            Self::Src => "src",
            Self::Dst => "dst",
            Self::SrcOver => "src-over",
            Self::DstOver => "dst-over",
            Self::SrcIn => "src-in",
            Self::DstIn => "dst-in",
            Self::SrcOut => "src-out",
            Self::DstOut => "dst-out",
            Self::SrcAtop => "src-atop",
            Self::DstAtop => "dst-atop",
            Self::Xor => "xor",
            Self::Plus => "plus",
            Self::Minus => "minus",
            Self::Multiply => "multiply",
            Self::Screen => "screen",
            Self::Overlay => "overlay",
            Self::Darken => "darken",
            Self::Lighten => "lighten",
            Self::ColorDodge => "color-dodge",
            Self::ColorBurn => "color-burn",
            Self::HardLight => "hard-light",
            Self::SoftLight => "soft-light",
            Self::Difference => "difference",
            Self::Exclusion => "exclusion",
            Self::Contrast => "contrast",
            Self::Invert => "invert",
            Self::InvertRgb => "invert-rgb",
            Self::GrainMerge => "grain-merge",
            Self::GrainExtract => "grain-extract",
            Self::Hue => "hue",
            Self::Saturation => "saturation",
            Self::Color => "color",
            Self::Value => "value",
        }
    }
}

impl fmt::Display for CompositeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompositeOp {
    type Err = CartoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|op| op.name() == key)
            .ok_or_else(|| CartoError::configuration(format!("unknown comp-op '{s}'")))
    }
}

/// Separable blend function `B(cs, cb)` on straight color channels.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeparableMode {
    Overlay,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
    GrainMerge,
    GrainExtract,
}

/// Non-separable blend function working on the whole RGB triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NonSeparableMode {
    Hue,
    Saturation,
    Color,
    Luminosity,
}

/// Resolved blend formula.
///
/// Operators without a formula resolve to [`BlendOp::Unsupported`] and never reach a kernel;
/// callers decide how to degrade them (see [`BlendOp::or_src_over`]).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlendOp {
    Clear,
    Src,
    Dst,
    SrcOver,
    DstOver,
    SrcIn,
    DstIn,
    SrcOut,
    DstOut,
    SrcAtop,
    DstAtop,
    Xor,
    Plus,
    Minus,
    Multiply,
    Screen,
    Darken,
    Lighten,
    Invert,
    InvertRgb,
    Separable(SeparableMode),
    NonSeparable(NonSeparableMode),
    Unsupported(&'static str),
}

/// Per-sample blend kernel: `(src, dst) -> result`, all premultiplied.
pub type BlendKernel = fn(ColorSample, ColorSample) -> ColorSample;

/// Blend at partial strength: the kernel result is mixed back toward `dst` by `weight`.
///
/// `weight` is antialiasing coverage or layer opacity in `[0, 1]`.
#[inline(always)]
pub fn blend_weighted(
    kernel: BlendKernel,
    src: ColorSample,
    dst: ColorSample,
    weight: f32,
) -> ColorSample {
    let full = kernel(src, dst);
    if weight >= 1.0 {
        full
    } else {
        dst.lerp(full, weight.max(0.0))
    }
}

impl BlendOp {
    pub fn resolve(op: CompositeOp) -> Self {
        match op {
            CompositeOp::Clear => Self::Clear,
            CompositeOp::Src => Self::Src,
            CompositeOp::Dst => Self::Dst,
            CompositeOp::SrcOver => Self::SrcOver,
            CompositeOp::DstOver => Self::DstOver,
            CompositeOp::SrcIn => Self::SrcIn,
            CompositeOp::DstIn => Self::DstIn,
            CompositeOp::SrcOut => Self::SrcOut,
            CompositeOp::DstOut => Self::DstOut,
            CompositeOp::SrcAtop => Self::SrcAtop,
            CompositeOp::DstAtop => Self::DstAtop,
            CompositeOp::Xor => Self::Xor,
            CompositeOp::Plus => Self::Plus,
            CompositeOp::Minus => Self::Minus,
            CompositeOp::Multiply => Self::Multiply,
            CompositeOp::Screen => Self::Screen,
            CompositeOp::Darken => Self::Darken,
            CompositeOp::Lighten => Self::Lighten,
            CompositeOp::Invert => Self::Invert,
            CompositeOp::InvertRgb => Self::InvertRgb,
            CompositeOp::Overlay => Self::Separable(SeparableMode::Overlay),
            CompositeOp::ColorDodge => Self::Separable(SeparableMode::ColorDodge),
            CompositeOp::ColorBurn => Self::Separable(SeparableMode::ColorBurn),
            CompositeOp::HardLight => Self::Separable(SeparableMode::HardLight),
            CompositeOp::SoftLight => Self::Separable(SeparableMode::SoftLight),
            CompositeOp::Difference => Self::Separable(SeparableMode::Difference),
            CompositeOp::Exclusion => Self::Separable(SeparableMode::Exclusion),
            CompositeOp::GrainMerge => Self::Separable(SeparableMode::GrainMerge),
            CompositeOp::GrainExtract => Self::Separable(SeparableMode::GrainExtract),
            CompositeOp::Hue => Self::NonSeparable(NonSeparableMode::Hue),
            CompositeOp::Saturation => Self::NonSeparable(NonSeparableMode::Saturation),
            CompositeOp::Color => Self::NonSeparable(NonSeparableMode::Color),
            CompositeOp::Value => Self::NonSeparable(NonSeparableMode::Luminosity),
            CompositeOp::Contrast => Self::Unsupported("contrast"),
        }
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported(_))
    }

    /// Replace an unsupported operator with `src-over`, logging the substitution.
    pub fn or_src_over(self) -> Self {
        if let Self::Unsupported(name) = self {
            tracing::warn!(comp_op = name, "comp-op has no blend formula, using src-over");
            return Self::SrcOver;
        }
        self
    }

    /// Pick the per-sample kernel once so buffer loops do not re-dispatch per pixel.
    pub fn kernel(self) -> Option<BlendKernel> {
        let k: BlendKernel = match self {
            Self::Clear => |_, _| ColorSample::TRANSPARENT,
            Self::Src => |s, _| s,
            Self::Dst => |_, d| d,
            Self::SrcOver => |s, d| porter_duff(s, d, 1.0, 1.0 - s.a),
            Self::DstOver => |s, d| porter_duff(s, d, 1.0 - d.a, 1.0),
            Self::SrcIn => |s, d| porter_duff(s, d, d.a, 0.0),
            Self::DstIn => |s, d| porter_duff(s, d, 0.0, s.a),
            Self::SrcOut => |s, d| porter_duff(s, d, 1.0 - d.a, 0.0),
            Self::DstOut => |s, d| porter_duff(s, d, 0.0, 1.0 - s.a),
            Self::SrcAtop => |s, d| {
                per_channel(s, d, d.a, |sc, dc| sc * d.a + dc * (1.0 - s.a))
            },
            Self::DstAtop => |s, d| {
                per_channel(s, d, s.a, |sc, dc| sc * (1.0 - d.a) + dc * s.a)
            },
            Self::Xor => |s, d| porter_duff(s, d, 1.0 - d.a, 1.0 - s.a),
            Self::Plus => |s, d| per_channel(s, d, s.a + d.a, |sc, dc| sc + dc),
            Self::Minus => |s, d| per_channel(s, d, union_alpha(s, d), |sc, dc| dc - sc),
            Self::Multiply => |s, d| {
                per_channel(s, d, union_alpha(s, d), |sc, dc| {
                    sc * dc + sc * (1.0 - d.a) + dc * (1.0 - s.a)
                })
            },
            Self::Screen => |s, d| per_channel(s, d, union_alpha(s, d), |sc, dc| sc + dc - sc * dc),
            Self::Darken => |s, d| {
                per_channel(s, d, union_alpha(s, d), |sc, dc| {
                    (sc * d.a).min(dc * s.a) + sc * (1.0 - d.a) + dc * (1.0 - s.a)
                })
            },
            Self::Lighten => |s, d| {
                per_channel(s, d, union_alpha(s, d), |sc, dc| {
                    (sc * d.a).max(dc * s.a) + sc * (1.0 - d.a) + dc * (1.0 - s.a)
                })
            },
            Self::Invert => |s, d| {
                per_channel(s, d, union_alpha(s, d), |_, dc| {
                    (d.a - dc) * s.a + dc * (1.0 - s.a)
                })
            },
            Self::InvertRgb => |s, d| {
                per_channel(s, d, union_alpha(s, d), |sc, dc| {
                    (d.a - dc) * sc + dc * (1.0 - s.a)
                })
            },
            Self::Separable(mode) => match mode {
                SeparableMode::Overlay => |s, d| separable(s, d, overlay),
                SeparableMode::ColorDodge => |s, d| separable(s, d, color_dodge),
                SeparableMode::ColorBurn => |s, d| separable(s, d, color_burn),
                SeparableMode::HardLight => |s, d| separable(s, d, hard_light),
                SeparableMode::SoftLight => |s, d| separable(s, d, soft_light),
                SeparableMode::Difference => |s, d| separable(s, d, |cs, cb| (cb - cs).abs()),
                SeparableMode::Exclusion => {
                    |s, d| separable(s, d, |cs, cb| cb + cs - 2.0 * cb * cs)
                }
                SeparableMode::GrainMerge => {
                    |s, d| separable(s, d, |cs, cb| (cb + cs - 0.5).clamp(0.0, 1.0))
                }
                SeparableMode::GrainExtract => {
                    |s, d| separable(s, d, |cs, cb| (cb - cs + 0.5).clamp(0.0, 1.0))
                }
            },
            Self::NonSeparable(mode) => match mode {
                NonSeparableMode::Hue => |s, d| {
                    non_separable(s, d, |cs, cb| set_lum(set_sat(cs, sat(cb)), lum(cb)))
                },
                NonSeparableMode::Saturation => |s, d| {
                    non_separable(s, d, |cs, cb| set_lum(set_sat(cb, sat(cs)), lum(cb)))
                },
                NonSeparableMode::Color => |s, d| non_separable(s, d, |cs, cb| set_lum(cs, lum(cb))),
                NonSeparableMode::Luminosity => {
                    |s, d| non_separable(s, d, |cs, cb| set_lum(cb, lum(cs)))
                }
            },
            Self::Unsupported(_) => return None,
        };
        Some(k)
    }

    /// Blend one premultiplied sample onto another.
    ///
    /// Returns `None` only for [`BlendOp::Unsupported`]. Results are clamped so every channel
    /// stays within `[0, result alpha]`.
    pub fn apply(self, src: ColorSample, dst: ColorSample) -> Option<ColorSample> {
        self.kernel().map(|k| k(src, dst))
    }
}

impl From<CompositeOp> for BlendOp {
    fn from(op: CompositeOp) -> Self {
        Self::resolve(op)
    }
}

fn union_alpha(s: ColorSample, d: ColorSample) -> f32 {
    s.a + d.a - s.a * d.a
}

/// Generic Porter-Duff form: `R = S*fa + D*fb` on every channel, alpha included.
fn porter_duff(s: ColorSample, d: ColorSample, fa: f32, fb: f32) -> ColorSample {
    ColorSample {
        r: s.r * fa + d.r * fb,
        g: s.g * fa + d.g * fb,
        b: s.b * fa + d.b * fb,
        a: s.a * fa + d.a * fb,
    }
    .clamped()
}

fn per_channel(
    s: ColorSample,
    d: ColorSample,
    ra: f32,
    f: impl Fn(f32, f32) -> f32,
) -> ColorSample {
    ColorSample {
        r: f(s.r, d.r),
        g: f(s.g, d.g),
        b: f(s.b, d.b),
        a: ra,
    }
    .clamped()
}

fn straight(premul: f32, alpha: f32) -> f32 {
    if alpha > 0.0 {
        (premul / alpha).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// `Rca = Sa*Da*B(Sc, Dc) + Sca*(1 - Da) + Dca*(1 - Sa)`, `Ra = Sa + Da - Sa*Da`.
fn separable(s: ColorSample, d: ColorSample, blend: impl Fn(f32, f32) -> f32) -> ColorSample {
    let both = s.a * d.a;
    per_channel(s, d, union_alpha(s, d), |sc, dc| {
        both * blend(straight(sc, s.a), straight(dc, d.a)) + sc * (1.0 - d.a) + dc * (1.0 - s.a)
    })
}

fn non_separable(
    s: ColorSample,
    d: ColorSample,
    blend: impl Fn([f32; 3], [f32; 3]) -> [f32; 3],
) -> ColorSample {
    let cs = [straight(s.r, s.a), straight(s.g, s.a), straight(s.b, s.a)];
    let cb = [straight(d.r, d.a), straight(d.g, d.a), straight(d.b, d.a)];
    let b = blend(cs, cb);
    let both = s.a * d.a;
    let mix = |i: usize, sc: f32, dc: f32| both * b[i] + sc * (1.0 - d.a) + dc * (1.0 - s.a);
    ColorSample {
        r: mix(0, s.r, d.r),
        g: mix(1, s.g, d.g),
        b: mix(2, s.b, d.b),
        a: union_alpha(s, d),
    }
    .clamped()
}

fn hard_light(cs: f32, cb: f32) -> f32 {
    if cs <= 0.5 {
        2.0 * cs * cb
    } else {
        1.0 - 2.0 * (1.0 - cs) * (1.0 - cb)
    }
}

fn overlay(cs: f32, cb: f32) -> f32 {
    hard_light(cb, cs)
}

fn color_dodge(cs: f32, cb: f32) -> f32 {
    if cb <= 0.0 {
        0.0
    } else if cs >= 1.0 {
        1.0
    } else {
        (cb / (1.0 - cs)).min(1.0)
    }
}

fn color_burn(cs: f32, cb: f32) -> f32 {
    if cb >= 1.0 {
        1.0
    } else if cs <= 0.0 {
        0.0
    } else {
        1.0 - ((1.0 - cb) / cs).min(1.0)
    }
}

fn soft_light(cs: f32, cb: f32) -> f32 {
    if cs <= 0.5 {
        cb - (1.0 - 2.0 * cs) * cb * (1.0 - cb)
    } else {
        let g = if cb <= 0.25 {
            ((16.0 * cb - 12.0) * cb + 4.0) * cb
        } else {
            cb.sqrt()
        };
        cb + (2.0 * cs - 1.0) * (g - cb)
    }
}

fn lum(c: [f32; 3]) -> f32 {
    0.3 * c[0] + 0.59 * c[1] + 0.11 * c[2]
}

fn clip_color(c: [f32; 3]) -> [f32; 3] {
    let l = lum(c);
    let n = c[0].min(c[1]).min(c[2]);
    let x = c[0].max(c[1]).max(c[2]);
    let mut out = c;
    if n < 0.0 && l - n > f32::EPSILON {
        out = out.map(|v| l + (v - l) * l / (l - n));
    }
    if x > 1.0 && x - l > f32::EPSILON {
        out = out.map(|v| l + (v - l) * (1.0 - l) / (x - l));
    }
    out
}

fn set_lum(c: [f32; 3], l: f32) -> [f32; 3] {
    let d = l - lum(c);
    clip_color(c.map(|v| v + d))
}

fn sat(c: [f32; 3]) -> f32 {
    c[0].max(c[1]).max(c[2]) - c[0].min(c[1]).min(c[2])
}

fn set_sat(c: [f32; 3], s: f32) -> [f32; 3] {
    let max = c[0].max(c[1]).max(c[2]);
    let min = c[0].min(c[1]).min(c[2]);
    let range = max - min;
    if range <= 0.0 {
        return [0.0; 3];
    }
    c.map(|v| {
        if v >= max {
            s
        } else if v <= min {
            0.0
        } else {
            (v - min) * s / range
        }
    })
}

#[cfg(test)]
#[path = "../../tests/unit/effects/blend.rs"]
mod tests;
