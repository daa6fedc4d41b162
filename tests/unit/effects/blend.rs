use super::*;

fn px(r: f32, g: f32, b: f32, a: f32) -> ColorSample {
    ColorSample::premul(r, g, b, a)
}

fn blend(op: CompositeOp, s: ColorSample, d: ColorSample) -> ColorSample {
    BlendOp::resolve(op).apply(s, d).unwrap()
}

fn samples() -> Vec<ColorSample> {
    vec![
        ColorSample::TRANSPARENT,
        px(1.0, 0.0, 0.0, 1.0),
        px(0.0, 0.25, 0.5, 0.5),
        px(0.1, 0.2, 0.3, 0.3),
        px(1.0, 1.0, 1.0, 1.0),
        px(0.05, 0.6, 0.2, 0.75),
    ]
}

#[test]
fn every_name_parses_back_to_its_operator() {
    for op in CompositeOp::ALL {
        assert_eq!(op.name().parse::<CompositeOp>().unwrap(), op);
    }
    assert_eq!("SRC_OVER".parse::<CompositeOp>().unwrap(), CompositeOp::SrcOver);
    assert!("bogus".parse::<CompositeOp>().is_err());
}

#[test]
fn serde_names_match_display_names() {
    for op in CompositeOp::ALL {
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(json, format!("\"{}\"", op.name()));
    }
}

#[test]
fn contrast_resolves_to_unsupported_and_degrades_to_src_over() {
    let op = BlendOp::resolve(CompositeOp::Contrast);
    assert_eq!(op, BlendOp::Unsupported("contrast"));
    assert!(!op.is_supported());
    assert!(op.apply(px(1.0, 0.0, 0.0, 1.0), ColorSample::TRANSPARENT).is_none());
    assert_eq!(op.or_src_over(), BlendOp::SrcOver);
}

#[test]
fn all_other_operators_have_kernels() {
    for op in CompositeOp::ALL {
        if op != CompositeOp::Contrast {
            assert!(BlendOp::resolve(op).kernel().is_some(), "{op}");
        }
    }
}

#[test]
fn src_over_with_transparent_source_is_identity() {
    for d in samples() {
        let out = blend(CompositeOp::SrcOver, ColorSample::TRANSPARENT, d);
        assert!(out.approx_eq(d, 1e-6), "{out:?} vs {d:?}");
    }
}

#[test]
fn src_over_onto_transparent_returns_source() {
    for s in samples() {
        let out = blend(CompositeOp::SrcOver, s, ColorSample::TRANSPARENT);
        assert!(out.approx_eq(s, 1e-6), "{out:?} vs {s:?}");
    }
}

#[test]
fn xor_is_symmetric() {
    for s in samples() {
        for d in samples() {
            let a = blend(CompositeOp::Xor, s, d);
            let b = blend(CompositeOp::Xor, d, s);
            assert!(a.approx_eq(b, 1e-6));
        }
    }
}

#[test]
fn results_stay_within_premultiplied_bounds() {
    for op in CompositeOp::ALL {
        let Some(k) = BlendOp::resolve(op).kernel() else {
            continue;
        };
        for s in samples() {
            for d in samples() {
                let out = k(s, d);
                assert!((0.0..=1.0).contains(&out.a), "{op}: {out:?}");
                for c in [out.r, out.g, out.b] {
                    assert!(c >= 0.0 && c <= out.a + 1e-6, "{op}: {out:?}");
                }
            }
        }
    }
}

#[test]
fn porter_duff_table_spot_checks() {
    let s = px(0.5, 0.0, 0.0, 0.5);
    let d = px(0.0, 0.0, 1.0, 1.0);

    assert_eq!(blend(CompositeOp::Clear, s, d), ColorSample::TRANSPARENT);
    assert_eq!(blend(CompositeOp::Src, s, d), s);
    assert_eq!(blend(CompositeOp::Dst, s, d), d);
    assert!(blend(CompositeOp::SrcOver, s, d).approx_eq(px(0.5, 0.0, 0.5, 1.0), 1e-6));
    assert!(blend(CompositeOp::DstOver, s, d).approx_eq(d, 1e-6));
    assert!(blend(CompositeOp::SrcIn, s, d).approx_eq(s, 1e-6));
    assert!(blend(CompositeOp::DstIn, s, d).approx_eq(px(0.0, 0.0, 0.5, 0.5), 1e-6));
    assert!(blend(CompositeOp::SrcOut, s, d).approx_eq(ColorSample::TRANSPARENT, 1e-6));
    assert!(blend(CompositeOp::DstOut, s, d).approx_eq(px(0.0, 0.0, 0.5, 0.5), 1e-6));
    assert!(blend(CompositeOp::SrcAtop, s, d).approx_eq(px(0.5, 0.0, 0.5, 1.0), 1e-6));
    assert!(blend(CompositeOp::DstAtop, s, d).approx_eq(px(0.0, 0.0, 0.5, 0.5), 1e-6));
    assert!(blend(CompositeOp::Xor, s, d).approx_eq(px(0.0, 0.0, 0.5, 0.5), 1e-6));
}

#[test]
fn plus_saturates_alpha() {
    let out = blend(CompositeOp::Plus, px(0.6, 0.0, 0.0, 0.8), px(0.6, 0.0, 0.0, 0.8));
    assert!(out.approx_eq(px(1.0, 0.0, 0.0, 1.0), 1e-6));
}

#[test]
fn minus_clamps_at_zero() {
    let out = blend(CompositeOp::Minus, px(1.0, 0.2, 0.0, 1.0), px(0.5, 0.5, 0.5, 1.0));
    assert!(out.approx_eq(px(0.0, 0.3, 0.5, 1.0), 1e-6));
}

#[test]
fn multiply_and_screen_on_opaque_pixels() {
    let s = px(0.5, 1.0, 0.0, 1.0);
    let d = px(0.5, 0.5, 0.5, 1.0);
    assert!(blend(CompositeOp::Multiply, s, d).approx_eq(px(0.25, 0.5, 0.0, 1.0), 1e-6));
    assert!(blend(CompositeOp::Screen, s, d).approx_eq(px(0.75, 1.0, 0.5, 1.0), 1e-6));
    assert!(blend(CompositeOp::Darken, s, d).approx_eq(px(0.5, 0.5, 0.0, 1.0), 1e-6));
    assert!(blend(CompositeOp::Lighten, s, d).approx_eq(px(0.5, 1.0, 0.5, 1.0), 1e-6));
}

#[test]
fn separable_modes_on_opaque_pixels() {
    let s = px(0.25, 0.75, 1.0, 1.0);
    let d = px(0.5, 0.5, 0.5, 1.0);
    assert!(blend(CompositeOp::Difference, s, d).approx_eq(px(0.25, 0.25, 0.5, 1.0), 1e-6));
    assert!(blend(CompositeOp::Exclusion, s, d).approx_eq(px(0.5, 0.5, 0.5, 1.0), 1e-6));
    assert!(blend(CompositeOp::GrainMerge, s, d).approx_eq(px(0.25, 0.75, 1.0, 1.0), 1e-6));
    assert!(blend(CompositeOp::GrainExtract, s, d).approx_eq(px(0.75, 0.25, 0.0, 1.0), 1e-6));
    assert!(blend(CompositeOp::HardLight, s, d).approx_eq(px(0.25, 0.75, 1.0, 1.0), 1e-6));
    assert!(blend(CompositeOp::Overlay, s, d).approx_eq(px(0.25, 0.75, 1.0, 1.0), 1e-6));
    assert!(blend(CompositeOp::ColorDodge, s, d).approx_eq(px(2.0 / 3.0, 1.0, 1.0, 1.0), 1e-5));
}

#[test]
fn invert_flips_destination_under_opaque_source() {
    let out = blend(CompositeOp::Invert, px(0.0, 0.0, 0.0, 1.0), px(0.2, 0.4, 1.0, 1.0));
    assert!(out.approx_eq(px(0.8, 0.6, 0.0, 1.0), 1e-6));

    let rgb = blend(CompositeOp::InvertRgb, px(1.0, 0.0, 0.5, 1.0), px(0.2, 0.4, 1.0, 1.0));
    assert!(rgb.approx_eq(px(0.8, 0.0, 0.0, 1.0), 1e-6));
}

#[test]
fn luminosity_modes_preserve_expected_luma() {
    let s = px(1.0, 0.0, 0.0, 1.0);
    let d = px(0.5, 0.5, 0.5, 1.0);

    let color = blend(CompositeOp::Color, s, d);
    assert!((lum([color.r, color.g, color.b]) - 0.5).abs() < 1e-4);

    let value = blend(CompositeOp::Value, s, d);
    assert!((lum([value.r, value.g, value.b]) - 0.3).abs() < 1e-4);
    assert!((value.r - value.g).abs() < 1e-6);

    // Gray source has no saturation to hand over.
    let sat = blend(CompositeOp::Saturation, d, s);
    assert!((sat.r - sat.g).abs() < 1e-4 && (sat.g - sat.b).abs() < 1e-4);
}

#[test]
fn unpremultiply_of_cleared_result_is_transparent() {
    let out = blend(CompositeOp::Clear, px(1.0, 1.0, 1.0, 1.0), px(1.0, 1.0, 1.0, 1.0));
    assert_eq!(out.unpremultiply(), ColorSample::TRANSPARENT);
}

#[test]
fn weighted_blend_mixes_result_toward_destination() {
    let white = px(1.0, 1.0, 1.0, 1.0);
    let red = px(1.0, 0.0, 0.0, 1.0);
    let src = BlendOp::resolve(CompositeOp::Src).kernel().unwrap();
    let clear = BlendOp::resolve(CompositeOp::Clear).kernel().unwrap();
    let over = BlendOp::resolve(CompositeOp::SrcOver).kernel().unwrap();

    assert!(blend_weighted(src, red, white, 0.5).approx_eq(px(1.0, 0.5, 0.5, 1.0), 1e-6));
    assert!(blend_weighted(clear, red, white, 0.5).approx_eq(px(0.5, 0.5, 0.5, 0.5), 1e-6));
    assert!(blend_weighted(src, red, white, 0.0).approx_eq(white, 1e-6));
    assert!(blend_weighted(src, red, white, 1.0).approx_eq(red, 1e-6));

    // Src-over at partial weight equals src-over of the scaled source.
    for s in samples() {
        for d in samples() {
            let weighted = blend_weighted(over, s, d, 0.3);
            assert!(weighted.approx_eq(over(s.scale(0.3), d), 1e-5), "{s:?} {d:?}");
        }
    }
}
