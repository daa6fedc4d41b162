use super::*;
use crate::render::stroke::{LineCap, LineJoin};

#[test]
fn empty_documents_use_defaults() {
    assert_eq!(RendererOpts::from_json("{}").unwrap(), RendererOpts::default());
    assert_eq!(StyleConfig::from_json("{}").unwrap(), StyleConfig::default());
    assert_eq!(LayerConfig::from_json("{}").unwrap(), LayerConfig::default());
    assert_eq!(RendererOpts::default().flush_vertex_threshold, 900_000);
}

#[test]
fn parse_errors_are_configuration_errors() {
    let err = StyleConfig::from_json("{ not json").unwrap_err();
    assert!(matches!(err, CartoError::Configuration(_)));
    assert!(!err.is_fatal());
}

#[test]
fn style_with_filters_parses() {
    let style = StyleConfig::from_json(
        r#"{
            "comp_op": "multiply",
            "opacity": 0.5,
            "image_filters": [{"kind": "blur", "radius": 2}, {"kind": "gray"}],
            "direct_image_filters": [{"kind": "invert"}]
        }"#,
    )
    .unwrap();
    assert_eq!(style.comp_op.as_deref(), Some("multiply"));
    assert_eq!(style.opacity, 0.5);
    assert_eq!(
        style.image_filters,
        vec![
            FilterSpec::Blur {
                radius: 2,
                sigma: None
            },
            FilterSpec::Gray
        ]
    );
    assert_eq!(style.direct_image_filters, vec![FilterSpec::Invert]);
}

#[test]
fn layer_maximum_extent_becomes_rect() {
    let layer = LayerConfig::from_json(
        r#"{"name": "roads", "buffer_size": 16, "maximum_extent": [0, 0, 100, 50], "clear_label_cache": true}"#,
    )
    .unwrap();
    assert_eq!(layer.name, "roads");
    assert_eq!(layer.buffer_size, 16);
    assert!(layer.clear_label_cache);
    assert_eq!(
        layer.maximum_extent_rect(),
        Some(Rect::new(0.0, 0.0, 100.0, 50.0))
    );
}

#[test]
fn line_symbolizer_flattens_stroke_fields() {
    let sym: LineSymbolizer = serde_json::from_str(
        r#"{"color": [255, 0, 0, 255], "width": 3, "join": "round", "cap": "square",
            "dash": [[4, 2]], "comp_op": "darken", "offset": 2}"#,
    )
    .unwrap();
    assert_eq!(sym.stroke.color, [255, 0, 0, 255]);
    assert_eq!(sym.stroke.width, 3.0);
    assert_eq!(sym.stroke.join, LineJoin::Round);
    assert_eq!(sym.stroke.cap, LineCap::Square);
    assert_eq!(sym.stroke.dash, vec![(4.0, 2.0)]);
    assert!(sym.clip);
    assert_eq!(sym.offset, 2.0);
}

#[test]
fn comp_op_resolution_degrades_unknown_and_unsupported() {
    assert_eq!(resolve_comp_op(None), None);
    assert_eq!(resolve_comp_op(Some("screen")), Some(BlendOp::Screen));
    assert_eq!(resolve_comp_op(Some("contrast")), Some(BlendOp::SrcOver));
    assert_eq!(resolve_comp_op(Some("sparkle")), Some(BlendOp::SrcOver));
}

#[test]
fn renderer_opts_validation() {
    assert!(RendererOpts::default().validate().is_ok());
    let bad = RendererOpts {
        scale_factor: 0.0,
        ..RendererOpts::default()
    };
    assert!(bad.validate().is_err());
}

#[test]
fn threshold_override_only_accepts_positive_integers() {
    let with = |v: &'static str| {
        RendererOpts::default()
            .with_overrides(move |key| (key == FLUSH_THRESHOLD_ENV).then(|| v.to_string()))
            .flush_vertex_threshold
    };
    assert_eq!(with("1234"), 1234);
    assert_eq!(with(" 42 "), 42);
    assert_eq!(with("zero"), 900_000);
    assert_eq!(with("0"), 900_000);
    assert_eq!(
        RendererOpts::default()
            .with_overrides(|_| None)
            .flush_vertex_threshold,
        900_000
    );
}

#[test]
fn symbolizer_defaults() {
    let poly = PolygonSymbolizer::default();
    assert_eq!(poly.fill, [128, 128, 128, 255]);
    assert_eq!(FillRule::from(poly.fill_rule), FillRule::NonZero);
    let point = PointSymbolizer::default();
    assert!(!point.allow_overlap && !point.ignore_placement);
}
