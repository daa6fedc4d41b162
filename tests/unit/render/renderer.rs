use super::*;
use crate::render::marker::MarkerCache;
use crate::scene::model::StyleConfig;

fn map(bg: Option<[u8; 4]>) -> MapRenderer {
    let opts = RendererOpts {
        background: bg,
        ..RendererOpts::default()
    };
    MapRenderer::new(
        Canvas::new(10, 10).unwrap(),
        Rect::new(0.0, 0.0, 100.0, 100.0),
        opts,
    )
    .unwrap()
}

fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> BezPath {
    Rect::new(x0, y0, x1, y1).to_path(0.1)
}

fn layer(name: &str) -> LayerConfig {
    LayerConfig {
        name: name.to_string(),
        ..LayerConfig::default()
    }
}

fn red_polygon(opacity: f32) -> PolygonSymbolizer {
    PolygonSymbolizer {
        fill: [255, 0, 0, 255],
        opacity,
        ..PolygonSymbolizer::default()
    }
}

#[test]
fn view_transform_flips_y() {
    let r = map(None);
    let p = r.view_transform() * Point::new(10.0, 90.0);
    assert!((p.x - 1.0).abs() < 1e-9 && (p.y - 1.0).abs() < 1e-9);
}

#[test]
fn degenerate_extent_is_rejected() {
    let err = MapRenderer::new(
        Canvas::new(4, 4).unwrap(),
        Rect::new(0.0, 0.0, 0.0, 10.0),
        RendererOpts::default(),
    )
    .err()
    .unwrap();
    assert!(matches!(err, CartoError::Validation(_)));
}

#[test]
fn background_is_premultiplied_and_read_back_straight() {
    let r = map(Some([255, 255, 255, 128]));
    assert_eq!(r.pipeline().main().pixel(0, 0), Some([128, 128, 128, 128]));
    let frame = r.finish().unwrap();
    assert!(!frame.premultiplied);
    assert_eq!(frame.pixel(3, 3), Some([255, 255, 255, 128]));
}

#[test]
fn drawing_requires_an_open_layer() {
    let mut r = map(None);
    let f = square(0.0, 0.0, 10.0, 10.0);
    assert!(r.render_polygons(&red_polygon(1.0), [&f]).is_err());
    assert!(r.start_style(&ResolvedStyle::default()).is_err());
    assert!(r.end_layer().is_err());
}

#[test]
fn polygon_fill_lands_in_device_space() {
    let mut r = map(Some([255, 255, 255, 255]));
    r.start_layer(&layer("water")).unwrap();
    let style = ResolvedStyle::default();
    r.start_style(&style).unwrap();
    let f = square(20.0, 20.0, 80.0, 80.0);
    assert_eq!(r.render_polygons(&red_polygon(1.0), [&f]).unwrap(), 1);
    r.end_style(&style).unwrap();
    r.end_layer().unwrap();

    let frame = r.finish().unwrap();
    assert_eq!(frame.pixel(5, 5), Some([255, 0, 0, 255]));
    assert_eq!(frame.pixel(0, 0), Some([255, 255, 255, 255]));
}

#[test]
fn half_opacity_style_blends_with_white() {
    let mut r = map(Some([255, 255, 255, 255]));
    r.start_layer(&layer("parks")).unwrap();
    let style = ResolvedStyle::from_config(&StyleConfig {
        opacity: 0.5,
        ..StyleConfig::default()
    })
    .unwrap();
    r.start_style(&style).unwrap();
    let f = square(0.0, 0.0, 100.0, 100.0);
    r.render_polygons(&red_polygon(1.0), [&f]).unwrap();
    r.end_style(&style).unwrap();
    r.end_layer().unwrap();

    let px = r.finish().unwrap().pixel(5, 5).unwrap();
    assert_eq!(px[0], 255);
    assert!(px[1].abs_diff(128) <= 1 && px[2].abs_diff(128) <= 1);
    assert_eq!(px[3], 255);
}

#[test]
fn translucent_fill_is_unpremultiplied_once() {
    let mut r = map(None);
    r.start_layer(&layer("l")).unwrap();
    let f = square(0.0, 0.0, 100.0, 100.0);
    r.render_polygons(&red_polygon(0.5), [&f]).unwrap();
    r.end_layer().unwrap();
    assert_eq!(r.finish().unwrap().pixel(4, 4), Some([255, 0, 0, 128]));
}

#[test]
fn features_outside_the_query_extent_are_culled() {
    let mut r = map(None);
    r.start_layer(&layer("far")).unwrap();
    let far = square(500.0, 500.0, 600.0, 600.0);
    assert_eq!(r.render_polygons(&red_polygon(1.0), [&far]).unwrap(), 0);
    assert_eq!(r.session().stats().draws, 0);
    r.end_layer().unwrap();
}

#[test]
fn layer_buffer_pads_the_query_extent() {
    let mut r = map(None);
    let cfg = LayerConfig {
        buffer_size: 2,
        maximum_extent: Some([-5.0, -100.0, 200.0, 200.0]),
        ..layer("roads")
    };
    r.start_layer(&cfg).unwrap();
    assert_eq!(
        r.query_extent().unwrap().rect(),
        Rect::new(-5.0, -20.0, 120.0, 120.0)
    );
    r.end_layer().unwrap();
    assert!(r.query_extent().is_none());
}

#[test]
fn lines_stroke_through_the_session() {
    let mut r = map(None);
    r.start_layer(&layer("roads")).unwrap();
    let mut line = BezPath::new();
    line.move_to((0.0, 50.0));
    line.line_to((100.0, 50.0));
    let sym = LineSymbolizer {
        stroke: crate::render::stroke::StrokeStyle {
            color: [0, 0, 255, 255],
            width: 4.0,
            ..Default::default()
        },
        ..LineSymbolizer::default()
    };
    assert_eq!(r.render_lines(&sym, [&line]).unwrap(), 1);
    r.end_layer().unwrap();
    let frame = r.finish().unwrap();
    assert_eq!(frame.pixel(5, 5).unwrap()[2], 255);
    assert_eq!(frame.pixel(5, 0), Some([0, 0, 0, 0]));
}

#[test]
fn out_of_range_stroke_settings_degrade_instead_of_failing() {
    let mut r = map(None);
    r.start_layer(&layer("roads")).unwrap();
    let mut line = BezPath::new();
    line.move_to((0.0, 50.0));
    line.line_to((100.0, 50.0));
    let sym = LineSymbolizer {
        stroke: crate::render::stroke::StrokeStyle {
            color: [0, 0, 255, 255],
            width: 4.0,
            miter_limit: 0.5,
            opacity: 1.5,
            ..Default::default()
        },
        ..LineSymbolizer::default()
    };
    assert_eq!(r.render_lines(&sym, [&line]).unwrap(), 1);
    assert_eq!(r.session().stats().failed, 0);
    r.end_layer().unwrap();
    let px = r.finish().unwrap().pixel(5, 5).unwrap();
    assert_eq!((px[2], px[3]), (255, 255));
}

#[test]
fn points_collide_through_the_label_gate() {
    let mut markers = MarkerCache::new();
    markers.insert(
        "dot",
        Marker::Bitmap(PremulImage::new(2, 2, [0, 0, 255, 255].repeat(4)).unwrap()),
    );
    let mut r = map(None);
    r.start_layer(&layer("pois")).unwrap();
    let sym = PointSymbolizer {
        file: "dot".to_string(),
        ..PointSymbolizer::default()
    };
    let at = Point::new(50.0, 50.0);

    assert_eq!(r.render_point(&sym, &markers, at).unwrap(), PlacementOutcome::Placed);
    assert_eq!(r.render_point(&sym, &markers, at).unwrap(), PlacementOutcome::Collided);
    let overlap = PointSymbolizer {
        allow_overlap: true,
        ..sym.clone()
    };
    assert_eq!(r.render_point(&overlap, &markers, at).unwrap(), PlacementOutcome::Placed);
    assert_eq!(r.gate().len(), 2);

    let missing = PointSymbolizer {
        file: "nope".to_string(),
        ..sym.clone()
    };
    assert_eq!(
        r.render_point(&missing, &markers, at).unwrap(),
        PlacementOutcome::MissingMarker
    );
    let unnamed = PointSymbolizer::default();
    assert_eq!(
        r.render_point(&unnamed, &markers, at).unwrap(),
        PlacementOutcome::MissingMarker
    );
    r.end_layer().unwrap();

    r.start_layer(&LayerConfig {
        clear_label_cache: true,
        ..layer("more")
    })
    .unwrap();
    assert!(r.gate().is_empty());
    assert_eq!(r.render_point(&sym, &markers, at).unwrap(), PlacementOutcome::Placed);
    r.end_layer().unwrap();

    let frame = r.finish().unwrap();
    assert_eq!(frame.pixel(5, 5), Some([0, 0, 255, 255]));
}

#[test]
fn ignore_placement_does_not_reserve_space() {
    let mut markers = MarkerCache::new();
    markers.insert("dot", Marker::Bitmap(PremulImage::new(1, 1, vec![0, 0, 0, 255]).unwrap()));
    let mut r = map(None);
    r.start_layer(&layer("pois")).unwrap();
    let sym = PointSymbolizer {
        file: "dot".to_string(),
        ignore_placement: true,
        ..PointSymbolizer::default()
    };
    let at = Point::new(10.0, 10.0);
    assert_eq!(r.render_point(&sym, &markers, at).unwrap(), PlacementOutcome::Placed);
    assert_eq!(r.render_point(&sym, &markers, at).unwrap(), PlacementOutcome::Placed);
    assert!(r.gate().is_empty());
    r.end_layer().unwrap();
}

#[test]
fn background_image_tiles() {
    let mut r = map(None);
    let tile = PremulImage::new(3, 3, [10, 20, 30, 255].repeat(9)).unwrap();
    r.set_background_image(&tile).unwrap();
    assert_eq!(r.pipeline().main().pixel(9, 9), Some([10, 20, 30, 255]));
    assert_eq!(r.pipeline().main().pixel(4, 7), Some([10, 20, 30, 255]));
}

#[test]
fn finish_rejects_an_open_layer() {
    let mut r = map(None);
    r.start_layer(&layer("l")).unwrap();
    assert!(r.finish().is_err());
}

#[test]
fn open_style_blocks_end_layer_and_finish() {
    let mut r = map(Some([255, 255, 255, 255]));
    r.start_layer(&layer("parks")).unwrap();
    let style = ResolvedStyle::from_config(&StyleConfig {
        opacity: 0.5,
        ..StyleConfig::default()
    })
    .unwrap();
    r.start_style(&style).unwrap();
    let f = square(0.0, 0.0, 100.0, 100.0);
    assert_eq!(r.render_polygons(&red_polygon(1.0), [&f]).unwrap(), 1);

    let err = r.end_layer().unwrap_err();
    assert!(matches!(err, CartoError::Validation(_)));
    assert!(r.query_extent().is_some());

    // Closing the style merges the isolated draws and the layer can then end.
    r.end_style(&style).unwrap();
    r.end_layer().unwrap();
    let px = r.finish().unwrap().pixel(5, 5).unwrap();
    assert_eq!(px[0], 255);
    assert!(px[1].abs_diff(128) <= 1, "{px:?}");
}
