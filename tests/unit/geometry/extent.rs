use super::*;

#[test]
fn buffer_pads_by_pixels_in_extent_units() {
    // 1000 units across 100 px: 10 units per pixel.
    let q = QueryExtent::new(Rect::new(0.0, 0.0, 1000.0, 500.0), 100, 8, None);
    assert_eq!(q.units_per_pixel(), 10.0);
    assert_eq!(q.rect(), Rect::new(-80.0, -80.0, 1080.0, 580.0));
}

#[test]
fn maximum_extent_clips_the_padded_query() {
    let q = QueryExtent::new(
        Rect::new(0.0, 0.0, 100.0, 100.0),
        100,
        20,
        Some(Rect::new(-5.0, 0.0, 50.0, 200.0)),
    );
    assert_eq!(q.rect(), Rect::new(-5.0, 0.0, 50.0, 120.0));
}

#[test]
fn negative_buffer_shrinks_the_query() {
    let q = QueryExtent::new(Rect::new(0.0, 0.0, 100.0, 100.0), 100, -10, None);
    assert_eq!(q.rect(), Rect::new(10.0, 10.0, 90.0, 90.0));
}

#[test]
fn stroke_clip_grows_with_width_offset_and_scale() {
    let q = QueryExtent::new(Rect::new(0.0, 0.0, 100.0, 100.0), 100, 0, None);
    assert_eq!(q.stroke_clip(1.0, 0.0, 1.0), Rect::new(-1.0, -1.0, 101.0, 101.0));
    assert_eq!(q.stroke_clip(8.0, 0.0, 1.0), Rect::new(-4.0, -4.0, 104.0, 104.0));
    let offset = q.stroke_clip(8.0, 5.0, 2.0);
    assert!((offset.x0 + 48.0).abs() < 1e-9);
}

#[test]
fn rect_predicates() {
    let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    assert!(rects_intersect(a, Rect::new(10.0, 10.0, 20.0, 20.0)));
    assert!(!rects_intersect(a, Rect::new(10.5, 0.0, 20.0, 20.0)));
    assert!(rect_contains(a, Rect::new(1.0, 1.0, 9.0, 10.0)));
    assert!(!rect_contains(a, Rect::new(-1.0, 1.0, 9.0, 9.0)));
}
