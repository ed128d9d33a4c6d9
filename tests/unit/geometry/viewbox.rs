use super::*;
use crate::foundation::core::Point;

fn close(a: Point, b: Point) -> bool {
    (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
}

#[test]
fn meet_centers_the_smaller_axis() {
    let ar = AspectRatio::default();
    let r = ar.place((10.0, 10.0), Rect::new(0.0, 0.0, 200.0, 100.0));
    assert_eq!(r, Rect::new(50.0, 0.0, 150.0, 100.0));
}

#[test]
fn slice_covers_and_aligns_max() {
    let ar = AspectRatio {
        align: Some((AlignAxis::Max, AlignAxis::Max)),
        fit: Fit::Slice,
    };
    let r = ar.place((10.0, 10.0), Rect::new(0.0, 0.0, 200.0, 100.0));
    assert_eq!(r, Rect::new(0.0, -100.0, 200.0, 100.0));
}

#[test]
fn none_stretches_each_axis() {
    let t = AspectRatio::NONE
        .view_box_transform(Rect::new(0.0, 0.0, 1.0, 2.0), Rect::new(0.0, 0.0, 100.0, 50.0))
        .unwrap();
    assert!(close(t * Point::new(1.0, 2.0), Point::new(100.0, 50.0)));
}

#[test]
fn view_box_origin_maps_to_viewport_origin() {
    let t = AspectRatio {
        align: Some((AlignAxis::Min, AlignAxis::Min)),
        fit: Fit::Meet,
    }
    .view_box_transform(Rect::new(10.0, 10.0, 20.0, 20.0), Rect::new(5.0, 5.0, 105.0, 205.0))
    .unwrap();
    assert!(close(t * Point::new(10.0, 10.0), Point::new(5.0, 5.0)));
    assert!(close(t * Point::new(20.0, 20.0), Point::new(105.0, 105.0)));
}

#[test]
fn degenerate_view_box_disables_mapping() {
    assert!(
        AspectRatio::default()
            .view_box_transform(Rect::new(0.0, 0.0, 0.0, 10.0), Rect::new(0.0, 0.0, 10.0, 10.0))
            .is_none()
    );
}
