use super::*;
use std::f64::consts::FRAC_PI_2;
use std::f64::consts::FRAC_PI_4;

fn polyline(points: &[(f64, f64)], close: bool) -> BezPath {
    let mut path = BezPath::new();
    for (i, &p) in points.iter().enumerate() {
        if i == 0 {
            path.move_to(p);
        } else {
            path.line_to(p);
        }
    }
    if close {
        path.close_path();
    }
    path
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[test]
fn open_path_has_one_vertex_per_point() {
    let path = polyline(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)], false);
    let v = marker_vertices(&path);
    assert_eq!(v.len(), 3);
    assert_eq!(v[0].incoming, None);
    assert_eq!(v[2].outgoing, None);
    assert!(close(v[0].angle(), 0.0));
    assert!(close(v[1].angle(), FRAC_PI_4));
    assert!(close(v[2].angle(), FRAC_PI_2));
}

#[test]
fn bisector_takes_the_short_way_around() {
    let v = Vertex {
        point: Point::ZERO,
        incoming: Some(Vec2::new(-1.0, 0.1)),
        outgoing: Some(Vec2::new(-1.0, -0.1)),
    };
    assert!(close(v.angle().abs(), PI));
}

#[test]
fn closed_path_joins_its_ends() {
    let path = polyline(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)], true);
    let v = marker_vertices(&path);
    assert_eq!(v.len(), 4);
    assert_eq!(v[3].point, v[0].point);
    assert_eq!(v[0].incoming, v[3].incoming);
    assert_eq!(v[3].outgoing, v[0].outgoing);
    assert!(v[0].incoming.is_some());
}

#[test]
fn curve_directions_come_from_control_points() {
    let mut path = BezPath::new();
    path.move_to((0.0, 0.0));
    path.curve_to((0.0, 10.0), (10.0, 10.0), (10.0, 0.0));
    let v = marker_vertices(&path);
    assert!(close(v[0].angle(), FRAC_PI_2));
    assert!(close(v[1].angle(), -FRAC_PI_2));
}

#[test]
fn degenerate_control_points_fall_through_to_the_next_one() {
    let mut path = BezPath::new();
    path.move_to((0.0, 0.0));
    path.curve_to((0.0, 0.0), (5.0, 0.0), (5.0, 5.0));
    let v = marker_vertices(&path);
    assert_eq!(v[0].outgoing, Some(Vec2::new(5.0, 0.0)));
}

#[test]
fn empty_path_has_no_vertices() {
    assert!(marker_vertices(&BezPath::new()).is_empty());
}
