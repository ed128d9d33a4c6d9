use super::*;

fn approx_rect(a: Rect, b: Rect) -> bool {
    const EPS: f64 = 1e-9;
    (a.x0 - b.x0).abs() < EPS
        && (a.y0 - b.y0).abs() < EPS
        && (a.x1 - b.x1).abs() < EPS
        && (a.y1 - b.y1).abs() < EPS
}

#[test]
fn insert_into_empty_adopts_reprojected_source() {
    let mut dst = BoundingBox::new(Affine::scale(2.0));
    let src = BoundingBox::from_rect(Affine::IDENTITY, Rect::new(2.0, 4.0, 6.0, 8.0));
    assert!(dst.insert(&src));
    assert!(!dst.is_empty());
    assert!(approx_rect(dst.rect, Rect::new(1.0, 2.0, 3.0, 4.0)));
    assert_eq!(dst.transform, Affine::scale(2.0));
}

#[test]
fn insert_empty_source_is_noop() {
    let before = BoundingBox::from_rect(Affine::IDENTITY, Rect::new(0.0, 0.0, 5.0, 5.0));
    let mut dst = before;
    assert!(dst.insert(&BoundingBox::new(Affine::rotate(0.3))));
    assert_eq!(dst, before);
}

#[test]
fn empty_is_not_a_zero_rect() {
    let zero = BoundingBox::from_rect(Affine::IDENTITY, Rect::ZERO);
    let mut dst = BoundingBox::from_rect(Affine::IDENTITY, Rect::new(5.0, 5.0, 10.0, 10.0));
    dst.insert(&zero);
    assert!(approx_rect(dst.rect, Rect::new(0.0, 0.0, 10.0, 10.0)));

    let mut dst = BoundingBox::from_rect(Affine::IDENTITY, Rect::new(5.0, 5.0, 10.0, 10.0));
    dst.insert(&BoundingBox::new(Affine::IDENTITY));
    assert!(approx_rect(dst.rect, Rect::new(5.0, 5.0, 10.0, 10.0)));
}

#[test]
fn insert_matches_explicit_reprojection() {
    let t_dst = Affine::translate((10.0, 0.0)) * Affine::scale(2.0);
    let t_src = Affine::rotate(std::f64::consts::FRAC_PI_2);
    let a = Rect::new(0.0, 0.0, 4.0, 4.0);
    let b = Rect::new(1.0, 1.0, 3.0, 2.0);

    let mut merged = BoundingBox::from_rect(t_dst, a);
    merged.insert(&BoundingBox::from_rect(t_src, b));

    let reprojected = transform_rect(t_dst.inverse() * t_src, b);
    let mut expected = BoundingBox::from_rect(t_dst, a);
    expected.insert(&BoundingBox::from_rect(t_dst, reprojected));

    assert!(approx_rect(merged.rect, expected.rect));
}

#[test]
fn insert_is_associative() {
    let a = BoundingBox::from_rect(Affine::IDENTITY, Rect::new(0.0, 0.0, 1.0, 1.0));
    let b = BoundingBox::from_rect(Affine::translate((5.0, 3.0)), Rect::new(0.0, 0.0, 2.0, 2.0));
    let c = BoundingBox::from_rect(
        Affine::rotate(0.5) * Affine::scale(3.0),
        Rect::new(-1.0, -1.0, 1.0, 1.0),
    );

    let mut left = a;
    left.insert(&b);
    left.insert(&c);

    let mut bc = b;
    bc.insert(&c);
    let mut right = a;
    right.insert(&bc);

    assert!(approx_rect(left.rect, right.rect));
}

#[test]
fn sibling_order_does_not_change_union() {
    let b = BoundingBox::from_rect(Affine::translate((5.0, 3.0)), Rect::new(0.0, 0.0, 2.0, 2.0));
    let c = BoundingBox::from_rect(Affine::scale(3.0), Rect::new(1.0, 1.0, 2.0, 2.0));

    let mut bc = BoundingBox::new(Affine::IDENTITY);
    bc.insert(&b);
    bc.insert(&c);
    let mut cb = BoundingBox::new(Affine::IDENTITY);
    cb.insert(&c);
    cb.insert(&b);

    assert!(approx_rect(bc.rect, cb.rect));
}

#[test]
fn clip_narrows_but_never_grows() {
    let mut dst = BoundingBox::from_rect(Affine::IDENTITY, Rect::new(0.0, 0.0, 10.0, 10.0));
    dst.clip(&BoundingBox::from_rect(
        Affine::IDENTITY,
        Rect::new(5.0, -5.0, 20.0, 5.0),
    ));
    assert!(approx_rect(dst.rect, Rect::new(5.0, 0.0, 10.0, 5.0)));

    let mut disjoint = BoundingBox::from_rect(Affine::IDENTITY, Rect::new(0.0, 0.0, 10.0, 10.0));
    disjoint.clip(&BoundingBox::from_rect(
        Affine::IDENTITY,
        Rect::new(20.0, 20.0, 30.0, 30.0),
    ));
    assert!(disjoint.rect.x0 <= 10.0 && disjoint.rect.y0 <= 10.0);
    assert_eq!(disjoint.rect.area(), 0.0);
}

#[test]
fn singular_destination_skips_merge() {
    let mut dst = BoundingBox::new(Affine::scale(0.0));
    let src = BoundingBox::from_rect(Affine::IDENTITY, Rect::new(0.0, 0.0, 1.0, 1.0));
    assert!(!dst.insert(&src));
    assert!(dst.is_empty());
}

#[test]
fn render_space_extent_applies_transform() {
    let b = BoundingBox::from_rect(
        Affine::translate((10.0, 20.0)) * Affine::scale(2.0),
        Rect::new(0.0, 0.0, 5.0, 5.0),
    );
    let r = b.to_render_space().unwrap();
    assert!(approx_rect(r, Rect::new(10.0, 20.0, 20.0, 30.0)));
    assert!(BoundingBox::new(Affine::IDENTITY).to_render_space().is_none());
}

#[test]
fn pair_keeps_members_independent() {
    let mut pair = BboxPair::new(Affine::IDENTITY);
    let src = BboxPair {
        logical: BoundingBox::from_rect(Affine::IDENTITY, Rect::new(1.0, 1.0, 2.0, 2.0)),
        ink: BoundingBox::from_rect(Affine::IDENTITY, Rect::new(0.0, 0.0, 3.0, 3.0)),
    };
    pair.insert(&src);
    assert!(approx_rect(pair.logical.rect, Rect::new(1.0, 1.0, 2.0, 2.0)));
    assert!(approx_rect(pair.ink.rect, Rect::new(0.0, 0.0, 3.0, 3.0)));
}
