use super::*;
use crate::draw::context::DrawSetup;
use crate::foundation::core::{Point, Vec2};
use crate::render::measure::{MeasureBackend, MeasureSurface};
use crate::tree::document::{ClipPathElement, Document, Node, ViewportElement};
use crate::tree::style::Style;

fn setup() -> DrawSetup {
    DrawSetup {
        width: 200,
        height: 200,
        offset: Vec2::ZERO,
        dpi: (90.0, 90.0),
        root_size: (200.0, 200.0),
        root_transform: Affine::IDENTITY,
    }
}

fn approx_rect(a: Rect, b: Rect) {
    let close = |x: f64, y: f64| (x - y).abs() < 1e-2;
    assert!(
        close(a.x0, b.x0) && close(a.y0, b.y0) && close(a.x1, b.x1) && close(a.y1, b.y1),
        "{a:?} != {b:?}"
    );
}

fn doc_with_clip(units: CoordUnits, shapes: Vec<(kurbo::BezPath, bool)>) -> (Document, NodeId) {
    let mut doc = Document::new(ViewportElement::sized(200.0, 200.0), Style::default());
    let clip = doc
        .append(
            doc.root(),
            Node::new(NodeKind::ClipPath(ClipPathElement { units })).with_id("c"),
        )
        .unwrap();
    for (path, visible) in shapes {
        let style = Style {
            visible,
            ..Style::default()
        };
        doc.append(clip, Node::new(NodeKind::Shape(path)).with_style(style))
            .unwrap();
    }
    (doc, clip)
}

#[test]
fn bbox_affine_maps_the_unit_square() {
    let bbox = BoundingBox::from_rect(Affine::IDENTITY, Rect::new(10.0, 20.0, 110.0, 70.0));
    let m = bbox_affine(&bbox);
    assert_eq!(m * Point::new(0.0, 0.0), Point::new(10.0, 20.0));
    assert_eq!(m * Point::new(1.0, 1.0), Point::new(110.0, 70.0));
    assert_eq!(m * Point::new(0.5, 0.5), Point::new(60.0, 45.0));
}

#[test]
fn bounding_box_clip_scales_to_the_owner() {
    let circle = kurbo::Circle::new((0.5, 0.5), 0.5).to_path(1e-6);
    let (doc, clip) = doc_with_clip(CoordUnits::ObjectBoundingBox, vec![(circle, true)]);
    let mut be = MeasureBackend;
    let mut ctx = DrawingCtx::new(&doc, &mut be, None, MeasureSurface::new(200, 200), setup());

    let owner = BoundingBox::from_rect(Affine::IDENTITY, Rect::new(10.0, 10.0, 110.0, 110.0));
    let extent = ctx
        .apply_clip(clip, doc.root(), Affine::IDENTITY, Some(&owner))
        .unwrap()
        .expect("clip applied");
    approx_rect(
        extent.to_render_space().unwrap(),
        Rect::new(10.0, 10.0, 110.0, 110.0),
    );
    assert!(ctx.acquired.is_empty());
    assert!(ctx.clip_sink.is_none());
    assert!(ctx.bbox.logical.is_empty());
    ctx.finish();
}

#[test]
fn bounding_box_clip_without_a_box_clips_everything() {
    let square = Rect::new(0.0, 0.0, 1.0, 1.0).to_path(0.1);
    let (doc, clip) = doc_with_clip(CoordUnits::ObjectBoundingBox, vec![(square, true)]);
    let mut be = MeasureBackend;
    let mut ctx = DrawingCtx::new(&doc, &mut be, None, MeasureSurface::new(200, 200), setup());

    let empty = BoundingBox::new(Affine::IDENTITY);
    let extent = ctx
        .apply_clip(clip, doc.root(), Affine::IDENTITY, Some(&empty))
        .unwrap()
        .expect("clip applied");
    assert!(extent.is_empty());
    ctx.finish();
}

#[test]
fn user_space_clip_follows_the_owner_transform_and_skips_hidden_shapes() {
    let visible = Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1);
    let hidden = Rect::new(0.0, 0.0, 100.0, 100.0).to_path(0.1);
    let (doc, clip) = doc_with_clip(
        CoordUnits::UserSpaceOnUse,
        vec![(visible, true), (hidden, false)],
    );
    let mut be = MeasureBackend;
    let mut ctx = DrawingCtx::new(&doc, &mut be, None, MeasureSurface::new(200, 200), setup());

    let extent = ctx
        .apply_clip(clip, doc.root(), Affine::translate((5.0, 5.0)), None)
        .unwrap()
        .expect("clip applied");
    approx_rect(
        extent.to_render_space().unwrap(),
        Rect::new(5.0, 5.0, 15.0, 15.0),
    );
    ctx.finish();
}

#[test]
fn clip_path_referencing_itself_is_not_reentered() {
    let (doc, clip) = doc_with_clip(CoordUnits::UserSpaceOnUse, Vec::new());
    let mut be = MeasureBackend;
    let mut ctx = DrawingCtx::new(&doc, &mut be, None, MeasureSurface::new(200, 200), setup());

    let guard = ctx.acquire(clip, doc.root());
    assert!(guard.is_some());
    let mut guard = guard.unwrap();
    let skipped = guard
        .apply_clip(clip, doc.root(), Affine::IDENTITY, None)
        .unwrap();
    assert!(skipped.is_none());
    assert_eq!(
        guard.diagnostics.last().map(|d| d.kind),
        Some(crate::foundation::diagnostics::DiagnosticKind::CyclicReference)
    );
    drop(guard);
    ctx.finish();
}
