use super::*;
use crate::draw::context::DrawSetup;
use crate::foundation::core::{Color, Rect, Vec2};
use crate::render::cpu::{CpuBackend, CpuSurface};
use crate::render::measure::{MeasureBackend, MeasureSurface};
use crate::render::surface_pool::SurfacePoolOpts;
use crate::tree::document::{ClipPathElement, Document, Node, ViewportElement};
use crate::tree::style::Style;
use kurbo::Shape;

fn setup(size: u32) -> DrawSetup {
    let s = f64::from(size);
    DrawSetup {
        width: size,
        height: size,
        offset: Vec2::ZERO,
        dpi: (90.0, 90.0),
        root_size: (s, s),
        root_transform: Affine::IDENTITY,
    }
}

fn rect_node(x0: f64, y0: f64, x1: f64, y1: f64, style: Style) -> Node {
    Node::new(NodeKind::Shape(Rect::new(x0, y0, x1, y1).to_path(0.1))).with_style(style)
}

fn clip_node(id: &str, units: CoordUnits) -> Node {
    Node::new(NodeKind::ClipPath(ClipPathElement { units })).with_id(id)
}

#[test]
fn opaque_plain_layers_stay_direct() {
    let effects = EffectRefs::default();
    assert!(!needs_isolation(&effects, None));
    assert!(!needs_isolation(&effects, Some(CoordUnits::UserSpaceOnUse)));

    let nearly_opaque = EffectRefs {
        opacity: 0.999,
        ..EffectRefs::default()
    };
    assert!(!needs_isolation(&nearly_opaque, None));
}

#[test]
fn every_effect_forces_isolation() {
    let base = EffectRefs::default();
    let cases = [
        EffectRefs {
            opacity: 0.5,
            ..base.clone()
        },
        EffectRefs {
            filter: Some("#f".into()),
            ..base.clone()
        },
        EffectRefs {
            mask: Some("#m".into()),
            ..base.clone()
        },
        EffectRefs {
            comp_op: CompOp::Multiply,
            ..base.clone()
        },
        EffectRefs {
            background: BackgroundMode::New,
            ..base.clone()
        },
    ];
    for effects in &cases {
        assert!(needs_isolation(effects, None), "{effects:?}");
    }
    assert!(needs_isolation(&base, Some(CoordUnits::ObjectBoundingBox)));
}

#[test]
fn user_space_clip_bounds_the_layer_extents() {
    let mut doc = Document::new(ViewportElement::sized(100.0, 100.0), Style::default());
    let root = doc.root();
    let defs = doc.append(root, Node::new(NodeKind::Defs)).unwrap();
    let clip = doc
        .append(defs, clip_node("c", CoordUnits::UserSpaceOnUse))
        .unwrap();
    doc.append(clip, rect_node(0.0, 0.0, 10.0, 10.0, Style::default()))
        .unwrap();
    let g = doc
        .append(
            root,
            Node::new(NodeKind::Group).with_style(Style::default().with_clip_path("#c")),
        )
        .unwrap();
    doc.append(g, rect_node(0.0, 0.0, 50.0, 50.0, Style::default()))
        .unwrap();

    let mut be = MeasureBackend;
    let mut ctx = DrawingCtx::new(&doc, &mut be, None, MeasureSurface::new(100, 100), setup(100));
    ctx.draw_node(root, Affine::IDENTITY).unwrap();
    let drawn = ctx.finish();

    assert_eq!(
        drawn.bbox.logical.to_render_space(),
        Some(Rect::new(0.0, 0.0, 10.0, 10.0))
    );
    assert_eq!(drawn.stats.layers_pushed, drawn.stats.layers_popped);
    assert_eq!(drawn.stats.isolated_layers, 0);
    assert!(drawn.diagnostics.is_empty());
}

#[test]
fn empty_bounding_box_clip_hides_the_layer_extents() {
    let mut doc = Document::new(ViewportElement::sized(100.0, 100.0), Style::default());
    let root = doc.root();
    doc.append(root, clip_node("empty", CoordUnits::ObjectBoundingBox))
        .unwrap();
    let g = doc
        .append(
            root,
            Node::new(NodeKind::Group).with_style(Style::default().with_clip_path("#empty")),
        )
        .unwrap();
    doc.append(g, rect_node(10.0, 10.0, 40.0, 40.0, Style::default()))
        .unwrap();

    let mut be = MeasureBackend;
    let mut ctx = DrawingCtx::new(&doc, &mut be, None, MeasureSurface::new(100, 100), setup(100));
    ctx.draw_node(root, Affine::IDENTITY).unwrap();
    let drawn = ctx.finish();

    assert!(drawn.bbox.logical.is_empty());
    assert!(drawn.bbox.ink.is_empty());
    assert_eq!(drawn.stats.isolated_layers, 1);
}

#[test]
fn missing_clip_reference_is_reported_and_ignored() {
    let mut doc = Document::new(ViewportElement::sized(20.0, 20.0), Style::default());
    let root = doc.root();
    doc.append(
        root,
        rect_node(0.0, 0.0, 5.0, 5.0, Style::default().with_clip_path("#gone")),
    )
    .unwrap();

    let mut be = MeasureBackend;
    let mut ctx = DrawingCtx::new(&doc, &mut be, None, MeasureSurface::new(20, 20), setup(20));
    ctx.draw_node(root, Affine::IDENTITY).unwrap();
    let drawn = ctx.finish();

    assert_eq!(
        drawn.bbox.logical.to_render_space(),
        Some(Rect::new(0.0, 0.0, 5.0, 5.0))
    );
    assert_eq!(drawn.diagnostics.len(), 1);
    assert_eq!(drawn.diagnostics[0].kind, DiagnosticKind::MissingReference);
}

#[test]
fn failed_allocation_draws_directly_on_the_parent() {
    let mut doc = Document::new(ViewportElement::sized(8.0, 8.0), Style::default());
    let root = doc.root();
    doc.append(
        root,
        rect_node(0.0, 0.0, 8.0, 8.0, Style::filled(Color::rgb(255, 0, 0)).with_opacity(0.5))
            .with_id("half"),
    )
    .unwrap();

    let mut be = CpuBackend::new(SurfacePoolOpts {
        max_live_bytes: Some(0),
        ..SurfacePoolOpts::default()
    });
    let surface = CpuSurface::new(8, 8).unwrap();
    let mut ctx = DrawingCtx::new(&doc, &mut be, None, surface, setup(8));
    ctx.draw_node(root, Affine::IDENTITY).unwrap();
    let drawn = ctx.finish();

    assert_eq!(drawn.stats.isolated_layers, 0);
    assert_eq!(drawn.stats.layers_pushed, drawn.stats.layers_popped);
    assert_eq!(drawn.diagnostics.len(), 1);
    assert_eq!(drawn.diagnostics[0].kind, DiagnosticKind::AllocationFailed);
    assert_eq!(drawn.diagnostics[0].node.as_deref(), Some("half"));
    assert_eq!(drawn.surface.data()[3], 255);
    assert_eq!(be.pool_stats().refused, 1);
}

#[test]
fn isolated_layer_composites_with_its_opacity() {
    let mut doc = Document::new(ViewportElement::sized(8.0, 8.0), Style::default());
    let root = doc.root();
    let g = doc
        .append(
            root,
            Node::new(NodeKind::Group).with_style(Style::default().with_opacity(0.5)),
        )
        .unwrap();
    doc.append(g, rect_node(0.0, 0.0, 8.0, 8.0, Style::filled(Color::WHITE)))
        .unwrap();

    let mut be = CpuBackend::default();
    let surface = CpuSurface::new(8, 8).unwrap();
    let mut ctx = DrawingCtx::new(&doc, &mut be, None, surface, setup(8));
    ctx.draw_node(root, Affine::IDENTITY).unwrap();
    let drawn = ctx.finish();

    assert_eq!(drawn.stats.isolated_layers, 1);
    assert_eq!(drawn.stats.max_target_depth, 1);
    assert_eq!(&drawn.surface.data()[..4], &[128, 128, 128, 128]);
    assert_eq!(be.pool_stats().live_bytes, 0);
}
