use super::*;
use crate::draw::context::DrawSetup;
use crate::foundation::core::{Color, Vec2};
use crate::geometry::length::Length;
use crate::render::cpu::{CpuBackend, CpuSurface};
use crate::render::measure::{MeasureBackend, MeasureSurface};
use crate::tree::document::{Document, Node, ViewportElement};
use crate::tree::style::Style;
use kurbo::Shape;

fn setup(w: u32, h: u32) -> DrawSetup {
    DrawSetup {
        width: w,
        height: h,
        offset: Vec2::ZERO,
        dpi: (90.0, 90.0),
        root_size: (f64::from(w), f64::from(h)),
        root_transform: Affine::IDENTITY,
    }
}

fn empty_doc() -> Document {
    Document::new(ViewportElement::sized(100.0, 50.0), Style::default())
}

#[test]
fn default_region_pads_the_bounding_box_by_ten_percent() {
    let doc = empty_doc();
    let mut be = MeasureBackend;
    let ctx = DrawingCtx::new(&doc, &mut be, None, MeasureSurface::new(100, 50), setup(100, 50));

    let region = ctx.mask_region(
        &MaskElement::default(),
        12.0,
        &Rect::new(0.0, 0.0, 100.0, 50.0),
        false,
    );
    let r = region.expect("non-empty region");
    assert!((r.x0 + 10.0).abs() < 1e-9 && (r.y0 + 5.0).abs() < 1e-9);
    assert!((r.x1 - 110.0).abs() < 1e-9 && (r.y1 - 55.0).abs() < 1e-9);
    ctx.finish();
}

#[test]
fn bounding_box_region_of_an_empty_box_covers_nothing() {
    let doc = empty_doc();
    let mut be = MeasureBackend;
    let ctx = DrawingCtx::new(&doc, &mut be, None, MeasureSurface::new(100, 50), setup(100, 50));
    let region = ctx.mask_region(&MaskElement::default(), 12.0, &Rect::ZERO, true);
    assert_eq!(region, None);
    ctx.finish();
}

#[test]
fn user_space_region_resolves_percentages_against_the_viewport() {
    let doc = empty_doc();
    let mut be = MeasureBackend;
    let ctx = DrawingCtx::new(&doc, &mut be, None, MeasureSurface::new(100, 50), setup(100, 50));
    let element = MaskElement {
        units: CoordUnits::UserSpaceOnUse,
        x: Length::percent(10.0),
        y: Length::px(0.0),
        width: Length::percent(50.0),
        height: Length::percent(50.0),
        ..MaskElement::default()
    };
    let region = ctx.mask_region(&element, 12.0, &Rect::ZERO, true);
    assert_eq!(region, Some(Rect::new(10.0, 0.0, 60.0, 25.0)));

    let zero = MaskElement {
        width: Length::zero(),
        ..element
    };
    assert_eq!(ctx.mask_region(&zero, 12.0, &Rect::ZERO, true), None);
    ctx.finish();
}

#[test]
fn missing_mask_asks_for_a_plain_composite() {
    let doc = empty_doc();
    let mut be = MeasureBackend;
    let mut ctx = DrawingCtx::new(&doc, &mut be, None, MeasureSurface::new(100, 50), setup(100, 50));
    let mask = ctx
        .generate_mask("#nowhere", doc.root(), Affine::IDENTITY, 255)
        .unwrap();
    assert!(mask.is_none());
    assert_eq!(ctx.diagnostics[0].kind, DiagnosticKind::MissingReference);
    assert!(ctx.targets.is_empty());
    ctx.finish();
}

#[test]
fn white_content_becomes_opaque_alpha() {
    let mut doc = Document::new(ViewportElement::sized(4.0, 2.0), Style::default());
    let mask = doc
        .append(
            doc.root(),
            Node::new(NodeKind::Mask(MaskElement {
                units: CoordUnits::UserSpaceOnUse,
                x: Length::zero(),
                y: Length::zero(),
                width: Length::percent(100.0),
                height: Length::percent(100.0),
                ..MaskElement::default()
            }))
            .with_id("m"),
        )
        .unwrap();
    let left = Rect::new(0.0, 0.0, 2.0, 2.0).to_path(0.1);
    doc.append(
        mask,
        Node::new(NodeKind::Shape(left)).with_style(Style::filled(Color::WHITE)),
    )
    .unwrap();

    let mut be = CpuBackend::default();
    let surface = CpuSurface::new(4, 2).unwrap();
    let mut ctx = DrawingCtx::new(&doc, &mut be, None, surface, setup(4, 2));
    let alpha = ctx
        .generate_mask("#m", doc.root(), Affine::IDENTITY, 255)
        .unwrap()
        .expect("mask rendered");
    assert_eq!(alpha, vec![255, 255, 0, 0, 255, 255, 0, 0]);

    let half = ctx
        .generate_mask("#m", doc.root(), Affine::IDENTITY, 128)
        .unwrap()
        .expect("mask rendered");
    assert_eq!(half[0], 128);
    assert!(ctx.bbox.ink.is_empty());
    ctx.finish();
}
