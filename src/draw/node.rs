use crate::draw::context::DrawingCtx;
use crate::draw::pattern::painted_area;
use crate::draw::viewport::ViewportFrame;
use crate::foundation::core::{Affine, BezPath, Color, Rect};
use crate::foundation::diagnostics::DiagnosticKind;
use crate::foundation::error::VellumResult;
use crate::geometry::bbox::{BboxPair, BoundingBox};
use crate::geometry::length::LengthDir;
use crate::render::backend::{Backend, ClipGeometry, PathPaint};
use crate::tree::document::{ImageElement, NodeId, NodeKind, TextElement, UseElement, ViewportElement};
use crate::tree::style::{LineCap, LineJoin, Paint, Style};
use kurbo::Shape;

fn is_use_target(kind: &NodeKind) -> bool {
    !matches!(
        kind,
        NodeKind::ClipPath(_)
            | NodeKind::Mask(_)
            | NodeKind::Filter(_)
            | NodeKind::Marker(_)
            | NodeKind::Pattern(_)
            | NodeKind::Defs
    )
}

/// Color painted directly for `paint`: the color itself, or a server's fallback.
fn solid_color(paint: &Paint, opacity: f32) -> Color {
    let color = match paint {
        Paint::None => None,
        Paint::Color(c) => Some(*c),
        Paint::Server { fallback, .. } => *fallback,
    };
    color.map_or(Color::rgba(0, 0, 0, 0), |c| c.with_opacity(opacity))
}

fn fill_paint(style: &Style) -> PathPaint {
    PathPaint::Fill {
        color: solid_color(&style.fill, style.fill_opacity),
        rule: style.fill_rule,
    }
}

/// An outline being painted, with what paint servers need to know about it.
struct Outline<'p> {
    path: &'p BezPath,
    affine: Affine,
    /// Geometric extents in user space.
    bbox: Option<Rect>,
    text: bool,
}

fn union(a: Option<Rect>, b: Option<Rect>) -> Option<Rect> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

impl<'a, B: Backend> DrawingCtx<'a, B> {
    /// Draw node `id` under `parent`, honoring the subtree restriction.
    ///
    /// While a restriction is active only the next node of the chain is entered; its siblings
    /// return without touching any stack.
    pub(crate) fn draw_node(&mut self, id: NodeId, parent: Affine) -> VellumResult<()> {
        let entered = match self.drawsub.last() {
            Some(&next) if next != id => return Ok(()),
            Some(_) => self.drawsub.pop(),
            None => None,
        };
        let drawn = self.draw_node_unrestricted(id, parent);
        if let Some(next) = entered {
            self.drawsub.push(next);
        }
        drawn
    }

    pub(crate) fn draw_children(&mut self, id: NodeId, affine: Affine) -> VellumResult<()> {
        let doc = self.doc;
        for &child in doc.node(id).children() {
            self.draw_node(child, affine)?;
        }
        Ok(())
    }

    fn draw_node_unrestricted(&mut self, id: NodeId, parent: Affine) -> VellumResult<()> {
        let doc = self.doc;
        let node = doc.node(id);
        let affine = parent * node.style.transform;
        match &node.kind {
            NodeKind::Group => self.with_layer(id, affine, |ctx| ctx.draw_children(id, affine)),
            NodeKind::Viewport(element) => {
                let frame = self.viewport_frame(id, element, &node.style);
                self.draw_in_viewport(id, affine, frame)
            }
            NodeKind::Shape(path) => {
                self.with_layer(id, affine, |ctx| ctx.draw_shape(id, path, affine))
            }
            NodeKind::Image(image) => {
                self.with_layer(id, affine, |ctx| ctx.draw_image(id, image, affine))
            }
            NodeKind::Text(text) => {
                self.with_layer(id, affine, |ctx| ctx.draw_text(id, text, affine))
            }
            NodeKind::Use(element) => self.draw_use(id, element, affine),
            NodeKind::Symbol(_)
            | NodeKind::ClipPath(_)
            | NodeKind::Mask(_)
            | NodeKind::Filter(_)
            | NodeKind::Marker(_)
            | NodeKind::Pattern(_)
            | NodeKind::Defs => Ok(()),
        }
    }

    fn viewport_frame(&self, id: NodeId, element: &ViewportElement, style: &Style) -> ViewportFrame {
        if id == self.doc.root() {
            let (w, h) = self.setup.root_size;
            return ViewportFrame {
                rect: Rect::new(0.0, 0.0, w, h),
                view_box: element.view_box,
                aspect: element.aspect,
                clip: false,
            };
        }
        let params = self.normalize_params(style.font_size);
        let x = element.x.normalize(LengthDir::Horizontal, &params);
        let y = element.y.normalize(LengthDir::Vertical, &params);
        let w = element.width.normalize(LengthDir::Horizontal, &params);
        let h = element.height.normalize(LengthDir::Vertical, &params);
        ViewportFrame {
            rect: Rect::new(x, y, x + w, y + h),
            view_box: element.view_box,
            aspect: element.aspect,
            clip: !style.overflow_visible,
        }
    }

    pub(crate) fn stroke_width(&self, style: &Style) -> f64 {
        self.normalize(&style.stroke.width, LengthDir::Both, style.font_size)
    }

    fn stroke_paint(&self, style: &Style) -> Option<PathPaint> {
        if style.stroke.paint == Paint::None {
            return None;
        }
        let width = self.stroke_width(style);
        if !(width > 0.0 && width.is_finite()) {
            return None;
        }
        let cap = match style.stroke.cap {
            LineCap::Butt => kurbo::Cap::Butt,
            LineCap::Round => kurbo::Cap::Round,
            LineCap::Square => kurbo::Cap::Square,
        };
        let join = match style.stroke.join {
            LineJoin::Miter => kurbo::Join::Miter,
            LineJoin::Round => kurbo::Join::Round,
            LineJoin::Bevel => kurbo::Join::Bevel,
        };
        let mut stroke = kurbo::Stroke::new(width)
            .with_caps(cap)
            .with_join(join)
            .with_miter_limit(style.stroke.miter_limit);

        let params = self.normalize_params(style.font_size);
        let mut dashes: Vec<f64> = style
            .stroke
            .dashes
            .iter()
            .map(|d| d.normalize(LengthDir::Both, &params))
            .collect();
        if dashes.len() % 2 == 1 {
            dashes.extend_from_within(..);
        }
        let total: f64 = dashes.iter().sum();
        if !dashes.is_empty() && dashes.iter().all(|d| *d >= 0.0) && total > 0.0 {
            let offset = style.stroke.dash_offset.normalize(LengthDir::Both, &params);
            stroke = stroke.with_dashes(offset, dashes);
        }

        Some(PathPaint::Stroke {
            color: solid_color(&style.stroke.paint, style.stroke.opacity),
            stroke,
        })
    }

    /// Add user-space extents recorded under `affine` to the current boxes.
    fn insert_extents(&mut self, id: NodeId, affine: Affine, logical: Option<Rect>, ink: Option<Rect>) {
        let boxed = |r: Option<Rect>| match r {
            Some(r) => BoundingBox::from_rect(affine, r),
            None => BoundingBox::new(affine),
        };
        let pair = BboxPair {
            logical: boxed(logical),
            ink: boxed(ink),
        };
        if !self.bbox.insert(&pair) {
            self.report(
                DiagnosticKind::SingularTransform,
                id,
                "extents could not be reprojected into the enclosing box",
            );
        }
    }

    /// Fill, stroke and extents of an outline shared by shapes and text.
    fn paint_outline(
        &mut self,
        id: NodeId,
        outline: &BezPath,
        affine: Affine,
        style: &Style,
        text: bool,
    ) -> VellumResult<(Option<Rect>, Option<Rect>)> {
        let fill = fill_paint(style);
        let stroke = self.stroke_paint(style);
        let fill_extents = self.backend.path_extents(outline, &fill);
        let stroke_extents = stroke
            .as_ref()
            .and_then(|s| self.backend.path_extents(outline, s));

        if style.visible {
            let target = Outline {
                path: outline,
                affine,
                bbox: fill_extents,
                text,
            };
            self.paint_with(id, &target, &style.fill, style.fill_opacity, &fill)?;
            if let Some(stroke) = &stroke {
                self.paint_with(id, &target, &style.stroke.paint, style.stroke.opacity, stroke)?;
            }
        }
        Ok((fill_extents, union(fill_extents, stroke_extents)))
    }

    /// Paint one of an outline's fill or stroke. `geometry` already carries the solid color.
    fn paint_with(
        &mut self,
        id: NodeId,
        outline: &Outline<'_>,
        paint: &Paint,
        opacity: f32,
        geometry: &PathPaint,
    ) -> VellumResult<()> {
        let solid = match paint {
            Paint::None => false,
            Paint::Color(_) => true,
            Paint::Server { iri, fallback } => {
                let area = painted_area(outline.path, outline.affine, geometry);
                let extent = self.backend.path_extents(outline.path, geometry);
                let served = self.paint_pattern(id, iri, area, extent, outline.bbox, opacity)?;
                !served && fallback.is_some()
            }
        };
        if !solid {
            return Ok(());
        }
        let transform = self.device_transform(outline.affine);
        if outline.text {
            self.backend
                .draw_text(&mut self.current, outline.path, transform, geometry)
        } else {
            self.backend
                .draw_path(&mut self.current, outline.path, transform, geometry)
        }
    }

    fn draw_shape(&mut self, id: NodeId, path: &BezPath, affine: Affine) -> VellumResult<()> {
        let doc = self.doc;
        let style = &doc.node(id).style;
        if self.collecting_clip() {
            if style.visible {
                self.collect_clip(ClipGeometry {
                    path: path.clone(),
                    transform: affine,
                    rule: style.clip_rule,
                });
            }
            return Ok(());
        }

        let (logical, ink) = self.paint_outline(id, path, affine, style, false)?;
        self.insert_extents(id, affine, logical, ink);

        if !style.markers.is_empty() {
            let width = self.stroke_width(style);
            self.draw_markers(id, path, affine, width)?;
        }
        Ok(())
    }

    fn draw_text(&mut self, id: NodeId, text: &TextElement, affine: Affine) -> VellumResult<()> {
        let doc = self.doc;
        let style = &doc.node(id).style;
        if self.collecting_clip() {
            if style.visible {
                self.collect_clip(ClipGeometry {
                    path: text.outlines.clone(),
                    transform: affine,
                    rule: style.clip_rule,
                });
            }
            return Ok(());
        }

        let (_, ink) = self.paint_outline(id, &text.outlines, affine, style, true)?;
        self.insert_extents(id, affine, Some(text.logical), ink);
        Ok(())
    }

    fn draw_image(&mut self, id: NodeId, image: &ImageElement, affine: Affine) -> VellumResult<()> {
        let doc = self.doc;
        let style = &doc.node(id).style;
        let params = self.normalize_params(style.font_size);
        let x = image.x.normalize(LengthDir::Horizontal, &params);
        let y = image.y.normalize(LengthDir::Vertical, &params);
        let w = image.width.normalize(LengthDir::Horizontal, &params);
        let h = image.height.normalize(LengthDir::Vertical, &params);
        if w <= 0.0 || h <= 0.0 {
            return Ok(());
        }
        let viewport = Rect::new(x, y, x + w, y + h);

        if self.collecting_clip() {
            if style.visible {
                self.collect_clip(ClipGeometry {
                    path: viewport.to_path(0.1),
                    transform: affine,
                    rule: style.clip_rule,
                });
            }
            return Ok(());
        }

        self.insert_extents(id, affine, Some(viewport), Some(viewport));
        let pixels = &image.pixels;
        if !style.visible || pixels.width == 0 || pixels.height == 0 {
            return Ok(());
        }
        if !pixels.is_well_formed() {
            self.report(
                DiagnosticKind::Unsupported,
                id,
                "image pixel buffer does not match its size",
            );
            return Ok(());
        }

        let (pw, ph) = (f64::from(pixels.width), f64::from(pixels.height));
        let placed = image.aspect.place((pw, ph), viewport);
        let transform = self.device_transform(
            affine
                * Affine::translate((placed.x0, placed.y0))
                * Affine::scale_non_uniform(placed.width() / pw, placed.height() / ph),
        );

        let overflows = placed.x0 < viewport.x0
            || placed.y0 < viewport.y0
            || placed.x1 > viewport.x1
            || placed.y1 > viewport.y1;
        if !overflows {
            return self.backend.draw_image(&mut self.current, pixels, transform);
        }
        let saved = self.backend.clip_snapshot(&self.current);
        let clip_transform = self.device_transform(affine);
        let drawn = self
            .backend
            .clip_rect(&mut self.current, viewport, clip_transform)
            .and_then(|()| self.backend.draw_image(&mut self.current, pixels, transform));
        self.backend.restore_clip(&mut self.current, saved);
        drawn
    }

    fn draw_use(&mut self, id: NodeId, element: &UseElement, affine: Affine) -> VellumResult<()> {
        let doc = self.doc;
        let Some(target) = self.resolve(&element.href, id, "use", is_use_target) else {
            return Ok(());
        };
        if doc.is_ancestor(target, id) {
            self.report(
                DiagnosticKind::CyclicReference,
                id,
                format!("use '{}' references one of its ancestors", element.href),
            );
            return Ok(());
        }

        let params = self.normalize_params(doc.node(id).style.font_size);
        let x = element.x.normalize(LengthDir::Horizontal, &params);
        let y = element.y.normalize(LengthDir::Vertical, &params);
        let w = element.width.normalize(LengthDir::Horizontal, &params);
        let h = element.height.normalize(LengthDir::Vertical, &params);
        let placed = affine * Affine::translate((x, y));

        let Some(mut guard) = self.acquire(target, id) else {
            return Ok(());
        };
        let ctx: &mut Self = &mut guard;
        ctx.with_layer(id, affine, |ctx| {
            ctx.with_drawsub_suspended(|ctx| {
                let target_node = doc.node(target);
                match &target_node.kind {
                    NodeKind::Symbol(symbol) => {
                        let frame = ViewportFrame {
                            rect: Rect::new(0.0, 0.0, w, h),
                            view_box: symbol.view_box,
                            aspect: symbol.aspect,
                            clip: !target_node.style.overflow_visible,
                        };
                        ctx.draw_in_viewport(target, placed * target_node.style.transform, frame)
                    }
                    _ => ctx.draw_node(target, placed),
                }
            })
        })
    }
}
