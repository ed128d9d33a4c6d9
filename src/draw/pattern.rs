use crate::draw::context::DrawingCtx;
use crate::foundation::core::{Affine, BezPath, Rect};
use crate::foundation::diagnostics::DiagnosticKind;
use crate::foundation::error::VellumResult;
use crate::foundation::math::opacity_to_u8;
use crate::geometry::bbox::transform_rect;
use crate::geometry::length::LengthDir;
use crate::render::backend::{Backend, ClipGeometry, PathPaint};
use crate::tree::document::{NodeId, NodeKind, PatternElement};
use crate::tree::style::{CompOp, CoordUnits, FillRule};
use std::ops::Range;

/// Tiles drawn for one painted outline before the pattern is given up.
const MAX_TILES: i64 = 4096;

fn is_pattern(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Pattern(_))
}

/// Area covered by `paint` applied to `path`, as clip geometry in the path's user space.
pub(crate) fn painted_area(path: &BezPath, affine: Affine, paint: &PathPaint) -> ClipGeometry {
    match paint {
        PathPaint::Fill { rule, .. } => ClipGeometry {
            path: path.clone(),
            transform: affine,
            rule: *rule,
        },
        PathPaint::Stroke { stroke, .. } => ClipGeometry {
            path: kurbo::stroke(path.iter(), stroke, &kurbo::StrokeOpts::default(), 0.1),
            transform: affine,
            rule: FillRule::NonZero,
        },
    }
}

/// Tile grid of a pattern resolved against one painted outline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PatternTiles {
    /// Pattern space in the outline's user space; tile `(0, 0)` starts at its origin.
    pub(crate) space: Affine,
    /// Tile size in pattern space.
    pub(crate) size: (f64, f64),
    /// Content transform relative to a tile's origin.
    pub(crate) content: Affine,
    /// Viewport established for the content, if any.
    pub(crate) viewport: Option<(f64, f64)>,
}

impl PatternTiles {
    /// Column and row ranges of the tiles overlapping `extent`, given in user space.
    pub(crate) fn covering(&self, extent: Rect) -> Option<(Range<i64>, Range<i64>)> {
        if self.space.determinant().abs() < f64::EPSILON {
            return None;
        }
        let r = transform_rect(self.space.inverse(), extent);
        let (w, h) = self.size;
        let cols = (r.x0 / w).floor() as i64..(r.x1 / w).ceil() as i64;
        let rows = (r.y0 / h).floor() as i64..(r.y1 / h).ceil() as i64;
        Some((cols, rows))
    }
}

impl<'a, B: Backend> DrawingCtx<'a, B> {
    /// Resolve the tile grid of `element` for an outline with geometric extents `bbox`.
    ///
    /// `None` when the pattern paints nothing: a zero-sized tile, or bounding-box units on an
    /// outline without area.
    pub(crate) fn pattern_tiles(
        &self,
        element: &PatternElement,
        transform: Affine,
        font_size: f64,
        bbox: Option<Rect>,
    ) -> Option<PatternTiles> {
        let needs_bbox = element.units == CoordUnits::ObjectBoundingBox
            || (element.view_box.is_none()
                && element.content_units == CoordUnits::ObjectBoundingBox);
        let bbox = bbox.filter(|b| b.width() > 0.0 && b.height() > 0.0);
        if needs_bbox && bbox.is_none() {
            return None;
        }
        let b = bbox.unwrap_or(Rect::ZERO);

        let mut params = self.normalize_params(font_size);
        if element.units == CoordUnits::ObjectBoundingBox {
            params.viewport = (1.0, 1.0);
        }
        let x = element.x.normalize(LengthDir::Horizontal, &params);
        let y = element.y.normalize(LengthDir::Vertical, &params);
        let w = element.width.normalize(LengthDir::Horizontal, &params);
        let h = element.height.normalize(LengthDir::Vertical, &params);
        let (origin, w, h) = match element.units {
            CoordUnits::UserSpaceOnUse => ((x, y), w, h),
            CoordUnits::ObjectBoundingBox => (
                (b.x0 + x * b.width(), b.y0 + y * b.height()),
                w * b.width(),
                h * b.height(),
            ),
        };
        if !(w > f64::EPSILON && h > f64::EPSILON) {
            return None;
        }

        let (content, viewport) = match element.view_box {
            Some(vb) => (
                element
                    .aspect
                    .view_box_transform(vb, Rect::new(0.0, 0.0, w, h))?,
                Some((vb.width(), vb.height())),
            ),
            None if element.content_units == CoordUnits::ObjectBoundingBox => (
                Affine::scale_non_uniform(b.width(), b.height()),
                Some((1.0, 1.0)),
            ),
            None => (Affine::IDENTITY, None),
        };

        Some(PatternTiles {
            space: transform * Affine::translate(origin),
            size: (w, h),
            content,
            viewport,
        })
    }

    /// Fill `area` with tiles of pattern `iri`.
    ///
    /// `extent` is the user-space extent of `area` and `bbox` the outline's geometric box.
    /// Returns `false` when the pattern could not be used and the fallback paint applies.
    pub(crate) fn paint_pattern(
        &mut self,
        owner: NodeId,
        iri: &str,
        area: ClipGeometry,
        extent: Option<Rect>,
        bbox: Option<Rect>,
        opacity: f32,
    ) -> VellumResult<bool> {
        let Some(pattern) = self.resolve(iri, owner, "paint", is_pattern) else {
            return Ok(false);
        };
        let doc = self.doc;
        let node = doc.node(pattern);
        let NodeKind::Pattern(element) = &node.kind else {
            return Ok(false);
        };
        if node.children().is_empty() {
            return Ok(false);
        }
        let Some(extent) = extent else {
            return Ok(true);
        };
        let Some(tiles) =
            self.pattern_tiles(element, node.style.transform, node.style.font_size, bbox)
        else {
            return Ok(false);
        };
        let Some((cols, rows)) = tiles.covering(extent) else {
            self.report(
                DiagnosticKind::SingularTransform,
                owner,
                format!("pattern '{iri}' has a singular transform"),
            );
            return Ok(false);
        };
        let count = (cols.end - cols.start).max(0) * (rows.end - rows.start).max(0);
        if count > MAX_TILES {
            self.report(
                DiagnosticKind::Unsupported,
                owner,
                format!("pattern '{iri}' needs {count} tiles, more than {MAX_TILES}"),
            );
            return Ok(false);
        }

        let Some(mut guard) = self.acquire(pattern, owner) else {
            return Ok(false);
        };
        let ctx: &mut Self = &mut guard;

        let alpha = opacity_to_u8(opacity);
        let mut isolated = false;
        if alpha != u8::MAX {
            match ctx.backend.create_surface(ctx.setup.width, ctx.setup.height) {
                Ok(surface) => {
                    ctx.push_target(surface);
                    isolated = true;
                }
                Err(err) => ctx.report(
                    DiagnosticKind::AllocationFailed,
                    owner,
                    format!("pattern '{iri}' drawn without opacity: {err}"),
                ),
            }
        }

        let saved = ctx.backend.clip_snapshot(&ctx.current);
        let drawn = ctx.draw_tiles(pattern, &tiles, area, cols, rows);
        ctx.backend.restore_clip(&mut ctx.current, saved);

        if isolated {
            let layer = ctx.pop_target()?;
            let offset = ctx.root_offset();
            let composited = ctx.backend.composite(
                &mut ctx.current,
                &layer,
                offset,
                CompOp::SrcOver,
                alpha,
            );
            ctx.backend.release_surface(layer);
            composited?;
        }
        drawn?;
        Ok(true)
    }

    fn draw_tiles(
        &mut self,
        pattern: NodeId,
        tiles: &PatternTiles,
        area: ClipGeometry,
        cols: Range<i64>,
        rows: Range<i64>,
    ) -> VellumResult<()> {
        let affine = area.transform;
        let device = ClipGeometry {
            transform: self.device_transform(affine),
            ..area
        };
        self.backend.clip_paths(&mut self.current, &[device])?;

        let (w, h) = tiles.size;
        self.with_detached_bbox(|ctx| {
            ctx.with_drawsub_suspended(|ctx| {
                for row in rows {
                    for col in cols.clone() {
                        let origin = affine
                            * tiles.space
                            * Affine::translate((col as f64 * w, row as f64 * h));
                        let state = ctx.backend.clip_snapshot(&ctx.current);
                        let drawn = ctx.draw_tile(pattern, tiles, origin);
                        ctx.backend.restore_clip(&mut ctx.current, state);
                        drawn?;
                    }
                }
                Ok(())
            })
        })
    }

    fn draw_tile(&mut self, pattern: NodeId, tiles: &PatternTiles, origin: Affine) -> VellumResult<()> {
        let (w, h) = tiles.size;
        let transform = self.device_transform(origin);
        self.backend
            .clip_rect(&mut self.current, Rect::new(0.0, 0.0, w, h), transform)?;
        let content = origin * tiles.content;
        match tiles.viewport {
            Some(size) => self.with_viewport(size, |ctx| ctx.draw_children(pattern, content)),
            None => self.draw_children(pattern, content),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/draw/pattern.rs"]
mod tests;
