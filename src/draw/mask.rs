use crate::draw::clip::bbox_affine;
use crate::draw::context::DrawingCtx;
use crate::foundation::core::{Affine, Rect};
use crate::foundation::diagnostics::DiagnosticKind;
use crate::foundation::error::VellumResult;
use crate::geometry::length::LengthDir;
use crate::render::backend::Backend;
use crate::render::composite::luminance_mask;
use crate::tree::document::{MaskElement, NodeId, NodeKind};
use crate::tree::style::CoordUnits;

fn is_mask(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Mask(_))
}

impl<'a, B: Backend> DrawingCtx<'a, B> {
    /// Render mask `iri` for `owner` and turn it into per-pixel alpha laid out like a layer.
    ///
    /// `opacity` is folded into the mask. `None` means the mask could not be used and the layer
    /// should be composited with plain opacity instead.
    pub(crate) fn generate_mask(
        &mut self,
        iri: &str,
        owner: NodeId,
        affine: Affine,
        opacity: u8,
    ) -> VellumResult<Option<Vec<u8>>> {
        let Some(mask) = self.resolve(iri, owner, "mask", is_mask) else {
            return Ok(None);
        };
        let doc = self.doc;
        let node = doc.node(mask);
        let NodeKind::Mask(element) = &node.kind else {
            return Ok(None);
        };
        let Some(mut guard) = self.acquire(mask, owner) else {
            return Ok(None);
        };
        let ctx: &mut Self = &mut guard;

        let bbox = ctx.bbox.logical;
        let (width, height) = (ctx.setup.width, ctx.setup.height);
        let surface = match ctx.backend.create_surface(width, height) {
            Ok(surface) => surface,
            Err(err) => {
                ctx.report(
                    DiagnosticKind::AllocationFailed,
                    owner,
                    format!("mask '{iri}' skipped: {err}"),
                );
                return Ok(None);
            }
        };
        ctx.push_target(surface);

        let region = ctx.mask_region(element, node.style.font_size, &bbox.rect, bbox.is_empty());
        let drawn = match region {
            Some(rect) => {
                let transform = ctx.device_transform(affine);
                match ctx.backend.clip_rect(&mut ctx.current, rect, transform) {
                    Ok(()) => ctx.with_detached_bbox(|ctx| {
                        ctx.with_drawsub_suspended(|ctx| match element.content_units {
                            CoordUnits::UserSpaceOnUse => ctx.draw_children(mask, affine),
                            CoordUnits::ObjectBoundingBox if bbox.is_empty() => Ok(()),
                            CoordUnits::ObjectBoundingBox => {
                                let content = affine * bbox_affine(&bbox);
                                ctx.with_viewport((1.0, 1.0), |ctx| {
                                    ctx.draw_children(mask, content)
                                })
                            }
                        })
                    }),
                    Err(err) => Err(err),
                }
            }
            None => Ok(()),
        };

        let surface = ctx.pop_target()?;
        let mut pixels = ctx.backend.create_pixel_buffer(width, height);
        ctx.backend.read_pixels(&surface, &mut pixels);
        ctx.backend.release_surface(surface);
        drawn?;

        Ok(Some(luminance_mask(&pixels.data, opacity)))
    }

    /// Mask rectangle in the owner's user space, `None` when it covers nothing.
    fn mask_region(
        &self,
        element: &MaskElement,
        font_size: f64,
        bbox: &Rect,
        bbox_empty: bool,
    ) -> Option<Rect> {
        let mut params = self.normalize_params(font_size);
        if element.units == CoordUnits::ObjectBoundingBox {
            if bbox_empty {
                return None;
            }
            params.viewport = (1.0, 1.0);
        }
        let x = element.x.normalize(LengthDir::Horizontal, &params);
        let y = element.y.normalize(LengthDir::Vertical, &params);
        let w = element.width.normalize(LengthDir::Horizontal, &params);
        let h = element.height.normalize(LengthDir::Vertical, &params);
        if w <= 0.0 || h <= 0.0 {
            return None;
        }
        let rect = match element.units {
            CoordUnits::UserSpaceOnUse => Rect::new(x, y, x + w, y + h),
            CoordUnits::ObjectBoundingBox => {
                let bx = bbox.x0 + x * bbox.width();
                let by = bbox.y0 + y * bbox.height();
                Rect::new(bx, by, bx + w * bbox.width(), by + h * bbox.height())
            }
        };
        Some(rect)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/draw/mask.rs"]
mod tests;
