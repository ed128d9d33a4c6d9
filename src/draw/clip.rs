use crate::draw::context::DrawingCtx;
use crate::foundation::core::{Affine, Rect};
use crate::foundation::error::VellumResult;
use crate::geometry::bbox::{BoundingBox, transform_rect};
use crate::render::backend::{Backend, ClipGeometry};
use crate::tree::document::{NodeId, NodeKind};
use crate::tree::style::CoordUnits;
use kurbo::Shape;

/// Affine mapping the unit square onto `bbox`'s rectangle, in the box's own space.
pub(crate) fn bbox_affine(bbox: &BoundingBox) -> Affine {
    let r = bbox.rect;
    Affine::translate((r.x0, r.y0)) * Affine::scale_non_uniform(r.width(), r.height())
}

impl<'a, B: Backend> DrawingCtx<'a, B> {
    /// Intersect the current target's clip with the geometry of clip path `clip`.
    ///
    /// `affine` is the owner's user space; `bbox` is the owner's geometric box and is only read
    /// for `objectBoundingBox` units. Returns the render-space extent of the clip geometry (an
    /// empty box when everything was clipped away), or `None` when the clip was skipped.
    pub(crate) fn apply_clip(
        &mut self,
        clip: NodeId,
        owner: NodeId,
        affine: Affine,
        bbox: Option<&BoundingBox>,
    ) -> VellumResult<Option<BoundingBox>> {
        let doc = self.doc;
        let node = doc.node(clip);
        let NodeKind::ClipPath(element) = &node.kind else {
            return Ok(None);
        };
        let Some(mut guard) = self.acquire(clip, owner) else {
            return Ok(None);
        };
        let ctx: &mut Self = &mut guard;

        let base = match element.units {
            CoordUnits::UserSpaceOnUse => affine * node.style.transform,
            CoordUnits::ObjectBoundingBox => match bbox {
                Some(b) if !b.is_empty() => affine * node.style.transform * bbox_affine(b),
                _ => {
                    ctx.backend.clip_paths(&mut ctx.current, &[])?;
                    return Ok(Some(BoundingBox::new(Affine::IDENTITY)));
                }
            },
        };

        let depth = (
            ctx.targets.len(),
            ctx.aux.len(),
            ctx.bbox_stack.len(),
            ctx.viewports.len(),
        );
        let outer_sink = ctx.clip_sink.replace(Vec::new());
        let drawn = ctx.with_detached_bbox(|ctx| {
            ctx.with_drawsub_suspended(|ctx| ctx.draw_children(clip, base))
        });
        let geometry = std::mem::replace(&mut ctx.clip_sink, outer_sink).unwrap_or_default();
        debug_assert_eq!(
            depth,
            (
                ctx.targets.len(),
                ctx.aux.len(),
                ctx.bbox_stack.len(),
                ctx.viewports.len(),
            ),
            "clip application changed stack depth"
        );
        drawn?;

        let mut extent: Option<Rect> = None;
        let device: Vec<ClipGeometry> = geometry
            .into_iter()
            .map(|g| {
                if !g.path.elements().is_empty() {
                    let r = transform_rect(g.transform, g.path.bounding_box());
                    extent = Some(extent.map_or(r, |e| e.union(r)));
                }
                ClipGeometry {
                    transform: ctx.device_transform(g.transform),
                    ..g
                }
            })
            .collect();
        ctx.backend.clip_paths(&mut ctx.current, &device)?;

        Ok(Some(match extent {
            Some(r) => BoundingBox::from_rect(Affine::IDENTITY, r),
            None => BoundingBox::new(Affine::IDENTITY),
        }))
    }

    /// Record clip geometry for the node being collected.
    pub(crate) fn collect_clip(&mut self, geometry: ClipGeometry) {
        if let Some(sink) = self.clip_sink.as_mut() {
            sink.push(geometry);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/draw/clip.rs"]
mod tests;
