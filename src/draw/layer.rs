use crate::draw::context::DrawingCtx;
use crate::foundation::core::{Affine, PixelBuffer};
use crate::foundation::diagnostics::DiagnosticKind;
use crate::foundation::error::VellumResult;
use crate::foundation::math::opacity_to_u8;
use crate::geometry::bbox::{BboxPair, BoundingBox};
use crate::render::backend::Backend;
use crate::tree::document::{NodeId, NodeKind};
use crate::tree::style::{BackgroundMode, CompOp, CoordUnits, EffectRefs};

/// Return `true` when a node with these effects must be drawn on its own offscreen target.
///
/// `clip_units` are the units of the resolved clip path, `None` when there is none. A clip in
/// `objectBoundingBox` units needs the finished bounding box, so it is applied when the layer is
/// composited, which requires isolation.
pub fn needs_isolation(effects: &EffectRefs, clip_units: Option<CoordUnits>) -> bool {
    opacity_to_u8(effects.opacity) != u8::MAX
        || effects.filter.is_some()
        || effects.mask.is_some()
        || clip_units == Some(CoordUnits::ObjectBoundingBox)
        || effects.comp_op != CompOp::SrcOver
        || effects.background != BackgroundMode::Accumulate
}

/// Token returned by [`DrawingCtx::push_layer`]; the isolation decision travels with it so the
/// matching pop cannot disagree.
#[must_use = "a pushed layer must be handed back to pop_layer"]
pub(crate) struct Layer<'a, C> {
    node: NodeId,
    affine: Affine,
    clip_state: C,
    /// Render-space extent of a clip applied at push time.
    clip_extent: Option<BoundingBox>,
    /// A bounding-box frame was opened and must be merged back.
    framed: bool,
    kind: LayerKind<'a>,
}

enum LayerKind<'a> {
    Direct,
    Isolated(Isolation<'a>),
}

struct Isolation<'a> {
    late_clip: Option<NodeId>,
    filter: Option<NodeId>,
    mask: Option<&'a str>,
    opacity: u8,
    comp_op: CompOp,
}

fn is_clip_path(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::ClipPath(_))
}

fn is_filter(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Filter(_))
}

impl<'a, B: Backend> DrawingCtx<'a, B> {
    /// Draw `f` inside the layer of node `id`, always closing the layer.
    pub(crate) fn with_layer(
        &mut self,
        id: NodeId,
        affine: Affine,
        f: impl FnOnce(&mut Self) -> VellumResult<()>,
    ) -> VellumResult<()> {
        let layer = self.push_layer(id, affine)?;
        let drawn = f(self);
        let popped = self.pop_layer(layer);
        drawn.and(popped)
    }

    /// Open the layer of node `id`, whose user space maps to render space through `affine`.
    pub(crate) fn push_layer(
        &mut self,
        id: NodeId,
        affine: Affine,
    ) -> VellumResult<Layer<'a, B::ClipState>> {
        let clip_state = self.backend.clip_snapshot(&self.current);
        if self.collecting_clip() {
            self.stats.layers_pushed += 1;
            return Ok(Layer {
                node: id,
                affine,
                clip_state,
                clip_extent: None,
                framed: false,
                kind: LayerKind::Direct,
            });
        }

        let doc = self.doc;
        let effects = &doc.node(id).style.effects;

        let clip = effects
            .clip_path
            .as_deref()
            .and_then(|iri| self.resolve(iri, id, "clip-path", is_clip_path));
        let clip_units = clip.and_then(|c| match &doc.node(c).kind {
            NodeKind::ClipPath(el) => Some(el.units),
            _ => None,
        });

        let mut clip_extent = None;
        let mut late_clip = None;
        if let (Some(c), Some(units)) = (clip, clip_units) {
            if units == CoordUnits::UserSpaceOnUse {
                match self.apply_clip(c, id, affine, None) {
                    Ok(extent) => clip_extent = extent,
                    Err(err) => {
                        self.backend.restore_clip(&mut self.current, clip_state);
                        return Err(err);
                    }
                }
            } else {
                late_clip = Some(c);
            }
        }

        let kind = if needs_isolation(effects, clip_units) {
            match self.backend.create_surface(self.setup.width, self.setup.height) {
                Ok(surface) => {
                    let filter = effects
                        .filter
                        .as_deref()
                        .and_then(|iri| self.resolve(iri, id, "filter", is_filter))
                        .filter(|_| self.filters.is_some());
                    if filter.is_some() {
                        let aux = self
                            .backend
                            .create_pixel_buffer(self.setup.width, self.setup.height);
                        self.aux.push(aux);
                    }
                    self.push_target(surface);
                    self.stats.isolated_layers += 1;
                    LayerKind::Isolated(Isolation {
                        late_clip,
                        filter,
                        mask: effects.mask.as_deref(),
                        opacity: opacity_to_u8(effects.opacity),
                        comp_op: effects.comp_op,
                    })
                }
                Err(err) => {
                    self.report(
                        DiagnosticKind::AllocationFailed,
                        id,
                        format!("layer drawn without isolation: {err}"),
                    );
                    LayerKind::Direct
                }
            }
        } else {
            LayerKind::Direct
        };

        let framed = matches!(kind, LayerKind::Isolated(_)) || clip_extent.is_some();
        if framed {
            let parent = std::mem::replace(&mut self.bbox, BboxPair::new(affine));
            self.bbox_stack.push(parent);
        }
        self.stats.layers_pushed += 1;

        Ok(Layer {
            node: id,
            affine,
            clip_state,
            clip_extent,
            framed,
            kind,
        })
    }

    /// Close a layer opened by [`DrawingCtx::push_layer`].
    ///
    /// Every stack touched by the push is unwound even when compositing fails.
    pub(crate) fn pop_layer(&mut self, layer: Layer<'a, B::ClipState>) -> VellumResult<()> {
        self.stats.layers_popped += 1;
        let Layer {
            node,
            affine,
            clip_state,
            mut clip_extent,
            framed,
            kind,
        } = layer;

        let mut result = Ok(());
        if let LayerKind::Isolated(iso) = kind {
            match self.pop_target() {
                Ok(child) => {
                    let child = match iso.filter {
                        Some(filter) => {
                            let aux = self.aux.pop().unwrap_or_else(|| PixelBuffer::new(0, 0));
                            self.run_filter(node, filter, child, aux)
                        }
                        None => child,
                    };
                    result = self.composite_layer(node, affine, &iso, &child, &mut clip_extent);
                    self.backend.release_surface(child);
                }
                Err(err) => result = Err(err),
            }
        }

        if framed {
            self.close_bbox_frame(node, clip_extent);
        }
        self.backend.restore_clip(&mut self.current, clip_state);
        result
    }

    fn composite_layer(
        &mut self,
        node: NodeId,
        affine: Affine,
        iso: &Isolation<'a>,
        child: &B::Surface,
        clip_extent: &mut Option<BoundingBox>,
    ) -> VellumResult<()> {
        if let Some(clip) = iso.late_clip {
            let bbox = self.bbox.logical;
            *clip_extent = self.apply_clip(clip, node, affine, Some(&bbox))?;
        }

        let offset = self.root_offset();
        if let Some(iri) = iso.mask {
            if let Some(mask) = self.generate_mask(iri, node, affine, iso.opacity)? {
                return self
                    .backend
                    .composite_masked(&mut self.current, child, &mask, offset, iso.comp_op);
            }
        }
        self.backend
            .composite(&mut self.current, child, offset, iso.comp_op, iso.opacity)
    }

    fn run_filter(
        &mut self,
        node: NodeId,
        filter: NodeId,
        child: B::Surface,
        mut source: PixelBuffer,
    ) -> B::Surface {
        let doc = self.doc;
        let NodeKind::Filter(element) = &doc.node(filter).kind else {
            return child;
        };
        let params = self.normalize_params(doc.node(node).style.font_size);
        let bbox = self.bbox.logical;
        let Some(filters) = self.filters.as_deref_mut() else {
            return child;
        };

        self.backend.read_pixels(&child, &mut source);
        let ctx = crate::filter::FilterContext {
            bbox: &bbox,
            normalize: params,
        };
        let filtered = filters
            .render(element, &source, &ctx)
            .and_then(|out| self.backend.surface_from_pixels(&out));
        match filtered {
            Ok(surface) => {
                self.backend.release_surface(child);
                surface
            }
            Err(err) => {
                self.report(
                    DiagnosticKind::FilterFailed,
                    node,
                    format!("filter skipped: {err}"),
                );
                child
            }
        }
    }

    fn close_bbox_frame(&mut self, node: NodeId, clip_extent: Option<BoundingBox>) {
        let parent = self.bbox_stack.pop().unwrap_or(self.bbox);
        let mut frame = std::mem::replace(&mut self.bbox, parent);

        let mut ok = true;
        if let Some(extent) = clip_extent {
            if extent.is_empty() {
                frame = BboxPair::new(frame.logical.transform);
            } else {
                ok &= frame.clip(&extent);
            }
        }
        ok &= self.bbox.insert(&frame);
        if !ok {
            self.report(
                DiagnosticKind::SingularTransform,
                node,
                "bounding box could not be reprojected",
            );
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/draw/layer.rs"]
mod tests;
