use crate::filter::FilterRenderer;
use crate::foundation::core::{Affine, PixelBuffer, Vec2};
use crate::foundation::diagnostics::{Diagnostic, DiagnosticKind};
use crate::foundation::error::{VellumError, VellumResult};
use crate::geometry::bbox::BboxPair;
use crate::geometry::length::{Length, LengthDir, NormalizeParams};
use crate::render::backend::{Backend, ClipGeometry};
use crate::tree::document::{Document, NodeId, NodeKind};
use std::ops::{Deref, DerefMut};

/// Layer and stack counters collected while drawing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct DrawStats {
    /// Layers opened, isolated or not.
    pub layers_pushed: u64,
    /// Layers closed.
    pub layers_popped: u64,
    /// Layers that received their own offscreen target.
    pub isolated_layers: u64,
    /// Deepest target stack seen.
    pub max_target_depth: usize,
    /// Deepest viewport stack seen.
    pub max_viewport_depth: usize,
}

/// Fixed parameters of one draw.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DrawSetup {
    /// Render-space pixel size; every offscreen target has this size.
    pub(crate) width: u32,
    pub(crate) height: u32,
    /// Position of render space inside the root target.
    pub(crate) offset: Vec2,
    pub(crate) dpi: (f64, f64),
    /// Resolved size of the root viewport in root user units.
    pub(crate) root_size: (f64, f64),
    /// Affine seeding the root bounding boxes.
    pub(crate) root_transform: Affine,
}

/// What a finished draw hands back.
pub(crate) struct DrawResult<S> {
    pub(crate) surface: S,
    pub(crate) bbox: BboxPair,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) stats: DrawStats,
}

/// Mutable state of one render or query.
///
/// `current` is the only drawing target code writes to. Opening an isolated layer moves it onto
/// `targets` and replaces it with a fresh offscreen target.
pub(crate) struct DrawingCtx<'a, B: Backend> {
    pub(crate) doc: &'a Document,
    pub(crate) backend: &'a mut B,
    pub(crate) filters: Option<&'a mut dyn FilterRenderer>,
    pub(crate) setup: DrawSetup,
    pub(crate) current: B::Surface,
    pub(crate) targets: Vec<B::Surface>,
    pub(crate) aux: Vec<PixelBuffer>,
    pub(crate) bbox: BboxPair,
    pub(crate) bbox_stack: Vec<BboxPair>,
    pub(crate) viewports: Vec<(f64, f64)>,
    pub(crate) acquired: Vec<NodeId>,
    /// Subtree restriction, root-most node last.
    pub(crate) drawsub: Vec<NodeId>,
    /// Set while clip geometry is being collected instead of painted.
    pub(crate) clip_sink: Option<Vec<ClipGeometry>>,
    pub(crate) diagnostics: Vec<Diagnostic>,
    pub(crate) stats: DrawStats,
}

impl<'a, B: Backend> DrawingCtx<'a, B> {
    pub(crate) fn new(
        doc: &'a Document,
        backend: &'a mut B,
        filters: Option<&'a mut dyn FilterRenderer>,
        root: B::Surface,
        setup: DrawSetup,
    ) -> Self {
        Self {
            doc,
            backend,
            filters,
            setup,
            current: root,
            targets: Vec::new(),
            aux: Vec::new(),
            bbox: BboxPair::new(setup.root_transform),
            bbox_stack: Vec::new(),
            viewports: Vec::new(),
            acquired: Vec::new(),
            drawsub: Vec::new(),
            clip_sink: None,
            diagnostics: Vec::new(),
            stats: DrawStats::default(),
        }
    }

    /// Restrict drawing to the chain from the root down to `target`.
    pub(crate) fn restrict_to(&mut self, target: NodeId) {
        self.drawsub = self.doc.ancestors(target).collect();
    }

    pub(crate) fn finish(self) -> DrawResult<B::Surface> {
        debug_assert!(self.targets.is_empty(), "target stack not unwound");
        debug_assert!(self.aux.is_empty(), "auxiliary stack not unwound");
        debug_assert!(self.bbox_stack.is_empty(), "bbox stack not unwound");
        debug_assert!(self.viewports.is_empty(), "viewport stack not unwound");
        debug_assert!(self.acquired.is_empty(), "acquired nodes not released");
        DrawResult {
            surface: self.current,
            bbox: self.bbox,
            diagnostics: self.diagnostics,
            stats: self.stats,
        }
    }

    /// Record a degraded step.
    pub(crate) fn report(&mut self, kind: DiagnosticKind, node: NodeId, message: impl Into<String>) {
        let message = message.into();
        let doc = self.doc;
        let id = doc.node(node).id.as_deref();
        tracing::warn!(?kind, node = id.unwrap_or(""), "{message}");
        self.diagnostics.push(Diagnostic::new(kind, id, message));
    }

    /// Offset at which render space sits in the current target.
    ///
    /// Only the root target is offset; offscreen targets cover render space exactly.
    pub(crate) fn root_offset(&self) -> Vec2 {
        if self.targets.is_empty() {
            self.setup.offset
        } else {
            Vec2::ZERO
        }
    }

    /// Map a render-space affine to the pixels of the current target.
    pub(crate) fn device_transform(&self, affine: Affine) -> Affine {
        Affine::translate(self.root_offset()) * affine
    }

    pub(crate) fn collecting_clip(&self) -> bool {
        self.clip_sink.is_some()
    }

    pub(crate) fn normalize_params(&self, font_size: f64) -> NormalizeParams {
        NormalizeParams {
            dpi_x: self.setup.dpi.0,
            dpi_y: self.setup.dpi.1,
            viewport: self.viewports.last().copied().unwrap_or(self.setup.root_size),
            font_size,
        }
    }

    pub(crate) fn normalize(&self, length: &Length, dir: LengthDir, font_size: f64) -> f64 {
        length.normalize(dir, &self.normalize_params(font_size))
    }

    /// Make `surface` current, stacking the previous target.
    pub(crate) fn push_target(&mut self, surface: B::Surface) {
        let parent = std::mem::replace(&mut self.current, surface);
        self.targets.push(parent);
        self.stats.max_target_depth = self.stats.max_target_depth.max(self.targets.len());
    }

    /// Reinstate the stacked target and return the one that was current.
    pub(crate) fn pop_target(&mut self) -> VellumResult<B::Surface> {
        let parent = self
            .targets
            .pop()
            .ok_or_else(|| VellumError::render("target stack underflow"))?;
        Ok(std::mem::replace(&mut self.current, parent))
    }

    /// Run `f` with all subtree restriction lifted.
    pub(crate) fn with_drawsub_suspended<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::take(&mut self.drawsub);
        let out = f(self);
        self.drawsub = saved;
        out
    }

    /// Run `f` with a scratch bounding box that is discarded afterwards.
    pub(crate) fn with_detached_bbox<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = self.bbox;
        self.bbox = BboxPair::new(saved.logical.transform);
        let out = f(self);
        self.bbox = saved;
        out
    }

    /// Look up `iri` and check the kind of node it names.
    pub(crate) fn resolve(
        &mut self,
        iri: &str,
        owner: NodeId,
        what: &str,
        accept: impl Fn(&NodeKind) -> bool,
    ) -> Option<NodeId> {
        let doc = self.doc;
        let Some(id) = doc.lookup(iri) else {
            self.report(
                DiagnosticKind::MissingReference,
                owner,
                format!("{what} reference '{iri}' does not resolve"),
            );
            return None;
        };
        let kind = &doc.node(id).kind;
        if !accept(kind) {
            self.report(
                DiagnosticKind::WrongReferenceKind,
                owner,
                format!("{what} reference '{iri}' names a <{}>", kind.name()),
            );
            return None;
        }
        Some(id)
    }

    /// Mark `id` as in use until the returned guard drops.
    ///
    /// A node that is already in use yields `None`; drawing it again would recurse forever.
    pub(crate) fn acquire(&mut self, id: NodeId, owner: NodeId) -> Option<AcquiredNode<'_, 'a, B>> {
        if self.acquired.contains(&id) {
            let name = self.doc.node(id).id.clone().unwrap_or_default();
            self.report(
                DiagnosticKind::CyclicReference,
                owner,
                format!("reference to '{name}' is already being drawn"),
            );
            return None;
        }
        self.acquired.push(id);
        Some(AcquiredNode { ctx: self, id })
    }
}

/// Scoped acquisition of a referenced node; releases it on drop.
pub(crate) struct AcquiredNode<'c, 'a, B: Backend> {
    ctx: &'c mut DrawingCtx<'a, B>,
    id: NodeId,
}

impl<'a, B: Backend> Deref for AcquiredNode<'_, 'a, B> {
    type Target = DrawingCtx<'a, B>;

    fn deref(&self) -> &Self::Target {
        &*self.ctx
    }
}

impl<B: Backend> DerefMut for AcquiredNode<'_, '_, B> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.ctx
    }
}

impl<B: Backend> Drop for AcquiredNode<'_, '_, B> {
    fn drop(&mut self) {
        let released = self.ctx.acquired.pop();
        debug_assert_eq!(released, Some(self.id), "acquired nodes released out of order");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/draw/context.rs"]
mod tests;
