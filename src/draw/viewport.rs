use crate::draw::context::DrawingCtx;
use crate::foundation::core::{Affine, Rect};
use crate::foundation::error::VellumResult;
use crate::geometry::viewbox::AspectRatio;
use crate::render::backend::Backend;
use crate::tree::document::NodeId;

/// A coordinate system established by a viewport, symbol or marker.
#[derive(Clone, Copy, Debug)]
pub(crate) struct ViewportFrame {
    /// Viewport rectangle in the establishing element's user space.
    pub(crate) rect: Rect,
    pub(crate) view_box: Option<Rect>,
    pub(crate) aspect: AspectRatio,
    /// Clip content to `rect`.
    pub(crate) clip: bool,
}

impl ViewportFrame {
    /// Content transform relative to the establishing user space and the size pushed on the
    /// viewport stack. `None` disables rendering.
    pub(crate) fn content(&self) -> Option<(Affine, (f64, f64))> {
        if self.rect.width() <= 0.0 || self.rect.height() <= 0.0 {
            return None;
        }
        match self.view_box {
            Some(vb) => {
                let m = self.aspect.view_box_transform(vb, self.rect)?;
                Some((m, (vb.width(), vb.height())))
            }
            None => Some((
                Affine::translate((self.rect.x0, self.rect.y0)),
                (self.rect.width(), self.rect.height()),
            )),
        }
    }
}

impl<'a, B: Backend> DrawingCtx<'a, B> {
    /// Run `f` with `size` as the reference for percentage lengths.
    pub(crate) fn with_viewport<R>(&mut self, size: (f64, f64), f: impl FnOnce(&mut Self) -> R) -> R {
        self.viewports.push(size);
        self.stats.max_viewport_depth = self.stats.max_viewport_depth.max(self.viewports.len());
        let out = f(self);
        self.viewports.pop();
        out
    }

    /// Draw the children of `id` inside `frame`, all within the layer of `id`.
    pub(crate) fn draw_in_viewport(
        &mut self,
        id: NodeId,
        affine: Affine,
        frame: ViewportFrame,
    ) -> VellumResult<()> {
        let Some((content, size)) = frame.content() else {
            return Ok(());
        };
        self.with_layer(id, affine, |ctx| {
            if frame.clip && !ctx.collecting_clip() {
                let transform = ctx.device_transform(affine);
                ctx.backend.clip_rect(&mut ctx.current, frame.rect, transform)?;
            }
            ctx.with_viewport(size, |ctx| ctx.draw_children(id, affine * content))
        })
    }
}
