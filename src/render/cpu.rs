//! `vello_cpu` software backend.
//!
//! `vello_cpu` rasterizes each primitive into a reusable scratch pixmap; clipping, compositing and
//! masking then happen on premultiplied RGBA8 bytes in [`crate::render::composite`].

use crate::foundation::core::{Affine, BezPath, Color, PixelBuffer, Rect, Vec2};
use crate::foundation::error::{VellumError, VellumResult};
use crate::render::backend::{Backend, ClipGeometry, PathPaint};
use crate::render::composite::{
    Modulation, Placement, composite_rgba8_premul, intersect_coverage,
};
use crate::render::surface_pool::{SurfacePool, SurfacePoolOpts, SurfacePoolStats};
use crate::tree::style::{CompOp, FillRule};
use kurbo::Shape;
use std::sync::Arc;

/// A CPU drawing target: premultiplied pixels plus an optional clip coverage mask.
pub struct CpuSurface {
    pixmap: vello_cpu::Pixmap,
    clip: Option<Arc<[u8]>>,
}

impl CpuSurface {
    /// Transparent, unclipped target that does not count against any pool budget.
    pub fn new(width: u32, height: u32) -> VellumResult<Self> {
        let w: u16 = width
            .try_into()
            .map_err(|_| VellumError::allocation(format!("surface width exceeds u16: {width}")))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| VellumError::allocation(format!("surface height exceeds u16: {height}")))?;
        Ok(Self {
            pixmap: vello_cpu::Pixmap::new(w, h),
            clip: None,
        })
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        u32::from(self.pixmap.width())
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        u32::from(self.pixmap.height())
    }

    /// Premultiplied RGBA8 bytes, row major.
    pub fn data(&self) -> &[u8] {
        self.pixmap.data_as_u8_slice()
    }

    /// Fill every pixel with a premultiplied color, ignoring the clip.
    pub fn clear(&mut self, rgba_premul: [u8; 4]) {
        for px in self.pixmap.data_as_u8_slice_mut().chunks_exact_mut(4) {
            px.copy_from_slice(&rgba_premul);
        }
    }

    /// Copy out the pixels.
    pub fn to_pixels(&self) -> PixelBuffer {
        PixelBuffer {
            width: self.width(),
            height: self.height(),
            data: self.data().to_vec(),
        }
    }

    fn placement_of(&self, src: &CpuSurface, offset: Vec2) -> Placement {
        Placement {
            dst_width: self.width(),
            dst_height: self.height(),
            src_width: src.width(),
            src_height: src.height(),
            offset: (offset.x.round() as i32, offset.y.round() as i32),
        }
    }
}

impl std::fmt::Debug for CpuSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuSurface")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("clipped", &self.clip.is_some())
            .finish()
    }
}

/// Software backend built on `vello_cpu`.
pub struct CpuBackend {
    pool: SurfacePool,
    ctx: Option<vello_cpu::RenderContext>,
    scratch: Option<vello_cpu::Pixmap>,
}

impl CpuBackend {
    /// Backend whose offscreen targets come from a pool configured by `opts`.
    pub fn new(opts: SurfacePoolOpts) -> Self {
        Self {
            pool: SurfacePool::new(opts),
            ctx: None,
            scratch: None,
        }
    }

    /// Pool counters.
    pub fn pool_stats(&self) -> SurfacePoolStats {
        self.pool.stats()
    }

    /// Rasterize with `draw` into the cleared scratch pixmap and hand it to `consume`.
    fn rasterize<R>(
        &mut self,
        width: u32,
        height: u32,
        draw: impl FnOnce(&mut vello_cpu::RenderContext),
        consume: impl FnOnce(&vello_cpu::Pixmap) -> VellumResult<R>,
    ) -> VellumResult<R> {
        let w: u16 = width
            .try_into()
            .map_err(|_| VellumError::render("scratch width exceeds u16"))?;
        let h: u16 = height
            .try_into()
            .map_err(|_| VellumError::render("scratch height exceeds u16"))?;

        let mut ctx = match self.ctx.take() {
            Some(ctx) if ctx.width() == w && ctx.height() == h => ctx,
            _ => vello_cpu::RenderContext::new(w, h),
        };
        ctx.reset();
        let mut scratch = match self.scratch.take() {
            Some(p) if p.width() == w && p.height() == h => p,
            _ => vello_cpu::Pixmap::new(w, h),
        };
        scratch.data_as_u8_slice_mut().fill(0);

        draw(&mut ctx);
        ctx.flush();
        ctx.render_to_pixmap(&mut scratch);
        let out = consume(&scratch);

        self.ctx = Some(ctx);
        self.scratch = Some(scratch);
        out
    }

    /// Rasterize and source-over the result onto `target` through its clip.
    fn paint_onto(
        &mut self,
        target: &mut CpuSurface,
        draw: impl FnOnce(&mut vello_cpu::RenderContext),
    ) -> VellumResult<()> {
        let (w, h) = (target.width(), target.height());
        let clip = target.clip.clone();
        let dst = target.pixmap.data_as_u8_slice_mut();
        self.rasterize(w, h, draw, |scratch| {
            composite_rgba8_premul(
                dst,
                scratch.data_as_u8_slice(),
                Placement {
                    dst_width: w,
                    dst_height: h,
                    src_width: w,
                    src_height: h,
                    offset: (0, 0),
                },
                CompOp::SrcOver,
                Modulation {
                    alpha: 255,
                    mask: None,
                    clip: clip.as_deref(),
                },
            )
        })
    }

    /// Replace `target`'s clip with its intersection with the coverage `draw` produces.
    fn intersect_clip(
        &mut self,
        target: &mut CpuSurface,
        draw: impl FnOnce(&mut vello_cpu::RenderContext),
    ) -> VellumResult<()> {
        let (w, h) = (target.width(), target.height());
        let mut coverage: Vec<u8> = self.rasterize(w, h, draw, |scratch| {
            Ok(scratch
                .data_as_u8_slice()
                .chunks_exact(4)
                .map(|px| px[3])
                .collect())
        })?;
        if let Some(existing) = target.clip.as_deref() {
            intersect_coverage(&mut coverage, existing);
        }
        target.clip = Some(coverage.into());
        Ok(())
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new(SurfacePoolOpts::default())
    }
}

impl Backend for CpuBackend {
    type Surface = CpuSurface;
    type ClipState = Option<Arc<[u8]>>;

    fn create_surface(&mut self, width: u32, height: u32) -> VellumResult<CpuSurface> {
        Ok(CpuSurface {
            pixmap: self.pool.borrow(width, height)?,
            clip: None,
        })
    }

    fn release_surface(&mut self, surface: CpuSurface) {
        self.pool.release(surface.pixmap);
    }

    fn surface_size(&self, surface: &CpuSurface) -> (u32, u32) {
        (surface.width(), surface.height())
    }

    fn clear(&mut self, target: &mut CpuSurface, color: Color) {
        target.clear(color.premultiplied().to_array());
    }

    fn draw_path(
        &mut self,
        target: &mut CpuSurface,
        path: &BezPath,
        transform: Affine,
        paint: &PathPaint,
    ) -> VellumResult<()> {
        let (color, rule, outline) = match paint {
            PathPaint::Fill { color, rule } => (*color, *rule, bezpath_to_cpu(path)),
            PathPaint::Stroke { color, stroke } => {
                let tolerance = 0.1 / transform.determinant().abs().sqrt().max(1e-6);
                let expanded =
                    kurbo::stroke(path.iter(), stroke, &kurbo::StrokeOpts::default(), tolerance);
                (*color, FillRule::NonZero, bezpath_to_cpu(&expanded))
            }
        };
        if color.a == 0 {
            return Ok(());
        }
        self.paint_onto(target, |ctx| {
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_fill_rule(fill_to_cpu(rule));
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(
                color.r, color.g, color.b, color.a,
            ));
            ctx.fill_path(&outline);
        })
    }

    fn draw_image(
        &mut self,
        target: &mut CpuSurface,
        image: &PixelBuffer,
        transform: Affine,
    ) -> VellumResult<()> {
        if image.width == 0 || image.height == 0 {
            return Ok(());
        }
        let pixmap = pixmap_from_premul_bytes(&image.data, image.width, image.height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        let (w, h) = (f64::from(image.width), f64::from(image.height));
        self.paint_onto(target, |ctx| {
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
            ctx.set_fill_rule(vello_cpu::peniko::Fill::NonZero);
            ctx.set_paint(paint);
            ctx.fill_rect(&vello_cpu::kurbo::Rect::new(0.0, 0.0, w, h));
        })
    }

    fn clip_rect(
        &mut self,
        target: &mut CpuSurface,
        rect: Rect,
        transform: Affine,
    ) -> VellumResult<()> {
        let path = bezpath_to_cpu(&rect.to_path(0.1));
        self.intersect_clip(target, |ctx| {
            ctx.set_transform(affine_to_cpu(transform));
            ctx.set_fill_rule(vello_cpu::peniko::Fill::NonZero);
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
            ctx.fill_path(&path);
        })
    }

    fn clip_paths(&mut self, target: &mut CpuSurface, paths: &[ClipGeometry]) -> VellumResult<()> {
        self.intersect_clip(target, |ctx| {
            ctx.set_paint(vello_cpu::peniko::Color::from_rgba8(255, 255, 255, 255));
            for geom in paths {
                ctx.set_transform(affine_to_cpu(geom.transform));
                ctx.set_fill_rule(fill_to_cpu(geom.rule));
                ctx.fill_path(&bezpath_to_cpu(&geom.path));
            }
        })
    }

    fn clip_snapshot(&self, target: &CpuSurface) -> Self::ClipState {
        target.clip.clone()
    }

    fn restore_clip(&mut self, target: &mut CpuSurface, state: Self::ClipState) {
        target.clip = state;
    }

    fn composite(
        &mut self,
        dst: &mut CpuSurface,
        src: &CpuSurface,
        offset: Vec2,
        op: CompOp,
        alpha: u8,
    ) -> VellumResult<()> {
        let at = dst.placement_of(src, offset);
        let clip = dst.clip.clone();
        composite_rgba8_premul(
            dst.pixmap.data_as_u8_slice_mut(),
            src.pixmap.data_as_u8_slice(),
            at,
            op,
            Modulation {
                alpha,
                mask: None,
                clip: clip.as_deref(),
            },
        )
    }

    fn composite_masked(
        &mut self,
        dst: &mut CpuSurface,
        src: &CpuSurface,
        mask: &[u8],
        offset: Vec2,
        op: CompOp,
    ) -> VellumResult<()> {
        let at = dst.placement_of(src, offset);
        let clip = dst.clip.clone();
        composite_rgba8_premul(
            dst.pixmap.data_as_u8_slice_mut(),
            src.pixmap.data_as_u8_slice(),
            at,
            op,
            Modulation {
                alpha: 255,
                mask: Some(mask),
                clip: clip.as_deref(),
            },
        )
    }

    fn read_pixels(&self, surface: &CpuSurface, out: &mut PixelBuffer) {
        let src = surface.data();
        if out.width == surface.width() && out.height == surface.height() && out.data.len() == src.len() {
            out.data.copy_from_slice(src);
        } else {
            *out = surface.to_pixels();
        }
    }

    fn surface_from_pixels(&mut self, pixels: &PixelBuffer) -> VellumResult<CpuSurface> {
        if !pixels.is_well_formed() {
            return Err(VellumError::render("pixel buffer length does not match its size"));
        }
        let mut pixmap = self.pool.borrow(pixels.width, pixels.height)?;
        pixmap.data_as_u8_slice_mut().copy_from_slice(&pixels.data);
        Ok(CpuSurface { pixmap, clip: None })
    }
}

fn fill_to_cpu(rule: FillRule) -> vello_cpu::peniko::Fill {
    match rule {
        FillRule::NonZero => vello_cpu::peniko::Fill::NonZero,
        FillRule::EvenOdd => vello_cpu::peniko::Fill::EvenOdd,
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn bezpath_to_cpu(path: &BezPath) -> vello_cpu::kurbo::BezPath {
    use kurbo::PathEl;

    let mut out = vello_cpu::kurbo::BezPath::new();
    for &el in path.elements() {
        match el {
            PathEl::MoveTo(p) => out.move_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::LineTo(p) => out.line_to(vello_cpu::kurbo::Point::new(p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
            ),
            PathEl::CurveTo(p1, p2, p3) => out.curve_to(
                vello_cpu::kurbo::Point::new(p1.x, p1.y),
                vello_cpu::kurbo::Point::new(p2.x, p2.y),
                vello_cpu::kurbo::Point::new(p3.x, p3.y),
            ),
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn pixmap_from_premul_bytes(bytes: &[u8], width: u32, height: u32) -> VellumResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| VellumError::render("pixmap width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| VellumError::render("pixmap height exceeds u16"))?;
    if bytes.len()
        != (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(4)
    {
        return Err(VellumError::render("pixmap byte len mismatch"));
    }
    let mut pixels = Vec::<vello_cpu::peniko::color::PremulRgba8>::with_capacity(
        (width as usize) * (height as usize),
    );
    for px in bytes.chunks_exact(4) {
        pixels.push(vello_cpu::peniko::color::PremulRgba8::from_u8_array([
            px[0], px[1], px[2], px[3],
        ]));
    }
    Ok(vello_cpu::Pixmap::from_parts_with_opacity(pixels, w, h, true))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
