use crate::foundation::core::{Affine, BezPath, Color, PixelBuffer, Rect, Vec2};
use crate::foundation::error::VellumResult;
use crate::tree::style::{CompOp, FillRule};
use kurbo::Shape;

/// How a path is painted.
#[derive(Clone, Debug, PartialEq)]
pub enum PathPaint {
    /// Fill the interior.
    Fill {
        /// Straight-alpha fill color.
        color: Color,
        /// Winding rule.
        rule: FillRule,
    },
    /// Stroke the outline.
    Stroke {
        /// Straight-alpha stroke color.
        color: Color,
        /// Stroke geometry in user units.
        stroke: kurbo::Stroke,
    },
}

/// One path contributing to a clip region.
#[derive(Clone, Debug, PartialEq)]
pub struct ClipGeometry {
    /// Outline in user space.
    pub path: BezPath,
    /// User space to device pixels of the clipped target.
    pub transform: Affine,
    /// Winding rule from the node's `clip-rule`.
    pub rule: FillRule,
}

/// Drawing-target operations the pipeline needs from a pixel backend.
///
/// All transforms passed in map user space to the pixels of the surface being drawn on.
pub trait Backend {
    /// A drawing target.
    type Surface;
    /// Saved clip region of a surface.
    type ClipState;

    /// Create a transparent, unclipped target.
    ///
    /// Failure is not fatal to a render: the layer that asked for it draws on its parent instead.
    fn create_surface(&mut self, width: u32, height: u32) -> VellumResult<Self::Surface>;

    /// Return a target obtained from [`Backend::create_surface`] or
    /// [`Backend::surface_from_pixels`].
    fn release_surface(&mut self, surface: Self::Surface);

    /// Pixel size of a target.
    fn surface_size(&self, surface: &Self::Surface) -> (u32, u32);

    /// Overwrite every pixel with a straight-alpha color, ignoring the clip.
    fn clear(&mut self, target: &mut Self::Surface, color: Color);

    /// Paint a flattened path.
    fn draw_path(
        &mut self,
        target: &mut Self::Surface,
        path: &BezPath,
        transform: Affine,
        paint: &PathPaint,
    ) -> VellumResult<()>;

    /// Paint a decoded image into `(0, 0, image.width, image.height)` of user space.
    fn draw_image(
        &mut self,
        target: &mut Self::Surface,
        image: &PixelBuffer,
        transform: Affine,
    ) -> VellumResult<()>;

    /// Paint laid-out glyph outlines.
    fn draw_text(
        &mut self,
        target: &mut Self::Surface,
        outlines: &BezPath,
        transform: Affine,
        paint: &PathPaint,
    ) -> VellumResult<()> {
        self.draw_path(target, outlines, transform, paint)
    }

    /// Intersect the target's clip region with a rectangle.
    fn clip_rect(
        &mut self,
        target: &mut Self::Surface,
        rect: Rect,
        transform: Affine,
    ) -> VellumResult<()>;

    /// Intersect the target's clip region with the union of `paths`.
    ///
    /// An empty slice clips everything away.
    fn clip_paths(&mut self, target: &mut Self::Surface, paths: &[ClipGeometry])
    -> VellumResult<()>;

    /// Capture the target's clip region.
    fn clip_snapshot(&self, target: &Self::Surface) -> Self::ClipState;

    /// Put back a clip region captured by [`Backend::clip_snapshot`].
    fn restore_clip(&mut self, target: &mut Self::Surface, state: Self::ClipState);

    /// Composite `src` onto `dst` at `offset` pixels with a constant alpha.
    fn composite(
        &mut self,
        dst: &mut Self::Surface,
        src: &Self::Surface,
        offset: Vec2,
        op: CompOp,
        alpha: u8,
    ) -> VellumResult<()>;

    /// Composite `src` onto `dst` through a per-pixel alpha mask laid out like `src`.
    fn composite_masked(
        &mut self,
        dst: &mut Self::Surface,
        src: &Self::Surface,
        mask: &[u8],
        offset: Vec2,
        op: CompOp,
    ) -> VellumResult<()>;

    /// Raw-pixel buffer for a filtered layer.
    fn create_pixel_buffer(&mut self, width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::new(width, height)
    }

    /// Copy a target's pixels into `out`, which was sized by [`Backend::create_pixel_buffer`].
    fn read_pixels(&self, surface: &Self::Surface, out: &mut PixelBuffer);

    /// Wrap pixels as a new target.
    fn surface_from_pixels(&mut self, pixels: &PixelBuffer) -> VellumResult<Self::Surface>;

    /// User-space extents of a painted path, `None` for an empty path.
    fn path_extents(&self, path: &BezPath, paint: &PathPaint) -> Option<Rect> {
        if path.elements().is_empty() {
            return None;
        }
        let rect = match paint {
            PathPaint::Fill { .. } => path.bounding_box(),
            PathPaint::Stroke { stroke, .. } => {
                kurbo::stroke(path.iter(), stroke, &kurbo::StrokeOpts::default(), 0.1)
                    .bounding_box()
            }
        };
        Some(rect)
    }
}
