use crate::foundation::core::{Affine, BezPath, Color, PixelBuffer, Rect, Vec2};
use crate::foundation::error::VellumResult;
use crate::render::backend::{Backend, ClipGeometry, PathPaint};
use crate::tree::style::CompOp;

/// A target with a size and no pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeasureSurface {
    width: u32,
    height: u32,
}

impl MeasureSurface {
    /// Pixel-less target of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Backend for extent queries: every draw is a no-op, only bounding boxes are tracked.
#[derive(Clone, Copy, Debug, Default)]
pub struct MeasureBackend;

impl Backend for MeasureBackend {
    type Surface = MeasureSurface;
    type ClipState = ();

    fn create_surface(&mut self, width: u32, height: u32) -> VellumResult<MeasureSurface> {
        Ok(MeasureSurface::new(width, height))
    }

    fn release_surface(&mut self, _surface: MeasureSurface) {}

    fn surface_size(&self, surface: &MeasureSurface) -> (u32, u32) {
        (surface.width, surface.height)
    }

    fn clear(&mut self, _target: &mut MeasureSurface, _color: Color) {}

    fn draw_path(
        &mut self,
        _target: &mut MeasureSurface,
        _path: &BezPath,
        _transform: Affine,
        _paint: &PathPaint,
    ) -> VellumResult<()> {
        Ok(())
    }

    fn draw_image(
        &mut self,
        _target: &mut MeasureSurface,
        _image: &PixelBuffer,
        _transform: Affine,
    ) -> VellumResult<()> {
        Ok(())
    }

    fn clip_rect(
        &mut self,
        _target: &mut MeasureSurface,
        _rect: Rect,
        _transform: Affine,
    ) -> VellumResult<()> {
        Ok(())
    }

    fn clip_paths(
        &mut self,
        _target: &mut MeasureSurface,
        _paths: &[ClipGeometry],
    ) -> VellumResult<()> {
        Ok(())
    }

    fn clip_snapshot(&self, _target: &MeasureSurface) {}

    fn restore_clip(&mut self, _target: &mut MeasureSurface, _state: ()) {}

    fn composite(
        &mut self,
        _dst: &mut MeasureSurface,
        _src: &MeasureSurface,
        _offset: Vec2,
        _op: CompOp,
        _alpha: u8,
    ) -> VellumResult<()> {
        Ok(())
    }

    fn composite_masked(
        &mut self,
        _dst: &mut MeasureSurface,
        _src: &MeasureSurface,
        _mask: &[u8],
        _offset: Vec2,
        _op: CompOp,
    ) -> VellumResult<()> {
        Ok(())
    }

    fn create_pixel_buffer(&mut self, _width: u32, _height: u32) -> PixelBuffer {
        PixelBuffer::new(0, 0)
    }

    fn read_pixels(&self, _surface: &MeasureSurface, _out: &mut PixelBuffer) {}

    fn surface_from_pixels(&mut self, pixels: &PixelBuffer) -> VellumResult<MeasureSurface> {
        Ok(MeasureSurface::new(pixels.width, pixels.height))
    }
}
