use anyhow::Context as _;

use crate::draw::{DrawResult, DrawSetup, DrawStats, DrawingCtx};
use crate::filter::{CpuFilterRenderer, FilterRenderer};
use crate::foundation::core::{Affine, Color, Point, Rect, Size, Vec2};
use crate::foundation::diagnostics::Diagnostic;
use crate::foundation::error::{VellumError, VellumResult};
use crate::geometry::bbox::{BoundingBox, transform_rect};
use crate::geometry::length::{LengthDir, LengthUnit, NormalizeParams};
use crate::render::backend::Backend;
use crate::render::cpu::{CpuBackend, CpuSurface};
use crate::render::measure::{MeasureBackend, MeasureSurface};
use crate::render::surface_pool::SurfacePoolOpts;
use crate::tree::document::{Document, NodeId, NodeKind};

/// Per-call rendering configuration.
///
/// Nothing here is process-wide: every render or query receives its own copy.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Horizontal resolution used by absolute units.
    pub dpi_x: f64,
    /// Vertical resolution used by absolute units.
    pub dpi_y: f64,
    /// Maps root user space (after the viewBox) to the root target's pixels.
    pub base_transform: Affine,
    /// Color the root target is cleared to before drawing; `None` keeps its contents.
    pub clear_color: Option<Color>,
    /// Offscreen surface pool of the backend built by [`rasterize_document`].
    pub pool: SurfacePoolOpts,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi_x: 90.0,
            dpi_y: 90.0,
            base_transform: Affine::IDENTITY,
            clear_color: None,
            pool: SurfacePoolOpts::default(),
        }
    }
}

impl RenderConfig {
    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> VellumResult<Self> {
        let cfg: Self = serde_json::from_str(json).context("parse render config JSON")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject resolutions and transforms no render can use.
    pub fn validate(&self) -> VellumResult<()> {
        for (name, dpi) in [("dpi_x", self.dpi_x), ("dpi_y", self.dpi_y)] {
            if !dpi.is_finite() || dpi <= 0.0 {
                return Err(VellumError::validation(format!(
                    "{name} must be finite and positive, got {dpi}"
                )));
            }
        }
        if !self.base_transform.as_coeffs().iter().all(|c| c.is_finite()) {
            return Err(VellumError::validation("base_transform must be finite"));
        }
        if self.base_transform.determinant().abs() < f64::EPSILON {
            return Err(VellumError::validation("base_transform must be invertible"));
        }
        Ok(())
    }
}

/// What a render produced besides pixels.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct RenderOutcome {
    /// Painted extents in root target pixels.
    pub ink: Option<Rect>,
    /// Geometric extents in root target pixels.
    pub logical: Option<Rect>,
    /// Effects that were skipped or degraded.
    pub diagnostics: Vec<Diagnostic>,
    /// Layer and stack counters.
    pub stats: DrawStats,
}

/// Extents reported by [`geometry_for_element`], in root target pixels.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct ElementGeometry {
    /// Painted extents, stroke included.
    pub ink: Option<Rect>,
    /// Geometric extents.
    pub logical: Option<Rect>,
    /// Effects that were skipped or degraded while measuring.
    pub diagnostics: Vec<Diagnostic>,
}

/// Render the whole document onto `surface`.
///
/// The surface is handed back together with the extents and diagnostics of the render. Only
/// problems that make the render impossible (an unusable configuration, a document without a
/// size) are errors; broken references and failed effects degrade and are listed in
/// [`RenderOutcome::diagnostics`].
#[tracing::instrument(skip(doc, backend, filters, surface, config))]
pub fn render_document<B: Backend>(
    doc: &Document,
    backend: &mut B,
    filters: &mut dyn FilterRenderer,
    surface: B::Surface,
    config: &RenderConfig,
) -> VellumResult<(B::Surface, RenderOutcome)> {
    render_impl(doc, None, backend, filters, surface, config)
}

/// Render only the element `id` (an IRI or bare id), placed exactly where a full render puts it.
///
/// Ancestors contribute their transforms, viewports and layers; siblings along the way are not
/// drawn.
#[tracing::instrument(skip(doc, backend, filters, surface, config))]
pub fn render_element<B: Backend>(
    doc: &Document,
    id: &str,
    backend: &mut B,
    filters: &mut dyn FilterRenderer,
    surface: B::Surface,
    config: &RenderConfig,
) -> VellumResult<(B::Surface, RenderOutcome)> {
    let target = element_id(doc, id)?;
    render_impl(doc, Some(target), backend, filters, surface, config)
}

/// Render the whole document on the CPU backend, onto a surface sized to fit it.
///
/// The backend's surface pool comes from [`RenderConfig::pool`] and filters run through
/// [`CpuFilterRenderer`].
#[tracing::instrument(skip(doc, config))]
pub fn rasterize_document(
    doc: &Document,
    config: &RenderConfig,
) -> VellumResult<(CpuSurface, RenderOutcome)> {
    config.validate()?;
    let setup = draw_setup(config, document_size(doc, config)?)?;
    let (width, height) = covering_size(&setup);
    let surface = CpuSurface::new(width, height)?;
    let mut backend = CpuBackend::new(config.pool);
    let mut filters = CpuFilterRenderer::new();
    let rendered = render_impl(doc, None, &mut backend, &mut filters, surface, config)?;
    tracing::debug!(pool = ?backend.pool_stats(), "rasterized");
    Ok(rendered)
}

/// Extents of element `id`, or of the whole document for `None`, without rasterizing.
#[tracing::instrument(skip(doc, config))]
pub fn geometry_for_element(
    doc: &Document,
    id: Option<&str>,
    config: &RenderConfig,
) -> VellumResult<ElementGeometry> {
    config.validate()?;
    let target = id.map(|id| element_id(doc, id)).transpose()?;
    let root_size = document_size(doc, config)?;
    let setup = draw_setup(config, root_size)?;
    let mut backend = MeasureBackend;
    let surface = MeasureSurface::new(setup.width, setup.height);
    let drawn = draw(doc, target, &mut backend, None, surface, setup)?;
    Ok(ElementGeometry {
        ink: device_rect(&drawn.bbox.ink, setup.offset),
        logical: device_rect(&drawn.bbox.logical, setup.offset),
        diagnostics: drawn.diagnostics,
    })
}

/// Size of the painted extents of `id`; zero when nothing is painted.
pub fn dimensions_for_element(
    doc: &Document,
    id: Option<&str>,
    config: &RenderConfig,
) -> VellumResult<Size> {
    let geometry = geometry_for_element(doc, id, config)?;
    Ok(geometry.ink.map_or(Size::ZERO, |r| r.size()))
}

/// Top-left corner of the painted extents of `id`; the origin when nothing is painted.
pub fn position_for_element(
    doc: &Document,
    id: Option<&str>,
    config: &RenderConfig,
) -> VellumResult<Point> {
    let geometry = geometry_for_element(doc, id, config)?;
    Ok(geometry.ink.map_or(Point::ORIGIN, |r| r.origin()))
}

/// Intrinsic size of the root viewport in root user units.
///
/// Percentage sizes resolve against the viewBox. Without a viewBox they fall back to the
/// painted extents of the content.
pub fn document_size(doc: &Document, config: &RenderConfig) -> VellumResult<Size> {
    let root = doc.node(doc.root());
    let NodeKind::Viewport(viewport) = &root.kind else {
        return Err(VellumError::validation("document root must be a viewport"));
    };
    let view_box = viewport.view_box.map(|vb| (vb.width(), vb.height()));
    let params = NormalizeParams {
        dpi_x: config.dpi_x,
        dpi_y: config.dpi_y,
        viewport: view_box.unwrap_or((0.0, 0.0)),
        font_size: root.style.font_size,
    };
    let relative = |unit: LengthUnit| unit == LengthUnit::Percent && view_box.is_none();

    let mut width = viewport.width.normalize(LengthDir::Horizontal, &params);
    let mut height = viewport.height.normalize(LengthDir::Vertical, &params);
    if relative(viewport.width.unit) || relative(viewport.height.unit) {
        let content = measure_content(doc, config)?;
        if relative(viewport.width.unit) {
            width = content.width;
        }
        if relative(viewport.height.unit) {
            height = content.height;
        }
    }

    if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
        return Err(VellumError::validation(format!(
            "document has no usable size ({width} x {height})"
        )));
    }
    Ok(Size::new(width, height))
}

fn measure_content(doc: &Document, config: &RenderConfig) -> VellumResult<Size> {
    let unit = Size::new(1.0, 1.0);
    let setup = draw_setup(
        &RenderConfig {
            base_transform: Affine::IDENTITY,
            ..config.clone()
        },
        unit,
    )?;
    let mut backend = MeasureBackend;
    let surface = MeasureSurface::new(setup.width, setup.height);
    let drawn = draw(doc, None, &mut backend, None, surface, setup)?;
    Ok(drawn
        .bbox
        .ink
        .to_render_space()
        .map_or(Size::ZERO, |r| r.size()))
}

/// Root target size that holds the placed root viewport, which starts at `setup.offset`.
fn covering_size(setup: &DrawSetup) -> (u32, u32) {
    let reach = |offset: f64, len: u32| len.saturating_add(offset.max(0.0) as u32);
    (
        reach(setup.offset.x, setup.width),
        reach(setup.offset.y, setup.height),
    )
}

fn element_id(doc: &Document, id: &str) -> VellumResult<NodeId> {
    doc.lookup(id)
        .ok_or_else(|| VellumError::reference(format!("no element with id '{id}'")))
}

fn device_rect(bbox: &BoundingBox, offset: Vec2) -> Option<Rect> {
    bbox.to_render_space().map(|r| r + offset)
}

/// Integral render-space placement of the root viewport under the base transform.
fn draw_setup(config: &RenderConfig, root_size: Size) -> VellumResult<DrawSetup> {
    let extent = transform_rect(
        config.base_transform,
        Rect::new(0.0, 0.0, root_size.width, root_size.height),
    );
    let (x0, y0) = (extent.x0.floor(), extent.y0.floor());
    let (x1, y1) = (extent.x1.ceil(), extent.y1.ceil());
    let dim = |len: f64| -> VellumResult<u32> {
        if !len.is_finite() || len < 1.0 || len > f64::from(u16::MAX) {
            return Err(VellumError::validation(format!(
                "render size {len} is outside 1..={}",
                u16::MAX
            )));
        }
        Ok(len as u32)
    };
    let offset = Vec2::new(x0, y0);
    Ok(DrawSetup {
        width: dim(x1 - x0)?,
        height: dim(y1 - y0)?,
        offset,
        dpi: (config.dpi_x, config.dpi_y),
        root_size: (root_size.width, root_size.height),
        root_transform: Affine::translate(-offset) * config.base_transform,
    })
}

fn draw<'a, B: Backend>(
    doc: &'a Document,
    target: Option<NodeId>,
    backend: &'a mut B,
    filters: Option<&'a mut dyn FilterRenderer>,
    surface: B::Surface,
    setup: DrawSetup,
) -> VellumResult<DrawResult<B::Surface>> {
    let mut ctx = DrawingCtx::new(doc, backend, filters, surface, setup);
    if let Some(target) = target {
        ctx.restrict_to(target);
    }
    ctx.draw_node(doc.root(), setup.root_transform)?;
    let drawn = ctx.finish();
    tracing::debug!(
        layers = drawn.stats.layers_pushed,
        isolated = drawn.stats.isolated_layers,
        diagnostics = drawn.diagnostics.len(),
        "draw finished"
    );
    Ok(drawn)
}

fn render_impl<B: Backend>(
    doc: &Document,
    target: Option<NodeId>,
    backend: &mut B,
    filters: &mut dyn FilterRenderer,
    mut surface: B::Surface,
    config: &RenderConfig,
) -> VellumResult<(B::Surface, RenderOutcome)> {
    config.validate()?;
    let root_size = document_size(doc, config)?;
    let setup = draw_setup(config, root_size)?;
    let (width, height) = backend.surface_size(&surface);
    if width == 0 || height == 0 {
        return Err(VellumError::validation(format!(
            "root surface is empty ({width} x {height})"
        )));
    }
    let (need_w, need_h) = covering_size(&setup);
    if width < need_w || height < need_h {
        tracing::debug!(
            width,
            height,
            need_w,
            need_h,
            "root surface does not cover the document"
        );
    }
    if let Some(color) = config.clear_color {
        backend.clear(&mut surface, color);
    }

    let filters: &mut dyn FilterRenderer = filters;
    let drawn = draw(doc, target, backend, Some(filters), surface, setup)?;
    let outcome = RenderOutcome {
        ink: device_rect(&drawn.bbox.ink, setup.offset),
        logical: device_rect(&drawn.bbox.logical, setup.offset),
        diagnostics: drawn.diagnostics,
        stats: drawn.stats,
    };
    Ok((drawn.surface, outcome))
}

#[cfg(test)]
#[path = "../../tests/unit/render/pipeline.rs"]
mod tests;
