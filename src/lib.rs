//! Vellum renders a tree of vector-graphics elements into premultiplied RGBA8 pixels.
//!
//! The crate is the compositing core of an SVG renderer: it takes an already parsed and styled
//! element tree ([`Document`]) and draws it onto a drawing target provided by a [`Backend`],
//! honoring nested transparency groups, clip paths, masks, filters, markers, pattern paint
//! servers and percentage/bounding-box relative units.
//!
//! # Pipeline overview
//!
//! 1. **Setup**: the root viewport is sized and placed on integral pixels under the caller's
//!    [`RenderConfig::base_transform`].
//! 2. **Draw**: nodes are visited recursively. Every drawable node opens a layer that decides
//!    once whether it needs an offscreen target (opacity, filter, mask, bounding-box clip,
//!    non-default compositing) and closes it after its content is drawn.
//! 3. **Measure**: two bounding boxes (geometric and ink) are accumulated through every level and
//!    reported in [`RenderOutcome`]. Extent queries ([`geometry_for_element`]) run the same
//!    traversal restricted to one element's ancestor chain on a pixel-less [`MeasureBackend`].
//!
//! Design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Best-effort**: broken references and failed effects degrade and are reported as
//!   [`Diagnostic`]s; only unusable inputs are errors.
//! - **Premultiplied RGBA8** end-to-end.
//! - **No global state**: DPI and everything else travels in a per-call [`RenderConfig`].
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod draw;
mod filter;
mod foundation;
mod geometry;
mod render;
mod tree;

pub use draw::{DrawStats, needs_isolation};
pub use filter::{
    CpuFilterRenderer, FilterContext, FilterInput, FilterPrimitive, FilterPrimitiveKind,
    FilterRenderer,
};
pub use foundation::core::{
    Affine, BezPath, Color, PixelBuffer, Point, Rect, Rgba8Premul, Size, Vec2,
};
pub use foundation::diagnostics::{Diagnostic, DiagnosticKind};
pub use foundation::error::{VellumError, VellumResult};
pub use geometry::bbox::{BboxPair, BoundingBox};
pub use geometry::length::{Length, LengthDir, LengthUnit, NormalizeParams};
pub use geometry::viewbox::{AlignAxis, AspectRatio, Fit};
pub use render::backend::{Backend, ClipGeometry, PathPaint};
pub use render::cpu::{CpuBackend, CpuSurface};
pub use render::measure::{MeasureBackend, MeasureSurface};
pub use render::pipeline::{
    ElementGeometry, RenderConfig, RenderOutcome, dimensions_for_element, document_size,
    geometry_for_element, position_for_element, rasterize_document, render_document,
    render_element,
};
pub use render::surface_pool::{SurfacePoolOpts, SurfacePoolStats};
pub use tree::document::{
    ClipPathElement, Document, FilterElement, ImageElement, MarkerElement, MarkerOrient,
    MarkerUnits, MaskElement, Node, NodeId, NodeKind, PatternElement, SymbolElement, TextElement,
    UseElement, ViewportElement,
};
pub use tree::style::{
    BackgroundMode, CompOp, CoordUnits, EffectRefs, FillRule, LineCap, LineJoin, MarkerRefs,
    Paint, StrokeStyle, Style,
};
