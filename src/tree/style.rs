//! Computed per-node style state.
//!
//! The cascade that produces these values lives outside this crate; the pipeline only reads them.

use crate::foundation::core::{Affine, Color};
use crate::geometry::length::Length;

/// Coordinate system for clip, mask and filter geometry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum CoordUnits {
    /// The user space of the referencing element.
    #[default]
    UserSpaceOnUse,
    /// Fractions of the referencing element's bounding box.
    ObjectBoundingBox,
}

/// Winding rule used to decide which areas of a path are inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum FillRule {
    /// Non-zero winding.
    #[default]
    NonZero,
    /// Even-odd parity.
    EvenOdd,
}

/// Operator used when a layer is composited onto its parent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum CompOp {
    Clear,
    Src,
    Dst,
    #[default]
    SrcOver,
    DstOver,
    SrcIn,
    DstIn,
    SrcOut,
    DstOut,
    SrcAtop,
    DstAtop,
    Xor,
    Plus,
    Multiply,
    Screen,
    Overlay,
    Darken,
    Lighten,
    ColorDodge,
    ColorBurn,
    HardLight,
    SoftLight,
    Difference,
    Exclusion,
}

/// `enable-background` mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum BackgroundMode {
    /// Draw into the parent's background image.
    #[default]
    Accumulate,
    /// Start a fresh background image.
    New,
}

/// Fill or stroke paint.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Paint {
    /// Nothing is painted.
    #[default]
    None,
    /// Solid color, straight alpha.
    Color(Color),
    /// Reference to a paint server such as a `pattern`.
    ///
    /// `fallback` is painted when the reference is missing, cyclic or unusable; without one the
    /// outline is left unpainted.
    Server {
        /// IRI of the server node.
        iri: String,
        /// Color painted instead of an unusable server.
        fallback: Option<Color>,
    },
}

impl Paint {
    /// Reference a paint server without a fallback color.
    pub fn server(iri: impl Into<String>) -> Self {
        Self::Server {
            iri: iri.into(),
            fallback: None,
        }
    }

    /// Reference a paint server, painting `fallback` when it cannot be used.
    pub fn server_or(iri: impl Into<String>, fallback: Color) -> Self {
        Self::Server {
            iri: iri.into(),
            fallback: Some(fallback),
        }
    }
}

/// Stroke line cap.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum LineCap {
    #[default]
    Butt,
    Round,
    Square,
}

/// Stroke line join.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[allow(missing_docs)]
pub enum LineJoin {
    #[default]
    Miter,
    Round,
    Bevel,
}

/// Stroke geometry and paint.
#[derive(Clone, Debug, PartialEq)]
pub struct StrokeStyle {
    /// Stroke paint.
    pub paint: Paint,
    /// Multiplies the paint's alpha.
    pub opacity: f32,
    /// Line width; percentages resolve diagonally.
    pub width: Length,
    /// Cap style.
    pub cap: LineCap,
    /// Join style.
    pub join: LineJoin,
    /// Miter limit ratio.
    pub miter_limit: f64,
    /// Dash pattern; empty means solid.
    pub dashes: Vec<Length>,
    /// Offset into the dash pattern.
    pub dash_offset: Length,
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            paint: Paint::None,
            opacity: 1.0,
            width: Length::px(1.0),
            cap: LineCap::Butt,
            join: LineJoin::Miter,
            miter_limit: 4.0,
            dashes: Vec::new(),
            dash_offset: Length::zero(),
        }
    }
}

/// References and group effects that may force a node into its own layer.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectRefs {
    /// Group opacity in `0..=1`.
    pub opacity: f32,
    /// IRI of a `clipPath` node.
    pub clip_path: Option<String>,
    /// IRI of a `mask` node.
    pub mask: Option<String>,
    /// IRI of a `filter` node.
    pub filter: Option<String>,
    /// Operator used to composite the layer.
    pub comp_op: CompOp,
    /// Background accumulation mode.
    pub background: BackgroundMode,
}

impl Default for EffectRefs {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            clip_path: None,
            mask: None,
            filter: None,
            comp_op: CompOp::SrcOver,
            background: BackgroundMode::Accumulate,
        }
    }
}

/// IRIs of the markers drawn on a shape's vertices.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MarkerRefs {
    /// Drawn on the first vertex.
    pub start: Option<String>,
    /// Drawn on every interior vertex.
    pub mid: Option<String>,
    /// Drawn on the last vertex.
    pub end: Option<String>,
}

impl MarkerRefs {
    /// Return `true` when no marker is referenced.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.mid.is_none() && self.end.is_none()
    }
}

/// Computed style of one node.
#[derive(Clone, Debug, PartialEq)]
pub struct Style {
    /// The node's own transform, applied before its content.
    pub transform: Affine,
    /// Layer effects.
    pub effects: EffectRefs,
    /// Fill paint.
    pub fill: Paint,
    /// Multiplies the fill paint's alpha.
    pub fill_opacity: f32,
    /// Fill winding rule.
    pub fill_rule: FillRule,
    /// Winding rule used when this node is clip geometry.
    pub clip_rule: FillRule,
    /// Stroke settings.
    pub stroke: StrokeStyle,
    /// Vertex markers.
    pub markers: MarkerRefs,
    /// `visibility`; hidden nodes still contribute to extents of their layers' children.
    pub visible: bool,
    /// `overflow: visible` disables the viewport clip of viewports, symbols and markers.
    pub overflow_visible: bool,
    /// Computed font size, used by em and ex lengths.
    pub font_size: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            effects: EffectRefs::default(),
            fill: Paint::Color(Color::BLACK),
            fill_opacity: 1.0,
            fill_rule: FillRule::NonZero,
            clip_rule: FillRule::NonZero,
            stroke: StrokeStyle::default(),
            markers: MarkerRefs::default(),
            visible: true,
            overflow_visible: false,
            font_size: 12.0,
        }
    }
}

impl Style {
    /// Solid fill, no stroke.
    pub fn filled(color: Color) -> Self {
        Self {
            fill: Paint::Color(color),
            ..Self::default()
        }
    }

    /// Replace the transform.
    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    /// Replace the group opacity.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.effects.opacity = opacity;
        self
    }

    /// Reference a clip path.
    pub fn with_clip_path(mut self, iri: impl Into<String>) -> Self {
        self.effects.clip_path = Some(iri.into());
        self
    }

    /// Reference a mask.
    pub fn with_mask(mut self, iri: impl Into<String>) -> Self {
        self.effects.mask = Some(iri.into());
        self
    }

    /// Reference a filter.
    pub fn with_filter(mut self, iri: impl Into<String>) -> Self {
        self.effects.filter = Some(iri.into());
        self
    }

    /// Replace the compositing operator.
    pub fn with_comp_op(mut self, op: CompOp) -> Self {
        self.effects.comp_op = op;
        self
    }

    /// Replace the fill paint.
    pub fn with_fill(mut self, paint: Paint) -> Self {
        self.fill = paint;
        self
    }

    /// Replace the stroke.
    pub fn with_stroke(mut self, color: Color, width: f64) -> Self {
        self.stroke.paint = Paint::Color(color);
        self.stroke.width = Length::px(width);
        self
    }
}
