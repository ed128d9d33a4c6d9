//! Arena-backed element tree consumed by the pipeline.

use crate::filter::FilterPrimitive;
use crate::foundation::core::{BezPath, PixelBuffer, Rect};
use crate::foundation::error::{VellumError, VellumResult};
use crate::geometry::length::Length;
use crate::geometry::viewbox::AspectRatio;
use crate::tree::style::{CoordUnits, Style};
use std::collections::HashMap;

/// Index of a node inside its [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

/// A viewport-establishing element (the root, or a nested `<svg>`).
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportElement {
    /// Left edge in the parent's user space; ignored on the root.
    pub x: Length,
    /// Top edge in the parent's user space; ignored on the root.
    pub y: Length,
    /// Viewport width.
    pub width: Length,
    /// Viewport height.
    pub height: Length,
    /// Optional `viewBox`.
    pub view_box: Option<Rect>,
    /// How the viewBox is fitted.
    pub aspect: AspectRatio,
}

impl ViewportElement {
    /// Viewport of a fixed size with no viewBox.
    pub fn sized(width: f64, height: f64) -> Self {
        Self {
            x: Length::zero(),
            y: Length::zero(),
            width: Length::px(width),
            height: Length::px(height),
            view_box: None,
            aspect: AspectRatio::default(),
        }
    }

    /// Replace the viewBox.
    pub fn with_view_box(mut self, view_box: Rect) -> Self {
        self.view_box = Some(view_box);
        self
    }
}

impl Default for ViewportElement {
    fn default() -> Self {
        Self {
            x: Length::zero(),
            y: Length::zero(),
            width: Length::percent(100.0),
            height: Length::percent(100.0),
            view_box: None,
            aspect: AspectRatio::default(),
        }
    }
}

/// Raster image placed in a rectangle.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageElement {
    /// Placement rectangle left edge.
    pub x: Length,
    /// Placement rectangle top edge.
    pub y: Length,
    /// Placement rectangle width.
    pub width: Length,
    /// Placement rectangle height.
    pub height: Length,
    /// Decoded premultiplied pixels.
    pub pixels: PixelBuffer,
    /// How the pixels are fitted into the placement rectangle.
    pub aspect: AspectRatio,
}

/// A text run already laid out into glyph outlines.
#[derive(Clone, Debug, PartialEq)]
pub struct TextElement {
    /// Glyph outlines in user space.
    pub outlines: BezPath,
    /// Logical (advance and line-height) rectangle of the run.
    pub logical: Rect,
}

/// `<use>` reference to another node.
#[derive(Clone, Debug, PartialEq)]
pub struct UseElement {
    /// IRI of the referenced node.
    pub href: String,
    /// Horizontal translation.
    pub x: Length,
    /// Vertical translation.
    pub y: Length,
    /// Width used when instantiating a symbol.
    pub width: Length,
    /// Height used when instantiating a symbol.
    pub height: Length,
}

impl UseElement {
    /// Reference `href` at the origin.
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            x: Length::zero(),
            y: Length::zero(),
            width: Length::percent(100.0),
            height: Length::percent(100.0),
        }
    }

    /// Replace the translation.
    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.x = Length::px(x);
        self.y = Length::px(y);
        self
    }
}

/// Template instantiated only through `<use>`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SymbolElement {
    /// Optional `viewBox`.
    pub view_box: Option<Rect>,
    /// How the viewBox is fitted.
    pub aspect: AspectRatio,
}

/// `clipPath` definition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClipPathElement {
    /// `clipPathUnits`.
    pub units: CoordUnits,
}

/// `mask` definition.
#[derive(Clone, Debug, PartialEq)]
pub struct MaskElement {
    /// `maskUnits`, used for the mask rectangle.
    pub units: CoordUnits,
    /// `maskContentUnits`, used for the children.
    pub content_units: CoordUnits,
    /// Mask rectangle left edge.
    pub x: Length,
    /// Mask rectangle top edge.
    pub y: Length,
    /// Mask rectangle width.
    pub width: Length,
    /// Mask rectangle height.
    pub height: Length,
}

impl Default for MaskElement {
    fn default() -> Self {
        Self {
            units: CoordUnits::ObjectBoundingBox,
            content_units: CoordUnits::UserSpaceOnUse,
            x: Length::percent(-10.0),
            y: Length::percent(-10.0),
            width: Length::percent(120.0),
            height: Length::percent(120.0),
        }
    }
}

/// `filter` definition.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterElement {
    /// `filterUnits`, used for the filter region.
    pub units: CoordUnits,
    /// `primitiveUnits`, used for primitive parameters.
    pub primitive_units: CoordUnits,
    /// Filter region left edge.
    pub x: Length,
    /// Filter region top edge.
    pub y: Length,
    /// Filter region width.
    pub width: Length,
    /// Filter region height.
    pub height: Length,
    /// Primitive chain evaluated in order.
    pub primitives: Vec<FilterPrimitive>,
}

impl Default for FilterElement {
    fn default() -> Self {
        Self {
            units: CoordUnits::ObjectBoundingBox,
            primitive_units: CoordUnits::UserSpaceOnUse,
            x: Length::percent(-10.0),
            y: Length::percent(-10.0),
            width: Length::percent(120.0),
            height: Length::percent(120.0),
            primitives: Vec::new(),
        }
    }
}

/// `pattern` paint server.
///
/// The node's own transform is the `patternTransform`.
#[derive(Clone, Debug, PartialEq)]
pub struct PatternElement {
    /// `patternUnits`, used for the tile rectangle.
    pub units: CoordUnits,
    /// `patternContentUnits`, used for the children when there is no viewBox.
    pub content_units: CoordUnits,
    /// Tile left edge.
    pub x: Length,
    /// Tile top edge.
    pub y: Length,
    /// Tile width.
    pub width: Length,
    /// Tile height.
    pub height: Length,
    /// Optional `viewBox`; overrides `content_units`.
    pub view_box: Option<Rect>,
    /// How the viewBox is fitted into a tile.
    pub aspect: AspectRatio,
}

impl Default for PatternElement {
    fn default() -> Self {
        Self {
            units: CoordUnits::ObjectBoundingBox,
            content_units: CoordUnits::UserSpaceOnUse,
            x: Length::zero(),
            y: Length::zero(),
            width: Length::zero(),
            height: Length::zero(),
            view_box: None,
            aspect: AspectRatio::default(),
        }
    }
}

/// `markerUnits`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MarkerUnits {
    /// Scale marker content by the referencing stroke width.
    #[default]
    StrokeWidth,
    /// Use the referencing element's user space unscaled.
    UserSpaceOnUse,
}

/// `orient`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MarkerOrient {
    /// Follow the path direction at the vertex.
    Auto,
    /// Fixed angle in degrees.
    Angle(f64),
}

/// `marker` definition.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerElement {
    /// `markerUnits`.
    pub units: MarkerUnits,
    /// Reference point x, in marker content space.
    pub ref_x: Length,
    /// Reference point y, in marker content space.
    pub ref_y: Length,
    /// Marker viewport width.
    pub width: Length,
    /// Marker viewport height.
    pub height: Length,
    /// Orientation.
    pub orient: MarkerOrient,
    /// Optional `viewBox`.
    pub view_box: Option<Rect>,
    /// How the viewBox is fitted.
    pub aspect: AspectRatio,
}

impl Default for MarkerElement {
    fn default() -> Self {
        Self {
            units: MarkerUnits::StrokeWidth,
            ref_x: Length::zero(),
            ref_y: Length::zero(),
            width: Length::px(3.0),
            height: Length::px(3.0),
            orient: MarkerOrient::Angle(0.0),
            view_box: None,
            aspect: AspectRatio::default(),
        }
    }
}

/// What a node is.
#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    /// Plain container.
    Group,
    /// Nested viewport (the root is always one).
    Viewport(ViewportElement),
    /// Pre-flattened path.
    Shape(BezPath),
    /// Raster image.
    Image(ImageElement),
    /// Laid-out text run.
    Text(TextElement),
    /// Reference to another node.
    Use(UseElement),
    /// Template for `<use>`.
    Symbol(SymbolElement),
    /// Clip definition; never drawn directly.
    ClipPath(ClipPathElement),
    /// Mask definition; never drawn directly.
    Mask(MaskElement),
    /// Filter definition; never drawn directly.
    Filter(FilterElement),
    /// Marker definition; never drawn directly.
    Marker(MarkerElement),
    /// Pattern paint server; never drawn directly.
    Pattern(PatternElement),
    /// Definitions container; never drawn directly.
    Defs,
}

impl NodeKind {
    /// Return `true` for kinds that only draw when referenced.
    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            Self::Symbol(_)
                | Self::ClipPath(_)
                | Self::Mask(_)
                | Self::Filter(_)
                | Self::Marker(_)
                | Self::Pattern(_)
                | Self::Defs
        )
    }

    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Group => "g",
            Self::Viewport(_) => "svg",
            Self::Shape(_) => "path",
            Self::Image(_) => "image",
            Self::Text(_) => "text",
            Self::Use(_) => "use",
            Self::Symbol(_) => "symbol",
            Self::ClipPath(_) => "clipPath",
            Self::Mask(_) => "mask",
            Self::Filter(_) => "filter",
            Self::Marker(_) => "marker",
            Self::Pattern(_) => "pattern",
            Self::Defs => "defs",
        }
    }
}

/// One element of the tree.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    /// Element kind and element-specific data.
    pub kind: NodeKind,
    /// Computed style.
    pub style: Style,
    /// `id` attribute.
    pub id: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    /// Detached node with default style.
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            style: Style::default(),
            id: None,
            parent: None,
            children: Vec::new(),
        }
    }

    /// Replace the style.
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Set the `id` attribute.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Parent node, `None` for the root.
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in document order.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

/// Element tree with an `id` definitions table.
#[derive(Clone, Debug)]
pub struct Document {
    nodes: Vec<Node>,
    ids: HashMap<String, NodeId>,
}

impl Document {
    /// Document whose root viewport is `root`.
    pub fn new(root: ViewportElement, style: Style) -> Self {
        Self {
            nodes: vec![Node::new(NodeKind::Viewport(root)).with_style(style)],
            ids: HashMap::new(),
        }
    }

    /// Root viewport node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append `node` as the last child of `parent`.
    ///
    /// Fails when `parent` is not in this document or the node's `id` is already taken.
    pub fn append(&mut self, parent: NodeId, mut node: Node) -> VellumResult<NodeId> {
        if parent.0 as usize >= self.nodes.len() {
            return Err(VellumError::validation(format!(
                "parent node {} does not exist",
                parent.0
            )));
        }
        let id = NodeId(
            u32::try_from(self.nodes.len())
                .map_err(|_| VellumError::validation("document exceeds u32::MAX nodes"))?,
        );
        if let Some(name) = node.id.as_deref() {
            if self.ids.contains_key(name) {
                return Err(VellumError::validation(format!("duplicate id '{name}'")));
            }
            self.ids.insert(name.to_owned(), id);
        }
        node.parent = Some(parent);
        node.children.clear();
        self.nodes.push(node);
        self.nodes[parent.0 as usize].children.push(id);
        Ok(id)
    }

    /// Borrow a node.
    ///
    /// # Panics
    ///
    /// Panics when `id` belongs to another document.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0 as usize]
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`: a document has at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node registered under `id`.
    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.ids.get(id).copied()
    }

    /// Resolve an IRI of the form `#id`, `url(#id)` or a bare `id`.
    pub fn lookup(&self, iri: &str) -> Option<NodeId> {
        self.by_id(strip_iri(iri))
    }

    /// `id` followed by its ancestors up to and including the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), |n| self.node(*n).parent)
    }

    /// Return `true` when `ancestor` is `node` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).any(|n| n == ancestor)
    }
}

pub(crate) fn strip_iri(iri: &str) -> &str {
    let s = iri.trim();
    let s = s
        .strip_prefix("url(")
        .and_then(|rest| rest.strip_suffix(')'))
        .map(str::trim)
        .unwrap_or(s);
    let s = s
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .or_else(|| s.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')))
        .unwrap_or(s);
    s.strip_prefix('#').unwrap_or(s)
}

#[cfg(test)]
#[path = "../../tests/unit/tree/document.rs"]
mod tests;
