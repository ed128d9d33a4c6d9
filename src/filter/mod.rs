//! Filter collaborator seam.
//!
//! The layer manager hands an isolated layer's pixels to a [`FilterRenderer`] together with the
//! layer's bounding box and gets the filtered pixels back. [`CpuFilterRenderer`] is the shipped
//! implementation.

mod cpu;

pub use cpu::CpuFilterRenderer;

use crate::foundation::core::{Color, PixelBuffer};
use crate::foundation::error::VellumResult;
use crate::geometry::bbox::BoundingBox;
use crate::geometry::length::NormalizeParams;
use crate::tree::document::FilterElement;

/// Where a primitive reads its pixels from.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum FilterInput {
    /// The layer as drawn.
    SourceGraphic,
    /// The layer's alpha channel, black.
    SourceAlpha,
    /// The previous primitive's result, or the source for the first primitive.
    #[default]
    Previous,
    /// A result named by an earlier primitive.
    Named(String),
}

/// Operation performed by one primitive.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterPrimitiveKind {
    /// Separable Gaussian blur; standard deviation per axis in primitive units.
    GaussianBlur {
        /// `(x, y)` standard deviation.
        std_dev: (f64, f64),
    },
    /// Translate the input; distances in primitive units.
    Offset {
        /// Horizontal shift.
        dx: f64,
        /// Vertical shift.
        dy: f64,
    },
    /// 4x5 matrix over straight-alpha RGBA, row major.
    ColorMatrix {
        /// Matrix coefficients.
        matrix: [f32; 20],
    },
    /// Fill the region with a color.
    Flood {
        /// Flood color.
        color: Color,
        /// Multiplies the color's alpha.
        opacity: f32,
    },
    /// Stack inputs with source-over, first at the bottom.
    Merge {
        /// Inputs in paint order.
        inputs: Vec<FilterInput>,
    },
}

/// One step of a filter chain.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterPrimitive {
    /// Operation.
    pub kind: FilterPrimitiveKind,
    /// Input; ignored by `Flood` and `Merge`.
    pub input: FilterInput,
    /// Name other primitives can refer to.
    pub result: Option<String>,
}

impl FilterPrimitive {
    /// Primitive reading the previous result.
    pub fn new(kind: FilterPrimitiveKind) -> Self {
        Self {
            kind,
            input: FilterInput::Previous,
            result: None,
        }
    }

    /// Replace the input.
    pub fn with_input(mut self, input: FilterInput) -> Self {
        self.input = input;
        self
    }

    /// Name the result.
    pub fn with_result(mut self, name: impl Into<String>) -> Self {
        self.result = Some(name.into());
        self
    }
}

/// Geometry a filter needs beyond its source pixels.
#[derive(Clone, Copy, Debug)]
pub struct FilterContext<'a> {
    /// Logical bounding box of the filtered layer, in the node's user space.
    pub bbox: &'a BoundingBox,
    /// Length resolution context at the filtered node.
    pub normalize: NormalizeParams,
}

/// Renders a filter over an isolated layer.
pub trait FilterRenderer {
    /// Produce the filtered layer. `source` and the result have identical dimensions.
    fn render(
        &mut self,
        filter: &FilterElement,
        source: &PixelBuffer,
        ctx: &FilterContext<'_>,
    ) -> VellumResult<PixelBuffer>;
}
