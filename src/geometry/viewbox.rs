use crate::foundation::core::{Affine, Rect};

/// Alignment of one axis inside the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AlignAxis {
    /// Align the low edges.
    Min,
    /// Center.
    Mid,
    /// Align the high edges.
    Max,
}

/// Whether a uniformly scaled viewBox fits inside or covers the viewport.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Fit {
    /// Scale so the whole viewBox is visible.
    #[default]
    Meet,
    /// Scale so the viewBox covers the whole viewport.
    Slice,
}

/// `preserveAspectRatio` value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AspectRatio {
    /// `None` stretches each axis independently.
    pub align: Option<(AlignAxis, AlignAxis)>,
    /// Ignored when `align` is `None`.
    pub fit: Fit,
}

impl Default for AspectRatio {
    fn default() -> Self {
        Self {
            align: Some((AlignAxis::Mid, AlignAxis::Mid)),
            fit: Fit::Meet,
        }
    }
}

impl AspectRatio {
    /// Stretch to fill, ignoring the aspect ratio.
    pub const NONE: Self = Self {
        align: None,
        fit: Fit::Meet,
    };

    /// Rectangle, in viewport space, that an object of `object_size` occupies inside `viewport`.
    pub fn place(&self, object_size: (f64, f64), viewport: Rect) -> Rect {
        let (ow, oh) = object_size;
        let Some((ax, ay)) = self.align else {
            return viewport;
        };
        if ow <= 0.0 || oh <= 0.0 {
            return viewport;
        }
        let sx = viewport.width() / ow;
        let sy = viewport.height() / oh;
        let s = match self.fit {
            Fit::Meet => sx.min(sy),
            Fit::Slice => sx.max(sy),
        };
        let w = ow * s;
        let h = oh * s;
        let x = viewport.x0 + align_offset(ax, viewport.width() - w);
        let y = viewport.y0 + align_offset(ay, viewport.height() - h);
        Rect::new(x, y, x + w, y + h)
    }

    /// Transform mapping `view_box` onto `viewport`.
    ///
    /// Returns `None` for an empty or negative viewBox, which disables rendering of the element.
    pub fn view_box_transform(&self, view_box: Rect, viewport: Rect) -> Option<Affine> {
        if view_box.width() <= 0.0 || view_box.height() <= 0.0 {
            return None;
        }
        let placed = self.place((view_box.width(), view_box.height()), viewport);
        Some(
            Affine::translate((placed.x0, placed.y0))
                * Affine::scale_non_uniform(
                    placed.width() / view_box.width(),
                    placed.height() / view_box.height(),
                )
                * Affine::translate((-view_box.x0, -view_box.y0)),
        )
    }
}

fn align_offset(a: AlignAxis, slack: f64) -> f64 {
    match a {
        AlignAxis::Min => 0.0,
        AlignAxis::Mid => slack / 2.0,
        AlignAxis::Max => slack,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/viewbox.rs"]
mod tests;
