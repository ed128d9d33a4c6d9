//! Transform-aware bounding boxes.
//!
//! A [`BoundingBox`] records a rectangle together with the affine it was measured under. Merging
//! two boxes reprojects the source's corners into the destination's frame first, so boxes
//! collected at different nesting levels can be combined without losing their coordinate space.

use crate::foundation::core::{Affine, Point, Rect};

/// Rectangle plus the transform it was recorded under.
///
/// The `empty` flag is the "no geometry yet" state. It is distinct from a zero-sized rectangle,
/// which is real geometry (a degenerate line or point) and still participates in unions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// Extents in the space of `transform`. Meaningless while the box is empty.
    pub rect: Rect,
    /// Maps `rect`'s space to the render space.
    pub transform: Affine,
    empty: bool,
}

impl BoundingBox {
    /// Empty box anchored to `transform`.
    pub fn new(transform: Affine) -> Self {
        Self {
            rect: Rect::ZERO,
            transform,
            empty: true,
        }
    }

    /// Non-empty box covering `rect` under `transform`.
    pub fn from_rect(transform: Affine, rect: Rect) -> Self {
        Self {
            rect: rect.abs(),
            transform,
            empty: false,
        }
    }

    /// Return `true` while no geometry has been recorded.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// Union `src` into `self`.
    ///
    /// Returns `false` when `self.transform` is singular and the merge had to be skipped.
    pub fn insert(&mut self, src: &BoundingBox) -> bool {
        if src.empty {
            return true;
        }
        let Some(projected) = reproject(self.transform, src) else {
            return false;
        };
        if self.empty {
            self.rect = projected;
            self.empty = false;
        } else {
            self.rect = self.rect.union(projected);
        }
        true
    }

    /// Intersect `self` with `src`.
    ///
    /// The result never extends past `self`'s extent. An empty `self` adopts `src`; an empty
    /// `src` leaves `self` unchanged. Returns `false` on a singular `self.transform`.
    pub fn clip(&mut self, src: &BoundingBox) -> bool {
        if src.empty {
            return true;
        }
        let Some(projected) = reproject(self.transform, src) else {
            return false;
        };
        if self.empty {
            self.rect = projected;
            self.empty = false;
        } else {
            self.rect = intersect(self.rect, projected);
        }
        true
    }

    /// Axis-aligned extent of this box in render space, or `None` when empty.
    pub fn to_render_space(&self) -> Option<Rect> {
        if self.empty {
            return None;
        }
        Some(transform_rect(self.transform, self.rect))
    }
}

/// Geometric (fill extents) and ink (paint extents) boxes tracked side by side.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BboxPair {
    /// Fill-only extents, used to resolve `objectBoundingBox` units.
    pub logical: BoundingBox,
    /// Extents including stroke, used by extent queries.
    pub ink: BoundingBox,
}

impl BboxPair {
    /// Pair of empty boxes anchored to `transform`.
    pub fn new(transform: Affine) -> Self {
        Self {
            logical: BoundingBox::new(transform),
            ink: BoundingBox::new(transform),
        }
    }

    /// Union both members of `src` into `self`.
    pub fn insert(&mut self, src: &BboxPair) -> bool {
        let logical = self.logical.insert(&src.logical);
        let ink = self.ink.insert(&src.ink);
        logical && ink
    }

    /// Intersect both members of `self` with `rect`.
    pub fn clip(&mut self, rect: &BoundingBox) -> bool {
        let logical = self.logical.clip(rect);
        let ink = self.ink.clip(rect);
        logical && ink
    }
}

fn reproject(dst: Affine, src: &BoundingBox) -> Option<Rect> {
    let det = dst.determinant();
    if !det.is_finite() || det.abs() < f64::EPSILON {
        return None;
    }
    let m = dst.inverse() * src.transform;
    Some(transform_rect(m, src.rect))
}

pub(crate) fn transform_rect(m: Affine, r: Rect) -> Rect {
    let corners = [
        m * Point::new(r.x0, r.y0),
        m * Point::new(r.x1, r.y0),
        m * Point::new(r.x0, r.y1),
        m * Point::new(r.x1, r.y1),
    ];
    let mut out = Rect::from_points(corners[0], corners[0]);
    for p in &corners[1..] {
        out = out.union_pt(*p);
    }
    out
}

fn intersect(a: Rect, b: Rect) -> Rect {
    let x0 = a.x0.max(b.x0).min(a.x1);
    let y0 = a.y0.max(b.y0).min(a.y1);
    let x1 = a.x1.min(b.x1).max(x0);
    let y1 = a.y1.min(b.y1).max(y0);
    Rect::new(x0, y0, x1, y1)
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/bbox.rs"]
mod tests;
