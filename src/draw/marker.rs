use crate::draw::context::DrawingCtx;
use crate::foundation::core::{Affine, BezPath, Point, Rect, Vec2};
use crate::foundation::error::VellumResult;
use crate::geometry::length::LengthDir;
use crate::render::backend::Backend;
use crate::tree::document::{MarkerOrient, MarkerUnits, NodeId, NodeKind};
use kurbo::PathEl;
use std::f64::consts::PI;

/// A path vertex with the directions of the segments meeting there.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Vertex {
    pub(crate) point: Point,
    pub(crate) incoming: Option<Vec2>,
    pub(crate) outgoing: Option<Vec2>,
}

impl Vertex {
    fn at(point: Point) -> Self {
        Self {
            point,
            incoming: None,
            outgoing: None,
        }
    }

    /// Direction for `orient="auto"`, in radians.
    ///
    /// Interior vertices take the bisector of the incoming and outgoing directions.
    pub(crate) fn angle(&self) -> f64 {
        match (self.incoming, self.outgoing) {
            (Some(i), Some(o)) => {
                let a_in = i.atan2();
                let mut delta = o.atan2() - a_in;
                if delta > PI {
                    delta -= 2.0 * PI;
                } else if delta < -PI {
                    delta += 2.0 * PI;
                }
                a_in + delta / 2.0
            }
            (Some(d), None) | (None, Some(d)) => d.atan2(),
            (None, None) => 0.0,
        }
    }
}

fn first_direction(from: Point, points: &[Point]) -> Option<Vec2> {
    points.iter().map(|p| *p - from).find(|d| d.hypot2() > 0.0)
}

fn segment(out: &mut Vec<Vertex>, from: Point, controls: &[Point], to: Point) -> Point {
    let mut forward: Vec<Point> = controls.to_vec();
    forward.push(to);
    let start = first_direction(from, &forward);

    let mut backward: Vec<Point> = controls.iter().rev().copied().collect();
    backward.push(from);
    let end = first_direction(to, &backward).map(|d| -d);

    if out.is_empty() {
        out.push(Vertex::at(from));
    }
    if let Some(last) = out.last_mut() {
        last.outgoing = start;
    }
    out.push(Vertex {
        point: to,
        incoming: end,
        outgoing: None,
    });
    to
}

/// Vertices markers are placed on, in path order.
pub(crate) fn marker_vertices(path: &BezPath) -> Vec<Vertex> {
    let mut out: Vec<Vertex> = Vec::new();
    let mut current = Point::ZERO;
    let mut subpath_start = 0usize;

    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => {
                out.push(Vertex::at(p));
                subpath_start = out.len() - 1;
                current = p;
            }
            PathEl::LineTo(p) => current = segment(&mut out, current, &[], p),
            PathEl::QuadTo(c, p) => current = segment(&mut out, current, &[c], p),
            PathEl::CurveTo(c1, c2, p) => current = segment(&mut out, current, &[c1, c2], p),
            PathEl::ClosePath => {
                let Some(start) = out.get(subpath_start).copied() else {
                    continue;
                };
                if current != start.point {
                    current = segment(&mut out, current, &[], start.point);
                }
                let closing = out.len() - 1;
                if closing != subpath_start {
                    out[closing].outgoing = start.outgoing;
                    out[subpath_start].incoming = out[closing].incoming;
                }
            }
        }
    }
    out
}

fn is_marker(kind: &NodeKind) -> bool {
    matches!(kind, NodeKind::Marker(_))
}

impl<'a, B: Backend> DrawingCtx<'a, B> {
    /// Draw the start, mid and end markers of shape `owner`.
    pub(crate) fn draw_markers(
        &mut self,
        owner: NodeId,
        path: &BezPath,
        affine: Affine,
        stroke_width: f64,
    ) -> VellumResult<()> {
        let doc = self.doc;
        let markers = &doc.node(owner).style.markers;
        let vertices = marker_vertices(path);
        let Some(last) = vertices.len().checked_sub(1) else {
            return Ok(());
        };

        for (i, vertex) in vertices.iter().enumerate() {
            let iri = if i == 0 {
                markers.start.as_deref()
            } else if i == last {
                None
            } else {
                markers.mid.as_deref()
            };
            if let Some(iri) = iri {
                self.draw_marker(owner, iri, vertex, affine, stroke_width)?;
            }
        }
        if let Some(iri) = markers.end.as_deref() {
            self.draw_marker(owner, iri, &vertices[last], affine, stroke_width)?;
        }
        Ok(())
    }

    fn draw_marker(
        &mut self,
        owner: NodeId,
        iri: &str,
        vertex: &Vertex,
        affine: Affine,
        stroke_width: f64,
    ) -> VellumResult<()> {
        let Some(id) = self.resolve(iri, owner, "marker", is_marker) else {
            return Ok(());
        };
        let doc = self.doc;
        let node = doc.node(id);
        let NodeKind::Marker(marker) = &node.kind else {
            return Ok(());
        };
        let Some(mut guard) = self.acquire(id, owner) else {
            return Ok(());
        };
        let ctx: &mut Self = &mut guard;

        let params = ctx.normalize_params(node.style.font_size);
        let width = marker.width.normalize(LengthDir::Horizontal, &params);
        let height = marker.height.normalize(LengthDir::Vertical, &params);
        if width <= 0.0 || height <= 0.0 {
            return Ok(());
        }
        let viewport = Rect::new(0.0, 0.0, width, height);
        let (content, size) = match marker.view_box {
            Some(vb) => match marker.aspect.view_box_transform(vb, viewport) {
                Some(m) => (m, (vb.width(), vb.height())),
                None => return Ok(()),
            },
            None => (Affine::IDENTITY, (width, height)),
        };

        let rotation = match marker.orient {
            MarkerOrient::Auto => vertex.angle(),
            MarkerOrient::Angle(deg) => deg.to_radians(),
        };
        let mut placed = affine * Affine::translate(vertex.point.to_vec2()) * Affine::rotate(rotation);
        if marker.units == MarkerUnits::StrokeWidth {
            placed *= Affine::scale(stroke_width);
        }

        let ref_x = marker.ref_x.normalize(LengthDir::Horizontal, &params);
        let ref_y = marker.ref_y.normalize(LengthDir::Vertical, &params);
        let anchor = content * Point::new(ref_x, ref_y);
        let origin = placed * Affine::translate(-anchor.to_vec2());
        let clip = !node.style.overflow_visible;

        ctx.with_layer(id, placed, |ctx| {
            if clip && !ctx.collecting_clip() {
                let transform = ctx.device_transform(origin);
                ctx.backend.clip_rect(&mut ctx.current, viewport, transform)?;
            }
            ctx.with_viewport(size, |ctx| {
                ctx.with_drawsub_suspended(|ctx| ctx.draw_children(id, origin * content))
            })
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/draw/marker.rs"]
mod tests;
