use super::*;
use crate::foundation::core::{Color, Point};

fn px(s: &CpuSurface, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * s.width() + x) * 4) as usize;
    let d = s.data();
    [d[i], d[i + 1], d[i + 2], d[i + 3]]
}

fn fill(color: Color) -> PathPaint {
    PathPaint::Fill {
        color,
        rule: FillRule::NonZero,
    }
}

#[test]
fn fills_a_rectangle_under_transform() {
    let mut be = CpuBackend::default();
    let mut s = CpuSurface::new(16, 16).unwrap();
    let path = Rect::new(0.0, 0.0, 4.0, 4.0).to_path(0.1);
    be.draw_path(&mut s, &path, Affine::translate((8.0, 8.0)), &fill(Color::rgb(255, 0, 0)))
        .unwrap();
    assert_eq!(px(&s, 9, 9), [255, 0, 0, 255]);
    assert_eq!(px(&s, 2, 2), [0, 0, 0, 0]);
}

#[test]
fn clip_rect_limits_later_draws_and_restores() {
    let mut be = CpuBackend::default();
    let mut s = CpuSurface::new(8, 8).unwrap();
    let before = be.clip_snapshot(&s);
    be.clip_rect(&mut s, Rect::new(0.0, 0.0, 4.0, 8.0), Affine::IDENTITY)
        .unwrap();
    let full = Rect::new(0.0, 0.0, 8.0, 8.0).to_path(0.1);
    be.draw_path(&mut s, &full, Affine::IDENTITY, &fill(Color::WHITE))
        .unwrap();
    assert_eq!(px(&s, 1, 1)[3], 255);
    assert_eq!(px(&s, 6, 1)[3], 0);

    be.restore_clip(&mut s, before);
    be.draw_path(&mut s, &full, Affine::IDENTITY, &fill(Color::WHITE))
        .unwrap();
    assert_eq!(px(&s, 6, 1)[3], 255);
}

#[test]
fn clip_paths_use_union_of_geometry() {
    let mut be = CpuBackend::default();
    let mut s = CpuSurface::new(8, 8).unwrap();
    let left = ClipGeometry {
        path: Rect::new(0.0, 0.0, 2.0, 8.0).to_path(0.1),
        transform: Affine::IDENTITY,
        rule: FillRule::NonZero,
    };
    let right = ClipGeometry {
        path: Rect::new(6.0, 0.0, 8.0, 8.0).to_path(0.1),
        transform: Affine::IDENTITY,
        rule: FillRule::NonZero,
    };
    be.clip_paths(&mut s, &[left, right]).unwrap();
    let full = Rect::new(0.0, 0.0, 8.0, 8.0).to_path(0.1);
    be.draw_path(&mut s, &full, Affine::IDENTITY, &fill(Color::WHITE))
        .unwrap();
    assert_eq!(px(&s, 1, 4)[3], 255);
    assert_eq!(px(&s, 4, 4)[3], 0);
    assert_eq!(px(&s, 7, 4)[3], 255);
}

#[test]
fn stroke_extents_grow_by_half_width() {
    let be = CpuBackend::default();
    let mut path = BezPath::new();
    path.move_to(Point::new(0.0, 0.0));
    path.line_to(Point::new(10.0, 0.0));
    let paint = PathPaint::Stroke {
        color: Color::BLACK,
        stroke: kurbo::Stroke::new(4.0),
    };
    let r = be.path_extents(&path, &paint).unwrap();
    assert!((r.y0 + 2.0).abs() < 1e-6 && (r.y1 - 2.0).abs() < 1e-6);
    assert!(be.path_extents(&BezPath::new(), &paint).is_none());
}

#[test]
fn composite_at_offset_and_alpha() {
    let mut be = CpuBackend::default();
    let mut dst = CpuSurface::new(4, 4).unwrap();
    let mut src = be.create_surface(2, 2).unwrap();
    src.clear([255, 255, 255, 255]);
    be.composite(&mut dst, &src, Vec2::new(2.0, 2.0), CompOp::SrcOver, 255)
        .unwrap();
    assert_eq!(px(&dst, 3, 3)[3], 255);
    assert_eq!(px(&dst, 1, 1)[3], 0);
    be.release_surface(src);
    assert_eq!(be.pool_stats().live_bytes, 0);
}

#[test]
fn pixels_round_trip_through_a_surface() {
    let mut be = CpuBackend::default();
    let mut buf = PixelBuffer::new(2, 1);
    buf.data.copy_from_slice(&[1, 2, 3, 4, 5, 6, 7, 8]);
    let s = be.surface_from_pixels(&buf).unwrap();
    let mut out = be.create_pixel_buffer(2, 1);
    be.read_pixels(&s, &mut out);
    assert_eq!(out, buf);
    be.release_surface(s);
}
