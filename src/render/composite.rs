//! Premultiplied RGBA8 compositing kernels shared by the CPU backend and the filter renderer.

use crate::foundation::error::{VellumError, VellumResult};
use crate::foundation::math::{luminance_alpha, mul_div255_u8};
use crate::tree::style::CompOp;

/// Placement of a source buffer over a destination buffer.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Placement {
    pub(crate) dst_width: u32,
    pub(crate) dst_height: u32,
    pub(crate) src_width: u32,
    pub(crate) src_height: u32,
    /// Destination pixel that source pixel `(0, 0)` lands on.
    pub(crate) offset: (i32, i32),
}

/// Per-call modulation of a composite.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Modulation<'a> {
    /// Constant alpha applied to every source pixel.
    pub(crate) alpha: u8,
    /// Per-source-pixel alpha mask.
    pub(crate) mask: Option<&'a [u8]>,
    /// Per-destination-pixel clip coverage; the result is lerped toward it.
    pub(crate) clip: Option<&'a [u8]>,
}

/// Composite `src` onto `dst` with `op`, honoring placement, constant alpha, mask and clip.
pub(crate) fn composite_rgba8_premul(
    dst: &mut [u8],
    src: &[u8],
    at: Placement,
    op: CompOp,
    modulation: Modulation<'_>,
) -> VellumResult<()> {
    let dst_px = (at.dst_width as usize) * (at.dst_height as usize);
    let src_px = (at.src_width as usize) * (at.src_height as usize);
    if dst.len() != dst_px * 4 || src.len() != src_px * 4 {
        return Err(VellumError::render(
            "composite_rgba8_premul expects rgba8 buffers matching their dimensions",
        ));
    }
    if modulation.mask.is_some_and(|m| m.len() != src_px)
        || modulation.clip.is_some_and(|c| c.len() != dst_px)
    {
        return Err(VellumError::render(
            "composite_rgba8_premul mask/clip length mismatch",
        ));
    }

    // Operator dispatch happens once per call; each branch monomorphizes its own kernel.
    match op {
        CompOp::Clear => composite_with(dst, src, at, modulation, |_, _| [0, 0, 0, 0]),
        CompOp::Src => composite_with(dst, src, at, modulation, |_, s| s),
        CompOp::Dst => composite_with(dst, src, at, modulation, |d, _| d),
        CompOp::SrcOver => composite_with(dst, src, at, modulation, |d, s| {
            porter_duff(d, s, 255, 255 - s[3])
        }),
        CompOp::DstOver => composite_with(dst, src, at, modulation, |d, s| {
            porter_duff(d, s, 255 - d[3], 255)
        }),
        CompOp::SrcIn => composite_with(dst, src, at, modulation, |d, s| porter_duff(d, s, d[3], 0)),
        CompOp::DstIn => composite_with(dst, src, at, modulation, |d, s| porter_duff(d, s, 0, s[3])),
        CompOp::SrcOut => composite_with(dst, src, at, modulation, |d, s| {
            porter_duff(d, s, 255 - d[3], 0)
        }),
        CompOp::DstOut => composite_with(dst, src, at, modulation, |d, s| {
            porter_duff(d, s, 0, 255 - s[3])
        }),
        CompOp::SrcAtop => composite_with(dst, src, at, modulation, |d, s| {
            porter_duff(d, s, d[3], 255 - s[3])
        }),
        CompOp::DstAtop => composite_with(dst, src, at, modulation, |d, s| {
            porter_duff(d, s, 255 - d[3], s[3])
        }),
        CompOp::Xor => composite_with(dst, src, at, modulation, |d, s| {
            porter_duff(d, s, 255 - d[3], 255 - s[3])
        }),
        CompOp::Plus => composite_with(dst, src, at, modulation, |d, s| {
            [
                d[0].saturating_add(s[0]),
                d[1].saturating_add(s[1]),
                d[2].saturating_add(s[2]),
                d[3].saturating_add(s[3]),
            ]
        }),
        CompOp::Multiply => composite_with(dst, src, at, modulation, |d, s| {
            blend_px(d, s, |s, d| s * d)
        }),
        CompOp::Screen => composite_with(dst, src, at, modulation, |d, s| {
            blend_px(d, s, |s, d| s + d - s * d)
        }),
        CompOp::Overlay => composite_with(dst, src, at, modulation, |d, s| {
            blend_px(d, s, |s, d| {
                if d <= 0.5 {
                    2.0 * s * d
                } else {
                    1.0 - 2.0 * (1.0 - s) * (1.0 - d)
                }
            })
        }),
        CompOp::Darken => composite_with(dst, src, at, modulation, |d, s| {
            blend_px(d, s, |s, d| s.min(d))
        }),
        CompOp::Lighten => composite_with(dst, src, at, modulation, |d, s| {
            blend_px(d, s, |s, d| s.max(d))
        }),
        CompOp::ColorDodge => composite_with(dst, src, at, modulation, |d, s| {
            blend_px(d, s, |s, d| {
                if s >= 1.0 {
                    1.0
                } else {
                    (d / (1.0 - s)).min(1.0)
                }
            })
        }),
        CompOp::ColorBurn => composite_with(dst, src, at, modulation, |d, s| {
            blend_px(d, s, |s, d| {
                if s <= 0.0 {
                    0.0
                } else {
                    1.0 - ((1.0 - d) / s).min(1.0)
                }
            })
        }),
        CompOp::HardLight => composite_with(dst, src, at, modulation, |d, s| {
            blend_px(d, s, |s, d| {
                if s <= 0.5 {
                    2.0 * s * d
                } else {
                    1.0 - 2.0 * (1.0 - s) * (1.0 - d)
                }
            })
        }),
        CompOp::SoftLight => composite_with(dst, src, at, modulation, |d, s| {
            blend_px(d, s, |s, d| {
                if s <= 0.5 {
                    d - (1.0 - 2.0 * s) * d * (1.0 - d)
                } else {
                    let g = if d <= 0.25 {
                        ((16.0 * d - 12.0) * d + 4.0) * d
                    } else {
                        d.sqrt()
                    };
                    d + (2.0 * s - 1.0) * (g - d)
                }
            })
        }),
        CompOp::Difference => composite_with(dst, src, at, modulation, |d, s| {
            blend_px(d, s, |s, d| (d - s).abs())
        }),
        CompOp::Exclusion => composite_with(dst, src, at, modulation, |d, s| {
            blend_px(d, s, |s, d| d + s - 2.0 * d * s)
        }),
    }
    Ok(())
}

#[inline(always)]
fn composite_with<K>(dst: &mut [u8], src: &[u8], at: Placement, modulation: Modulation<'_>, kernel: K)
where
    K: Fn([u8; 4], [u8; 4]) -> [u8; 4],
{
    let (ox, oy) = at.offset;
    let x_start = ox.max(0);
    let y_start = oy.max(0);
    let x_end = (i64::from(ox) + i64::from(at.src_width)).min(i64::from(at.dst_width));
    let y_end = (i64::from(oy) + i64::from(at.src_height)).min(i64::from(at.dst_height));
    if i64::from(x_start) >= x_end || i64::from(y_start) >= y_end {
        return;
    }

    for dy in y_start as usize..y_end as usize {
        let sy = (dy as i64 - i64::from(oy)) as usize;
        for dx in x_start as usize..x_end as usize {
            let sx = (dx as i64 - i64::from(ox)) as usize;
            let si = sy * at.src_width as usize + sx;
            let di = dy * at.dst_width as usize + dx;

            let mut factor = u16::from(modulation.alpha);
            if let Some(mask) = modulation.mask {
                factor = u16::from(mul_div255_u8(factor, u16::from(mask[si])));
            }
            let coverage = modulation.clip.map_or(255u8, |c| c[di]);
            if coverage == 0 {
                continue;
            }

            let s = &src[si * 4..si * 4 + 4];
            let s = [
                mul_div255_u8(u16::from(s[0]), factor),
                mul_div255_u8(u16::from(s[1]), factor),
                mul_div255_u8(u16::from(s[2]), factor),
                mul_div255_u8(u16::from(s[3]), factor),
            ];
            let d_slot = &mut dst[di * 4..di * 4 + 4];
            let d = [d_slot[0], d_slot[1], d_slot[2], d_slot[3]];
            let r = kernel(d, s);
            let out = if coverage == 255 {
                r
            } else {
                lerp_px(d, r, coverage)
            };
            d_slot.copy_from_slice(&out);
        }
    }
}

#[inline(always)]
fn porter_duff(d: [u8; 4], s: [u8; 4], fa: u8, fb: u8) -> [u8; 4] {
    let fa = u16::from(fa);
    let fb = u16::from(fb);
    let mut out = [0u8; 4];
    for c in 0..4 {
        out[c] = mul_div255_u8(u16::from(s[c]), fa).saturating_add(mul_div255_u8(u16::from(d[c]), fb));
    }
    out
}

#[inline(always)]
fn lerp_px(from: [u8; 4], to: [u8; 4], t: u8) -> [u8; 4] {
    let t = u16::from(t);
    let inv = 255 - t;
    let mut out = [0u8; 4];
    for c in 0..4 {
        out[c] = mul_div255_u8(u16::from(to[c]), t).saturating_add(mul_div255_u8(u16::from(from[c]), inv));
    }
    out
}

/// Source-over with a separable blend applied to unpremultiplied channels.
///
/// `out_a = sa + da * (1 - sa)`, `out_p = sp * (1 - da) + dp * (1 - sa) + B(sc, dc) * sa * da`.
#[inline(always)]
fn blend_px<F>(d: [u8; 4], s: [u8; 4], blend_fn: F) -> [u8; 4]
where
    F: Fn(f32, f32) -> f32,
{
    let sa = f32::from(s[3]) / 255.0;
    if sa <= 0.0 {
        return d;
    }
    let da = f32::from(d[3]) / 255.0;
    let out_a = (sa + da * (1.0 - sa)).clamp(0.0, 1.0);

    let mut out = [0u8; 4];
    for c in 0..3 {
        let sp = f32::from(s[c]) / 255.0;
        let dp = f32::from(d[c]) / 255.0;
        let sc = (sp / sa).clamp(0.0, 1.0);
        let dc = if da > 0.0 { (dp / da).clamp(0.0, 1.0) } else { 0.0 };
        let b = blend_fn(sc, dc).clamp(0.0, 1.0);
        let p = (sp * (1.0 - da) + dp * (1.0 - sa) + b * sa * da).clamp(0.0, 1.0);
        out[c] = (p * 255.0).round() as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    out
}

/// Premultiplied source-over of two equally sized buffers.
pub(crate) fn premul_over_in_place(dst: &mut [u8], src: &[u8]) -> VellumResult<()> {
    if dst.len() != src.len() || !dst.len().is_multiple_of(4) {
        return Err(VellumError::render(
            "premul_over_in_place expects equal-length rgba8 buffers",
        ));
    }
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let sa = u16::from(s[3]);
        if sa == 0 {
            continue;
        }
        let inv = 255u16 - sa;
        for c in 0..4 {
            d[c] = s[c].saturating_add(mul_div255_u8(u16::from(d[c]), inv));
        }
    }
    Ok(())
}

/// Alpha-only luminance mask from premultiplied RGBA8, scaled by `opacity`.
pub(crate) fn luminance_mask(rgba: &[u8], opacity: u8) -> Vec<u8> {
    rgba.chunks_exact(4)
        .map(|px| luminance_alpha(px[0], px[1], px[2], opacity))
        .collect()
}

/// Intersect two coverage masks in place.
pub(crate) fn intersect_coverage(dst: &mut [u8], src: &[u8]) {
    for (d, s) in dst.iter_mut().zip(src) {
        *d = mul_div255_u8(u16::from(*d), u16::from(*s));
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/composite.rs"]
mod tests;
