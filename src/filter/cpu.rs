use super::{FilterContext, FilterInput, FilterPrimitive, FilterPrimitiveKind, FilterRenderer};
use crate::foundation::core::{Affine, PixelBuffer, Rect, Vec2};
use crate::foundation::error::{VellumError, VellumResult};
use crate::geometry::bbox::transform_rect;
use crate::geometry::length::{LengthDir, NormalizeParams};
use crate::render::composite::premul_over_in_place;
use crate::tree::document::FilterElement;
use crate::tree::style::CoordUnits;
use std::collections::HashMap;

/// Reference filter renderer over premultiplied RGBA8.
#[derive(Debug, Default)]
pub struct CpuFilterRenderer {
    _private: (),
}

impl CpuFilterRenderer {
    /// New renderer.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Integer pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct PixelRegion {
    x0: u32,
    y0: u32,
    x1: u32,
    y1: u32,
}

impl PixelRegion {
    fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }

    fn is_empty(&self) -> bool {
        self.x0 >= self.x1 || self.y0 >= self.y1
    }
}

/// Resolved primitive-space to pixel-space mapping for one filter invocation.
struct Units {
    transform: Affine,
    /// Multiplier applied to primitive lengths before `transform`.
    primitive_scale: Vec2,
}

impl FilterRenderer for CpuFilterRenderer {
    fn render(
        &mut self,
        filter: &FilterElement,
        source: &PixelBuffer,
        ctx: &FilterContext<'_>,
    ) -> VellumResult<PixelBuffer> {
        if !source.is_well_formed() {
            return Err(VellumError::render("filter source length does not match its size"));
        }
        let Some(user_region) = filter_region(filter, ctx) else {
            return Ok(PixelBuffer::new(source.width, source.height));
        };
        let region = pixel_region(ctx.bbox.transform, user_region, source.width, source.height);
        if region.is_empty() {
            return Ok(PixelBuffer::new(source.width, source.height));
        }

        let units = Units {
            transform: ctx.bbox.transform,
            primitive_scale: match filter.primitive_units {
                CoordUnits::UserSpaceOnUse => Vec2::new(1.0, 1.0),
                CoordUnits::ObjectBoundingBox => {
                    Vec2::new(ctx.bbox.rect.width(), ctx.bbox.rect.height())
                }
            },
        };

        let mut graphic = source.clone();
        clear_outside(&mut graphic, region);
        let mut results: HashMap<&str, PixelBuffer> = HashMap::new();
        let mut previous: Option<PixelBuffer> = None;

        for primitive in &filter.primitives {
            let mut out = apply_primitive(primitive, &graphic, previous.as_ref(), &results, &units, region)?;
            clear_outside(&mut out, region);
            if let Some(name) = primitive.result.as_deref() {
                results.insert(name, out.clone());
            }
            previous = Some(out);
        }

        Ok(previous.unwrap_or(graphic))
    }
}

fn filter_region(filter: &FilterElement, ctx: &FilterContext<'_>) -> Option<Rect> {
    match filter.units {
        CoordUnits::ObjectBoundingBox => {
            if ctx.bbox.is_empty() {
                return None;
            }
            let unit = NormalizeParams {
                viewport: (1.0, 1.0),
                ..ctx.normalize
            };
            let b = ctx.bbox.rect;
            let x = b.x0 + filter.x.normalize(LengthDir::Horizontal, &unit) * b.width();
            let y = b.y0 + filter.y.normalize(LengthDir::Vertical, &unit) * b.height();
            let w = filter.width.normalize(LengthDir::Horizontal, &unit) * b.width();
            let h = filter.height.normalize(LengthDir::Vertical, &unit) * b.height();
            (w > 0.0 && h > 0.0).then(|| Rect::new(x, y, x + w, y + h))
        }
        CoordUnits::UserSpaceOnUse => {
            let p = &ctx.normalize;
            let x = filter.x.normalize(LengthDir::Horizontal, p);
            let y = filter.y.normalize(LengthDir::Vertical, p);
            let w = filter.width.normalize(LengthDir::Horizontal, p);
            let h = filter.height.normalize(LengthDir::Vertical, p);
            (w > 0.0 && h > 0.0).then(|| Rect::new(x, y, x + w, y + h))
        }
    }
}

fn pixel_region(transform: Affine, user: Rect, width: u32, height: u32) -> PixelRegion {
    let r = transform_rect(transform, user);
    let clamp_x = |v: f64| v.clamp(0.0, f64::from(width)) as u32;
    let clamp_y = |v: f64| v.clamp(0.0, f64::from(height)) as u32;
    PixelRegion {
        x0: clamp_x(r.x0.floor()),
        y0: clamp_y(r.y0.floor()),
        x1: clamp_x(r.x1.ceil()),
        y1: clamp_y(r.y1.ceil()),
    }
}

fn clear_outside(buf: &mut PixelBuffer, region: PixelRegion) {
    let w = buf.width;
    for (i, px) in buf.data.chunks_exact_mut(4).enumerate() {
        let x = (i as u32) % w.max(1);
        let y = (i as u32) / w.max(1);
        if !region.contains(x, y) {
            px.fill(0);
        }
    }
}

fn resolve_input(
    input: &FilterInput,
    graphic: &PixelBuffer,
    previous: Option<&PixelBuffer>,
    results: &HashMap<&str, PixelBuffer>,
) -> PixelBuffer {
    match input {
        FilterInput::SourceGraphic => graphic.clone(),
        FilterInput::SourceAlpha => {
            let mut out = graphic.clone();
            for px in out.data.chunks_exact_mut(4) {
                px[0] = 0;
                px[1] = 0;
                px[2] = 0;
            }
            out
        }
        FilterInput::Previous => previous.unwrap_or(graphic).clone(),
        FilterInput::Named(name) => match results.get(name.as_str()) {
            Some(buf) => buf.clone(),
            None => {
                tracing::debug!(result = %name, "unknown filter result, using previous");
                previous.unwrap_or(graphic).clone()
            }
        },
    }
}

fn apply_primitive(
    primitive: &FilterPrimitive,
    graphic: &PixelBuffer,
    previous: Option<&PixelBuffer>,
    results: &HashMap<&str, PixelBuffer>,
    units: &Units,
    region: PixelRegion,
) -> VellumResult<PixelBuffer> {
    match &primitive.kind {
        FilterPrimitiveKind::GaussianBlur { std_dev } => {
            let src = resolve_input(&primitive.input, graphic, previous, results);
            let [a, b, c, d, _, _] = units.transform.as_coeffs();
            let sx = std_dev.0 * units.primitive_scale.x * a.hypot(b);
            let sy = std_dev.1 * units.primitive_scale.y * c.hypot(d);
            if !sx.is_finite() || !sy.is_finite() || sx < 0.0 || sy < 0.0 {
                return Err(VellumError::validation("blur std deviation must be finite and >= 0"));
            }
            let kx = gaussian_kernel_q16(sx as f32)?;
            let ky = gaussian_kernel_q16(sy as f32)?;
            Ok(blur_rgba8_premul_q16(&src, &kx, &ky))
        }
        FilterPrimitiveKind::Offset { dx, dy } => {
            let src = resolve_input(&primitive.input, graphic, previous, results);
            let v = Vec2::new(dx * units.primitive_scale.x, dy * units.primitive_scale.y);
            let [a, b, c, d, _, _] = units.transform.as_coeffs();
            let px = (a * v.x + c * v.y).round() as i64;
            let py = (b * v.x + d * v.y).round() as i64;
            Ok(offset_rgba8(&src, px, py))
        }
        FilterPrimitiveKind::ColorMatrix { matrix } => {
            let src = resolve_input(&primitive.input, graphic, previous, results);
            let mut out = PixelBuffer::new(src.width, src.height);
            color_matrix_rgba8_premul(&src.data, &mut out.data, *matrix);
            Ok(out)
        }
        FilterPrimitiveKind::Flood { color, opacity } => {
            let premul = color.with_opacity(*opacity).premultiplied().to_array();
            let mut out = PixelBuffer::new(graphic.width, graphic.height);
            for px in out.data.chunks_exact_mut(4) {
                px.copy_from_slice(&premul);
            }
            clear_outside(&mut out, region);
            Ok(out)
        }
        FilterPrimitiveKind::Merge { inputs } => {
            let mut out = PixelBuffer::new(graphic.width, graphic.height);
            for input in inputs {
                let layer = resolve_input(input, graphic, previous, results);
                premul_over_in_place(&mut out.data, &layer.data)?;
            }
            Ok(out)
        }
    }
}

/// Q16 kernel covering three standard deviations; a zero deviation is the identity.
fn gaussian_kernel_q16(sigma: f32) -> VellumResult<Vec<u32>> {
    if sigma <= 0.0 {
        return Ok(vec![1 << 16]);
    }
    if !sigma.is_finite() {
        return Err(VellumError::validation("blur sigma must be finite"));
    }
    let radius = (sigma * 3.0).ceil().max(1.0) as i32;

    let mut weights_f = Vec::<f64>::with_capacity((2 * radius + 1) as usize);
    let mut sum = 0.0f64;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    for i in -radius..=radius {
        let x = f64::from(i);
        let w = (-x * x / denom).exp();
        weights_f.push(w);
        sum += w;
    }
    if sum <= 0.0 {
        return Err(VellumError::render("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::<u32>::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        let q = ((wf / sum) * 65536.0).round() as i64;
        let q = q.clamp(0, 65536);
        weights.push(q as u32);
        acc += q;
    }
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let new_mid = (i64::from(weights[mid]) + delta).clamp(0, 65536);
        weights[mid] = new_mid as u32;
    }

    Ok(weights)
}

fn blur_rgba8_premul_q16(src: &PixelBuffer, kx: &[u32], ky: &[u32]) -> PixelBuffer {
    let mut tmp = PixelBuffer::new(src.width, src.height);
    let mut out = PixelBuffer::new(src.width, src.height);
    blur_pass_q16(&src.data, &mut tmp.data, src.width, src.height, kx, (1, 0));
    blur_pass_q16(&tmp.data, &mut out.data, src.width, src.height, ky, (0, 1));
    out
}

/// One separable pass; samples outside the buffer read as transparent.
fn blur_pass_q16(src: &[u8], dst: &mut [u8], width: u32, height: u32, k: &[u32], step: (i32, i32)) {
    if k.len() == 1 {
        dst.copy_from_slice(src);
        return;
    }
    let radius = (k.len() / 2) as i32;
    let (w, h) = (width as i32, height as i32);
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                let t = ki as i32 - radius;
                let sx = x + t * step.0;
                let sy = y + t * step.1;
                if sx < 0 || sy < 0 || sx >= w || sy >= h {
                    continue;
                }
                let idx = ((sy * w + sx) as usize) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out_idx = ((y * w + x) as usize) * 4;
            for c in 0..4 {
                dst[out_idx + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    let v = (acc + 32768) >> 16;
    (v.min(255)) as u8
}

fn offset_rgba8(src: &PixelBuffer, dx: i64, dy: i64) -> PixelBuffer {
    let mut out = PixelBuffer::new(src.width, src.height);
    let (w, h) = (i64::from(src.width), i64::from(src.height));
    for y in 0..h {
        let sy = y - dy;
        if sy < 0 || sy >= h {
            continue;
        }
        for x in 0..w {
            let sx = x - dx;
            if sx < 0 || sx >= w {
                continue;
            }
            let si = ((sy * w + sx) as usize) * 4;
            let di = ((y * w + x) as usize) * 4;
            out.data[di..di + 4].copy_from_slice(&src.data[si..si + 4]);
        }
    }
    out
}

fn color_matrix_rgba8_premul(src: &[u8], dst: &mut [u8], m: [f32; 20]) {
    debug_assert_eq!(src.len(), dst.len());
    for (s, d) in src.chunks_exact(4).zip(dst.chunks_exact_mut(4)) {
        let pr = f32::from(s[0]) / 255.0;
        let pg = f32::from(s[1]) / 255.0;
        let pb = f32::from(s[2]) / 255.0;
        let pa = f32::from(s[3]) / 255.0;

        let inv_a = if pa > 0.0 { 1.0 / pa } else { 0.0 };
        let r = pr * inv_a;
        let g = pg * inv_a;
        let b = pb * inv_a;
        let a = pa;

        let out_r = (m[0] * r + m[1] * g + m[2] * b + m[3] * a + m[4]).clamp(0.0, 1.0);
        let out_g = (m[5] * r + m[6] * g + m[7] * b + m[8] * a + m[9]).clamp(0.0, 1.0);
        let out_b = (m[10] * r + m[11] * g + m[12] * b + m[13] * a + m[14]).clamp(0.0, 1.0);
        let out_a = (m[15] * r + m[16] * g + m[17] * b + m[18] * a + m[19]).clamp(0.0, 1.0);

        d[0] = (out_r * out_a * 255.0).round().clamp(0.0, 255.0) as u8;
        d[1] = (out_g * out_a * 255.0).round().clamp(0.0, 255.0) as u8;
        d[2] = (out_b * out_a * 255.0).round().clamp(0.0, 255.0) as u8;
        d[3] = (out_a * 255.0).round().clamp(0.0, 255.0) as u8;
    }
}

#[cfg(test)]
#[path = "../../tests/unit/filter/cpu.rs"]
mod tests;
