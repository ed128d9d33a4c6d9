/// Fixed-point luminance weights over a 2^32 normalizer.
///
/// `0xFFFF_FFFF / (255 * 255) * {0.2126, 0.7152, 0.0722}`, rounded. With 8-bit channels and an
/// 8-bit opacity the weighted sum never exceeds `u32::MAX`, and its top byte is the mask alpha.
pub(crate) const LUMA_R: u32 = 14042;
pub(crate) const LUMA_G: u32 = 47240;
pub(crate) const LUMA_B: u32 = 4769;

pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Alpha for one premultiplied pixel of a luminance mask.
///
/// `round(luminance(r, g, b) * opacity)` computed as `(r*R + g*G + b*B) * opacity >> 24`.
pub(crate) fn luminance_alpha(r: u8, g: u8, b: u8, opacity: u8) -> u8 {
    let sum = u32::from(r) * LUMA_R + u32::from(g) * LUMA_G + u32::from(b) * LUMA_B;
    ((sum * u32::from(opacity)) >> 24) as u8
}

/// Convert a unit-interval opacity to the 0..=255 scale.
pub(crate) fn opacity_to_u8(opacity: f32) -> u8 {
    (opacity.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/math.rs"]
mod tests;
