use super::*;

const OPAQUE: Modulation<'static> = Modulation {
    alpha: 255,
    mask: None,
    clip: None,
};

fn repeat_px(px: [u8; 4], n: usize) -> Vec<u8> {
    let mut out = vec![0u8; n.saturating_mul(4)];
    for c in out.chunks_exact_mut(4) {
        c.copy_from_slice(&px);
    }
    out
}

fn same_size(w: u32, h: u32) -> Placement {
    Placement {
        dst_width: w,
        dst_height: h,
        src_width: w,
        src_height: h,
        offset: (0, 0),
    }
}

#[test]
fn src_over_opaque_replaces() {
    let mut dst = repeat_px([0, 0, 255, 255], 4);
    let src = repeat_px([255, 0, 0, 255], 4);
    composite_rgba8_premul(&mut dst, &src, same_size(2, 2), CompOp::SrcOver, OPAQUE)
        .unwrap();
    assert_eq!(dst, src);
}

#[test]
fn src_over_half_alpha_blends() {
    let mut dst = repeat_px([0, 0, 255, 255], 1);
    let src = repeat_px([255, 0, 0, 255], 1);
    composite_rgba8_premul(
        &mut dst,
        &src,
        same_size(1, 1),
        CompOp::SrcOver,
        Modulation {
            alpha: 128,
            mask: None,
            clip: None,
        },
    )
    .unwrap();
    assert_eq!(dst, vec![128, 0, 127, 255]);
}

#[test]
fn multiply_opaque_is_multiply() {
    let mut dst = vec![128u8, 128, 128, 255];
    let src = vec![128u8, 0, 0, 255];
    composite_rgba8_premul(&mut dst, &src, same_size(1, 1), CompOp::Multiply, OPAQUE)
        .unwrap();
    assert_eq!(dst, vec![64, 0, 0, 255]);
}

#[test]
fn dst_in_keeps_destination_where_source_is() {
    let mut dst = repeat_px([0, 255, 0, 255], 2);
    let src = vec![255, 0, 0, 255, 0, 0, 0, 0];
    composite_rgba8_premul(&mut dst, &src, same_size(2, 1), CompOp::DstIn, OPAQUE)
        .unwrap();
    assert_eq!(dst, vec![0, 255, 0, 255, 0, 0, 0, 0]);
}

#[test]
fn offset_places_source_and_clips_to_destination() {
    let mut dst = vec![0u8; 3 * 3 * 4];
    let src = repeat_px([255, 255, 255, 255], 4);
    let at = Placement {
        dst_width: 3,
        dst_height: 3,
        src_width: 2,
        src_height: 2,
        offset: (2, -1),
    };
    composite_rgba8_premul(&mut dst, &src, at, CompOp::SrcOver, OPAQUE).unwrap();
    let alpha: Vec<u8> = dst.chunks_exact(4).map(|p| p[3]).collect();
    assert_eq!(alpha, vec![0, 0, 255, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn mask_and_clip_modulate_independently() {
    let mut dst = vec![0u8; 2 * 4];
    let src = repeat_px([255, 255, 255, 255], 2);
    let mask = [255u8, 0];
    let clip = [128u8, 255];
    composite_rgba8_premul(
        &mut dst,
        &src,
        same_size(2, 1),
        CompOp::SrcOver,
        Modulation {
            alpha: 255,
            mask: Some(&mask),
            clip: Some(&clip),
        },
    )
    .unwrap();
    assert_eq!(dst, vec![128, 128, 128, 128, 0, 0, 0, 0]);
}

#[test]
fn clip_protects_destination_from_clear() {
    let mut dst = repeat_px([9, 9, 9, 9], 2);
    let src = vec![0u8; 8];
    let clip = [0u8, 255];
    composite_rgba8_premul(
        &mut dst,
        &src,
        same_size(2, 1),
        CompOp::Clear,
        Modulation {
            alpha: 255,
            mask: None,
            clip: Some(&clip),
        },
    )
    .unwrap();
    assert_eq!(dst, vec![9, 9, 9, 9, 0, 0, 0, 0]);
}

#[test]
fn length_mismatch_is_an_error() {
    let mut dst = vec![0u8; 4];
    let src = vec![0u8; 8];
    assert!(
        composite_rgba8_premul(&mut dst, &src, same_size(1, 1), CompOp::SrcOver, OPAQUE)
            .is_err()
    );
}

#[test]
fn luminance_mask_of_white_and_black() {
    let rgba = vec![255, 255, 255, 255, 0, 0, 0, 255];
    assert_eq!(luminance_mask(&rgba, 255), vec![255, 0]);
}

#[test]
fn premul_over_transparent_source_is_noop() {
    let mut dst = vec![10u8, 20, 30, 40];
    premul_over_in_place(&mut dst, &[0, 0, 0, 0]).unwrap();
    assert_eq!(dst, vec![10, 20, 30, 40]);
}
