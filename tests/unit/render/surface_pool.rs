use super::*;

#[test]
fn pool_honors_bucket_cap() {
    let mut p = SurfacePool::new(SurfacePoolOpts {
        max_pool_bytes: 1 << 30,
        max_surfaces_per_bucket: 1,
        max_live_bytes: None,
    });

    let a = p.borrow(8, 8).unwrap();
    let b = p.borrow(8, 8).unwrap();
    p.release(a);
    p.release(b);

    let st = p.stats();
    assert_eq!(st.retained_surfaces, 1);
    assert_eq!(st.live_bytes, 0);
}

#[test]
fn pool_honors_global_byte_cap() {
    let bytes_8x8 = 8 * 8 * 4;
    let mut p = SurfacePool::new(SurfacePoolOpts {
        max_pool_bytes: bytes_8x8,
        max_surfaces_per_bucket: 8,
        max_live_bytes: None,
    });

    let a = p.borrow(8, 8).unwrap();
    let b = p.borrow(8, 8).unwrap();
    p.release(a);
    p.release(b);

    let st = p.stats();
    assert_eq!(st.retained_bytes, bytes_8x8);
    assert_eq!(st.retained_surfaces, 1);
    assert!(st.dropped_on_release >= 1);
}

#[test]
fn live_budget_refuses_then_recovers() {
    let mut p = SurfacePool::new(SurfacePoolOpts {
        max_live_bytes: Some(8 * 8 * 4),
        ..SurfacePoolOpts::default()
    });

    let a = p.borrow(8, 8).unwrap();
    let err = p.borrow(8, 8).unwrap_err();
    assert!(err.to_string().contains("allocation error"));
    assert_eq!(p.stats().refused, 1);

    p.release(a);
    assert!(p.borrow(8, 8).is_ok());
}

#[test]
fn reused_surfaces_come_back_cleared() {
    let mut p = SurfacePool::new(SurfacePoolOpts::default());
    let mut a = p.borrow(2, 2).unwrap();
    a.data_as_u8_slice_mut().fill(7);
    p.release(a);
    let b = p.borrow(2, 2).unwrap();
    assert!(b.data_as_u8_slice().iter().all(|&v| v == 0));
    assert_eq!(p.stats().alloc_surfaces, 1);
}

#[test]
fn oversized_or_empty_surfaces_are_refused() {
    let mut p = SurfacePool::new(SurfacePoolOpts::default());
    assert!(p.borrow(70_000, 1).is_err());
    assert!(p.borrow(0, 4).is_err());
}
