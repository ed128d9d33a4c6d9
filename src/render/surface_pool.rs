use crate::foundation::error::{VellumError, VellumResult};
use std::collections::HashMap;

/// Pool configuration for offscreen surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SurfacePoolOpts {
    /// Maximum bytes retained across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of retained surfaces per (w,h) bucket.
    pub max_surfaces_per_bucket: usize,
    /// Upper bound on bytes held by surfaces that are borrowed at the same time.
    ///
    /// A borrow that would exceed it fails, which makes the affected layer fall back to drawing
    /// directly on its parent. `None` means unbounded.
    pub max_live_bytes: Option<usize>,
}

impl Default for SurfacePoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 256 * 1024 * 1024,
            max_surfaces_per_bucket: 8,
            max_live_bytes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct SurfaceKey {
    w: u16,
    h: u16,
}

impl SurfaceKey {
    fn byte_len(self) -> usize {
        (self.w as usize)
            .saturating_mul(self.h as usize)
            .saturating_mul(4)
    }
}

/// Allocation counters, mostly useful in tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SurfacePoolStats {
    /// Surfaces currently parked in the pool.
    pub retained_surfaces: usize,
    /// Bytes currently parked in the pool.
    pub retained_bytes: usize,
    /// Bytes currently borrowed.
    pub live_bytes: usize,
    /// Fresh allocations performed.
    pub alloc_surfaces: u64,
    /// Borrows refused by the live-byte budget.
    pub refused: u64,
    /// Releases that were dropped instead of retained.
    pub dropped_on_release: u64,
}

struct Bucket {
    surfaces: Vec<vello_cpu::Pixmap>,
}

/// Bounded pooled allocator for CPU pixmaps.
///
/// Keyed by `(width, height)`. Every offscreen layer of one render has the same size, so a
/// handful of buckets serves the whole render.
pub(crate) struct SurfacePool {
    opts: SurfacePoolOpts,
    stats: SurfacePoolStats,
    bucket_idx_by_key: HashMap<SurfaceKey, usize>,
    buckets: Vec<Bucket>,
}

impl SurfacePool {
    pub(crate) fn new(opts: SurfacePoolOpts) -> Self {
        Self {
            opts,
            stats: SurfacePoolStats::default(),
            bucket_idx_by_key: HashMap::new(),
            buckets: Vec::new(),
        }
    }

    pub(crate) fn stats(&self) -> SurfacePoolStats {
        self.stats.clone()
    }

    /// Borrow a transparent pixmap.
    pub(crate) fn borrow(&mut self, width: u32, height: u32) -> VellumResult<vello_cpu::Pixmap> {
        let key = key_for(width, height)?;
        let bytes = key.byte_len();
        if let Some(budget) = self.opts.max_live_bytes
            && self.stats.live_bytes.saturating_add(bytes) > budget
        {
            self.stats.refused = self.stats.refused.saturating_add(1);
            return Err(VellumError::allocation(format!(
                "surface {width}x{height} exceeds live budget of {budget} bytes"
            )));
        }
        self.stats.live_bytes = self.stats.live_bytes.saturating_add(bytes);

        if let Some(&bi) = self.bucket_idx_by_key.get(&key)
            && let Some(mut p) = self.buckets[bi].surfaces.pop()
        {
            self.stats.retained_surfaces = self.stats.retained_surfaces.saturating_sub(1);
            self.stats.retained_bytes = self.stats.retained_bytes.saturating_sub(bytes);
            p.data_as_u8_slice_mut().fill(0);
            return Ok(p);
        }

        self.stats.alloc_surfaces = self.stats.alloc_surfaces.saturating_add(1);
        Ok(vello_cpu::Pixmap::new(key.w, key.h))
    }

    pub(crate) fn release(&mut self, pixmap: vello_cpu::Pixmap) {
        let key = SurfaceKey {
            w: pixmap.width(),
            h: pixmap.height(),
        };
        let bytes = key.byte_len();
        self.stats.live_bytes = self.stats.live_bytes.saturating_sub(bytes);

        if self.opts.max_pool_bytes == 0 || self.opts.max_surfaces_per_bucket == 0 {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }
        if self.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let bi = match self.bucket_idx_by_key.get(&key).copied() {
            Some(i) => i,
            None => {
                let i = self.buckets.len();
                self.buckets.push(Bucket {
                    surfaces: Vec::new(),
                });
                self.bucket_idx_by_key.insert(key, i);
                i
            }
        };

        let bucket = &mut self.buckets[bi];
        if bucket.surfaces.len() >= self.opts.max_surfaces_per_bucket {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        bucket.surfaces.push(pixmap);
        self.stats.retained_surfaces = self.stats.retained_surfaces.saturating_add(1);
        self.stats.retained_bytes = self.stats.retained_bytes.saturating_add(bytes);
    }
}

fn key_for(width: u32, height: u32) -> VellumResult<SurfaceKey> {
    let w: u16 = width
        .try_into()
        .map_err(|_| VellumError::allocation(format!("surface width exceeds u16: {width}")))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| VellumError::allocation(format!("surface height exceeds u16: {height}")))?;
    if w == 0 || h == 0 {
        return Err(VellumError::allocation("surface has zero area"));
    }
    Ok(SurfaceKey { w, h })
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface_pool.rs"]
mod tests;
