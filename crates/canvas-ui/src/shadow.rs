//! Cached 9-patch shadow textures.

use std::collections::HashMap;

use crate::backend::{RenderBackend, TextureDescriptor, TextureFormat};
use crate::{Color, TextureId};

/// Cache key: quantized blur and spread plus the packed RGBA color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ShadowKey {
    /// Blur radius in quarter pixels
    pub blur: u32,
    /// Spread in quarter pixels
    pub spread: u32,
    pub rgba: u32,
}

impl ShadowKey {
    pub fn new(blur: f32, spread: f32, color: Color) -> Self {
        let q = |v: f32| (v.max(0.0) * 4.0).round() as u32;
        Self {
            blur: q(blur),
            spread: q(spread),
            rgba: color.pack_rgba(),
        }
    }

    fn blur_px(&self) -> f32 {
        self.blur as f32 / 4.0
    }

    fn spread_px(&self) -> f32 {
        self.spread as f32 / 4.0
    }
}

/// A 9-patch texture: corners are `border` texels square, the center is 1 texel
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowPatch {
    pub texture: TextureId,
    /// Border width in texels (also the on-screen corner size)
    pub border: u32,
    /// Texture edge length in texels (`2 * border + 1`)
    pub size: u32,
    /// Falloff width in pixels
    pub falloff: f32,
}

#[derive(Debug)]
struct CacheEntry {
    patch: ShadowPatch,
    last_used: u64,
}

#[derive(Debug)]
pub struct ShadowCache {
    entries: HashMap<ShadowKey, CacheEntry>,
    capacity: usize,
    hits: u64,
    misses: u64,
}

impl ShadowCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &ShadowKey) -> bool {
        self.entries.contains_key(key)
    }

    /// (hits, misses) since creation
    pub fn hit_stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    /// Return the patch for `key`, rasterizing it on a miss.
    ///
    /// Returns `None` when texture creation fails; the failure is logged and
    /// nothing is cached, so a later frame retries.
    pub fn get_or_create(
        &mut self,
        backend: &mut dyn RenderBackend,
        key: ShadowKey,
        frame: u64,
    ) -> Option<ShadowPatch> {
        if let Some(entry) = self.entries.get_mut(&key) {
            entry.last_used = frame;
            self.hits += 1;
            return Some(entry.patch);
        }
        self.misses += 1;

        if self.entries.len() >= self.capacity && !self.evict_lru(backend, frame) {
            // Everything cached is in use this frame; grow until `trim`
            log::trace!("shadow cache over capacity ({} entries) in frame {frame}", self.entries.len());
        }

        let (pixels, border, falloff) = rasterize(&key);
        let size = 2 * border + 1;
        let texture = match backend.create_texture(&TextureDescriptor {
            label: "shadow_9patch",
            width: size,
            height: size,
            format: TextureFormat::Rgba8,
            data: &pixels,
        }) {
            Ok(texture) => texture,
            Err(err) => {
                log::warn!("shadow texture creation failed: {err}");
                return None;
            }
        };

        let patch = ShadowPatch {
            texture,
            border,
            size,
            falloff,
        };
        self.entries.insert(
            key,
            CacheEntry {
                patch,
                last_used: frame,
            },
        );
        Some(patch)
    }

    /// Destroy the least recently used entry not used after `before`.
    /// Returns false when every entry is newer.
    fn evict_lru(&mut self, backend: &mut dyn RenderBackend, before: u64) -> bool {
        let Some(oldest) = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.last_used < before)
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| *key)
        else {
            return false;
        };
        let Some(entry) = self.entries.remove(&oldest) else {
            return false;
        };
        log::debug!("evicting shadow texture {:?}", entry.patch.texture);
        backend.destroy_texture(entry.patch.texture);
        true
    }

    /// Evict down to capacity. Call once the frame's draws are submitted.
    pub fn trim(&mut self, backend: &mut dyn RenderBackend) {
        while self.entries.len() > self.capacity && self.evict_lru(backend, u64::MAX) {}
    }

    /// Destroy every cached texture
    pub fn clear(&mut self, backend: &mut dyn RenderBackend) {
        for (_, entry) in self.entries.drain() {
            backend.destroy_texture(entry.patch.texture);
        }
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Rasterize the 9-patch as straight-alpha RGBA8.
///
/// The fully opaque core is a square of `2 * spread + 1` texels; alpha falls
/// off to zero over `falloff` texels around it.
fn rasterize(key: &ShadowKey) -> (Vec<u8>, u32, f32) {
    let falloff = (key.blur_px() * 2.0).ceil().max(1.0);
    let spread = key.spread_px().ceil();
    let border = (falloff + spread) as u32;
    let size = 2 * border + 1;

    let inner_min = falloff;
    let inner_max = falloff + 2.0 * spread + 1.0;
    let rgba = key.rgba.to_be_bytes();

    let mut pixels = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let px = x as f32 + 0.5;
            let py = y as f32 + 0.5;
            let dx = (inner_min - px).max(px - inner_max).max(0.0);
            let dy = (inner_min - py).max(py - inner_max).max(0.0);
            let d = (dx * dx + dy * dy).sqrt();
            let coverage = 1.0 - smoothstep(0.0, falloff, d);
            let alpha = (rgba[3] as f32 * coverage).round() as u8;
            pixels.extend_from_slice(&[rgba[0], rgba[1], rgba[2], alpha]);
        }
    }

    (pixels, border, falloff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeadlessBackend;

    #[test]
    fn test_identical_requests_reuse_texture() {
        let mut backend = HeadlessBackend::new();
        let mut cache = ShadowCache::new(4);
        let key = ShadowKey::new(4.0, 2.0, Color::rgba(0.0, 0.0, 0.0, 0.5));

        let a = cache.get_or_create(&mut backend, key, 1).unwrap();
        let b = cache.get_or_create(&mut backend, key, 2).unwrap();
        assert_eq!(a.texture, b.texture);
        assert_eq!(backend.live_textures.len(), 1);
        assert_eq!(cache.hit_stats(), (1, 1));
    }

    #[test]
    fn test_lru_eviction_destroys_texture() {
        let mut backend = HeadlessBackend::new();
        let mut cache = ShadowCache::new(2);
        let k1 = ShadowKey::new(1.0, 0.0, Color::BLACK);
        let k2 = ShadowKey::new(2.0, 0.0, Color::BLACK);
        let k3 = ShadowKey::new(3.0, 0.0, Color::BLACK);

        let first = cache.get_or_create(&mut backend, k1, 1).unwrap();
        cache.get_or_create(&mut backend, k2, 2);
        // Touch k1 so k2 becomes the oldest
        cache.get_or_create(&mut backend, k1, 3);
        cache.get_or_create(&mut backend, k3, 4);

        assert!(cache.contains(&k1));
        assert!(!cache.contains(&k2));
        assert!(cache.contains(&k3));
        assert_eq!(backend.live_textures.len(), 2);
        assert!(backend.live_textures.contains(&first.texture));
    }

    #[test]
    fn test_entries_used_this_frame_are_not_evicted() {
        let mut backend = HeadlessBackend::new();
        let mut cache = ShadowCache::new(2);
        let keys: Vec<ShadowKey> = (1..=4)
            .map(|i| ShadowKey::new(i as f32, 0.0, Color::BLACK))
            .collect();

        let patches: Vec<ShadowPatch> = keys
            .iter()
            .map(|key| cache.get_or_create(&mut backend, *key, 7).unwrap())
            .collect();
        assert_eq!(cache.len(), 4);
        for patch in &patches {
            assert!(backend.live_textures.contains(&patch.texture));
        }

        cache.trim(&mut backend);
        assert_eq!(cache.len(), 2);
        assert_eq!(backend.live_textures.len(), 2);
    }

    #[test]
    fn test_failed_texture_is_not_cached() {
        let mut backend = HeadlessBackend::new().with_failing_textures();
        let mut cache = ShadowCache::new(2);
        let key = ShadowKey::new(4.0, 0.0, Color::BLACK);
        assert!(cache.get_or_create(&mut backend, key, 1).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_patch_center_is_opaque_and_corner_fades() {
        let key = ShadowKey::new(3.0, 1.0, Color::rgba(0.0, 0.0, 0.0, 1.0));
        let (pixels, border, _) = rasterize(&key);
        let size = 2 * border + 1;
        let alpha_at = |x: u32, y: u32| pixels[((y * size + x) * 4 + 3) as usize];
        assert_eq!(alpha_at(border, border), 255);
        assert_eq!(alpha_at(0, 0), 0);
    }
}
