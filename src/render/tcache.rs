// RetroVideo
// copyright zipxing@hotmail.com 2022~2024

//! Texture cache: amortizes pixel conversion and upload across frames.
//!
//! Entries are keyed by (surface id, palette version, palette offset),
//! so a lookup can never cross palette versions; stale versions simply
//! age out. The cache is generic over the backend-native handle: the
//! hardware backend stores SDL textures, the software backend stores
//! converted rgba images, and the bookkeeping itself stays testable
//! without a GPU.
//!
//! Handles may need explicit teardown (SDL textures are not
//! lifetime-bound under unsafe_textures), so eviction hands the evicted
//! value to a caller-supplied drop function.

use crate::render::surface::SurfaceId;
use std::collections::hash_map::Entry as MapEntry;
use std::collections::HashMap;

/// ticks an unused entry survives before eviction
pub const CACHE_LIFETIME: u64 = 25;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub surface: SurfaceId,
    pub version: u64,
    pub pal_offset: u8,
}

struct Entry<T> {
    val: T,
    last_used: u64,
}

pub struct TextureCache<T> {
    entries: HashMap<CacheKey, Entry<T>>,
    now: u64,
    hits: u64,
    misses: u64,
}

impl<T> Default for TextureCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> TextureCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            now: 0,
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the cached handle for `key`, building and inserting it on
    /// a miss. At most one live entry exists per key.
    pub fn get_or_create<E>(
        &mut self,
        key: CacheKey,
        build: impl FnOnce() -> Result<T, E>,
    ) -> Result<&mut T, E> {
        let now = self.now;
        match self.entries.entry(key) {
            MapEntry::Occupied(e) => {
                self.hits += 1;
                let entry = e.into_mut();
                entry.last_used = now;
                Ok(&mut entry.val)
            }
            MapEntry::Vacant(v) => {
                self.misses += 1;
                let val = build()?;
                Ok(&mut v.insert(Entry { val, last_used: now }).val)
            }
        }
    }

    /// Lookup without building; refreshes the entry's age on a hit.
    pub fn get(&mut self, key: &CacheKey) -> Option<&mut T> {
        let now = self.now;
        self.entries.get_mut(key).map(|e| {
            e.last_used = now;
            &mut e.val
        })
    }

    /// Advances the cache clock and evicts entries that have not been
    /// used for CACHE_LIFETIME ticks. Called once per game tick, not
    /// once per draw call.
    pub fn tick(&mut self, mut drop_fn: impl FnMut(T)) {
        self.now += 1;
        let now = self.now;
        let dead: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, e)| now - e.last_used > CACHE_LIFETIME)
            .map(|(k, _)| *k)
            .collect();
        for key in dead {
            if let Some(e) = self.entries.remove(&key) {
                drop_fn(e.val);
            }
        }
    }

    /// Drops every entry. Required whenever the backend or scale factor
    /// changes, since all backend-native handles become invalid.
    pub fn clear(&mut self, mut drop_fn: impl FnMut(T)) {
        for (_, e) in self.entries.drain() {
            drop_fn(e.val);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::surface::Surface;

    fn key_for(sur: &Surface, version: u64) -> CacheKey {
        CacheKey {
            surface: sur.id(),
            version,
            pal_offset: 0,
        }
    }

    #[test]
    fn second_lookup_is_a_hit() {
        let sur = Surface::new_indexed(2, 2);
        let mut cache: TextureCache<u32> = TextureCache::new();
        let mut uploads = 0;
        for _ in 0..2 {
            cache
                .get_or_create(key_for(&sur, 1), || {
                    uploads += 1;
                    Ok::<u32, ()>(uploads)
                })
                .unwrap();
        }
        assert_eq!(uploads, 1);
        assert_eq!((cache.hits(), cache.misses()), (1, 1));
    }

    #[test]
    fn version_change_forces_a_new_upload() {
        let sur = Surface::new_indexed(2, 2);
        let mut cache: TextureCache<u32> = TextureCache::new();
        let mut uploads = 0;
        let mut build = || {
            uploads += 1;
            Ok::<u32, ()>(0)
        };
        cache.get_or_create(key_for(&sur, 1), &mut build).unwrap();
        cache.get_or_create(key_for(&sur, 2), &mut build).unwrap();
        assert_eq!(uploads, 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn clear_forces_fresh_uploads() {
        let sur = Surface::new_indexed(2, 2);
        let mut cache: TextureCache<u32> = TextureCache::new();
        cache
            .get_or_create(key_for(&sur, 1), || Ok::<u32, ()>(7))
            .unwrap();
        let mut dropped = 0;
        cache.clear(|_| dropped += 1);
        assert_eq!(dropped, 1);
        assert!(cache.is_empty());

        let mut uploads = 0;
        cache
            .get_or_create(key_for(&sur, 1), || {
                uploads += 1;
                Ok::<u32, ()>(8)
            })
            .unwrap();
        assert_eq!(uploads, 1);
    }

    #[test]
    fn unused_entries_age_out() {
        let sur = Surface::new_indexed(2, 2);
        let hot = Surface::new_indexed(2, 2);
        let mut cache: TextureCache<u32> = TextureCache::new();
        cache
            .get_or_create(key_for(&sur, 1), || Ok::<u32, ()>(1))
            .unwrap();
        cache
            .get_or_create(key_for(&hot, 1), || Ok::<u32, ()>(2))
            .unwrap();

        let mut dropped = vec![];
        for _ in 0..=CACHE_LIFETIME {
            // keep one entry hot, let the other starve
            cache.get(&key_for(&hot, 1));
            cache.tick(|v| dropped.push(v));
        }
        assert_eq!(dropped, vec![1]);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn build_failure_leaves_no_entry() {
        let sur = Surface::new_indexed(2, 2);
        let mut cache: TextureCache<u32> = TextureCache::new();
        let r = cache.get_or_create(key_for(&sur, 1), || Err::<u32, &str>("oom"));
        assert!(r.is_err());
        assert!(cache.is_empty());
    }
}
