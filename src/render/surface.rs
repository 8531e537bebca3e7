// RetroVideo
// copyright zipxing@hotmail.com 2022~2024

//! Caller-owned pixel buffers passed by reference into draw calls.
//!
//! A surface is either indexed (one byte per pixel mapping into the
//! 256-color active palette) or rgba. The compositor never takes
//! ownership; it only reads the pixels and keys cache entries by the
//! surface's stable id, allocated from a process-wide counter so reused
//! or freed buffers can never alias a cache key.

use crate::render::palette::ActivePalette;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_SURFACE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Indexed,
    Rgba,
}

#[derive(Debug, Clone)]
pub struct Surface {
    id: SurfaceId,
    pub kind: SurfaceKind,
    pub w: u32,
    pub h: u32,
    pub data: Vec<u8>,
    /// palette index treated as fully transparent in indexed surfaces
    pub transparent: Option<u8>,
}

impl Surface {
    fn alloc_id() -> SurfaceId {
        SurfaceId(NEXT_SURFACE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn new_indexed(w: u32, h: u32) -> Self {
        Self {
            id: Self::alloc_id(),
            kind: SurfaceKind::Indexed,
            w,
            h,
            data: vec![0; (w * h) as usize],
            transparent: Some(0),
        }
    }

    pub fn from_indexed(w: u32, h: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (w * h) as usize);
        Self {
            id: Self::alloc_id(),
            kind: SurfaceKind::Indexed,
            w,
            h,
            data,
            transparent: Some(0),
        }
    }

    pub fn new_rgba(w: u32, h: u32) -> Self {
        Self {
            id: Self::alloc_id(),
            kind: SurfaceKind::Rgba,
            w,
            h,
            data: vec![0; (w * h * 4) as usize],
            transparent: None,
        }
    }

    pub fn from_rgba(w: u32, h: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (w * h * 4) as usize);
        Self {
            id: Self::alloc_id(),
            kind: SurfaceKind::Rgba,
            w,
            h,
            data,
            transparent: None,
        }
    }

    pub fn id(&self) -> SurfaceId {
        self.id
    }

    /// Produces true-color pixels for upload. Indexed surfaces map each
    /// index through the active palette after a wrapping pal_offset
    /// shift; the transparent index yields (0,0,0,0). Rgba surfaces
    /// copy through unchanged.
    pub fn to_rgba(&self, palette: &ActivePalette, pal_offset: u8) -> Vec<u8> {
        match self.kind {
            SurfaceKind::Rgba => self.data.clone(),
            SurfaceKind::Indexed => {
                let mut out = Vec::with_capacity(self.data.len() * 4);
                for &idx in &self.data {
                    if self.transparent == Some(idx) {
                        out.extend_from_slice(&[0, 0, 0, 0]);
                    } else {
                        let c = palette.color(idx.wrapping_add(pal_offset));
                        out.extend_from_slice(&[c.r, c.g, c.b, 255]);
                    }
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::palette::{Palette, PaletteStore, Rgb};

    fn store_with_gradient() -> PaletteStore {
        let mut p = Palette::new();
        for i in 0..=255u8 {
            p.set_color(i, Rgb::new(i, i, i));
        }
        let mut store = PaletteStore::new();
        store.set_base(&p);
        store
    }

    #[test]
    fn surface_ids_are_unique() {
        let a = Surface::new_indexed(4, 4);
        let b = Surface::new_indexed(4, 4);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn indexed_maps_through_palette() {
        let store = store_with_gradient();
        let sur = Surface::from_indexed(2, 1, vec![10, 200]);
        let rgba = sur.to_rgba(store.active(), 0);
        assert_eq!(rgba, vec![10, 10, 10, 255, 200, 200, 200, 255]);
    }

    #[test]
    fn pal_offset_shifts_indices() {
        let store = store_with_gradient();
        let sur = Surface::from_indexed(1, 1, vec![10]);
        let rgba = sur.to_rgba(store.active(), 5);
        assert_eq!(rgba, vec![15, 15, 15, 255]);
    }

    #[test]
    fn transparent_index_yields_zero_alpha() {
        let store = store_with_gradient();
        let sur = Surface::from_indexed(1, 1, vec![0]);
        assert_eq!(sur.to_rgba(store.active(), 0), vec![0, 0, 0, 0]);
    }

    #[test]
    fn rgba_passes_through() {
        let store = store_with_gradient();
        let sur = Surface::from_rgba(1, 1, vec![1, 2, 3, 4]);
        assert_eq!(sur.to_rgba(store.active(), 9), vec![1, 2, 3, 4]);
    }
}
