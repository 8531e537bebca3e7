// RetroVideo
// copyright zipxing@hotmail.com 2022~2024

//! Base and active 256-color palettes.
//!
//! The base palette is the authoritative one set by content loaders.
//! The active palette is what the backends render with; it is reset to
//! the base palette at the start of every frame and then selectively
//! overwritten by range copies for cycling/tint effects.
//!
//! The active palette carries a monotonically increasing version that
//! uniquely identifies its content. Every mutating call bumps it, which
//! is the only coherency primitive tying palette changes to texture
//! cache invalidation.

use serde::{Deserialize, Serialize};

pub const PALETTE_SIZE: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 0xFF,
        g: 0xFF,
        b: 0xFF,
    };

    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// An ordered sequence of exactly 256 rgb triples, no alpha.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: [Rgb; PALETTE_SIZE],
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: [Rgb::default(); PALETTE_SIZE],
        }
    }
}

impl Palette {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_colors(colors: [Rgb; PALETTE_SIZE]) -> Self {
        Self { colors }
    }

    pub fn color(&self, index: u8) -> Rgb {
        self.colors[index as usize]
    }

    pub fn set_color(&mut self, index: u8, color: Rgb) {
        self.colors[index as usize] = color;
    }

    pub fn colors(&self) -> &[Rgb; PALETTE_SIZE] {
        &self.colors
    }

    pub fn colors_mut(&mut self) -> &mut [Rgb; PALETTE_SIZE] {
        &mut self.colors
    }
}

/// The palette the backends render with, stamped with a content version.
#[derive(Debug, Clone)]
pub struct ActivePalette {
    data: [Rgb; PALETTE_SIZE],
    version: u64,
}

impl ActivePalette {
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn color(&self, index: u8) -> Rgb {
        self.data[index as usize]
    }

    pub fn data(&self) -> &[Rgb; PALETTE_SIZE] {
        &self.data
    }

    /// Raw write access for legacy palette effects. Writers must call
    /// force_refresh (or any other mutating op) afterwards so the
    /// version catches up with the content.
    pub fn data_mut(&mut self) -> &mut [Rgb; PALETTE_SIZE] {
        &mut self.data
    }
}

/// Owns the base/active palette pair and all mutating operations.
pub struct PaletteStore {
    base: Palette,
    active: ActivePalette,
}

impl Default for PaletteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl PaletteStore {
    pub fn new() -> Self {
        Self {
            base: Palette::new(),
            active: ActivePalette {
                data: [Rgb::default(); PALETTE_SIZE],
                version: 1,
            },
        }
    }

    /// Replaces the base palette wholesale and copies it into the active one.
    pub fn set_base(&mut self, src: &Palette) {
        self.base = src.clone();
        self.active.data = self.base.colors;
        self.bump();
    }

    /// Overwrites `count` triples of the active palette starting at
    /// `dst_start` with triples from `src` starting at `src_start`.
    ///
    /// Precondition: `src_start + count <= 256` and `dst_start + count <= 256`.
    /// Violations are a programming error, not a runtime condition.
    pub fn copy_range(&mut self, src: &Palette, src_start: usize, dst_start: usize, count: usize) {
        debug_assert!(src_start + count <= PALETTE_SIZE);
        debug_assert!(dst_start + count <= PALETTE_SIZE);
        self.active.data[dst_start..dst_start + count]
            .copy_from_slice(&src.colors[src_start..src_start + count]);
        self.bump();
    }

    /// Resynchronizes active with base after content mutated base directly.
    pub fn force_refresh(&mut self) {
        self.active.data = self.base.colors;
        self.bump();
    }

    /// Per-frame reset of the active palette back to base. Bumps the
    /// version only when the content actually changes, so an unchanged
    /// palette keeps cached textures valid across frames.
    pub fn reset_active(&mut self) {
        if self.active.data != self.base.colors {
            self.active.data = self.base.colors;
            self.bump();
        }
    }

    pub fn active_version(&self) -> u64 {
        self.active.version
    }

    pub fn base(&self) -> &Palette {
        &self.base
    }

    pub fn base_mut(&mut self) -> &mut Palette {
        &mut self.base
    }

    pub fn active(&self) -> &ActivePalette {
        &self.active
    }

    pub fn active_mut(&mut self) -> &mut ActivePalette {
        &mut self.active
    }

    fn bump(&mut self) {
        self.active.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> Palette {
        let mut p = Palette::new();
        for i in 0..PALETTE_SIZE {
            p.set_color(i as u8, Rgb::new(i as u8, 0, 255 - i as u8));
        }
        p
    }

    #[test]
    fn version_counts_every_mutating_call() {
        let mut store = PaletteStore::new();
        let v0 = store.active_version();
        store.set_base(&gradient());
        store.copy_range(&Palette::new(), 0, 16, 32);
        store.force_refresh();
        assert_eq!(store.active_version(), v0 + 3);
    }

    #[test]
    fn copy_range_then_refresh_restores_base() {
        let mut store = PaletteStore::new();
        store.set_base(&gradient());
        let v0 = store.active_version();

        store.copy_range(&Palette::new(), 0, 0, PALETTE_SIZE);
        assert_ne!(store.active().data(), store.base().colors());
        store.force_refresh();
        assert_eq!(store.active().data(), store.base().colors());
        // exactly one bump per call
        assert_eq!(store.active_version(), v0 + 2);
    }

    #[test]
    fn reset_active_is_a_noop_when_clean() {
        let mut store = PaletteStore::new();
        store.set_base(&gradient());
        let v0 = store.active_version();
        store.reset_active();
        assert_eq!(store.active_version(), v0);
    }

    #[test]
    fn reset_active_bumps_after_range_copy() {
        let mut store = PaletteStore::new();
        store.set_base(&gradient());
        store.copy_range(&Palette::new(), 8, 8, 8);
        let v0 = store.active_version();
        store.reset_active();
        assert_eq!(store.active_version(), v0 + 1);
        assert_eq!(store.active().data(), store.base().colors());
    }

    #[test]
    fn direct_active_writes_visible_through_ref() {
        let mut store = PaletteStore::new();
        store.active_mut().data_mut()[5] = Rgb::new(1, 2, 3);
        assert_eq!(store.active().color(5), Rgb::new(1, 2, 3));
    }
}
