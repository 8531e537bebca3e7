// RetroVideo
// copyright zipxing@hotmail.com 2022~2024

//! The RenderBackend trait and the draw primitive argument types.
//!
//! Both variants implement the same capability set: prepare, one
//! general-purpose sprite primitive (every higher-level sprite entry
//! point funnels into it), background, finish and reinit/close. The
//! compositor stores the active variant behind a trait object and can
//! swap it at runtime without changing the draw-call surface.

use crate::error::VideoError;
use crate::render::{
    palette::{ActivePalette, Rgb},
    scaler::ScalerPlugin,
    surface::Surface,
};
use crate::util::ARect;
use bitflags::bitflags;
use sdl2::render::{Canvas, Texture, TextureCreator};
use sdl2::video::{Window, WindowContext};

pub mod hw;
pub mod soft;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Hardware,
    SoftwareCompatible,
}

/// Sprite blend modes. Alpha is the normal over-blend, Additive is used
/// by glow/fire style effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Blend {
    #[default]
    Alpha,
    Additive,
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Flip: u8 {
        const HORIZONTAL = 0b0000_0001;
        const VERTICAL = 0b0000_0010;
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SpriteArgs {
    pub blend: Blend,
    /// shifts which palette entries an indexed surface maps through,
    /// recoloring without duplicating pixel data
    pub pal_offset: u8,
    pub flip: Flip,
    pub opacity: u8,
    pub tint: Rgb,
}

impl Default for SpriteArgs {
    fn default() -> Self {
        Self {
            blend: Blend::Alpha,
            pal_offset: 0,
            flip: Flip::empty(),
            opacity: 0xFF,
            tint: Rgb::WHITE,
        }
    }
}

/// Borrowed collaborators a backend needs for one call. The compositor
/// assembles this from its own fields, keeping ownership in one place.
pub struct RenderEnv<'a> {
    pub canvas: &'a mut Canvas<Window>,
    pub creator: &'a TextureCreator<WindowContext>,
    pub target: &'a mut Texture,
    pub palette: &'a ActivePalette,
    pub scaler: &'a ScalerPlugin,
    pub scale_factor: u32,
}

pub trait RenderBackend {
    fn kind(&self) -> BackendKind;

    /// Resets per-frame backend state; called once at the top of a frame.
    fn prepare(&mut self, env: &mut RenderEnv);

    /// Draws a full-frame background surface.
    fn background(&mut self, env: &mut RenderEnv, sur: &Surface);

    /// The single general-purpose draw primitive. `dst` is in native
    /// coordinates. A failed texture upload is logged and the draw is
    /// skipped for this frame.
    fn sprite(&mut self, env: &mut RenderEnv, sur: &Surface, dst: ARect, args: &SpriteArgs);

    /// Flushes backend batching into the render target.
    fn finish(&mut self, env: &mut RenderEnv) -> Result<(), VideoError>;

    /// Responds to a geometry/settings change; cached handles are
    /// already gone by the time this runs.
    fn reinit(&mut self, env: &mut RenderEnv);

    /// Releases every backend resource. Must run while the renderer the
    /// resources were created on is still alive.
    fn close(&mut self);

    /// Per game tick cache maintenance.
    fn tick(&mut self);

    /// Lifetime (hits, misses) of the texture cache, for diagnostics.
    fn cache_stats(&self) -> (u64, u64);
}
