// RetroVideo
// copyright zipxing@hotmail.com 2022~2024

//! Hardware-accelerated render backend.
//!
//! Sprites are converted through the active palette, pre-scaled by the
//! loaded scaler and uploaded as SDL textures, cached per (surface,
//! palette version, pal_offset). Draw calls are recorded during the
//! frame and replayed into the render target at finish, inside
//! with_texture_canvas, with per-draw blend/alpha/color modulation.

use crate::error::VideoError;
use crate::render::{
    backend::{BackendKind, Blend, Flip, RenderBackend, RenderEnv, SpriteArgs},
    palette::Rgb,
    surface::Surface,
    tcache::{CacheKey, TextureCache},
};
use crate::util::ARect;
use log::{error, warn};
use sdl2::pixels::PixelFormatEnum;
use sdl2::rect::Rect;
use sdl2::render::{BlendMode, Texture};

struct DrawCmd {
    key: CacheKey,
    dst: ARect,
    blend: Blend,
    flip: Flip,
    opacity: u8,
    tint: Rgb,
}

pub struct HardwareBackend {
    cache: TextureCache<Texture>,
    cmds: Vec<DrawCmd>,
}

impl Default for HardwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareBackend {
    pub fn new() -> Self {
        Self {
            cache: TextureCache::new(),
            cmds: Vec::new(),
        }
    }

    /// Palette-applies, scales and uploads one surface.
    fn upload(env: &RenderEnv, sur: &Surface, pal_offset: u8) -> Result<Texture, VideoError> {
        let rgba = sur.to_rgba(env.palette, pal_offset);
        let scaled = env.scaler.scale(&rgba, sur.w, sur.h);
        let (w, h) = env.scaler.scaled_size(sur.w, sur.h);
        let mut tex = env
            .creator
            .create_texture_static(PixelFormatEnum::RGBA32, w, h)
            .map_err(|e| VideoError::BackendResourceExhausted(e.to_string()))?;
        tex.update(None, &scaled, (w * 4) as usize)
            .map_err(|e| VideoError::BackendResourceExhausted(e.to_string()))?;
        Ok(tex)
    }
}

impl RenderBackend for HardwareBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Hardware
    }

    fn prepare(&mut self, _env: &mut RenderEnv) {
        self.cmds.clear();
    }

    fn background(&mut self, env: &mut RenderEnv, sur: &Surface) {
        self.sprite(
            env,
            sur,
            ARect::new(0, 0, sur.w, sur.h),
            &SpriteArgs::default(),
        );
    }

    fn sprite(&mut self, env: &mut RenderEnv, sur: &Surface, dst: ARect, args: &SpriteArgs) {
        let key = CacheKey {
            surface: sur.id(),
            version: env.palette.version(),
            pal_offset: args.pal_offset,
        };
        match self
            .cache
            .get_or_create(key, || Self::upload(env, sur, args.pal_offset))
        {
            Ok(_) => self.cmds.push(DrawCmd {
                key,
                dst,
                blend: args.blend,
                flip: args.flip,
                opacity: args.opacity,
                tint: args.tint,
            }),
            Err(e) => {
                warn!("sprite upload failed, skipping draw: {}", e);
            }
        }
    }

    fn finish(&mut self, env: &mut RenderEnv) -> Result<(), VideoError> {
        let cache = &mut self.cache;
        let cmds = &mut self.cmds;
        let factor = env.scale_factor;
        env.canvas
            .with_texture_canvas(env.target, |tc| {
                for cmd in cmds.iter() {
                    // the entry exists: sprite() only records a command
                    // after a successful get_or_create
                    let tex = match cache.get(&cmd.key) {
                        Some(t) => t,
                        None => continue,
                    };
                    tex.set_blend_mode(match cmd.blend {
                        Blend::Alpha => BlendMode::Blend,
                        Blend::Additive => BlendMode::Add,
                    });
                    tex.set_alpha_mod(cmd.opacity);
                    tex.set_color_mod(cmd.tint.r, cmd.tint.g, cmd.tint.b);
                    let d = cmd.dst.scaled(factor);
                    if let Err(e) = tc.copy_ex(
                        tex,
                        None,
                        Rect::new(d.x, d.y, d.w.max(1), d.h.max(1)),
                        0.0,
                        None,
                        cmd.flip.contains(Flip::HORIZONTAL),
                        cmd.flip.contains(Flip::VERTICAL),
                    ) {
                        error!("sprite draw failed: {}", e);
                    }
                }
                cmds.clear();
            })
            .map_err(|e| VideoError::BackendResourceExhausted(format!("{:?}", e)))
    }

    fn reinit(&mut self, _env: &mut RenderEnv) {
        // resources were torn down by close() before the renderer change
        self.cmds.clear();
    }

    fn close(&mut self) {
        self.cmds.clear();
        self.cache.clear(|tex| unsafe { tex.destroy() });
    }

    fn tick(&mut self) {
        self.cache.tick(|tex| unsafe { tex.destroy() });
    }

    fn cache_stats(&self) -> (u64, u64) {
        (self.cache.hits(), self.cache.misses())
    }
}
