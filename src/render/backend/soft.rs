// RetroVideo
// copyright zipxing@hotmail.com 2022~2024

//! Software-compatible render backend.
//!
//! Composites every draw call into a CPU rgba framebuffer at native
//! resolution: palette application, alpha/additive blending, flips,
//! vertical scaling, opacity and tint all happen in plain pixel math.
//! At finish the whole frame is run through the loaded scaler and
//! uploaded into the render target in one texture update.
//!
//! Converted sprites are cached as rgba images through the same
//! version-keyed cache the hardware backend uses for textures.

use crate::error::VideoError;
use crate::render::{
    backend::{BackendKind, Blend, Flip, RenderBackend, RenderEnv, SpriteArgs},
    surface::Surface,
    tcache::{CacheKey, TextureCache},
};
use crate::util::ARect;
use crate::{NATIVE_H, NATIVE_W};
use log::error;
use sdl2::pixels::PixelFormatEnum;

/// A plain rgba pixel image, the software backend's "texture".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaImage {
    pub w: u32,
    pub h: u32,
    pub data: Vec<u8>,
}

pub struct SoftwareBackend {
    frame: Vec<u8>,
    cache: TextureCache<RgbaImage>,
}

impl Default for SoftwareBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SoftwareBackend {
    pub fn new() -> Self {
        Self {
            frame: vec![0; (NATIVE_W * NATIVE_H * 4) as usize],
            cache: TextureCache::new(),
        }
    }
}

impl RenderBackend for SoftwareBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::SoftwareCompatible
    }

    fn prepare(&mut self, _env: &mut RenderEnv) {
        // the framebuffer persists across frames like the hardware
        // target does; backgrounds repaint it
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
        let img = match self.cache.get_or_create(key, || {
            Ok::<RgbaImage, VideoError>(RgbaImage {
                w: sur.w,
                h: sur.h,
                data: sur.to_rgba(env.palette, args.pal_offset),
            })
        }) {
            Ok(img) => img,
            Err(_) => return,
        };
        blit_rgba(&mut self.frame, NATIVE_W, NATIVE_H, img, dst, args);
    }

    fn finish(&mut self, env: &mut RenderEnv) -> Result<(), VideoError> {
        let scaled = env.scaler.scale(&self.frame, NATIVE_W, NATIVE_H);
        let (w, h) = env.scaler.scaled_size(NATIVE_W, NATIVE_H);
        // render targets cannot be updated with pixels directly; stage
        // the frame through a static texture and copy it over
        let mut staging = env
            .creator
            .create_texture_static(PixelFormatEnum::RGBA32, w, h)
            .map_err(|e| VideoError::BackendResourceExhausted(e.to_string()))?;
        if let Err(e) = staging.update(None, &scaled, (w * 4) as usize) {
            // staging has no Drop under unsafe_textures, free it here too
            unsafe { staging.destroy() };
            return Err(VideoError::BackendResourceExhausted(e.to_string()));
        }
        let res = env
            .canvas
            .with_texture_canvas(env.target, |tc| {
                if let Err(e) = tc.copy(&staging, None, None) {
                    error!("frame copy failed: {}", e);
                }
            })
            .map_err(|e| VideoError::BackendResourceExhausted(format!("{:?}", e)));
        unsafe { staging.destroy() };
        res
    }

    fn reinit(&mut self, _env: &mut RenderEnv) {
        // the framebuffer is native-sized, geometry changes only affect
        // the scaler pass at finish
    }

    fn close(&mut self) {
        self.cache.clear(|_| {});
        self.frame.fill(0);
    }

    fn tick(&mut self) {
        self.cache.tick(|_| {});
    }

    fn cache_stats(&self) -> (u64, u64) {
        (self.cache.hits(), self.cache.misses())
    }
}

/// Blits `src` into the `dst_w` x `dst_h` rgba buffer at `rect`,
/// nearest-sampling when the rect size differs from the source size
/// (vertical sprite scaling), honoring flips, opacity, tint and blend.
/// Pixels falling outside the buffer are clipped.
pub fn blit_rgba(dst: &mut [u8], dst_w: u32, dst_h: u32, src: &RgbaImage, rect: ARect, args: &SpriteArgs) {
    if rect.w == 0 || rect.h == 0 || src.w == 0 || src.h == 0 {
        return;
    }
    for oy in 0..rect.h {
        let ty = rect.y + oy as i32;
        if ty < 0 || ty >= dst_h as i32 {
            continue;
        }
        let mut sy = (oy as u64 * src.h as u64 / rect.h as u64) as u32;
        if args.flip.contains(Flip::VERTICAL) {
            sy = src.h - 1 - sy;
        }
        for ox in 0..rect.w {
            let tx = rect.x + ox as i32;
            if tx < 0 || tx >= dst_w as i32 {
                continue;
            }
            let mut sx = (ox as u64 * src.w as u64 / rect.w as u64) as u32;
            if args.flip.contains(Flip::HORIZONTAL) {
                sx = src.w - 1 - sx;
            }

            let si = ((sy * src.w + sx) * 4) as usize;
            let sa = (src.data[si + 3] as u16 * args.opacity as u16 / 255) as u8;
            if sa == 0 {
                continue;
            }
            let sr = (src.data[si] as u16 * args.tint.r as u16 / 255) as u8;
            let sg = (src.data[si + 1] as u16 * args.tint.g as u16 / 255) as u8;
            let sb = (src.data[si + 2] as u16 * args.tint.b as u16 / 255) as u8;

            let di = ((ty as u32 * dst_w + tx as u32) * 4) as usize;
            match args.blend {
                Blend::Alpha => {
                    let ia = 255 - sa as u16;
                    dst[di] = ((sr as u16 * sa as u16 + dst[di] as u16 * ia) / 255) as u8;
                    dst[di + 1] = ((sg as u16 * sa as u16 + dst[di + 1] as u16 * ia) / 255) as u8;
                    dst[di + 2] = ((sb as u16 * sa as u16 + dst[di + 2] as u16 * ia) / 255) as u8;
                    dst[di + 3] = dst[di + 3].max(sa);
                }
                Blend::Additive => {
                    dst[di] = dst[di].saturating_add((sr as u16 * sa as u16 / 255) as u8);
                    dst[di + 1] = dst[di + 1].saturating_add((sg as u16 * sa as u16 / 255) as u8);
                    dst[di + 2] = dst[di + 2].saturating_add((sb as u16 * sa as u16 / 255) as u8);
                    dst[di + 3] = dst[di + 3].max(sa);
                }
            }
        }
    }
}
