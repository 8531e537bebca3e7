// RetroVideo
// copyright zipxing@hotmail.com 2022~2024

//! The frame compositor and video state.
//!
//! Video owns the SDL window/canvas, the off-screen render target, the
//! palette store, the loaded scaler and the active render backend, and
//! exposes the public operations game/UI code consumes.
//!
//! Per-frame protocol, in this order: render_prepare, any number of
//! background/sprite draws, render_finish. Finish composites the
//! render target onto the screen with fade applied as color modulation
//! and screen shake applied as a blit offset, then presents. Without
//! vsync the compositor self-paces with a bounded sleep so the main
//! loop does not spin a core.

use crate::error::VideoError;
use crate::render::{
    backend::{
        hw::HardwareBackend, soft::SoftwareBackend, BackendKind, Blend, Flip, RenderBackend,
        RenderEnv, SpriteArgs,
    },
    palette::{ActivePalette, Palette, PaletteStore, Rgb},
    scaler::{self, ScalerPlugin},
    surface::Surface,
};
use crate::util::{ARect, PointI32};
use crate::{NATIVE_H, NATIVE_W};
use log::{error, info, warn};
use sdl2::pixels::{Color, PixelFormatEnum};
use sdl2::rect::Rect;
use sdl2::render::{Canvas, Texture, TextureCreator};
use sdl2::video::{FullscreenType, Window, WindowContext, WindowPos};
use sdl2::VideoSubsystem;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    pub width: u32,
    pub height: u32,
    pub fullscreen: bool,
    pub vsync: bool,
    pub scaler_name: String,
    pub scale_factor: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: NATIVE_W * 2,
            height: NATIVE_H * 2,
            fullscreen: false,
            vsync: true,
            scaler_name: scaler::SCALER_NEAREST.to_string(),
            scale_factor: 1,
        }
    }
}

/// Window-level resources that live and die together: the canvas bakes
/// renderer settings (vsync) in at creation, so a renderer-level change
/// rebuilds the whole unit.
struct Screen {
    canvas: Canvas<Window>,
    creator: TextureCreator<WindowContext>,
    target: Texture,
}

impl Screen {
    fn env<'a>(
        &'a mut self,
        palette: &'a ActivePalette,
        scaler: &'a ScalerPlugin,
        scale_factor: u32,
    ) -> RenderEnv<'a> {
        RenderEnv {
            canvas: &mut self.canvas,
            creator: &self.creator,
            target: &mut self.target,
            palette,
            scaler,
            scale_factor,
        }
    }
}

pub struct Video {
    video: VideoSubsystem,
    screen: Option<Screen>,
    config: VideoConfig,
    scaler: ScalerPlugin,
    palettes: PaletteStore,
    backend: Box<dyn RenderBackend>,
    fade: f32,
    target_move: PointI32,
}

impl Video {
    /// Brings the whole subsystem up: window, renderer, render target,
    /// scaler and the hardware backend. On failure nothing is left
    /// initialized.
    pub fn init(config: &VideoConfig) -> Result<Video, VideoError> {
        let sdl = sdl2::init().map_err(VideoError::Init)?;
        let video = sdl.video().map_err(VideoError::Init)?;

        let scaler = load_scaler_or_fallback(&config.scaler_name, config.scale_factor);
        let mut cfg = config.clone();
        cfg.scale_factor = scaler.factor;

        let screen = create_screen(&video, &cfg)?;
        video.disable_screen_saver();

        info!("video init ok");
        info!(" * driver: {}", video.current_video_driver());
        info!(
            " * mode: {}x{} fullscreen={} vsync={}",
            cfg.width, cfg.height, cfg.fullscreen, cfg.vsync
        );
        info!(" * scaler: {} x{}", scaler.name, scaler.factor);

        Ok(Video {
            video,
            screen: Some(screen),
            config: cfg,
            scaler,
            palettes: PaletteStore::new(),
            backend: Box::new(HardwareBackend::new()),
            fade: 1.0,
            target_move: PointI32::default(),
        })
    }

    /// Applies a new configuration, touching only the resources whose
    /// settings actually changed. Any change clears the texture cache
    /// and recreates the render target; an identical configuration is a
    /// complete no-op and keeps the cache warm.
    pub fn reinit(&mut self, config: &VideoConfig) -> Result<(), VideoError> {
        let scaler = load_scaler_or_fallback(&config.scaler_name, config.scale_factor);
        let mut cfg = config.clone();
        cfg.scale_factor = scaler.factor;
        if cfg == self.config {
            return Ok(());
        }

        // every cached texture dies with the old target/renderer; must
        // happen while the old renderer is still alive
        self.backend.close();

        if cfg.vsync != self.config.vsync {
            // vsync is baked into the renderer, rebuild window + canvas.
            // one window at a time: drop the old screen first.
            self.screen = None;
            match create_screen(&self.video, &cfg) {
                Ok(s) => {
                    self.screen = Some(s);
                    self.scaler = scaler;
                    self.config = cfg.clone();
                }
                Err(e) => {
                    error!("video reinit failed, restoring previous mode: {}", e);
                    let prev = create_screen(&self.video, &self.config)?;
                    self.screen = Some(prev);
                }
            }
        } else {
            let factor = scaler.factor;
            let screen = self.screen.as_mut().ok_or(VideoError::NotReady)?;
            if cfg.width != self.config.width
                || cfg.height != self.config.height
                || cfg.fullscreen != self.config.fullscreen
            {
                let window = screen.canvas.window_mut();
                if let Err(e) = window.set_size(cfg.width, cfg.height) {
                    error!("could not resize window: {}", e);
                }
                if cfg.fullscreen != self.config.fullscreen {
                    let mode = if cfg.fullscreen {
                        FullscreenType::True
                    } else {
                        FullscreenType::Off
                    };
                    if let Err(e) = window.set_fullscreen(mode) {
                        error!("could not change fullscreen mode: {}", e);
                    }
                }
                // recenter only when we end up windowed
                if !cfg.fullscreen {
                    window.set_position(WindowPos::Centered, WindowPos::Centered);
                }
                info!("changing resolution to {}x{}", cfg.width, cfg.height);
            }

            if let Err(e) = screen
                .canvas
                .set_logical_size(NATIVE_W * factor, NATIVE_H * factor)
            {
                error!("could not set logical size: {}", e);
            }
            let target = create_target(&mut screen.canvas, &screen.creator, factor)?;
            let old = std::mem::replace(&mut screen.target, target);
            unsafe { old.destroy() };

            self.scaler = scaler;
            self.config = cfg;
        }

        let screen = self.screen.as_mut().ok_or(VideoError::NotReady)?;
        let mut env = screen.env(self.palettes.active(), &self.scaler, self.config.scale_factor);
        self.backend.reinit(&mut env);
        info!(
            "video reinit: {}x{} scaler {} x{}",
            self.config.width, self.config.height, self.scaler.name, self.scaler.factor
        );
        Ok(())
    }

    /// Swaps the active render backend. A no-op when the requested
    /// variant is already active; otherwise the draw-call surface is
    /// unchanged across the swap.
    pub fn select_backend(&mut self, kind: BackendKind) -> Result<(), VideoError> {
        if kind == self.backend.kind() {
            return Ok(());
        }
        // refuse before touching the old backend, so a call against a
        // closed subsystem leaves it fully intact
        let screen = self.screen.as_mut().ok_or(VideoError::NotReady)?;
        self.backend.close();
        self.backend = match kind {
            BackendKind::Hardware => Box::new(HardwareBackend::new()),
            BackendKind::SoftwareCompatible => Box::new(SoftwareBackend::new()),
        };
        let mut env = screen.env(self.palettes.active(), &self.scaler, self.config.scale_factor);
        self.backend.reinit(&mut env);
        info!("selected {:?} render backend", kind);
        Ok(())
    }

    // ---- palette operations ------------------------------------------------

    pub fn set_base_palette(&mut self, src: &Palette) {
        self.palettes.set_base(src);
    }

    /// See PaletteStore::copy_range for the bounds precondition.
    pub fn copy_palette_range(
        &mut self,
        src: &Palette,
        src_start: usize,
        dst_start: usize,
        count: usize,
    ) {
        self.palettes.copy_range(src, src_start, dst_start, count);
    }

    pub fn force_palette_refresh(&mut self) {
        self.palettes.force_refresh();
    }

    pub fn base_palette(&self) -> &Palette {
        self.palettes.base()
    }

    pub fn base_palette_mut(&mut self) -> &mut Palette {
        self.palettes.base_mut()
    }

    pub fn active_palette(&self) -> &ActivePalette {
        self.palettes.active()
    }

    /// Read/write handle for legacy palette effects.
    pub fn active_palette_mut(&mut self) -> &mut ActivePalette {
        self.palettes.active_mut()
    }

    pub fn palette_version(&self) -> u64 {
        self.palettes.active_version()
    }

    // ---- frame protocol ----------------------------------------------------

    /// Starts a frame: resets the active palette to base and lets the
    /// backend reset its per-frame state.
    pub fn render_prepare(&mut self) -> Result<(), VideoError> {
        self.palettes.reset_active();
        let screen = self.screen.as_mut().ok_or(VideoError::NotReady)?;
        let mut env = screen.env(self.palettes.active(), &self.scaler, self.config.scale_factor);
        self.backend.prepare(&mut env);
        Ok(())
    }

    pub fn render_background(&mut self, sur: &Surface) -> Result<(), VideoError> {
        let screen = self.screen.as_mut().ok_or(VideoError::NotReady)?;
        let mut env = screen.env(self.palettes.active(), &self.scaler, self.config.scale_factor);
        self.backend.background(&mut env, sur);
        Ok(())
    }

    pub fn render_sprite(
        &mut self,
        sur: &Surface,
        x: i32,
        y: i32,
        blend: Blend,
        pal_offset: u8,
    ) -> Result<(), VideoError> {
        self.render_sprite_flip_scale_opacity(sur, x, y, blend, pal_offset, Flip::empty(), 1.0, 0xFF)
    }

    pub fn render_sprite_flip(
        &mut self,
        sur: &Surface,
        x: i32,
        y: i32,
        blend: Blend,
        pal_offset: u8,
        flip: Flip,
    ) -> Result<(), VideoError> {
        self.render_sprite_flip_scale_opacity(sur, x, y, blend, pal_offset, flip, 1.0, 0xFF)
    }

    pub fn render_sprite_flip_scale(
        &mut self,
        sur: &Surface,
        x: i32,
        y: i32,
        blend: Blend,
        pal_offset: u8,
        flip: Flip,
        y_percent: f32,
    ) -> Result<(), VideoError> {
        self.render_sprite_flip_scale_opacity(sur, x, y, blend, pal_offset, flip, y_percent, 0xFF)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn render_sprite_flip_scale_opacity(
        &mut self,
        sur: &Surface,
        x: i32,
        y: i32,
        blend: Blend,
        pal_offset: u8,
        flip: Flip,
        y_percent: f32,
        opacity: u8,
    ) -> Result<(), VideoError> {
        self.render_sprite_flip_scale_opacity_tint(
            sur, x, y, blend, pal_offset, flip, y_percent, opacity, Rgb::WHITE,
        )
    }

    pub fn render_sprite_tint(
        &mut self,
        sur: &Surface,
        x: i32,
        y: i32,
        tint: Rgb,
        pal_offset: u8,
    ) -> Result<(), VideoError> {
        self.render_sprite_flip_scale_opacity_tint(
            sur,
            x,
            y,
            Blend::Alpha,
            pal_offset,
            Flip::empty(),
            1.0,
            0xFF,
            tint,
        )
    }

    /// Draws a sprite stretched to an explicit size.
    pub fn render_sprite_size(
        &mut self,
        sur: &Surface,
        x: i32,
        y: i32,
        w: u32,
        h: u32,
    ) -> Result<(), VideoError> {
        self.draw(sur, ARect::new(x, y, w, h), SpriteArgs::default())
    }

    /// The fully general sprite entry point; every other wrapper
    /// computes the destination rect and flags and lands here.
    #[allow(clippy::too_many_arguments)]
    pub fn render_sprite_flip_scale_opacity_tint(
        &mut self,
        sur: &Surface,
        x: i32,
        y: i32,
        blend: Blend,
        pal_offset: u8,
        flip: Flip,
        y_percent: f32,
        opacity: u8,
        tint: Rgb,
    ) -> Result<(), VideoError> {
        let h = (sur.h as f32 * y_percent.clamp(0.0, 1.0)) as u32;
        let dst = ARect::new(x, y + ((sur.h - h) / 2) as i32, sur.w, h);
        self.draw(
            sur,
            dst,
            SpriteArgs {
                blend,
                pal_offset,
                flip,
                opacity,
                tint,
            },
        )
    }

    fn draw(&mut self, sur: &Surface, dst: ARect, args: SpriteArgs) -> Result<(), VideoError> {
        let screen = self.screen.as_mut().ok_or(VideoError::NotReady)?;
        let mut env = screen.env(self.palettes.active(), &self.scaler, self.config.scale_factor);
        self.backend.sprite(&mut env, sur, dst, &args);
        Ok(())
    }

    /// Ends a frame: flushes the backend into the render target, then
    /// composites the target onto the screen with fade and shake
    /// applied, and presents.
    pub fn render_finish(&mut self) -> Result<(), VideoError> {
        let factor = self.config.scale_factor;
        {
            let screen = self.screen.as_mut().ok_or(VideoError::NotReady)?;
            let mut env = screen.env(self.palettes.active(), &self.scaler, factor);
            self.backend.finish(&mut env)?;
        }
        let screen = self.screen.as_mut().ok_or(VideoError::NotReady)?;

        // clear the screen (borders around the logical area)
        screen.canvas.set_draw_color(Color::RGB(0, 0, 0));
        screen.canvas.clear();

        // fade by color modulation of the target texture
        let v = fade_mod(self.fade);
        screen.target.set_color_mod(v, v, v);

        // shake offsets are native pixels, scale them up for the blit
        let dst = Rect::new(
            self.target_move.x * factor as i32,
            self.target_move.y * factor as i32,
            NATIVE_W * factor,
            NATIVE_H * factor,
        );
        if let Err(e) = screen.canvas.copy(&screen.target, None, dst) {
            error!("could not composite render target: {}", e);
        }
        screen.target.set_color_mod(0xFF, 0xFF, 0xFF);

        screen.canvas.present();
        // without vsync, pace ourselves so the main loop does not eat a
        // whole core
        if !self.config.vsync {
            thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    // ---- queries & effects -------------------------------------------------

    pub fn get_state(&self) -> (u32, u32, bool, bool) {
        (
            self.config.width,
            self.config.height,
            self.config.fullscreen,
            self.config.vsync,
        )
    }

    pub fn config(&self) -> &VideoConfig {
        &self.config
    }

    /// Lifetime (hits, misses) of the active backend's texture cache.
    pub fn cache_stats(&self) -> (u64, u64) {
        self.backend.cache_stats()
    }

    pub fn set_fade(&mut self, fade: f32) {
        self.fade = fade.clamp(0.0, 1.0);
    }

    /// Screen shake: translates the final blit by (x, y) native pixels.
    pub fn move_target(&mut self, x: i32, y: i32) {
        self.target_move = PointI32 { x, y };
    }

    /// Cache maintenance, called exactly once per logical game tick
    /// regardless of the render cadence.
    pub fn tick(&mut self) {
        if self.screen.is_some() {
            self.backend.tick();
        }
    }

    /// Reads back the full screen as an rgba surface.
    pub fn screenshot(&mut self) -> Result<Surface, VideoError> {
        let screen = self.screen.as_mut().ok_or(VideoError::NotReady)?;
        let (w, h) = screen.canvas.output_size().map_err(VideoError::Capture)?;
        let pixels = screen
            .canvas
            .read_pixels(None, PixelFormatEnum::RGBA32)
            .map_err(VideoError::Capture)?;
        Ok(Surface::from_rgba(w, h, pixels))
    }

    /// Reads back a native-coordinate area, scaled to the window size.
    pub fn capture_area(&mut self, x: i32, y: i32, w: u32, h: u32) -> Result<Surface, VideoError> {
        let scale_x = self.config.width as f32 / NATIVE_W as f32;
        let scale_y = self.config.height as f32 / NATIVE_H as f32;
        let rect = Rect::new(
            (x as f32 * scale_x) as i32,
            (y as f32 * scale_y) as i32,
            ((w as f32 * scale_x) as u32).max(1),
            ((h as f32 * scale_y) as u32).max(1),
        );
        let screen = self.screen.as_mut().ok_or(VideoError::NotReady)?;
        let pixels = screen
            .canvas
            .read_pixels(rect, PixelFormatEnum::RGBA32)
            .map_err(VideoError::Capture)?;
        Ok(Surface::from_rgba(rect.width(), rect.height(), pixels))
    }

    /// Orderly teardown of everything init acquired. Idempotent.
    pub fn close(&mut self) {
        if self.screen.is_none() {
            return;
        }
        // backend resources must go while the renderer is still alive
        self.backend.close();
        if let Some(Screen {
            canvas,
            creator,
            target,
        }) = self.screen.take()
        {
            unsafe { target.destroy() };
            drop(creator);
            drop(canvas);
        }
        info!("video deinit");
    }
}

impl Drop for Video {
    fn drop(&mut self) {
        self.close();
    }
}

/// Maps a 0..=1 fade level to the color modulation value applied to the
/// render target at composite time.
fn fade_mod(fade: f32) -> u8 {
    (255.0 * fade) as u8
}

fn load_scaler_or_fallback(name: &str, factor: u32) -> ScalerPlugin {
    match scaler::load(name, factor) {
        Ok(s) => s,
        Err(e) => {
            warn!("{}; using nearest neighbour at factor 1", e);
            scaler::fallback()
        }
    }
}

fn create_screen(video: &VideoSubsystem, cfg: &VideoConfig) -> Result<Screen, VideoError> {
    let title = format!("RetroVideo v{}", env!("CARGO_PKG_VERSION"));
    let mut window = video
        .window(&title, cfg.width, cfg.height)
        .position_centered()
        .build()
        .map_err(|e| VideoError::Init(e.to_string()))?;
    if cfg.fullscreen {
        if let Err(e) = window.set_fullscreen(FullscreenType::True) {
            error!("could not set fullscreen mode: {}", e);
        }
    }

    let mut builder = window.into_canvas().target_texture();
    if cfg.vsync {
        builder = builder.present_vsync();
    }
    let mut canvas = builder.build().map_err(|e| VideoError::Init(e.to_string()))?;

    // the logical area scales up to the window size from here on
    canvas
        .set_logical_size(NATIVE_W * cfg.scale_factor, NATIVE_H * cfg.scale_factor)
        .map_err(|e| VideoError::Init(e.to_string()))?;

    let creator = canvas.texture_creator();
    let target = create_target(&mut canvas, &creator, cfg.scale_factor)?;
    Ok(Screen {
        canvas,
        creator,
        target,
    })
}

/// Creates the off-screen render target, cleared to black.
fn create_target(
    canvas: &mut Canvas<Window>,
    creator: &TextureCreator<WindowContext>,
    factor: u32,
) -> Result<Texture, VideoError> {
    let w = NATIVE_W * factor;
    let h = NATIVE_H * factor;
    let mut target = creator
        .create_texture_target(PixelFormatEnum::RGBA32, w, h)
        .map_err(|e| VideoError::BackendResourceExhausted(e.to_string()))?;
    canvas
        .with_texture_canvas(&mut target, |tc| {
            tc.set_draw_color(Color::RGBA(0, 0, 0, 0xFF));
            tc.clear();
        })
        .map_err(|e| VideoError::BackendResourceExhausted(format!("{:?}", e)))?;
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_windowed_nearest() {
        let cfg = VideoConfig::default();
        assert_eq!((cfg.width, cfg.height), (NATIVE_W * 2, NATIVE_H * 2));
        assert!(!cfg.fullscreen);
        assert_eq!(cfg.scaler_name, scaler::SCALER_NEAREST);
        assert_eq!(cfg.scale_factor, 1);
    }

    #[test]
    fn fade_maps_to_color_modulation() {
        assert_eq!(fade_mod(0.0), 0);
        assert_eq!(fade_mod(0.5), 127);
        assert_eq!(fade_mod(1.0), 255);
    }

    #[test]
    fn scaler_fallback_never_fails() {
        let s = load_scaler_or_fallback("no-such-scaler", 3);
        assert_eq!(s.factor, 1);
        let s = load_scaler_or_fallback(scaler::SCALER_SCALE2X, 2);
        assert_eq!(s.factor, 2);
    }
}
