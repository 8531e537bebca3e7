// RetroVideo
// copyright zipxing@hotmail.com 2022~2024

//! End-to-end exercise of the video subsystem against SDL's dummy
//! video driver. Everything runs in one test because SDL wants init
//! and teardown on a single thread.

use log::LevelFilter;
use retro_video::render::backend::{BackendKind, Blend, Flip};
use retro_video::render::palette::{Palette, Rgb};
use retro_video::render::surface::Surface;
use retro_video::render::video::{Video, VideoConfig};
use retro_video::{NATIVE_H, NATIVE_W};

fn test_config() -> VideoConfig {
    VideoConfig {
        width: NATIVE_W * 2,
        height: NATIVE_H * 2,
        fullscreen: false,
        vsync: false,
        scaler_name: "nearest".to_string(),
        scale_factor: 2,
    }
}

fn checker_surface() -> Surface {
    let mut data = vec![0u8; (16 * 16) as usize];
    for (i, px) in data.iter_mut().enumerate() {
        *px = if (i / 16 + i % 16) % 2 == 0 { 1 } else { 2 };
    }
    Surface::from_indexed(16, 16, data)
}

#[test]
fn full_frame_protocol_on_dummy_driver() {
    std::env::set_var("SDL_VIDEODRIVER", "dummy");

    let log_path = std::env::temp_dir().join("retro_video_test.log");
    retro_video::log::init_log(LevelFilter::Info, log_path.to_str().unwrap());

    let mut video = match Video::init(&test_config()) {
        Ok(v) => v,
        Err(e) => {
            // CI boxes without even the dummy driver exist
            eprintln!("skipping: video init failed: {}", e);
            return;
        }
    };

    assert_eq!(video.get_state(), (NATIVE_W * 2, NATIVE_H * 2, false, false));

    // palette store behavior through the public surface
    let mut pal = Palette::default();
    pal.set_color(1, Rgb::new(255, 255, 255));
    pal.set_color(2, Rgb::new(255, 0, 0));
    video.set_base_palette(&pal);
    let v0 = video.palette_version();
    video.copy_palette_range(&pal, 0, 128, 64);
    assert_eq!(video.palette_version(), v0 + 1);
    video.force_palette_refresh();
    assert_eq!(video.palette_version(), v0 + 2);
    assert_eq!(video.active_palette().color(1), pal.color(1));

    // a few frames through the hardware backend
    let sprite = checker_surface();
    for _ in 0..3 {
        video.render_prepare().unwrap();
        video.render_background(&sprite).unwrap();
        video
            .render_sprite(&sprite, 10, 10, Blend::Alpha, 0)
            .unwrap();
        video
            .render_sprite_flip(&sprite, 40, 10, Blend::Additive, 0, Flip::HORIZONTAL)
            .unwrap();
        video
            .render_sprite_flip_scale(&sprite, 70, 10, Blend::Alpha, 0, Flip::empty(), 0.5)
            .unwrap();
        video.render_sprite_size(&sprite, 100, 10, 32, 8).unwrap();
        video.render_finish().unwrap();
        video.tick();
    }

    // fade and shake only change compositing, never error
    video.set_fade(0.5);
    video.move_target(10, -5);
    video.render_prepare().unwrap();
    video.render_background(&sprite).unwrap();
    video.render_finish().unwrap();
    video.set_fade(1.0);
    video.move_target(0, 0);

    // swap to the software-compatible backend and draw the same frame
    video.select_backend(BackendKind::SoftwareCompatible).unwrap();
    video.render_prepare().unwrap();
    video.render_background(&sprite).unwrap();
    video
        .render_sprite_tint(&sprite, 20, 20, Rgb::new(0, 255, 0), 0)
        .unwrap();
    video.render_finish().unwrap();
    // same kind again is a no-op
    video.select_backend(BackendKind::SoftwareCompatible).unwrap();

    // screenshot matches the window size
    let shot = video.screenshot().unwrap();
    assert_eq!((shot.w, shot.h), (NATIVE_W * 2, NATIVE_H * 2));
    assert_eq!(shot.data.len(), (shot.w * shot.h * 4) as usize);
    let area = video.capture_area(0, 0, 32, 20).unwrap();
    assert_eq!((area.w, area.h), (64, 40));

    // identical reinit keeps everything: palette state and the texture
    // cache stay warm, so redrawing afterwards causes no new uploads
    video.render_prepare().unwrap();
    video.render_background(&sprite).unwrap();
    video.render_finish().unwrap();
    let (_, misses_before) = video.cache_stats();
    video.reinit(&test_config()).unwrap();
    assert_eq!(video.palette_version(), v0 + 2);
    video.render_prepare().unwrap();
    video.render_background(&sprite).unwrap();
    video.render_finish().unwrap();
    let (hits_after, misses_after) = video.cache_stats();
    assert_eq!(misses_after, misses_before);
    assert!(hits_after > 0);

    // an unknown scaler falls back to nearest at factor 1
    let mut cfg = test_config();
    cfg.scaler_name = "hq9x".to_string();
    cfg.scale_factor = 3;
    video.reinit(&cfg).unwrap();
    assert_eq!(video.config().scale_factor, 1);
    video.render_prepare().unwrap();
    video.render_background(&sprite).unwrap();
    video.render_finish().unwrap();

    // close twice; drop after close is fine too
    video.close();
    video.close();

    // a backend switch on a closed subsystem is refused outright, the
    // previously active backend is untouched
    assert!(video.select_backend(BackendKind::Hardware).is_err());
    video.select_backend(BackendKind::SoftwareCompatible).unwrap();

    // logging went to the configured file
    assert!(log_path.exists());
}
