// RetroVideo
// copyright zipxing@hotmail.com 2022~2024

//! RetroVideo is a palette-indexed 2d compositor.
//! It sits between game/UI code and SDL, owning the render target,
//! the 256-color palette pair and a palette-version keyed texture cache.
//!
//! It supports two interchangeable render backends: a hardware one
//! that uploads sprites as SDL textures, and a software-compatible
//! fallback that composites frames on the CPU. Backends can be
//! hot-swapped at runtime without losing palette, scale or window state.
//!
//! Game scenes are drawn each frame between render_prepare and
//! render_finish, which composites the off-screen target onto the
//! screen with fade and screen-shake applied.

/// native game resolution, every draw call works in this coordinate space
pub const NATIVE_W: u32 = 320;
pub const NATIVE_H: u32 = 200;

/// largest integer upscaling factor any scaler may be loaded with
pub const MAX_SCALE_FACTOR: u32 = 4;

/// log
pub mod log;

/// error taxonomy of the video subsystem
pub mod error;

/// common geometry primitives: rects and points
pub mod util;

/// Render module.
/// palette: base/active 256-color palettes with version stamping.
/// scaler: named integer-factor upscaling algorithms.
/// surface: caller-owned pixel buffers (indexed or rgba).
/// tcache: texture cache keyed by surface id and palette version.
/// backend: the RenderBackend trait and its hardware/software variants.
/// video: the frame compositor owning window, render target and state.
pub mod render;
