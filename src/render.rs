// RetroVideo
// copyright zipxing@hotmail.com 2022~2024

//! Render module, the heart of the compositor.
//!
//! palette holds the authoritative base palette and the versioned
//! active palette the backends actually render with.
//!
//! scaler resolves named integer-factor upscaling algorithms.
//!
//! surface is the caller-owned pixel buffer handed into draw calls,
//! indexed (8 bits per pixel) or rgba.
//!
//! tcache amortizes pixel uploads across frames, keyed by surface
//! identity and palette version.
//!
//! backend defines the RenderBackend trait with a hardware and a
//! software-compatible implementation.
//!
//! video owns the window, render target and per-frame protocol and is
//! the public entry point consumed by game/UI code.

pub mod backend;
pub mod palette;
pub mod scaler;
pub mod surface;
pub mod tcache;
pub mod video;
