// RetroVideo
// copyright zipxing@hotmail.com 2022~2024

//! Error taxonomy of the video subsystem.
//! Init failures are fatal and surfaced to the caller, everything else
//! is recoverable: an unsupported scaler degrades to nearest neighbour,
//! an exhausted backend skips the current draw call, a failed capture
//! leaves state untouched.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum VideoError {
    /// Window or renderer creation failed, the subsystem stays uninitialized.
    #[error("video init failed: {0}")]
    Init(String),

    /// The named scaler does not exist or cannot run at the requested factor.
    #[error("scaler {name:?} does not support factor {factor}")]
    UnsupportedScaler { name: String, factor: u32 },

    /// Texture creation or upload failed at runtime, e.g. out of device memory.
    #[error("backend resource exhausted: {0}")]
    BackendResourceExhausted(String),

    /// Pixel readback from the renderer failed.
    #[error("pixel readback failed: {0}")]
    Capture(String),

    /// A draw or capture call arrived while the subsystem was not initialized.
    #[error("video subsystem is not initialized")]
    NotReady,
}
