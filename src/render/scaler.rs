// RetroVideo
// copyright zipxing@hotmail.com 2022~2024

//! Named integer-factor upscaling algorithms.
//!
//! A scaler fixes the mapping from the logical native-resolution frame
//! to a physically larger rgba buffer by an integer multiple. Scalers
//! are resolved by name at init or on a settings change; an unknown
//! name or unsupported factor is reported as UnsupportedScaler and the
//! compositor falls back to factor-1 nearest neighbour.

use crate::error::VideoError;
use crate::MAX_SCALE_FACTOR;

pub const SCALER_NEAREST: &str = "nearest";
pub const SCALER_SCALE2X: &str = "scale2x";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kernel {
    Nearest,
    Scale2x,
}

/// A named upscaling algorithm bound to an integer scale factor.
#[derive(Debug, Clone)]
pub struct ScalerPlugin {
    pub name: String,
    pub factor: u32,
    kernel: Kernel,
}

impl ScalerPlugin {
    /// Scales an rgba pixel buffer of `w` x `h` by this plugin's factor.
    ///
    /// Precondition: `pixels.len() == w * h * 4`. Violations are a
    /// programming error, not a runtime condition.
    pub fn scale(&self, pixels: &[u8], w: u32, h: u32) -> Vec<u8> {
        debug_assert_eq!(pixels.len(), (w * h * 4) as usize);
        match self.kernel {
            Kernel::Nearest => nearest_scale(pixels, w, h, self.factor),
            Kernel::Scale2x => {
                let out = scale2x(pixels, w, h);
                if self.factor == 4 {
                    scale2x(&out, w * 2, h * 2)
                } else {
                    out
                }
            }
        }
    }

    pub fn scaled_size(&self, w: u32, h: u32) -> (u32, u32) {
        (w * self.factor, h * self.factor)
    }
}

/// True if the named algorithm can run at the requested factor.
pub fn supports_factor(name: &str, factor: u32) -> bool {
    match name {
        SCALER_NEAREST => (1..=MAX_SCALE_FACTOR).contains(&factor),
        SCALER_SCALE2X => factor == 2 || factor == 4,
        _ => false,
    }
}

/// Resolves a named scaler at the requested factor.
pub fn load(name: &str, factor: u32) -> Result<ScalerPlugin, VideoError> {
    if !supports_factor(name, factor) {
        return Err(VideoError::UnsupportedScaler {
            name: name.to_string(),
            factor,
        });
    }
    let kernel = match name {
        SCALER_SCALE2X => Kernel::Scale2x,
        _ => Kernel::Nearest,
    };
    Ok(ScalerPlugin {
        name: name.to_string(),
        factor,
        kernel,
    })
}

/// The identity fallback: nearest neighbour at factor 1.
pub fn fallback() -> ScalerPlugin {
    ScalerPlugin {
        name: SCALER_NEAREST.to_string(),
        factor: 1,
        kernel: Kernel::Nearest,
    }
}

fn px(pixels: &[u8], w: u32, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * w + x) * 4) as usize;
    [pixels[i], pixels[i + 1], pixels[i + 2], pixels[i + 3]]
}

fn put(out: &mut [u8], w: u32, x: u32, y: u32, p: [u8; 4]) {
    let i = ((y * w + x) * 4) as usize;
    out[i..i + 4].copy_from_slice(&p);
}

fn nearest_scale(pixels: &[u8], w: u32, h: u32, factor: u32) -> Vec<u8> {
    if factor <= 1 {
        return pixels.to_vec();
    }
    let ow = w * factor;
    let mut out = vec![0u8; (ow * h * factor * 4) as usize];
    for y in 0..h {
        for x in 0..w {
            let p = px(pixels, w, x, y);
            for dy in 0..factor {
                for dx in 0..factor {
                    put(&mut out, ow, x * factor + dx, y * factor + dy, p);
                }
            }
        }
    }
    out
}

/// EPX/Scale2x: expands each pixel into a 2x2 block, snapping block
/// corners to equal neighbours to smooth diagonals.
fn scale2x(pixels: &[u8], w: u32, h: u32) -> Vec<u8> {
    let ow = w * 2;
    let mut out = vec![0u8; (ow * h * 2 * 4) as usize];
    for y in 0..h {
        for x in 0..w {
            let p = px(pixels, w, x, y);
            let a = if y > 0 { px(pixels, w, x, y - 1) } else { p };
            let c = if x > 0 { px(pixels, w, x - 1, y) } else { p };
            let b = if x + 1 < w { px(pixels, w, x + 1, y) } else { p };
            let d = if y + 1 < h { px(pixels, w, x, y + 1) } else { p };

            let mut e0 = p;
            let mut e1 = p;
            let mut e2 = p;
            let mut e3 = p;
            if c == a && c != d && a != b {
                e0 = a;
            }
            if a == b && a != c && b != d {
                e1 = b;
            }
            if d == c && d != b && c != a {
                e2 = c;
            }
            if b == d && b != a && d != c {
                e3 = d;
            }

            put(&mut out, ow, x * 2, y * 2, e0);
            put(&mut out, ow, x * 2 + 1, y * 2, e1);
            put(&mut out, ow, x * 2, y * 2 + 1, e2);
            put(&mut out, ow, x * 2 + 1, y * 2 + 1, e3);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factor_support_matrix() {
        assert!(supports_factor(SCALER_NEAREST, 1));
        assert!(supports_factor(SCALER_NEAREST, 4));
        assert!(!supports_factor(SCALER_NEAREST, 5));
        assert!(supports_factor(SCALER_SCALE2X, 2));
        assert!(!supports_factor(SCALER_SCALE2X, 3));
        assert!(supports_factor(SCALER_SCALE2X, 4));
        assert!(!supports_factor("hq2x", 2));
    }

    #[test]
    fn unknown_scaler_is_rejected() {
        assert!(load("hq2x", 2).is_err());
        assert!(load(SCALER_SCALE2X, 3).is_err());
    }

    #[test]
    fn fallback_is_identity() {
        let s = fallback();
        let pixels = [1u8, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(s.scale(&pixels, 2, 1), pixels.to_vec());
        assert_eq!(s.scaled_size(320, 200), (320, 200));
    }

    #[test]
    fn nearest_duplicates_pixels() {
        let s = load(SCALER_NEAREST, 2).unwrap();
        // one red and one green pixel side by side
        let pixels = [255u8, 0, 0, 255, 0, 255, 0, 255];
        let out = s.scale(&pixels, 2, 1);
        assert_eq!(out.len(), 2 * 2 * 2 * 4);
        assert_eq!(px(&out, 4, 0, 0), [255, 0, 0, 255]);
        assert_eq!(px(&out, 4, 1, 1), [255, 0, 0, 255]);
        assert_eq!(px(&out, 4, 2, 0), [0, 255, 0, 255]);
        assert_eq!(px(&out, 4, 3, 1), [0, 255, 0, 255]);
    }

    #[test]
    #[should_panic]
    fn scale_rejects_short_buffers() {
        let s = load(SCALER_NEAREST, 2).unwrap();
        // one pixel of data for a claimed 2x2 buffer
        s.scale(&[0u8; 4], 2, 2);
    }

    #[test]
    fn scale2x_keeps_solid_areas_solid() {
        let s = load(SCALER_SCALE2X, 2).unwrap();
        let pixels = vec![10u8; 4 * 4 * 4]; // 4x4 solid block
        let out = s.scale(&pixels, 4, 4);
        assert_eq!(out, vec![10u8; 8 * 8 * 4]);
    }

    #[test]
    fn scale2x_factor_four_doubles_twice() {
        let s = load(SCALER_SCALE2X, 4).unwrap();
        let pixels = vec![7u8; 2 * 2 * 4];
        let out = s.scale(&pixels, 2, 2);
        assert_eq!(out.len(), 8 * 8 * 4);
        assert_eq!(s.scaled_size(2, 2), (8, 8));
    }
}
