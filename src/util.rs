// RetroVideo
// copyright zipxing@hotmail.com 2022~2024

//! Geometry primitives shared by the render backends:
//! a pixel rect with signed position and a signed point.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PointI32 {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ARect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl ARect {
    pub fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    /// rect mapped from native coordinates into the scaled target space
    pub fn scaled(self, factor: u32) -> Self {
        Self {
            x: self.x * factor as i32,
            y: self.y * factor as i32,
            w: self.w * factor,
            h: self.h * factor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_scales_position_and_size() {
        let r = ARect::new(10, -5, 320, 200).scaled(2);
        assert_eq!(r, ARect::new(20, -10, 640, 400));
    }
}
