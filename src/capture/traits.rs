use std::sync::Arc;

use image::RgbaImage;

use crate::error::{AppError, AppResult};
use crate::transport::WindowHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

impl RgbaFrame {
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let len = (width as usize) * (height as usize);
        let pixels: Vec<u8> = rgba.iter().copied().cycle().take(len * 4).collect();
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    pub fn byte_len(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixels_to_vec(&self) -> Vec<u8> {
        self.pixels.as_ref().to_vec()
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        let px = self.pixels.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }

    pub fn to_rgba_image(&self) -> AppResult<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.pixels_to_vec()).ok_or(
            AppError::invalid_argument("rgba frame pixels length does not match dimensions"),
        )
    }
}

/// Still-image capture of a viewer window.
pub trait WindowCapture: Send + Sync {
    /// Current contents of `window` at native size. Only meaningful while
    /// the window is shown.
    fn grab(&self, window: WindowHandle) -> AppResult<RgbaFrame>;
}
