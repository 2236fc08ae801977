mod image_ops;
mod traits;

pub use image_ops::{scale_to_width, width_scaled_dimensions};
pub use traits::{RgbaFrame, WindowCapture};

use crate::error::AppResult;
use crate::transport::WindowHandle;

/// Grabs `window` and scales it to `target_width`, keeping its aspect
/// ratio. A width of 0 or less returns the full-size frame.
pub fn capture_window(
    capture: &dyn WindowCapture,
    window: WindowHandle,
    target_width: i32,
) -> AppResult<RgbaFrame> {
    let frame = capture.grab(window)?;
    if target_width <= 0 {
        return Ok(frame);
    }
    scale_to_width(frame, target_width as u32)
}
