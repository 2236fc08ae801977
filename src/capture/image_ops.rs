use fast_image_resize as fr;

use crate::error::{AppError, AppResult};

use super::traits::RgbaFrame;

const THUMBNAIL_FILTER: fr::FilterType = fr::FilterType::CatmullRom;

/// Output size for scaling `src_width x src_height` to `target_width`
/// while keeping the aspect ratio, or `None` when nothing changes.
pub fn width_scaled_dimensions(
    src_width: u32,
    src_height: u32,
    target_width: u32,
) -> Option<(u32, u32)> {
    if src_width == 0 || src_height == 0 || target_width == 0 || src_width == target_width {
        return None;
    }
    let height = (u64::from(src_height) * u64::from(target_width) / u64::from(src_width)).max(1);
    Some((target_width, height.min(u64::from(u32::MAX)) as u32))
}

pub fn scale_to_width(frame: RgbaFrame, target_width: u32) -> AppResult<RgbaFrame> {
    let Some((dst_width, dst_height)) =
        width_scaled_dimensions(frame.width, frame.height, target_width)
    else {
        return Ok(frame);
    };

    let src = fr::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.pixels_to_vec(),
        fr::PixelType::U8x4,
    )
    .map_err(|_| AppError::capture("rgba frame pixels length does not match dimensions"))?;

    let mut dst = fr::images::Image::new(dst_width, dst_height, fr::PixelType::U8x4);
    let mut resizer = fr::Resizer::new();
    let options =
        fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Convolution(THUMBNAIL_FILTER));

    resizer
        .resize(&src, &mut dst, &options)
        .map_err(|err| AppError::capture(format!("failed to scale frame: {err}")))?;

    Ok(RgbaFrame {
        width: dst_width,
        height: dst_height,
        pixels: dst.into_vec().into(),
    })
}
