//! # 缩略图模块
//!
//! 上传成功后由本地原图生成历史记录缩略图，不会重新从网络下载。
//! 优先使用 `fast_image_resize`，失败时回退 `image::thumbnail`。

use fast_image_resize as fr;
use image::{DynamicImage, GenericImageView, ImageBuffer, Rgba};

use super::ImageError;

pub const THUMBNAIL_MAX_WIDTH: u32 = 90;
pub const THUMBNAIL_MAX_HEIGHT: u32 = 90;

/// 生成等比缩略图，最长边不超过给定尺寸；小图保持原尺寸。
pub fn create_thumbnail(
    image: &DynamicImage,
    max_width: u32,
    max_height: u32,
) -> Result<DynamicImage, ImageError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageError::Thumbnail("源图片尺寸为 0".to_string()));
    }
    if max_width == 0 || max_height == 0 {
        return Err(ImageError::Thumbnail("缩略图目标尺寸为 0".to_string()));
    }

    let scale = (max_width as f64 / width as f64)
        .min(max_height as f64 / height as f64)
        .min(1.0);
    let target_width = ((width as f64 * scale).round() as u32).max(1);
    let target_height = ((height as f64 * scale).round() as u32).max(1);

    if (target_width, target_height) == (width, height) {
        return Ok(DynamicImage::ImageRgba8(image.to_rgba8()));
    }

    match resize_with_fast_image_resize(image, target_width, target_height) {
        Ok(resized) => Ok(resized),
        Err(err) => {
            log::warn!("⚠️ fast_image_resize 生成缩略图失败，回退 image::thumbnail：{}", err);
            Ok(image.thumbnail(target_width, target_height))
        }
    }
}

fn resize_with_fast_image_resize(
    image: &DynamicImage,
    target_width: u32,
    target_height: u32,
) -> Result<DynamicImage, ImageError> {
    let src = image.to_rgba8();
    let (src_width, src_height) = src.dimensions();

    let src_image =
        fr::images::Image::from_vec_u8(src_width, src_height, src.into_raw(), fr::PixelType::U8x4)
            .map_err(|e| ImageError::Thumbnail(format!("构建源图像缓冲失败：{}", e)))?;

    let mut dst_image = fr::images::Image::new(target_width, target_height, fr::PixelType::U8x4);

    let mut resizer = fr::Resizer::new();
    let options = fr::ResizeOptions::new()
        .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Bilinear));

    resizer
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| ImageError::Thumbnail(format!("fast_image_resize 执行失败：{}", e)))?;

    let rgba = ImageBuffer::<Rgba<u8>, Vec<u8>>::from_raw(
        target_width,
        target_height,
        dst_image.into_vec(),
    )
    .ok_or_else(|| ImageError::Thumbnail("缩略图输出缓冲长度异常".to_string()))?;

    Ok(DynamicImage::ImageRgba8(rgba))
}
