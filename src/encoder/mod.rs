//! # 输出编码模块（encoder）
//!
//! ## 设计思路
//!
//! 上传前的图片编码由 `ImageEncoder` 负责，编排器只依赖该 trait，
//! 宿主可以替换为自己的编码实现。默认实现基于 `image` crate。
//!
//! - `OutputSettings`：单次上传使用的编码参数，按配置快照构建，不可变
//! - `DefaultImageEncoder`：PNG / JPEG / BMP / GIF / TIFF 编码 + 可选减色
//! - `thumbnail`：上传成功后为历史记录生成本地缩略图

mod thumbnail;

use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};

pub use thumbnail::{THUMBNAIL_MAX_HEIGHT, THUMBNAIL_MAX_WIDTH, create_thumbnail};

/// 图片导出、编码、缩略图阶段的错误。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("导出截图失败：{0}")]
    Export(String),

    #[error("图片编码失败：{0}")]
    Encode(String),

    #[error("缩略图生成失败：{0}")]
    Thumbnail(String),
}

/// 上传文件格式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Png,
    Jpeg,
    Bmp,
    Gif,
    Tiff,
}

impl OutputFormat {
    /// 文件扩展名（不含点）。
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Bmp => "bmp",
            Self::Gif => "gif",
            Self::Tiff => "tiff",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Bmp => "image/bmp",
            Self::Gif => "image/gif",
            Self::Tiff => "image/tiff",
        }
    }

    fn image_format(self) -> ImageFormat {
        match self {
            Self::Png => ImageFormat::Png,
            Self::Jpeg => ImageFormat::Jpeg,
            Self::Bmp => ImageFormat::Bmp,
            Self::Gif => ImageFormat::Gif,
            Self::Tiff => ImageFormat::Tiff,
        }
    }
}

/// 单次上传的编码参数。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSettings {
    pub format: OutputFormat,
    /// JPEG 质量（0~100），其他格式忽略。
    pub jpeg_quality: u8,
    /// 是否在编码前减少到 256 色。
    pub reduce_colors: bool,
}

impl OutputSettings {
    pub fn new(format: OutputFormat, jpeg_quality: u8, reduce_colors: bool) -> Self {
        Self {
            format,
            jpeg_quality: jpeg_quality.min(100),
            reduce_colors,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self::new(OutputFormat::Png, 80, false)
    }
}

/// 图片编码器。
///
/// 编码在阻塞线程中执行，因此要求 `Send + Sync`。
pub trait ImageEncoder: Send + Sync {
    fn encode(&self, image: &DynamicImage, settings: &OutputSettings)
    -> Result<Vec<u8>, ImageError>;
}

/// 基于 `image` crate 的默认编码器。
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultImageEncoder;

impl ImageEncoder for DefaultImageEncoder {
    fn encode(
        &self,
        image: &DynamicImage,
        settings: &OutputSettings,
    ) -> Result<Vec<u8>, ImageError> {
        let mut rgba = image.to_rgba8();
        if settings.reduce_colors {
            reduce_to_256_colors(&mut rgba);
        }

        let mut cursor = Cursor::new(Vec::new());
        match settings.format {
            OutputFormat::Jpeg => {
                // JPEG 不支持透明通道
                let rgb = DynamicImage::ImageRgba8(rgba).to_rgb8();
                let quality = settings.jpeg_quality.clamp(1, 100);
                let mut encoder = JpegEncoder::new_with_quality(&mut cursor, quality);
                encoder
                    .encode_image(&rgb)
                    .map_err(|e| ImageError::Encode(format!("JPEG 编码失败：{}", e)))?;
            }
            format => {
                DynamicImage::ImageRgba8(rgba)
                    .write_to(&mut cursor, format.image_format())
                    .map_err(|e| {
                        ImageError::Encode(format!("{} 编码失败：{}", format.extension(), e))
                    })?;
            }
        }

        let bytes = cursor.into_inner();
        log::debug!(
            "🧱 图片编码完成 - 格式: {} 尺寸: {}x{} 大小: {} bytes",
            settings.format.extension(),
            image.width(),
            image.height(),
            bytes.len()
        );
        Ok(bytes)
    }
}

/// 3-3-2 位量化，最多保留 256 种颜色，透明度不变。
fn reduce_to_256_colors(image: &mut RgbaImage) {
    for pixel in image.pixels_mut() {
        pixel[0] &= 0b1110_0000;
        pixel[1] &= 0b1110_0000;
        pixel[2] &= 0b1100_0000;
    }
}
