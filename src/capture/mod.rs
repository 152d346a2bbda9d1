//! # 截图来源模块（capture）
//!
//! 宿主的截图表面只需要提供“导出位图”能力，这里用 `Surface` trait 表示。
//! `CaptureDetails` 携带文件名模板需要的元信息。

mod filename;

use std::path::PathBuf;

use chrono::{DateTime, Local};
use image::DynamicImage;

use crate::encoder::ImageError;

pub use filename::{DEFAULT_FILENAME_PATTERN, filename_from_pattern};

/// 可导出为位图的截图表面。
pub trait Surface: Send + Sync {
    fn export_bitmap(&self) -> Result<DynamicImage, ImageError>;
}

impl Surface for DynamicImage {
    fn export_bitmap(&self) -> Result<DynamicImage, ImageError> {
        Ok(self.clone())
    }
}

/// 本地图片文件作为截图表面。
#[derive(Debug, Clone)]
pub struct FileSurface {
    path: PathBuf,
}

impl FileSurface {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Surface for FileSurface {
    fn export_bitmap(&self) -> Result<DynamicImage, ImageError> {
        if !self.path.exists() {
            return Err(ImageError::Export(format!("文件不存在：{}", self.path.display())));
        }
        image::open(&self.path)
            .map_err(|e| ImageError::Export(format!("无法打开图片 {}：{}", self.path.display(), e)))
    }
}

/// 截图元信息。
#[derive(Debug, Clone)]
pub struct CaptureDetails {
    pub title: String,
    pub captured_at: DateTime<Local>,
}

impl CaptureDetails {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            captured_at: Local::now(),
        }
    }

    pub fn with_time(title: impl Into<String>, captured_at: DateTime<Local>) -> Self {
        Self {
            title: title.into(),
            captured_at,
        }
    }
}
