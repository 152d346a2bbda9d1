//! # 配置模块
//!
//! ## 设计思路
//!
//! 所有可调参数集中在 `LutimConfig`，以 JSON 文件持久化。
//! 上传流程不读取任何全局单例：配置值在构造编排器时注入，
//! 每次上传读取一份快照并先校验，校验失败即视为“配置不可用”。
//!
//! ## 实现思路
//!
//! - `Default` 提供可直接使用的配置（官方实例 `https://lut.im`）。
//! - `load_from_path` 文件不存在时回退默认值，解析失败返回错误。
//! - `validate` 在每次快照时执行，保证上传链路只看到合法参数。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::capture::DEFAULT_FILENAME_PATTERN;
use crate::encoder::{OutputFormat, OutputSettings};
use crate::error::AppError;

pub const DEFAULT_LUTIM_URL: &str = "https://lut.im";

/// Lutim 上传配置。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LutimConfig {
    /// Lutim 实例地址。
    pub lutim_url: String,
    pub upload_format: OutputFormat,
    pub upload_jpeg_quality: u8,
    pub upload_reduce_colors: bool,
    pub filename_pattern: String,
    pub copy_link_to_clipboard: bool,
    /// 服务端保留天数（0 表示不限，取决于实例策略）。
    pub delete_after_days: u32,
    /// 首次查看后删除。
    pub delete_at_first_view: bool,
    pub keep_exif: bool,
    /// 请求服务端加密存储。
    pub encrypt: bool,
    /// 本地历史记录条数上限。
    pub history_capacity: usize,
    /// 上传请求总超时（秒）。
    pub request_timeout_secs: u64,
    /// 建立连接超时（秒）。
    pub connect_timeout_secs: u64,
    /// 写剪贴板失败时最大重试次数。
    pub clipboard_retries: u32,
    pub clipboard_retry_delay_ms: u64,
}

impl Default for LutimConfig {
    fn default() -> Self {
        Self {
            lutim_url: DEFAULT_LUTIM_URL.to_string(),
            upload_format: OutputFormat::Png,
            upload_jpeg_quality: 80,
            upload_reduce_colors: false,
            filename_pattern: DEFAULT_FILENAME_PATTERN.to_string(),
            copy_link_to_clipboard: true,
            delete_after_days: 0,
            delete_at_first_view: false,
            keep_exif: false,
            encrypt: false,
            history_capacity: 100,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            clipboard_retries: 3,
            clipboard_retry_delay_ms: 100,
        }
    }
}

impl LutimConfig {
    /// 从 JSON 文件读取配置；文件不存在时返回默认配置。
    pub fn load_from_path(path: &Path) -> Result<Self, AppError> {
        if !path.exists() {
            log::info!("配置文件不存在，使用默认配置: {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| AppError::Config(format!("解析配置文件失败: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), AppError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(format!("序列化配置失败: {}", e)))?;
        fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let url = reqwest::Url::parse(&self.lutim_url)
            .map_err(|e| AppError::Config(format!("lutim_url 格式错误: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::Config("lutim_url 仅支持 HTTP/HTTPS".to_string()));
        }
        if self.upload_jpeg_quality > 100 {
            return Err(AppError::Config("upload_jpeg_quality 必须在 0~100 之间".to_string()));
        }
        if self.filename_pattern.trim().is_empty() {
            return Err(AppError::Config("filename_pattern 不能为空".to_string()));
        }
        if self.history_capacity == 0 {
            return Err(AppError::Config("history_capacity 必须大于 0".to_string()));
        }
        if !(1..=600).contains(&self.request_timeout_secs) {
            return Err(AppError::Config("request_timeout_secs 必须在 1~600 秒之间".to_string()));
        }
        if !(1..=120).contains(&self.connect_timeout_secs) {
            return Err(AppError::Config("connect_timeout_secs 必须在 1~120 秒之间".to_string()));
        }
        Ok(())
    }

    /// 按当前配置构建本次上传的编码参数。
    pub fn output_settings(&self) -> OutputSettings {
        OutputSettings::new(
            self.upload_format,
            self.upload_jpeg_quality,
            self.upload_reduce_colors,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        LutimConfig::default().validate().expect("default config should be valid");
    }

    #[test]
    fn rejects_non_http_url() {
        let config = LutimConfig {
            lutim_url: "ftp://lut.im".to_string(),
            ..LutimConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let config = LutimConfig {
            upload_jpeg_quality: 101,
            ..LutimConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: LutimConfig =
            serde_json::from_str(r#"{"upload_format":"jpeg","copy_link_to_clipboard":false}"#)
                .expect("parse failed");
        assert_eq!(config.upload_format, OutputFormat::Jpeg);
        assert!(!config.copy_link_to_clipboard);
        assert_eq!(config.lutim_url, DEFAULT_LUTIM_URL);
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let path = dir.path().join("nested").join("lutim.json");
        let config = LutimConfig {
            upload_format: OutputFormat::Jpeg,
            upload_jpeg_quality: 55,
            history_capacity: 7,
            ..LutimConfig::default()
        };

        config.save_to_path(&path).expect("save failed");
        let loaded = LutimConfig::load_from_path(&path).expect("load failed");
        assert_eq!(loaded, config);
    }

    #[test]
    fn missing_file_yields_default() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let loaded =
            LutimConfig::load_from_path(&dir.path().join("absent.json")).expect("load failed");
        assert_eq!(loaded, LutimConfig::default());
    }

    #[test]
    fn output_settings_follow_config() {
        let config = LutimConfig {
            upload_format: OutputFormat::Jpeg,
            upload_jpeg_quality: 42,
            upload_reduce_colors: true,
            ..LutimConfig::default()
        };
        let settings = config.output_settings();
        assert_eq!(settings, OutputSettings::new(OutputFormat::Jpeg, 42, true));
    }
}
