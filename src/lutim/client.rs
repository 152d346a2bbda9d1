//! # 上传客户端
//!
//! ## 设计思路
//!
//! `LutimClient` 只负责“一次请求 + 响应解析 + 错误映射”，不做重试，
//! 也不触碰历史记录。重试策略若有需要由调用方决定。
//!
//! ## 实现思路
//!
//! - 请求：`POST {lutim_url}/`，`multipart/form-data`，字段与 Lutim Web 表单一致。
//! - `file` 分片的 MIME 由 `infer` 按文件头嗅探，识别失败回退 `application/octet-stream`。
//! - reqwest 错误统一映射为 `Transport`，非 2xx 状态映射为 `ServiceRejected`。

use std::time::Duration;

use reqwest::Url;
use reqwest::multipart::{Form, Part};

use super::response::{normalized_endpoint, parse_error_message, parse_upload_response};
use super::{LutimInfo, UploadError};
use crate::config::LutimConfig;

/// 随文件一起提交给 Lutim 的选项。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub delete_after_days: u32,
    pub delete_at_first_view: bool,
    pub keep_exif: bool,
    pub encrypt: bool,
}

impl From<&LutimConfig> for UploadOptions {
    fn from(config: &LutimConfig) -> Self {
        Self {
            delete_after_days: config.delete_after_days,
            delete_at_first_view: config.delete_at_first_view,
            keep_exif: config.keep_exif,
            encrypt: config.encrypt,
        }
    }
}

pub struct LutimClient {
    http_client: reqwest::Client,
    endpoint: Url,
    options: UploadOptions,
    request_timeout: Duration,
}

impl LutimClient {
    pub fn new(
        base_url: &str,
        options: UploadOptions,
        request_timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self, UploadError> {
        let base = Url::parse(base_url).map_err(|e| {
            UploadError::ConfigurationUnavailable(format!("Lutim 地址格式错误：{}", e))
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(UploadError::ConfigurationUnavailable(
                "Lutim 地址仅支持 HTTP/HTTPS".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(connect_timeout)
            .user_agent(concat!("lutim-uploader/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UploadError::Transport(format!("无法创建 HTTP 客户端：{}", e)))?;

        Ok(Self {
            http_client,
            endpoint: normalized_endpoint(&base),
            options,
            request_timeout,
        })
    }

    pub fn from_config(config: &LutimConfig) -> Result<Self, UploadError> {
        Self::new(
            &config.lutim_url,
            UploadOptions::from(config),
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
        )
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// 上传已编码的图片，单次尝试。
    pub async fn upload(&self, payload: Vec<u8>, filename: &str) -> Result<LutimInfo, UploadError> {
        if payload.is_empty() {
            return Err(UploadError::InvalidInput("上传内容为空".to_string()));
        }

        let size = payload.len();
        let mime = infer::get(&payload)
            .map(|kind| kind.mime_type())
            .unwrap_or("application/octet-stream");

        log::info!(
            "🚀 开始上传到 Lutim - 地址: {} 文件: {} 大小: {} bytes 类型: {}",
            self.endpoint,
            filename,
            size,
            mime
        );

        let part = Part::bytes(payload)
            .file_name(filename.to_string())
            .mime_str(mime)
            .map_err(|e| UploadError::InvalidInput(format!("无效的 MIME 类型：{}", e)))?;

        let response = self
            .http_client
            .post(self.endpoint.clone())
            .multipart(self.build_form(part))
            .send()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_reqwest_error(e))?;

        if !status.is_success() {
            let message = parse_error_message(&body).unwrap_or_else(|| {
                format!("HTTP {}: {}", status.as_u16(), Self::status_message(status.as_u16()))
            });
            log::warn!("❌ Lutim 返回失败状态 {}：{}", status.as_u16(), message);
            return Err(UploadError::ServiceRejected(message));
        }

        let info = parse_upload_response(&self.endpoint, &body)?;
        log::info!(
            "✅ 上传成功 - short: {} token: {} url: {}",
            info.short(),
            info.redacted_token(),
            info.uri()
        );
        Ok(info)
    }

    fn build_form(&self, file: Part) -> Form {
        let mut form = Form::new()
            .text("format", "json")
            .text("delete-day", self.options.delete_after_days.to_string());
        if self.options.delete_at_first_view {
            form = form.text("first-view", "1");
        }
        if self.options.keep_exif {
            form = form.text("keep-exif", "1");
        }
        if self.options.encrypt {
            form = form.text("crypt", "1");
        }
        form.part("file", file)
    }

    fn map_reqwest_error(&self, e: reqwest::Error) -> UploadError {
        if e.is_timeout() {
            UploadError::Transport(format!("上传超时（{}秒）", self.request_timeout.as_secs()))
        } else if e.is_connect() {
            UploadError::Transport(format!("无法连接：{}", e))
        } else {
            UploadError::Transport(format!("请求失败：{}", e))
        }
    }

    fn status_message(code: u16) -> &'static str {
        match code {
            400 => "请求无效",
            403 => "访问被拒绝",
            404 => "未找到",
            413 => "文件过大",
            500..=599 => "服务器错误",
            _ => "请求失败",
        }
    }
}
