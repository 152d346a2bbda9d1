//! 单次成功上传的领域记录。

use std::fmt;

use chrono::{DateTime, Utc};
use image::DynamicImage;
use reqwest::Url;

use super::UploadError;

/// 一次成功上传的结果。
///
/// `short` 为服务端分配的唯一标识，用作历史记录键；
/// `token` 是删除/管理远端图片的凭据，日志中只输出 `redacted_token()`。
/// 除缩略图外所有字段创建后不可变。
#[derive(Clone)]
pub struct LutimInfo {
    short: String,
    token: String,
    uri: Url,
    real_short: Option<String>,
    ext: Option<String>,
    filename: Option<String>,
    created_at: DateTime<Utc>,
    delete_at_first_view: bool,
    limit_days: Option<u32>,
    thumbnail: Option<DynamicImage>,
}

impl LutimInfo {
    pub fn new(
        short: impl Into<String>,
        token: impl Into<String>,
        uri: Url,
    ) -> Result<Self, UploadError> {
        let short = short.into();
        let token = token.into();
        if short.trim().is_empty() {
            return Err(UploadError::ProtocolViolation("short 字段为空".to_string()));
        }
        if token.trim().is_empty() {
            return Err(UploadError::ProtocolViolation("token 字段为空".to_string()));
        }

        Ok(Self {
            short,
            token,
            uri,
            real_short: None,
            ext: None,
            filename: None,
            created_at: Utc::now(),
            delete_at_first_view: false,
            limit_days: None,
            thumbnail: None,
        })
    }

    pub fn with_real_short(mut self, real_short: Option<String>) -> Self {
        self.real_short = real_short.filter(|s| !s.is_empty());
        self
    }

    pub fn with_ext(mut self, ext: Option<String>) -> Self {
        self.ext = ext.filter(|s| !s.is_empty());
        self
    }

    pub fn with_filename(mut self, filename: Option<String>) -> Self {
        self.filename = filename.filter(|s| !s.is_empty());
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_delete_at_first_view(mut self, delete_at_first_view: bool) -> Self {
        self.delete_at_first_view = delete_at_first_view;
        self
    }

    pub fn with_limit_days(mut self, limit_days: Option<u32>) -> Self {
        self.limit_days = limit_days;
        self
    }

    pub fn short(&self) -> &str {
        &self.short
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// 日志用的删除凭据摘要，仅保留前 4 个字符。
    pub fn redacted_token(&self) -> String {
        let prefix: String = self.token.chars().take(4).collect();
        format!("{}…", prefix)
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn real_short(&self) -> Option<&str> {
        self.real_short.as_deref()
    }

    pub fn ext(&self) -> Option<&str> {
        self.ext.as_deref()
    }

    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn delete_at_first_view(&self) -> bool {
        self.delete_at_first_view
    }

    pub fn limit_days(&self) -> Option<u32> {
        self.limit_days
    }

    pub fn thumbnail(&self) -> Option<&DynamicImage> {
        self.thumbnail.as_ref()
    }

    pub fn set_thumbnail(&mut self, thumbnail: DynamicImage) {
        self.thumbnail = Some(thumbnail);
    }
}

/// `token` 只输出脱敏摘要，缩略图只输出尺寸。
impl fmt::Debug for LutimInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LutimInfo")
            .field("short", &self.short)
            .field("token", &self.redacted_token())
            .field("uri", &self.uri.as_str())
            .field("real_short", &self.real_short)
            .field("ext", &self.ext)
            .field("filename", &self.filename)
            .field("created_at", &self.created_at)
            .field("delete_at_first_view", &self.delete_at_first_view)
            .field("limit_days", &self.limit_days)
            .field(
                "thumbnail",
                &self.thumbnail.as_ref().map(|t| (t.width(), t.height())),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://lut.im/abc123").expect("valid url")
    }

    #[test]
    fn rejects_empty_short() {
        let result = LutimInfo::new("  ", "tok", url());
        assert!(matches!(result, Err(UploadError::ProtocolViolation(_))));
    }

    #[test]
    fn redacted_token_hides_secret() {
        let info = LutimInfo::new("abc123", "supersecrettoken", url()).expect("valid info");
        assert_eq!(info.redacted_token(), "supe…");
        assert!(!info.redacted_token().contains("secret"));
    }

    #[test]
    fn debug_output_does_not_leak_token() {
        let mut info = LutimInfo::new("abc123", "supersecrettoken", url()).expect("valid info");
        info.set_thumbnail(DynamicImage::new_rgba8(3, 2));

        let debug = format!("{:?}", info);

        assert!(!debug.contains("supersecrettoken"));
        assert!(debug.contains("supe…"));
        assert!(debug.contains("abc123"));
        assert!(debug.contains("(3, 2)"));
    }

    #[test]
    fn empty_optional_fields_are_dropped() {
        let info = LutimInfo::new("abc123", "tok", url())
            .expect("valid info")
            .with_ext(Some(String::new()))
            .with_real_short(Some("real".to_string()));
        assert_eq!(info.ext(), None);
        assert_eq!(info.real_short(), Some("real"));
    }
}
