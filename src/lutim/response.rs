//! # 响应解析
//!
//! Lutim 的 JSON 结构属于外部约定，这里尽量宽松：
//! - 标准信封 `{"success": bool, "msg": {...} | "错误信息"}`
//! - 扁平对象 `{"short": .., "token": .., "url": ..}`
//!
//! 未知字段一律忽略；缺少 `short` / `token` 或 `url` 非法时视为协议错误。
//! `short` 与 `ext` 会拼进地址和历史键，只接受 `[A-Za-z0-9_-]`。

use chrono::{TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Url;
use serde_json::{Map, Value};

use super::{LutimInfo, UploadError};

static SAFE_SEGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("segment regex is valid"));

/// 将成功状态码的响应体解析为 `LutimInfo`。
pub(crate) fn parse_upload_response(endpoint: &Url, body: &str) -> Result<LutimInfo, UploadError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| UploadError::ProtocolViolation(format!("响应不是合法 JSON：{}", e)))?;
    let root = value
        .as_object()
        .ok_or_else(|| UploadError::ProtocolViolation("响应不是 JSON 对象".to_string()))?;

    let payload = match root.get("success") {
        Some(success) => {
            let ok = success.as_bool().ok_or_else(|| {
                UploadError::ProtocolViolation("success 字段不是布尔值".to_string())
            })?;
            if !ok {
                return Err(UploadError::ServiceRejected(message_of(root.get("msg"))));
            }
            root.get("msg")
                .and_then(Value::as_object)
                .ok_or_else(|| UploadError::ProtocolViolation("缺少 msg 对象".to_string()))?
        }
        None => root,
    };

    let short = required_str(payload, "short")?;
    ensure_safe_segment("short", &short)?;
    let token = required_str(payload, "token")?;
    let ext = optional_str(payload, "ext");
    if let Some(ext) = ext.as_deref() {
        ensure_safe_segment("ext", ext)?;
    }

    let uri = match optional_str(payload, "url") {
        Some(url) => Url::parse(&url)
            .map_err(|e| UploadError::ProtocolViolation(format!("url 字段非法：{}", e)))?,
        None => canonical_url(endpoint, &short, ext.as_deref())?,
    };

    let created_at = payload
        .get("created_at")
        .and_then(Value::as_i64)
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(Utc::now);

    let delete_at_first_view = match payload.get("del_at_view") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    };

    let limit_days = payload
        .get("limit")
        .and_then(Value::as_u64)
        .and_then(|days| u32::try_from(days).ok());

    Ok(LutimInfo::new(short, token, uri)?
        .with_real_short(optional_str(payload, "real_short"))
        .with_ext(ext)
        .with_filename(optional_str(payload, "filename"))
        .with_created_at(created_at)
        .with_delete_at_first_view(delete_at_first_view)
        .with_limit_days(limit_days))
}

/// 从失败状态码的响应体中提取服务端错误信息（若为 Lutim 错误信封）。
pub(crate) fn parse_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let root = value.as_object()?;
    if root.get("success").and_then(Value::as_bool) == Some(false) {
        return Some(message_of(root.get("msg")));
    }
    None
}

/// 保证路径以 `/` 结尾，便于后续 `join`。
pub(crate) fn normalized_endpoint(base: &Url) -> Url {
    let mut endpoint = base.clone();
    if !endpoint.path().ends_with('/') {
        let path = format!("{}/", endpoint.path());
        endpoint.set_path(&path);
    }
    endpoint
}

fn canonical_url(endpoint: &Url, short: &str, ext: Option<&str>) -> Result<Url, UploadError> {
    let segment = match ext {
        Some(ext) => format!("{}.{}", short, ext),
        None => short.to_string(),
    };
    normalized_endpoint(endpoint)
        .join(&segment)
        .map_err(|e| UploadError::ProtocolViolation(format!("无法拼接图片地址：{}", e)))
}

fn ensure_safe_segment(key: &str, value: &str) -> Result<(), UploadError> {
    if SAFE_SEGMENT.is_match(value) {
        Ok(())
    } else {
        Err(UploadError::ProtocolViolation(format!("{} 字段包含非法字符：{}", key, value)))
    }
}

fn required_str(payload: &Map<String, Value>, key: &str) -> Result<String, UploadError> {
    optional_str(payload, key)
        .ok_or_else(|| UploadError::ProtocolViolation(format!("缺少必需字段 {}", key)))
}

fn optional_str(payload: &Map<String, Value>, key: &str) -> Option<String> {
    payload
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn message_of(msg: Option<&Value>) -> String {
    match msg {
        Some(Value::String(text)) if !text.trim().is_empty() => text.clone(),
        Some(Value::Null) | None => "未知错误".to_string(),
        Some(other) => other.to_string(),
    }
}
