//! 历史记录序列化边界。
//!
//! 持久化形式为 JSON 字符串，缩略图不进入持久化数据（加载后按需重新生成）。

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::HistoryError;
use crate::lutim::LutimInfo;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct HistoryRecord {
    short: String,
    token: String,
    url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    real_short: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ext: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    filename: Option<String>,
    created_at: DateTime<Utc>,
    #[serde(default)]
    delete_at_first_view: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    limit_days: Option<u32>,
}

pub fn serialize_record(info: &LutimInfo) -> Result<String, HistoryError> {
    let record = HistoryRecord {
        short: info.short().to_string(),
        token: info.token().to_string(),
        url: info.uri().to_string(),
        real_short: info.real_short().map(str::to_string),
        ext: info.ext().map(str::to_string),
        filename: info.filename().map(str::to_string),
        created_at: info.created_at(),
        delete_at_first_view: info.delete_at_first_view(),
        limit_days: info.limit_days(),
    };
    serde_json::to_string(&record)
        .map_err(|e| HistoryError::Serialize(format!("序列化历史记录失败: {}", e)))
}

pub fn parse_record(serialized: &str) -> Result<LutimInfo, HistoryError> {
    let record: HistoryRecord = serde_json::from_str(serialized)
        .map_err(|e| HistoryError::Corrupt(format!("解析历史记录失败: {}", e)))?;
    let uri = Url::parse(&record.url)
        .map_err(|e| HistoryError::Corrupt(format!("历史记录 url 非法: {}", e)))?;

    let info = LutimInfo::new(record.short, record.token, uri)
        .map_err(|e| HistoryError::Corrupt(e.to_string()))?
        .with_real_short(record.real_short)
        .with_ext(record.ext)
        .with_filename(record.filename)
        .with_created_at(record.created_at)
        .with_delete_at_first_view(record.delete_at_first_view)
        .with_limit_days(record.limit_days);
    Ok(info)
}
