//! 文件名模板展开。
//!
//! 支持的占位符：`${title}`、`${capturetime}`、`${YYYY}`、`${MM}`、`${DD}`、
//! `${hh}`、`${mm}`、`${ss}`。未知占位符原样保留。

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::CaptureDetails;
use crate::encoder::OutputFormat;

pub const DEFAULT_FILENAME_PATTERN: &str = "${capturetime}_${title}";

const MAX_STEM_CHARS: usize = 120;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([A-Za-z]+)\}").expect("placeholder regex is valid"));

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("unsafe char regex is valid"));

/// 按模板生成上传文件名（只含文件名，不含目录）。
pub fn filename_from_pattern(
    pattern: &str,
    format: OutputFormat,
    details: &CaptureDetails,
) -> String {
    let time = details.captured_at;
    let expanded = PLACEHOLDER.replace_all(pattern, |caps: &Captures| match &caps[1] {
        "title" => details.title.clone(),
        "capturetime" => time.format("%Y-%m-%d %H_%M_%S").to_string(),
        "YYYY" => time.format("%Y").to_string(),
        "MM" => time.format("%m").to_string(),
        "DD" => time.format("%d").to_string(),
        "hh" => time.format("%H").to_string(),
        "mm" => time.format("%M").to_string(),
        "ss" => time.format("%S").to_string(),
        _ => caps[0].to_string(),
    });

    let sanitized = UNSAFE_CHARS.replace_all(&expanded, "_");
    let stem: String = sanitized
        .trim()
        .trim_matches('.')
        .chars()
        .take(MAX_STEM_CHARS)
        .collect();
    let stem = if stem.is_empty() { "screenshot".to_string() } else { stem };

    format!("{}.{}", stem, format.extension())
}
