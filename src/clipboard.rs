//! # 剪贴板写入模块
//!
//! ## 设计思路
//!
//! 上传成功后把链接写入剪贴板属于“尽力而为”：失败只记录日志并清空返回的链接，
//! 不影响上传结果。编排器只依赖 `ClipboardWriter` trait，测试中可注入假实现。
//!
//! ## 实现思路
//!
//! - `SystemClipboard` 基于 `arboard`，每次尝试重新打开剪贴板。
//! - 剪贴板常被其他进程短暂占用，失败后按固定间隔有限重试。
//! - 调用方应在阻塞线程中调用（编排器使用 `spawn_blocking`）。

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
#[error("剪贴板错误：{0}")]
pub struct ClipboardError(pub String);

/// 文本剪贴板写入能力。
pub trait ClipboardWriter: Send + Sync {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// 系统剪贴板（arboard）。
#[derive(Debug, Clone)]
pub struct SystemClipboard {
    retries: u32,
    retry_delay: Duration,
}

impl SystemClipboard {
    pub fn new(retries: u32, retry_delay: Duration) -> Self {
        Self {
            retries: retries.max(1),
            retry_delay,
        }
    }

    fn try_set_text(text: &str) -> Result<(), String> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| format!("无法访问剪贴板：{}", e))?;
        clipboard
            .set_text(text.to_string())
            .map_err(|e| format!("写入失败：{}", e))
    }
}

impl Default for SystemClipboard {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(100))
    }
}

impl ClipboardWriter for SystemClipboard {
    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut last_error = None;

        for attempt in 1..=self.retries {
            if attempt > 1 {
                log::debug!("🔄 剪贴板重试 {}/{}", attempt, self.retries);
                std::thread::sleep(self.retry_delay);
            }

            match Self::try_set_text(text) {
                Ok(()) => {
                    log::info!("📋 链接已复制到剪贴板 (尝试 {})", attempt);
                    return Ok(());
                }
                Err(e) => {
                    log::warn!("❌ 剪贴板写入尝试 {} 失败: {}", attempt, e);
                    last_error = Some(e);
                }
            }
        }

        Err(ClipboardError(
            last_error.unwrap_or_else(|| "未知错误".to_string()),
        ))
    }
}
