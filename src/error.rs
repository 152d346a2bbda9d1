//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 各子系统保留自己的错误枚举（`UploadError` / `HistoryError` /
//! `ClipboardError` / `ImageError`），调用边界统一上转为 `AppError`。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 子系统错误通过 `#[from]` 自动转换，无需手动 map。
//! - 实现 `Serialize` 将错误序列化为字符串，方便前端或日志管道直接展示。

use serde::Serialize;

use crate::clipboard::ClipboardError;
use crate::encoder::ImageError;
use crate::history::HistoryError;
use crate::lutim::UploadError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 上传链路错误（配置 / 编码 / 网络 / 协议 / 服务端拒绝）
    #[error("{0}")]
    Upload(#[from] UploadError),

    /// 上传历史存储错误
    #[error("{0}")]
    History(#[from] HistoryError),

    /// 剪贴板读写操作失败
    #[error("{0}")]
    Clipboard(#[from] ClipboardError),

    /// 图片导出或编码失败
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 配置文件读取、解析或校验失败
    #[error("配置错误: {0}")]
    Config(String),

    /// 文件系统 I/O 错误
    #[error("文件系统错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 将错误序列化为人类可读的字符串。
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
