//! # Lutim 上传模块
//!
//! - `client`：HTTP 请求构建与错误映射
//! - `response`：响应 JSON 解析（宽松，未知字段忽略）
//! - `info`：成功上传的领域记录 `LutimInfo`
//! - `error`：上传错误分类

mod client;
mod error;
mod info;
mod response;

pub use client::{LutimClient, UploadOptions};
pub use error::{UploadError, UploadErrorKind};
pub use info::LutimInfo;
