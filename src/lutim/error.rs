//! # 上传错误模型
//!
//! 单一枚举承载上传链路的全部失败来源，调用侧可以按 `kind()` 分支匹配，
//! 界面侧只展示 `Display` 文本。

/// 上传失败分类。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadErrorKind {
    /// 配置不可读或不合法，未发起上传。
    ConfigurationUnavailable,
    /// 截图导出或编码失败。
    Encode,
    /// 调用方传入的数据不合法（例如空负载）。
    InvalidInput,
    /// 连接、DNS、超时等网络层失败。
    Transport,
    /// 响应无法解析或缺少必需字段。
    ProtocolViolation,
    /// 服务端明确返回失败。
    ServiceRejected,
    /// 后台执行环境异常（线程创建失败、任务崩溃等）。
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("配置不可用：{0}")]
    ConfigurationUnavailable(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("参数错误：{0}")]
    InvalidInput(String),

    #[error("网络错误：{0}")]
    Transport(String),

    #[error("响应格式错误：{0}")]
    ProtocolViolation(String),

    #[error("服务端拒绝：{0}")]
    ServiceRejected(String),

    #[error("内部错误：{0}")]
    Internal(String),
}

impl UploadError {
    pub fn kind(&self) -> UploadErrorKind {
        match self {
            Self::ConfigurationUnavailable(_) => UploadErrorKind::ConfigurationUnavailable,
            Self::Encode(_) => UploadErrorKind::Encode,
            Self::InvalidInput(_) => UploadErrorKind::InvalidInput,
            Self::Transport(_) => UploadErrorKind::Transport,
            Self::ProtocolViolation(_) => UploadErrorKind::ProtocolViolation,
            Self::ServiceRejected(_) => UploadErrorKind::ServiceRejected,
            Self::Internal(_) => UploadErrorKind::Internal,
        }
    }

    /// 稳定的错误码，用于日志检索。
    pub fn code(&self) -> &'static str {
        match self.kind() {
            UploadErrorKind::ConfigurationUnavailable => "config_unavailable",
            UploadErrorKind::Encode => "encode_failed",
            UploadErrorKind::InvalidInput => "invalid_input",
            UploadErrorKind::Transport => "transport",
            UploadErrorKind::ProtocolViolation => "protocol_violation",
            UploadErrorKind::ServiceRejected => "service_rejected",
            UploadErrorKind::Internal => "internal",
        }
    }
}

impl From<crate::encoder::ImageError> for UploadError {
    fn from(error: crate::encoder::ImageError) -> Self {
        Self::Encode(error.to_string())
    }
}
