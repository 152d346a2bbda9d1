//! # Lutim 上传工具：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │        宿主（截图工具 / 菜单 / 对话框，不在本库内）        │
//! │   Surface ── CaptureDetails ── 历史菜单启用状态            │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↓ upload / upload_blocking → UploadOutcome
//! ┌───────┼──────────────────────────────────────────────────┐
//! │  uploader ─── 编排：编码 → 上传 → 历史 → 缩略图 → 剪贴板   │
//! │     ├─ encoder    OutputSettings + 图片编码 + 缩略图       │
//! │     ├─ lutim      multipart 上传 + 响应解析 + 错误分类     │
//! │     ├─ history    有界历史映射 + SQLite 落盘               │
//! │     └─ clipboard  链接写入剪贴板（尽力而为）               │
//! │                                                          │
//! │  config ─── LutimConfig（JSON 文件，按次快照）             │
//! │  error  ─── AppError（统一错误类型）                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`uploader`] | 上传编排与分阶段失败隔离、后台执行并等待 |
//! | [`lutim`] | Lutim HTTP 客户端、响应解析、`LutimInfo` |
//! | [`history`] | 上传历史存储（内存有界映射 + SQLite） |
//! | [`encoder`] | 编码参数、默认编码器、缩略图 |
//! | [`capture`] | 截图表面抽象、文件名模板 |
//! | [`clipboard`] | 剪贴板写入抽象与系统实现 |
//! | [`config`] | 配置读写与校验 |
//! | [`error`] | 统一错误类型 `AppError` |

pub mod capture;
pub mod clipboard;
pub mod config;
pub mod encoder;
pub mod error;
pub mod history;
pub mod lutim;
pub mod uploader;
