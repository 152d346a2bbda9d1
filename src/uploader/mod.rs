//! # 上传编排模块（uploader）
//!
//! ## 设计思路
//!
//! `LutimUploader` 串起整条链路，并对每个阶段的失败做隔离：
//!
//! ```text
//! Preparing   配置快照 + 编码参数 + 文件名          失败 → ConfigurationUnavailable
//!    ↓
//! Uploading   导出位图 → 编码(阻塞线程) → 上传      失败 → (false, "")，历史不变
//!    ↓
//! Persisted   写入 HistoryStore → 通知监听者        重复键只记日志
//!    ↓
//! Enriching   缩略图 → 历史落盘                     失败只记日志
//!    ↓
//! Notifying   复制链接到剪贴板（可选）              失败 → (true, "")
//! ```
//!
//! ## 实现思路
//!
//! - 配置通过 `Arc<RwLock<LutimConfig>>` 注入，单次上传使用同一份快照。
//! - 历史记录由 `Arc<Mutex<HistoryStore>>` 保护，支持并发上传时保持键唯一。
//! - 编码、缩略图、落盘、剪贴板都放到 `spawn_blocking`，不阻塞异步运行时。
//! - `upload_blocking` 给同步宿主使用：后台线程执行，前台阻塞等待。

mod background;

use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

use image::DynamicImage;

use crate::capture::{CaptureDetails, Surface, filename_from_pattern};
use crate::clipboard::{ClipboardError, ClipboardWriter, SystemClipboard};
use crate::config::LutimConfig;
use crate::encoder::{
    DefaultImageEncoder, ImageEncoder, ImageError, THUMBNAIL_MAX_HEIGHT, THUMBNAIL_MAX_WIDTH,
    create_thumbnail,
};
use crate::error::AppError;
use crate::history::{HistoryDb, HistoryError, HistoryStore};
use crate::lutim::{LutimClient, LutimInfo, UploadError, UploadErrorKind};

pub use background::run_and_wait;

/// 展示给用户的通用失败前缀，后面拼接具体原因。
pub const UPLOAD_FAILURE_TEXT: &str = "上传到 Lutim 失败：";
const WAIT_MESSAGE: &str = "正在与 Lutim 通信，请稍候…";

type HistoryListener = Box<dyn Fn(usize) + Send + Sync>;

/// 单次上传的最终结果。
///
/// `success == true` 且 `url` 为空表示“上传成功但链接未能复制到剪贴板”。
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub success: bool,
    pub url: String,
    pub info: Option<LutimInfo>,
    pub error_kind: Option<UploadErrorKind>,
    /// 面向用户的合并错误信息（通用前缀 + 具体原因）。
    pub failure_message: Option<String>,
}

impl UploadOutcome {
    fn succeeded(url: String, info: LutimInfo) -> Self {
        Self {
            success: true,
            url,
            info: Some(info),
            error_kind: None,
            failure_message: None,
        }
    }

    fn failed(error: &UploadError) -> Self {
        Self {
            success: false,
            url: String::new(),
            info: None,
            error_kind: Some(error.kind()),
            failure_message: Some(format!("{} {}", UPLOAD_FAILURE_TEXT, error)),
        }
    }

    pub fn as_tuple(&self) -> (bool, &str) {
        (self.success, self.url.as_str())
    }
}

pub struct LutimUploader {
    config: Arc<RwLock<LutimConfig>>,
    history: Arc<Mutex<HistoryStore>>,
    history_db: Option<Arc<Mutex<HistoryDb>>>,
    encoder: Arc<dyn ImageEncoder>,
    clipboard: Arc<dyn ClipboardWriter>,
    listeners: Mutex<Vec<HistoryListener>>,
}

impl LutimUploader {
    /// 使用默认编码器与系统剪贴板创建编排器，历史记录仅保存在内存中。
    pub fn new(config: LutimConfig) -> Self {
        let clipboard = SystemClipboard::new(
            config.clipboard_retries,
            std::time::Duration::from_millis(config.clipboard_retry_delay_ms),
        );
        let history = HistoryStore::new(config.history_capacity);

        Self {
            config: Arc::new(RwLock::new(config)),
            history: Arc::new(Mutex::new(history)),
            history_db: None,
            encoder: Arc::new(DefaultImageEncoder),
            clipboard: Arc::new(clipboard),
            listeners: Mutex::new(Vec::new()),
        }
    }

    /// 绑定历史数据库：加载已有记录，之后每次成功上传都会落盘。
    pub fn with_history_db(mut self, db: HistoryDb) -> Result<Self, HistoryError> {
        let capacity = {
            let store = self.history.lock().map_err(|_| HistoryError::LockPoisoned)?;
            store.capacity()
        };
        let store = db.load_store(capacity)?;
        self.history = Arc::new(Mutex::new(store));
        self.history_db = Some(Arc::new(Mutex::new(db)));
        Ok(self)
    }

    pub fn with_encoder(mut self, encoder: Arc<dyn ImageEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn ClipboardWriter>) -> Self {
        self.clipboard = clipboard;
        self
    }

    /// 注册历史数量变化监听（宿主据此启用/禁用“历史”菜单）。
    pub fn on_history_changed<F>(&self, listener: F) -> Result<(), HistoryError>
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.listeners
            .lock()
            .map_err(|_| HistoryError::LockPoisoned)?
            .push(Box::new(listener));
        Ok(())
    }

    /// 获取配置快照并校验。
    pub fn config_snapshot(&self) -> Result<LutimConfig, UploadError> {
        let config = self
            .config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| UploadError::ConfigurationUnavailable("配置读取锁已中毒".to_string()))?;
        config
            .validate()
            .map_err(|e| UploadError::ConfigurationUnavailable(e.to_string()))?;
        Ok(config)
    }

    /// 替换当前配置，新配置从下一次上传开始生效。
    pub fn set_config(&self, config: LutimConfig) -> Result<(), AppError> {
        config.validate()?;
        let mut current = self
            .config
            .write()
            .map_err(|_| AppError::Config("配置写入锁已中毒".to_string()))?;
        *current = config;
        Ok(())
    }

    /// 历史记录条数；锁中毒时记录错误并按 0 处理。
    pub fn history_count(&self) -> usize {
        match self.history.lock() {
            Ok(store) => store.count(),
            Err(_) => {
                log::error!("❌ 历史记录锁已中毒，历史数量按 0 处理");
                0
            }
        }
    }

    pub fn has_history(&self) -> bool {
        self.history_count() > 0
    }

    /// 在持锁状态下读取历史记录。
    pub fn with_history<T>(&self, f: impl FnOnce(&HistoryStore) -> T) -> Result<T, HistoryError> {
        let store = self.history.lock().map_err(|_| HistoryError::LockPoisoned)?;
        Ok(f(&store))
    }

    /// 同步入口：后台线程执行上传，当前线程阻塞等待。
    pub fn upload_blocking(
        self: &Arc<Self>,
        details: CaptureDetails,
        surface: Arc<dyn Surface>,
    ) -> UploadOutcome {
        let uploader = Arc::clone(self);
        let task = async move { uploader.upload(&details, surface.as_ref()).await };

        match run_and_wait("Lutim", WAIT_MESSAGE, task) {
            Ok(outcome) => outcome,
            Err(err) => {
                log::error!("❌ 后台上传任务失败 [{}]: {}", err.code(), err);
                UploadOutcome::failed(&err)
            }
        }
    }

    /// 上传截图并记录历史。
    pub async fn upload(&self, details: &CaptureDetails, surface: &dyn Surface) -> UploadOutcome {
        let total_start = Instant::now();

        let (config, bitmap, mut info) = match self.encode_and_upload(details, surface).await {
            Ok(result) => result,
            Err(err) => {
                log::error!("❌ 上传失败 [{}]: {}", err.code(), err);
                return UploadOutcome::failed(&err);
            }
        };
        let upload_elapsed = total_start.elapsed();

        let recorded = self.record_history(info.clone());

        let thumb_start = Instant::now();
        match Self::generate_thumbnail(bitmap).await {
            Ok(thumbnail) => {
                if recorded {
                    self.attach_thumbnail(info.short(), thumbnail.clone());
                }
                info.set_thumbnail(thumbnail);
            }
            Err(err) => log::warn!("⚠️ 缩略图生成失败，历史记录不受影响: {}", err),
        }
        let thumb_elapsed = thumb_start.elapsed();

        if recorded {
            self.flush_history().await;
        }

        let mut url = info.uri().to_string();
        if !url.is_empty() && config.copy_link_to_clipboard {
            if let Err(err) = self.copy_link(url.clone()).await {
                log::warn!("⚠️ 上传成功但链接未能写入剪贴板: {}", err);
                url.clear();
            }
        }

        log::info!(
            "✅ Lutim 上传流程完成 - upload={}ms thumbnail={}ms total={}ms",
            upload_elapsed.as_millis(),
            thumb_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        UploadOutcome::succeeded(url, info)
    }

    async fn encode_and_upload(
        &self,
        details: &CaptureDetails,
        surface: &dyn Surface,
    ) -> Result<(LutimConfig, DynamicImage, LutimInfo), UploadError> {
        let config = self.config_snapshot()?;
        let settings = config.output_settings();
        let filename = filename_from_pattern(&config.filename_pattern, settings.format, details);
        let client = LutimClient::from_config(&config)?;

        let bitmap = surface.export_bitmap()?;
        let encoder = Arc::clone(&self.encoder);
        let (bitmap, payload) = tokio::task::spawn_blocking(move || {
            let payload = encoder.encode(&bitmap, &settings);
            (bitmap, payload)
        })
        .await
        .map_err(|e| UploadError::Encode(format!("编码线程执行失败：{}", e)))?;

        let info = client.upload(payload?, &filename).await?;
        Ok((config, bitmap, info))
    }

    /// 写入历史记录；返回是否真正插入。
    fn record_history(&self, info: LutimInfo) -> bool {
        let short = info.short().to_string();
        log::info!(
            "📝 保存上传历史 - short: {} token: {}",
            short,
            info.redacted_token()
        );

        let count = {
            let mut store = match self.history.lock() {
                Ok(store) => store,
                Err(_) => {
                    log::error!("❌ 历史记录锁已中毒，跳过记录 {}", short);
                    return false;
                }
            };
            match store.add_upload(info) {
                Ok(()) => store.count(),
                Err(HistoryError::DuplicateKey(key)) => {
                    log::error!("❌ 历史记录一致性错误：服务端返回了重复的 short {}", key);
                    return false;
                }
                Err(err) => {
                    log::error!("❌ 写入历史记录失败 {}: {}", short, err);
                    return false;
                }
            }
        };

        self.notify_history_listeners(count);
        true
    }

    fn notify_history_listeners(&self, count: usize) {
        match self.listeners.lock() {
            Ok(listeners) => {
                for listener in listeners.iter() {
                    listener(count);
                }
            }
            Err(_) => log::warn!("⚠️ 历史监听器锁已中毒，跳过通知"),
        }
    }

    fn attach_thumbnail(&self, short: &str, thumbnail: DynamicImage) {
        match self.history.lock() {
            Ok(mut store) => {
                if !store.attach_thumbnail(short, thumbnail) {
                    log::debug!("历史记录 {} 已被淘汰，跳过缩略图", short);
                }
            }
            Err(_) => log::warn!("⚠️ 历史记录锁已中毒，缩略图未附加"),
        }
    }

    async fn generate_thumbnail(bitmap: DynamicImage) -> Result<DynamicImage, ImageError> {
        tokio::task::spawn_blocking(move || {
            create_thumbnail(&bitmap, THUMBNAIL_MAX_WIDTH, THUMBNAIL_MAX_HEIGHT)
        })
        .await
        .map_err(|e| ImageError::Thumbnail(format!("缩略图线程执行失败：{}", e)))?
    }

    /// 历史落盘失败只记录警告，内存中的记录保留，下次成功上传时会再次落盘。
    async fn flush_history(&self) {
        let Some(db) = self.history_db.as_ref().map(Arc::clone) else {
            return;
        };
        let history = Arc::clone(&self.history);

        let result = tokio::task::spawn_blocking(move || -> Result<(), HistoryError> {
            let store = history.lock().map_err(|_| HistoryError::LockPoisoned)?;
            let db = db.lock().map_err(|_| HistoryError::LockPoisoned)?;
            db.flush(&store)
        })
        .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => log::warn!("⚠️ 上传历史落盘失败: {}", err),
            Err(err) => log::warn!("⚠️ 上传历史落盘线程执行失败: {}", err),
        }
    }

    async fn copy_link(&self, url: String) -> Result<(), ClipboardError> {
        let clipboard = Arc::clone(&self.clipboard);
        tokio::task::spawn_blocking(move || clipboard.set_text(&url))
            .await
            .map_err(|e| ClipboardError(format!("线程执行失败：{}", e)))?
    }
}
