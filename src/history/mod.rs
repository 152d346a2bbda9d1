//! # 上传历史模块（history）
//!
//! ## 设计思路
//!
//! `HistoryStore` 是按插入顺序排列、有容量上限的映射：
//! - 持久化映射：`short → 序列化记录`，交给 `HistoryDb` 落盘
//! - 运行时映射：`short → LutimInfo`，供缩略图与展示直接使用
//!
//! 两个映射在每次成功 `add` 之后键集合完全一致；重复键返回错误且不修改任何状态。
//! 超出容量时淘汰最早的记录（两个映射同时删除），但键仍记录在 `seen` 中，
//! 同一个 `short` 在本存储的生命周期内只能插入一次。
//!
//! ## 并发
//!
//! 本类型本身不加锁，编排器通过 `Arc<Mutex<HistoryStore>>` 保证同一时刻只有一个写者。

mod db;
mod record;

use std::collections::{HashMap, HashSet, VecDeque};

use image::DynamicImage;

use crate::lutim::LutimInfo;

pub use db::HistoryDb;
pub use record::{parse_record, serialize_record};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("历史记录键为空")]
    EmptyKey,

    #[error("历史记录键重复: {0}")]
    DuplicateKey(String),

    #[error("历史记录键与记录不一致: 键 {key}，记录 {record}")]
    KeyMismatch { key: String, record: String },

    #[error("{0}")]
    Serialize(String),

    #[error("{0}")]
    Corrupt(String),

    #[error("数据库错误: {0}")]
    Database(String),

    #[error("历史记录锁已中毒")]
    LockPoisoned,
}

pub struct HistoryStore {
    capacity: usize,
    persisted: VecDeque<(String, String)>,
    live: HashMap<String, LutimInfo>,
    seen: HashSet<String>,
}

impl HistoryStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            persisted: VecDeque::new(),
            live: HashMap::new(),
            seen: HashSet::new(),
        }
    }

    /// 由持久化条目重建，无法解析或重复的条目跳过并记录警告。
    pub fn from_persisted<I>(entries: I, capacity: usize) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut store = Self::new(capacity);
        for (short, serialized) in entries {
            let info = match parse_record(&serialized) {
                Ok(info) => info,
                Err(err) => {
                    log::warn!("⚠️ 跳过无法解析的历史记录 {}: {}", short, err);
                    continue;
                }
            };
            if let Err(err) = store.add(short.clone(), serialized, info) {
                log::warn!("⚠️ 跳过历史记录 {}: {}", short, err);
            }
        }
        store
    }

    /// 插入一条记录，同时写入持久化映射与运行时映射。
    pub fn add(
        &mut self,
        short: impl Into<String>,
        serialized: String,
        live: LutimInfo,
    ) -> Result<(), HistoryError> {
        let short = short.into();
        if short.trim().is_empty() {
            return Err(HistoryError::EmptyKey);
        }
        if live.short() != short {
            return Err(HistoryError::KeyMismatch {
                key: short,
                record: live.short().to_string(),
            });
        }
        if self.seen.contains(&short) {
            return Err(HistoryError::DuplicateKey(short));
        }

        self.seen.insert(short.clone());
        self.live.insert(short.clone(), live);
        self.persisted.push_back((short, serialized));
        self.evict_overflow();
        Ok(())
    }

    /// 序列化并插入一次上传结果。
    pub fn add_upload(&mut self, info: LutimInfo) -> Result<(), HistoryError> {
        let serialized = serialize_record(&info)?;
        self.add(info.short().to_string(), serialized, info)
    }

    fn evict_overflow(&mut self) {
        while self.persisted.len() > self.capacity {
            if let Some((short, _)) = self.persisted.pop_front() {
                self.live.remove(&short);
                log::info!("🧹 历史记录超过上限 {}，淘汰最早条目 {}", self.capacity, short);
            }
        }
    }

    pub fn count(&self) -> usize {
        self.persisted.len()
    }

    /// 是否存在历史记录（宿主据此启用“历史”菜单）。
    pub fn has_entries(&self) -> bool {
        !self.persisted.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, short: &str) -> bool {
        self.live.contains_key(short)
    }

    pub fn get(&self, short: &str) -> Option<&LutimInfo> {
        self.live.get(short)
    }

    /// 按插入顺序枚举运行时记录。
    pub fn iter(&self) -> impl Iterator<Item = &LutimInfo> {
        self.persisted
            .iter()
            .filter_map(|(short, _)| self.live.get(short))
    }

    /// 按插入顺序枚举持久化条目。
    pub fn persisted_entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.persisted
            .iter()
            .map(|(short, serialized)| (short.as_str(), serialized.as_str()))
    }

    /// 为已有记录附加缩略图，记录不存在时返回 `false`。
    pub fn attach_thumbnail(&mut self, short: &str, thumbnail: DynamicImage) -> bool {
        match self.live.get_mut(short) {
            Some(info) => {
                info.set_thumbnail(thumbnail);
                true
            }
            None => false,
        }
    }
}
