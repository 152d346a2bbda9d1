//! 历史记录持久化子模块
//!
//! ## 职责
//! - 创建/迁移 `lutim_history` 表（`PRAGMA user_version`）
//!   - v1 → v2：`stored_at` 列更名为 `created_at`，保存服务端创建时间
//! - 按插入顺序读取全部条目
//! - 在单个事务中用 `HistoryStore` 的当前内容替换表数据
//!
//! ## 错误语义
//! - 所有 SQLite 错误统一映射为 `HistoryError::Database`

use std::fs;
use std::path::Path;

use rusqlite::{Connection, params};

use super::{HistoryError, HistoryStore};

const SCHEMA_VERSION: i64 = 2;

pub struct HistoryDb {
    conn: Connection,
}

impl HistoryDb {
    pub fn open(path: &Path) -> Result<Self, HistoryError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    HistoryError::Database(format!("创建历史数据库目录失败: {}", e))
                })?;
            }
        }
        log::info!("历史数据库路径: {}", path.display());

        let conn = Connection::open(path)
            .map_err(|e| HistoryError::Database(format!("打开历史数据库失败: {}", e)))?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, HistoryError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| HistoryError::Database(format!("打开内存数据库失败: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, HistoryError> {
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// 按插入顺序读取全部 `(short, record)` 条目。
    pub fn load(&self) -> Result<Vec<(String, String)>, HistoryError> {
        let mut stmt = self
            .conn
            .prepare("SELECT short, record FROM lutim_history ORDER BY seq ASC")
            .map_err(|e| HistoryError::Database(format!("准备查询失败: {}", e)))?;

        let entries = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(|e| HistoryError::Database(format!("查询历史失败: {}", e)))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| HistoryError::Database(format!("读取行失败: {}", e)))?;

        Ok(entries)
    }

    pub fn load_store(&self, capacity: usize) -> Result<HistoryStore, HistoryError> {
        let entries = self.load()?;
        let store = HistoryStore::from_persisted(entries, capacity);
        log::info!("📚 已加载 {} 条上传历史", store.count());
        Ok(store)
    }

    /// 将 `store` 的持久化映射整体写回数据库。
    pub fn flush(&self, store: &HistoryStore) -> Result<(), HistoryError> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| HistoryError::Database(format!("开始事务失败: {}", e)))?;

        tx.execute("DELETE FROM lutim_history", [])
            .map_err(|e| HistoryError::Database(format!("清空历史表失败: {}", e)))?;

        for (short, record) in store.persisted_entries() {
            let created_at = store
                .get(short)
                .map(|info| info.created_at().timestamp_millis())
                .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());
            tx.execute(
                "INSERT INTO lutim_history (short, record, created_at) VALUES (?1, ?2, ?3)",
                params![short, record, created_at],
            )
            .map_err(|e| HistoryError::Database(format!("写入历史记录 {} 失败: {}", short, e)))?;
        }

        tx.commit()
            .map_err(|e| HistoryError::Database(format!("提交事务失败: {}", e)))?;
        log::debug!("💾 上传历史已落盘 - {} 条", store.count());
        Ok(())
    }
}

fn get_user_version(conn: &Connection) -> Result<i64, HistoryError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| HistoryError::Database(format!("读取数据库版本失败: {}", e)))
}

fn set_user_version(conn: &Connection, version: i64) -> Result<(), HistoryError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| HistoryError::Database(format!("写入数据库版本失败: {}", e)))
}

fn create_history_table(conn: &Connection) -> Result<(), HistoryError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS lutim_history (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            short TEXT NOT NULL UNIQUE,
            record TEXT NOT NULL,
            created_at INTEGER NOT NULL
        );",
    )
    .map_err(|e| HistoryError::Database(format!("创建历史表失败: {}", e)))
}

fn migrate_v1_to_v2(conn: &Connection) -> Result<(), HistoryError> {
    conn.execute_batch("ALTER TABLE lutim_history RENAME COLUMN stored_at TO created_at;")
        .map_err(|e| HistoryError::Database(format!("迁移历史表到 v2 失败: {}", e)))?;
    log::info!("🔧 历史表已迁移到 v2");
    Ok(())
}

fn initialize_schema(conn: &Connection) -> Result<(), HistoryError> {
    conn.execute_batch("PRAGMA journal_mode=WAL;")
        .map_err(|e| HistoryError::Database(format!("设置 WAL 模式失败: {}", e)))?;

    let version = get_user_version(conn)?;
    if version > SCHEMA_VERSION {
        return Err(HistoryError::Database(format!(
            "数据库版本 {} 高于当前程序支持的版本 {}",
            version, SCHEMA_VERSION
        )));
    }

    match version {
        1 => migrate_v1_to_v2(conn)?,
        _ => create_history_table(conn)?,
    }
    if version < SCHEMA_VERSION {
        set_user_version(conn, SCHEMA_VERSION)?;
    }
    Ok(())
}
