use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::{params, Connection};

/// Process-wide SQLite handle. Opened once at startup and injected into the
/// router state; every store call locks it for one logical operation.
#[derive(Clone)]
pub struct Db {
    conn: Arc<Mutex<Connection>>,
}

impl Db {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory database for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        // Bounded wait for a busy writer instead of an immediate SQLITE_BUSY.
        conn.busy_timeout(Duration::from_millis(5000))?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    pub fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap()
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS contacts (
                id          TEXT PRIMARY KEY,
                name        TEXT NOT NULL,
                notes       TEXT NOT NULL DEFAULT '',
                bookmarked  BOOLEAN NOT NULL DEFAULT 0,
                created_at  TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at  TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );

            CREATE TABLE IF NOT EXISTS contact_methods (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                contact_id TEXT NOT NULL REFERENCES contacts(id) ON DELETE CASCADE,
                type       TEXT NOT NULL,
                value      TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_contacts_name       ON contacts(name);
            CREATE INDEX IF NOT EXISTS idx_contacts_bookmarked ON contacts(bookmarked);
            CREATE INDEX IF NOT EXISTS idx_methods_contact_id  ON contact_methods(contact_id);
            CREATE INDEX IF NOT EXISTS idx_methods_type        ON contact_methods(type);
            "#,
        )?;
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        let conn = self.lock();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM contacts", [], |row| row.get(0))
            .unwrap_or(0);
        count == 0
    }

    /// Insert the fixed starter contacts. Intended for an empty database;
    /// existing rows with the same ids are left untouched.
    pub fn seed(&self) -> Result<()> {
        let contacts = [
            ("seed-001", "张三", "公司同事", true),
            ("seed-002", "李四", "大学同学", false),
            ("seed-003", "王五", "合作伙伴", true),
        ];
        let methods = [
            ("seed-001", "手机号码", "13800138000"),
            ("seed-001", "邮箱地址", "zhangsan@example.com"),
            ("seed-002", "手机号码", "13900139000"),
            ("seed-002", "联系地址", "北京市朝阳区"),
            ("seed-003", "邮箱地址", "wangwu@example.com"),
            ("seed-003", "社交账号", "wangwu_wechat"),
        ];

        let mut conn = self.lock();
        let tx = conn.transaction()?;
        let now = now_timestamp();

        for (id, name, notes, bookmarked) in contacts {
            tx.execute(
                "INSERT OR IGNORE INTO contacts (id, name, notes, bookmarked, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![id, name, notes, bookmarked, now, now],
            )?;
        }
        for (contact_id, kind, value) in methods {
            tx.execute(
                "INSERT OR IGNORE INTO contact_methods (contact_id, type, value) VALUES (?1, ?2, ?3)",
                params![contact_id, kind, value],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

/// RFC 3339 UTC with millisecond precision, e.g. `2026-08-29T08:15:02.412Z`.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
