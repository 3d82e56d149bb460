//! Key-value repository contract with SQLite and in-memory backends.
//!
//! # Responsibility
//! - Load and save whole text payloads by key.
//! - Report storage failures as semantic `RepoError`s.
//!
//! # Invariants
//! - `save` replaces the previous value for the key atomically.
//! - `load` of an unknown key is `Ok(None)`, never an error.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage error for the persistence collaborator.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Backend is reachable but its schema or content is unusable.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Key-value persistence contract.
pub trait KvRepository {
    fn load(&self, key: &str) -> RepoResult<Option<String>>;
    fn save(&self, key: &str, value: &str) -> RepoResult<()>;
}

impl<R: KvRepository + ?Sized> KvRepository for &R {
    fn load(&self, key: &str) -> RepoResult<Option<String>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> RepoResult<()> {
        (**self).save(key, value)
    }
}

/// SQLite-backed key-value repository over the `kv_entries` table.
pub struct SqliteKvRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKvRepository<'conn> {
    /// Wraps a migrated connection, rejecting connections without the
    /// `kv_entries` table.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'kv_entries'
            );",
            [],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(RepoError::InvalidData(
                "table `kv_entries` is missing; open the connection via db::open_db".to_string(),
            ));
        }
        Ok(Self { conn })
    }
}

impl KvRepository for SqliteKvRepository<'_> {
    fn load(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn save(&self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO kv_entries (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Process-local repository. Contents are lost on drop.
#[derive(Debug, Default)]
pub struct MemoryKvRepository {
    entries: RefCell<HashMap<String, String>>,
}

impl MemoryKvRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-seeded with one entry.
    pub fn with_entry(key: impl Into<String>, value: impl Into<String>) -> Self {
        let repo = Self::default();
        repo.entries.borrow_mut().insert(key.into(), value.into());
        repo
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl KvRepository for MemoryKvRepository {
    fn load(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, value: &str) -> RepoResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}
