//! String-keyed, string-valued persistence
//!
//! Every operation opens its own connection, runs in autocommit or a single
//! transaction, and closes the connection before returning. Nothing is held
//! across the boot sequence, and a crash right after a successful call leaves
//! the database consistent with what the call reported.

use anyhow::{Context, Result};
use log::debug;
#[cfg(any(test, feature = "mock"))]
use mockall::automock;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use std::{path::PathBuf, time::Duration};

/// Value written by `get_or_create` when a key is absent.
pub const DEFAULT_VALUE: &str = "false";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[cfg_attr(any(test, feature = "mock"), automock)]
pub trait KeyValueStore {
    /// Return the value for `key`, inserting `DEFAULT_VALUE` first if absent.
    fn get_or_create(&self, key: &str) -> Result<String>;

    /// Overwrite (or insert) the value for `key`.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Set `key` to `new` only if it currently holds `expected`.
    ///
    /// Returns whether this call performed the transition.
    fn compare_and_set(&self, key: &str, expected: &str, new: &str) -> Result<bool>;
}

/// SQLite-backed key-value table
#[derive(Clone, Debug)]
pub struct SqliteKeyValueStore {
    path: PathBuf,
}

impl SqliteKeyValueStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    fn path(&self) -> &PathBuf {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create database directory: {parent:?}"))?;
        }

        let conn = Connection::open(&self.path)
            .with_context(|| format!("failed to open database: {:?}", self.path))?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .context("failed to set database busy timeout")?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS auth_key_value (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .context("failed to create auth_key_value table")?;

        Ok(conn)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get_or_create(&self, key: &str) -> Result<String> {
        let mut conn = self.connect()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .context("failed to begin transaction")?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT value FROM auth_key_value WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("failed to query key {key}"))?;

        let value = match existing {
            Some(value) => value,
            None => {
                debug!("key {key} absent, creating with default {DEFAULT_VALUE}");
                tx.execute(
                    "INSERT INTO auth_key_value (key, value) VALUES (?1, ?2)",
                    params![key, DEFAULT_VALUE],
                )
                .with_context(|| format!("failed to insert default for key {key}"))?;
                DEFAULT_VALUE.to_string()
            }
        };

        tx.commit().context("failed to commit transaction")?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.connect()?;
        conn.execute(
            "INSERT INTO auth_key_value (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )
        .with_context(|| format!("failed to set key {key}"))?;
        Ok(())
    }

    fn compare_and_set(&self, key: &str, expected: &str, new: &str) -> Result<bool> {
        let conn = self.connect()?;
        let changed = conn
            .execute(
                "UPDATE auth_key_value SET value = ?3 WHERE key = ?1 AND value = ?2",
                params![key, expected, new],
            )
            .with_context(|| format!("failed to compare-and-set key {key}"))?;
        Ok(changed == 1)
    }
}
