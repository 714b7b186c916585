// SPDX-License-Identifier: MPL-2.0

use crate::store::{LocalStore, StoreError};
use rusqlite::{OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Named JSON documents for singleton state (streak, customization).
/// Keys are part of the on-disk format and must stay stable.
pub struct BlobStore<'a> {
    db: &'a LocalStore,
}

impl<'a> BlobStore<'a> {
    pub fn new(db: &'a LocalStore) -> Self {
        Self { db }
    }

    /// Read a blob, `None` if it was never written
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        let raw: Option<String> = self.db.with(|tx| {
            Ok(tx
                .conn()
                .query_row("SELECT value FROM blobs WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?)
        })?;

        Ok(raw.map(|r| serde_json::from_str(&r)).transpose()?)
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        let now = chrono::Utc::now().timestamp();

        self.db.with(|tx| {
            tx.conn().execute(
                r#"
                INSERT INTO blobs (key, value, updated_at) VALUES (?1, ?2, ?3)
                ON CONFLICT(key) DO UPDATE SET
                    value = excluded.value,
                    updated_at = excluded.updated_at
                "#,
                params![key, json, now],
            )?;
            Ok(())
        })
    }

    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.db.with(|tx| {
            tx.conn().execute("DELETE FROM blobs WHERE key = ?1", [key])?;
            Ok(())
        })
    }
}
