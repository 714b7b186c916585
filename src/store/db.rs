// SPDX-License-Identifier: MPL-2.0

use crate::model::{Tag, Theme};
use crate::store::schema::{MIGRATIONS, SCHEMA_VERSION};
use crate::store::{DEFAULT_THEMES, PRESET_TAGS, StoreError, Tx};
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Handle to the local database. Cheap to clone; clones share one connection.
#[derive(Clone, Debug)]
pub struct LocalStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl LocalStore {
    /// Open or create the database file at `path`.
    ///
    /// Fails with [`StoreError::Unavailable`] when the platform will not give
    /// us a writable file; callers should fall back to [`open_in_memory`].
    ///
    /// [`open_in_memory`]: LocalStore::open_in_memory
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("failed to create data dir: {}", e))
            })?;
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(StoreError::from_open)?;

        // Touch the file so a read-only location fails now, not mid-operation
        conn.execute_batch("BEGIN IMMEDIATE; COMMIT;")
            .map_err(StoreError::from_open)?;

        debug!(path = %path.display(), "opened local store");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Some(path.to_path_buf()),
        })
    }

    /// Session-only store for when persistent storage is denied
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
            path: None,
        };
        // In-memory stores are always usable without a separate init call
        store.migrate()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_persistent(&self) -> bool {
        self.path.is_some()
    }

    /// Create or upgrade the schema, then seed default themes and tags.
    /// Idempotent: a second call changes nothing.
    pub fn initialize(&self) -> Result<(), StoreError> {
        self.migrate()?;
        self.transaction(|tx| {
            if tx.count::<Theme>()? == 0 {
                for theme in DEFAULT_THEMES.iter() {
                    tx.create(theme.clone())?;
                }
                info!(count = DEFAULT_THEMES.len(), "seeded default themes");
            }

            if tx.count::<Tag>()? == 0 {
                let now = crate::model::now();
                for (name, color) in PRESET_TAGS {
                    tx.create(Tag {
                        id: 0,
                        name: name.to_string(),
                        color: color.to_string(),
                        is_preset: true,
                        created_at: now,
                    })?;
                }
                info!(count = PRESET_TAGS.len(), "seeded preset tags");
            }
            Ok(())
        })
    }

    /// Run schema migrations
    fn migrate(&self) -> Result<(), StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction().map_err(StoreError::from_open)?;

        let version: i32 = tx.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(StoreError::Migration(format!(
                "database version {version} is newer than supported version {SCHEMA_VERSION}"
            )));
        }

        for (from, sql) in MIGRATIONS.iter().enumerate().skip(version as usize) {
            let to = from as i32 + 1;
            tx.execute_batch(sql)
                .map_err(|e| StoreError::Migration(format!("v{from} -> v{to}: {e}")))?;
            tx.pragma_update(None, "user_version", to)?;
            info!(from, to, "migrated local store");
        }

        tx.commit().map_err(StoreError::from_open)?;
        Ok(())
    }

    /// Current schema version as recorded in the database
    pub fn schema_version(&self) -> Result<i32, StoreError> {
        let conn = self.conn();
        Ok(conn.query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    /// Access connection for operations
    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().expect("store lock poisoned")
    }

    /// Run `f` against the connection outside of an explicit transaction
    pub fn with<R>(&self, f: impl FnOnce(&Tx<'_>) -> Result<R, StoreError>) -> Result<R, StoreError> {
        let conn = self.conn();
        f(&Tx::new(&conn))
    }

    /// Run `f` in one transaction: committed if it returns `Ok`, rolled back otherwise
    pub fn transaction<R>(
        &self,
        f: impl FnOnce(&Tx<'_>) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        let result = f(&Tx::new(&tx))?;
        tx.commit()?;
        Ok(result)
    }
}
