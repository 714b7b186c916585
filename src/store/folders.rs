// SPDX-License-Identifier: MPL-2.0

use crate::model::{DeckRecord, Folder, FolderPatch, NewFolder, RecordId};
use crate::store::{LocalStore, StoreError};
use crate::model;
use serde_json::json;
use tracing::debug;

/// Store operations for folders
pub struct FolderStore<'a> {
    db: &'a LocalStore,
}

impl<'a> FolderStore<'a> {
    pub fn new(db: &'a LocalStore) -> Self {
        Self { db }
    }

    pub fn list(&self) -> Result<Vec<Folder>, StoreError> {
        self.db.with(|tx| tx.all())
    }

    pub fn get(&self, id: RecordId) -> Result<Folder, StoreError> {
        self.db.with(|tx| tx.get(id))
    }

    pub fn create(&self, input: &NewFolder) -> Result<Folder, StoreError> {
        self.db.with(|tx| {
            tx.create(Folder {
                id: 0,
                name: input.name.trim().to_string(),
                color: input.color.clone(),
                icon: input.icon.clone(),
                created_at: model::now(),
            })
        })
    }

    pub fn update(&self, id: RecordId, patch: &FolderPatch) -> Result<Folder, StoreError> {
        let patch = serde_json::to_value(patch)?;
        self.db.with(|tx| tx.update(id, &patch))
    }

    /// Delete a folder. Its decks are kept and become unfiled.
    pub fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        self.db.transaction(|tx| {
            let owned: Vec<DeckRecord> = tx.query("folder_id", id)?;
            for deck in &owned {
                tx.update::<DeckRecord>(deck.id, &json!({ "folder_id": null }))?;
            }
            tx.delete::<Folder>(id)?;
            debug!(folder = id, detached = owned.len(), "deleted folder");
            Ok(())
        })
    }
}
