// SPDX-License-Identifier: MPL-2.0

use crate::model::{self, DeckTag, NewTag, RecordId, Tag};
use crate::store::{LocalStore, StoreError};

/// Tags seeded into an empty store: (name, color)
pub const PRESET_TAGS: &[(&str, &str)] = &[
    ("Important", "#e5484d"),
    ("Difficult", "#f5a524"),
    ("Review Later", "#3e63dd"),
];

/// Store operations for tags
pub struct TagStore<'a> {
    db: &'a LocalStore,
}

impl<'a> TagStore<'a> {
    pub fn new(db: &'a LocalStore) -> Self {
        Self { db }
    }

    pub fn list(&self) -> Result<Vec<Tag>, StoreError> {
        self.db.with(|tx| tx.all())
    }

    pub fn get(&self, id: RecordId) -> Result<Tag, StoreError> {
        self.db.with(|tx| tx.get(id))
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<Tag>, StoreError> {
        let mut found: Vec<Tag> = self.db.with(|tx| tx.query("name", name))?;
        Ok(found.pop())
    }

    /// Create a user tag. A name already in use fails with `Conflict`.
    pub fn create(&self, input: &NewTag) -> Result<Tag, StoreError> {
        self.db.with(|tx| {
            tx.create(Tag {
                id: 0,
                name: input.name.trim().to_string(),
                color: input.color.clone(),
                is_preset: false,
                created_at: model::now(),
            })
        })
    }

    /// Delete a tag and detach it from every deck
    pub fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        self.db.transaction(|tx| {
            tx.delete_where::<DeckTag>("tag_id", id)?;
            tx.delete::<Tag>(id)
        })
    }
}
