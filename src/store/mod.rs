// SPDX-License-Identifier: MPL-2.0

//! Local persistent store.
//!
//! Every collection is a SQLite table of JSON documents keyed by an
//! auto-incrementing id. Secondary indexes are expression indexes over the
//! document fields, declared once in [`Collection::indexes`] and created by
//! the migrations in `schema.rs`.

mod blobs;
mod cards;
mod collection;
mod db;
mod decks;
mod folders;
mod schema;
mod sessions;
mod tags;
mod themes;

pub use blobs::BlobStore;
pub use cards::CardStore;
pub use collection::Tx;
pub use db::LocalStore;
pub use decks::DeckStore;
pub use folders::FolderStore;
pub use schema::SCHEMA_VERSION;
pub use sessions::SessionStore;
pub use tags::{PRESET_TAGS, TagStore};
pub use themes::{DEFAULT_THEMES, ThemeStore};

use crate::model::{Card, DeckRecord, DeckTag, Folder, RecordId, StudySession, Tag, Theme};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("{collection} {id} not found")]
    NotFound {
        collection: &'static str,
        id: RecordId,
    },
    #[error("persistent storage unavailable: {0}")]
    Unavailable(String),
    #[error("{collection} has no index named {index}")]
    UnknownIndex {
        collection: &'static str,
        index: String,
    },
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("migration error: {0}")]
    Migration(String),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// Classify an error raised while opening or first writing the database
    pub(crate) fn from_open(err: rusqlite::Error) -> Self {
        use rusqlite::ErrorCode;
        match err.sqlite_error_code() {
            Some(
                ErrorCode::CannotOpen
                | ErrorCode::ReadOnly
                | ErrorCode::PermissionDenied
                | ErrorCode::DiskFull
                | ErrorCode::NotADatabase,
            ) => StoreError::Unavailable(err.to_string()),
            _ => StoreError::Database(err),
        }
    }
}

/// Secondary index over one document field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexDef {
    pub name: &'static str,
    /// Results are sorted by the indexed value instead of insertion order
    pub ordering: bool,
}

const fn lookup(name: &'static str) -> IndexDef {
    IndexDef {
        name,
        ordering: false,
    }
}

const fn ordering(name: &'static str) -> IndexDef {
    IndexDef {
        name,
        ordering: true,
    }
}

/// Named collections. Table names are part of the on-disk format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Folders,
    Tags,
    Decks,
    Cards,
    StudySessions,
    DeckTags,
    Themes,
}

impl Collection {
    pub const ALL: [Collection; 7] = [
        Collection::Folders,
        Collection::Tags,
        Collection::Decks,
        Collection::Cards,
        Collection::StudySessions,
        Collection::DeckTags,
        Collection::Themes,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Collection::Folders => "folders",
            Collection::Tags => "tags",
            Collection::Decks => "decks",
            Collection::Cards => "cards",
            Collection::StudySessions => "study_sessions",
            Collection::DeckTags => "deck_tags",
            Collection::Themes => "themes",
        }
    }

    pub fn indexes(self) -> &'static [IndexDef] {
        const FOLDERS: &[IndexDef] = &[lookup("name")];
        const TAGS: &[IndexDef] = &[lookup("name")];
        const DECKS: &[IndexDef] = &[lookup("folder_id"), ordering("created_at")];
        const CARDS: &[IndexDef] = &[lookup("deck_id"), ordering("next_review")];
        const SESSIONS: &[IndexDef] = &[lookup("deck_id"), ordering("created_at")];
        const DECK_TAGS: &[IndexDef] = &[lookup("deck_id"), lookup("tag_id")];
        const THEMES: &[IndexDef] = &[lookup("is_active")];

        match self {
            Collection::Folders => FOLDERS,
            Collection::Tags => TAGS,
            Collection::Decks => DECKS,
            Collection::Cards => CARDS,
            Collection::StudySessions => SESSIONS,
            Collection::DeckTags => DECK_TAGS,
            Collection::Themes => THEMES,
        }
    }

    pub fn index(self, name: &str) -> Result<IndexDef, StoreError> {
        self.indexes()
            .iter()
            .find(|def| def.name == name)
            .copied()
            .ok_or_else(|| StoreError::UnknownIndex {
                collection: self.table(),
                index: name.to_string(),
            })
    }
}

/// A document type stored in one collection
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn id(&self) -> RecordId;
    fn set_id(&mut self, id: RecordId);
}

macro_rules! impl_record {
    ($($ty:ty => $collection:ident),* $(,)?) => {
        $(
            impl Record for $ty {
                const COLLECTION: Collection = Collection::$collection;

                fn id(&self) -> RecordId {
                    self.id
                }

                fn set_id(&mut self, id: RecordId) {
                    self.id = id;
                }
            }
        )*
    };
}

impl_record! {
    Folder => Folders,
    Tag => Tags,
    DeckRecord => Decks,
    Card => Cards,
    StudySession => StudySessions,
    DeckTag => DeckTags,
    Theme => Themes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_collection_has_a_distinct_table() {
        let mut tables: Vec<_> = Collection::ALL.iter().map(|c| c.table()).collect();
        tables.sort();
        tables.dedup();
        assert_eq!(tables.len(), Collection::ALL.len());
    }

    #[test]
    fn unknown_index_is_rejected() {
        let err = Collection::Cards.index("front").unwrap_err();
        assert!(matches!(err, StoreError::UnknownIndex { .. }));
        assert!(Collection::Cards.index("next_review").unwrap().ordering);
    }
}
