// SPDX-License-Identifier: MPL-2.0

/// Forward migrations. Entry `n` upgrades the database from version `n` to
/// `n + 1`; the current version lives in `PRAGMA user_version`.
pub const MIGRATIONS: &[&str] = &[V1_COLLECTIONS, V2_BLOBS];

pub const SCHEMA_VERSION: i32 = MIGRATIONS.len() as i32;

/// Document collections and their secondary indexes.
/// Index expressions must match `Collection::indexes`.
const V1_COLLECTIONS: &str = r#"
-- folders: user-defined groupings of decks
CREATE TABLE IF NOT EXISTS folders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_folders_name ON folders(json_extract(data, '$.name'));

-- tags: preset and user tags, names are unique
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_name ON tags(json_extract(data, '$.name'));

-- decks: metadata only, cards and tags are separate collections
CREATE TABLE IF NOT EXISTS decks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_decks_folder_id ON decks(json_extract(data, '$.folder_id'));
CREATE INDEX IF NOT EXISTS idx_decks_created_at ON decks(json_extract(data, '$.created_at'));

-- cards: owned by exactly one deck
CREATE TABLE IF NOT EXISTS cards (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_cards_deck_id ON cards(json_extract(data, '$.deck_id'));
CREATE INDEX IF NOT EXISTS idx_cards_next_review ON cards(json_extract(data, '$.next_review'));

-- study_sessions: append-only log
CREATE TABLE IF NOT EXISTS study_sessions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_study_sessions_deck_id ON study_sessions(json_extract(data, '$.deck_id'));
CREATE INDEX IF NOT EXISTS idx_study_sessions_created_at ON study_sessions(json_extract(data, '$.created_at'));

-- deck_tags: deck <-> tag associations
CREATE TABLE IF NOT EXISTS deck_tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_deck_tags_deck_id ON deck_tags(json_extract(data, '$.deck_id'));
CREATE INDEX IF NOT EXISTS idx_deck_tags_tag_id ON deck_tags(json_extract(data, '$.tag_id'));

-- themes: exactly one row has is_active = true
CREATE TABLE IF NOT EXISTS themes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_themes_is_active ON themes(json_extract(data, '$.is_active'));
"#;

/// Named JSON state (streak, customization)
const V2_BLOBS: &str = r#"
CREATE TABLE IF NOT EXISTS blobs (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;
