// SPDX-License-Identifier: MPL-2.0

//! Entity types shared by the local store, the remote API and callers.
//!
//! The JSON shape of every type here is the wire shape: the remote server
//! returns the same documents the local store persists.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// Store-assigned identifier. `0` means "not yet stored".
pub type RecordId = i64;

/// Current time at the precision timestamps are persisted with
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Fixed-width RFC 3339 timestamps so stored values sort lexically.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn format(value: &DateTime<Utc>) -> String {
        value.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(d)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(
            value: &Option<DateTime<Utc>>,
            s: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(dt) => s.serialize_str(&super::format(dt)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            d: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            Option::<String>::deserialize(d)?
                .map(|raw| {
                    DateTime::parse_from_rfc3339(&raw)
                        .map(|dt| dt.with_timezone(&Utc))
                        .map_err(serde::de::Error::custom)
                })
                .transpose()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Folder {
    #[serde(default)]
    pub id: RecordId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    #[serde(default)]
    pub id: RecordId,
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub is_preset: bool,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Deck as persisted: cards and tags live in their own collections
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckRecord {
    #[serde(default)]
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub folder_id: Option<RecordId>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Deck as callers see it, with its tags and its cards in study order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deck {
    pub id: RecordId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub folder_id: Option<RecordId>,
    #[serde(default)]
    pub tag_ids: Vec<RecordId>,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl Deck {
    pub fn assemble(record: DeckRecord, tag_ids: Vec<RecordId>, cards: Vec<Card>) -> Self {
        Self {
            id: record.id,
            title: record.title,
            description: record.description,
            folder_id: record.folder_id,
            tag_ids,
            cards,
            created_at: record.created_at,
        }
    }
}

/// How hard a card has been to recall, derived from its review history
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    New,
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    #[serde(default)]
    pub id: RecordId,
    pub deck_id: RecordId,
    /// Position within the deck, 0-based
    #[serde(default)]
    pub position: u32,
    pub front: String,
    pub back: String,
    /// Data URI
    #[serde(default)]
    pub front_image: Option<String>,
    #[serde(default)]
    pub back_image: Option<String>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, with = "timestamp::option")]
    pub next_review: Option<DateTime<Utc>>,
    /// Consecutive successful reviews
    #[serde(default)]
    pub repetitions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Study,
    Test,
}

/// One finished study or test run. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySession {
    #[serde(default)]
    pub id: RecordId,
    pub deck_id: RecordId,
    pub cards_studied: u32,
    pub cards_correct: u32,
    pub duration_seconds: u32,
    pub session_type: SessionType,
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// Association between a deck and a tag
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckTag {
    #[serde(default)]
    pub id: RecordId,
    pub deck_id: RecordId,
    pub tag_id: RecordId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    #[serde(default)]
    pub id: RecordId,
    pub name: String,
    pub bg_color: String,
    pub surface_color: String,
    pub text_color: String,
    pub secondary_text_color: String,
    pub border_color: String,
    pub accent_color: String,
    #[serde(default)]
    pub is_active: bool,
}

// Inputs and patches

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFolder {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// `Some(None)` clears the icon
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCard {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub front_image: Option<String>,
    #[serde(default)]
    pub back_image: Option<String>,
}

impl NewCard {
    pub fn text(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDeck {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub folder_id: Option<RecordId>,
    #[serde(default)]
    pub tag_ids: Vec<RecordId>,
    #[serde(default)]
    pub cards: Vec<NewCard>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeckPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<Option<RecordId>>,
    /// Replaces the whole tag set when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<RecordId>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub front_image: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub back_image: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudySession {
    pub deck_id: RecordId,
    pub cards_studied: u32,
    pub cards_correct: u32,
    pub duration_seconds: u32,
    pub session_type: SessionType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTheme {
    pub name: String,
    pub bg_color: String,
    pub surface_color: String,
    pub text_color: String,
    pub secondary_text_color: String,
    pub border_color: String,
    pub accent_color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_text_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
}

/// Aggregate over a deck's study sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub sessions: u32,
    pub cards_studied: u32,
    pub cards_correct: u32,
    pub total_seconds: u64,
    /// `cards_correct / cards_studied`, 0.0 when nothing was studied
    pub accuracy: f64,
}

impl SessionStats {
    pub fn from_sessions(sessions: &[StudySession]) -> Self {
        let mut stats = Self::default();
        for session in sessions {
            stats.sessions = stats.sessions.saturating_add(1);
            stats.cards_studied = stats.cards_studied.saturating_add(session.cards_studied);
            stats.cards_correct = stats.cards_correct.saturating_add(session.cards_correct);
            stats.total_seconds = stats
                .total_seconds
                .saturating_add(u64::from(session.duration_seconds));
        }
        if stats.cards_studied > 0 {
            stats.accuracy = f64::from(stats.cards_correct) / f64::from(stats.cards_studied);
        }
        stats
    }
}
