// SPDX-License-Identifier: MPL-2.0

use crate::model::{Card, CardPatch, RecordId, timestamp};
use crate::review::{self, Grade};
use crate::store::{LocalStore, StoreError};
use chrono::{DateTime, Utc};

/// Store operations for individual cards
pub struct CardStore<'a> {
    db: &'a LocalStore,
}

impl<'a> CardStore<'a> {
    pub fn new(db: &'a LocalStore) -> Self {
        Self { db }
    }

    pub fn get(&self, id: RecordId) -> Result<Card, StoreError> {
        self.db.with(|tx| tx.get(id))
    }

    /// Cards of a deck in study order
    pub fn list(&self, deck_id: RecordId) -> Result<Vec<Card>, StoreError> {
        let mut cards: Vec<Card> = self.db.with(|tx| tx.query("deck_id", deck_id))?;
        cards.sort_by_key(|c| (c.position, c.id));
        Ok(cards)
    }

    pub fn update(&self, id: RecordId, patch: &CardPatch) -> Result<Card, StoreError> {
        let patch = serde_json::to_value(patch)?;
        self.db.with(|tx| tx.update(id, &patch))
    }

    pub fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        self.db.with(|tx| tx.delete::<Card>(id))
    }

    /// Cards of a deck that are new or whose review time has come, in study order
    pub fn due(&self, deck_id: RecordId, now: DateTime<Utc>) -> Result<Vec<Card>, StoreError> {
        Ok(self
            .list(deck_id)?
            .into_iter()
            .filter(|card| review::is_due(card, now))
            .collect())
    }

    /// Previously reviewed cards across all decks scheduled at or before `now`,
    /// soonest first
    pub fn scheduled_before(&self, now: DateTime<Utc>) -> Result<Vec<Card>, StoreError> {
        self.db
            .with(|tx| tx.query_until("next_review", timestamp::format(&now)))
    }

    /// Apply a review outcome and reschedule the card
    pub fn record_review(
        &self,
        id: RecordId,
        grade: Grade,
        now: DateTime<Utc>,
    ) -> Result<Card, StoreError> {
        self.db.transaction(|tx| {
            let card: Card = tx.get(id)?;
            let reviewed = review::schedule(card, grade, now);
            tx.replace(&reviewed)?;
            Ok(reviewed)
        })
    }
}
