// SPDX-License-Identifier: MPL-2.0

use crate::model::{self, NewStudySession, RecordId, SessionStats, StudySession};
use crate::store::{LocalStore, StoreError};

/// Store operations for the append-only study session log
pub struct SessionStore<'a> {
    db: &'a LocalStore,
}

impl<'a> SessionStore<'a> {
    pub fn new(db: &'a LocalStore) -> Self {
        Self { db }
    }

    pub fn record(&self, input: &NewStudySession) -> Result<StudySession, StoreError> {
        self.db.with(|tx| {
            tx.create(StudySession {
                id: 0,
                deck_id: input.deck_id,
                cards_studied: input.cards_studied,
                cards_correct: input.cards_correct,
                duration_seconds: input.duration_seconds,
                session_type: input.session_type,
                created_at: model::now(),
            })
        })
    }

    /// Sessions for one deck, oldest first
    pub fn list_for_deck(&self, deck_id: RecordId) -> Result<Vec<StudySession>, StoreError> {
        self.db.with(|tx| tx.query("deck_id", deck_id))
    }

    /// Most recent sessions across all decks, newest first
    pub fn recent(&self, limit: usize) -> Result<Vec<StudySession>, StoreError> {
        let mut sessions: Vec<StudySession> = self.db.with(|tx| tx.all())?;
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        sessions.truncate(limit);
        Ok(sessions)
    }

    pub fn stats(&self, deck_id: RecordId) -> Result<SessionStats, StoreError> {
        Ok(SessionStats::from_sessions(&self.list_for_deck(deck_id)?))
    }
}
