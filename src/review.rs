// SPDX-License-Identifier: MPL-2.0

//! Spaced-repetition scheduling for single cards.
//!
//! A deliberately small scheme: the grade sets the card's difficulty, and
//! successful reviews double the interval up to a cap.

use crate::model::{Card, Difficulty};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Longest gap between two reviews of the same card
const MAX_INTERVAL_DAYS: i64 = 180;

/// Minutes until a failed card comes back
const RELEARN_MINUTES: i64 = 10;

/// How well the user recalled a card
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grade {
    Again,
    Hard,
    Good,
    Easy,
}

impl Grade {
    pub fn is_correct(self) -> bool {
        !matches!(self, Grade::Again)
    }
}

/// A card with no schedule yet, or whose scheduled time has passed
pub fn is_due(card: &Card, now: DateTime<Utc>) -> bool {
    card.next_review.is_none_or(|at| at <= now)
}

/// Interval for the `repetitions`-th consecutive successful review
fn interval(grade: Grade, repetitions: u32) -> Duration {
    let doubling = 1i64 << repetitions.saturating_sub(1).min(8);
    let days = match grade {
        Grade::Again => return Duration::minutes(RELEARN_MINUTES),
        Grade::Hard => 1,
        Grade::Good => doubling,
        Grade::Easy => doubling * 2,
    };
    Duration::days(days.min(MAX_INTERVAL_DAYS))
}

/// Apply a review outcome to `card`
pub fn schedule(mut card: Card, grade: Grade, now: DateTime<Utc>) -> Card {
    card.repetitions = if grade.is_correct() {
        card.repetitions.saturating_add(1)
    } else {
        0
    };
    card.difficulty = match grade {
        Grade::Again | Grade::Hard => Difficulty::Hard,
        Grade::Good => Difficulty::Medium,
        Grade::Easy => Difficulty::Easy,
    };
    card.next_review = Some(now + interval(grade, card.repetitions));
    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn card() -> Card {
        Card {
            id: 1,
            deck_id: 1,
            position: 0,
            front: "f".into(),
            back: "b".into(),
            front_image: None,
            back_image: None,
            difficulty: Difficulty::New,
            next_review: None,
            repetitions: 0,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 10, 8, 0, 0).unwrap()
    }

    #[test]
    fn new_cards_are_due() {
        assert!(is_due(&card(), now()));
    }

    #[test]
    fn good_reviews_double_the_interval() {
        let mut c = card();
        let mut gaps = Vec::new();
        for _ in 0..4 {
            c = schedule(c, Grade::Good, now());
            gaps.push((c.next_review.unwrap() - now()).num_days());
        }
        assert_eq!(gaps, [1, 2, 4, 8]);
        assert_eq!(c.difficulty, Difficulty::Medium);
    }

    #[test]
    fn again_resets_progress() {
        let mut c = card();
        c = schedule(c, Grade::Easy, now());
        c = schedule(c, Grade::Again, now());
        assert_eq!(c.repetitions, 0);
        assert_eq!(c.difficulty, Difficulty::Hard);
        assert_eq!(
            c.next_review.unwrap() - now(),
            Duration::minutes(RELEARN_MINUTES)
        );
        assert!(!is_due(&c, now()));
    }

    #[test]
    fn interval_is_capped() {
        let mut c = card();
        c.repetitions = 40;
        let c = schedule(c, Grade::Easy, now());
        assert_eq!(
            (c.next_review.unwrap() - now()).num_days(),
            MAX_INTERVAL_DAYS
        );
    }
}
