// SPDX-License-Identifier: MPL-2.0

use crate::model::{
    self, Card, Deck, DeckPatch, DeckRecord, DeckTag, Folder, NewCard, NewDeck, RecordId,
};
use crate::store::{LocalStore, StoreError, Tx};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use tracing::debug;

/// Store operations for decks, including their cards and tag associations
pub struct DeckStore<'a> {
    db: &'a LocalStore,
}

impl<'a> DeckStore<'a> {
    pub fn new(db: &'a LocalStore) -> Self {
        Self { db }
    }

    /// All decks, oldest first
    pub fn list(&self) -> Result<Vec<Deck>, StoreError> {
        self.db.with(|tx| {
            tx.all::<DeckRecord>()?
                .into_iter()
                .map(|record| assemble(tx, record))
                .collect()
        })
    }

    /// Decks filed under `folder_id`, or unfiled decks for `None`
    pub fn list_in_folder(&self, folder_id: Option<RecordId>) -> Result<Vec<Deck>, StoreError> {
        self.db.with(|tx| {
            tx.query::<DeckRecord>("folder_id", folder_id)?
                .into_iter()
                .map(|record| assemble(tx, record))
                .collect()
        })
    }

    pub fn get(&self, id: RecordId) -> Result<Deck, StoreError> {
        self.db.with(|tx| {
            let record = tx.get(id)?;
            assemble(tx, record)
        })
    }

    /// Create a deck together with its cards and tag associations
    pub fn create(&self, input: &NewDeck) -> Result<Deck, StoreError> {
        self.db.transaction(|tx| {
            let record = tx.create(DeckRecord {
                id: 0,
                title: input.title.trim().to_string(),
                description: input.description.clone(),
                folder_id: input.folder_id,
                created_at: model::now(),
            })?;

            set_tags(tx, record.id, &input.tag_ids)?;
            for (position, card) in input.cards.iter().enumerate() {
                insert_card(tx, record.id, position as u32, card)?;
            }

            debug!(deck = record.id, cards = input.cards.len(), "created deck");
            assemble(tx, record)
        })
    }

    pub fn update(&self, id: RecordId, patch: &DeckPatch) -> Result<Deck, StoreError> {
        self.db.transaction(|tx| {
            let mut fields = Map::new();
            if let Some(title) = &patch.title {
                fields.insert("title".into(), json!(title.trim()));
            }
            if let Some(description) = &patch.description {
                fields.insert("description".into(), json!(description));
            }
            if let Some(folder_id) = patch.folder_id {
                fields.insert("folder_id".into(), json!(folder_id));
            }

            let record: DeckRecord = tx.update(id, &Value::Object(fields))?;
            if let Some(tag_ids) = &patch.tag_ids {
                set_tags(tx, id, tag_ids)?;
            }
            assemble(tx, record)
        })
    }

    /// Delete a deck with its cards and tag associations
    pub fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        self.db.transaction(|tx| {
            tx.delete::<DeckRecord>(id)?;
            let cards = tx.delete_where::<Card>("deck_id", id)?;
            tx.delete_where::<DeckTag>("deck_id", id)?;
            debug!(deck = id, cards, "deleted deck");
            Ok(())
        })
    }

    /// File a deck under another folder, or unfile it with `None`
    pub fn move_to_folder(
        &self,
        id: RecordId,
        folder_id: Option<RecordId>,
    ) -> Result<Deck, StoreError> {
        self.db.transaction(|tx| {
            if let Some(folder_id) = folder_id {
                tx.get::<Folder>(folder_id)?;
            }
            let record: DeckRecord = tx.update(id, &json!({ "folder_id": folder_id }))?;
            assemble(tx, record)
        })
    }

    /// Put the deck's cards in the given order.
    /// `card_ids` must name every card of the deck exactly once.
    pub fn reorder_cards(&self, id: RecordId, card_ids: &[RecordId]) -> Result<Deck, StoreError> {
        self.db.transaction(|tx| {
            let record: DeckRecord = tx.get(id)?;
            let cards: Vec<Card> = tx.query("deck_id", id)?;

            let current: HashSet<RecordId> = cards.iter().map(|c| c.id).collect();
            let requested: HashSet<RecordId> = card_ids.iter().copied().collect();
            if requested.len() != card_ids.len() || requested != current {
                return Err(StoreError::InvalidQuery(format!(
                    "card order must list each of the {} cards of deck {id} once",
                    current.len()
                )));
            }

            for (position, card_id) in card_ids.iter().enumerate() {
                tx.update::<Card>(*card_id, &json!({ "position": position }))?;
            }
            assemble(tx, record)
        })
    }

    /// Append a card at the end of a deck
    pub fn add_card(&self, deck_id: RecordId, input: &NewCard) -> Result<Card, StoreError> {
        self.db.transaction(|tx| {
            tx.get::<DeckRecord>(deck_id)?;
            let position = tx
                .query::<Card>("deck_id", deck_id)?
                .iter()
                .map(|c| c.position + 1)
                .max()
                .unwrap_or(0);
            insert_card(tx, deck_id, position, input)
        })
    }
}

fn insert_card(
    tx: &Tx<'_>,
    deck_id: RecordId,
    position: u32,
    input: &NewCard,
) -> Result<Card, StoreError> {
    tx.create(Card {
        id: 0,
        deck_id,
        position,
        front: input.front.clone(),
        back: input.back.clone(),
        front_image: input.front_image.clone(),
        back_image: input.back_image.clone(),
        difficulty: Default::default(),
        next_review: None,
        repetitions: 0,
    })
}

/// Replace a deck's tag set, keeping first-seen order and dropping repeats
fn set_tags(tx: &Tx<'_>, deck_id: RecordId, tag_ids: &[RecordId]) -> Result<(), StoreError> {
    tx.delete_where::<DeckTag>("deck_id", deck_id)?;
    let mut seen = HashSet::new();
    for tag_id in tag_ids.iter().copied().filter(|id| seen.insert(*id)) {
        tx.create(DeckTag {
            id: 0,
            deck_id,
            tag_id,
        })?;
    }
    Ok(())
}

fn assemble(tx: &Tx<'_>, record: DeckRecord) -> Result<Deck, StoreError> {
    let tag_ids = tx
        .query::<DeckTag>("deck_id", record.id)?
        .into_iter()
        .map(|link| link.tag_id)
        .collect();

    let mut cards: Vec<Card> = tx.query("deck_id", record.id)?;
    cards.sort_by_key(|c| (c.position, c.id));

    Ok(Deck::assemble(record, tag_ids, cards))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewFolder;
    use crate::store::FolderStore;

    fn deck_with_cards(decks: &DeckStore<'_>, fronts: &[&str]) -> Deck {
        decks
            .create(&NewDeck {
                title: "Capitals".into(),
                description: "Europe".into(),
                cards: fronts.iter().map(|f| NewCard::text(*f, "answer")).collect(),
                ..NewDeck::default()
            })
            .unwrap()
    }

    #[test]
    fn create_and_get_round_trip() {
        let db = LocalStore::open_in_memory().unwrap();
        let decks = DeckStore::new(&db);

        let created = deck_with_cards(&decks, &["France", "Spain"]);
        let loaded = decks.get(created.id).unwrap();

        assert_eq!(loaded, created);
        assert_eq!(loaded.cards.len(), 2);
        assert_eq!(loaded.cards[1].position, 1);
    }

    #[test]
    fn delete_cascades_cards_and_tags() {
        let db = LocalStore::open_in_memory().unwrap();
        let decks = DeckStore::new(&db);
        let deck = decks
            .create(&NewDeck {
                title: "Temp".into(),
                tag_ids: vec![1, 2],
                cards: vec![NewCard::text("a", "b")],
                ..NewDeck::default()
            })
            .unwrap();
        let keep = deck_with_cards(&decks, &["kept"]);

        decks.delete(deck.id).unwrap();

        assert!(decks.get(deck.id).unwrap_err().is_not_found());
        assert_eq!(db.with(|tx| tx.count::<Card>()).unwrap(), 1);
        assert_eq!(db.with(|tx| tx.count::<DeckTag>()).unwrap(), 0);
        assert_eq!(decks.get(keep.id).unwrap().cards.len(), 1);
    }

    #[test]
    fn deleting_missing_deck_keeps_everything() {
        let db = LocalStore::open_in_memory().unwrap();
        let decks = DeckStore::new(&db);
        deck_with_cards(&decks, &["x"]);

        assert!(decks.delete(999).unwrap_err().is_not_found());
        assert_eq!(db.with(|tx| tx.count::<Card>()).unwrap(), 1);
    }

    #[test]
    fn reorder_rewrites_positions() {
        let db = LocalStore::open_in_memory().unwrap();
        let decks = DeckStore::new(&db);
        let deck = deck_with_cards(&decks, &["a", "b", "c"]);
        let ids: Vec<_> = deck.cards.iter().map(|c| c.id).collect();

        let reordered = decks
            .reorder_cards(deck.id, &[ids[2], ids[0], ids[1]])
            .unwrap();
        let fronts: Vec<_> = reordered.cards.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, ["c", "a", "b"]);
    }

    #[test]
    fn reorder_rejects_partial_or_repeated_lists() {
        let db = LocalStore::open_in_memory().unwrap();
        let decks = DeckStore::new(&db);
        let deck = deck_with_cards(&decks, &["a", "b"]);
        let ids: Vec<_> = deck.cards.iter().map(|c| c.id).collect();

        assert!(decks.reorder_cards(deck.id, &[ids[0]]).is_err());
        assert!(decks.reorder_cards(deck.id, &[ids[0], ids[0]]).is_err());
        assert_eq!(decks.get(deck.id).unwrap(), deck);
    }

    #[test]
    fn move_to_folder_checks_folder() {
        let db = LocalStore::open_in_memory().unwrap();
        let decks = DeckStore::new(&db);
        let folder = FolderStore::new(&db)
            .create(&NewFolder {
                name: "Geo".into(),
                color: "#0a0".into(),
                icon: None,
            })
            .unwrap();
        let deck = deck_with_cards(&decks, &[]);

        assert!(decks.move_to_folder(deck.id, Some(404)).unwrap_err().is_not_found());

        let moved = decks.move_to_folder(deck.id, Some(folder.id)).unwrap();
        assert_eq!(moved.folder_id, Some(folder.id));
        assert_eq!(decks.list_in_folder(Some(folder.id)).unwrap().len(), 1);
        assert!(decks.list_in_folder(None).unwrap().is_empty());

        let unfiled = decks.move_to_folder(deck.id, None).unwrap();
        assert_eq!(unfiled.folder_id, None);
    }

    #[test]
    fn update_replaces_tags_and_keeps_cards() {
        let db = LocalStore::open_in_memory().unwrap();
        let decks = DeckStore::new(&db);
        let deck = deck_with_cards(&decks, &["a"]);

        let updated = decks
            .update(
                deck.id,
                &DeckPatch {
                    title: Some(" Renamed ".into()),
                    tag_ids: Some(vec![3, 1, 3]),
                    ..DeckPatch::default()
                },
            )
            .unwrap();

        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.tag_ids, vec![3, 1]);
        assert_eq!(updated.cards, deck.cards);
        assert_eq!(updated.description, "Europe");
    }

    #[test]
    fn add_card_appends() {
        let db = LocalStore::open_in_memory().unwrap();
        let decks = DeckStore::new(&db);
        let deck = deck_with_cards(&decks, &["a", "b"]);

        let card = decks.add_card(deck.id, &NewCard::text("c", "d")).unwrap();
        assert_eq!(card.position, 2);
        assert!(decks.add_card(999, &NewCard::text("x", "y")).is_err());
    }
}
