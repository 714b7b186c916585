// SPDX-License-Identifier: MPL-2.0

use crate::model::RecordId;
use crate::store::{IndexDef, Record, StoreError};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, ErrorCode, OptionalExtension, params};
use serde_json::{Map, Value};

/// Generic collection operations over one connection or open transaction.
///
/// Obtained through [`LocalStore::with`](super::LocalStore::with) or
/// [`LocalStore::transaction`](super::LocalStore::transaction).
pub struct Tx<'c> {
    conn: &'c Connection,
}

impl<'c> Tx<'c> {
    pub(crate) fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Insert a record, assigning it the next id of its collection
    pub fn create<T: Record>(&self, record: T) -> Result<T, StoreError> {
        let data = encode(&record)?;
        let table = T::COLLECTION.table();

        self.conn
            .execute(&format!("INSERT INTO {table} (data) VALUES (?1)"), [&data])
            .map_err(|e| write_error(e, table))?;

        // Hand back exactly what a later read will see
        decode(self.conn.last_insert_rowid(), &data)
    }

    pub fn get<T: Record>(&self, id: RecordId) -> Result<T, StoreError> {
        self.find(id)?.ok_or(StoreError::NotFound {
            collection: T::COLLECTION.table(),
            id,
        })
    }

    pub fn find<T: Record>(&self, id: RecordId) -> Result<Option<T>, StoreError> {
        let table = T::COLLECTION.table();
        let data: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT data FROM {table} WHERE id = ?1"),
                [id],
                |row| row.get(0),
            )
            .optional()?;

        data.map(|d| decode(id, &d)).transpose()
    }

    /// All records in insertion order
    pub fn all<T: Record>(&self) -> Result<Vec<T>, StoreError> {
        let table = T::COLLECTION.table();
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id, data FROM {table} ORDER BY id ASC"))?;
        collect_rows(stmt.query([])?)
    }

    /// Records whose indexed field equals `value`.
    ///
    /// Insertion order, unless the index is an ordering index, in which case
    /// results are sorted by the indexed value (ties by insertion order).
    pub fn query<T: Record>(
        &self,
        index: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<T>, StoreError> {
        let def = T::COLLECTION.index(index)?;
        let table = T::COLLECTION.table();
        let order = order_clause(def);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, data FROM {table} WHERE json_extract(data, '$.{}') IS ?1 {order}",
            def.name
        ))?;
        collect_rows(stmt.query([to_sql(value.into())?])?)
    }

    /// Records whose ordering index value is `<= bound`, sorted by it
    pub fn query_until<T: Record>(
        &self,
        index: &str,
        bound: impl Into<Value>,
    ) -> Result<Vec<T>, StoreError> {
        let def = T::COLLECTION.index(index)?;
        if !def.ordering {
            return Err(StoreError::InvalidQuery(format!(
                "{index} is not an ordering index"
            )));
        }
        let table = T::COLLECTION.table();
        let order = order_clause(def);
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, data FROM {table} \
             WHERE json_extract(data, '$.{0}') IS NOT NULL AND json_extract(data, '$.{0}') <= ?1 {order}",
            def.name
        ))?;
        collect_rows(stmt.query([to_sql(bound.into())?])?)
    }

    /// Merge `patch` into the stored document field by field.
    /// A `null` field in the patch sets that field to null.
    pub fn update<T: Record>(&self, id: RecordId, patch: &Value) -> Result<T, StoreError> {
        let Value::Object(fields) = patch else {
            return Err(StoreError::InvalidQuery("patch must be a JSON object".into()));
        };

        let table = T::COLLECTION.table();
        let data: String = self
            .conn
            .query_row(
                &format!("SELECT data FROM {table} WHERE id = ?1"),
                [id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::NotFound {
                collection: table,
                id,
            })?;

        let mut doc: Map<String, Value> = serde_json::from_str(&data)?;
        for (key, value) in fields {
            if key != "id" {
                doc.insert(key.clone(), value.clone());
            }
        }

        // Round-trip through the typed record so a bad patch never reaches disk
        let record: T = decode(id, &serde_json::to_string(&doc)?)?;
        self.write(id, &record)?;
        Ok(record)
    }

    /// Overwrite a stored record with `record`
    pub fn replace<T: Record>(&self, record: &T) -> Result<(), StoreError> {
        self.write(record.id(), record)
    }

    fn write<T: Record>(&self, id: RecordId, record: &T) -> Result<(), StoreError> {
        let table = T::COLLECTION.table();
        let changed = self
            .conn
            .execute(
                &format!("UPDATE {table} SET data = ?1 WHERE id = ?2"),
                params![encode(record)?, id],
            )
            .map_err(|e| write_error(e, table))?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                collection: table,
                id,
            });
        }
        Ok(())
    }

    pub fn delete<T: Record>(&self, id: RecordId) -> Result<(), StoreError> {
        let table = T::COLLECTION.table();
        let changed = self
            .conn
            .execute(&format!("DELETE FROM {table} WHERE id = ?1"), [id])?;

        if changed == 0 {
            return Err(StoreError::NotFound {
                collection: table,
                id,
            });
        }
        Ok(())
    }

    /// Delete every record matching an index value, returning how many went
    pub fn delete_where<T: Record>(
        &self,
        index: &str,
        value: impl Into<Value>,
    ) -> Result<usize, StoreError> {
        let def = T::COLLECTION.index(index)?;
        let table = T::COLLECTION.table();
        let removed = self.conn.execute(
            &format!(
                "DELETE FROM {table} WHERE json_extract(data, '$.{}') IS ?1",
                def.name
            ),
            [to_sql(value.into())?],
        )?;
        Ok(removed)
    }

    pub fn count<T: Record>(&self) -> Result<usize, StoreError> {
        let table = T::COLLECTION.table();
        let count: i64 =
            self.conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                    row.get(0)
                })?;
        Ok(count as usize)
    }

    pub(crate) fn conn(&self) -> &Connection {
        self.conn
    }
}

fn order_clause(def: IndexDef) -> String {
    if def.ordering {
        format!("ORDER BY json_extract(data, '$.{}') ASC, id ASC", def.name)
    } else {
        "ORDER BY id ASC".to_string()
    }
}

fn collect_rows<T: Record>(mut rows: rusqlite::Rows<'_>) -> Result<Vec<T>, StoreError> {
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let id: RecordId = row.get(0)?;
        let data: String = row.get(1)?;
        records.push(decode(id, &data)?);
    }
    Ok(records)
}

/// Documents are stored without their id; the row id is authoritative
fn encode<T: Record>(record: &T) -> Result<String, StoreError> {
    let mut value = serde_json::to_value(record)?;
    if let Value::Object(fields) = &mut value {
        fields.remove("id");
    }
    Ok(serde_json::to_string(&value)?)
}

fn decode<T: Record>(id: RecordId, data: &str) -> Result<T, StoreError> {
    let mut record: T = serde_json::from_str(data)?;
    record.set_id(id);
    Ok(record)
}

/// Map a JSON scalar to the value `json_extract` would yield for it
fn to_sql(value: Value) -> Result<SqlValue, StoreError> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s),
        other => {
            return Err(StoreError::InvalidQuery(format!(
                "cannot query by non-scalar value {other}"
            )));
        }
    })
}

fn write_error(err: rusqlite::Error, table: &'static str) -> StoreError {
    match err.sqlite_error_code() {
        Some(ErrorCode::ConstraintViolation) => {
            StoreError::Conflict(format!("duplicate value in {table}"))
        }
        _ => StoreError::Database(err),
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{Card, DeckTag, Difficulty, Folder};
    use crate::store::{LocalStore, StoreError};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    fn folder(name: &str) -> Folder {
        Folder {
            id: 0,
            name: name.into(),
            color: "#336699".into(),
            icon: Some("book".into()),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    fn card(deck_id: i64, front: &str) -> Card {
        Card {
            id: 0,
            deck_id,
            position: 0,
            front: front.into(),
            back: "back".into(),
            front_image: None,
            back_image: None,
            difficulty: Difficulty::New,
            next_review: None,
            repetitions: 0,
        }
    }

    #[test]
    fn create_then_get_round_trips() {
        let store = LocalStore::open_in_memory().unwrap();
        let created = store.with(|tx| tx.create(folder("Languages"))).unwrap();
        assert!(created.id > 0);

        let loaded: Folder = store.with(|tx| tx.get(created.id)).unwrap();
        assert_eq!(loaded, created);
    }

    #[test]
    fn ids_are_monotonic_per_collection() {
        let store = LocalStore::open_in_memory().unwrap();
        let a = store.with(|tx| tx.create(folder("a"))).unwrap();
        let b = store.with(|tx| tx.create(folder("b"))).unwrap();
        store.with(|tx| tx.delete::<Folder>(b.id)).unwrap();
        let c = store.with(|tx| tx.create(folder("c"))).unwrap();
        assert!(a.id < b.id && b.id < c.id);
    }

    #[test]
    fn missing_record_is_not_found() {
        let store = LocalStore::open_in_memory().unwrap();
        let err = store.with(|tx| tx.get::<Folder>(42)).unwrap_err();
        assert!(err.is_not_found());

        let err = store
            .with(|tx| tx.update::<Folder>(42, &json!({"name": "x"})))
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn update_merges_fields_and_nulls() {
        let store = LocalStore::open_in_memory().unwrap();
        let created = store.with(|tx| tx.create(folder("Old"))).unwrap();

        let updated: Folder = store
            .with(|tx| tx.update(created.id, &json!({"name": "New", "icon": null, "id": 99})))
            .unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "New");
        assert_eq!(updated.color, created.color);
        assert!(updated.icon.is_none());
    }

    #[test]
    fn update_rejects_ill_typed_patch() {
        let store = LocalStore::open_in_memory().unwrap();
        let created = store.with(|tx| tx.create(folder("Old"))).unwrap();

        let err = store
            .with(|tx| tx.update::<Folder>(created.id, &json!({"name": 5})))
            .unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));

        let loaded: Folder = store.with(|tx| tx.get(created.id)).unwrap();
        assert_eq!(loaded.name, "Old");
    }

    #[test]
    fn query_by_lookup_index_keeps_insertion_order() {
        let store = LocalStore::open_in_memory().unwrap();
        store
            .with(|tx| {
                tx.create(card(1, "one"))?;
                tx.create(card(2, "other deck"))?;
                tx.create(card(1, "two"))?;
                Ok(())
            })
            .unwrap();

        let cards: Vec<Card> = store.with(|tx| tx.query("deck_id", 1)).unwrap();
        let fronts: Vec<_> = cards.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, ["one", "two"]);
    }

    #[test]
    fn ordering_index_sorts_by_value() {
        let store = LocalStore::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        store
            .with(|tx| {
                let mut late = card(1, "late");
                late.next_review = Some(now + Duration::days(3));
                let mut early = card(1, "early");
                early.next_review = Some(now + Duration::hours(1));
                tx.create(late)?;
                tx.create(early)?;
                tx.create(card(1, "never"))?;
                Ok(())
            })
            .unwrap();

        let due: Vec<Card> = store
            .with(|tx| {
                tx.query_until(
                    "next_review",
                    crate::model::timestamp::format(&(now + Duration::days(7))),
                )
            })
            .unwrap();
        let fronts: Vec<_> = due.iter().map(|c| c.front.as_str()).collect();
        assert_eq!(fronts, ["early", "late"]);
    }

    #[test]
    fn query_null_matches_missing_reference() {
        let store = LocalStore::open_in_memory().unwrap();
        store
            .with(|tx| {
                tx.create(crate::model::DeckRecord {
                    id: 0,
                    title: "loose".into(),
                    description: String::new(),
                    folder_id: None,
                    created_at: Utc::now(),
                })
            })
            .unwrap();

        let loose: Vec<crate::model::DeckRecord> = store
            .with(|tx| tx.query("folder_id", serde_json::Value::Null))
            .unwrap();
        assert_eq!(loose.len(), 1);
    }

    #[test]
    fn delete_where_and_count() {
        let store = LocalStore::open_in_memory().unwrap();
        store
            .with(|tx| {
                for tag_id in [1, 2, 3] {
                    tx.create(DeckTag {
                        id: 0,
                        deck_id: 7,
                        tag_id,
                    })?;
                }
                tx.create(DeckTag {
                    id: 0,
                    deck_id: 8,
                    tag_id: 1,
                })?;
                Ok(())
            })
            .unwrap();

        let removed = store
            .with(|tx| tx.delete_where::<DeckTag>("deck_id", 7))
            .unwrap();
        assert_eq!(removed, 3);
        assert_eq!(store.with(|tx| tx.count::<DeckTag>()).unwrap(), 1);
    }
}
