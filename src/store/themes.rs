// SPDX-License-Identifier: MPL-2.0

use crate::model::{NewTheme, RecordId, Theme, ThemePatch};
use crate::store::{LocalStore, StoreError, Tx};
use once_cell::sync::Lazy;
use serde_json::json;
use tracing::info;

/// Themes seeded into an empty store. The first one starts active.
pub static DEFAULT_THEMES: Lazy<Vec<Theme>> = Lazy::new(|| {
    vec![
        Theme {
            id: 0,
            name: "Dark".into(),
            bg_color: "#121212".into(),
            surface_color: "#1e1e1e".into(),
            text_color: "#f5f5f5".into(),
            secondary_text_color: "#a0a0a0".into(),
            border_color: "#2c2c2c".into(),
            accent_color: "#7c5cff".into(),
            is_active: true,
        },
        Theme {
            id: 0,
            name: "Light".into(),
            bg_color: "#fafafa".into(),
            surface_color: "#ffffff".into(),
            text_color: "#1a1a1a".into(),
            secondary_text_color: "#5c5c5c".into(),
            border_color: "#e0e0e0".into(),
            accent_color: "#5b3cf5".into(),
            is_active: false,
        },
    ]
});

/// Store operations for themes.
///
/// Exactly one theme is active whenever at least one exists; every write
/// that could break that runs in a single transaction.
pub struct ThemeStore<'a> {
    db: &'a LocalStore,
}

impl<'a> ThemeStore<'a> {
    pub fn new(db: &'a LocalStore) -> Self {
        Self { db }
    }

    pub fn list(&self) -> Result<Vec<Theme>, StoreError> {
        self.db.with(|tx| tx.all())
    }

    pub fn get(&self, id: RecordId) -> Result<Theme, StoreError> {
        self.db.with(|tx| tx.get(id))
    }

    pub fn active(&self) -> Result<Theme, StoreError> {
        self.db.with(|tx| {
            tx.query::<Theme>("is_active", true)?
                .into_iter()
                .next()
                .ok_or(StoreError::NotFound {
                    collection: "themes",
                    id: 0,
                })
        })
    }

    /// Add a theme. It starts inactive unless it is the first theme.
    pub fn create(&self, input: &NewTheme) -> Result<Theme, StoreError> {
        self.db.transaction(|tx| {
            let first = tx.count::<Theme>()? == 0;
            tx.create(Theme {
                id: 0,
                name: input.name.trim().to_string(),
                bg_color: input.bg_color.clone(),
                surface_color: input.surface_color.clone(),
                text_color: input.text_color.clone(),
                secondary_text_color: input.secondary_text_color.clone(),
                border_color: input.border_color.clone(),
                accent_color: input.accent_color.clone(),
                is_active: first,
            })
        })
    }

    /// Edit colors or name. Activation only changes through [`activate`](Self::activate).
    pub fn update(&self, id: RecordId, patch: &ThemePatch) -> Result<Theme, StoreError> {
        let patch = serde_json::to_value(patch)?;
        self.db.with(|tx| tx.update(id, &patch))
    }

    /// Make `id` the only active theme
    pub fn activate(&self, id: RecordId) -> Result<Theme, StoreError> {
        self.db.transaction(|tx| activate_in(tx, id))
    }

    /// Delete a theme. Deleting the active theme activates the oldest remaining
    /// one; the last theme cannot be deleted.
    pub fn delete(&self, id: RecordId) -> Result<(), StoreError> {
        self.db.transaction(|tx| {
            let theme: Theme = tx.get(id)?;
            if tx.count::<Theme>()? == 1 {
                return Err(StoreError::Conflict("cannot delete the last theme".into()));
            }

            tx.delete::<Theme>(id)?;
            if theme.is_active
                && let Some(next) = tx.all::<Theme>()?.into_iter().next()
            {
                activate_in(tx, next.id)?;
            }
            Ok(())
        })
    }
}

fn activate_in(tx: &Tx<'_>, id: RecordId) -> Result<Theme, StoreError> {
    tx.get::<Theme>(id)?;
    for theme in tx.query::<Theme>("is_active", true)? {
        if theme.id != id {
            tx.update::<Theme>(theme.id, &json!({ "is_active": false }))?;
        }
    }
    let activated = tx.update(id, &json!({ "is_active": true }))?;
    info!(theme = id, "activated theme");
    Ok(activated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> LocalStore {
        let db = LocalStore::open_in_memory().unwrap();
        db.initialize().unwrap();
        db
    }

    fn active_ids(themes: &ThemeStore<'_>) -> Vec<RecordId> {
        themes
            .list()
            .unwrap()
            .into_iter()
            .filter(|t| t.is_active)
            .map(|t| t.id)
            .collect()
    }

    fn sepia() -> NewTheme {
        NewTheme {
            name: "Sepia".into(),
            bg_color: "#f4ecd8".into(),
            surface_color: "#fbf6ea".into(),
            text_color: "#5b4636".into(),
            secondary_text_color: "#8a7560".into(),
            border_color: "#e0d5bd".into(),
            accent_color: "#a0522d".into(),
        }
    }

    #[test]
    fn activation_switches_exactly_one() {
        let db = store();
        let themes = ThemeStore::new(&db);
        let light = themes
            .list()
            .unwrap()
            .into_iter()
            .find(|t| t.name == "Light")
            .unwrap();

        let activated = themes.activate(light.id).unwrap();
        assert!(activated.is_active);
        assert_eq!(active_ids(&themes), vec![light.id]);
        assert_eq!(themes.active().unwrap().id, light.id);

        // activating the already active theme is harmless
        themes.activate(light.id).unwrap();
        assert_eq!(active_ids(&themes), vec![light.id]);
    }

    #[test]
    fn activating_missing_theme_keeps_current() {
        let db = store();
        let themes = ThemeStore::new(&db);
        let before = themes.active().unwrap();

        assert!(themes.activate(404).unwrap_err().is_not_found());
        assert_eq!(active_ids(&themes), vec![before.id]);
    }

    #[test]
    fn new_themes_start_inactive() {
        let db = store();
        let themes = ThemeStore::new(&db);
        let created = themes.create(&sepia()).unwrap();
        assert!(!created.is_active);
        assert_eq!(active_ids(&themes).len(), 1);
    }

    #[test]
    fn deleting_active_theme_promotes_another() {
        let db = store();
        let themes = ThemeStore::new(&db);
        let dark = themes.active().unwrap();

        themes.delete(dark.id).unwrap();
        let remaining = themes.list().unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining[0].is_active);

        let err = themes.delete(remaining[0].id).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn patch_cannot_touch_activation() {
        let db = store();
        let themes = ThemeStore::new(&db);
        let dark = themes.active().unwrap();

        let updated = themes
            .update(
                dark.id,
                &ThemePatch {
                    accent_color: Some("#ff0066".into()),
                    ..ThemePatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.accent_color, "#ff0066");
        assert!(updated.is_active);
    }
}
