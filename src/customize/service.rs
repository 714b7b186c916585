// SPDX-License-Identifier: MPL-2.0

use crate::api::{DataClient, DataError};
use crate::customize::{self, Access, Catalog, CustomizationState, NextUnlock};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Persisted selections for one catalog, stored under
/// `customization:{catalog name}`
#[derive(Clone)]
pub struct CustomizationService {
    client: DataClient,
    catalog: Arc<Catalog>,
    state: Arc<Mutex<CustomizationState>>,
}

impl CustomizationService {
    pub async fn load(client: DataClient, catalog: Catalog) -> Result<Self, DataError> {
        let key = state_key(&catalog);
        let state = client
            .load_state::<CustomizationState>(&key)
            .await?
            .unwrap_or_default();
        debug!(catalog = %catalog.name, equipped = state.equipped_items.len(), "loaded customization");
        Ok(Self {
            client,
            catalog: Arc::new(catalog),
            state: Arc::new(Mutex::new(state)),
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub async fn state(&self) -> CustomizationState {
        self.state.lock().await.clone()
    }

    pub fn is_unlocked(&self, item_id: &str, longest_streak: u32, access: Access) -> bool {
        customize::is_unlocked(&self.catalog, item_id, longest_streak, access)
    }

    pub fn next_unlock(&self, longest_streak: u32) -> Option<NextUnlock<'_>> {
        customize::next_unlock(&self.catalog, longest_streak)
    }

    pub async fn equip(
        &self,
        item_id: &str,
        longest_streak: u32,
        access: Access,
    ) -> Result<CustomizationState, DataError> {
        self.update(|catalog, state| {
            customize::equip(catalog, state, item_id, longest_streak, access)
        })
        .await
    }

    pub async fn unequip(&self, item_id: &str) -> Result<CustomizationState, DataError> {
        self.update(|_, state| customize::unequip(state, item_id))
            .await
    }

    pub async fn toggle(
        &self,
        item_id: &str,
        longest_streak: u32,
        access: Access,
    ) -> Result<CustomizationState, DataError> {
        self.update(|catalog, state| {
            customize::toggle(catalog, state, item_id, longest_streak, access)
        })
        .await
    }

    pub async fn select_variant(
        &self,
        item_id: &str,
        longest_streak: u32,
        access: Access,
    ) -> Result<CustomizationState, DataError> {
        self.update(|catalog, state| {
            customize::select_variant(catalog, state, item_id, longest_streak, access)
        })
        .await
    }

    pub async fn select_palette(
        &self,
        item_id: &str,
        longest_streak: u32,
        access: Access,
    ) -> Result<CustomizationState, DataError> {
        self.update(|catalog, state| {
            customize::select_palette(catalog, state, item_id, longest_streak, access)
        })
        .await
    }

    /// Apply `change` to a copy and persist it if it reports a change.
    /// The in-memory state only moves once the save went through.
    async fn update(
        &self,
        change: impl FnOnce(&Catalog, &mut CustomizationState) -> bool,
    ) -> Result<CustomizationState, DataError> {
        let mut state = self.state.lock().await;
        let mut next = state.clone();
        if change(&self.catalog, &mut next) {
            self.client
                .save_state(&state_key(&self.catalog), &next)
                .await?;
            *state = next;
        }
        Ok(state.clone())
    }
}

fn state_key(catalog: &Catalog) -> String {
    format!("customization:{}", catalog.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::customize::{garden, pet};
    use crate::store::{BlobStore, LocalStore};

    fn client() -> DataClient {
        let db = LocalStore::open_in_memory().unwrap();
        db.initialize().unwrap();
        DataClient::offline(db)
    }

    #[tokio::test]
    async fn catalogs_persist_separately() {
        let client = client();
        let pets = CustomizationService::load(client.clone(), pet().clone())
            .await
            .unwrap();
        let gardens = CustomizationService::load(client.clone(), garden().clone())
            .await
            .unwrap();

        pets.equip("party_hat", 3, Access::Standard).await.unwrap();
        gardens
            .select_variant("zen", 10, Access::Standard)
            .await
            .unwrap();

        let blobs = BlobStore::new(client.store());
        let saved_pet: CustomizationState = blobs.get("customization:pet").unwrap().unwrap();
        let saved_garden: CustomizationState =
            blobs.get("customization:garden").unwrap().unwrap();
        assert_eq!(saved_pet.equipped_items["head"], "party_hat");
        assert!(saved_pet.selected_variant.is_none());
        assert_eq!(saved_garden.selected_variant.as_deref(), Some("zen"));
        assert!(saved_garden.equipped_items.is_empty());

        let reloaded = CustomizationService::load(client, pet().clone())
            .await
            .unwrap();
        assert_eq!(reloaded.state().await, saved_pet);
    }

    #[tokio::test]
    async fn locked_equip_writes_nothing() {
        let client = client();
        let pets = CustomizationService::load(client.clone(), pet().clone())
            .await
            .unwrap();

        let state = pets.equip("crown", 3, Access::Standard).await.unwrap();
        assert_eq!(state, CustomizationState::default());
        let saved: Option<CustomizationState> =
            BlobStore::new(client.store()).get("customization:pet").unwrap();
        assert_eq!(saved, None);

        assert_eq!(pets.next_unlock(3).unwrap().item.id, "sunset");
    }

    #[tokio::test]
    async fn toggle_round_trip() {
        let pets = CustomizationService::load(client(), pet().clone())
            .await
            .unwrap();
        let on = pets.toggle("glasses", 5, Access::Standard).await.unwrap();
        assert!(on.is_equipped("glasses"));
        let off = pets.toggle("glasses", 0, Access::Standard).await.unwrap();
        assert!(!off.is_equipped("glasses"));
        assert!(pets.unequip("glasses").await.unwrap().equipped_items.is_empty());
    }
}
