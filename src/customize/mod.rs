// SPDX-License-Identifier: MPL-2.0

//! Cosmetic items unlocked by streak milestones.
//!
//! One resolver serves every feature; features differ only by catalog.
//! Unlocks gate new equips. Items that are already equipped stay equipped
//! and can still be taken off even if they are locked again.

mod catalog;
mod service;

pub use catalog::{Catalog, CatalogError, CatalogItem, Category, garden, pet};
pub use service::CustomizationService;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Who is asking. Admins see every item as unlocked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Access {
    #[default]
    Standard,
    Admin,
}

/// What the user picked for one catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomizationState {
    pub selected_variant: Option<String>,
    pub selected_palette: Option<String>,
    /// slot -> item id
    pub equipped_items: BTreeMap<String, String>,
}

impl CustomizationState {
    pub fn is_equipped(&self, item_id: &str) -> bool {
        self.equipped_items.values().any(|id| id == item_id)
    }
}

/// The closest locked item and how many more streak days it needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NextUnlock<'a> {
    pub item: &'a CatalogItem,
    pub days_away: u32,
}

/// Unknown items are never unlocked, not even for admins
pub fn is_unlocked(catalog: &Catalog, item_id: &str, longest_streak: u32, access: Access) -> bool {
    catalog
        .item(item_id)
        .is_some_and(|item| access == Access::Admin || longest_streak >= item.unlock_at)
}

/// Equip an accessory, replacing whatever occupies its slot.
/// Returns whether anything changed; locked, unknown or non-accessory items
/// leave the state untouched.
pub fn equip(
    catalog: &Catalog,
    state: &mut CustomizationState,
    item_id: &str,
    longest_streak: u32,
    access: Access,
) -> bool {
    if !is_unlocked(catalog, item_id, longest_streak, access) {
        return false;
    }
    let Some(CatalogItem {
        category: Category::Accessory,
        slot: Some(slot),
        ..
    }) = catalog.item(item_id)
    else {
        return false;
    };

    let previous = state.equipped_items.insert(slot.clone(), item_id.to_string());
    previous.as_deref() != Some(item_id)
}

/// Take an item off, regardless of whether it is unlocked
pub fn unequip(state: &mut CustomizationState, item_id: &str) -> bool {
    let before = state.equipped_items.len();
    state.equipped_items.retain(|_, id| id != item_id);
    state.equipped_items.len() != before
}

/// Unequip if equipped, otherwise try to equip
pub fn toggle(
    catalog: &Catalog,
    state: &mut CustomizationState,
    item_id: &str,
    longest_streak: u32,
    access: Access,
) -> bool {
    if state.is_equipped(item_id) {
        unequip(state, item_id)
    } else {
        equip(catalog, state, item_id, longest_streak, access)
    }
}

fn select(
    catalog: &Catalog,
    category: Category,
    item_id: &str,
    longest_streak: u32,
    access: Access,
) -> Option<String> {
    catalog
        .item(item_id)
        .filter(|item| item.category == category)
        .filter(|_| is_unlocked(catalog, item_id, longest_streak, access))
        .map(|item| item.id.clone())
}

pub fn select_variant(
    catalog: &Catalog,
    state: &mut CustomizationState,
    item_id: &str,
    longest_streak: u32,
    access: Access,
) -> bool {
    match select(catalog, Category::Variant, item_id, longest_streak, access) {
        Some(id) if state.selected_variant.as_ref() != Some(&id) => {
            state.selected_variant = Some(id);
            true
        }
        _ => false,
    }
}

pub fn select_palette(
    catalog: &Catalog,
    state: &mut CustomizationState,
    item_id: &str,
    longest_streak: u32,
    access: Access,
) -> bool {
    match select(catalog, Category::Palette, item_id, longest_streak, access) {
        Some(id) if state.selected_palette.as_ref() != Some(&id) => {
            state.selected_palette = Some(id);
            true
        }
        _ => false,
    }
}

/// Lowest threshold above `longest_streak` across every category.
/// Ties go to the item listed first.
pub fn next_unlock(catalog: &Catalog, longest_streak: u32) -> Option<NextUnlock<'_>> {
    catalog
        .items
        .iter()
        .filter(|item| item.unlock_at > longest_streak)
        .min_by_key(|item| item.unlock_at)
        .map(|item| NextUnlock {
            item,
            days_away: item.unlock_at - longest_streak,
        })
}
