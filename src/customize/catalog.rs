// SPDX-License-Identifier: MPL-2.0

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate item id: {0}")]
    DuplicateItem(String),
    #[error("item {0} has no slot")]
    MissingSlot(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Base look; exactly one is selected
    Variant,
    /// Color scheme; exactly one is selected
    Palette,
    /// Worn in a slot, one per slot
    Accessory,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub category: Category,
    /// Required for accessories, ignored otherwise
    #[serde(default)]
    pub slot: Option<String>,
    /// Longest streak needed to unlock
    #[serde(default)]
    pub unlock_at: u32,
}

/// Static list of cosmetic items for one feature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub name: String,
    pub items: Vec<CatalogItem>,
}

impl Catalog {
    pub fn new(name: impl Into<String>, items: Vec<CatalogItem>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for item in &items {
            if !seen.insert(item.id.as_str()) {
                return Err(CatalogError::DuplicateItem(item.id.clone()));
            }
            if item.category == Category::Accessory && item.slot.is_none() {
                return Err(CatalogError::MissingSlot(item.id.clone()));
            }
        }
        Ok(Self {
            name: name.into(),
            items,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let raw: Catalog = serde_json::from_str(json)?;
        Self::new(raw.name, raw.items)
    }

    pub fn item(&self, id: &str) -> Option<&CatalogItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn by_category(&self, category: Category) -> impl Iterator<Item = &CatalogItem> {
        self.items.iter().filter(move |i| i.category == category)
    }
}

fn item(id: &str, name: &str, category: Category, slot: Option<&str>, unlock_at: u32) -> CatalogItem {
    CatalogItem {
        id: id.into(),
        name: name.into(),
        category,
        slot: slot.map(Into::into),
        unlock_at,
    }
}

fn variant(id: &str, name: &str, unlock_at: u32) -> CatalogItem {
    item(id, name, Category::Variant, None, unlock_at)
}

fn palette(id: &str, name: &str, unlock_at: u32) -> CatalogItem {
    item(id, name, Category::Palette, None, unlock_at)
}

fn accessory(id: &str, name: &str, slot: &str, unlock_at: u32) -> CatalogItem {
    item(id, name, Category::Accessory, Some(slot), unlock_at)
}

static PET: Lazy<Catalog> = Lazy::new(|| Catalog {
    name: "pet".into(),
    items: vec![
        variant("classic", "Classic", 0),
        variant("shadow", "Shadow", 7),
        variant("golden", "Golden", 30),
        palette("midnight", "Midnight", 0),
        palette("sunset", "Sunset", 5),
        palette("aurora", "Aurora", 14),
        accessory("bow_tie", "Bow Tie", "neck", 2),
        accessory("scarf", "Scarf", "neck", 14),
        accessory("party_hat", "Party Hat", "head", 3),
        accessory("crown", "Crown", "head", 21),
        accessory("glasses", "Glasses", "eyes", 5),
        accessory("monocle", "Monocle", "eyes", 10),
    ],
});

static GARDEN: Lazy<Catalog> = Lazy::new(|| Catalog {
    name: "garden".into(),
    items: vec![
        variant("meadow", "Meadow", 0),
        variant("zen", "Zen", 10),
        palette("spring", "Spring", 0),
        palette("autumn", "Autumn", 7),
        accessory("picket_fence", "Picket Fence", "border", 4),
        accessory("hedge", "Hedge", "border", 15),
        accessory("stone_path", "Stone Path", "path", 3),
        accessory("brick_path", "Brick Path", "path", 12),
        accessory("bench", "Bench", "centerpiece", 5),
        accessory("fountain", "Fountain", "centerpiece", 20),
    ],
});

/// Companion pet cosmetics
pub fn pet() -> &'static Catalog {
    &PET
}

/// Study garden decorations
pub fn garden() -> &'static Catalog {
    &GARDEN
}
