//! Catalog seams: the external shop and achievement collaborators.
//!
//! The ledger never trusts caller-supplied amounts. Costs and rewards are
//! read from these catalogs at debit/claim time; catalog CRUD itself lives
//! outside this subsystem.

use std::collections::BTreeMap;
use std::sync::Mutex;

use questline_store::StoreError;
use questline_types::{AchievementDef, AchievementId, ItemId, ShopItem};

/// Authoritative source of purchasable items.
pub trait ShopCatalog: Send + Sync {
    /// Looks up an item. `None` for unknown IDs; visibility filtering is the
    /// orchestrator's job so hidden items produce the same error as unknown
    /// ones.
    fn item(&self, id: &ItemId) -> Result<Option<ShopItem>, StoreError>;
}

/// Authoritative source of achievement definitions.
pub trait AchievementCatalog: Send + Sync {
    fn achievement(&self, id: &AchievementId) -> Result<Option<AchievementDef>, StoreError>;
}

/// In-memory shop catalog for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryShopCatalog {
    items: Mutex<BTreeMap<ItemId, ShopItem>>,
}

impl MemoryShopCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an item.
    pub fn put(&self, item: ShopItem) {
        if let Ok(mut items) = self.items.lock() {
            items.insert(item.id.clone(), item);
        }
    }
}

impl ShopCatalog for MemoryShopCatalog {
    fn item(&self, id: &ItemId) -> Result<Option<ShopItem>, StoreError> {
        let items = self
            .items
            .lock()
            .map_err(|_| StoreError::Backend("shop catalog lock poisoned".to_string()))?;
        Ok(items.get(id).cloned())
    }
}

/// In-memory achievement catalog for tests and single-process deployments.
#[derive(Debug, Default)]
pub struct MemoryAchievementCatalog {
    achievements: Mutex<BTreeMap<AchievementId, AchievementDef>>,
}

impl MemoryAchievementCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a definition.
    pub fn put(&self, def: AchievementDef) {
        if let Ok(mut achievements) = self.achievements.lock() {
            achievements.insert(def.id.clone(), def);
        }
    }
}

impl AchievementCatalog for MemoryAchievementCatalog {
    fn achievement(&self, id: &AchievementId) -> Result<Option<AchievementDef>, StoreError> {
        let achievements = self
            .achievements
            .lock()
            .map_err(|_| StoreError::Backend("achievement catalog lock poisoned".to_string()))?;
        Ok(achievements.get(id).cloned())
    }
}
