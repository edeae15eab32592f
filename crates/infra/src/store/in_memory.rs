use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use larder_core::Entity;
use larder_inventory::{InventoryItem, InventoryItemId};
use larder_recipes::{Recipe, RecipeId};

use super::{CatalogStore, CatalogTransaction, StoreError};

/// Rows keyed by entity id. UUIDv7 ids keep iteration in creation order.
#[derive(Debug)]
struct Table<E: Entity> {
    rows: BTreeMap<E::Id, E>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self { rows: BTreeMap::new() }
    }
}

impl<E> Table<E>
where
    E: Entity + Clone,
{
    fn insert(&mut self, row: E) -> Result<(), StoreError> {
        let id = row.id();
        if self.rows.contains_key(&id) {
            return Err(StoreError::Conflict(format!("duplicate id {id:?}")));
        }
        self.rows.insert(id, row);
        Ok(())
    }

    fn get(&self, id: &E::Id) -> Option<E> {
        self.rows.get(id).cloned()
    }

    fn get_mut(&mut self, id: &E::Id) -> Option<&mut E> {
        self.rows.get_mut(id)
    }

    fn contains(&self, id: &E::Id) -> bool {
        self.rows.contains_key(id)
    }

    fn remove(&mut self, id: &E::Id) -> Option<E> {
        self.rows.remove(id)
    }

    fn all(&self) -> Vec<E> {
        self.rows.values().cloned().collect()
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    items: Table<InventoryItem>,
    recipes: Table<Recipe>,
}

/// In-memory catalog store for tests/dev.
///
/// A transaction holds the write lock for its whole lifetime, so crafts are
/// fully serialised against each other and against plain writes.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalogStore {
    state: Arc<RwLock<CatalogState>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn insert_item(&self, item: InventoryItem) -> Result<(), StoreError> {
        self.state.write().await.items.insert(item)
    }

    async fn list_items(&self) -> Result<Vec<InventoryItem>, StoreError> {
        Ok(self.state.read().await.items.all())
    }

    async fn get_inventory_item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        Ok(self.state.read().await.items.get(&id))
    }

    async fn update_inventory_quantity(
        &self,
        id: InventoryItemId,
        quantity: i64,
    ) -> Result<Option<InventoryItem>, StoreError> {
        let mut state = self.state.write().await;
        Ok(state.items.get_mut(&id).map(|item| {
            item.quantity = quantity;
            item.clone()
        }))
    }

    async fn delete_item(&self, id: InventoryItemId) -> Result<Option<InventoryItem>, StoreError> {
        Ok(self.state.write().await.items.remove(&id))
    }

    async fn insert_recipe(&self, recipe: Recipe) -> Result<(), StoreError> {
        self.state.write().await.recipes.insert(recipe)
    }

    async fn list_recipes(&self) -> Result<Vec<Recipe>, StoreError> {
        Ok(self.state.read().await.recipes.all())
    }

    async fn get_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        Ok(self.state.read().await.recipes.get(&id))
    }

    async fn delete_recipe(&self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        Ok(self.state.write().await.recipes.remove(&id))
    }

    async fn begin(&self) -> Result<Box<dyn CatalogTransaction>, StoreError> {
        let guard = self.state.clone().write_owned().await;
        Ok(Box::new(InMemoryCatalogTransaction {
            state: Some(guard),
            recipe_amounts: HashMap::new(),
            quantities: HashMap::new(),
        }))
    }
}

/// Writes are staged next to the locked state and applied on commit.
/// The lock is released on commit or drop, whichever comes first.
struct InMemoryCatalogTransaction {
    state: Option<OwnedRwLockWriteGuard<CatalogState>>,
    recipe_amounts: HashMap<RecipeId, u64>,
    quantities: HashMap<InventoryItemId, i64>,
}

impl InMemoryCatalogTransaction {
    fn state(&self) -> Result<&CatalogState, StoreError> {
        self.state
            .as_deref()
            .ok_or_else(|| StoreError::Backend("transaction already committed".to_string()))
    }
}

#[async_trait]
impl CatalogTransaction for InMemoryCatalogTransaction {
    async fn get_recipe(&mut self, id: RecipeId) -> Result<Option<Recipe>, StoreError> {
        let recipe = self.state()?.recipes.get(&id);
        Ok(recipe.map(|mut recipe| {
            if let Some(amount) = self.recipe_amounts.get(&id) {
                recipe.amount = *amount;
            }
            recipe
        }))
    }

    async fn lock_inventory_items(&mut self, ids: &[InventoryItemId]) -> Result<Vec<InventoryItem>, StoreError> {
        let mut wanted = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();

        let state = self.state()?;
        Ok(wanted
            .into_iter()
            .filter_map(|id| state.items.get(&id))
            .map(|mut item| {
                if let Some(quantity) = self.quantities.get(&item.id) {
                    item.quantity = *quantity;
                }
                item
            })
            .collect())
    }

    async fn update_recipe_amount(&mut self, id: RecipeId, amount: u64) -> Result<(), StoreError> {
        if !self.state()?.recipes.contains(&id) {
            return Err(StoreError::Conflict(format!("recipe {id} does not exist")));
        }
        self.recipe_amounts.insert(id, amount);
        Ok(())
    }

    async fn update_inventory_quantity(&mut self, id: InventoryItemId, quantity: i64) -> Result<(), StoreError> {
        if !self.state()?.items.contains(&id) {
            return Err(StoreError::Conflict(format!("inventory item {id} does not exist")));
        }
        self.quantities.insert(id, quantity);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), StoreError> {
        let Some(mut state) = self.state.take() else {
            return Err(StoreError::Backend("transaction already committed".to_string()));
        };
        for (id, amount) in self.recipe_amounts.drain() {
            if let Some(recipe) = state.recipes.get_mut(&id) {
                recipe.amount = amount;
            }
        }
        for (id, quantity) in self.quantities.drain() {
            if let Some(item) = state.items.get_mut(&id) {
                item.quantity = quantity;
            }
        }
        Ok(())
    }
}

impl Drop for InMemoryCatalogTransaction {
    fn drop(&mut self) {
        if self.state.is_some() && !(self.recipe_amounts.is_empty() && self.quantities.is_empty()) {
            tracing::debug!(
                staged_recipes = self.recipe_amounts.len(),
                staged_items = self.quantities.len(),
                "in-memory transaction dropped without commit; discarding writes"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use larder_recipes::Ingredient;

    fn item(name: &str, quantity: i64) -> InventoryItem {
        InventoryItem {
            id: InventoryItemId::new(),
            name: name.to_string(),
            category: "pantry".to_string(),
            image: String::new(),
            quantity,
        }
    }

    fn recipe(name: &str, ingredients: Vec<Ingredient>) -> Recipe {
        Recipe {
            id: RecipeId::new(),
            name: name.to_string(),
            description: String::new(),
            image: String::new(),
            amount: 0,
            ingredients,
        }
    }

    #[tokio::test]
    async fn lists_in_insertion_order() {
        let store = InMemoryCatalogStore::new();
        let a = item("A", 1);
        let b = item("B", 2);
        store.insert_item(a.clone()).await.unwrap();
        store.insert_item(b.clone()).await.unwrap();

        let names: Vec<_> = store.list_items().await.unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn duplicate_insert_is_a_conflict() {
        let store = InMemoryCatalogStore::new();
        let a = item("A", 1);
        store.insert_item(a.clone()).await.unwrap();
        let err = store.insert_item(a).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_items() {
        let store = InMemoryCatalogStore::new();
        let ghost = InventoryItemId::new();
        assert!(store.update_inventory_quantity(ghost, 3).await.unwrap().is_none());
        assert!(store.delete_item(ghost).await.unwrap().is_none());

        let a = item("A", 1);
        store.insert_item(a.clone()).await.unwrap();
        let updated = store.update_inventory_quantity(a.id, 9).await.unwrap().unwrap();
        assert_eq!(updated.quantity, 9);
        let deleted = store.delete_item(a.id).await.unwrap().unwrap();
        assert_eq!(deleted.quantity, 9);
        assert!(store.get_inventory_item(a.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transaction_reads_its_own_writes() {
        let store = InMemoryCatalogStore::new();
        let a = item("A", 5);
        store.insert_item(a.clone()).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        tx.update_inventory_quantity(a.id, 2).await.unwrap();
        let seen = tx.lock_inventory_items(&[a.id]).await.unwrap();
        assert_eq!(seen[0].quantity, 2);
        tx.commit().await.unwrap();

        let stored = store.get_inventory_item(a.id).await.unwrap().unwrap();
        assert_eq!(stored.quantity, 2);
    }

    #[tokio::test]
    async fn dropped_transaction_discards_writes() {
        let store = InMemoryCatalogStore::new();
        let a = item("A", 5);
        let r = recipe("R", vec![Ingredient { inventory_id: a.id, amount_needed: 1 }]);
        store.insert_item(a.clone()).await.unwrap();
        store.insert_recipe(r.clone()).await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            tx.update_recipe_amount(r.id, 7).await.unwrap();
            tx.update_inventory_quantity(a.id, 0).await.unwrap();
        }

        assert_eq!(store.get_recipe(r.id).await.unwrap().unwrap().amount, 0);
        assert_eq!(store.get_inventory_item(a.id).await.unwrap().unwrap().quantity, 5);
    }

    #[tokio::test]
    async fn lock_returns_existing_items_sorted_and_deduplicated() {
        let store = InMemoryCatalogStore::new();
        let a = item("A", 1);
        let b = item("B", 2);
        store.insert_item(a.clone()).await.unwrap();
        store.insert_item(b.clone()).await.unwrap();

        let mut tx = store.begin().await.unwrap();
        let locked = tx
            .lock_inventory_items(&[b.id, InventoryItemId::new(), a.id, b.id])
            .await
            .unwrap();
        let ids: Vec<_> = locked.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn committed_transaction_rejects_further_use() {
        let store = InMemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.commit().await.unwrap();
        assert!(tx.get_recipe(RecipeId::new()).await.is_err());
        assert!(tx.commit().await.is_err());
    }

    #[tokio::test]
    async fn transaction_updates_require_existing_records() {
        let store = InMemoryCatalogStore::new();
        let mut tx = store.begin().await.unwrap();
        let err = tx.update_inventory_quantity(InventoryItemId::new(), 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
        let err = tx.update_recipe_amount(RecipeId::new(), 1).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }
}
